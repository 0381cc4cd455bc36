use tracing::debug;

use super::fsck_types::{Category, FsckReport};
use crate::fs::{Geometry, SuperblockDisk};

// Campos u32 que deben ser exactamente iguales a la geometría:
// (nombre, valor leído, valor requerido).
fn exact_fields(sb: &SuperblockDisk, geo: &Geometry) -> [(&'static str, u32, u32); 7] {
    [
        ("block size", sb.block_size, geo.block_size),
        ("total blocks", sb.total_blocks, geo.total_blocks),
        ("inode bitmap block", sb.inode_bitmap_block, geo.inode_bitmap_block),
        ("data bitmap block", sb.data_bitmap_block, geo.data_bitmap_block),
        ("inode table start", sb.inode_table_start, geo.inode_table_start),
        ("first data block", sb.first_data_block, geo.first_data_block),
        ("inode size", sb.inode_size, geo.inode_size),
    ]
}

// Los mismos campos, en el mismo orden, para sobrescribirlos.
fn exact_fields_mut<'a>(sb: &'a mut SuperblockDisk, geo: &Geometry) -> [(&'static str, &'a mut u32, u32); 7] {
    [
        ("block size", &mut sb.block_size, geo.block_size),
        ("total blocks", &mut sb.total_blocks, geo.total_blocks),
        ("inode bitmap block", &mut sb.inode_bitmap_block, geo.inode_bitmap_block),
        ("data bitmap block", &mut sb.data_bitmap_block, geo.data_bitmap_block),
        ("inode table start", &mut sb.inode_table_start, geo.inode_table_start),
        ("first data block", &mut sb.first_data_block, geo.first_data_block),
        ("inode size", &mut sb.inode_size, geo.inode_size),
    ]
}

/// Compara los nueve campos del superblock con sus valores requeridos.
pub fn check_superblock(sb: &SuperblockDisk, geo: &Geometry, report: &mut FsckReport) -> u32 {
    let mut errors = 0;

    if sb.magic != geo.magic {
        report.note(
            Category::Superblock,
            format!(
                "Superblock: Invalid magic number (0x{:04x}, expected 0x{:04x})",
                sb.magic, geo.magic
            ),
        );
        errors += 1;
    }

    for (name, value, expected) in exact_fields(sb, geo) {
        if value != expected {
            report.note(
                Category::Superblock,
                format!("Superblock: Invalid {name} ({value}, expected {expected})"),
            );
            errors += 1;
        }
    }

    let max_inodes = geo.inode_count();
    if sb.inode_count > max_inodes {
        report.note(
            Category::Superblock,
            format!("Superblock: Invalid inode count ({}, max {max_inodes})", sb.inode_count),
        );
        errors += 1;
    }

    errors
}

/// Sobrescribe cada campo incorrecto con su valor requerido.
pub fn repair_superblock(sb: &mut SuperblockDisk, geo: &Geometry, report: &mut FsckReport) -> u32 {
    let mut fixes = 0;

    if sb.magic != geo.magic {
        report.note(
            Category::Superblock,
            format!("Fixing superblock: Setting magic number to 0x{:04x}", geo.magic),
        );
        sb.magic = geo.magic;
        fixes += 1;
    }

    for (name, value, expected) in exact_fields_mut(sb, geo) {
        if *value != expected {
            report.note(
                Category::Superblock,
                format!("Fixing superblock: Setting {name} to {expected}"),
            );
            *value = expected;
            fixes += 1;
        }
    }

    let max_inodes = geo.inode_count();
    if sb.inode_count > max_inodes {
        report.note(
            Category::Superblock,
            format!("Fixing superblock: Setting inode count to {max_inodes}"),
        );
        sb.inode_count = max_inodes;
        fixes += 1;
    }

    debug!(target: "vsfs::fsck::superblock", fixes, "superblock_repaired");
    fixes
}
