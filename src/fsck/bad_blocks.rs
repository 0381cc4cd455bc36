use super::fsck_types::{Category, FsckReport};
use crate::fs::{Geometry, Metadata};

// 0 es una ranura vacía, nunca un puntero inválido
fn is_bad_pointer(blk: u32, geo: &Geometry) -> bool {
    blk != 0 && !geo.is_data_block(blk)
}

pub fn check_bad_blocks(meta: &Metadata, report: &mut FsckReport) -> u32 {
    let geo = &meta.geometry;
    let mut errors = 0;

    for (ino, inode) in meta.inodes.iter().enumerate() {
        if !inode.is_valid() {
            continue;
        }
        for &blk in inode.direct.iter().filter(|&&b| is_bad_pointer(b, geo)) {
            report.note(
                Category::BadPointer,
                format!("Inode {ino}: Bad block pointer {blk}"),
            );
            errors += 1;
        }
    }
    errors
}

pub fn repair_bad_blocks(meta: &mut Metadata, report: &mut FsckReport) -> u32 {
    let geo = meta.geometry;
    let mut fixes = 0;

    for (ino, inode) in meta.inodes.iter_mut().enumerate() {
        if !inode.is_valid() {
            continue;
        }
        for slot in 0..inode.direct.len() {
            let blk = inode.direct[slot];
            if is_bad_pointer(blk, &geo) {
                report.note(
                    Category::BadPointer,
                    format!("Fixing inode {ino}: Clearing bad block pointer {blk}"),
                );
                inode.drop_direct(slot, geo.block_size);
                fixes += 1;
            }
        }
    }
    fixes
}
