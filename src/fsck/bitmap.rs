/*Consistencia de bitmaps.
Bitmap de inodos: el predicado de validez del inodo manda, el bit se corrige hacia él.
Bitmap de datos: un bloque está marcado sii algún inodo válido lo referencia. */

use super::fsck_types::{Category, FsckReport};
use super::refs::BlockRefs;
use crate::fs::Metadata;

pub fn check_inode_bitmap(meta: &Metadata, report: &mut FsckReport) -> u32 {
    let mut errors = 0;

    for (i, inode) in meta.inodes.iter().enumerate() {
        let ino = i as u32;
        let marked = meta.inode_bitmap.get(ino);
        let valid = inode.is_valid();

        if marked && !valid {
            report.note(
                Category::InodeBitmap,
                format!(
                    "Inode {ino}: Marked in bitmap but invalid (links={}, dtime={})",
                    inode.links_count, inode.dtime
                ),
            );
            errors += 1;
        }
        if valid && !marked {
            report.note(
                Category::InodeBitmap,
                format!("Inode {ino}: Valid but not marked in bitmap"),
            );
            errors += 1;
        }
    }
    errors
}

pub fn repair_inode_bitmap(meta: &mut Metadata, report: &mut FsckReport) -> u32 {
    let mut fixes = 0;

    for (i, inode) in meta.inodes.iter().enumerate() {
        let ino = i as u32;
        let marked = meta.inode_bitmap.get(ino);
        let valid = inode.is_valid();

        if marked != valid {
            let msg = if valid {
                format!("Fixing inode {ino}: Setting bitmap bit (valid inode)")
            } else {
                format!("Fixing inode {ino}: Clearing bitmap bit (invalid inode)")
            };
            report.note(Category::InodeBitmap, msg);
            meta.inode_bitmap.set(ino, valid);
            fixes += 1;
        }
    }
    fixes
}

pub fn check_data_bitmap(meta: &Metadata, report: &mut FsckReport) -> u32 {
    let geo = &meta.geometry;
    let refs = BlockRefs::scan(&meta.inodes, geo);
    let mut errors = 0;

    for blk in geo.data_blocks() {
        let marked = meta.data_bitmap.get(blk);
        let referenced = refs.is_referenced(blk);

        if marked && !referenced {
            report.note(
                Category::DataBitmap,
                format!("Data block {blk}: Marked in bitmap but not referenced"),
            );
            errors += 1;
        }
        if referenced && !marked {
            report.note(
                Category::DataBitmap,
                format!("Data block {blk}: Referenced but not marked in bitmap"),
            );
            errors += 1;
        }
    }
    errors
}

/// Debe correr después de las pasadas de duplicados y punteros inválidos,
/// porque recalcula las referencias desde los inodos ya reparados.
pub fn repair_data_bitmap(meta: &mut Metadata, report: &mut FsckReport) -> u32 {
    let geo = meta.geometry;
    let refs = BlockRefs::scan(&meta.inodes, &geo);
    let mut fixes = 0;

    for blk in geo.data_blocks() {
        let marked = meta.data_bitmap.get(blk);
        let referenced = refs.is_referenced(blk);

        if marked != referenced {
            let msg = if referenced {
                format!("Fixing data block {blk}: Setting bitmap bit (referenced)")
            } else {
                format!("Fixing data block {blk}: Clearing bitmap bit (unreferenced)")
            };
            report.note(Category::DataBitmap, msg);
            meta.data_bitmap.set(blk, referenced);
            fixes += 1;
        }
    }
    fixes
}
