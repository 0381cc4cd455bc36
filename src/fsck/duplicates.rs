use super::fsck_types::{Category, FsckReport};
use super::refs::BlockRefs;
use crate::fs::Metadata;

/// Un diagnóstico por cada bloque de datos referenciado más de una vez.
pub fn check_duplicates(meta: &Metadata, report: &mut FsckReport) -> u32 {
    let geo = &meta.geometry;
    let refs = BlockRefs::scan(&meta.inodes, geo);
    let mut errors = 0;

    for blk in geo.data_blocks() {
        let n = refs.count(blk);
        if n > 1 {
            report.note(
                Category::Duplicate,
                format!("Data block {blk}: Referenced {n} times"),
            );
            errors += 1;
        }
    }
    errors
}

/// El primer reclamo (inodo de menor índice, ranura más baja) se queda con
/// el bloque; todos los demás punteros al mismo bloque se sueltan.
pub fn repair_duplicates(meta: &mut Metadata, report: &mut FsckReport) -> u32 {
    let geo = meta.geometry;
    let refs = BlockRefs::scan(&meta.inodes, &geo);
    let mut fixes = 0;

    for (i, inode) in meta.inodes.iter_mut().enumerate() {
        if !inode.is_valid() {
            continue;
        }
        let ino = i as u32;

        for slot in 0..inode.direct.len() {
            let blk = inode.direct[slot];
            if !geo.is_data_block(blk) || refs.count(blk) <= 1 {
                continue;
            }
            // El desempate es por slot: si el mismo inodo repite el bloque,
            // sus slots posteriores también se limpian.
            if refs.first_claim(blk) == Some((ino, slot)) {
                continue;
            }

            report.note(
                Category::Duplicate,
                format!("Fixing inode {ino}: Clearing duplicate reference to block {blk}"),
            );
            inode.drop_direct(slot, geo.block_size);
            fixes += 1;
        }
    }
    fixes
}
