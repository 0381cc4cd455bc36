/*EL ARCHIVO PRINCIPAL DE FSCK. Orquesta la corrida completa:
LOAD -> VALIDATE -> REPAIR -> PERSIST -> REVALIDATE -> REPORT.
Cualquier error de E/S corta la corrida; las inconsistencias sólo se cuentan. */

use tracing::{info, info_span};

use super::bad_blocks::{check_bad_blocks, repair_bad_blocks};
use super::bitmap::{check_data_bitmap, check_inode_bitmap, repair_data_bitmap, repair_inode_bitmap};
use super::duplicates::{check_duplicates, repair_duplicates};
use super::fsck_backend::FsckBackend;
use super::fsck_types::*;
use super::superblock::{check_superblock, repair_superblock};
use crate::error::FsckError;
use crate::fs::Metadata;

/// Las cuatro validaciones sobre el estado actual, sin modificar nada.
pub fn check_all(meta: &Metadata, report: &mut FsckReport) -> u32 {
    let mut errors = 0;
    errors += check_superblock(&meta.superblock, &meta.geometry, report);
    errors += check_inode_bitmap(meta, report);
    errors += check_data_bitmap(meta, report);
    errors += check_duplicates(meta, report);
    errors += check_bad_blocks(meta, report);
    errors
}

/// Aplica todas las reparaciones en orden. Devuelve (arreglos totales,
/// arreglos del superblock).
pub fn repair_all(meta: &mut Metadata, report: &mut FsckReport) -> (u32, u32) {
    let geo = meta.geometry;
    let sb_fixes = repair_superblock(&mut meta.superblock, &geo, report);

    let mut fixes = sb_fixes;
    fixes += repair_inode_bitmap(meta, report);
    fixes += repair_duplicates(meta, report);
    fixes += repair_bad_blocks(meta, report);
    // último: necesita la tabla de referencias ya reparada
    fixes += repair_data_bitmap(meta, report);

    (fixes, sb_fixes)
}

pub fn run_fsck<B: FsckBackend + ?Sized>(
    backend: &mut B,
    options: &FsckOptions,
) -> Result<FsckReport, FsckError> {
    let mut report = FsckReport::new();
    run_fsck_into(backend, options, &mut report)?;
    Ok(report)
}

/// Igual que `run_fsck`, pero acumula en un reporte del llamador: si la
/// corrida aborta, lo que ya se diagnosticó sigue disponible.
pub fn run_fsck_into<B: FsckBackend + ?Sized>(
    backend: &mut B,
    options: &FsckOptions,
    report: &mut FsckReport,
) -> Result<(), FsckError> {
    let span = info_span!(target: "vsfs::fsck", "fsck", repair = options.repair);
    let _guard = span.enter();

    // --- LOAD ---
    let mut meta = Metadata::load(backend, options.geometry)?;
    info!(target: "vsfs::fsck", inodes = meta.inodes.len(), "metadata_loaded");

    // --- VALIDATE ---
    report.enter(Stage::Check);
    report.errors_before = check_all(&meta, report);
    info!(target: "vsfs::fsck", errors = report.errors_before, "validate_done");

    if options.repair {
        // --- REPAIR ---
        report.enter(Stage::Repair);
        let (fixes, sb_fixes) = repair_all(&mut meta, report);
        report.fixes_applied = fixes;
        info!(target: "vsfs::fsck", fixes, sb_fixes, "repair_done");

        // --- PERSIST ---
        if sb_fixes > 0 {
            meta.write_superblock(backend)?;
            report.superblock_rewritten = true;
        }
        meta.write_tables(backend)?;
        backend.flush()?;
        info!(target: "vsfs::fsck", superblock = report.superblock_rewritten, "persist_done");
    }

    // --- REVALIDATE --- sobre lo que quedó en disco
    report.enter(Stage::Recheck);
    let persisted = Metadata::load(backend, options.geometry)?;
    report.errors_after = check_all(&persisted, report);
    info!(
        target: "vsfs::fsck",
        initial = report.total_initial(),
        fixes = report.fixes_applied,
        remaining = report.errors_after,
        "fsck_complete"
    );

    Ok(())
}
