// src/bin/fsck_vsfs.rs
use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use colored::*;
use vsfs::fsck::{run_fsck_into, FsckOptions, FsckReport, ImageFile, Stage};
use vsfs::logging::{env_bool, init_logging};

const USAGE: &str = "Usage: fsck.vsfs <vsfs.img>";
const NO_REPAIR_ENV: &str = "VSFS_NO_REPAIR";

fn main() {
    // Exactamente un argumento: la ruta de la imagen
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() != 1 {
        eprintln!("{USAGE}");
        process::exit(1);
    }

    match run(PathBuf::from(&args[0])) {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("{} {err:#}", "fsck.vsfs:".red().bold());
            process::exit(1);
        }
    }
}

/// Devuelve Ok(true) si la imagen quedó consistente.
fn run(image: PathBuf) -> Result<bool> {
    init_logging()?;

    let options = FsckOptions {
        repair: !env_bool(NO_REPAIR_ENV, false)?,
        ..Default::default()
    };

    let mut backend = ImageFile::open(&image, &options.geometry, options.repair)
        .with_context(|| format!("cannot open image {:?}", image))?;

    let mut report = FsckReport::new();
    if let Err(err) = run_fsck_into(&mut backend, &options, &mut report) {
        print_partial(&report);
        return Err(anyhow::Error::new(err).context(format!("fsck aborted on {:?}", image)));
    }

    print_report(&report, options.repair);
    Ok(report.is_clean())
}

/// Lo diagnosticado antes de que la corrida abortara.
fn print_partial(report: &FsckReport) {
    if report.diagnostics.is_empty() {
        return;
    }
    print_section("Checking file system", report, Stage::Check, |m| m.red());
    if report.stage() != Stage::Check {
        print_section("Applying fixes (not persisted)", report, Stage::Repair, |m| m.yellow());
    }
}

fn print_report(report: &FsckReport, repair: bool) {
    println!("\n{}", " VSFS FILESYSTEM CHECK ".on_blue().bold());
    println!("{}", "──────────────────────────────────────────".blue());

    print_section("Checking file system", report, Stage::Check, |m| m.red());
    if repair {
        print_section("Applying fixes", report, Stage::Repair, |m| m.yellow());
    } else {
        println!("\n{}", "Repair disabled (check only)".bold().underline());
    }
    print_section("Re-checking file system after fixes", report, Stage::Recheck, |m| m.red());

    // ——————————————————————————————————————————
    //       RESUMEN FINAL
    // ——————————————————————————————————————————
    println!("\n{}", "Summary".bold().underline());
    println!("Total errors found initially: {}", report.total_initial());
    println!("Total fixes applied: {}", report.fixes_applied);
    let remaining = format!("Total errors after fixes: {}", report.errors_after);
    if report.is_clean() {
        println!("{}", remaining.green().bold());
    } else {
        println!("{}", remaining.red().bold());
    }
}

fn print_section(title: &str, report: &FsckReport, stage: Stage, paint: fn(&str) -> ColoredString) {
    println!("\n{}", title.bold().underline());

    let mut empty = true;
    for msg in report.messages(stage) {
        println!("  {} {}", "•".red(), paint(msg));
        empty = false;
    }
    if empty {
        println!("  {} nothing to report", "✓".green());
    }
}
