use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use tracing::info;
use vsfs::fsck::ImageFile;
use vsfs::logging::init_logging;
use vsfs::{format_image, Geometry};

fn main() {
    // mkfs.vsfs imagen.img
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() != 1 {
        eprintln!("Usage: mkfs.vsfs <vsfs.img>");
        process::exit(1);
    }

    if let Err(err) = run(PathBuf::from(&args[0])) {
        eprintln!("mkfs.vsfs: {err:#}");
        process::exit(1);
    }
}

fn run(image: PathBuf) -> Result<()> {
    init_logging()?;
    let geo = Geometry::VSFS;

    let mut backend = ImageFile::create(&image, &geo)
        .with_context(|| format!("cannot create image {:?}", image))?;
    format_image(&mut backend, &geo).with_context(|| format!("cannot format image {:?}", image))?;

    info!(target: "vsfs::mkfs", path = %image.display(), "image_formatted");
    println!(
        "mkfs.vsfs: created VSFS image with {} blocks, {} inodes, {} data blocks.",
        geo.total_blocks,
        geo.inode_count(),
        geo.total_blocks - geo.first_data_block
    );
    Ok(())
}
