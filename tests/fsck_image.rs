use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::process::Command;

use tempfile::NamedTempFile;
use vsfs::fsck::{run_fsck, Category, FsckOptions, ImageFile, Stage};
use vsfs::{format_image, Geometry, InodeDisk, Metadata};

const FSCK_BIN: &str = env!("CARGO_BIN_EXE_fsck.vsfs");
const MKFS_BIN: &str = env!("CARGO_BIN_EXE_mkfs.vsfs");

fn fresh_image() -> NamedTempFile {
    let tmp = NamedTempFile::new().unwrap();
    let geo = Geometry::VSFS;
    let mut img = ImageFile::create(tmp.path(), &geo).unwrap();
    format_image(&mut img, &geo).unwrap();
    tmp
}

fn poke(path: &Path, offset: u64, bytes: &[u8]) {
    let mut f = OpenOptions::new().write(true).open(path).unwrap();
    f.seek(SeekFrom::Start(offset)).unwrap();
    f.write_all(bytes).unwrap();
}

fn put_inode(path: &Path, ino: u64, inode: &InodeDisk) {
    let mut raw = vec![0u8; 256];
    inode.encode_into(&mut raw);
    poke(path, 3 * 4096 + ino * 256, &raw);
}

fn set_bit(path: &Path, block: u64, idx: u64) {
    let meta = load(path);
    let bitmap = if block == 1 { &meta.inode_bitmap } else { &meta.data_bitmap };
    let byte = bitmap.as_bytes()[(idx / 8) as usize] | (1 << (idx % 8));
    poke(path, block * 4096 + idx / 8, &[byte]);
}

fn file_inode(ptrs: &[u32], size: u32) -> InodeDisk {
    let mut inode = InodeDisk {
        mode: 0o100644,
        links_count: 1,
        blocks_count: ptrs.len() as u32,
        size,
        ..Default::default()
    };
    inode.direct[..ptrs.len()].copy_from_slice(ptrs);
    inode
}

fn load(path: &Path) -> Metadata {
    let mut img = ImageFile::open(path, &Geometry::VSFS, false).unwrap();
    Metadata::load(&mut img, Geometry::VSFS).unwrap()
}

fn fsck(path: &Path) -> vsfs::fsck::FsckReport {
    let mut img = ImageFile::open(path, &Geometry::VSFS, true).unwrap();
    run_fsck(&mut img, &FsckOptions::default()).unwrap()
}

#[test]
fn scenario_bad_magic() {
    let img = fresh_image();
    poke(img.path(), 0, &[0, 0]);

    let report = fsck(img.path());
    assert_eq!(report.errors_before, 1);
    assert_eq!(report.count(Stage::Check, Category::Superblock), 1);
    assert!(report.superblock_rewritten);
    assert_eq!(report.errors_after, 0);
    assert_eq!(load(img.path()).superblock.magic, 0xD34D);
}

#[test]
fn scenario_shared_block() {
    let img = fresh_image();
    put_inode(img.path(), 2, &file_inode(&[10], 4096));
    put_inode(img.path(), 9, &file_inode(&[11, 10], 2 * 4096));
    set_bit(img.path(), 1, 2);
    set_bit(img.path(), 1, 9);
    set_bit(img.path(), 2, 10);
    set_bit(img.path(), 2, 11);

    let report = fsck(img.path());
    let dup: Vec<&str> = report
        .diagnostics
        .iter()
        .filter(|d| d.stage == Stage::Check && d.category == Category::Duplicate)
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(dup, ["Data block 10: Referenced 2 times"]);
    assert_eq!(report.errors_before, 1);
    assert_eq!(report.fixes_applied, 1);
    assert_eq!(report.total_initial(), 2);
    assert_eq!(report.errors_after, 0);

    let meta = load(img.path());
    assert_eq!(meta.inodes[2].direct[0], 10);
    assert_eq!(meta.inodes[9].direct[..2], [11, 0]);
    assert_eq!(meta.inodes[9].blocks_count, 1);
    assert_eq!(meta.inodes[9].size, 4096);
}

#[test]
fn scenario_freed_inode_still_marked() {
    let img = fresh_image();
    let mut freed = file_inode(&[], 0);
    freed.links_count = 0;
    put_inode(img.path(), 12, &freed);
    set_bit(img.path(), 1, 12);

    let report = fsck(img.path());
    assert_eq!(report.count(Stage::Check, Category::InodeBitmap), 1);
    assert!(report
        .messages(Stage::Check)
        .any(|m| m.contains("Inode 12: Marked in bitmap but invalid")));
    assert_eq!(report.errors_after, 0);
    assert!(!load(img.path()).inode_bitmap.get(12));
}

#[test]
fn scenario_pointer_past_the_end() {
    let img = fresh_image();
    put_inode(img.path(), 0, &file_inode(&[8, 70], 5000));
    set_bit(img.path(), 1, 0);
    set_bit(img.path(), 2, 8);

    let report = fsck(img.path());
    assert_eq!(report.count(Stage::Check, Category::BadPointer), 1);
    assert_eq!(report.errors_after, 0);

    let meta = load(img.path());
    assert_eq!(meta.inodes[0].direct[..2], [8, 0]);
    assert_eq!(meta.inodes[0].blocks_count, 1);
    assert_eq!(meta.inodes[0].size, 4096);
}

#[test]
fn repaired_image_satisfies_every_invariant() {
    let img = fresh_image();
    poke(img.path(), 8, &99u32.to_le_bytes());
    poke(img.path(), 32, &500u32.to_le_bytes());
    for ino in 0..6u32 {
        put_inode(img.path(), u64::from(ino * 13), &file_inode(&[8 + ino, 20, 2, 90], 16 * 4096));
    }
    for blk in [30u64, 31, 63] {
        set_bit(img.path(), 2, blk);
    }

    let report = fsck(img.path());
    assert!(report.errors_before > 0);
    assert_eq!(report.errors_after, 0);

    let geo = Geometry::VSFS;
    let meta = load(img.path());
    let mut owners = vec![0u32; geo.total_blocks as usize];
    for (i, inode) in meta.inodes.iter().enumerate() {
        assert_eq!(meta.inode_bitmap.get(i as u32), inode.is_valid());
        if !inode.is_valid() {
            continue;
        }
        for &p in inode.direct.iter().filter(|&&p| p != 0) {
            assert!(geo.is_data_block(p), "inode {i} keeps pointer {p}");
            owners[p as usize] += 1;
        }
    }
    for blk in geo.data_blocks() {
        assert!(owners[blk as usize] <= 1);
        assert_eq!(meta.data_bitmap.get(blk), owners[blk as usize] == 1);
    }
    // el inodo 0 es el primer dueño del bloque 20
    assert_eq!(meta.inodes[0].direct[1], 20);
    assert_eq!(meta.superblock.total_blocks, 64);
    assert_eq!(meta.superblock.inode_count, 80);

    let before = std::fs::read(img.path()).unwrap();
    let again = fsck(img.path());
    assert_eq!(again.errors_before, 0);
    assert_eq!(again.fixes_applied, 0);
    assert_eq!(std::fs::read(img.path()).unwrap(), before);
}

#[test]
fn cli_rejects_wrong_argument_count() {
    let none = Command::new(FSCK_BIN).output().unwrap();
    assert_eq!(none.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&none.stderr).contains("Usage: fsck.vsfs"));

    let extra = Command::new(FSCK_BIN).args(["a.img", "b.img"]).output().unwrap();
    assert_eq!(extra.status.code(), Some(1));
}

#[test]
fn cli_missing_image_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = Command::new(FSCK_BIN)
        .arg(dir.path().join("missing.img"))
        .env("NO_COLOR", "1")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("cannot open image"));
}

#[test]
fn cli_repairs_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vsfs.img");

    let mk = Command::new(MKFS_BIN).arg(&path).output().unwrap();
    assert!(mk.status.success());

    poke(&path, 0, &[0, 0]);
    put_inode(&path, 1, &file_inode(&[70], 4096));

    let out = Command::new(FSCK_BIN).arg(&path).env("NO_COLOR", "1").output().unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(out.status.code(), Some(0), "{stdout}");
    assert!(stdout.contains("Superblock: Invalid magic number (0x0000, expected 0xd34d)"));
    assert!(stdout.contains("Inode 1: Bad block pointer 70"));
    assert!(stdout.contains("Total errors after fixes: 0"));
}

#[test]
fn cli_check_only_leaves_image_alone() {
    let img = fresh_image();
    poke(img.path(), 0, &[0, 0]);
    let before = std::fs::read(img.path()).unwrap();

    let out = Command::new(FSCK_BIN)
        .arg(img.path())
        .env("NO_COLOR", "1")
        .env("VSFS_NO_REPAIR", "yes")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout.contains("Total errors found initially: 1"));
    assert!(stdout.contains("Total fixes applied: 0"));
    assert!(stdout.contains("Total errors after fixes: 1"));
    assert_eq!(std::fs::read(img.path()).unwrap(), before);
}
