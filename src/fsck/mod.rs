pub mod bad_blocks;
pub mod bitmap;
pub mod duplicates;
#[allow(clippy::module_inception)]
pub mod fsck;
pub mod fsck_backend;
pub mod fsck_types;
#[cfg(test)]
pub(crate) mod mock;
pub mod refs;
pub mod superblock;

pub use fsck::{check_all, repair_all, run_fsck, run_fsck_into};
pub use fsck_backend::{FsckBackend, ImageFile};
pub use fsck_types::{Category, Diagnostic, FsckOptions, FsckReport, Stage};
