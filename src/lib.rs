mod error;
mod fs;
pub mod fsck;
pub mod logging;

pub use crate::error::{FsckError, Result};
pub use crate::fs::{
    format_image,
    Bitmap,
    Geometry,
    InodeDisk,
    Metadata,
    SuperblockDisk,
    VSFS_BLOCK_SIZE,
    VSFS_DIRECT_POINTERS,
    VSFS_INODE_SIZE,
    VSFS_MAGIC,
    VSFS_TOTAL_BLOCKS,
};
