use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errores fatales: cualquiera de estos aborta la corrida antes de seguir
/// modificando la imagen.
#[derive(Debug, Error)]
pub enum FsckError {
    #[error("failed to open image {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("image {path:?} is in use by another process")]
    Locked { path: PathBuf },
    #[error("failed to read block {block}: {source}")]
    Read {
        block: u32,
        #[source]
        source: io::Error,
    },
    #[error("failed to write block {block}: {source}")]
    Write {
        block: u32,
        #[source]
        source: io::Error,
    },
    #[error("block {block} is outside the image ({total} blocks)")]
    OutOfRange { block: u32, total: u32 },
    #[error("buffer of {len} bytes does not match block size {block_size}")]
    BadBuffer { len: usize, block_size: u32 },
    #[error("failed to flush image: {0}")]
    Flush(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, FsckError>;
