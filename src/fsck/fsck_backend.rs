/*Interfaz de E/S por bloques para el fsck.
Dos implementaciones: ImageFile (la imagen real en disco, con flock)
y MockBackend (imagen en memoria, para pruebas con fallas inyectadas).
Cada llamada es una transferencia directa de un bloque, sin caché. */

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::FsckError;
use crate::fs::Geometry;

pub trait FsckBackend {
    fn block_size(&self) -> u32;
    fn total_blocks(&self) -> u32;
    fn read_block(&mut self, block: u32, buf: &mut [u8]) -> Result<(), FsckError>;
    fn write_block(&mut self, block: u32, buf: &[u8]) -> Result<(), FsckError>;

    fn flush(&mut self) -> Result<(), FsckError> {
        Ok(())
    }

    /// Validación común a todos los backends antes de transferir.
    fn check_request(&self, block: u32, len: usize) -> Result<(), FsckError> {
        if len != self.block_size() as usize {
            return Err(FsckError::BadBuffer {
                len,
                block_size: self.block_size(),
            });
        }
        if block >= self.total_blocks() {
            return Err(FsckError::OutOfRange {
                block,
                total: self.total_blocks(),
            });
        }
        Ok(())
    }
}

/// Imagen VSFS respaldada por un archivo.
pub struct ImageFile {
    path: PathBuf,
    file: File,
    block_size: u32,
    total_blocks: u32,
}

impl ImageFile {
    /// Abre la imagen y toma un lock exclusivo. `writable = false` la abre
    /// sólo para lectura (modo de chequeo).
    pub fn open(path: &Path, geo: &Geometry, writable: bool) -> Result<Self, FsckError> {
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path)
            .map_err(|source| FsckError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        lock_exclusive(&file, path)?;

        if let Ok(meta) = file.metadata() {
            if meta.len() < geo.image_len() {
                warn!(
                    target: "vsfs::fsck::io",
                    image_len = meta.len(),
                    expected = geo.image_len(),
                    "image is shorter than the fixed geometry"
                );
            }
        }

        debug!(target: "vsfs::fsck::io", path = %path.display(), writable, "image_opened");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            block_size: geo.block_size,
            total_blocks: geo.total_blocks,
        })
    }

    /// Crea (o trunca) un archivo del tamaño exacto de la geometría.
    pub fn create(path: &Path, geo: &Geometry) -> Result<Self, FsckError> {
        let open_err = |source| FsckError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(open_err)?;
        // Primero el lock: si otro proceso tiene la imagen, no se toca nada
        lock_exclusive(&file, path)?;
        file.set_len(0).map_err(open_err)?;
        file.set_len(geo.image_len()).map_err(open_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            block_size: geo.block_size,
            total_blocks: geo.total_blocks,
        })
    }

    fn seek_to(&mut self, block: u32) -> std::io::Result<()> {
        let offset = u64::from(block) * u64::from(self.block_size);
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

impl FsckBackend for ImageFile {
    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn total_blocks(&self) -> u32 {
        self.total_blocks
    }

    fn read_block(&mut self, block: u32, buf: &mut [u8]) -> Result<(), FsckError> {
        self.check_request(block, buf.len())?;
        self.seek_to(block)
            .and_then(|_| self.file.read_exact(buf))
            .map_err(|source| FsckError::Read { block, source })
    }

    fn write_block(&mut self, block: u32, buf: &[u8]) -> Result<(), FsckError> {
        self.check_request(block, buf.len())?;
        self.seek_to(block)
            .and_then(|_| self.file.write_all(buf))
            .map_err(|source| FsckError::Write { block, source })
    }

    fn flush(&mut self) -> Result<(), FsckError> {
        self.file.sync_all().map_err(FsckError::Flush)?;
        debug!(target: "vsfs::fsck::io", path = %self.path.display(), "image_synced");
        Ok(())
    }
}

#[cfg(unix)]
fn lock_exclusive(file: &File, path: &Path) -> Result<(), FsckError> {
    use std::os::unix::io::AsRawFd;

    // flock se libera solo al cerrar el descriptor
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Err(FsckError::Locked {
            path: path.to_path_buf(),
        })
    } else {
        Err(FsckError::Open {
            path: path.to_path_buf(),
            source: err,
        })
    }
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &File, path: &Path) -> Result<(), FsckError> {
    warn!(target: "vsfs::fsck::io", path = %path.display(), "advisory locking unavailable on this platform");
    Ok(())
}
