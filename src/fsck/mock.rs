/*Backend en memoria. Guarda la imagen completa en un Vec<u8> y permite
inyectar fallas de lectura o escritura en un bloque concreto. Lo usan las
pruebas del fsck para no tocar el disco. */

use std::io;

use super::fsck_backend::FsckBackend;
use crate::error::FsckError;
use crate::fs::Geometry;

pub struct MockBackend {
    pub image: Vec<u8>,
    pub block_size: u32,
    pub total_blocks: u32,
    pub fail_read: Option<u32>,
    pub fail_write: Option<u32>,
    pub writes: Vec<u32>,
}

impl MockBackend {
    pub fn new(geo: &Geometry) -> Self {
        Self {
            image: vec![0u8; geo.image_len() as usize],
            block_size: geo.block_size,
            total_blocks: geo.total_blocks,
            fail_read: None,
            fail_write: None,
            writes: Vec::new(),
        }
    }

    pub fn block(&self, block: u32) -> &[u8] {
        let bs = self.block_size as usize;
        let start = block as usize * bs;
        &self.image[start..start + bs]
    }

    pub fn block_mut(&mut self, block: u32) -> &mut [u8] {
        let bs = self.block_size as usize;
        let start = block as usize * bs;
        &mut self.image[start..start + bs]
    }
}

impl FsckBackend for MockBackend {
    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn total_blocks(&self) -> u32 {
        self.total_blocks
    }

    fn read_block(&mut self, block: u32, buf: &mut [u8]) -> Result<(), FsckError> {
        self.check_request(block, buf.len())?;
        if self.fail_read == Some(block) {
            return Err(FsckError::Read {
                block,
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "injected short read"),
            });
        }
        buf.copy_from_slice(self.block(block));
        Ok(())
    }

    fn write_block(&mut self, block: u32, buf: &[u8]) -> Result<(), FsckError> {
        self.check_request(block, buf.len())?;
        if self.fail_write == Some(block) {
            return Err(FsckError::Write {
                block,
                source: io::Error::new(io::ErrorKind::WriteZero, "injected short write"),
            });
        }
        self.block_mut(block).copy_from_slice(buf);
        self.writes.push(block);
        Ok(())
    }
}
