use crate::error::FsckError;
use crate::fsck::fsck_backend::FsckBackend;

// -----------------------------------------------------------------------------
// Constantes y geometría de VSFS
// -----------------------------------------------------------------------------

pub const VSFS_BLOCK_SIZE: u32 = 4096;
pub const VSFS_TOTAL_BLOCKS: u32 = 64;
pub const VSFS_MAGIC: u16 = 0xD34D;
pub const VSFS_INODE_SIZE: u32 = 256;
pub const VSFS_DIRECT_POINTERS: usize = 12;

const INODE_RESERVED_LEN: usize = 156;

/// Geometría fija de la imagen. Todos los buffers se dimensionan a partir de
/// este registro, nunca de lo que diga un superblock posiblemente corrupto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub magic: u16,
    pub block_size: u32,
    pub total_blocks: u32,
    pub inode_bitmap_block: u32,
    pub data_bitmap_block: u32,
    pub inode_table_start: u32,
    pub inode_table_blocks: u32,
    pub first_data_block: u32,
    pub inode_size: u32,
}

impl Geometry {
    pub const VSFS: Geometry = Geometry {
        magic: VSFS_MAGIC,
        block_size: VSFS_BLOCK_SIZE,
        total_blocks: VSFS_TOTAL_BLOCKS,
        inode_bitmap_block: 1,
        data_bitmap_block: 2,
        inode_table_start: 3,
        inode_table_blocks: 5,
        first_data_block: 8,
        inode_size: VSFS_INODE_SIZE,
    };

    pub fn inodes_per_block(&self) -> u32 {
        self.block_size / self.inode_size
    }

    /// Cantidad de ranuras de inodo en la tabla (80 en VSFS).
    pub fn inode_count(&self) -> u32 {
        self.inodes_per_block() * self.inode_table_blocks
    }

    pub fn is_data_block(&self, block: u32) -> bool {
        block >= self.first_data_block && block < self.total_blocks
    }

    pub fn data_blocks(&self) -> std::ops::Range<u32> {
        self.first_data_block..self.total_blocks
    }

    pub fn image_len(&self) -> u64 {
        u64::from(self.total_blocks) * u64::from(self.block_size)
    }
}

// -----------------------------------------------------------------------------
// Lectura/escritura little-endian
// -----------------------------------------------------------------------------

fn read_le_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

fn read_le_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

fn write_le_u16(buf: &mut [u8], off: usize, val: u16) {
    buf[off..off + 2].copy_from_slice(&val.to_le_bytes());
}

fn write_le_u32(buf: &mut [u8], off: usize, val: u32) {
    buf[off..off + 4].copy_from_slice(&val.to_le_bytes());
}

// -------------------- Estructuras en disco --------------------

/// Superblock tal como vive en el bloque 0. El magic es de 16 bits y va
/// seguido de 2 bytes de alineación; el resto del bloque es relleno en cero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuperblockDisk {
    pub magic: u16,
    pub block_size: u32,
    pub total_blocks: u32,
    pub inode_bitmap_block: u32,
    pub data_bitmap_block: u32,
    pub inode_table_start: u32,
    pub first_data_block: u32,
    pub inode_size: u32,
    pub inode_count: u32,
}

impl SuperblockDisk {
    pub const ENCODED_LEN: usize = 36;

    /// Superblock correcto para la geometría dada.
    pub fn fresh(geo: &Geometry) -> Self {
        Self {
            magic: geo.magic,
            block_size: geo.block_size,
            total_blocks: geo.total_blocks,
            inode_bitmap_block: geo.inode_bitmap_block,
            data_bitmap_block: geo.data_bitmap_block,
            inode_table_start: geo.inode_table_start,
            first_data_block: geo.first_data_block,
            inode_size: geo.inode_size,
            inode_count: geo.inode_count(),
        }
    }

    pub fn decode(buf: &[u8]) -> Self {
        Self {
            magic: read_le_u16(buf, 0),
            block_size: read_le_u32(buf, 4),
            total_blocks: read_le_u32(buf, 8),
            inode_bitmap_block: read_le_u32(buf, 12),
            data_bitmap_block: read_le_u32(buf, 16),
            inode_table_start: read_le_u32(buf, 20),
            first_data_block: read_le_u32(buf, 24),
            inode_size: read_le_u32(buf, 28),
            inode_count: read_le_u32(buf, 32),
        }
    }

    /// Serializa a un bloque completo, con todo el relleno en cero.
    pub fn encode(&self, block_size: usize) -> Vec<u8> {
        let mut buf = vec![0u8; block_size];
        write_le_u16(&mut buf, 0, self.magic);
        write_le_u32(&mut buf, 4, self.block_size);
        write_le_u32(&mut buf, 8, self.total_blocks);
        write_le_u32(&mut buf, 12, self.inode_bitmap_block);
        write_le_u32(&mut buf, 16, self.data_bitmap_block);
        write_le_u32(&mut buf, 20, self.inode_table_start);
        write_le_u32(&mut buf, 24, self.first_data_block);
        write_le_u32(&mut buf, 28, self.inode_size);
        write_le_u32(&mut buf, 32, self.inode_count);
        buf
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InodeDisk {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    pub atime: u32,
    pub ctime: u32,
    pub mtime: u32,
    pub dtime: u32,
    pub links_count: u32,
    pub blocks_count: u32,
    pub direct: [u32; VSFS_DIRECT_POINTERS],
    // Los indirectos se conservan tal cual; ninguna pasada los revisa.
    pub single_indirect: u32,
    pub double_indirect: u32,
    pub triple_indirect: u32,
    pub reserved: [u8; INODE_RESERVED_LEN],
}

impl Default for InodeDisk {
    fn default() -> Self {
        Self {
            mode: 0,
            uid: 0,
            gid: 0,
            size: 0,
            atime: 0,
            ctime: 0,
            mtime: 0,
            dtime: 0,
            links_count: 0,
            blocks_count: 0,
            direct: [0u32; VSFS_DIRECT_POINTERS],
            single_indirect: 0,
            double_indirect: 0,
            triple_indirect: 0,
            reserved: [0u8; INODE_RESERVED_LEN],
        }
    }
}

impl InodeDisk {
    pub const ENCODED_LEN: usize = VSFS_INODE_SIZE as usize;

    /// Un inodo está en uso si tiene enlaces y nunca fue borrado.
    pub fn is_valid(&self) -> bool {
        self.links_count > 0 && self.dtime == 0
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut direct = [0u32; VSFS_DIRECT_POINTERS];
        for (i, ptr) in direct.iter_mut().enumerate() {
            *ptr = read_le_u32(buf, 40 + i * 4);
        }
        let mut reserved = [0u8; INODE_RESERVED_LEN];
        reserved.copy_from_slice(&buf[100..100 + INODE_RESERVED_LEN]);

        Self {
            mode: read_le_u32(buf, 0),
            uid: read_le_u32(buf, 4),
            gid: read_le_u32(buf, 8),
            size: read_le_u32(buf, 12),
            atime: read_le_u32(buf, 16),
            ctime: read_le_u32(buf, 20),
            mtime: read_le_u32(buf, 24),
            dtime: read_le_u32(buf, 28),
            links_count: read_le_u32(buf, 32),
            blocks_count: read_le_u32(buf, 36),
            direct,
            single_indirect: read_le_u32(buf, 88),
            double_indirect: read_le_u32(buf, 92),
            triple_indirect: read_le_u32(buf, 96),
            reserved,
        }
    }

    pub fn encode_into(&self, buf: &mut [u8]) {
        write_le_u32(buf, 0, self.mode);
        write_le_u32(buf, 4, self.uid);
        write_le_u32(buf, 8, self.gid);
        write_le_u32(buf, 12, self.size);
        write_le_u32(buf, 16, self.atime);
        write_le_u32(buf, 20, self.ctime);
        write_le_u32(buf, 24, self.mtime);
        write_le_u32(buf, 28, self.dtime);
        write_le_u32(buf, 32, self.links_count);
        write_le_u32(buf, 36, self.blocks_count);
        for (i, ptr) in self.direct.iter().enumerate() {
            write_le_u32(buf, 40 + i * 4, *ptr);
        }
        write_le_u32(buf, 88, self.single_indirect);
        write_le_u32(buf, 92, self.double_indirect);
        write_le_u32(buf, 96, self.triple_indirect);
        buf[100..100 + INODE_RESERVED_LEN].copy_from_slice(&self.reserved);
    }

    /// Suelta el puntero directo `slot`: lo pone en 0, descuenta un bloque y
    /// recorta el tamaño si ya no cabe en los bloques que le quedan.
    pub fn drop_direct(&mut self, slot: usize, block_size: u32) {
        self.direct[slot] = 0;
        self.blocks_count = self.blocks_count.saturating_sub(1);
        let limit = u64::from(self.blocks_count) * u64::from(block_size);
        if u64::from(self.size) > limit {
            // limit < size <= u32::MAX, así que cabe en u32
            self.size = limit as u32;
        }
    }
}

/// Bitmap de un bloque: bit i -> byte i/8, bit i%8; 1 = asignado.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    bytes: Vec<u8>,
}

impl Bitmap {
    #[cfg(test)]
    pub(crate) fn new(len_bytes: usize) -> Self {
        Self {
            bytes: vec![0u8; len_bytes],
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn get(&self, idx: u32) -> bool {
        let idx = idx as usize;
        (self.bytes[idx / 8] >> (idx % 8)) & 1 == 1
    }

    pub fn set(&mut self, idx: u32, value: bool) {
        let idx = idx as usize;
        let mask = 1u8 << (idx % 8);
        if value {
            self.bytes[idx / 8] |= mask;
        } else {
            self.bytes[idx / 8] &= !mask;
        }
    }
}

// -----------------------------------------------------------------------------
// Metadatos en memoria
// -----------------------------------------------------------------------------

/// Todo lo que el fsck necesita de la imagen, cargado una sola vez.
#[derive(Clone, Debug)]
pub struct Metadata {
    pub geometry: Geometry,
    pub superblock: SuperblockDisk,
    pub inode_bitmap: Bitmap,
    pub data_bitmap: Bitmap,
    pub inodes: Vec<InodeDisk>,
}

impl Metadata {
    /// Lee superblock, ambos bitmaps y la tabla de inodos completa.
    pub fn load<B: FsckBackend + ?Sized>(backend: &mut B, geo: Geometry) -> Result<Self, FsckError> {
        let block_size = geo.block_size as usize;
        let mut buf = vec![0u8; block_size];

        backend.read_block(0, &mut buf)?;
        let superblock = SuperblockDisk::decode(&buf);

        backend.read_block(geo.inode_bitmap_block, &mut buf)?;
        let inode_bitmap = Bitmap::from_bytes(buf.clone());

        backend.read_block(geo.data_bitmap_block, &mut buf)?;
        let data_bitmap = Bitmap::from_bytes(buf.clone());

        let inode_size = geo.inode_size as usize;
        let mut inodes = Vec::with_capacity(geo.inode_count() as usize);
        for i in 0..geo.inode_table_blocks {
            backend.read_block(geo.inode_table_start + i, &mut buf)?;
            for chunk in buf.chunks_exact(inode_size) {
                inodes.push(InodeDisk::decode(chunk));
            }
        }

        Ok(Self {
            geometry: geo,
            superblock,
            inode_bitmap,
            data_bitmap,
            inodes,
        })
    }

    pub fn write_superblock<B: FsckBackend + ?Sized>(&self, backend: &mut B) -> Result<(), FsckError> {
        let buf = self.superblock.encode(self.geometry.block_size as usize);
        backend.write_block(0, &buf)
    }

    /// Reescribe ambos bitmaps y la tabla de inodos entera.
    pub fn write_tables<B: FsckBackend + ?Sized>(&self, backend: &mut B) -> Result<(), FsckError> {
        let geo = &self.geometry;
        backend.write_block(geo.inode_bitmap_block, self.inode_bitmap.as_bytes())?;
        backend.write_block(geo.data_bitmap_block, self.data_bitmap.as_bytes())?;

        let block_size = geo.block_size as usize;
        let inode_size = geo.inode_size as usize;
        let per_block = geo.inodes_per_block() as usize;

        for (i, group) in self.inodes.chunks(per_block).enumerate() {
            let mut buf = vec![0u8; block_size];
            for (j, inode) in group.iter().enumerate() {
                inode.encode_into(&mut buf[j * inode_size..(j + 1) * inode_size]);
            }
            backend.write_block(geo.inode_table_start + i as u32, &buf)?;
        }
        Ok(())
    }
}

/// Escribe una imagen VSFS vacía: superblock correcto, bitmaps limpios y
/// todo lo demás en cero.
pub fn format_image<B: FsckBackend + ?Sized>(backend: &mut B, geo: &Geometry) -> Result<(), FsckError> {
    let block_size = geo.block_size as usize;
    let zero_block = vec![0u8; block_size];

    backend.write_block(0, &SuperblockDisk::fresh(geo).encode(block_size))?;
    for block in 1..geo.total_blocks {
        backend.write_block(block, &zero_block)?;
    }
    backend.flush()
}
