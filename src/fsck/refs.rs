use crate::fs::{Geometry, InodeDisk};

/// Tabla de referencias a bloques de datos. Se deriva de los inodos válidos
/// y nunca se persiste.
#[derive(Debug, Clone)]
pub struct BlockRefs {
    counts: Vec<u32>,
    // (inodo, ranura) del primer puntero que reclamó cada bloque
    first_claim: Vec<Option<(u32, usize)>>,
}

impl BlockRefs {
    /// Recorre los punteros directos de cada inodo válido, en orden de índice.
    /// Sólo cuenta punteros dentro de [first_data_block, total_blocks); los
    /// demás quedan para la pasada de punteros inválidos.
    pub fn scan(inodes: &[InodeDisk], geo: &Geometry) -> Self {
        let total = geo.total_blocks as usize;
        let mut refs = Self {
            counts: vec![0; total],
            first_claim: vec![None; total],
        };

        for (ino, inode) in inodes.iter().enumerate() {
            if !inode.is_valid() {
                continue;
            }
            for (slot, &blk) in inode.direct.iter().enumerate() {
                if !geo.is_data_block(blk) {
                    continue;
                }
                let b = blk as usize;
                refs.counts[b] += 1;
                if refs.first_claim[b].is_none() {
                    refs.first_claim[b] = Some((ino as u32, slot));
                }
            }
        }
        refs
    }

    pub fn count(&self, block: u32) -> u32 {
        self.counts.get(block as usize).copied().unwrap_or(0)
    }

    pub fn is_referenced(&self, block: u32) -> bool {
        self.count(block) > 0
    }

    pub fn first_claim(&self, block: u32) -> Option<(u32, usize)> {
        self.first_claim.get(block as usize).copied().flatten()
    }
}
