/*Tipos compartidos del fsck:
FsckOptions (configuración de la corrida)
Stage / Category (en qué fase y de qué tipo es cada diagnóstico)
FsckReport (donde se acumulan diagnósticos y contadores) */

use tracing::debug;

use crate::fs::Geometry;

#[derive(Debug, Clone, Copy)]
pub struct FsckOptions {
    pub geometry: Geometry,
    /// Si es false, sólo se valida y nunca se escribe la imagen.
    pub repair: bool,
}

impl Default for FsckOptions {
    fn default() -> Self {
        Self {
            geometry: Geometry::VSFS,
            repair: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Check,
    Repair,
    Recheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Superblock,
    InodeBitmap,
    DataBitmap,
    Duplicate,
    BadPointer,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub stage: Stage,
    pub category: Category,
    pub message: String,
}

#[derive(Debug)]
pub struct FsckReport {
    stage: Stage,
    pub diagnostics: Vec<Diagnostic>,
    pub errors_before: u32,
    pub fixes_applied: u32,
    pub errors_after: u32,
    pub superblock_rewritten: bool,
}

impl FsckReport {
    pub fn new() -> Self {
        Self {
            stage: Stage::Check,
            diagnostics: Vec::new(),
            errors_before: 0,
            fixes_applied: 0,
            errors_after: 0,
            superblock_rewritten: false,
        }
    }

    /// Fase en la que está (o quedó) la corrida.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn enter(&mut self, stage: Stage) {
        self.stage = stage;
    }

    /// Registra un diagnóstico en la fase actual.
    pub fn note(&mut self, category: Category, message: String) {
        debug!(target: "vsfs::fsck", stage = ?self.stage, category = ?category, "{message}");
        self.diagnostics.push(Diagnostic {
            stage: self.stage,
            category,
            message,
        });
    }

    pub fn messages(&self, stage: Stage) -> impl Iterator<Item = &str> {
        self.diagnostics
            .iter()
            .filter(move |d| d.stage == stage)
            .map(|d| d.message.as_str())
    }

    pub fn count(&self, stage: Stage, category: Category) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.stage == stage && d.category == category)
            .count()
    }

    /// "Errores encontrados inicialmente": errores previos + arreglos aplicados.
    pub fn total_initial(&self) -> u32 {
        self.errors_before + self.fixes_applied
    }

    pub fn is_clean(&self) -> bool {
        self.errors_after == 0
    }
}

impl Default for FsckReport {
    fn default() -> Self {
        Self::new()
    }
}
