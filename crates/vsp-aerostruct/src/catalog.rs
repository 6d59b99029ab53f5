//! Source of FEA structures and assemblies known to the host application.

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    Structure,
    Assembly,
}

/// Structures and assemblies with the CalculiX mesh file each exports to.
pub trait FeaCatalog {
    fn structure_ids(&self) -> Vec<String>;
    fn assembly_ids(&self) -> Vec<String>;
    /// Exported mesh file of a structure or assembly, `None` if the id is
    /// unknown.
    fn mesh_file(&self, kind: StructureKind, id: &str) -> Option<PathBuf>;
}

/// Catalog backed by fixed lists.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    pub structures: Vec<(String, PathBuf)>,
    pub assemblies: Vec<(String, PathBuf)>,
}

impl StaticCatalog {
    pub fn with_structure(mut self, id: impl Into<String>, mesh: impl Into<PathBuf>) -> Self {
        self.structures.push((id.into(), mesh.into()));
        self
    }

    pub fn with_assembly(mut self, id: impl Into<String>, mesh: impl Into<PathBuf>) -> Self {
        self.assemblies.push((id.into(), mesh.into()));
        self
    }
}

impl FeaCatalog for StaticCatalog {
    fn structure_ids(&self) -> Vec<String> {
        self.structures.iter().map(|(id, _)| id.clone()).collect()
    }

    fn assembly_ids(&self) -> Vec<String> {
        self.assemblies.iter().map(|(id, _)| id.clone()).collect()
    }

    fn mesh_file(&self, kind: StructureKind, id: &str) -> Option<PathBuf> {
        let list = match kind {
            StructureKind::Structure => &self.structures,
            StructureKind::Assembly => &self.assemblies,
        };
        list.iter().find(|(i, _)| i == id).map(|(_, p)| p.clone())
    }
}
