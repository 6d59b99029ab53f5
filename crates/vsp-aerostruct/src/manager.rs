//! Aero-structural state: aerodynamic load file, structure selection and the
//! derived FEA file chain.
//!
//! Every path in the chain is derived from its predecessor and is only
//! considered when the predecessor exists on disk:
//! mesh file → `<mesh base>.static.inp` → `<input base>.frd`.

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::catalog::{FeaCatalog, StructureKind};
use crate::error::{AeroStructError, AeroStructResult};
use crate::process::{ProcessReport, run_monitored};
use crate::settings::AeroStructSettings;
use crate::tools::Tool;

pub const DEFAULT_LOADS_CMD: &str = "vsploads";

/// A path plus whether it was found on the last refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedFile {
    pub path: Option<PathBuf>,
    pub found: bool,
}

impl TrackedFile {
    fn probe(path: Option<PathBuf>) -> Self {
        let found = path.as_deref().is_some_and(Path::is_file);
        Self { path, found }
    }

    /// Path of a file that was found.
    pub fn existing(&self) -> Option<&Path> {
        if self.found { self.path.as_deref() } else { None }
    }
}

/// Path without its last extension, as passed to the external tools.
pub fn basename(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// `<basename><suffix>`, keeping any inner dots of the stem.
pub fn derived(path: &Path, suffix: &str) -> PathBuf {
    let mut name = basename(path).into_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

pub const INPUT_SUFFIX: &str = ".static.inp";
pub const SOLUTION_SUFFIX: &str = ".frd";

#[derive(Debug, Clone)]
pub struct AeroStructManager {
    pub settings: AeroStructSettings,
    adb: TrackedFile,
    /// `(kind, id)` of every structure followed by every assembly
    entries: Vec<(StructureKind, String)>,
    fea_mesh: TrackedFile,
    fea_input: TrackedFile,
    fea_solution: TrackedFile,
    ccx: Tool,
    cgx: Tool,
    loads: Tool,
}

impl Default for AeroStructManager {
    fn default() -> Self {
        Self::new(AeroStructSettings::default())
    }
}

impl AeroStructManager {
    pub fn new(settings: AeroStructSettings) -> Self {
        Self {
            settings,
            adb: TrackedFile::default(),
            entries: Vec::new(),
            fea_mesh: TrackedFile::default(),
            fea_input: TrackedFile::default(),
            fea_solution: TrackedFile::default(),
            ccx: Tool::new("ccx"),
            cgx: Tool::new("cgx"),
            loads: Tool::new(DEFAULT_LOADS_CMD),
        }
    }

    /// Aerodynamic database written by the aerodynamic solve.
    pub fn set_adb_file(&mut self, path: impl Into<PathBuf>) {
        self.adb = TrackedFile::probe(Some(path.into()));
    }

    pub fn adb_file(&self) -> &TrackedFile {
        &self.adb
    }

    pub fn fea_mesh_file(&self) -> &TrackedFile {
        &self.fea_mesh
    }

    pub fn fea_input_file(&self) -> &TrackedFile {
        &self.fea_input
    }

    pub fn fea_solution_file(&self) -> &TrackedFile {
        &self.fea_solution
    }

    /// Structures followed by assemblies, as of the last [`update`](Self::update).
    pub fn entries(&self) -> &[(StructureKind, String)] {
        &self.entries
    }

    pub fn selected(&self) -> Option<&(StructureKind, String)> {
        self.settings.selection().and_then(|i| self.entries.get(i))
    }

    pub fn ccx(&self) -> &Tool {
        &self.ccx
    }

    pub fn cgx(&self) -> &Tool {
        &self.cgx
    }

    pub fn loads_tool(&self) -> &Tool {
        &self.loads
    }

    /// Program used for load transfer, typically next to the aerodynamic
    /// solver.
    pub fn set_loads_tool(&mut self, cmd: impl Into<String>, dir: Option<PathBuf>) {
        self.loads = Tool {
            cmd: cmd.into(),
            dir,
            found: true,
        };
    }

    pub fn find_ccx(&mut self, dir: Option<&Path>) -> bool {
        self.ccx = Tool::locate("ccx", dir);
        self.ccx.found
    }

    pub fn find_cgx(&mut self, dir: Option<&Path>) -> bool {
        self.cgx = Tool::locate("cgx", dir);
        self.cgx.found
    }

    /// Rebuild the structure list from `catalog`, clamp the selection and
    /// re-derive the file chain.
    pub fn update(&mut self, catalog: &dyn FeaCatalog) {
        if let Some(path) = self.adb.path.take() {
            self.adb = TrackedFile::probe(Some(path));
        }

        self.entries = catalog
            .structure_ids()
            .into_iter()
            .map(|id| (StructureKind::Structure, id))
            .chain(
                catalog
                    .assembly_ids()
                    .into_iter()
                    .map(|id| (StructureKind::Assembly, id)),
            )
            .collect();

        let in_range = self
            .settings
            .selection()
            .is_some_and(|i| i < self.entries.len());
        if !in_range {
            self.settings.set_current_struct_assy_index(-1);
        }

        let mesh = self
            .selected()
            .and_then(|(kind, id)| catalog.mesh_file(*kind, id));
        self.fea_mesh = TrackedFile::probe(mesh);
        self.refresh_chain();
    }

    /// Re-derive the input and solution files from the current mesh file.
    pub fn refresh_chain(&mut self) {
        if let Some(path) = self.fea_mesh.path.clone() {
            self.fea_mesh = TrackedFile::probe(Some(path));
        }
        let input = self
            .fea_mesh
            .existing()
            .map(|mesh| derived(mesh, INPUT_SUFFIX));
        self.fea_input = TrackedFile::probe(input);
        let solution = self
            .fea_input
            .existing()
            .map(|input| derived(input, SOLUTION_SUFFIX));
        self.fea_solution = TrackedFile::probe(solution);
    }

    /// Arguments of the load-transfer program.
    pub fn transfer_args(&self) -> AeroStructResult<Vec<String>> {
        let adb = self.adb.path.as_deref().ok_or(AeroStructError::MissingInput {
            what: "aerodynamic database file",
        })?;
        let mesh = self.fea_mesh.path.as_deref().ok_or(AeroStructError::MissingInput {
            what: "FEA mesh file",
        })?;
        Ok(vec![
            "-interp".to_string(),
            basename(adb).display().to_string(),
            basename(mesh).display().to_string(),
            "-dynp".to_string(),
            format!("{:.6}", self.settings.dynamic_pressure),
        ])
    }

    /// Interpolate aerodynamic pressures onto the FEA mesh, writing the
    /// structural input deck.
    pub fn transfer_loads(&mut self, log: Option<&mut dyn Write>) -> AeroStructResult<ProcessReport> {
        let args = self.transfer_args()?;
        let artifact = self
            .fea_mesh
            .path
            .as_deref()
            .map(|mesh| derived(mesh, INPUT_SUFFIX));
        info!(dynamic_pressure = self.settings.dynamic_pressure, "transferring loads");
        let report = run_monitored(&self.loads.program(), &args, None, log, artifact.as_deref())?;
        self.refresh_chain();
        Ok(report)
    }

    /// Run CalculiX on the structural input deck.
    pub fn compute_structure(&mut self, log: Option<&mut dyn Write>) -> AeroStructResult<ProcessReport> {
        let input = self
            .fea_input
            .existing()
            .ok_or(AeroStructError::MissingInput {
                what: "FEA input file",
            })?
            .to_path_buf();
        if !self.ccx.found {
            warn!("ccx was not found, launching it from PATH anyway");
        }
        let base = basename(&input);
        let artifact = derived(&input, SOLUTION_SUFFIX);
        let report = run_monitored(
            &self.ccx.program(),
            &[base.display().to_string()],
            None,
            log,
            Some(&artifact),
        )?;
        self.refresh_chain();
        Ok(report)
    }
}
