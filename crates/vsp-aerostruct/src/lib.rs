//! Aero-structural bridge: tracks the aerodynamic load file, the selected
//! FEA structure and the file chain of an external structural solve.

pub mod catalog;
pub mod error;
pub mod manager;
pub mod process;
pub mod settings;
pub mod tools;

pub use catalog::{FeaCatalog, StaticCatalog, StructureKind};
pub use error::{AeroStructError, AeroStructResult};
pub use manager::AeroStructManager;
pub use process::{ProcessReport, pretty_cmd, run_monitored};
pub use settings::AeroStructSettings;
pub use tools::{Tool, executable_name};
