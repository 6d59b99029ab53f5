//! Content-based run ids.

use sha2::{Digest, Sha256};
use vsp_optimizer::CaseConfig;
use vsp_solver::Mesh;

use crate::ResultsResult;

/// SHA-256 over the case configuration, the mesh text and the solver
/// version. Paths in the configuration are ignored so that moving a case
/// directory keeps its id.
pub fn compute_run_id(config: &CaseConfig, mesh: &Mesh, solver_version: &str) -> ResultsResult<String> {
    let mut hasher = Sha256::new();

    let mut config = config.clone();
    config.mesh = None;
    config.group_file = None;
    hasher.update(serde_json::to_string(&config)?.as_bytes());
    hasher.update(mesh.to_text().as_bytes());
    hasher.update(solver_version.as_bytes());

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vsp_solver::WingBuilder;

    fn mesh(n_span: usize) -> Mesh {
        WingBuilder {
            n_span,
            n_chord: 1,
            ..WingBuilder::default()
        }
        .build()
        .unwrap()
    }

    #[test]
    fn hash_stability() {
        let config = CaseConfig::default();
        let a = compute_run_id(&config, &mesh(4), "v1").unwrap();
        let b = compute_run_id(&config, &mesh(4), "v1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut moved = config.clone();
        moved.mesh = Some(PathBuf::from("/elsewhere/wing.vspmesh"));
        assert_eq!(compute_run_id(&moved, &mesh(4), "v1").unwrap(), a);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let config = CaseConfig::default();
        let base = compute_run_id(&config, &mesh(4), "v1").unwrap();

        let mut alpha = config.clone();
        alpha.alpha_deg = vec![7.5];
        assert_ne!(compute_run_id(&alpha, &mesh(4), "v1").unwrap(), base);
        assert_ne!(compute_run_id(&config, &mesh(6), "v1").unwrap(), base);
        assert_ne!(compute_run_id(&config, &mesh(4), "v2").unwrap(), base);
    }
}
