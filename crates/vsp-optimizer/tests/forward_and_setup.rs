use std::path::PathBuf;
use vsp_groups::{ComponentGroup, ForceKind, write_groups};
use vsp_optimizer::{OptimizerError, VspOptimizer};
use vsp_solver::WingBuilder;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("vsp_optimizer_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_case(dir: &PathBuf, with_groups: bool) -> PathBuf {
    let mesh = WingBuilder {
        span: 6.0,
        n_span: 4,
        n_chord: 2,
        ..WingBuilder::default()
    }
    .build()
    .unwrap();
    mesh.write(&dir.join("wing.vspmesh")).unwrap();

    let mut text = String::from(
        "# two-point sweep\n\
         Sref = 6\n\
         Cref = 1\n\
         Bref = 6\n\
         Mach = 0.2, 0.4\n\
         AoA = 3\n\
         ReCref = 1e6\n\
         Mesh = wing.vspmesh\n\
         Objective = CL\n\
         Objective = CD, 0, 1\n\
         Objective = WING_LOAD, 0, 1\n",
    );
    if with_groups {
        let mut wing = ComponentGroup::new("wing");
        wing.set_components(vec![0]);
        let mut out = Vec::new();
        write_groups(&mut out, &[wing]).unwrap();
        std::fs::write(dir.join("wing.groups"), out).unwrap();
        text.push_str("GroupFile = wing.groups\n");
    }
    let path = dir.join("wing.case");
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn setup_reads_case_mesh_and_groups() {
    let dir = scratch("setup");
    let case = write_case(&dir, true);
    let mut opt = VspOptimizer::setup(&case).unwrap();

    assert_eq!(opt.number_of_run_cases(), 2);
    assert_eq!(opt.number_of_optimization_functions(), 3);
    assert_eq!(opt.number_of_nodes(), 5 * 3);
    assert_eq!(opt.number_of_loops(), 8);
    assert_eq!(opt.run_case(1).unwrap().mach, 0.4);

    opt.solve_forward().unwrap();
    // Prandtl-Glauert raises lift at the faster run case
    let cl_slow = opt.histories().unwrap()[0].last().unwrap().vehicle.cl;
    let cl_fast = opt.histories().unwrap()[1].last().unwrap().vehicle.cl;
    assert!(cl_fast > cl_slow);
    assert!(cl_slow > 0.0);

    assert_eq!(opt.groups().len(), 1);
    let group_cl = opt.groups()[0].coefficients(ForceKind::Inviscid).cl.instant;
    assert!(group_cl > 0.0);
    assert!(!opt.groups()[0].span_loads().is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn adjoint_does_not_disturb_forward_values() {
    let dir = scratch("stable");
    let case = write_case(&dir, false);
    let mut opt = VspOptimizer::setup(&case).unwrap();
    opt.solve_forward().unwrap();
    let before: Vec<Vec<f64>> = (0..3).map(|c| opt.case_function_values(c).unwrap()).collect();

    opt.solve_adjoint().unwrap();
    let after: Vec<Vec<f64>> = (0..3).map(|c| opt.case_function_values(c).unwrap()).collect();
    assert_eq!(before, after);
    assert_eq!(opt.case_function_gradients(0).unwrap().len(), 3 * 15);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn setup_rejects_bad_files() {
    let dir = scratch("bad");

    let unknown = dir.join("unknown.case");
    std::fs::write(&unknown, "Sref = 1\nWingspan = 3\n").unwrap();
    match VspOptimizer::setup(&unknown) {
        Err(OptimizerError::CaseFile { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected a case-file error, got {other:?}"),
    }

    let no_mesh = dir.join("nomesh.case");
    std::fs::write(&no_mesh, "Sref = 1\nObjective = CL\n").unwrap();
    assert!(matches!(
        VspOptimizer::setup(&no_mesh),
        Err(OptimizerError::Config(_))
    ));

    assert!(matches!(
        VspOptimizer::setup(&dir.join("missing.case")),
        Err(OptimizerError::FileRead { .. })
    ));

    let _ = std::fs::remove_dir_all(&dir);
}
