use vsp_groups::{ComponentGroup, ForceKind, MotionKind, Slot};
use vsp_solver::{
    FlowConditions, Mesh, Objective, OptimizationFunction, ReferenceGeometry, SolverSettings,
    VspSolver, WingBuilder,
};

fn rectangular_wing() -> Mesh {
    WingBuilder {
        span: 6.0,
        n_span: 8,
        n_chord: 2,
        ..WingBuilder::default()
    }
    .build()
    .unwrap()
}

fn reference() -> ReferenceGeometry {
    ReferenceGeometry {
        sref: 6.0,
        cref: 1.0,
        bref: 6.0,
        cg: [0.25, 0.0, 0.0],
    }
}

fn settings() -> SolverSettings {
    SolverSettings {
        reference: reference(),
        ..SolverSettings::default()
    }
}

#[test]
fn lift_is_linear_in_alpha_and_symmetric() {
    let mut solver = VspSolver::new(rectangular_wing(), Vec::new(), settings()).unwrap();
    let mut cl = Vec::new();
    for alpha in [2.0, 4.0] {
        let flow = FlowConditions {
            alpha_deg: alpha,
            ..FlowConditions::default()
        };
        let history = solver.solve(&flow).unwrap();
        let v = history.last().unwrap().vehicle;
        assert!(v.cs.abs() < 1e-10);
        assert!(v.moment[0].abs() < 1e-10);
        assert!(v.moment[2].abs() < 1e-10);
        cl.push(v.cl);
    }
    assert!((cl[1] / cl[0] - 2.0).abs() < 0.01, "{cl:?}");
}

#[test]
fn compressibility_raises_lift() {
    let mut solver = VspSolver::new(rectangular_wing(), Vec::new(), settings()).unwrap();
    let incompressible = FlowConditions {
        alpha_deg: 3.0,
        ..FlowConditions::default()
    };
    let compressible = FlowConditions {
        mach: 0.5,
        ..incompressible.clone()
    };
    let cl0 = solver.solve(&incompressible).unwrap().steps[0].vehicle.cl;
    let cl1 = solver.solve(&compressible).unwrap().steps[0].vehicle.cl;
    let pg = 1.0 / (1.0f64 - 0.25).sqrt();
    assert!((cl1 / cl0 - pg).abs() < 1e-9);
}

#[test]
fn viscous_estimate_adds_drag() {
    let mut solver = VspSolver::new(rectangular_wing(), Vec::new(), settings()).unwrap();
    let flow = FlowConditions {
        alpha_deg: 2.0,
        re_cref: 1.0e6,
        ..FlowConditions::default()
    };
    let v = solver.solve(&flow).unwrap().steps[0].vehicle;
    // 0.074 Re^-0.2 on both faces of the planform
    let cf = 0.074 * 1.0e6f64.powf(-0.2);
    assert!((v.cdo - 2.0 * cf).abs() < 1e-9, "cdo = {}", v.cdo);
}

#[test]
fn wing_load_objective_matches_group_span_load() {
    let mut group = ComponentGroup::new("wing");
    group.set_components(vec![0]);
    let mut solver = VspSolver::new(rectangular_wing(), vec![group], settings()).unwrap();
    let flow = FlowConditions {
        alpha_deg: 4.0,
        ..FlowConditions::default()
    };
    let history = solver.solve(&flow).unwrap();
    let step = history.last().unwrap();
    let model = solver.model_at(&flow, step).unwrap();

    let objective = Objective::new(OptimizationFunction::WingLoad, 0);
    let cl = objective.evaluate(&model, &step.gamma);
    assert_eq!(cl.len(), objective.length(&model));

    let span = solver.groups()[0].span_load(0).unwrap();
    for (a, b) in cl.iter().zip(&span.cl) {
        assert!((a - b).abs() < 1e-12);
    }
    // tip strips carry less than the root strips
    assert!(span.cl[0] < span.cl[3]);
}

#[test]
fn rotor_blade_rotates_and_produces_thrust() {
    let blade = WingBuilder {
        full_span: false,
        root_offset: 0.2,
        span: 1.0,
        root_chord: 0.15,
        tip_chord: 0.15,
        incidence_deg: 8.0,
        n_span: 6,
        n_chord: 1,
        ..WingBuilder::default()
    }
    .build()
    .unwrap();

    let mut rotor = ComponentGroup::new("rotor");
    rotor.set_components(vec![0]);
    rotor.is_fixed = false;
    rotor.is_rotor = true;
    rotor.axis = [0.0, 0.0, 1.0];
    rotor.omega = 2.0 * std::f64::consts::PI;
    rotor.rotor_diameter = 2.4;
    assert_eq!(rotor.motion_kind(), MotionKind::SteadyRate);

    let settings = SolverSettings {
        reference: ReferenceGeometry {
            sref: 0.15,
            cref: 0.15,
            bref: 1.0,
            cg: [0.0; 3],
        },
        unsteady: true,
        time_step: 0.01,
        number_of_time_steps: 4,
        ..SolverSettings::default()
    };
    let mut solver = VspSolver::new(blade, vec![rotor], settings).unwrap();
    let flow = FlowConditions {
        vinf: 20.0,
        ..FlowConditions::default()
    };
    let history = solver.solve(&flow).unwrap();
    assert_eq!(history.number_of_sampled_steps(), 4);

    let g = &solver.groups()[0];
    assert!((g.total_rotation_angle() - 4.0 * 0.01 * 2.0 * std::f64::consts::PI).abs() < 1e-12);
    assert!((g.total_quat().norm() - 1.0).abs() < 1e-12);
    assert_eq!(g.number_of_time_samples(), 4);
    assert!(!history.steps[3].frames[0].pose.is_identity());

    assert!(g.thrust(Slot::Instant) > 0.0);
    assert!(g.coefficients(ForceKind::Inviscid).ct.instant > 0.0);
    assert!(g.coefficients(ForceKind::Inviscid).ct.average > 0.0);
}
