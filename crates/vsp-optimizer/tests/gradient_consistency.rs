//! Adjoint gradients against central differences of re-solved cases.

use vsp_groups::ComponentGroup;
use vsp_optimizer::{CaseConfig, ObjectiveDef, VspOptimizer};
use vsp_solver::{InputVariable, Mesh, WingBuilder};

fn swept_wing() -> Mesh {
    WingBuilder {
        span: 5.0,
        root_chord: 1.2,
        tip_chord: 0.6,
        sweep_le_deg: 20.0,
        dihedral_deg: 4.0,
        n_span: 4,
        n_chord: 2,
        ..WingBuilder::default()
    }
    .build()
    .unwrap()
}

fn config(functions: &[(&str, usize)]) -> CaseConfig {
    CaseConfig {
        sref: 4.5,
        cref: 0.9,
        bref: 5.0,
        cg: [0.4, 0.0, 0.0],
        mach: vec![0.3],
        alpha_deg: vec![4.0],
        beta_deg: vec![2.0],
        re_cref: vec![2.0e6],
        cl_target: 0.3,
        objectives: functions
            .iter()
            .map(|(f, set)| ObjectiveDef {
                function: f.to_string(),
                set: *set,
                case: 0,
            })
            .collect(),
        ..CaseConfig::default()
    }
}

/// Central difference of `contract` for every function in `opt` with
/// respect to node coordinate `k`.
fn fd_mesh(opt: &mut VspOptimizer, k: usize, h: f64, contract: &dyn Fn(&VspOptimizer, usize) -> f64) -> Vec<f64> {
    let base = opt.solver().mesh().coordinates();
    let n = opt.number_of_optimization_functions();
    let mut eval = |x: f64| {
        let mut xyz = base.clone();
        xyz[k] = x;
        opt.update_geometry(&xyz).unwrap();
        opt.solve_forward().unwrap();
        let o: &VspOptimizer = opt;
        (0..n).map(|c| contract(o, c)).collect::<Vec<_>>()
    };
    let plus = eval(base[k] + h);
    let minus = eval(base[k] - h);
    opt.update_geometry(&base).unwrap();
    plus.iter()
        .zip(&minus)
        .map(|(p, m)| (p - m) / (2.0 * h))
        .collect()
}

fn assert_close(ad: f64, fd: f64, what: &str) {
    let tol = 1e-5 * fd.abs().max(1e-3);
    assert!((ad - fd).abs() < tol, "{what}: adjoint {ad} vs difference {fd}");
}

#[test]
fn scalar_coefficient_gradients_match_differences() {
    let functions = [("CL", 0), ("CD", 0), ("CS", 0), ("CMy", 0), ("CMz", 0)];
    let mut opt = VspOptimizer::from_parts(config(&functions), swept_wing(), Vec::new()).unwrap();
    opt.solve().unwrap();
    let grads: Vec<Vec<f64>> = (0..functions.len())
        .map(|c| opt.case_function_gradients(c).unwrap())
        .collect();

    // tip leading edge z, a mid-span trailing edge x and an interior y
    for k in [2, 3 * 7, 3 * 4 + 1] {
        let fd = fd_mesh(&mut opt, k, 1e-6, &|o, c| o.case_function_value(c).unwrap());
        for (c, (name, _)) in functions.iter().enumerate() {
            assert_close(grads[c][k], fd[c], &format!("{name} wrt coordinate {k}"));
        }
    }
}

#[test]
fn weighted_wing_load_gradient_matches_difference() {
    let mut opt =
        VspOptimizer::from_parts(config(&[("WING_LOAD", 0), ("CD_CL_CM", 0)]), swept_wing(), Vec::new())
            .unwrap();
    opt.solve_forward().unwrap();
    let w_load = [0.5, -1.0, 2.0, 0.25];
    let w_trim = [1.0, 3.0, -2.0];
    opt.set_gradient_vector(0, &w_load).unwrap();
    opt.set_gradient_vector(1, &w_trim).unwrap();
    opt.solve_adjoint().unwrap();
    let g_load = opt.case_function_gradients(0).unwrap();
    let g_trim = opt.case_function_gradients(1).unwrap();

    let contract = |o: &VspOptimizer, c: usize| {
        let w: &[f64] = if c == 0 { &w_load } else { &w_trim };
        o.case_function_values(c)
            .unwrap()
            .iter()
            .zip(w)
            .map(|(v, w)| v * w)
            .sum()
    };
    for k in [5, 3 * 9 + 2] {
        let fd = fd_mesh(&mut opt, k, 1e-6, &contract);
        assert_close(g_load[k], fd[0], "WING_LOAD");
        assert_close(g_trim[k], fd[1], "CD_CL_CM");
    }
}

#[test]
fn input_variable_derivatives_match_differences() {
    let mut opt = VspOptimizer::from_parts(config(&[("CL", 0), ("CD", 0)]), swept_wing(), Vec::new())
        .unwrap();
    opt.solve().unwrap();

    let cases: [(InputVariable, f64, fn(&mut VspOptimizer, f64)); 4] = [
        (InputVariable::Alpha, 4.0, VspOptimizer::set_aoa_degrees),
        (InputVariable::Mach, 0.3, VspOptimizer::set_mach_number),
        (InputVariable::Beta, 2.0, VspOptimizer::set_beta_degrees),
        (InputVariable::PitchRate, 0.0, VspOptimizer::set_rotational_rate_q),
    ];
    let ad: Vec<[f64; 2]> = cases
        .iter()
        .map(|(var, _, _)| {
            [
                opt.df_d_input_variable(0, None, *var).unwrap(),
                opt.df_d_input_variable(1, None, *var).unwrap(),
            ]
        })
        .collect();

    let h = 1e-5;
    for ((var, x0, set), ad) in cases.iter().zip(ad) {
        let mut eval = |x: f64| {
            set(&mut opt, x);
            opt.solve_forward().unwrap();
            [opt.case_function_value(0).unwrap(), opt.case_function_value(1).unwrap()]
        };
        let p = eval(x0 + h);
        let m = eval(x0 - h);
        set(&mut opt, *x0);
        for c in 0..2 {
            let fd = (p[c] - m[c]) / (2.0 * h);
            assert_close(ad[c], fd, var.label());
        }
    }
}

#[test]
fn rotor_thrust_gradient_over_unsteady_samples() {
    let blade = WingBuilder {
        full_span: false,
        root_offset: 0.2,
        span: 1.0,
        root_chord: 0.2,
        tip_chord: 0.1,
        incidence_deg: 6.0,
        n_span: 3,
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
    rotor.omega = 10.0;
    rotor.rotor_diameter = 2.4;

    let cfg = CaseConfig {
        sref: 0.15,
        cref: 0.15,
        vinf: 15.0,
        unsteady: true,
        time_step: 0.01,
        number_of_time_steps: 3,
        objectives: vec![ObjectiveDef {
            function: "ROTOR_CT".to_string(),
            set: 0,
            case: 0,
        }],
        ..CaseConfig::default()
    };
    let mut opt = VspOptimizer::from_parts(cfg, blade, vec![rotor]).unwrap();
    opt.solve().unwrap();
    assert_eq!(opt.optimization_number_of_time_steps(0).unwrap(), 3);
    let g = opt.case_function_gradients(0).unwrap();

    // the time-averaged value is differentiated as the mean of the steps
    let mean: Vec<f64> = (0..g.len())
        .map(|k| (0..3).map(|s| opt.step_function_gradients(0, s).unwrap()[k]).sum::<f64>() / 3.0)
        .collect();
    for (a, b) in g.iter().zip(&mean) {
        assert!((a - b).abs() < 1e-12);
    }

    for k in [2, 3 * 5 + 2] {
        let fd = fd_mesh(&mut opt, k, 1e-6, &|o, c| o.case_function_value(c).unwrap());
        assert_close(g[k], fd[0], "ROTOR_CT");
    }
}
