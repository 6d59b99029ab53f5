use proptest::prelude::*;
use vsp_optimizer::CaseConfig;

fn list(values: &[f64]) -> String {
    values.iter().map(|v| format!("{v:?}")).collect::<Vec<_>>().join(", ")
}

proptest! {
    #[test]
    fn single_values_broadcast_across_a_sweep(
        machs in prop::collection::vec(0.05f64..0.8, 1..=10),
        alpha in -8.0f64..12.0,
    ) {
        let text = format!("Sref = 2\nCref = 1\nBref = 2\nMach = {}\nAoA = {alpha:?}\n", list(&machs));
        let cfg = CaseConfig::parse(&text).unwrap();
        let cases = cfg.run_cases();

        prop_assert_eq!(cases.len(), machs.len());
        for (case, mach) in cases.iter().zip(&machs) {
            prop_assert_eq!(case.mach, *mach);
            prop_assert_eq!(case.alpha_deg, alpha);
        }
    }

    #[test]
    fn yaml_dump_reloads_the_same_run_cases(
        alphas in prop::collection::vec(-5.0f64..10.0, 1..=4),
    ) {
        let text = format!("Sref = 3\nCref = 1\nBref = 3\nMach = 0.3\nAoA = {}\nObjective = CL\n", list(&alphas));
        let cfg = CaseConfig::parse(&text).unwrap();
        let back = CaseConfig::from_yaml(&cfg.to_yaml().unwrap()).unwrap();
        prop_assert_eq!(back.run_cases(), cfg.run_cases());
        prop_assert_eq!(back.objectives.len(), 1);
    }
}
