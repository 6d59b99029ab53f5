use proptest::prelude::*;
use vsp_aerostruct::{AeroStructManager, StaticCatalog};

fn catalog(structures: usize, assemblies: usize) -> StaticCatalog {
    let mut c = StaticCatalog::default();
    for i in 0..structures {
        c = c.with_structure(format!("s{i}"), format!("s{i}.dat"));
    }
    for i in 0..assemblies {
        c = c.with_assembly(format!("a{i}"), format!("a{i}.dat"));
    }
    c
}

proptest! {
    #[test]
    fn selection_is_none_or_in_range(
        index in -3i64..12,
        structures in 0usize..4,
        assemblies in 0usize..4,
    ) {
        let mut mgr = AeroStructManager::default();
        mgr.settings.set_current_struct_assy_index(index);
        mgr.update(&catalog(structures, assemblies));

        let len = (structures + assemblies) as i64;
        let expected = if index >= 0 && index < len { index } else { -1 };
        prop_assert_eq!(mgr.settings.current_struct_assy_index, expected);
        prop_assert_eq!(mgr.entries().len() as i64, len);
        prop_assert_eq!(mgr.selected().is_some(), expected >= 0);
    }
}
