use std::f64::consts::TAU;
use std::io::{BufReader, Cursor};

use vsp_groups::{read_groups, write_groups, ComponentGroup, ForceKind};

fn spun_rotor() -> ComponentGroup {
    let mut g = ComponentGroup::new("Main Rotor");
    g.is_fixed = false;
    g.is_rotor = true;
    g.has_wings = true;
    g.axis = [0.1, 0.0, 1.0];
    g.origin = [2.5, 0.0, 1.25];
    g.omega = TAU * 7.3;
    g.rotor_diameter = 1.7;
    g.reference.density = 1.225;
    g.reference.vref = 23.0;
    g.reference.alpha_deg = 3.3;
    g.set_components(vec![4, 7, 9]);
    g.size_span_loading_list(2);
    {
        let span = g.span_load_mut(1).unwrap();
        span.size(3);
        span.station = vec![0.1, 1.0 / 3.0, 0.9];
        span.cl = vec![0.31, -2.0e-17, 1.0e300];
    }

    g.zero_average_forces_and_moments();
    for k in 1..=7 {
        let t = 0.01 * k as f64;
        g.update(0.01, t).unwrap();
        g.set_instant_forces(ForceKind::Inviscid, [0.1 * t, 0.02, 0.7], [0.001, -0.03 * t, 0.2]);
        g.set_instant_forces(ForceKind::Viscous, [0.01, 0.0, 0.003], [0.0, 0.0, -0.001]);
        g.calculate_forces_and_moments();
        g.update_average_forces_and_moments();
    }
    g.calculate_average_forces_and_moments();
    g
}

#[test]
fn write_then_load_reproduces_group_exactly() {
    let group = spun_rotor();
    let mut buf = Vec::new();
    group.write_data(&mut buf).unwrap();

    let loaded = ComponentGroup::load_data(&mut Cursor::new(buf)).unwrap();
    assert_eq!(loaded, group);
    assert_eq!(
        loaded.total_quat().w.to_bits(),
        group.total_quat().w.to_bits()
    );
    assert_eq!(loaded.span_load(1).unwrap().cl[1].to_bits(), (-2.0e-17_f64).to_bits());
}

#[test]
fn group_file_with_several_groups() {
    let mut wing = ComponentGroup::new("wing");
    wing.set_components(vec![0, 1]);
    let groups = vec![wing, spun_rotor()];

    let path = std::env::temp_dir().join("vsp_groups_roundtrip.groups");
    {
        let mut file = std::fs::File::create(&path).unwrap();
        write_groups(&mut file, &groups).unwrap();
    }
    let mut reader = BufReader::new(std::fs::File::open(&path).unwrap());
    let loaded = read_groups(&mut reader).unwrap();
    assert_eq!(loaded, groups);
}

#[test]
fn group_count_mismatch_is_rejected() {
    let mut buf = Vec::new();
    write_groups(&mut buf, &[ComponentGroup::new("a")]).unwrap();
    let text = String::from_utf8(buf).unwrap().replace("NumberOfGroups 1", "NumberOfGroups 2");
    assert!(read_groups(&mut Cursor::new(text)).is_err());
}
