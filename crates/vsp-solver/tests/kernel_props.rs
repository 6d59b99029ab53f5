use proptest::prelude::*;
use vsp_core::Vec3;
use vsp_solver::biot_savart::segment;

fn point() -> impl Strategy<Value = [f64; 3]> {
    prop::array::uniform3(-2.0f64..2.0)
}

proptest! {
    #[test]
    fn segment_velocity_is_normal_to_filament(p in point(), a in point(), b in point()) {
        let (p, a, b) = (Vec3::<f64>::from_f64(p), Vec3::<f64>::from_f64(a), Vec3::<f64>::from_f64(b));
        let r0 = b - a;
        prop_assume!(r0.norm_squared() > 1e-2);
        prop_assume!(r0.cross(&(p - a)).norm_squared() > 1e-3 * r0.norm_squared());

        let w = segment(p, a, b);
        let scale = w.norm() * r0.norm();
        prop_assert!(w.dot(&r0).abs() <= 1e-9 * scale.max(1.0));
    }

    #[test]
    fn reversing_a_segment_flips_its_velocity(p in point(), a in point(), b in point()) {
        let (p, a, b) = (Vec3::<f64>::from_f64(p), Vec3::<f64>::from_f64(a), Vec3::<f64>::from_f64(b));
        let fwd = segment(p, a, b).value();
        let back = segment(p, b, a).value();
        for k in 0..3 {
            prop_assert!((fwd[k] + back[k]).abs() <= 1e-9 * fwd[k].abs().max(1.0));
        }
    }
}
