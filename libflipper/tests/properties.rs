//! Property-based tests for the resolver, planner and settle detector.

use proptest::prelude::*;

use libflipper::config::ThrowConfig;
use libflipper::planner::{dice_base_speed, effective_power, plan_coin_throw, plan_dice_throw};
use libflipper::{
    resolve_face, BodyKind, FaceTable, Point3, ProfileTable, Quaternion, Real, SequenceRng,
    SettleDetector, SettleStep, SolidType, UnitQuaternion, Vector3,
};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Any orientation, from four components bounded away from zero length.
fn arb_orientation() -> impl Strategy<Value = UnitQuaternion<Real>> {
    (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0)
        .prop_filter("non-degenerate", |(w, i, j, k)| w * w + i * i + j * j + k * k > 1e-3)
        .prop_map(|(w, i, j, k)| UnitQuaternion::from_quaternion(Quaternion::new(w, i, j, k)))
}

fn arb_solid() -> impl Strategy<Value = SolidType> {
    prop::sample::select(SolidType::ALL.to_vec())
}

fn arb_samples() -> impl Strategy<Value = Vec<Real>> {
    prop::collection::vec(0.0f32..1.0, 1..16)
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn cube_opposite_faces_sum_to_seven(q in arb_orientation(), theta in 0.0f32..std::f32::consts::TAU) {
        let axis = nalgebra::Unit::new_normalize(Vector3::new(theta.cos(), 0.0, theta.sin()));
        let flipped = UnitQuaternion::from_axis_angle(&axis, std::f32::consts::PI) * q;
        let sum = resolve_face(SolidType::Cube, &q) + resolve_face(SolidType::Cube, &flipped);
        prop_assert_eq!(sum, 7);
    }

    #[test]
    fn resolver_stays_in_range(solid in arb_solid(), q in arb_orientation()) {
        let value = resolve_face(solid, &q);
        prop_assert!((1..=solid.face_count()).contains(&value));
        prop_assert!(FaceTable::for_solid(solid).index_of(value).is_some());
    }

    #[test]
    fn resolver_is_deterministic(solid in arb_solid(), q in arb_orientation()) {
        prop_assert_eq!(resolve_face(solid, &q), resolve_face(solid, &q));
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn base_speed_is_monotonic(a in 0u8..=255, b in 0u8..=255) {
        let cfg = ThrowConfig::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(dice_base_speed(lo, &cfg) <= dice_base_speed(hi, &cfg));
    }

    #[test]
    fn dice_plan_is_bounded(power in 0u8..=255, samples in arb_samples()) {
        let cfg = ThrowConfig::default();
        let start = Point3::new(0.0, 1.5, 3.0);
        let plan = plan_dice_throw(start, Point3::origin(), power, &cfg, &mut SequenceRng::new(samples));
        let spin = cfg.dice_max_spin * effective_power(power);
        prop_assert!(plan.angular_velocity.iter().all(|w| w.abs() <= spin + 1e-4));
        prop_assert!(plan.linear_velocity.y >= cfg.dice_lift);
        prop_assert!(plan.linear_velocity.y <= cfg.dice_lift + cfg.dice_lift_jitter);
        prop_assert!((plan.start_orientation.quaternion().norm() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn coin_plan_has_no_drift(power in 0u8..=255, samples in arb_samples()) {
        let cfg = ThrowConfig::default();
        let plan = plan_coin_throw(Point3::new(0.0, 2.15, 0.0), power, &cfg, &mut SequenceRng::new(samples));
        prop_assert_eq!(plan.linear_velocity.x, 0.0);
        prop_assert_eq!(plan.linear_velocity.z, 0.0);
        prop_assert!(plan.linear_velocity.y >= cfg.coin_speed[0]);
    }
}

// ---------------------------------------------------------------------------
// Settle detector
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn settles_at_most_once(speeds in prop::collection::vec(0.0f32..2.0, 0..400)) {
        let profile = ProfileTable::default().profile(BodyKind::Die(SolidType::Icosa)).clone();
        let mut det = SettleDetector::launched();
        let mut settled = 0;
        for s in speeds {
            let v = Vector3::new(s, 0.0, 0.0);
            if let SettleStep::Settled { .. } = det.observe(&profile, &v, &v) {
                settled += 1;
            }
        }
        prop_assert!(settled <= 1);
    }
}
