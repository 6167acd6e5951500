//! Per-body settling detection.
//!
//! A thrown body starts `InFlight`. Every step it is classified slow or not
//! against its profile's thresholds; a run of `settle_streak` slow steps moves
//! it to `Settled`. A body still in flight after `max_flight_steps` is settled
//! anyway so a throw always finishes.

use crate::solid::SolidProfile;
use crate::{Real, Vector3};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettlePhase {
    InFlight,
    Settled,
}

/// Outcome of one observed step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettleStep {
    Rolling,
    /// Emitted exactly once per throw.
    Settled { forced: bool },
    /// Already settled; nothing to do.
    Idle,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettleDetector {
    phase: SettlePhase,
    stable_streak: u32,
    flight_steps: u32,
}

impl Default for SettleDetector {
    fn default() -> Self {
        Self::at_rest()
    }
}

impl SettleDetector {
    /// A body that has not been thrown.
    pub fn at_rest() -> Self {
        Self {
            phase: SettlePhase::Settled,
            stable_streak: 0,
            flight_steps: 0,
        }
    }

    /// A body that was just launched.
    pub fn launched() -> Self {
        Self {
            phase: SettlePhase::InFlight,
            stable_streak: 0,
            flight_steps: 0,
        }
    }

    pub fn phase(&self) -> SettlePhase {
        self.phase
    }

    pub fn in_flight(&self) -> bool {
        self.phase == SettlePhase::InFlight
    }

    pub fn stable_streak(&self) -> u32 {
        self.stable_streak
    }

    pub fn flight_steps(&self) -> u32 {
        self.flight_steps
    }

    pub fn observe(
        &mut self,
        profile: &SolidProfile,
        linear_velocity: &Vector3<Real>,
        angular_velocity: &Vector3<Real>,
    ) -> SettleStep {
        if self.phase == SettlePhase::Settled {
            return SettleStep::Idle;
        }
        self.flight_steps += 1;

        if profile.is_slow(linear_velocity.norm(), angular_velocity.norm()) {
            self.stable_streak += 1;
        } else {
            self.stable_streak = 0;
        }

        if self.stable_streak >= profile.settle_streak {
            self.phase = SettlePhase::Settled;
            SettleStep::Settled { forced: false }
        } else if self.flight_steps >= profile.max_flight_steps {
            self.phase = SettlePhase::Settled;
            SettleStep::Settled { forced: true }
        } else {
            SettleStep::Rolling
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solid::{BodyKind, ProfileTable, SolidType};

    fn speed(s: Real) -> Vector3<Real> {
        Vector3::new(s, 0.0, 0.0)
    }

    fn cube() -> SolidProfile {
        ProfileTable::default().profile(BodyKind::Die(SolidType::Cube)).clone()
    }

    fn icosa() -> SolidProfile {
        ProfileTable::default().profile(BodyKind::Die(SolidType::Icosa)).clone()
    }

    #[test]
    fn test_settles_after_required_streak() {
        let profile = cube();
        let mut det = SettleDetector::launched();
        for _ in 0..profile.settle_streak - 1 {
            assert_eq!(det.observe(&profile, &speed(0.0), &speed(0.0)), SettleStep::Rolling);
        }
        assert_eq!(
            det.observe(&profile, &speed(0.0), &speed(0.0)),
            SettleStep::Settled { forced: false }
        );
        assert_eq!(det.phase(), SettlePhase::Settled);
    }

    #[test]
    fn test_streak_resets_on_fast_step() {
        let profile = icosa();
        let mut det = SettleDetector::launched();
        for _ in 0..profile.settle_streak - 1 {
            det.observe(&profile, &speed(0.01), &speed(0.01));
        }
        assert_eq!(det.stable_streak(), profile.settle_streak - 1);
        assert_eq!(det.observe(&profile, &speed(5.0), &speed(0.0)), SettleStep::Rolling);
        assert_eq!(det.stable_streak(), 0);
    }

    #[test]
    fn test_angular_speed_alone_breaks_streak() {
        let profile = cube();
        let mut det = SettleDetector::launched();
        det.observe(&profile, &speed(0.0), &speed(0.0));
        det.observe(&profile, &speed(0.0), &Vector3::new(0.0, 0.0, 2.0));
        assert_eq!(det.stable_streak(), 0);
    }

    #[test]
    fn test_settle_is_idempotent() {
        let profile = icosa();
        let mut det = SettleDetector::launched();
        let mut settled = 0;
        for _ in 0..profile.settle_streak {
            if let SettleStep::Settled { .. } = det.observe(&profile, &speed(0.0), &speed(0.0)) {
                settled += 1;
            }
        }
        assert_eq!(settled, 1);
        for s in [0.0, 50.0, 0.0] {
            assert_eq!(det.observe(&profile, &speed(s), &speed(s)), SettleStep::Idle);
        }
        assert_eq!(det.phase(), SettlePhase::Settled);
    }

    #[test]
    fn test_threshold_depends_on_type() {
        let mut on_icosa = SettleDetector::launched();
        let mut on_cube = SettleDetector::launched();
        on_icosa.observe(&icosa(), &speed(0.2), &speed(0.2));
        on_cube.observe(&cube(), &speed(0.2), &speed(0.2));
        assert_eq!(on_icosa.stable_streak(), 1);
        assert_eq!(on_cube.stable_streak(), 0);
    }

    #[test]
    fn test_stuck_body_is_forced() {
        let profile = cube();
        let mut det = SettleDetector::launched();
        let mut last = SettleStep::Rolling;
        for _ in 0..profile.max_flight_steps {
            last = det.observe(&profile, &speed(3.0), &speed(3.0));
            if last != SettleStep::Rolling {
                break;
            }
        }
        assert_eq!(last, SettleStep::Settled { forced: true });
        assert_eq!(det.flight_steps(), profile.max_flight_steps);
    }

    #[test]
    fn test_at_rest_is_idle() {
        let mut det = SettleDetector::default();
        assert!(!det.in_flight());
        assert_eq!(det.observe(&cube(), &speed(9.0), &speed(9.0)), SettleStep::Idle);
        assert_eq!(det.flight_steps(), 0);
    }
}
