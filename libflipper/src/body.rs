use std::fmt;

use serde::{Deserialize, Serialize};

use crate::charge::ChargeOwner;
use crate::engine::{BodyHandle, BodyState};
use crate::resolve::RollValue;
use crate::settle::SettleDetector;
use crate::solid::{BodyKind, SolidProfile};
use crate::{Point3, Real, UnitQuaternion, Vector3};

/// Stable identifier; ids are never reused within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A die or coin in the play set.
#[derive(Clone, Debug)]
pub struct Body {
    pub id: BodyId,
    pub kind: BodyKind,
    pub profile: SolidProfile,
    pub position: Point3<Real>,
    pub orientation: UnitQuaternion<Real>,
    pub linear_velocity: Vector3<Real>,
    pub angular_velocity: Vector3<Real>,
    /// Takes part in the next throw.
    pub enabled: bool,
    /// Held result, excluded from re-throws.
    pub(crate) locked: bool,
    pub result: Option<RollValue>,
    /// Offsets this body's staging wobble from its neighbours.
    pub phase_offset: Real,
    pub(crate) handle: BodyHandle,
    pub(crate) detector: SettleDetector,
}

impl Body {
    pub(crate) fn new(
        id: BodyId,
        kind: BodyKind,
        profile: SolidProfile,
        handle: BodyHandle,
        position: Point3<Real>,
    ) -> Self {
        Self {
            id,
            kind,
            profile,
            position,
            orientation: UnitQuaternion::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            enabled: true,
            locked: false,
            result: None,
            phase_offset: id.0 as Real * 1.3,
            handle,
            detector: SettleDetector::at_rest(),
        }
    }

    pub fn handle(&self) -> BodyHandle {
        self.handle
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_rolling(&self) -> bool {
        self.detector.in_flight()
    }

    pub fn stable_streak(&self) -> u32 {
        self.detector.stable_streak()
    }

    /// Enabled and not locked.
    pub fn is_eligible(&self) -> bool {
        self.enabled && !self.locked
    }

    /// The control that throws this body.
    pub fn owner(&self) -> ChargeOwner {
        if self.kind.is_coin() {
            ChargeOwner::Coin
        } else {
            ChargeOwner::Dice
        }
    }

    pub(crate) fn sync(&mut self, state: &BodyState) {
        self.position = state.position;
        self.orientation = state.orientation;
        self.linear_velocity = state.linear_velocity;
        self.angular_velocity = state.angular_velocity;
    }

    pub(crate) fn launch(&mut self) {
        self.result = None;
        self.detector = SettleDetector::launched();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solid::{ProfileTable, SolidType};

    fn cube(id: u32) -> Body {
        let kind = BodyKind::Die(SolidType::Cube);
        let profile = ProfileTable::default().profile(kind).clone();
        Body::new(BodyId(id), kind, profile, BodyHandle(id), Point3::origin())
    }

    #[test]
    fn test_new_body_is_idle_and_eligible() {
        let b = cube(0);
        assert!(!b.is_rolling());
        assert!(b.is_eligible());
        assert_eq!(b.result, None);
        assert_eq!(b.owner(), ChargeOwner::Dice);
    }

    #[test]
    fn test_launch_clears_result() {
        let mut b = cube(1);
        b.result = Some(RollValue::Face(4));
        b.launch();
        assert!(b.is_rolling());
        assert_eq!(b.result, None);
        assert_eq!(b.stable_streak(), 0);
    }

    #[test]
    fn test_locked_body_is_not_eligible() {
        let mut b = cube(2);
        b.locked = true;
        assert!(b.is_locked());
        assert!(!b.is_eligible());
        b.locked = false;
        b.enabled = false;
        assert!(!b.is_eligible());
    }

    #[test]
    fn test_phase_offsets_differ() {
        assert_ne!(cube(0).phase_offset, cube(1).phase_offset);
        assert_eq!(BodyId(7).to_string(), "7");
    }
}
