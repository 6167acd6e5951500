//! The seam between the table logic and a rigid-body engine.
//!
//! The session only ever reads per-body state and writes pose and velocity;
//! integration, contacts and collision shapes stay behind this trait.

use crate::error::FlipError;
use crate::solid::{BodyKind, SolidProfile};
use crate::{Point3, Real, UnitQuaternion, Vector3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    pub position: Point3<Real>,
    pub orientation: UnitQuaternion<Real>,
    pub linear_velocity: Vector3<Real>,
    pub angular_velocity: Vector3<Real>,
}

impl BodyState {
    pub fn at_rest(position: Point3<Real>, orientation: UnitQuaternion<Real>) -> Self {
        Self {
            position,
            orientation,
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }
}

/// A body touched something it was not touching on the previous step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactEvent {
    pub handle: BodyHandle,
    /// Closing speed along the contact normal.
    pub impact_speed: Real,
}

pub trait PhysicsEngine {
    fn insert_body(
        &mut self,
        kind: BodyKind,
        profile: &SolidProfile,
        position: Point3<Real>,
        orientation: UnitQuaternion<Real>,
    ) -> Result<BodyHandle, FlipError>;

    fn remove_body(&mut self, handle: BodyHandle);

    /// `None` for a handle the engine does not know.
    fn state(&self, handle: BodyHandle) -> Option<BodyState>;

    fn set_position(&mut self, handle: BodyHandle, position: Point3<Real>);
    fn set_orientation(&mut self, handle: BodyHandle, orientation: UnitQuaternion<Real>);
    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vector3<Real>);
    fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vector3<Real>);

    /// Advances the simulation by `dt` seconds.
    fn step(&mut self, dt: Real) -> Vec<ContactEvent>;

    /// Zeroes both velocities.
    fn halt(&mut self, handle: BodyHandle) {
        self.set_linear_velocity(handle, Vector3::zeros());
        self.set_angular_velocity(handle, Vector3::zeros());
    }

    /// Moves a body to a pose and stops it.
    fn place(&mut self, handle: BodyHandle, position: Point3<Real>, orientation: UnitQuaternion<Real>) {
        self.set_position(handle, position);
        self.set_orientation(handle, orientation);
        self.halt(handle);
    }
}
