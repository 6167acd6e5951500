//! libflipper: throw planning, settling detection and face resolution for
//! simulated tabletop dice (D4/D6/D8/D10/D12/D20) and coins.
//!
//! - Face-normal tables per solid, nearest-normal face resolution
//! - Power-scaled throw impulses with an injectable random source
//! - Per-body settle detection with per-type thresholds and a stuck-body budget
//! - Press-and-hold charge controller with a jittered staging pose
//! - Out-of-bounds recovery against a play area that grows with body count
//! - `GroundSim`, a small impulse-based rigid-body engine behind the
//!   `PhysicsEngine` seam, so a table can run headless
//!
//! Public API:
//! - `TableSession::new(engine, rng, config)`, `add_body(kind)`,
//!   `start_charge / release_charge / request_throw`, `step(dt)`, `drain_events()`
//! - `resolve_face(solid, orientation) -> u32`
//! - `plan_dice_throw(start, target, power, cfg, rng) -> ThrowPlan`
//!
//! Example (single die):
//! let mut session = TableSession::new(GroundSim::new(&config), StdThrowRng::from_entropy(), config);
//! let id = session.add_body(BodyKind::Die(SolidType::Cube))?;
//! session.request_throw(&[id], 80)?;
//! session.run_until_settled(2_000);
//! session.body(id).and_then(|b| b.result) -> Some(RollValue::Face(n))

pub mod body;
pub mod bounds;
pub mod charge;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod ground;
pub mod normals;
pub mod planner;
pub mod resolve;
pub mod rng;
pub mod session;
pub mod settle;
pub mod solid;

pub use nalgebra::{Point3, Quaternion, UnitQuaternion, Vector3};

pub use body::{Body, BodyId};
pub use bounds::PlayArea;
pub use charge::{ChargeController, ChargeOwner, ChargePhase, StagingPose};
pub use config::FlipConfig;
pub use engine::{BodyHandle, BodyState, ContactEvent, PhysicsEngine};
pub use error::FlipError;
pub use ground::GroundSim;
pub use normals::FaceTable;
pub use planner::{plan_coin_throw, plan_dice_throw, ThrowPlan};
pub use resolve::{resolve, resolve_coin, resolve_face, CoinSide, RollValue};
pub use rng::{SequenceRng, StdThrowRng, ThrowRng};
pub use session::{RollRecord, SessionEvent, SessionSnapshot, TableSession};
pub use settle::{SettleDetector, SettleStep};
pub use solid::{BodyKind, ColliderShape, ProfileTable, SolidProfile, SolidType};

pub type Real = f32;
pub(crate) const EPS: Real = 1e-6;

/// World up; resolvers compare rotated normals against it.
pub fn world_up() -> Vector3<Real> {
    Vector3::y()
}
