//! Press-and-hold charge controller.
//!
//! `Idle -> Charging -> Released | Cancelled`. While charging, power climbs by
//! a fixed increment every tick period up to the cap. Ticks are driven
//! explicitly through `advance` or `tick`; once the session has ended a late
//! tick is a no-op.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ChargeConfig;
use crate::error::FlipError;
use crate::planner::POWER_FLOOR;
use crate::{Point3, Real, UnitQuaternion, Vector3};

/// Which control a charge session belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeOwner {
    Dice,
    Coin,
}

impl fmt::Display for ChargeOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargeOwner::Dice => f.write_str("dice"),
            ChargeOwner::Coin => f.write_str("coin"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChargePhase {
    Idle,
    Charging,
    Released { power: u8 },
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct ChargeController {
    owner: ChargeOwner,
    phase: ChargePhase,
    power: u8,
    elapsed_ticks: u32,
    elapsed_secs: Real,
    carry_ms: Real,
    tick_ms: Real,
    increment: u8,
    cap: u8,
}

impl ChargeController {
    pub fn new(owner: ChargeOwner, cfg: &ChargeConfig) -> Self {
        Self {
            owner,
            phase: ChargePhase::Idle,
            power: 0,
            elapsed_ticks: 0,
            elapsed_secs: 0.0,
            carry_ms: 0.0,
            tick_ms: cfg.tick_ms.max(1) as Real,
            increment: cfg.increment,
            cap: cfg.cap,
        }
    }

    pub fn owner(&self) -> ChargeOwner {
        self.owner
    }

    pub fn phase(&self) -> ChargePhase {
        self.phase
    }

    pub fn is_charging(&self) -> bool {
        self.phase == ChargePhase::Charging
    }

    /// Current power, 0 outside a session.
    pub fn power(&self) -> u8 {
        self.power
    }

    pub fn elapsed_ticks(&self) -> u32 {
        self.elapsed_ticks
    }

    pub fn elapsed_secs(&self) -> Real {
        self.elapsed_secs
    }

    /// Begins a session. Returns false if one is already running.
    pub fn start(&mut self) -> bool {
        if self.is_charging() {
            return false;
        }
        self.phase = ChargePhase::Charging;
        self.power = 0;
        self.elapsed_ticks = 0;
        self.elapsed_secs = 0.0;
        self.carry_ms = 0.0;
        debug!(owner = %self.owner, "charge started");
        true
    }

    /// One tick period elapsed. Returns the new power, or `None` when idle.
    pub fn tick(&mut self) -> Option<u8> {
        if !self.is_charging() {
            return None;
        }
        self.elapsed_ticks += 1;
        self.power = self.power.saturating_add(self.increment).min(self.cap);
        Some(self.power)
    }

    /// Feeds wall-clock time; applies every tick period it covers.
    /// Returns how many ticks fired.
    pub fn advance(&mut self, dt: Real) -> u32 {
        if !self.is_charging() {
            return 0;
        }
        self.elapsed_secs += dt;
        self.carry_ms += dt * 1000.0;
        let mut fired = 0;
        while self.carry_ms >= self.tick_ms {
            self.carry_ms -= self.tick_ms;
            self.tick();
            fired += 1;
        }
        fired
    }

    /// Ends the session and returns the power to throw with (at least the floor).
    pub fn release(&mut self) -> Result<u8, FlipError> {
        if !self.is_charging() {
            return Err(FlipError::ChargeNotActive(self.owner));
        }
        let power = self.power.max(POWER_FLOOR);
        self.phase = ChargePhase::Released { power };
        self.power = 0;
        debug!(owner = %self.owner, power, ticks = self.elapsed_ticks, "charge released");
        Ok(power)
    }

    /// Aborts without producing a throw. Returns false when nothing was charging.
    pub fn cancel(&mut self) -> bool {
        if !self.is_charging() {
            return false;
        }
        self.phase = ChargePhase::Cancelled;
        self.power = 0;
        debug!(owner = %self.owner, "charge cancelled");
        true
    }
}

/// Cosmetic pose of a body held during a charge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StagingPose {
    pub position: Point3<Real>,
    pub orientation: UnitQuaternion<Real>,
}

impl StagingPose {
    /// Wobble around `anchor`; amplitude and frequency grow with `power`.
    pub fn at(anchor: Point3<Real>, elapsed_secs: Real, phase_offset: Real, power: u8) -> Self {
        let p = power.min(100) as Real / 100.0;
        let t = elapsed_secs * 20.0 + phase_offset;
        let intensity = 0.02 + p * 0.13;
        let frequency = 1.0 + p * 2.0;

        let wobble_x = (t * frequency).sin() * intensity;
        let wobble_z = (t * frequency * 1.3).cos() * intensity * 0.7;
        let wobble_y = (t * frequency * 2.1).sin() * intensity * 0.3;

        Self {
            position: anchor + Vector3::new(wobble_x * 0.5, wobble_y.abs() * 0.2, wobble_z * 0.5),
            orientation: UnitQuaternion::from_euler_angles(wobble_z * 2.0, 0.0, wobble_x * 2.0),
        }
    }
}
