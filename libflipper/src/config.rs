//! Session configuration. Every section has defaults; a JSON file may
//! override any subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FlipError;
use crate::solid::ProfileTable;
use crate::Real;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipConfig {
    pub physics: PhysicsConfig,
    pub table: TableConfig,
    pub play_area: PlayAreaConfig,
    pub charge: ChargeConfig,
    pub throw: ThrowConfig,
    pub profiles: ProfileTable,
}

impl FlipConfig {
    pub fn from_json(text: &str) -> Result<Self, FlipError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, FlipError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: [Real; 3],
    /// Frame length the session is normally stepped with.
    pub frame_dt: Real,
    /// Internal engine substep.
    pub substep_dt: Real,
    pub solver_iters: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -20.0, 0.0],
            frame_dt: 1.0 / 60.0,
            substep_dt: 1.0 / 240.0,
            solver_iters: 8,
        }
    }
}

/// The floor is the plane y = 0; walls stand at +/- `half_extent` on X and Z.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub half_extent: Real,
    pub floor_friction: Real,
    pub floor_restitution: Real,
    pub wall_friction: Real,
    pub wall_restitution: Real,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            half_extent: 4.0,
            floor_friction: 1.0,
            floor_restitution: 0.2,
            wall_friction: 0.5,
            wall_restitution: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayAreaConfig {
    pub base_half_extent: Real,
    pub growth_per_body: Real,
    pub max_half_extent: Real,
    pub min_height: Real,
    pub max_height: Real,
    pub safe_position: [Real; 3],
}

impl Default for PlayAreaConfig {
    fn default() -> Self {
        Self {
            base_half_extent: 5.0,
            growth_per_body: 0.15,
            max_half_extent: 8.0,
            min_height: -2.0,
            max_height: 20.0,
            safe_position: [0.0, 1.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeConfig {
    pub tick_ms: u32,
    pub increment: u8,
    pub cap: u8,
    /// Height of the staging pose while charging.
    pub staging_height: Real,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            tick_ms: 32,
            increment: 2,
            cap: 100,
            staging_height: 2.15,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowConfig {
    /// Horizontal dice speed at zero and full effective power.
    pub dice_speed: [Real; 2],
    pub dice_lift: Real,
    pub dice_lift_jitter: Real,
    /// Per-axis spin half-range at full effective power.
    pub dice_max_spin: Real,
    /// Vertical coin speed at zero and full effective power.
    pub coin_speed: [Real; 2],
    pub coin_spin_base: Real,
    pub coin_spin_gain: Real,
    pub coin_wobble: [Real; 2],
    /// Dice launch line (z) and height range.
    pub launch_z: Real,
    pub launch_height: [Real; 2],
    pub launch_spacing: Real,
    pub target: [Real; 3],
}

impl Default for ThrowConfig {
    fn default() -> Self {
        Self {
            dice_speed: [10.0, 20.0],
            dice_lift: 2.0,
            dice_lift_jitter: 3.0,
            dice_max_spin: 80.0,
            coin_speed: [5.0, 20.0],
            coin_spin_base: 30.0,
            coin_spin_gain: 50.0,
            coin_wobble: [5.0, 10.0],
            launch_z: 3.0,
            launch_height: [1.5, 2.0],
            launch_spacing: 0.5,
            target: [0.0, 0.0, 0.0],
        }
    }
}
