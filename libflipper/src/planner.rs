//! Throw impulse planning. Pure functions of their inputs plus the injected
//! random source; callers apply the plan to the engine.

use tracing::debug;

use crate::config::ThrowConfig;
use crate::rng::ThrowRng;
use crate::{Point3, Quaternion, Real, UnitQuaternion, Vector3, EPS};

/// Lowest power a throw is ever planned with.
pub const POWER_FLOOR: u8 = 10;
pub const POWER_CAP: u8 = 100;

/// Desired start state and velocities for one body.
#[derive(Clone, Debug, PartialEq)]
pub struct ThrowPlan {
    pub start_position: Point3<Real>,
    pub start_orientation: UnitQuaternion<Real>,
    pub linear_velocity: Vector3<Real>,
    pub angular_velocity: Vector3<Real>,
}

/// `max(10, power) / 100`, capped at 1.
pub fn effective_power(power: u8) -> Real {
    power.clamp(POWER_FLOOR, POWER_CAP) as Real / 100.0
}

fn lerp(range: [Real; 2], t: Real) -> Real {
    range[0] + (range[1] - range[0]) * t
}

/// Horizontal dice speed before jitter.
pub fn dice_base_speed(power: u8, cfg: &ThrowConfig) -> Real {
    lerp(cfg.dice_speed, effective_power(power))
}

/// Vertical coin speed; the coin has no jitter on this axis.
pub fn coin_base_speed(power: u8, cfg: &ThrowConfig) -> Real {
    lerp(cfg.coin_speed, effective_power(power))
}

/// Unit XZ direction from `start` toward `target`, or zero when they coincide.
pub fn aim_direction(start: &Point3<Real>, target: &Point3<Real>) -> Vector3<Real> {
    let flat = Vector3::new(target.x - start.x, 0.0, target.z - start.z);
    let len = flat.norm();
    if len < EPS {
        debug!(?start, "throw target coincides with start; launching without horizontal aim");
        return Vector3::zeros();
    }
    flat / len
}

pub fn plan_dice_throw(
    start: Point3<Real>,
    target: Point3<Real>,
    power: u8,
    cfg: &ThrowConfig,
    rng: &mut impl ThrowRng,
) -> ThrowPlan {
    let eff = effective_power(power);
    let dir = aim_direction(&start, &target);
    let speed = dice_base_speed(power, cfg);
    let lift = cfg.dice_lift + rng.next_unit() * cfg.dice_lift_jitter * eff;

    let spin = cfg.dice_max_spin * eff;
    let angular_velocity = Vector3::new(rng.symmetric(spin), rng.symmetric(spin), rng.symmetric(spin));

    ThrowPlan {
        start_position: start,
        start_orientation: random_orientation(rng),
        linear_velocity: Vector3::new(dir.x * speed, lift, dir.z * speed),
        angular_velocity,
    }
}

/// Straight up, spinning hard about local X, with a little wobble on Y and Z.
pub fn plan_coin_throw(
    start: Point3<Real>,
    power: u8,
    cfg: &ThrowConfig,
    rng: &mut impl ThrowRng,
) -> ThrowPlan {
    let eff = effective_power(power);
    let angular_velocity = Vector3::new(
        cfg.coin_spin_base + cfg.coin_spin_gain * eff,
        rng.symmetric(cfg.coin_wobble[0]),
        rng.symmetric(cfg.coin_wobble[1]),
    );
    ThrowPlan {
        start_position: start,
        start_orientation: UnitQuaternion::identity(),
        linear_velocity: Vector3::new(0.0, coin_base_speed(power, cfg), 0.0),
        angular_velocity,
    }
}

/// Launch point for die `slot` of `count`, spread along X on the launch line.
pub fn launch_position(slot: usize, count: usize, cfg: &ThrowConfig, rng: &mut impl ThrowRng) -> Point3<Real> {
    let centre = (count.max(1) - 1) as Real / 2.0;
    let spread = (slot as Real - centre) * cfg.launch_spacing;
    let x = spread + rng.symmetric(0.15);
    let y = rng.range(cfg.launch_height[0], cfg.launch_height[1]);
    let z = cfg.launch_z + rng.next_unit() * 0.3;
    Point3::new(x, y, z)
}

/// Uniformly distributed unit quaternion (Shoemake).
pub fn random_orientation(rng: &mut impl ThrowRng) -> UnitQuaternion<Real> {
    let u1 = rng.next_unit();
    let u2 = rng.next_unit();
    let u3 = rng.next_unit();
    let q1 = (1.0 - u1).sqrt();
    let q2 = u1.sqrt();
    let theta1 = 2.0 * std::f32::consts::PI * u2;
    let theta2 = 2.0 * std::f32::consts::PI * u3;
    UnitQuaternion::from_quaternion(Quaternion::new(
        q1 * theta1.cos(),
        q1 * theta1.sin(),
        q2 * theta2.cos(),
        q2 * theta2.sin(),
    ))
}
