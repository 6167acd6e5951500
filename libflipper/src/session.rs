//! The table session: owns the play set, the engine, the random source and
//! both charge controls, and advances them one frame at a time.
//!
//! Commands (`add_body`, `set_body_locked`, `request_throw`, ...) run between
//! frames; `step` is the only place physics-derived body state changes.
//! Presentation code polls `drain_events` or `snapshot`.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::body::{Body, BodyId};
use crate::bounds::PlayArea;
use crate::charge::{ChargeController, ChargeOwner, StagingPose};
use crate::config::FlipConfig;
use crate::engine::{ContactEvent, PhysicsEngine};
use crate::error::FlipError;
use crate::planner::{launch_position, plan_coin_throw, plan_dice_throw, ThrowPlan};
use crate::resolve::{resolve, RollValue};
use crate::rng::ThrowRng;
use crate::settle::SettleStep;
use crate::solid::BodyKind;
use crate::{Point3, Real, UnitQuaternion};

pub const HISTORY_LIMIT: usize = 100;
/// Minimum gap between two impact events for the same body.
pub const IMPACT_DEBOUNCE_SECS: Real = 0.08;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    ThrowStarted {
        owner: ChargeOwner,
        ids: Vec<BodyId>,
        power: u8,
    },
    Settled {
        id: BodyId,
        value: RollValue,
        forced: bool,
    },
    AllSettled,
    /// Cosmetic; a body hit the table or a wall.
    Impact { id: BodyId, speed: Real },
    PowerChanged { owner: ChargeOwner, power: u8 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RollRecord {
    pub id: BodyId,
    pub kind: BodyKind,
    pub value: RollValue,
    pub frame: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub kind: BodyKind,
    pub position: [Real; 3],
    pub enabled: bool,
    pub locked: bool,
    pub rolling: bool,
    pub result: Option<RollValue>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub frame: u64,
    pub rolling: bool,
    pub dice_power: u8,
    pub coin_power: u8,
    pub bodies: Vec<BodySnapshot>,
}

pub struct TableSession<E: PhysicsEngine, R: ThrowRng> {
    engine: E,
    rng: R,
    config: FlipConfig,
    play_area: PlayArea,
    /// Creation order; every per-frame pass walks it front to back.
    bodies: Vec<Body>,
    next_id: u32,
    dice_charge: ChargeController,
    coin_charge: ChargeController,
    events: Vec<SessionEvent>,
    history: VecDeque<RollRecord>,
    last_impact: HashMap<BodyId, Real>,
    frame: u64,
    clock: Real,
    was_rolling: bool,
}

impl<E: PhysicsEngine, R: ThrowRng> TableSession<E, R> {
    pub fn new(engine: E, rng: R, config: FlipConfig) -> Self {
        Self {
            engine,
            rng,
            play_area: PlayArea::new(config.play_area.clone()),
            dice_charge: ChargeController::new(ChargeOwner::Dice, &config.charge),
            coin_charge: ChargeController::new(ChargeOwner::Coin, &config.charge),
            config,
            bodies: Vec::new(),
            next_id: 0,
            events: Vec::new(),
            history: VecDeque::new(),
            last_impact: HashMap::new(),
            frame: 0,
            clock: 0.0,
            was_rolling: false,
        }
    }

    pub fn config(&self) -> &FlipConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    fn body_mut(&mut self, id: BodyId) -> Result<&mut Body, FlipError> {
        self.bodies
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(FlipError::UnknownBody(id))
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// True while any thrown body has not settled yet.
    pub fn is_rolling(&self) -> bool {
        self.bodies.iter().any(Body::is_rolling)
    }

    fn charge(&self, owner: ChargeOwner) -> &ChargeController {
        match owner {
            ChargeOwner::Dice => &self.dice_charge,
            ChargeOwner::Coin => &self.coin_charge,
        }
    }

    fn charge_mut(&mut self, owner: ChargeOwner) -> &mut ChargeController {
        match owner {
            ChargeOwner::Dice => &mut self.dice_charge,
            ChargeOwner::Coin => &mut self.coin_charge,
        }
    }

    pub fn charge_power(&self, owner: ChargeOwner) -> u8 {
        self.charge(owner).power()
    }

    pub fn is_charging(&self, owner: ChargeOwner) -> bool {
        self.charge(owner).is_charging()
    }

    // ---------- play set ----------

    /// Adds a body on the 3-wide tray grid, enabled and unlocked.
    pub fn add_body(&mut self, kind: BodyKind) -> Result<BodyId, FlipError> {
        let slot = self.bodies.len();
        let position = Point3::new((slot % 3) as Real - 1.0, 0.5, (slot / 3) as Real);
        let profile = self.config.profiles.profile(kind).clone();
        let handle = self
            .engine
            .insert_body(kind, &profile, position, UnitQuaternion::identity())?;

        let id = BodyId(self.next_id);
        self.next_id += 1;
        self.bodies.push(Body::new(id, kind, profile, handle, position));
        debug!(%id, %kind, "body added");
        Ok(id)
    }

    pub fn remove_body(&mut self, id: BodyId) -> Result<Body, FlipError> {
        let idx = self
            .bodies
            .iter()
            .position(|b| b.id == id)
            .ok_or(FlipError::UnknownBody(id))?;
        let body = self.bodies.remove(idx);
        self.engine.remove_body(body.handle);
        self.last_impact.remove(&id);
        debug!(%id, "body removed");
        Ok(body)
    }

    pub fn set_body_enabled(&mut self, id: BodyId, enabled: bool) -> Result<(), FlipError> {
        self.body_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// A rolling body cannot be locked; unlocking is always allowed.
    pub fn set_body_locked(&mut self, id: BodyId, locked: bool) -> Result<(), FlipError> {
        let body = self.body_mut(id)?;
        if locked && body.is_rolling() {
            return Err(FlipError::BodyInFlight(id));
        }
        body.locked = locked;
        Ok(())
    }

    /// Disables everything when all bodies are enabled, otherwise enables all.
    pub fn toggle_all_enabled(&mut self) {
        let target = !self.bodies.iter().all(|b| b.enabled);
        for body in &mut self.bodies {
            body.enabled = target;
        }
    }

    fn eligible_ids(&self, owner: ChargeOwner) -> Vec<BodyId> {
        self.bodies
            .iter()
            .filter(|b| b.is_eligible() && b.owner() == owner)
            .map(|b| b.id)
            .collect()
    }

    // ---------- throwing ----------

    /// Launches the eligible bodies among `ids`. Disabled and locked bodies
    /// are skipped and left untouched. Returns the ids actually thrown.
    #[instrument(skip(self))]
    pub fn request_throw(&mut self, ids: &[BodyId], power: u8) -> Result<Vec<BodyId>, FlipError> {
        if self.is_rolling() {
            return Err(FlipError::ThrowInProgress);
        }
        let mut dice = Vec::new();
        let mut coins = Vec::new();
        for &id in ids {
            let body = self.body(id).ok_or(FlipError::UnknownBody(id))?;
            if !body.is_eligible() {
                debug!(%id, enabled = body.enabled, locked = body.is_locked(), "skipping ineligible body");
                continue;
            }
            let bucket = if body.kind.is_coin() { &mut coins } else { &mut dice };
            if !bucket.contains(&id) {
                bucket.push(id);
            }
        }
        for (owner, bucket) in [(ChargeOwner::Dice, &dice), (ChargeOwner::Coin, &coins)] {
            if !bucket.is_empty() && self.charge(owner).is_charging() {
                return Err(FlipError::ChargeActive(owner));
            }
        }
        if dice.is_empty() && coins.is_empty() {
            debug!("nothing eligible to throw");
            return Ok(Vec::new());
        }

        let target = {
            let [x, y, z] = self.config.throw.target;
            Point3::new(x, y, z)
        };
        for (slot, &id) in dice.iter().enumerate() {
            let start = launch_position(slot, dice.len(), &self.config.throw, &mut self.rng);
            let plan = plan_dice_throw(start, target, power, &self.config.throw, &mut self.rng);
            self.apply_plan(id, &plan)?;
        }
        for (slot, &id) in coins.iter().enumerate() {
            let start = self.staging_anchor(ChargeOwner::Coin, slot, coins.len());
            let plan = plan_coin_throw(start, power, &self.config.throw, &mut self.rng);
            self.apply_plan(id, &plan)?;
        }

        let owner = if dice.is_empty() { ChargeOwner::Coin } else { ChargeOwner::Dice };
        let mut launched = dice;
        launched.extend(coins);
        info!(?launched, power, "throw started");
        self.events.push(SessionEvent::ThrowStarted {
            owner,
            ids: launched.clone(),
            power,
        });
        self.was_rolling = true;
        Ok(launched)
    }

    fn apply_plan(&mut self, id: BodyId, plan: &ThrowPlan) -> Result<(), FlipError> {
        let body = self
            .bodies
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(FlipError::UnknownBody(id))?;
        self.engine
            .place(body.handle, plan.start_position, plan.start_orientation);
        self.engine.set_linear_velocity(body.handle, plan.linear_velocity);
        self.engine.set_angular_velocity(body.handle, plan.angular_velocity);
        body.position = plan.start_position;
        body.orientation = plan.start_orientation;
        body.linear_velocity = plan.linear_velocity;
        body.angular_velocity = plan.angular_velocity;
        body.launch();
        Ok(())
    }

    /// Every enabled, unlocked die.
    pub fn throw_all(&mut self, power: u8) -> Result<Vec<BodyId>, FlipError> {
        let ids = self.eligible_ids(ChargeOwner::Dice);
        self.request_throw(&ids, power)
    }

    pub fn flip_coin(&mut self, power: u8) -> Result<Vec<BodyId>, FlipError> {
        let ids = self.eligible_ids(ChargeOwner::Coin);
        self.request_throw(&ids, power)
    }

    // ---------- charging ----------

    pub fn start_charge(&mut self, owner: ChargeOwner) -> Result<(), FlipError> {
        if self.is_rolling() {
            return Err(FlipError::ThrowInProgress);
        }
        if self.charge_mut(owner).start() {
            self.events.push(SessionEvent::PowerChanged { owner, power: 0 });
        }
        Ok(())
    }

    /// Ends the charge and throws every eligible body of that control. While
    /// another throw rolls the charge is left running and the call fails.
    #[instrument(skip(self))]
    pub fn release_charge(&mut self, owner: ChargeOwner) -> Result<Vec<BodyId>, FlipError> {
        if self.charge(owner).is_charging() && self.is_rolling() {
            return Err(FlipError::ThrowInProgress);
        }
        let power = self.charge_mut(owner).release()?;
        self.events.push(SessionEvent::PowerChanged { owner, power: 0 });
        let ids = self.eligible_ids(owner);
        self.request_throw(&ids, power)
    }

    /// Pointer leaving the control ends a running charge like a release.
    pub fn pointer_leave(&mut self, owner: ChargeOwner) -> Result<Vec<BodyId>, FlipError> {
        if !self.charge(owner).is_charging() {
            return Ok(Vec::new());
        }
        self.release_charge(owner)
    }

    /// Aborts a charge without throwing. Returns false when nothing was charging.
    pub fn cancel_charge(&mut self, owner: ChargeOwner) -> bool {
        let cancelled = self.charge_mut(owner).cancel();
        if cancelled {
            self.events.push(SessionEvent::PowerChanged { owner, power: 0 });
        }
        cancelled
    }

    fn staging_anchor(&self, owner: ChargeOwner, slot: usize, count: usize) -> Point3<Real> {
        let throw = &self.config.throw;
        let centre = (count.max(1) - 1) as Real / 2.0;
        let x = (slot as Real - centre) * throw.launch_spacing * 2.0;
        let z = match owner {
            ChargeOwner::Dice => throw.launch_z,
            ChargeOwner::Coin => 0.0,
        };
        Point3::new(x, self.config.charge.staging_height, z)
    }

    // ---------- frame ----------

    /// Advances one frame of `dt` seconds.
    pub fn step(&mut self, dt: Real) {
        self.advance_charges(dt);
        let contacts = self.engine.step(dt);
        self.hold_staged_bodies();

        for body in &mut self.bodies {
            if let Some(state) = self.engine.state(body.handle) {
                body.sync(&state);
            }
        }

        let enabled = self.bodies.iter().filter(|b| b.enabled).count();
        for body in &mut self.bodies {
            if self.play_area.recover(&mut self.engine, body.handle, enabled) {
                if let Some(state) = self.engine.state(body.handle) {
                    body.sync(&state);
                }
            }
        }

        self.forward_impacts(&contacts);
        self.observe_settling();

        let rolling = self.is_rolling();
        if self.was_rolling && !rolling {
            info!(frame = self.frame, "all bodies settled");
            self.events.push(SessionEvent::AllSettled);
        }
        self.was_rolling = rolling;
        self.frame += 1;
        self.clock += dt;
    }

    /// Steps at the configured frame rate until nothing rolls or `max_frames`
    /// pass. Returns the number of frames stepped.
    pub fn run_until_settled(&mut self, max_frames: u64) -> u64 {
        let dt = self.config.physics.frame_dt;
        let mut frames = 0;
        while self.is_rolling() && frames < max_frames {
            self.step(dt);
            frames += 1;
        }
        frames
    }

    fn advance_charges(&mut self, dt: Real) {
        for owner in [ChargeOwner::Dice, ChargeOwner::Coin] {
            let charge = self.charge_mut(owner);
            if charge.advance(dt) > 0 {
                let power = charge.power();
                self.events.push(SessionEvent::PowerChanged { owner, power });
            }
        }
    }

    /// Bodies of a charging control are posed, not simulated.
    fn hold_staged_bodies(&mut self) {
        for owner in [ChargeOwner::Dice, ChargeOwner::Coin] {
            let charge = self.charge(owner);
            if !charge.is_charging() {
                continue;
            }
            let (elapsed, power) = (charge.elapsed_secs(), charge.power());
            let ids = self.eligible_ids(owner);
            for (slot, id) in ids.iter().enumerate() {
                let anchor = self.staging_anchor(owner, slot, ids.len());
                let Some(body) = self.bodies.iter().find(|b| b.id == *id) else {
                    continue;
                };
                let pose = StagingPose::at(anchor, elapsed, body.phase_offset, power);
                self.engine.place(body.handle, pose.position, pose.orientation);
            }
        }
    }

    fn forward_impacts(&mut self, contacts: &[ContactEvent]) {
        for contact in contacts {
            let Some(body) = self.bodies.iter().find(|b| b.handle == contact.handle) else {
                continue;
            };
            let id = body.id;
            let recent = self
                .last_impact
                .get(&id)
                .is_some_and(|&t| self.clock - t < IMPACT_DEBOUNCE_SECS);
            if recent {
                continue;
            }
            self.last_impact.insert(id, self.clock);
            self.events.push(SessionEvent::Impact {
                id,
                speed: contact.impact_speed,
            });
        }
    }

    fn observe_settling(&mut self) {
        for body in &mut self.bodies {
            let step = body
                .detector
                .observe(&body.profile, &body.linear_velocity, &body.angular_velocity);
            let SettleStep::Settled { forced } = step else {
                continue;
            };
            let value = resolve(body.kind, &body.orientation);
            body.result = Some(value);
            let steps = body.detector.flight_steps();
            if forced {
                warn!(id = %body.id, %value, steps, "body never came to rest; settling it where it lies");
            } else {
                info!(id = %body.id, %value, steps, "body settled");
            }
            self.events.push(SessionEvent::Settled {
                id: body.id,
                value,
                forced,
            });
            self.history.push_front(RollRecord {
                id: body.id,
                kind: body.kind,
                value,
                frame: self.frame,
            });
            self.history.truncate(HISTORY_LIMIT);
        }
    }

    // ---------- presentation ----------

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Newest first.
    pub fn history(&self) -> impl Iterator<Item = &RollRecord> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Sum of settled dice; coins don't count.
    pub fn total(&self) -> u32 {
        self.bodies
            .iter()
            .filter_map(|b| b.result.and_then(RollValue::face))
            .sum()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            frame: self.frame,
            rolling: self.is_rolling(),
            dice_power: self.dice_charge.power(),
            coin_power: self.coin_charge.power(),
            bodies: self
                .bodies
                .iter()
                .map(|b| BodySnapshot {
                    id: b.id,
                    kind: b.kind,
                    position: [b.position.x, b.position.y, b.position.z],
                    enabled: b.enabled,
                    locked: b.locked,
                    rolling: b.is_rolling(),
                    result: b.result,
                })
                .collect(),
        }
    }
}
