//! GroundSim: a small impulse-based rigid-body engine for convex bodies on a
//! walled table.
//!
//! - Semi-implicit integration with linear and angular damping
//! - Fixed substeps inside each `step`
//! - Contacts from clipping each face against the floor and wall planes,
//!   one contact per clipped face at the clipped polygon's centroid
//! - Normal impulse with restitution, Coulomb friction, rolling resistance
//! - Positional correction against sinking
//!
//! Bodies do not collide with each other.

use tracing::trace;

use crate::config::{FlipConfig, TableConfig};
use crate::engine::{BodyHandle, BodyState, ContactEvent, PhysicsEngine};
use crate::error::FlipError;
use crate::geometry::Polyhedron;
use crate::solid::{BodyKind, SolidProfile};
use crate::{Point3, Quaternion, Real, UnitQuaternion, Vector3, EPS};
use nalgebra::Matrix3;

/// Closing speeds under this bounce with no restitution.
const RESTITUTION_THRESHOLD: Real = 1.0;
const DYNAMIC_FRICTION_RATIO: Real = 2.0 / 3.0;
const ROLL_RESISTANCE: Real = 0.02;
const CORRECTION_PERCENT: Real = 0.2;

/// A static half-space; free space is `normal . x >= offset`.
#[derive(Clone, Copy, Debug)]
struct StaticPlane {
    normal: Vector3<Real>,
    offset: Real,
    restitution: Real,
    friction: Real,
}

impl StaticPlane {
    fn distance(&self, p: &Point3<Real>) -> Real {
        self.normal.dot(&p.coords) - self.offset
    }
}

#[derive(Clone, Debug)]
struct SimBody {
    handle: BodyHandle,
    /// Vertices relative to the centre of mass.
    shape: Polyhedron,
    slop: Real,
    mass: Real,
    inv_mass: Real,
    inv_inertia_body: Matrix3<Real>,

    position: Point3<Real>,
    orientation: UnitQuaternion<Real>,
    velocity: Vector3<Real>,
    angular_velocity: Vector3<Real>,

    restitution: Real,
    friction: Real,
    linear_damping: Real,
    angular_damping: Real,
    touching: bool,
}

impl SimBody {
    fn inv_inertia_world(&self) -> Matrix3<Real> {
        let binding = self.orientation.to_rotation_matrix();
        let r = binding.matrix();
        r * self.inv_inertia_body * r.transpose()
    }

    fn apply_impulse_at_point(&mut self, impulse: Vector3<Real>, contact_r: Vector3<Real>) {
        self.velocity += impulse * self.inv_mass;
        let inv_iw = self.inv_inertia_world();
        self.angular_velocity += inv_iw * contact_r.cross(&impulse);
    }

    fn vertices_world(&self) -> impl Iterator<Item = Point3<Real>> + '_ {
        let r = self.orientation.to_rotation_matrix();
        self.shape.vertices.iter().map(move |p| self.position + r * p.coords)
    }

    fn state(&self) -> BodyState {
        BodyState {
            position: self.position,
            orientation: self.orientation,
            linear_velocity: self.velocity,
            angular_velocity: self.angular_velocity,
        }
    }
}

struct Contact {
    penetration: Real,
    /// From the body's centre of mass to the contact point.
    r: Vector3<Real>,
    normal: Vector3<Real>,
    restitution: Real,
    friction: Real,
}

pub struct GroundSim {
    bodies: Vec<SimBody>,
    planes: Vec<StaticPlane>,
    gravity: Vector3<Real>,
    substep_dt: Real,
    solver_iters: usize,
    next_handle: u32,
}

impl GroundSim {
    pub fn new(config: &FlipConfig) -> Self {
        let [gx, gy, gz] = config.physics.gravity;
        Self {
            bodies: Vec::new(),
            planes: table_planes(&config.table),
            gravity: Vector3::new(gx, gy, gz),
            substep_dt: config.physics.substep_dt.max(EPS),
            solver_iters: config.physics.solver_iters.max(1),
            next_handle: 0,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut SimBody> {
        self.bodies.iter_mut().find(|b| b.handle == handle)
    }

    fn substep(&mut self, dt: Real, events: &mut Vec<ContactEvent>) {
        for body in &mut self.bodies {
            body.velocity += self.gravity * dt;
            body.velocity *= 1.0 / (1.0 + dt * body.linear_damping);
            body.angular_velocity *= 1.0 / (1.0 + dt * body.angular_damping);
            body.position += body.velocity * dt;

            // q' = 0.5 * w * q
            let w = body.angular_velocity;
            let q = *body.orientation.quaternion();
            let dq = Quaternion::from_parts(0.0, w) * q * (0.5 * dt);
            body.orientation = UnitQuaternion::new_normalize(q + dq);
        }

        for body in &mut self.bodies {
            let mut impact: Option<Real> = None;
            for iter in 0..self.solver_iters {
                let contacts = detect_contacts(body, &self.planes);
                if iter == 0 {
                    impact = contacts
                        .iter()
                        .map(|c| -(body.velocity + body.angular_velocity.cross(&c.r)).dot(&c.normal))
                        .reduce(Real::max);
                }
                for c in &contacts {
                    resolve_contact_impulses(body, c);
                    positional_correction(body, c);
                }
            }

            match impact {
                Some(speed) if !body.touching => {
                    trace!(handle = ?body.handle, speed, "contact began");
                    events.push(ContactEvent {
                        handle: body.handle,
                        impact_speed: speed.max(0.0),
                    });
                    body.touching = true;
                }
                Some(_) => {}
                None => body.touching = false,
            }
        }

        for body in &mut self.bodies {
            // rolling resistance torque -> angular damping
            let inv_iw = body.inv_inertia_world();
            let tau = -body.angular_velocity * ROLL_RESISTANCE * body.mass;
            body.angular_velocity += inv_iw * tau * dt;

            // lift anything still inside a plane back out
            for plane in &self.planes {
                let depth = body
                    .vertices_world()
                    .map(|v| plane.distance(&v))
                    .fold(Real::INFINITY, Real::min);
                if depth < 0.0 {
                    body.position += plane.normal * (-depth + 1e-5);
                    let vn = body.velocity.dot(&plane.normal);
                    if vn < 0.0 && vn.abs() < 0.1 {
                        body.velocity -= plane.normal * vn;
                    }
                }
            }
        }
    }
}

impl PhysicsEngine for GroundSim {
    fn insert_body(
        &mut self,
        kind: BodyKind,
        profile: &SolidProfile,
        position: Point3<Real>,
        orientation: UnitQuaternion<Real>,
    ) -> Result<BodyHandle, FlipError> {
        let mut shape = Polyhedron::for_body(kind, &profile.collider)?;
        let props = shape.mass_props()?;
        shape.translate(&-props.centroid.coords);

        let mass = profile.mass.max(EPS);
        let density = mass / props.volume.abs();
        let inv_inertia_body = (props.inertia * density)
            .try_inverse()
            .ok_or(FlipError::Geometry("singular inertia tensor"))?;

        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        let slop = 0.01 * shape.radius();
        self.bodies.push(SimBody {
            handle,
            shape,
            slop,
            mass,
            inv_mass: 1.0 / mass,
            inv_inertia_body,
            position,
            orientation,
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            restitution: profile.restitution,
            friction: profile.friction,
            linear_damping: profile.linear_damping,
            angular_damping: profile.angular_damping,
            touching: false,
        });
        Ok(handle)
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        self.bodies.retain(|b| b.handle != handle);
    }

    fn state(&self, handle: BodyHandle) -> Option<BodyState> {
        self.bodies.iter().find(|b| b.handle == handle).map(SimBody::state)
    }

    fn set_position(&mut self, handle: BodyHandle, position: Point3<Real>) {
        if let Some(b) = self.body_mut(handle) {
            b.position = position;
        }
    }

    fn set_orientation(&mut self, handle: BodyHandle, orientation: UnitQuaternion<Real>) {
        if let Some(b) = self.body_mut(handle) {
            b.orientation = orientation;
        }
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vector3<Real>) {
        if let Some(b) = self.body_mut(handle) {
            b.velocity = velocity;
        }
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vector3<Real>) {
        if let Some(b) = self.body_mut(handle) {
            b.angular_velocity = velocity;
        }
    }

    fn step(&mut self, dt: Real) -> Vec<ContactEvent> {
        let mut events = Vec::new();
        if dt <= 0.0 {
            return events;
        }
        let substeps = (dt / self.substep_dt).ceil().max(1.0) as usize;
        let h = dt / substeps as Real;
        for _ in 0..substeps {
            self.substep(h, &mut events);
        }
        events
    }
}

/// Floor at y = 0 and four walls facing inward.
fn table_planes(table: &TableConfig) -> Vec<StaticPlane> {
    let wall = |normal: Vector3<Real>| StaticPlane {
        normal,
        offset: -table.half_extent,
        restitution: table.wall_restitution,
        friction: table.wall_friction,
    };
    vec![
        StaticPlane {
            normal: Vector3::y(),
            offset: 0.0,
            restitution: table.floor_restitution,
            friction: table.floor_friction,
        },
        wall(Vector3::x()),
        wall(-Vector3::x()),
        wall(Vector3::z()),
        wall(-Vector3::z()),
    ]
}

/// Clips every face against every plane, keeping the part behind the plane.
fn detect_contacts(body: &SimBody, planes: &[StaticPlane]) -> Vec<Contact> {
    let rmat = body.orientation.to_rotation_matrix();
    let pos = body.position;
    let mut contacts = Vec::new();

    for plane in planes {
        for face in &body.shape.faces {
            let poly_world: Vec<Point3<Real>> = face
                .iter()
                .map(|&vi| pos + rmat * body.shape.vertices[vi].coords)
                .collect();
            if poly_world.iter().all(|p| plane.distance(p) > 0.0) {
                continue;
            }

            // Sutherland-Hodgman against the half-space distance <= 0
            let mut output = Vec::with_capacity(poly_world.len() + 2);
            for i in 0..poly_world.len() {
                let a = poly_world[i];
                let b = poly_world[(i + 1) % poly_world.len()];
                let da = plane.distance(&a);
                let db = plane.distance(&b);
                match (da <= 0.0, db <= 0.0) {
                    (true, true) => output.push(b),
                    (true, false) => output.push(a + (b - a) * (da / (da - db))),
                    (false, true) => {
                        output.push(a + (b - a) * (da / (da - db)));
                        output.push(b);
                    }
                    (false, false) => {}
                }
            }
            if output.is_empty() {
                continue;
            }

            let count = output.len() as Real;
            let centroid = output.iter().map(|p| p.coords).sum::<Vector3<Real>>() / count;
            let penetration = output.iter().map(|p| -plane.distance(p)).sum::<Real>() / count;

            contacts.push(Contact {
                penetration: penetration.max(0.0),
                r: centroid - pos.coords,
                normal: plane.normal,
                restitution: (body.restitution + plane.restitution) * 0.5,
                friction: (body.friction + plane.friction) * 0.5,
            });
        }
    }
    contacts
}

fn resolve_contact_impulses(body: &mut SimBody, c: &Contact) {
    let n = c.normal;
    let v_rel = body.velocity + body.angular_velocity.cross(&c.r);
    let vn = v_rel.dot(&n);

    // inv_mass + n . ((I^-1 (r x n)) x r)
    let inv_i = body.inv_inertia_world();
    let angular = (inv_i * c.r.cross(&n)).cross(&c.r).dot(&n);
    let denom = body.inv_mass + angular;

    let mut jn = 0.0;
    if vn < 0.0 {
        let e = if -vn < RESTITUTION_THRESHOLD { 0.0 } else { c.restitution };
        jn = (-(1.0 + e) * vn / denom.max(EPS)).max(0.0);
    }
    body.apply_impulse_at_point(n * jn, c.r);

    // Coulomb friction
    let v_rel_post = body.velocity + body.angular_velocity.cross(&c.r);
    let vt = v_rel_post - n * v_rel_post.dot(&n);
    let vt_len = vt.norm();
    if vt_len > EPS {
        let t = vt / vt_len;
        let ang_t = (inv_i * c.r.cross(&t)).cross(&c.r).dot(&t);
        let denom_t = body.inv_mass + ang_t;
        let jt = -v_rel_post.dot(&t) / denom_t.max(EPS);

        let max_static = c.friction * jn;
        let jf = if jt.abs() > max_static {
            c.friction * DYNAMIC_FRICTION_RATIO * jn * jt.signum()
        } else {
            jt
        };
        body.apply_impulse_at_point(t * jf, c.r);
    }
}

fn positional_correction(body: &mut SimBody, c: &Contact) {
    let corr = (c.penetration - body.slop).max(0.0) * CORRECTION_PERCENT;
    if corr > 0.0 {
        body.position += c.normal * corr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::random_orientation;
    use crate::resolve::resolve_face;
    use crate::rng::StdThrowRng;
    use crate::solid::SolidType;
    use approx::assert_relative_eq;

    fn sim() -> (GroundSim, FlipConfig) {
        let cfg = FlipConfig::default();
        (GroundSim::new(&cfg), cfg)
    }

    fn add(sim: &mut GroundSim, cfg: &FlipConfig, kind: BodyKind, at: Point3<Real>) -> BodyHandle {
        sim.insert_body(kind, cfg.profiles.profile(kind), at, UnitQuaternion::identity())
            .unwrap()
    }

    #[test]
    fn test_free_fall_follows_gravity() {
        let (mut sim, cfg) = sim();
        let h = add(&mut sim, &cfg, BodyKind::Die(SolidType::Cube), Point3::new(0.0, 10.0, 0.0));
        sim.step(0.1);
        let s = sim.state(h).unwrap();
        // damping shaves a little off -2.0
        assert!(s.linear_velocity.y < -1.8 && s.linear_velocity.y > -2.0);
        assert!(s.position.y < 10.0);
    }

    #[test]
    fn test_cube_comes_to_rest_on_floor() {
        let (mut sim, cfg) = sim();
        let h = add(&mut sim, &cfg, BodyKind::Die(SolidType::Cube), Point3::new(0.0, 1.0, 0.0));
        for _ in 0..240 {
            sim.step(1.0 / 60.0);
        }
        let s = sim.state(h).unwrap();
        assert_relative_eq!(s.position.y, 0.25, epsilon = 0.03);
        assert!(s.linear_velocity.norm() < 0.1);
        assert_eq!(resolve_face(SolidType::Cube, &s.orientation), 2);
    }

    #[test]
    fn test_first_touch_emits_one_event() {
        let (mut sim, cfg) = sim();
        let h = add(&mut sim, &cfg, BodyKind::Die(SolidType::Cube), Point3::new(0.0, 1.0, 0.0));
        let mut events = Vec::new();
        for _ in 0..120 {
            events.extend(sim.step(1.0 / 60.0));
        }
        assert!(!events.is_empty());
        assert_eq!(events[0].handle, h);
        assert!(events[0].impact_speed > 1.0);
    }

    #[test]
    fn test_walls_contain_bodies() {
        let (mut sim, cfg) = sim();
        let h = add(&mut sim, &cfg, BodyKind::Die(SolidType::Cube), Point3::new(0.0, 0.5, 0.0));
        sim.set_linear_velocity(h, Vector3::new(30.0, 0.0, 0.0));
        for _ in 0..120 {
            sim.step(1.0 / 60.0);
        }
        let s = sim.state(h).unwrap();
        assert!(s.position.x < cfg.table.half_extent);
    }

    #[test]
    fn test_every_solid_lands() {
        let (mut sim, cfg) = sim();
        let handles: Vec<(SolidType, BodyHandle)> = SolidType::ALL
            .iter()
            .enumerate()
            .map(|(i, &solid)| {
                let kind = BodyKind::Die(solid);
                let at = Point3::new(i as Real - 2.5, 1.0, 0.0);
                let tilt = random_orientation(&mut StdThrowRng::from_seed(i as u64));
                let h = sim.insert_body(kind, cfg.profiles.profile(kind), at, tilt).unwrap();
                sim.set_angular_velocity(h, Vector3::new(3.0, 0.0, 2.0));
                (solid, h)
            })
            .collect();
        for _ in 0..300 {
            sim.step(1.0 / 60.0);
        }
        for (solid, h) in handles {
            let s = sim.state(h).unwrap();
            assert!(s.position.y > 0.0 && s.position.y < 0.7, "{solid}");
            let value = resolve_face(solid, &s.orientation);
            assert!((1..=solid.face_count()).contains(&value));
        }
    }

    #[test]
    fn test_remove_and_unknown_handles() {
        let (mut sim, cfg) = sim();
        let h = add(&mut sim, &cfg, BodyKind::Coin, Point3::new(0.0, 1.0, 0.0));
        assert_eq!(sim.body_count(), 1);
        sim.remove_body(h);
        assert_eq!(sim.body_count(), 0);
        assert!(sim.state(h).is_none());
        sim.set_position(h, Point3::origin());
        assert!(sim.step(1.0 / 60.0).is_empty());
    }

    #[test]
    fn test_place_stops_body() {
        let (mut sim, cfg) = sim();
        let h = add(&mut sim, &cfg, BodyKind::Die(SolidType::Octa), Point3::new(0.0, 3.0, 0.0));
        sim.step(0.2);
        sim.place(h, Point3::new(1.0, 2.0, 1.0), UnitQuaternion::identity());
        let s = sim.state(h).unwrap();
        assert_eq!(s.position, Point3::new(1.0, 2.0, 1.0));
        assert_eq!(s.linear_velocity, Vector3::zeros());
        assert_eq!(s.angular_velocity, Vector3::zeros());
    }
}
