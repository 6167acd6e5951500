//! Convex collision geometry for `GroundSim`.
//!
//! Every die is built as the intersection of its face-table planes, so face
//! `i` of the mesh is exactly face `i` of the normal table. Coins are a
//! sixteen-sided prism.

use crate::error::FlipError;
use crate::normals::FaceTable;
use crate::solid::{BodyKind, ColliderShape};
use crate::{Point3, Real, Vector3};
use nalgebra::Matrix3;

const PLANE_TOL: Real = 1e-4;
const COIN_SIDES: usize = 16;

/// Vertices and faces; each face is a CCW loop of vertex indices seen from outside.
#[derive(Clone, Debug)]
pub struct Polyhedron {
    pub vertices: Vec<Point3<Real>>,
    pub faces: Vec<Vec<usize>>,
}

/// A half-space `normal . x <= offset`, normal pointing out of the solid.
#[derive(Clone, Copy, Debug)]
pub struct FacePlane {
    pub normal: Vector3<Real>,
    pub offset: Real,
}

#[derive(Clone, Copy, Debug)]
pub struct MassProps {
    pub volume: Real,
    pub centroid: Point3<Real>,
    /// Unit-density inertia about the centroid.
    pub inertia: Matrix3<Real>,
}

impl Polyhedron {
    pub fn validate(&self) -> Result<(), FlipError> {
        if self.faces.is_empty() {
            return Err(FlipError::Geometry("no faces"));
        }
        if self.faces.len() >= 255 {
            return Err(FlipError::Geometry("face count must be < 255"));
        }
        if self.vertices.is_empty() {
            return Err(FlipError::Geometry("no vertices"));
        }
        for f in &self.faces {
            if f.len() < 3 {
                return Err(FlipError::Geometry("face with fewer than 3 vertices"));
            }
            if f.iter().any(|&i| i >= self.vertices.len()) {
                return Err(FlipError::Geometry("face index out of bounds"));
            }
        }
        Ok(())
    }

    /// Collision mesh for a body of `kind`.
    pub fn for_body(kind: BodyKind, collider: &ColliderShape) -> Result<Self, FlipError> {
        match (kind, collider) {
            (BodyKind::Coin, ColliderShape::Cylinder { radius, half_height }) => {
                Self::from_planes(&coin_planes(*radius, *half_height))
            }
            (BodyKind::Coin, _) => Err(FlipError::Geometry("coin needs a cylinder collider")),
            (BodyKind::Die(_), ColliderShape::Cylinder { .. }) => {
                Err(FlipError::Geometry("die needs a polyhedral collider"))
            }
            (BodyKind::Die(solid), ColliderShape::Cuboid { half_extent: d })
            | (BodyKind::Die(solid), ColliderShape::ConvexHull { inradius: d }) => {
                let planes: Vec<FacePlane> = FaceTable::for_solid(solid)
                    .normals
                    .iter()
                    .map(|&normal| FacePlane { normal, offset: *d })
                    .collect();
                Self::from_planes(&planes)
            }
        }
    }

    /// Intersects half-spaces. Face `i` of the result lies on `planes[i]`.
    pub fn from_planes(planes: &[FacePlane]) -> Result<Self, FlipError> {
        let mut vertices: Vec<Point3<Real>> = Vec::new();
        for i in 0..planes.len() {
            for j in i + 1..planes.len() {
                for k in j + 1..planes.len() {
                    let Some(p) = corner(&planes[i], &planes[j], &planes[k]) else {
                        continue;
                    };
                    let inside = planes.iter().all(|pl| pl.normal.dot(&p.coords) <= pl.offset + PLANE_TOL);
                    if inside && !vertices.iter().any(|v| (v - p).norm() < PLANE_TOL * 10.0) {
                        vertices.push(p);
                    }
                }
            }
        }

        let mut faces = Vec::with_capacity(planes.len());
        for plane in planes {
            let mut on_plane: Vec<usize> = (0..vertices.len())
                .filter(|&v| (plane.normal.dot(&vertices[v].coords) - plane.offset).abs() < PLANE_TOL)
                .collect();
            if on_plane.len() < 3 {
                return Err(FlipError::Geometry("plane does not bound a face"));
            }
            sort_ccw(&mut on_plane, &vertices, &plane.normal);
            faces.push(on_plane);
        }

        let poly = Polyhedron { vertices, faces };
        poly.validate()?;
        Ok(poly)
    }

    /// Outward unit normal of face `index`, from its winding.
    pub fn face_normal(&self, index: usize) -> Result<Vector3<Real>, FlipError> {
        let face = self
            .faces
            .get(index)
            .ok_or(FlipError::Geometry("face index out of range"))?;
        let corner = |k: usize| {
            face.get(k)
                .and_then(|&v| self.vertices.get(v))
                .copied()
                .ok_or(FlipError::Geometry("face references a missing vertex"))
        };
        let (a, b, c) = (corner(0)?, corner(1)?, corner(2)?);
        let n = (b - a).cross(&(c - a));
        if n.norm_squared() < 1e-12 {
            return Err(FlipError::Geometry("degenerate face"));
        }
        Ok(n.normalize())
    }

    /// Largest vertex distance from the origin.
    pub fn radius(&self) -> Real {
        self.vertices.iter().map(|v| v.coords.norm()).fold(1e-3, Real::max)
    }

    pub fn translate(&mut self, by: &Vector3<Real>) {
        for v in &mut self.vertices {
            *v += by;
        }
    }

    /// Volume, centroid and unit-density inertia, summed over the tetrahedra
    /// fanned from the origin to each face triangle.
    pub fn mass_props(&self) -> Result<MassProps, FlipError> {
        let mut volume = 0.0;
        let mut first = Vector3::zeros();
        // second moments: integral of x_i x_j over the solid
        let mut second = Matrix3::zeros();

        for face in &self.faces {
            let a = self.vertices[face[0]].coords;
            for w in face[1..].windows(2) {
                let b = self.vertices[w[0]].coords;
                let c = self.vertices[w[1]].coords;
                let vol = a.dot(&b.cross(&c)) / 6.0;
                volume += vol;
                first += (a + b + c) * (vol / 4.0);
                let sum = a + b + c;
                let own = a * a.transpose() + b * b.transpose() + c * c.transpose();
                second += (own + sum * sum.transpose()) * (vol / 20.0);
            }
        }

        if volume.abs() < 1e-12 {
            return Err(FlipError::Geometry("zero-volume polyhedron"));
        }
        let centroid = first / volume;
        let second_cm = second - centroid * centroid.transpose() * volume;
        let inertia = Matrix3::identity() * second_cm.trace() - second_cm;

        Ok(MassProps {
            volume,
            centroid: Point3::from(centroid),
            inertia,
        })
    }
}

fn corner(a: &FacePlane, b: &FacePlane, c: &FacePlane) -> Option<Point3<Real>> {
    let m = Matrix3::from_rows(&[a.normal.transpose(), b.normal.transpose(), c.normal.transpose()]);
    if m.determinant().abs() < 1e-6 {
        return None;
    }
    let inv = m.try_inverse()?;
    Some(Point3::from(inv * Vector3::new(a.offset, b.offset, c.offset)))
}

fn sort_ccw(indices: &mut [usize], vertices: &[Point3<Real>], normal: &Vector3<Real>) {
    let centre = indices.iter().map(|&i| vertices[i].coords).sum::<Vector3<Real>>() / indices.len() as Real;
    let u = (vertices[indices[0]].coords - centre).normalize();
    let w = normal.cross(&u);
    let angle = |i: usize| {
        let d = vertices[i].coords - centre;
        d.dot(&w).atan2(d.dot(&u))
    };
    indices.sort_by(|&p, &q| angle(p).total_cmp(&angle(q)));
}

/// Heads cap, tails cap, then the rim.
fn coin_planes(radius: Real, half_height: Real) -> Vec<FacePlane> {
    let mut planes = vec![
        FacePlane {
            normal: Vector3::y(),
            offset: half_height,
        },
        FacePlane {
            normal: -Vector3::y(),
            offset: half_height,
        },
    ];
    for s in 0..COIN_SIDES {
        let theta = s as Real * std::f32::consts::TAU / COIN_SIDES as Real;
        planes.push(FacePlane {
            normal: Vector3::new(theta.cos(), 0.0, theta.sin()),
            offset: radius,
        });
    }
    planes
}
