//! Static face-normal tables, one per solid type, in the solid's local frame.
//!
//! Each table pairs its raw normals with the value displayed on that face.
//! The ten-sided die reuses the dodecahedron mesh, so it carries twelve raw
//! normals for ten displayed values; the two extra faces wrap back to 1 and 2.

use std::sync::OnceLock;

use crate::solid::SolidType;
use crate::{world_up, Real, UnitQuaternion, Vector3};

#[derive(Clone, Debug)]
pub struct FaceTable {
    pub solid: SolidType,
    /// Unit outward normals, local frame.
    pub normals: Vec<Vector3<Real>>,
    /// Displayed value for each normal, same length as `normals`.
    pub values: Vec<u32>,
}

static TABLES: OnceLock<Vec<FaceTable>> = OnceLock::new();

impl FaceTable {
    pub fn for_solid(solid: SolidType) -> &'static FaceTable {
        let tables = TABLES.get_or_init(|| SolidType::ALL.into_iter().map(build_table).collect());
        &tables[table_slot(solid)]
    }

    pub fn len(&self) -> usize {
        self.normals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }

    pub fn value_at(&self, index: usize) -> u32 {
        self.values[index]
    }

    /// First index showing `value`, if any.
    pub fn index_of(&self, value: u32) -> Option<usize> {
        self.values.iter().position(|&v| v == value)
    }

    /// An orientation that points face `index` straight up.
    pub fn orientation_showing(&self, index: usize) -> UnitQuaternion<Real> {
        let n = self.normals[index];
        UnitQuaternion::rotation_between(&n, &world_up()).unwrap_or_else(|| {
            // antiparallel: any half turn about a horizontal axis
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f32::consts::PI)
        })
    }
}

fn table_slot(solid: SolidType) -> usize {
    match solid {
        SolidType::Tetra => 0,
        SolidType::Cube => 1,
        SolidType::Octa => 2,
        SolidType::PentTrapezohedron => 3,
        SolidType::Dodeca => 4,
        SolidType::Icosa => 5,
    }
}

fn build_table(solid: SolidType) -> FaceTable {
    let normals = match solid {
        SolidType::Tetra => tetra_normals(),
        SolidType::Cube => cube_normals(),
        SolidType::Octa => octa_normals(),
        SolidType::PentTrapezohedron | SolidType::Dodeca => dodeca_normals(),
        SolidType::Icosa => icosa_normals(),
    };
    let values = match solid {
        // opposite faces sum to 7: +Z/-Z, +Y/-Y, +X/-X
        SolidType::Cube => vec![1, 6, 2, 5, 3, 4],
        _ => {
            let shown = solid.face_count() as usize;
            (0..normals.len()).map(|i| (i % shown) as u32 + 1).collect()
        }
    };
    FaceTable {
        solid,
        normals,
        values,
    }
}

fn unit(x: Real, y: Real, z: Real) -> Vector3<Real> {
    Vector3::new(x, y, z).normalize()
}

fn phi() -> Real {
    (1.0 + 5f32.sqrt()) / 2.0
}

fn tetra_normals() -> Vec<Vector3<Real>> {
    let third = 1.0 / 3.0;
    vec![
        Vector3::y(),
        unit(0.0, -third, 2.0 * 2f32.sqrt() / 3.0),
        unit(6f32.sqrt() / 3.0, -third, -(2f32.sqrt()) / 3.0),
        unit(-(6f32.sqrt()) / 3.0, -third, -(2f32.sqrt()) / 3.0),
    ]
}

fn cube_normals() -> Vec<Vector3<Real>> {
    vec![
        Vector3::z(),
        -Vector3::z(),
        Vector3::y(),
        -Vector3::y(),
        Vector3::x(),
        -Vector3::x(),
    ]
}

fn octa_normals() -> Vec<Vector3<Real>> {
    let mut out = Vec::with_capacity(8);
    for x in [1.0, -1.0] {
        for y in [1.0, -1.0] {
            for z in [1.0, -1.0] {
                out.push(unit(x, y, z));
            }
        }
    }
    out
}

fn dodeca_normals() -> Vec<Vector3<Real>> {
    let p = phi();
    [
        [0.0, p, 1.0],
        [0.0, p, -1.0],
        [0.0, -p, 1.0],
        [0.0, -p, -1.0],
        [1.0, 0.0, p],
        [-1.0, 0.0, p],
        [1.0, 0.0, -p],
        [-1.0, 0.0, -p],
        [p, 1.0, 0.0],
        [p, -1.0, 0.0],
        [-p, 1.0, 0.0],
        [-p, -1.0, 0.0],
    ]
    .into_iter()
    .map(|[x, y, z]| unit(x, y, z))
    .collect()
}

fn icosa_normals() -> Vec<Vector3<Real>> {
    let p = phi();
    let ip = 1.0 / p;
    let mut out = octa_normals();
    out.extend(
        [
            [0.0, ip, p],
            [0.0, ip, -p],
            [0.0, -ip, p],
            [0.0, -ip, -p],
            [ip, p, 0.0],
            [ip, -p, 0.0],
            [-ip, p, 0.0],
            [-ip, -p, 0.0],
            [p, 0.0, ip],
            [p, 0.0, -ip],
            [-p, 0.0, ip],
            [-p, 0.0, -ip],
        ]
        .into_iter()
        .map(|[x, y, z]| unit(x, y, z)),
    );
    out
}
