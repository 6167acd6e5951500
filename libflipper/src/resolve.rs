use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normals::FaceTable;
use crate::solid::{BodyKind, SolidType};
use crate::{world_up, Real, UnitQuaternion};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

/// A settled body's reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RollValue {
    Face(u32),
    Coin(CoinSide),
}

impl RollValue {
    /// Face value, or `None` for a coin.
    pub fn face(self) -> Option<u32> {
        match self {
            RollValue::Face(v) => Some(v),
            RollValue::Coin(_) => None,
        }
    }
}

impl fmt::Display for RollValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollValue::Face(v) => write!(f, "{v}"),
            RollValue::Coin(CoinSide::Heads) => f.write_str("heads"),
            RollValue::Coin(CoinSide::Tails) => f.write_str("tails"),
        }
    }
}

/// Index of the table normal that points most upward (world +Y).
/// Ties keep the first index.
pub fn up_face_index(table: &FaceTable, orientation: &UnitQuaternion<Real>) -> usize {
    let r = orientation.to_rotation_matrix();
    let up = world_up();
    let mut best = 0usize;
    let mut best_dot = Real::MIN;
    for (i, n) in table.normals.iter().enumerate() {
        let d = (r * n).dot(&up);
        if d > best_dot {
            best_dot = d;
            best = i;
        }
    }
    best
}

/// Displayed value on the upward face. `orientation` must be normalized.
pub fn resolve_face(solid: SolidType, orientation: &UnitQuaternion<Real>) -> u32 {
    let table = FaceTable::for_solid(solid);
    table.value_at(up_face_index(table, orientation))
}

/// Heads when the coin's local +Y points above the horizon.
pub fn resolve_coin(orientation: &UnitQuaternion<Real>) -> CoinSide {
    if (orientation * world_up()).y > 0.0 {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

pub fn resolve(kind: BodyKind, orientation: &UnitQuaternion<Real>) -> RollValue {
    match kind {
        BodyKind::Die(solid) => RollValue::Face(resolve_face(solid, orientation)),
        BodyKind::Coin => RollValue::Coin(resolve_coin(orientation)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Quaternion, Vector3};
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_face_showing_each_normal() {
        for solid in SolidType::ALL {
            let table = FaceTable::for_solid(solid);
            for i in 0..table.len() {
                let q = table.orientation_showing(i);
                assert_eq!(resolve_face(solid, &q), table.value_at(i), "{solid} face {i}");
            }
        }
    }

    #[test]
    fn test_cube_identity_and_flip() {
        let identity = UnitQuaternion::identity();
        assert_eq!(resolve_face(SolidType::Cube, &identity), 2);
        let flipped = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI);
        assert_eq!(resolve_face(SolidType::Cube, &flipped), 5);
        // +Z tipped up by -90 degrees about X
        let tipped = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2);
        assert_eq!(resolve_face(SolidType::Cube, &tipped), 1);
        // +X tipped up by +90 degrees about Z
        let rolled = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        assert_eq!(resolve_face(SolidType::Cube, &rolled), 3);
    }

    #[test]
    fn test_tetra_identity_reads_one() {
        assert_eq!(resolve_face(SolidType::Tetra, &UnitQuaternion::identity()), 1);
    }

    #[test]
    fn test_d10_never_reads_out_of_range() {
        let table = FaceTable::for_solid(SolidType::PentTrapezohedron);
        let q = table.orientation_showing(11);
        assert_eq!(resolve_face(SolidType::PentTrapezohedron, &q), 2);
        let q = table.orientation_showing(10);
        assert_eq!(resolve_face(SolidType::PentTrapezohedron, &q), 1);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let q = UnitQuaternion::from_euler_angles(0.3, 1.2, -0.7);
        let first = resolve_face(SolidType::Icosa, &q);
        for _ in 0..10 {
            assert_eq!(resolve_face(SolidType::Icosa, &q), first);
        }
    }

    #[test]
    fn test_near_degenerate_quaternion_still_resolves() {
        let q = UnitQuaternion::new_unchecked(Quaternion::new(1e-20, 0.0, 0.0, 0.0));
        let v = resolve_face(SolidType::Dodeca, &q);
        assert!((1..=12).contains(&v));
    }

    #[test]
    fn test_coin_sides() {
        assert_eq!(resolve_coin(&UnitQuaternion::identity()), CoinSide::Heads);
        let flipped = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI);
        assert_eq!(resolve_coin(&flipped), CoinSide::Tails);
        assert_eq!(
            resolve(BodyKind::Coin, &flipped),
            RollValue::Coin(CoinSide::Tails)
        );
    }

    #[test]
    fn test_roll_value_display_and_json() {
        assert_eq!(RollValue::Face(17).to_string(), "17");
        assert_eq!(RollValue::Coin(CoinSide::Heads).to_string(), "heads");
        assert_eq!(serde_json::to_string(&RollValue::Face(3)).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&RollValue::Coin(CoinSide::Tails)).unwrap(),
            "\"tails\""
        );
    }
}
