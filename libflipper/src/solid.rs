//! Solid types and the per-type configuration record.
//!
//! Everything that differs by body type (settle thresholds, streak length,
//! material, collider) lives in one `SolidProfile` per kind, looked up once
//! when a body joins the play set.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FlipError;
use crate::Real;

/// The six polyhedral die shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolidType {
    #[serde(rename = "D4")]
    Tetra,
    #[serde(rename = "D6")]
    Cube,
    #[serde(rename = "D8")]
    Octa,
    #[serde(rename = "D10")]
    PentTrapezohedron,
    #[serde(rename = "D12")]
    Dodeca,
    #[serde(rename = "D20")]
    Icosa,
}

impl SolidType {
    pub const ALL: [SolidType; 6] = [
        SolidType::Tetra,
        SolidType::Cube,
        SolidType::Octa,
        SolidType::PentTrapezohedron,
        SolidType::Dodeca,
        SolidType::Icosa,
    ];

    /// Number of displayed values.
    pub fn face_count(self) -> u32 {
        match self {
            SolidType::Tetra => 4,
            SolidType::Cube => 6,
            SolidType::Octa => 8,
            SolidType::PentTrapezohedron => 10,
            SolidType::Dodeca => 12,
            SolidType::Icosa => 20,
        }
    }

    pub fn from_sides(sides: u32) -> Result<Self, FlipError> {
        SolidType::ALL
            .into_iter()
            .find(|s| s.face_count() == sides)
            .ok_or(FlipError::InvalidSolidType { sides })
    }
}

impl fmt::Display for SolidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.face_count())
    }
}

/// What a body in the play set is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Die(SolidType),
    Coin,
}

impl BodyKind {
    pub fn is_coin(self) -> bool {
        matches!(self, BodyKind::Coin)
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyKind::Die(solid) => solid.fmt(f),
            BodyKind::Coin => f.write_str("coin"),
        }
    }
}

/// Collider tag handed to the physics engine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ColliderShape {
    Cuboid { half_extent: Real },
    /// Convex hull of the solid's face planes at the given inradius.
    ConvexHull { inradius: Real },
    Cylinder { radius: Real, half_height: Real },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolidProfile {
    /// Linear speed below which a step counts as slow.
    pub linear_threshold: Real,
    /// Angular speed below which a step counts as slow.
    pub angular_threshold: Real,
    /// Consecutive slow steps required before the body settles.
    pub settle_streak: u32,
    /// Steps in flight after which settlement is forced.
    pub max_flight_steps: u32,
    pub restitution: Real,
    pub friction: Real,
    pub linear_damping: Real,
    pub angular_damping: Real,
    pub mass: Real,
    pub collider: ColliderShape,
}

impl SolidProfile {
    /// Flat-resting bodies: long streak, tight threshold.
    fn flat(collider: ColliderShape, mass: Real, damping: Real) -> Self {
        Self {
            linear_threshold: 0.1,
            angular_threshold: 0.1,
            settle_streak: 30,
            max_flight_steps: 1200,
            restitution: 0.3,
            friction: 0.8,
            linear_damping: damping,
            angular_damping: damping,
            mass,
            collider,
        }
    }

    /// Polyhedra that rarely reach near-zero velocity: loose threshold, short streak.
    fn rounded(inradius: Real, threshold: Real, streak: u32) -> Self {
        Self {
            linear_threshold: threshold,
            angular_threshold: threshold,
            settle_streak: streak,
            max_flight_steps: 1200,
            restitution: 0.3,
            friction: 0.8,
            linear_damping: 0.5,
            angular_damping: 0.5,
            mass: 0.17,
            collider: ColliderShape::ConvexHull { inradius },
        }
    }

    /// Whether both speeds are under this profile's thresholds.
    pub fn is_slow(&self, linear_speed: Real, angular_speed: Real) -> bool {
        linear_speed < self.linear_threshold && angular_speed < self.angular_threshold
    }
}

/// One profile per body kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileTable {
    pub tetra: SolidProfile,
    pub cube: SolidProfile,
    pub octa: SolidProfile,
    pub pent_trapezohedron: SolidProfile,
    pub dodeca: SolidProfile,
    pub icosa: SolidProfile,
    pub coin: SolidProfile,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            tetra: SolidProfile::rounded(0.2, 0.3, 10),
            cube: SolidProfile::flat(ColliderShape::Cuboid { half_extent: 0.25 }, 0.17, 0.5),
            octa: SolidProfile::rounded(0.2, 0.3, 8),
            pent_trapezohedron: SolidProfile::rounded(0.24, 0.3, 8),
            dodeca: SolidProfile::rounded(0.26, 0.3, 8),
            icosa: SolidProfile::rounded(0.26, 0.3, 8),
            coin: SolidProfile::flat(
                ColliderShape::Cylinder {
                    radius: 0.4,
                    half_height: 0.03,
                },
                2.0,
                0.1,
            ),
        }
    }
}

impl ProfileTable {
    pub fn profile(&self, kind: BodyKind) -> &SolidProfile {
        match kind {
            BodyKind::Die(SolidType::Tetra) => &self.tetra,
            BodyKind::Die(SolidType::Cube) => &self.cube,
            BodyKind::Die(SolidType::Octa) => &self.octa,
            BodyKind::Die(SolidType::PentTrapezohedron) => &self.pent_trapezohedron,
            BodyKind::Die(SolidType::Dodeca) => &self.dodeca,
            BodyKind::Die(SolidType::Icosa) => &self.icosa,
            BodyKind::Coin => &self.coin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sides() {
        assert_eq!(SolidType::from_sides(6).unwrap(), SolidType::Cube);
        assert_eq!(SolidType::from_sides(10).unwrap(), SolidType::PentTrapezohedron);
        assert!(matches!(
            SolidType::from_sides(7),
            Err(FlipError::InvalidSolidType { sides: 7 })
        ));
    }

    #[test]
    fn test_labels() {
        assert_eq!(SolidType::Icosa.to_string(), "D20");
        assert_eq!(BodyKind::Die(SolidType::Tetra).to_string(), "D4");
        assert_eq!(BodyKind::Coin.to_string(), "coin");
    }

    #[test]
    fn test_thresholds_differ_by_type() {
        let table = ProfileTable::default();
        let icosa = table.profile(BodyKind::Die(SolidType::Icosa));
        let cube = table.profile(BodyKind::Die(SolidType::Cube));
        assert!(icosa.is_slow(0.2, 0.2));
        assert!(!cube.is_slow(0.2, 0.2));
        assert!(icosa.settle_streak < cube.settle_streak);
        assert_eq!(table.profile(BodyKind::Coin).settle_streak, cube.settle_streak);
    }

    #[test]
    fn test_profile_table_partial_json() {
        let json = r#"{ "cube": {
            "linear_threshold": 0.05, "angular_threshold": 0.05,
            "settle_streak": 40, "max_flight_steps": 900,
            "restitution": 0.2, "friction": 0.9,
            "linear_damping": 0.4, "angular_damping": 0.4, "mass": 0.2,
            "collider": { "shape": "cuboid", "half_extent": 0.3 } } }"#;
        let table: ProfileTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.cube.settle_streak, 40);
        assert_eq!(table.cube.collider, ColliderShape::Cuboid { half_extent: 0.3 });
        assert_eq!(table.icosa, ProfileTable::default().icosa);
    }
}
