//! Out-of-bounds recovery. Runs every step regardless of rolling state; a
//! recovered body keeps its settle progress and simply continues from the
//! safe position.

use tracing::debug;

use crate::config::PlayAreaConfig;
use crate::engine::{BodyHandle, PhysicsEngine};
use crate::{Point3, Real};

#[derive(Clone, Debug)]
pub struct PlayArea {
    cfg: PlayAreaConfig,
}

impl PlayArea {
    pub fn new(cfg: PlayAreaConfig) -> Self {
        Self { cfg }
    }

    /// Horizontal half extent for `enabled` bodies in play.
    pub fn half_extent(&self, enabled: usize) -> Real {
        (self.cfg.base_half_extent + self.cfg.growth_per_body * enabled as Real).min(self.cfg.max_half_extent)
    }

    pub fn contains(&self, position: &Point3<Real>, enabled: usize) -> bool {
        let h = self.half_extent(enabled);
        position.x.abs() <= h
            && position.z.abs() <= h
            && position.y >= self.cfg.min_height
            && position.y <= self.cfg.max_height
    }

    pub fn safe_position(&self) -> Point3<Real> {
        let [x, y, z] = self.cfg.safe_position;
        Point3::new(x, y, z)
    }

    /// Teleports an escaped body to the safe position and stops it.
    /// Returns whether the body was moved.
    pub fn recover<E: PhysicsEngine + ?Sized>(&self, engine: &mut E, handle: BodyHandle, enabled: usize) -> bool {
        let Some(state) = engine.state(handle) else {
            return false;
        };
        if self.contains(&state.position, enabled) {
            return false;
        }
        debug!(?handle, position = ?state.position, "body left the play area; recovering");
        engine.set_position(handle, self.safe_position());
        engine.halt(handle);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_extent_grows_and_clamps() {
        let area = PlayArea::new(PlayAreaConfig::default());
        assert_eq!(area.half_extent(0), 5.0);
        assert!(area.half_extent(4) > area.half_extent(1));
        assert_eq!(area.half_extent(1000), 8.0);
    }

    #[test]
    fn test_contains() {
        let area = PlayArea::new(PlayAreaConfig::default());
        assert!(area.contains(&Point3::new(4.9, 1.0, -4.9), 0));
        assert!(!area.contains(&Point3::new(5.1, 1.0, 0.0), 0));
        assert!(area.contains(&Point3::new(5.1, 1.0, 0.0), 2));
        assert!(!area.contains(&Point3::new(0.0, -2.5, 0.0), 0));
        assert!(!area.contains(&Point3::new(0.0, 25.0, 0.0), 0));
        assert!(area.safe_position().y > 0.0);
    }
}
