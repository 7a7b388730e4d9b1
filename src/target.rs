use crate::geometry::{is_hit, Point, Velocity};
use crate::mode::MotionProfile;

pub type TargetId = u64;

/// Mode-specific target state
#[derive(Debug, Clone, PartialEq)]
pub enum TargetKind {
    /// Gridshot: static, expires after its lifetime
    Static,
    /// Flick: static, remembers how far the previous target was
    Flick { travel: f64 },
    /// Track: continuously moving
    Moving {
        velocity: Velocity,
        profile: MotionProfile,
    },
    /// Switch: only the active target accepts hits
    Switch { active: bool, index: usize },
    /// Calibration: travels along a circle around `center`
    Orbit {
        center: Point,
        orbit_radius: f64,
        angle: f64,
        angular_speed: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: TargetId,
    pub position: Point,
    /// Diameter in canvas pixels
    pub size: f64,
    /// When the target became hittable. Switch targets are re-armed on activation.
    pub spawned_at: f64,
    pub lifetime_ms: Option<f64>,
    pub kind: TargetKind,
}

impl Target {
    pub fn new(id: TargetId, position: Point, size: f64, spawned_at: f64, kind: TargetKind) -> Self {
        Self {
            id,
            position,
            size,
            spawned_at,
            lifetime_ms: None,
            kind,
        }
    }

    pub fn with_lifetime(mut self, lifetime_ms: Option<f64>) -> Self {
        self.lifetime_ms = lifetime_ms;
        self
    }

    pub fn radius(&self) -> f64 {
        self.size / 2.0
    }

    pub fn contains(&self, p: Point) -> bool {
        is_hit(p, self.position, self.size)
    }

    pub fn is_expired(&self, now_ms: f64) -> bool {
        self.lifetime_ms
            .is_some_and(|lifetime| now_ms - self.spawned_at >= lifetime)
    }

    pub fn is_active(&self) -> bool {
        match self.kind {
            TargetKind::Switch { active, .. } => active,
            _ => true,
        }
    }

    /// Current velocity in px/s (zero for static targets)
    pub fn velocity(&self) -> Velocity {
        match self.kind {
            TargetKind::Moving { velocity, .. } => velocity,
            TargetKind::Orbit {
                orbit_radius,
                angle,
                angular_speed,
                ..
            } => Velocity::new(
                -orbit_radius * angular_speed * angle.sin(),
                orbit_radius * angular_speed * angle.cos(),
            ),
            _ => Velocity::default(),
        }
    }
}

/// Monotonic id source owned by each director
#[derive(Debug, Default, Clone)]
pub struct IdGen {
    next: TargetId,
}

impl IdGen {
    pub fn next_id(&mut self) -> TargetId {
        self.next += 1;
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let t = Target::new(1, Point::new(0.0, 0.0), 40.0, 1000.0, TargetKind::Static)
            .with_lifetime(Some(500.0));
        assert!(!t.is_expired(1499.0));
        assert!(t.is_expired(1500.0));
    }

    #[test]
    fn test_no_lifetime_never_expires() {
        let t = Target::new(1, Point::new(0.0, 0.0), 40.0, 0.0, TargetKind::Static);
        assert!(!t.is_expired(f64::MAX));
    }

    #[test]
    fn test_inactive_switch_target() {
        let t = Target::new(
            1,
            Point::new(0.0, 0.0),
            40.0,
            0.0,
            TargetKind::Switch {
                active: false,
                index: 0,
            },
        );
        assert!(!t.is_active());
    }

    #[test]
    fn test_id_gen_is_monotonic() {
        let mut ids = IdGen::default();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }
}
