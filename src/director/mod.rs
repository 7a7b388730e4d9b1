//! Target directors: one spawn/retire/movement strategy per drill type.
//!
//! A director owns the live target set for a session. The drill calls
//! [`TargetDirector::spawn_initial`] once on start, [`TargetDirector::on_tick`]
//! every frame and [`TargetDirector::on_hit`] when the resolver lands a hit.
//! All timestamps are session time in milliseconds (pauses excluded).

pub mod flick;
pub mod gridshot;
pub mod orbit;
pub mod switch;
pub mod track;

use rand::RngCore;

use crate::geometry::{distance, Arena, Point};
use crate::mode::{DrillSettings, TestMode};
use crate::target::{Target, TargetId};

pub use flick::FlickDirector;
pub use gridshot::GridshotDirector;
pub use orbit::OrbitDirector;
pub use switch::SwitchDirector;
pub use track::TrackDirector;

/// Which live targets a click may be resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPolicy {
    /// Every live target, first match in insertion order
    AnyLive,
    /// Only the target flagged active
    ActiveOnly,
    /// Clicks are never hit-tested and always count as misses
    AlwaysMiss,
}

/// What happened to the target set during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Targets retired because their lifetime ran out
    pub expired: Vec<Target>,
    /// The switch drill rotated the active target because it sat idle too long
    pub idle_switches: u32,
}

pub trait TargetDirector: std::fmt::Debug + Send {
    fn mode(&self) -> TestMode;

    fn spawn_initial(&mut self, now_ms: f64, rng: &mut dyn RngCore);

    fn on_tick(&mut self, now_ms: f64, rng: &mut dyn RngCore) -> TickReport;

    fn on_hit(&mut self, target_id: TargetId, now_ms: f64, rng: &mut dyn RngCore);

    fn targets(&self) -> &[Target];

    fn hit_policy(&self) -> HitPolicy;

    /// Drop every live target (session exit)
    fn clear(&mut self);

    /// The target the cursor is presumably chasing, used for motion sampling
    fn focus(&self, cursor: Point) -> Option<&Target> {
        self.targets()
            .iter()
            .filter(|t| t.is_active())
            .min_by(|a, b| {
                distance(cursor, a.position)
                    .partial_cmp(&distance(cursor, b.position))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

/// Select the strategy for a drill once, at session start
pub fn director_for(settings: &DrillSettings, arena: Arena) -> Box<dyn TargetDirector> {
    match settings.mode {
        TestMode::Gridshot => Box::new(GridshotDirector::new(settings, arena)),
        TestMode::Flick => Box::new(FlickDirector::new(settings, arena)),
        TestMode::Track => Box::new(TrackDirector::new(settings, arena)),
        TestMode::Switch => Box::new(SwitchDirector::new(settings, arena)),
        TestMode::Calibration => Box::new(OrbitDirector::new(settings, arena)),
    }
}
