use rand::RngCore;
use tracing::trace;

use crate::director::{HitPolicy, TargetDirector};
use crate::geometry::{distance, Point};
use crate::metrics::{HitEvent, MetricsAggregator, MissEvent};
use crate::target::{Target, TargetId, TargetKind};

const BASE_SCORE: u64 = 100;
const REACTION_BONUS_WINDOW_MS: f64 = 1000.0;
const SWITCH_BONUS_MAX: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    Hit {
        target_id: TargetId,
        reaction_ms: f64,
        score_delta: u64,
    },
    Miss {
        nearest_distance: Option<f64>,
    },
}

impl ClickOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, ClickOutcome::Hit { .. })
    }
}

/// Faster hits earn up to 100 extra points, nothing past one second
pub fn reaction_bonus(reaction_ms: f64) -> u64 {
    ((REACTION_BONUS_WINDOW_MS - reaction_ms) / 10.0).floor().max(0.0) as u64
}

pub fn mode_bonus(target: &Target, reaction_ms: f64) -> u64 {
    match target.kind {
        TargetKind::Flick { travel } => (travel / 10.0).floor().max(0.0) as u64,
        TargetKind::Switch { .. } => {
            (SWITCH_BONUS_MAX - (reaction_ms / 10.0).floor()).max(0.0) as u64
        }
        _ => 0,
    }
}

pub fn score_for_hit(target: &Target, reaction_ms: f64) -> u64 {
    BASE_SCORE + reaction_bonus(reaction_ms) + mode_bonus(target, reaction_ms)
}

/// First eligible target containing the click, in insertion order
pub fn find_hit<'a>(director: &'a dyn TargetDirector, click: Point) -> Option<&'a Target> {
    match director.hit_policy() {
        HitPolicy::AnyLive => director.targets().iter().find(|t| t.contains(click)),
        HitPolicy::ActiveOnly => director
            .targets()
            .iter()
            .find(|t| t.is_active() && t.contains(click)),
        HitPolicy::AlwaysMiss => None,
    }
}

pub fn nearest_distance(targets: &[Target], click: Point) -> Option<f64> {
    targets
        .iter()
        .map(|t| distance(click, t.position))
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

/// Resolve one click against the live targets, update the running metrics
/// and let the director react to a hit.
pub fn apply_click(
    director: &mut dyn TargetDirector,
    metrics: &mut MetricsAggregator,
    click: Point,
    now_ms: f64,
    rng: &mut dyn RngCore,
) -> ClickOutcome {
    let hit = find_hit(director, click).map(|target| {
        let reaction_ms = (now_ms - target.spawned_at).max(0.0);
        let event = HitEvent {
            reaction_ms,
            offset: click.offset_from(target.position),
            flick_distance: match target.kind {
                TargetKind::Flick { travel } => Some(travel),
                _ => None,
            },
            switch_interval_ms: matches!(target.kind, TargetKind::Switch { .. })
                .then_some(reaction_ms),
            score_delta: score_for_hit(target, reaction_ms),
        };
        (target.id, event)
    });

    match hit {
        Some((target_id, event)) => {
            let outcome = ClickOutcome::Hit {
                target_id,
                reaction_ms: event.reaction_ms,
                score_delta: event.score_delta,
            };
            trace!(target_id, reaction_ms = event.reaction_ms, "hit");
            metrics.record_hit(event);
            director.on_hit(target_id, now_ms, rng);
            outcome
        }
        None => {
            let nearest = nearest_distance(director.targets(), click);
            trace!(x = click.x, y = click.y, ?nearest, "miss");
            metrics.record_miss(MissEvent {
                position: click,
                nearest_distance: nearest,
            });
            ClickOutcome::Miss {
                nearest_distance: nearest,
            }
        }
    }
}
