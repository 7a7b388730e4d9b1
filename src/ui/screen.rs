use ratatui::Frame;

use crate::app::{App, AppState};
use crate::ui::{
    render_arena, render_calibration_break, render_recommendation, render_results,
};

/// A UI Screen boundary: renders one application state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Waiting to start, running or paused: the arena with its HUD
pub struct ArenaScreen;

impl Screen for ArenaScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_arena(app, f);
    }
}

pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_results(app, f);
    }
}

pub struct CalibrationBreakScreen;

impl Screen for CalibrationBreakScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_calibration_break(app, f);
    }
}

pub struct RecommendationScreen;

impl Screen for RecommendationScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_recommendation(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: AppState) -> Box<dyn Screen> {
    match state {
        AppState::Ready | AppState::Drill => Box::new(ArenaScreen),
        AppState::Results => Box::new(ResultsScreen),
        AppState::CalibrationBreak => Box::new(CalibrationBreakScreen),
        AppState::Recommendation => Box::new(RecommendationScreen),
    }
}
