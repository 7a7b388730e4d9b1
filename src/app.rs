//! Terminal application state: which drill or calibration is loaded, which
//! screen is showing, and how key and mouse events map onto the engine.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{info, warn};

use crate::calibration::{CalibrationPlan, CalibrationRun, CalibrationSession, CalibrationTick};
use crate::drill::{Drill, DrillTick};
use crate::geometry::{Arena, Point};
use crate::hit_policy::ClickOutcome;
use crate::metrics::SessionMetrics;
use crate::mode::{Difficulty, DrillSettings};
use crate::optimizer::{optimize, OptimizationResult};
use crate::profiles::GameProfile;
use crate::runtime::DrillEvent;
use crate::session::SessionState;
use crate::stats::StatsDb;
use crate::submission::{
    submit_calibration_or_log, submit_or_log, CalibrationSubmission, ResultSubmission,
};

/// Canvas pixels covered by one terminal cell
pub const CELL_WIDTH_PX: f64 = 8.0;
pub const CELL_HEIGHT_PX: f64 = 16.0;

/// Engine tick interval
pub const FRAME_MS: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Drill loaded, waiting for space
    Ready,
    Drill,
    Results,
    /// Between calibration sub-tests
    CalibrationBreak,
    Recommendation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

/// Maps terminal cells inside the canvas rect to arena pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub area: Rect,
}

impl Viewport {
    pub fn new(area: Rect) -> Self {
        Self { area }
    }

    pub fn arena(&self) -> Arena {
        Arena::new(
            self.area.width.max(1) as f64 * CELL_WIDTH_PX,
            self.area.height.max(1) as f64 * CELL_HEIGHT_PX,
        )
    }

    /// Centre of the cell, or `None` outside the canvas
    pub fn to_canvas(&self, column: u16, row: u16) -> Option<Point> {
        let a = self.area;
        if column < a.x || row < a.y || column >= a.x + a.width || row >= a.y + a.height {
            return None;
        }
        Some(Point::new(
            (column - a.x) as f64 * CELL_WIDTH_PX + CELL_WIDTH_PX / 2.0,
            (row - a.y) as f64 * CELL_HEIGHT_PX + CELL_HEIGHT_PX / 2.0,
        ))
    }
}

#[derive(Debug)]
pub struct CalibrationActivity {
    pub session: CalibrationSession,
    pub profile: GameProfile,
    pub user_id: String,
    pub recommendation: Option<OptimizationResult>,
}

#[derive(Debug)]
pub enum Activity {
    Drill(Drill),
    Calibration(Box<CalibrationActivity>),
}

#[derive(Debug)]
pub struct App {
    pub activity: Activity,
    pub state: AppState,
    pub viewport: Viewport,
    pub last_outcome: Option<ClickOutcome>,
    store: Option<StatsDb>,
    last_tick_ms: Option<f64>,
}

impl App {
    pub fn new_drill(settings: DrillSettings, store: Option<StatsDb>) -> Self {
        Self {
            activity: Activity::Drill(Drill::new(settings, Arena::default())),
            state: AppState::Ready,
            viewport: Viewport::default(),
            last_outcome: None,
            store,
            last_tick_ms: None,
        }
    }

    pub fn new_calibration(
        plan: CalibrationPlan,
        difficulty: Difficulty,
        subtest_secs: f64,
        profile: GameProfile,
        user_id: String,
        store: Option<StatsDb>,
    ) -> Self {
        let session = CalibrationSession::new(plan, difficulty, subtest_secs, Arena::default());
        Self {
            activity: Activity::Calibration(Box::new(CalibrationActivity {
                session,
                profile,
                user_id,
                recommendation: None,
            })),
            state: AppState::Ready,
            viewport: Viewport::default(),
            last_outcome: None,
            store,
            last_tick_ms: None,
        }
    }

    /// The drill currently on screen
    pub fn drill(&self) -> &Drill {
        match &self.activity {
            Activity::Drill(d) => d,
            Activity::Calibration(c) => c.session.drill(),
        }
    }

    pub fn calibration(&self) -> Option<&CalibrationActivity> {
        match &self.activity {
            Activity::Calibration(c) => Some(&**c),
            Activity::Drill(_) => None,
        }
    }

    pub fn results(&self) -> Option<&SessionMetrics> {
        self.drill().results()
    }

    pub fn store(&self) -> Option<&StatsDb> {
        self.store.as_ref()
    }

    /// New canvas rect from the layout; idle drills adopt the new size
    pub fn set_viewport(&mut self, area: Rect) {
        self.viewport = Viewport::new(area);
        let arena = self.viewport.arena();
        match &mut self.activity {
            Activity::Drill(d) => {
                d.resize(arena);
            }
            Activity::Calibration(c) => c.session.resize(arena),
        }
    }

    pub fn on_event(&mut self, event: DrillEvent, now_ms: f64) -> AppAction {
        match event {
            DrillEvent::Key(key) => self.on_key(key, now_ms),
            DrillEvent::Mouse(mouse) => {
                self.on_mouse(mouse, now_ms);
                AppAction::Continue
            }
            DrillEvent::Tick => {
                self.on_tick(now_ms);
                AppAction::Continue
            }
            DrillEvent::Resize => AppAction::Continue,
        }
    }

    pub fn on_key(&mut self, key: KeyEvent, now_ms: f64) -> AppAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return AppAction::Quit;
        }
        match (self.state, key.code) {
            (_, KeyCode::Char('q')) => return AppAction::Quit,
            (AppState::Ready, KeyCode::Char(' ')) => self.start(now_ms),
            (AppState::CalibrationBreak, KeyCode::Char(' ') | KeyCode::Char('n')) => {
                self.start(now_ms)
            }
            (AppState::Drill, KeyCode::Char('p')) => self.toggle_pause(now_ms),
            (AppState::Drill, KeyCode::Esc) => self.exit_drill(),
            (AppState::Results | AppState::Recommendation, KeyCode::Char('r')) => self.retry(),
            (AppState::Ready | AppState::Results | AppState::Recommendation, KeyCode::Esc) => {
                return AppAction::Quit
            }
            _ => {}
        }
        AppAction::Continue
    }

    pub fn on_mouse(&mut self, mouse: MouseEvent, now_ms: f64) {
        let Some(p) = self.viewport.to_canvas(mouse.column, mouse.row) else {
            return;
        };
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let outcome = match &mut self.activity {
                    Activity::Drill(d) => d.on_click(p.x, p.y, now_ms),
                    Activity::Calibration(c) => c.session.on_click(p.x, p.y, now_ms),
                };
                if outcome.is_some() {
                    self.last_outcome = outcome;
                }
            }
            MouseEventKind::Moved | MouseEventKind::Drag(_) => match &mut self.activity {
                Activity::Drill(d) => d.on_cursor_move(p.x, p.y),
                Activity::Calibration(c) => c.session.on_cursor_move(p.x, p.y),
            },
            _ => {}
        }
    }

    /// One pass of the terminal loop: handle the event, then make sure the
    /// engine ticked this frame
    pub fn on_frame(&mut self, event: DrillEvent, now_ms: f64) -> AppAction {
        let action = self.on_event(event, now_ms);
        if action == AppAction::Continue {
            self.tick_if_due(now_ms);
        }
        action
    }

    /// Tick only if none ran during the last frame. Bursts of mouse
    /// motion keep the runner from timing out into its own Tick.
    pub fn tick_if_due(&mut self, now_ms: f64) {
        if self.last_tick_ms.map_or(true, |last| now_ms - last >= FRAME_MS) {
            self.on_tick(now_ms);
        }
    }

    pub fn on_tick(&mut self, now_ms: f64) {
        self.last_tick_ms = Some(now_ms);
        if self.state != AppState::Drill {
            return;
        }
        match &mut self.activity {
            Activity::Drill(d) => {
                if let DrillTick::Ended(metrics) = d.tick(now_ms) {
                    let submission = ResultSubmission::from_metrics(d.settings(), &metrics);
                    if let Some(store) = self.store.as_mut() {
                        submit_or_log(store, &submission);
                    }
                    self.state = AppState::Results;
                }
            }
            Activity::Calibration(c) => match c.session.tick(now_ms) {
                CalibrationTick::SubtestFinished(run) => {
                    Self::store_run(self.store.as_mut(), &c.user_id, &run);
                    self.state = AppState::CalibrationBreak;
                }
                CalibrationTick::Complete(run) => {
                    Self::store_run(self.store.as_mut(), &c.user_id, &run);
                    let runs = Self::persisted_runs(self.store.as_ref(), c);
                    let dpi = c.session.plan().dpi;
                    c.recommendation = Some(optimize(&runs, dpi, &c.profile));
                    self.state = AppState::Recommendation;
                }
                CalibrationTick::Inactive | CalibrationTick::Running { .. } => {}
            },
        }
    }

    fn store_run(store: Option<&mut StatsDb>, user_id: &str, run: &CalibrationRun) {
        if let Some(store) = store {
            submit_calibration_or_log(store, &CalibrationSubmission::new(user_id, run));
        }
    }

    /// Everything stored for the user, or this session's runs without a store
    fn persisted_runs(store: Option<&StatsDb>, c: &CalibrationActivity) -> Vec<CalibrationRun> {
        match store.map(|s| s.calibration_runs(&c.user_id)) {
            Some(Ok(runs)) if !runs.is_empty() => runs,
            Some(Err(e)) => {
                warn!(error = %e, "could not read calibration history, using this session only");
                c.session.runs().to_vec()
            }
            _ => c.session.runs().to_vec(),
        }
    }

    fn start(&mut self, now_ms: f64) {
        let started = match &mut self.activity {
            Activity::Drill(d) => d.start(now_ms),
            Activity::Calibration(c) => c.session.start(now_ms),
        };
        if started {
            self.last_outcome = None;
            self.state = AppState::Drill;
        }
    }

    fn toggle_pause(&mut self, now_ms: f64) {
        let paused = self.drill().state() == SessionState::Paused;
        match &mut self.activity {
            Activity::Drill(d) if paused => d.resume(now_ms),
            Activity::Drill(d) => d.pause(now_ms),
            Activity::Calibration(c) if paused => c.session.resume(now_ms),
            Activity::Calibration(c) => c.session.pause(now_ms),
        };
    }

    /// Abandon the running drill without recording anything
    fn exit_drill(&mut self) {
        match &mut self.activity {
            Activity::Drill(d) => d.exit(),
            Activity::Calibration(c) => c.session.exit(),
        }
        self.last_outcome = None;
        self.state = match &self.activity {
            Activity::Calibration(c) if c.session.step() > 0 => AppState::CalibrationBreak,
            _ => AppState::Ready,
        };
    }

    /// Fresh drill with the same settings, or a fresh calibration series
    fn retry(&mut self) {
        let arena = self.viewport.arena();
        match &mut self.activity {
            Activity::Drill(d) => {
                *d = Drill::new(d.settings().clone(), arena);
            }
            Activity::Calibration(c) => {
                let plan = c.session.plan().clone();
                let difficulty = c.session.drill().settings().difficulty;
                let secs = c.session.drill().settings().duration_secs;
                c.session = CalibrationSession::new(plan, difficulty, secs, arena);
                c.recommendation = None;
            }
        }
        info!("drill reset for retry");
        self.last_outcome = None;
        self.state = AppState::Ready;
    }
}
