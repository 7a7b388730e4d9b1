use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::Rect;

use reticle::app::{App, AppAction, AppState, CELL_HEIGHT_PX, CELL_WIDTH_PX};
use reticle::mode::{Difficulty, DrillSettings, TestMode};
use reticle::runtime::{DrillEvent, FixedTicker, Runner, TestEventSource};

const FRAME_MS: f64 = 16.0;

fn key(c: char) -> DrillEvent {
    DrillEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn mouse(kind: MouseEventKind, column: u16, row: u16) -> DrillEvent {
    DrillEvent::Mouse(MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    })
}

/// Terminal cell holding the first live target
fn first_target_cell(app: &App) -> Option<(u16, u16)> {
    let target = app.drill().targets().first()?;
    Some((
        (target.position.x / CELL_WIDTH_PX) as u16,
        (target.position.y / CELL_HEIGHT_PX) as u16,
    ))
}

// Drives a whole gridshot drill through Runner/TestEventSource without a TTY,
// on simulated time so the run is deterministic in length.
#[test]
fn headless_drill_flow_completes() {
    let settings = DrillSettings::new(TestMode::Gridshot, Difficulty::Easy, 1.0);
    let mut app = App::new_drill(settings, None);
    app.set_viewport(Rect::new(0, 0, 100, 36));

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
    );

    let mut now = 0.0;
    tx.send(key(' ')).unwrap();
    assert_eq!(app.on_event(runner.step(), now), AppAction::Continue);
    assert_eq!(app.state, AppState::Drill);

    for frame in 0..200u32 {
        now += FRAME_MS;
        if frame % 10 == 0 {
            if let Some((column, row)) = first_target_cell(&app) {
                tx.send(mouse(MouseEventKind::Moved, column, row)).unwrap();
                tx.send(mouse(MouseEventKind::Down(MouseButton::Left), column, row))
                    .unwrap();
            }
        }
        // drain whatever was queued, then the timeout tick
        loop {
            let event = runner.step();
            let is_tick = matches!(event, DrillEvent::Tick);
            app.on_event(event, now);
            if is_tick {
                break;
            }
        }
        if app.state == AppState::Results {
            break;
        }
    }

    assert_eq!(app.state, AppState::Results);
    let results = app.results().expect("finished drill has results");
    assert!(results.total_hits >= 1, "clicks on target centres should land");
    assert_eq!(
        results.total_shots,
        results.total_hits + results.total_misses
    );
    assert!(results.accuracy_pct > 0.0 && results.accuracy_pct <= 100.0);
}

#[test]
fn headless_pause_freezes_the_clock() {
    let settings = DrillSettings::new(TestMode::Flick, Difficulty::Easy, 1.0);
    let mut app = App::new_drill(settings, None);
    app.set_viewport(Rect::new(0, 0, 100, 36));

    app.on_event(key(' '), 0.0);
    app.on_event(DrillEvent::Tick, 400.0);
    app.on_event(key('p'), 400.0);
    // a long pause must not finish the drill
    app.on_event(DrillEvent::Tick, 5_000.0);
    assert_eq!(app.state, AppState::Drill);
    assert!(!app.drill().has_finished());

    app.on_event(key('p'), 5_000.0);
    app.on_event(DrillEvent::Tick, 5_700.0);
    assert_eq!(app.state, AppState::Results);
    let results = app.results().unwrap();
    assert!((results.elapsed_ms - 1000.0).abs() < 1e-6);
}

#[test]
fn headless_escape_abandons_then_quit() {
    let settings = DrillSettings::new(TestMode::Switch, Difficulty::Easy, 30.0);
    let mut app = App::new_drill(settings, None);
    app.set_viewport(Rect::new(0, 0, 100, 36));

    app.on_event(key(' '), 0.0);
    app.on_event(
        DrillEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
        100.0,
    );
    assert_eq!(app.state, AppState::Ready);
    assert!(app.results().is_none());
    assert!(app.drill().targets().is_empty());

    assert_eq!(app.on_event(key('q'), 200.0), AppAction::Quit);
}
