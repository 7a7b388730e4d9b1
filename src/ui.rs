pub mod charting;
pub mod screen;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Points},
        Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, Wrap,
    },
    Frame,
};

use crate::app::{App, AppState};
use crate::hit_policy::ClickOutcome;
use crate::metrics::SessionMetrics;
use crate::mode::TestMode;
use crate::session::SessionState;
use crate::target::{Target, TargetKind};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(app.state).render(app, f);
}

fn arena_layout(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // hud
            Constraint::Min(1),    // canvas
            Constraint::Length(1), // legend
        ])
        .split(area)
}

/// Where the arena canvas lands for a given terminal size
pub fn canvas_area(area: Rect) -> Rect {
    arena_layout(area)[1]
}

fn target_color(target: &Target) -> Color {
    match target.kind {
        TargetKind::Switch { active: false, .. } => Color::DarkGray,
        TargetKind::Moving { .. } => Color::Magenta,
        TargetKind::Orbit { .. } => Color::Cyan,
        _ => Color::Red,
    }
}

fn hud_line(app: &App) -> Line<'static> {
    let drill = app.drill();
    let m = drill.running_metrics();
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let mut spans = vec![
        Span::styled(format!("{} ", drill.mode()), bold.fg(Color::Cyan)),
        Span::styled(format!("{}  ", drill.settings().difficulty), dim),
        Span::styled(format!("{:.1}s  ", drill.remaining_ms() / 1000.0), bold),
        Span::raw(format!("score {}  ", m.score)),
        Span::raw(format!("{}/{} hits  ", m.total_hits, m.total_shots)),
        Span::raw(format!("{:.0}% acc  ", m.accuracy_pct())),
        Span::raw(format!("streak {}", m.streak)),
    ];
    if drill.mode() == TestMode::Track {
        spans.push(Span::raw(format!("  tracking {:.1}", m.tracking_accuracy)));
    }
    match app.last_outcome {
        Some(ClickOutcome::Hit { score_delta, .. }) => {
            spans.push(Span::styled(format!("  +{score_delta}"), bold.fg(Color::Green)))
        }
        Some(ClickOutcome::Miss { .. }) => {
            spans.push(Span::styled("  miss", bold.fg(Color::Red)))
        }
        None => {}
    }
    if let Some(c) = app.calibration() {
        spans.push(Span::styled(
            format!("  step {}/{}", c.session.step() + 1, c.session.total_steps()),
            dim,
        ));
    }
    Line::from(spans)
}

pub fn render_arena(app: &App, f: &mut Frame) {
    let chunks = arena_layout(f.area());
    let drill = app.drill();
    let arena = drill.arena();
    let italic = Style::default().add_modifier(Modifier::ITALIC);

    f.render_widget(Paragraph::new(hud_line(app)), chunks[0]);

    let banner = match (app.state, drill.state()) {
        (AppState::Ready, _) => match app.calibration().and_then(|c| c.session.current_setting()) {
            Some((dpi, sens)) => Some(format!(
                "set sensitivity {sens:.3} at {dpi} dpi, then press space"
            )),
            None => Some("press space to start".to_string()),
        },
        (_, SessionState::Paused) => Some("PAUSED - press p to resume".to_string()),
        _ => None,
    };

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([0.0, arena.width])
        .y_bounds([0.0, arena.height])
        .paint(|ctx| {
            for target in drill.targets() {
                let (x, y) = (target.position.x, arena.height - target.position.y);
                let color = target_color(target);
                ctx.draw(&Circle {
                    x,
                    y,
                    radius: target.radius(),
                    color,
                });
                ctx.draw(&Points {
                    coords: &[(x, y)],
                    color,
                });
            }
            let cursor = drill.cursor();
            ctx.draw(&Points {
                coords: &[(cursor.x, arena.height - cursor.y)],
                color: Color::Yellow,
            });
            if let Some(text) = &banner {
                let x = (arena.width / 2.0 - text.len() as f64 * 4.0).max(0.0);
                ctx.print(
                    x,
                    arena.height / 2.0,
                    Span::styled(
                        text.clone(),
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ),
                );
            }
        });
    f.render_widget(canvas, chunks[1]);

    let legend = match app.state {
        AppState::Drill => "(p)ause / (esc) abandon / (q)uit",
        _ => "(space) start / (esc) or (q)uit",
    };
    f.render_widget(Paragraph::new(Span::styled(legend, italic)), chunks[2]);
}

fn summary_lines(m: &SessionMetrics) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(
            format!(
                "score {}   {:.1}% acc   {}/{} hits   best streak {}",
                m.score, m.accuracy_pct, m.total_hits, m.total_shots, m.streak_best
            ),
            bold,
        )),
        Line::from(format!(
            "{:.0} ms avg reaction   {:.2} kills/s   {:.0}% consistency   {} expired",
            m.avg_reaction_ms, m.kills_per_second, m.consistency_pct, m.expired_targets
        )),
    ];
    let avg = |v: &[f64]| crate::util::mean(v).unwrap_or(0.0);
    let extra = match m.mode {
        TestMode::Flick if !m.flick_distances.is_empty() => {
            Some(format!("{:.0} px avg flick distance", avg(&m.flick_distances)))
        }
        TestMode::Switch if !m.switch_speeds_ms.is_empty() => {
            Some(format!("{:.0} ms avg switch time", avg(&m.switch_speeds_ms)))
        }
        TestMode::Track => m
            .tracking_accuracy_pct
            .map(|t| format!("{t:.1} tracking accuracy")),
        _ => None,
    };
    if let Some(text) = extra {
        lines.push(Line::from(text));
    }
    if let Some(motion) = m.motion {
        lines.push(Line::from(format!(
            "path {:.0}%   smoothness {:.0}%   prediction {:.0}%   overshoots {}   undershoots {}   corrections {}",
            motion.path_efficiency_pct,
            motion.movement_smoothness_pct,
            motion.prediction_accuracy_pct,
            motion.overshoots,
            motion.undershoots,
            motion.corrections
        )));
    }
    lines
}

pub fn render_results(app: &App, f: &mut Frame) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let magenta_style = Style::default().fg(Color::Magenta);

    let Some(m) = app.results() else {
        f.render_widget(Paragraph::new("no results"), f.area());
        return;
    };
    let lines = summary_lines(m);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),                        // chart
            Constraint::Length(lines.len() as u16),    // stats
            Constraint::Length(1),                     // padding
            Constraint::Length(1),                     // legend
        ])
        .split(f.area());

    let coords = charting::reaction_series(&m.reaction_times_ms);
    let (hits, highest_ms) = charting::compute_chart_params(&coords);
    let datasets = vec![Dataset::default()
        .marker(Marker::Braille)
        .style(magenta_style)
        .graph_type(GraphType::Line)
        .data(&coords)];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("hit")
                .bounds([1.0, hits])
                .labels(vec![
                    Span::styled("1", bold_style),
                    Span::styled(charting::format_label(hits), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("ms")
                .bounds([0.0, highest_ms])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(highest_ms), bold_style),
                ]),
        );
    f.render_widget(chart, chunks[0]);

    f.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        chunks[1],
    );
    f.render_widget(
        Paragraph::new(Span::styled("(r)etry / (esc) or (q)uit", italic_style)),
        chunks[3],
    );
}

pub fn render_calibration_break(app: &App, f: &mut Frame) {
    let Some(c) = app.calibration() else {
        return;
    };
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "Sub-test {} of {} done",
            c.session.step(),
            c.session.total_steps()
        ),
        bold.fg(Color::Cyan),
    ))];
    if let Some(run) = c.session.runs().last() {
        lines.push(Line::from(format!(
            "{:.1} cm/360   {:.1}% acc   {:.0} ms reaction   {:.0}% path efficiency",
            run.cm_per_360, run.accuracy_pct, run.reaction_time_ms, run.path_efficiency_pct
        )));
    }
    lines.push(Line::from(""));
    if let Some((dpi, sens)) = c.session.current_setting() {
        lines.push(Line::from(Span::styled(
            format!("Set your in-game sensitivity to {sens:.3} ({dpi} dpi), then press space"),
            bold.fg(Color::Yellow),
        )));
    }
    lines.push(Line::from(Span::styled(
        "(space) or (n)ext / (q)uit",
        Style::default().add_modifier(Modifier::ITALIC),
    )));

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Calibration"))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(widget, f.area());
}

pub fn render_recommendation(app: &App, f: &mut Frame) {
    let Some(c) = app.calibration() else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(8), // recommendation
            Constraint::Min(3),    // runs
            Constraint::Length(1), // legend
        ])
        .split(f.area());

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let text = match &c.recommendation {
        Some(r) => vec![
            Line::from(Span::styled(
                format!("{:.3} sensitivity at {} dpi", r.sensitivity, r.dpi),
                bold.fg(Color::Green),
            )),
            Line::from(format!(
                "{:.1} cm/360   {:.0}% confidence   mousepad: {}",
                r.cm_per_360, r.confidence_pct, r.mousepad_recommendation
            )),
            Line::from(""),
            Line::from(r.reasoning.clone()),
        ],
        None => vec![Line::from("no recommendation")],
    };
    f.render_widget(
        Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Recommendation for {}", c.profile.name)),
            )
            .wrap(Wrap { trim: true }),
        chunks[0],
    );

    let header = Row::new(vec!["sens", "cm/360", "acc %", "reaction ms", "consistency %", "path %"])
        .style(bold);
    let rows = c.session.runs().iter().map(|run| {
        Row::new(vec![
            Cell::from(format!("{:.3}", run.sensitivity)),
            Cell::from(format!("{:.1}", run.cm_per_360)),
            Cell::from(format!("{:.1}", run.accuracy_pct)),
            Cell::from(format!("{:.0}", run.reaction_time_ms)),
            Cell::from(format!("{:.0}", run.consistency_pct)),
            Cell::from(format!("{:.0}", run.path_efficiency_pct)),
        ])
    });
    let table = Table::new(rows, [Constraint::Length(14); 6])
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("This session"));
    f.render_widget(table, chunks[1]);

    f.render_widget(
        Paragraph::new(Span::styled(
            "(r)edo calibration / (esc) or (q)uit",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
        chunks[2],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationPlan;
    use crate::mode::{Difficulty, DrillSettings};
    use crate::profiles::lookup;
    use ratatui::{backend::TestBackend, Terminal};

    fn rendered(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn drill_app(mode: TestMode, secs: f64) -> App {
        let mut app = App::new_drill(DrillSettings::new(mode, Difficulty::Easy, secs), None);
        app.set_viewport(canvas_area(Rect::new(0, 0, 80, 24)));
        app
    }

    #[test]
    fn test_canvas_area_leaves_hud_and_legend() {
        let area = canvas_area(Rect::new(0, 0, 80, 24));
        assert_eq!(area, Rect::new(0, 1, 80, 22));
    }

    #[test]
    fn test_ready_screen() {
        let app = drill_app(TestMode::Gridshot, 10.0);
        let text = rendered(&app, 80, 24);
        assert!(text.contains("gridshot"));
        assert!(text.contains("(space) start"));
    }

    #[test]
    fn test_running_screen_shows_hud() {
        let mut app = drill_app(TestMode::Track, 10.0);
        app.on_key(
            crossterm::event::KeyEvent::new(
                crossterm::event::KeyCode::Char(' '),
                crossterm::event::KeyModifiers::NONE,
            ),
            0.0,
        );
        app.on_tick(16.0);
        let text = rendered(&app, 80, 24);
        assert!(text.contains("tracking"));
        assert!(text.contains("(p)ause"));
    }

    #[test]
    fn test_results_screen() {
        let mut app = drill_app(TestMode::Flick, 0.2);
        app.on_key(
            crossterm::event::KeyEvent::new(
                crossterm::event::KeyCode::Char(' '),
                crossterm::event::KeyModifiers::NONE,
            ),
            0.0,
        );
        let mut now = 0.0;
        while app.state == AppState::Drill {
            now += 16.0;
            app.on_tick(now);
        }
        let text = rendered(&app, 100, 30);
        assert!(text.contains("score 0"));
        assert!(text.contains("(r)etry"));
    }

    #[test]
    fn test_small_terminal_does_not_panic() {
        let app = drill_app(TestMode::Switch, 10.0);
        rendered(&app, 10, 3);
    }

    #[test]
    fn test_calibration_ready_shows_setting() {
        let app = App::new_calibration(
            CalibrationPlan::new(800, 0.5),
            Difficulty::Medium,
            20.0,
            lookup("apex").unwrap(),
            "local".to_string(),
            None,
        );
        let text = rendered(&app, 120, 30);
        assert!(text.contains("0.300 at 800 dpi"));
        assert!(text.contains("step 1/5"));
    }
}
