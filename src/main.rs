use std::{
    io::{self, stdin},
    path::PathBuf,
    time::Instant,
};

use anyhow::Context;
use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Terminal,
};
use time_humanize::{Accuracy, HumanTime, Tense};
use tracing::warn;

use reticle::{
    app::{App, AppAction},
    calibration::CalibrationPlan,
    config::{Config, ConfigStore, FileConfigStore},
    logging::{init_logging, LogConfig, LogLevel},
    mode::{Difficulty, DrillSettings, MotionProfile, TestMode},
    optimizer::optimize,
    profiles,
    runtime::{CrosstermEventSource, DrillEvent, FixedTicker, Runner},
    stats::StatsDb,
    ui,
};

/// terminal aim trainer with drill analytics and sensitivity calibration
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal aim trainer: click targets with the mouse across gridshot, flick, tracking and switching drills, then calibrate and get a sensitivity recommendation for your game."
)]
pub struct Cli {
    /// drill to run
    #[clap(short = 'm', long, value_enum)]
    mode: Option<TestMode>,

    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// number of seconds to run the drill
    #[clap(short = 's', long)]
    duration: Option<u32>,

    /// target diameter in canvas pixels, overriding the difficulty default
    #[clap(long)]
    target_size: Option<f64>,

    /// movement pattern for the tracking drill
    #[clap(long, value_enum)]
    motion_profile: Option<MotionProfile>,

    /// mouse DPI you play at
    #[clap(long)]
    dpi: Option<u32>,

    /// in-game sensitivity you play at
    #[clap(long)]
    sensitivity: Option<f64>,

    /// game profile used for recommendations (valorant, csgo, apex, overwatch, fortnite)
    #[clap(short = 'g', long)]
    game: Option<String>,

    /// user id calibration runs are stored under
    #[clap(long)]
    user: Option<String>,

    /// run the sensitivity calibration series
    #[clap(long)]
    calibrate: bool,

    /// print a sensitivity recommendation from stored calibration runs
    #[clap(long)]
    optimize: bool,

    /// print the most recent drill results
    #[clap(long, num_args = 0..=1, default_missing_value = "10")]
    history: Option<usize>,

    /// write the full result history as CSV
    #[clap(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// persist the given flags as new defaults
    #[clap(long)]
    save: bool,

    /// error, warn, info, debug or trace
    #[clap(long, default_value = "info")]
    log_level: LogLevel,
}

impl Cli {
    /// Flags win over the stored config for this run
    fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(duration) = self.duration {
            config.duration_secs = duration;
        }
        if self.target_size.is_some() {
            config.target_size = self.target_size;
        }
        if self.dpi.is_some() {
            config.dpi = self.dpi;
        }
        if self.sensitivity.is_some() {
            config.sensitivity = self.sensitivity;
        }
        if let Some(game) = &self.game {
            config.game = game.clone();
        }
        if let Some(user) = &self.user {
            config.user_id = user.clone();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&LogConfig {
        level: cli.log_level,
        ..LogConfig::default()
    })?;

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply(&mut config);
    if cli.save {
        config_store
            .save(&config)
            .with_context(|| format!("saving config to {}", config_store.path().display()))?;
    }

    if let Some(limit) = cli.history {
        return print_history(limit);
    }
    if let Some(path) = &cli.export {
        let count = StatsDb::new()?.export_csv(path)?;
        println!("exported {count} results to {}", path.display());
        return Ok(());
    }
    if cli.optimize {
        return print_recommendation(&config);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = match StatsDb::new() {
        Ok(db) => Some(db),
        Err(e) => {
            warn!(error = %e, "results will not be saved");
            None
        }
    };
    let mut app = build_app(&cli, &config, store)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn build_app(cli: &Cli, config: &Config, store: Option<StatsDb>) -> anyhow::Result<App> {
    if cli.calibrate || config.mode == TestMode::Calibration {
        let plan = CalibrationPlan::from_config(config)?;
        let profile = profiles::lookup(&config.game)?;
        return Ok(App::new_calibration(
            plan,
            config.difficulty,
            config.calibration_secs as f64,
            profile,
            config.user_id.clone(),
            store,
        ));
    }

    let settings = DrillSettings::new(config.mode, config.difficulty, config.duration_secs as f64)
        .with_target_size(config.target_size)
        .with_motion_profile(cli.motion_profile);
    Ok(App::new_drill(settings, store))
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::frame());
    let started = Instant::now();
    let now_ms = || started.elapsed().as_secs_f64() * 1000.0;

    fit_viewport(terminal, app)?;

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        let event = runner.step();
        if let DrillEvent::Resize = event {
            fit_viewport(terminal, app)?;
        }
        if app.on_frame(event, now_ms()) == AppAction::Quit {
            break;
        }
    }

    Ok(())
}

fn fit_viewport<B: Backend>(terminal: &Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    let size = terminal.size().context("reading terminal size")?;
    app.set_viewport(ui::canvas_area(Rect::new(0, 0, size.width, size.height)));
    Ok(())
}

fn print_history(limit: usize) -> anyhow::Result<()> {
    let db = StatsDb::new()?;
    let results = db.recent_results(limit)?;
    if results.is_empty() {
        println!("no results recorded yet");
        return Ok(());
    }
    for stored in results {
        let r = &stored.result;
        let age = (Local::now() - stored.recorded_at).to_std().unwrap_or_default();
        println!(
            "{:>18}  {:<11} {:<6} score {:>6}  {:5.1}% acc  {:>3}/{:<3} hits  {:4.0} ms",
            HumanTime::from(age).to_text_en(Accuracy::Rough, Tense::Past),
            r.test_mode.to_string(),
            r.difficulty.to_string(),
            r.score,
            r.accuracy,
            r.total_hits,
            r.total_shots,
            r.average_reaction_time,
        );
    }
    Ok(())
}

fn print_recommendation(config: &Config) -> anyhow::Result<()> {
    let plan = CalibrationPlan::from_config(config)?;
    let profile = profiles::lookup(&config.game)?;
    let runs = StatsDb::new()?.calibration_runs(&config.user_id)?;
    let result = optimize(&runs, plan.dpi, &profile);

    println!("{} ({} calibration runs)", profile.name, runs.len());
    println!("  sensitivity  {:.3} at {} dpi", result.sensitivity, result.dpi);
    println!("  cm/360       {:.1}", result.cm_per_360);
    println!("  confidence   {:.0}%", result.confidence_pct);
    println!("  mousepad     {}", result.mousepad_recommendation);
    println!();
    println!("{}", result.reasoning);
    Ok(())
}
