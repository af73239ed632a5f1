use std::{
    io,
    path::Path,
    sync::Arc,
    thread::sleep,
    time::Duration,
};

use clap::ArgMatches;
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use pulse_lib::backend::RodioBackend;
use pulse_lib::error::ConfigError;
use pulse_lib::metronome::parse_bpm;
use pulse_lib::playback::{format_time, Phase, PlaybackClock, Session};
use pulse_lib::settings::EngineSettings;
use pulse_lib::tools::schedule::PeriodicScheduler;
use pulse_lib::tools::timer::{Clock, SystemClock};
use pulse_lib::track::probe_duration;
use pulse_lib::{PlaybackError, Result};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::app::App;
use crate::logging::{self, LogBuffer};
use crate::{controls, ui};

const FRAME: Duration = Duration::from_millis(50);

pub fn run(args: &ArgMatches, log_buffer: LogBuffer) -> Result<i32> {
    match args.subcommand() {
        Some(("info", sub)) => return print_info(sub),
        Some(("create", sub)) => return create(sub),
        _ => {}
    }

    let settings = settings_from_args(args)?;
    let Some(input) = args.get_one::<String>("INPUT") else {
        warn!("no input given");
        return Ok(-1);
    };
    let quiet = args.get_flag("quiet");

    info!("Starting Pulse");
    let backend = RodioBackend::open_default(&settings)?;
    let tones = backend.tones(settings.tones);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    let mut playback = PlaybackClock::new(backend, clock.clone());
    let metronome = playback.attach_metronome(Arc::new(tones));
    metronome.set_bpm(settings.bpm);
    if settings.metronome_enabled {
        metronome.enable();
    }

    let mut app = App::new(playback, clock.clone(), &settings, input);
    app.reload()?;
    app.playback_mut().set_repeat(settings.repeat);
    if let Some(seek) = args.get_one::<String>("seek") {
        match seek.trim().parse::<f64>() {
            Ok(target) => app.playback_mut().seek(target)?,
            Err(_) => warn!("ignoring invalid seek time {:?}", seek),
        }
    }

    let mut scheduler: PeriodicScheduler<App> = PeriodicScheduler::new(clock);
    Session::schedule_polling(&mut scheduler, settings.poll_interval());

    if quiet {
        run_quiet(&mut app, &mut scheduler);
    } else {
        run_tui(&mut app, &mut scheduler, &log_buffer);
    }

    info!("Exiting Pulse");
    Ok(0)
}

fn run_quiet(app: &mut App, scheduler: &mut PeriodicScheduler<App>) {
    while app.playback().phase() != Phase::Idle {
        scheduler.run_pending(app);
        sleep(scheduler.time_until_next().unwrap_or(FRAME).min(FRAME));
    }
}

fn run_tui(app: &mut App, scheduler: &mut PeriodicScheduler<App>, log_buffer: &LogBuffer) {
    let _raw_mode = RawModeGuard::enable().ok();
    let _stderr = logging::capture_stderr(log_buffer.clone());
    let mut stdout = io::stdout();
    let _ = execute!(stdout, EnterAlternateScreen, cursor::Hide);
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout)).ok();

    loop {
        scheduler.run_pending(app);

        if let Some(term) = terminal.as_mut() {
            let status = controls::status_text(controls::status_args(app));
            let log_lines = logging::snapshot(log_buffer);
            ui::draw_status(term, &status, &log_lines);
        }

        let wait = scheduler.time_until_next().unwrap_or(FRAME).min(FRAME);
        if !controls::handle_key_event(app, wait) {
            break;
        }
    }

    if let Some(mut term) = terminal {
        let _ = term.show_cursor();
        let _ = execute!(term.backend_mut(), LeaveAlternateScreen, cursor::Show);
    }
}

fn settings_from_args(args: &ArgMatches) -> std::result::Result<EngineSettings, ConfigError> {
    let mut settings = match args.get_one::<String>("settings") {
        Some(path) => EngineSettings::from_file(path)?,
        None => EngineSettings::default(),
    };
    if let Some(bpm) = args.get_one::<String>("bpm") {
        match parse_bpm(bpm) {
            Ok(value) => settings.bpm = value,
            Err(err) => warn!("ignoring {}; keeping {} bpm", err, settings.bpm),
        }
    }
    if args.get_flag("metronome") {
        settings.metronome_enabled = true;
    }
    if args.get_flag("repeat") {
        settings.repeat = true;
    }
    Ok(settings)
}

fn print_info(args: &ArgMatches) -> Result<i32> {
    let Some(input) = args.get_one::<String>("INPUT") else {
        return Ok(-1);
    };
    let path = Path::new(input);
    let seconds = probe_duration(path).map_err(PlaybackError::from)?;
    println!("path: {}", path.display());
    println!("duration: {} ({:.3}s)", format_time(seconds), seconds);
    Ok(0)
}

fn create(args: &ArgMatches) -> Result<i32> {
    match args.subcommand() {
        Some(("settings-json", _)) => {
            println!("{}", EngineSettings::default().to_json_pretty());
            Ok(0)
        }
        _ => Ok(-1),
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
