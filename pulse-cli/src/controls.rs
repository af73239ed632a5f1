use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::error;
use pulse_lib::metronome::{MetronomeConfig, BEATS_PER_BAR};
use pulse_lib::playback::{format_time, Phase};

use crate::app::{App, Readout};

const SCRUB_STEP: f64 = 5.0;
const BPM_STEP: i64 = 5;

pub struct StatusSnapshot {
    pub text: String,
    /// Fraction of the track played, in `0.0..=1.0`.
    pub progress: f64,
    pub progress_label: String,
    /// Position of the last beat within the bar while the metronome ticks.
    pub beat: Option<u64>,
}

pub struct StatusArgs {
    pub track: String,
    pub readout: Readout,
    pub duration: f64,
    pub repeat: bool,
    pub seeking: bool,
    pub metronome: Option<MetronomeConfig>,
}

pub fn status_args(app: &App) -> StatusArgs {
    let playback = app.playback();
    StatusArgs {
        track: playback
            .track()
            .map(|track| track.display_name())
            .unwrap_or_else(|| "no track".to_string()),
        readout: app.readout(),
        duration: playback.duration(),
        repeat: playback.is_repeat(),
        seeking: app.session.is_seeking(),
        metronome: playback.metronome().map(|metronome| metronome.config()),
    }
}

pub fn status_text(args: StatusArgs) -> StatusSnapshot {
    let state = match args.readout.phase {
        Phase::Playing => "▶ Playing",
        Phase::Paused => "⏸ Paused",
        Phase::Loaded => "■ Loaded",
        Phase::Idle if args.readout.finished => "■ Finished",
        Phase::Idle => "■ Stopped",
    };
    let progress = if args.duration > 0.0 {
        (args.readout.position / args.duration).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let metronome = match args.metronome {
        Some(config) if config.running => format!("on @ {} bpm", config.bpm),
        Some(config) => format!("off ({} bpm)", config.bpm),
        None => "unavailable".to_string(),
    };
    let beat = args
        .metronome
        .filter(|config| config.ticking && config.beat_counter > 0)
        .map(|config| (config.beat_counter - 1) % BEATS_PER_BAR);
    let text = format!(
        "{}   {}{}\nRepeat: {} | Metronome: {}",
        state,
        args.track,
        if args.seeking { " (seeking)" } else { "" },
        if args.repeat { "on" } else { "off" },
        metronome,
    );

    StatusSnapshot {
        text,
        progress,
        progress_label: format!(
            "{} / {}",
            args.readout.formatted,
            format_time(args.duration)
        ),
        beat,
    }
}

/// Wait up to `timeout` for a key and apply it. Returns `false` on quit.
pub fn handle_key_event(app: &mut App, timeout: Duration) -> bool {
    if event::poll(timeout).unwrap_or(false) {
        if let Ok(Event::Key(key)) = event::read() {
            if key.kind != KeyEventKind::Press {
                return true;
            }
            return apply_key(app, key.code);
        }
    }

    true
}

pub fn apply_key(app: &mut App, code: KeyCode) -> bool {
    let result = match code {
        KeyCode::Char('q') | KeyCode::Char('Q') => {
            if let Err(err) = app.playback_mut().stop() {
                error!("{}", err);
            }
            return false;
        }
        KeyCode::Char(' ') => {
            if app.playback().phase() == Phase::Idle {
                app.reload()
            } else {
                app.playback_mut().toggle_play_pause()
            }
        }
        KeyCode::Char('s') | KeyCode::Char('S') => app.playback_mut().stop(),
        KeyCode::Char('r') | KeyCode::Char('R') => app.playback_mut().restart(),
        KeyCode::Char('p') | KeyCode::Char('P') => {
            app.playback_mut().toggle_repeat();
            Ok(())
        }
        KeyCode::Char('m') | KeyCode::Char('M') => {
            if let Some(metronome) = app.playback().metronome() {
                metronome.toggle();
            }
            Ok(())
        }
        KeyCode::Char('-') => {
            nudge_bpm(app, -BPM_STEP);
            Ok(())
        }
        KeyCode::Char('=') | KeyCode::Char('+') => {
            nudge_bpm(app, BPM_STEP);
            Ok(())
        }
        KeyCode::Left => {
            let target = app.playback().current_position() - SCRUB_STEP;
            app.session.scrub(target)
        }
        KeyCode::Right => {
            let target = app.playback().current_position() + SCRUB_STEP;
            app.session.scrub(target)
        }
        _ => Ok(()),
    };

    if let Err(err) = result {
        error!("{}", err);
    }
    true
}

fn nudge_bpm(app: &App, delta: i64) {
    if let Some(metronome) = app.playback().metronome() {
        let next = metronome.bpm() as i64 + delta;
        metronome.set_bpm_input(&next.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pulse_lib::playback::PlaybackClock;
    use pulse_lib::settings::EngineSettings;
    use pulse_lib::test_support::{RecordingBackend, RecordingTones};
    use pulse_lib::tools::timer::{Clock, ManualClock};

    use super::*;

    fn app() -> (App, ManualClock) {
        let time = ManualClock::new();
        let clock: Arc<dyn Clock> = Arc::new(time.clone());
        let backend = RecordingBackend::new().with_duration("/songs/a.mp3", 200.0);
        let mut playback = PlaybackClock::new(backend, clock.clone());
        playback.attach_metronome(Arc::new(RecordingTones::new()));
        let app = App::new(playback, clock, &EngineSettings::default(), "/songs/a.mp3");
        (app, time)
    }

    #[test]
    fn space_loads_and_toggles() {
        let (mut app, _) = app();
        assert!(apply_key(&mut app, KeyCode::Char(' ')));
        assert_eq!(app.playback().phase(), Phase::Playing);
        assert!(apply_key(&mut app, KeyCode::Char(' ')));
        assert_eq!(app.playback().phase(), Phase::Paused);
        assert_eq!(app.readout().phase, Phase::Paused);
    }

    #[test]
    fn arrows_scrub_by_five_seconds() {
        let (mut app, time) = app();
        apply_key(&mut app, KeyCode::Char(' '));
        time.advance_secs(20.0);
        apply_key(&mut app, KeyCode::Right);
        assert!((app.playback().current_position() - 25.0).abs() < 1e-9);
        apply_key(&mut app, KeyCode::Left);
        assert!((app.playback().current_position() - 20.0).abs() < 1e-9);
        assert!(app.session.is_seeking());
    }

    #[test]
    fn bpm_keys_step_and_clamp() {
        let (mut app, _) = app();
        apply_key(&mut app, KeyCode::Char('='));
        assert_eq!(app.playback().metronome().unwrap().bpm(), 125);
        for _ in 0..40 {
            apply_key(&mut app, KeyCode::Char('-'));
        }
        assert_eq!(app.playback().metronome().unwrap().bpm(), 30);
    }

    #[test]
    fn q_stops_and_quits() {
        let (mut app, _) = app();
        apply_key(&mut app, KeyCode::Char(' '));
        assert!(!apply_key(&mut app, KeyCode::Char('q')));
        assert_eq!(app.playback().phase(), Phase::Idle);
    }

    #[test]
    fn status_text_reports_metronome_and_progress() {
        let (mut app, _) = app();
        apply_key(&mut app, KeyCode::Char(' '));
        apply_key(&mut app, KeyCode::Char('m'));
        apply_key(&mut app, KeyCode::Char('p'));
        let status = status_text(status_args(&app));
        assert!(status.text.contains("▶ Playing"));
        assert!(status.text.contains("a.mp3"));
        assert!(status.text.contains("Repeat: on"));
        assert!(status.text.contains("on @ 120 bpm"));
        assert_eq!(status.progress_label, "0:00 / 3:20");
    }

    #[test]
    fn progress_follows_the_readout() {
        let (mut app, time) = app();
        apply_key(&mut app, KeyCode::Char(' '));
        time.advance_secs(50.0);
        app.session.poll().unwrap();
        let status = status_text(status_args(&app));
        assert!((status.progress - 0.25).abs() < 1e-9);
        assert_eq!(status.progress_label, "0:50 / 3:20");
        assert_eq!(status.beat, None);
    }

    #[test]
    fn beat_indicator_wraps_every_bar() {
        let (app, _) = app();
        let mut args = status_args(&app);
        let config = app.playback().metronome().unwrap().config();
        args.metronome = Some(MetronomeConfig {
            ticking: true,
            beat_counter: 6,
            ..config
        });
        assert_eq!(status_text(args).beat, Some(1));

        let mut args = status_args(&app);
        args.metronome = Some(MetronomeConfig {
            ticking: false,
            beat_counter: 6,
            ..config
        });
        assert_eq!(status_text(args).beat, None);
    }
}
