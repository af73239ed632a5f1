//! The metronome's background thread.
//!
//! The worker owns no playback state. It waits on its command channel while
//! idle and, while ticking, uses the channel's receive timeout as its beat
//! timer so a stop request interrupts the wait immediately. Beat deadlines are
//! kept on the injected [`Clock`]; waits are sliced so a clock that jumps
//! forward is noticed without a real-time delay of a full beat.

use std::sync::atomic::Ordering;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::playback::PhaseCell;
use crate::tools::timer::Clock;

use super::tone::{Beat, ToneSink};
use super::Shared;

pub(super) enum Command {
    /// Begin ticking from beat zero.
    Start,
    /// Stop ticking; the sender is acknowledged once no further beat can fire.
    Stop(Sender<()>),
    Shutdown,
}

pub(super) struct WorkerContext {
    pub commands: Receiver<Command>,
    pub shared: Arc<Shared>,
    pub phase: PhaseCell,
    pub tones: Arc<dyn ToneSink>,
    pub clock: Arc<dyn Clock>,
}

const WAIT_SLICE: Duration = Duration::from_millis(5);

pub(super) fn run_metronome_thread(ctx: WorkerContext) {
    let WorkerContext {
        commands,
        shared,
        phase,
        tones,
        clock,
    } = ctx;
    let mut next_beat: Option<f64> = None;

    loop {
        let command = match next_beat {
            Some(deadline) => {
                let remaining = (deadline - clock.now()).max(0.0);
                let wait = Duration::from_secs_f64(remaining).min(WAIT_SLICE);
                match commands.recv_timeout(wait) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            },
        };

        match command {
            Some(Command::Start) => {
                shared.beat_counter.store(0, Ordering::SeqCst);
                shared.ticking.store(true, Ordering::SeqCst);
                next_beat = Some(clock.now());
            }
            Some(Command::Stop(ack)) => {
                next_beat = None;
                shared.ticking.store(false, Ordering::SeqCst);
                let _ = ack.send(());
            }
            Some(Command::Shutdown) => break,
            None => {
                let Some(deadline) = next_beat else {
                    continue;
                };
                if clock.now() < deadline {
                    continue;
                }
                if !shared.running.load(Ordering::SeqCst) || !phase.is_playing() {
                    debug!("metronome going idle (phase {})", phase.load());
                    next_beat = None;
                    shared.ticking.store(false, Ordering::SeqCst);
                    continue;
                }

                // Interval is re-read per beat so tempo changes land on the next one.
                let interval = shared.beat_interval();
                let index = shared.beat_counter.fetch_add(1, Ordering::SeqCst);
                tones.play(Beat::new(index));

                let now = clock.now();
                let mut next = deadline + interval;
                if next < now {
                    next = now + interval;
                }
                next_beat = Some(next);
            }
        }
    }

    shared.ticking.store(false, Ordering::SeqCst);
}
