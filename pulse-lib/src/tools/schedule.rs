//! Cooperative periodic scheduler run from the control thread's loop.

use std::sync::Arc;
use std::time::Duration;

use super::timer::Clock;

/// Handle returned by [`PeriodicScheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

struct Task<Ctx> {
    id: TaskId,
    interval: f64,
    next_due: f64,
    callback: Box<dyn FnMut(&mut Ctx)>,
}

/// Runs callbacks at fixed intervals against a shared context.
///
/// Nothing happens in the background: the owner calls
/// [`run_pending`](Self::run_pending) from its loop and every task whose
/// deadline passed runs once. A task that fell several intervals behind runs
/// a single time and is realigned to the current time.
pub struct PeriodicScheduler<Ctx> {
    clock: Arc<dyn Clock>,
    tasks: Vec<Task<Ctx>>,
    next_id: u64,
}

impl<Ctx> PeriodicScheduler<Ctx> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tasks: Vec::new(),
            next_id: 0,
        }
    }

    /// Register `callback` to run every `interval`, starting with the next
    /// call to `run_pending`.
    pub fn schedule<F>(&mut self, interval: Duration, callback: F) -> TaskId
    where
        F: FnMut(&mut Ctx) + 'static,
    {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.tasks.push(Task {
            id,
            interval: interval.as_secs_f64(),
            next_due: self.clock.now(),
            callback: Box::new(callback),
        });
        id
    }

    /// Remove a task. Returns `false` if it was not scheduled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every due task once. Returns how many ran.
    pub fn run_pending(&mut self, ctx: &mut Ctx) -> usize {
        let now = self.clock.now();
        let mut ran = 0;
        for task in self.tasks.iter_mut() {
            if now < task.next_due {
                continue;
            }
            (task.callback)(ctx);
            ran += 1;
            task.next_due += task.interval;
            if task.next_due <= now {
                task.next_due = now + task.interval;
            }
        }
        ran
    }

    /// Time until the earliest task is due, zero if one already is.
    pub fn time_until_next(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.tasks
            .iter()
            .map(|task| task.next_due)
            .min_by(|a, b| a.total_cmp(b))
            .map(|due| Duration::from_secs_f64((due - now).max(0.0)))
    }
}
