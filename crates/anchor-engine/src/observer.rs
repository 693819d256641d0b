//! Tick observers: optional hooks run once per completed tick
//!
//! Observers see the session after the full drift pipeline has run and may
//! hand back behavior-log lines. They never take part in the pipeline itself.
//! `MiniScheduler` is the tick-counted job runner used by domain plugins.

use crate::session::Session;
use std::collections::BTreeMap;

pub trait TickObserver: Send {
    /// Called after every completed tick. Returned lines are appended to the
    /// behavior log in order.
    fn on_tick(&mut self, session: &Session) -> Vec<String>;
}

/// A scheduled callback. Returning `Some(line)` logs it.
pub type Job = Box<dyn FnMut(&Session) -> Option<String> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schedule {
    /// Fires on every session tick that is a multiple of the interval.
    Every(u64),
    /// Fires once, on the given session tick.
    At(u64),
}

impl Schedule {
    fn is_due(self, tick: u64) -> bool {
        match self {
            Schedule::Every(interval) => tick % interval == 0,
            Schedule::At(at) => tick == at,
        }
    }
}

struct ScheduledJob {
    schedule: Schedule,
    job: Job,
}

/// Tick-counted scheduler: `every(n)` repeats, `delay(n)` fires once.
///
/// Schedules are read against each session's own tick counter, counted from
/// session start, so a single scheduler shared by many sessions keeps them
/// apart. Jobs run in id order within a tick.
#[derive(Default)]
pub struct MiniScheduler {
    jobs: BTreeMap<String, ScheduledJob>,
}

impl MiniScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` on every `ticks`-th tick of a session. Replaces any job with
    /// the same id.
    pub fn every(&mut self, ticks: u64, job_id: impl Into<String>, job: Job) {
        self.jobs.insert(job_id.into(), ScheduledJob { schedule: Schedule::Every(ticks.max(1)), job });
    }

    /// Run `job` once per session, on its `ticks`-th tick.
    pub fn delay(&mut self, ticks: u64, job_id: impl Into<String>, job: Job) {
        self.jobs.insert(job_id.into(), ScheduledJob { schedule: Schedule::At(ticks.max(1)), job });
    }

    pub fn cancel(&mut self, job_id: &str) -> bool {
        self.jobs.remove(job_id).is_some()
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.jobs.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl TickObserver for MiniScheduler {
    fn on_tick(&mut self, session: &Session) -> Vec<String> {
        let tick = session.ticks();
        self.jobs
            .values_mut()
            .filter(|scheduled| scheduled.schedule.is_due(tick))
            .filter_map(|scheduled| (scheduled.job)(session))
            .collect()
    }
}

impl std::fmt::Debug for MiniScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniScheduler")
            .field("jobs", &self.jobs.keys().collect::<Vec<_>>())
            .finish()
    }
}
