// Tick drivers - the coarse periodic timer that wakes the scheduler
//
// A tick either runs a whole scheduling pass or does not happen at all:
// deadlines missed while the host was busy are collapsed into one tick, never
// replayed in a burst.

use std::thread;
use std::time::{Duration, Instant};

use crate::audio::clock::ManualClock;

/// Periodic tick source
pub trait TickDriver {
    /// Start ticking every `period`
    fn arm(&mut self, period: Duration);

    /// Stop ticking; a pending `wait` returns false from now on
    fn disarm(&mut self);

    fn is_armed(&self) -> bool;

    /// Block until the next tick is due
    /// Returns false (immediately) when disarmed
    fn wait(&mut self) -> bool;
}

/// Real-time driver sleeping on the calling thread
#[derive(Debug, Default)]
pub struct IntervalDriver {
    period: Option<Duration>,
    next_deadline: Option<Instant>,
    skipped_ticks: u64,
}

impl IntervalDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks dropped because the host fell behind
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }
}

impl TickDriver for IntervalDriver {
    fn arm(&mut self, period: Duration) {
        self.period = Some(period);
        self.next_deadline = Some(Instant::now() + period);
    }

    fn disarm(&mut self) {
        self.period = None;
        self.next_deadline = None;
    }

    fn is_armed(&self) -> bool {
        self.period.is_some()
    }

    fn wait(&mut self) -> bool {
        let (Some(period), Some(deadline)) = (self.period, self.next_deadline) else {
            return false;
        };

        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }

        let woke = Instant::now();
        let mut next = deadline + period;
        if next <= woke {
            let behind = woke.duration_since(next);
            let missed = (behind.as_nanos() / period.as_nanos().max(1)) as u64 + 1;
            self.skipped_ticks += missed;
            log::debug!("Tick driver fell behind, skipping {} tick(s)", missed);
            next = woke + period;
        }
        self.next_deadline = Some(next);
        true
    }
}

/// Jitter source for simulated ticks, in seconds (may be negative)
pub type JitterFn = Box<dyn FnMut() -> f64 + Send>;

/// Deterministic driver for tests and offline rendering
///
/// Each `wait` advances the shared `ManualClock` by one period plus whatever
/// the jitter source returns, instead of sleeping.
pub struct SimulatedDriver {
    clock: ManualClock,
    period: Option<f64>,
    jitter: Option<JitterFn>,
    ticks: u64,
}

impl SimulatedDriver {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            period: None,
            jitter: None,
            ticks: 0,
        }
    }

    /// Add `jitter()` seconds to every tick interval
    pub fn with_jitter(mut self, jitter: impl FnMut() -> f64 + Send + 'static) -> Self {
        self.jitter = Some(Box::new(jitter));
        self
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Ticks delivered so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl std::fmt::Debug for SimulatedDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedDriver")
            .field("period", &self.period)
            .field("jittered", &self.jitter.is_some())
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl TickDriver for SimulatedDriver {
    fn arm(&mut self, period: Duration) {
        self.period = Some(period.as_secs_f64());
    }

    fn disarm(&mut self) {
        self.period = None;
    }

    fn is_armed(&self) -> bool {
        self.period.is_some()
    }

    fn wait(&mut self) -> bool {
        let Some(period) = self.period else {
            return false;
        };
        let jitter = self.jitter.as_mut().map_or(0.0, |jitter| jitter());
        self.clock.advance((period + jitter).max(0.0));
        self.ticks += 1;
        true
    }
}
