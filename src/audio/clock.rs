// Clock sources - time in seconds in the audio domain
//
// The scheduler never reads wall-clock time: every target time it emits is
// expressed on the clock of the device that will play it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::parameters::AtomicF64;

/// Monotonic time source, in seconds
pub trait ClockSource {
    fn now(&self) -> f64;
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Playback clock driven by the audio callback
///
/// The callback advances the sample counter by the number of frames it
/// rendered; `now()` is the counter converted to seconds.
#[derive(Clone, Debug)]
pub struct AudioClock {
    /// Current sample position (incremented by audio callback)
    sample_position: Arc<AtomicU64>,
    sample_rate: f64,
}

impl AudioClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_position: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate as f64,
        }
    }

    /// Current sample position (called from the scheduler thread)
    pub fn current_sample(&self) -> u64 {
        self.sample_position.load(Ordering::Relaxed)
    }

    /// Advance sample position (called from audio callback)
    pub fn advance(&self, frames: usize) {
        self.sample_position
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate as u32
    }

    /// Clock time of a sample index
    pub fn samples_to_seconds(&self, samples: u64) -> f64 {
        samples as f64 / self.sample_rate
    }

    /// Sample index of a clock time (rounded to the nearest sample, never negative)
    pub fn seconds_to_samples(&self, seconds: f64) -> u64 {
        (seconds * self.sample_rate).round().max(0.0) as u64
    }
}

impl ClockSource for AudioClock {
    fn now(&self) -> f64 {
        self.samples_to_seconds(self.current_sample())
    }
}

/// Clock set by hand
///
/// Clones share the same time, so a simulated driver and the scheduler can
/// hold the same clock.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    time: AtomicF64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            time: AtomicF64::new(start),
        }
    }

    /// Jump to `time`; going backwards is ignored to keep the clock monotonic
    pub fn set(&self, time: f64) {
        if time > self.time.get() {
            self.time.set(time);
        }
    }

    pub fn advance(&self, seconds: f64) {
        if seconds > 0.0 {
            self.time.set(self.time.get() + seconds);
        }
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> f64 {
        self.time.get()
    }
}
