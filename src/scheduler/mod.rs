// Scheduler module
// Look-ahead scheduling between a coarse tick driver and a precise playback clock

pub mod driver;
pub mod look_ahead;
pub mod sink;

pub use driver::{IntervalDriver, JitterFn, SimulatedDriver, TickDriver};
pub use look_ahead::{LookAheadScheduler, SchedulerStats};
pub use sink::{BeatCallback, PlaybackCommand, PlaybackSink};
