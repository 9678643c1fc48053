// clicktrack - look-ahead metronome scheduling core
// Library exports for the host binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod messaging;
pub mod metronome;
pub mod scheduler;
pub mod sequencer;
pub mod tap;

// Re-export commonly used types for convenience
pub use audio::clock::{AudioClock, ClockSource, ManualClock};
pub use config::{EngineSettings, SchedulingSettings, StartConfig, TapSettings, VolumeSettings};
pub use dispatch::{
    Channel, ChannelDispatcher, ChannelGains, GainReader, SoundBank, SoundClass, SoundHandle,
};
pub use error::{MetronomeError, MetronomeResult};
pub use metronome::Metronome;
pub use scheduler::{
    IntervalDriver, LookAheadScheduler, PlaybackCommand, PlaybackSink, SchedulerStats,
    SimulatedDriver, TickDriver,
};
pub use sequencer::{Meter, Position, Sequencer, Tempo, Transport};
pub use tap::TapTempo;
