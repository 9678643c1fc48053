// Audio module - clocks, voice mixing, cpal output and offline rendering

pub mod clock;
pub mod dsp_utils;
pub mod engine;
pub mod export;
pub mod format_conversion;
pub mod parameters;
pub mod status;
pub mod voices;

pub use clock::{AudioClock, ClockSource, ManualClock};
pub use engine::{OutputEngine, OutputSink};
pub use export::{ExportSettings, OfflineRenderer, RenderSummary, render_metronome};
pub use status::{AtomicDeviceStatus, DeviceStatus};
pub use voices::VoicePool;
