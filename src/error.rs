// Error types for the metronome core and its hosts

use crate::dispatch::SoundClass;

/// Errors raised by the metronome core, its settings loader and its outputs
#[derive(Debug, thiserror::Error)]
pub enum MetronomeError {
    /// A sound required to start (accent or normal) is not loaded
    #[error("Required sound unavailable: {0}")]
    ResourceUnavailable(SoundClass),

    /// Rejected configuration value; the previous value is kept
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] ron::error::SpannedError),

    #[error("Export error: {0}")]
    Export(#[from] hound::Error),
}

pub type MetronomeResult<T> = Result<T, MetronomeError>;
