// Engine settings - start configuration, scheduling timing, tap tempo, volumes
// Read from RON; every field has a default so partial files are fine

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatch::channel::level_to_gain;
use crate::error::{MetronomeError, MetronomeResult};
use crate::sequencer::{Meter, Tempo};

/// Values supplied when the metronome starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartConfig {
    pub bpm: f64,
    pub beats_per_measure: u32,
    pub subdivision: u32,
    pub accent_enabled: bool,
}

impl StartConfig {
    /// Checked tempo and meter
    pub fn validate(&self) -> MetronomeResult<(Tempo, Meter)> {
        let tempo = Tempo::new(self.bpm)?;
        let meter = Meter::new(self.beats_per_measure, self.subdivision)?;
        Ok((tempo, meter))
    }
}

impl Default for StartConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            beats_per_measure: 4,
            subdivision: 1,
            accent_enabled: true,
        }
    }
}

/// Look-ahead scheduling timing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingSettings {
    /// How far ahead of the clock every due note must already be dispatched
    pub look_ahead_seconds: f64,
    /// Interval between scheduling passes; must be shorter than the look-ahead
    pub poll_period_ms: u64,
    /// Offset of the first note from the start request
    pub start_delay_seconds: f64,
    /// Length of volume ramps
    pub gain_ramp_seconds: f64,
}

impl SchedulingSettings {
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }

    pub fn validate(&self) -> MetronomeResult<()> {
        if !(self.look_ahead_seconds.is_finite() && self.look_ahead_seconds > 0.0) {
            return Err(MetronomeError::InvalidConfig(
                "look-ahead window must be positive".to_string(),
            ));
        }
        if self.poll_period_ms == 0 {
            return Err(MetronomeError::InvalidConfig(
                "poll period must be positive".to_string(),
            ));
        }
        if self.poll_period().as_secs_f64() >= self.look_ahead_seconds {
            return Err(MetronomeError::InvalidConfig(format!(
                "poll period ({} ms) must be shorter than the look-ahead window ({} s)",
                self.poll_period_ms, self.look_ahead_seconds
            )));
        }
        if !(self.start_delay_seconds.is_finite() && self.start_delay_seconds > 0.0) {
            return Err(MetronomeError::InvalidConfig(
                "start delay must be positive".to_string(),
            ));
        }
        if !(self.gain_ramp_seconds.is_finite() && self.gain_ramp_seconds >= 0.0) {
            return Err(MetronomeError::InvalidConfig(
                "gain ramp must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            look_ahead_seconds: 0.1,
            poll_period_ms: 25,
            start_delay_seconds: 0.1,
            gain_ramp_seconds: 0.05,
        }
    }
}

/// Tap tempo estimator settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapSettings {
    /// Most recent taps kept for the estimate
    pub max_taps: usize,
    /// Gap after which a tap starts a new session
    pub timeout_ms: f64,
    pub min_bpm: u32,
    pub max_bpm: u32,
}

impl TapSettings {
    pub fn validate(&self) -> MetronomeResult<()> {
        if self.max_taps < 2 {
            return Err(MetronomeError::InvalidConfig(
                "tap tempo needs at least 2 taps".to_string(),
            ));
        }
        if !(self.timeout_ms.is_finite() && self.timeout_ms > 0.0) {
            return Err(MetronomeError::InvalidConfig(
                "tap timeout must be positive".to_string(),
            ));
        }
        let tempo_range = Tempo::MIN_BPM..=Tempo::MAX_BPM;
        if self.min_bpm > self.max_bpm
            || !tempo_range.contains(&(self.min_bpm as f64))
            || !tempo_range.contains(&(self.max_bpm as f64))
        {
            return Err(MetronomeError::InvalidConfig(format!(
                "invalid tap BPM range {}..={} (tempo range is {}..={})",
                self.min_bpm,
                self.max_bpm,
                Tempo::MIN_BPM,
                Tempo::MAX_BPM
            )));
        }
        Ok(())
    }
}

impl Default for TapSettings {
    fn default() -> Self {
        Self {
            max_taps: 5,
            timeout_ms: 2000.0,
            min_bpm: 30,
            max_bpm: 300,
        }
    }
}

/// Initial channel volumes (0..=100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeSettings {
    pub accent: f32,
    pub normal: f32,
    pub subdivision: f32,
    /// Output level after the channel gains, applied by the sound card or renderer
    pub master: f32,
}

impl VolumeSettings {
    /// Master level as a [0, 1] gain
    pub fn master_gain(&self) -> f32 {
        level_to_gain(self.master)
    }
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            accent: 100.0,
            normal: 100.0,
            subdivision: 100.0,
            master: 100.0,
        }
    }
}

/// Everything the metronome reads at construction
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub start: StartConfig,
    pub scheduling: SchedulingSettings,
    pub tap: TapSettings,
    pub volumes: VolumeSettings,
}

impl EngineSettings {
    /// Parse and validate RON text
    pub fn from_ron_str(text: &str) -> MetronomeResult<Self> {
        let settings: EngineSettings = ron::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate a RON settings file
    pub fn load(path: &Path) -> MetronomeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn validate(&self) -> MetronomeResult<()> {
        self.start.validate()?;
        self.scheduling.validate()?;
        self.tap.validate()?;
        Ok(())
    }
}
