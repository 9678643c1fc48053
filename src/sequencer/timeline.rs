// Timeline - Musical time representation
// Tempo, meter and the (beat, subdivision) position inside a measure

use crate::error::{MetronomeError, MetronomeResult};
use std::fmt;

/// Tempo in BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub const MIN_BPM: f64 = 30.0;
    pub const MAX_BPM: f64 = 300.0;

    /// Creates a new tempo
    /// BPM must lie in `MIN_BPM..=MAX_BPM`
    pub fn new(bpm: f64) -> MetronomeResult<Self> {
        if !(Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm) {
            return Err(MetronomeError::InvalidConfig(format!(
                "BPM must be between {} and {}, got {}",
                Self::MIN_BPM,
                Self::MAX_BPM,
                bpm
            )));
        }
        Ok(Self { bpm })
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one subdivision of a beat in seconds
    pub fn subdivision_duration_seconds(&self, subdivision: u32) -> f64 {
        self.beat_duration_seconds() / subdivision as f64
    }

    /// Duration of one measure in seconds
    pub fn measure_duration_seconds(&self, meter: &Meter) -> f64 {
        self.beat_duration_seconds() * meter.beats_per_measure() as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl TryFrom<f64> for Tempo {
    type Error = MetronomeError;

    fn try_from(bpm: f64) -> Result<Self, Self::Error> {
        Self::new(bpm)
    }
}

impl From<Tempo> for f64 {
    fn from(tempo: Tempo) -> Self {
        tempo.bpm
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Meter: beats per measure and subdivisions per beat
/// Example: 3/4 with eighth notes = Meter { beats_per_measure: 3, subdivision: 2 }
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meter {
    beats_per_measure: u32,
    subdivision: u32,
}

impl Meter {
    /// Densest grid accepted: 16 clicks per beat at the fastest tempo is
    /// still only 80 events per second
    pub const MAX_SUBDIVISION: u32 = 16;

    pub fn new(beats_per_measure: u32, subdivision: u32) -> MetronomeResult<Self> {
        Self::check_beats_per_measure(beats_per_measure)?;
        Self::check_subdivision(subdivision)?;
        Ok(Self {
            beats_per_measure,
            subdivision,
        })
    }

    /// Common 4/4, one click per beat
    pub fn four_four() -> Self {
        Self {
            beats_per_measure: 4,
            subdivision: 1,
        }
    }

    pub fn beats_per_measure(&self) -> u32 {
        self.beats_per_measure
    }

    pub fn subdivision(&self) -> u32 {
        self.subdivision
    }

    pub fn set_beats_per_measure(&mut self, beats_per_measure: u32) -> MetronomeResult<()> {
        Self::check_beats_per_measure(beats_per_measure)?;
        self.beats_per_measure = beats_per_measure;
        Ok(())
    }

    pub fn set_subdivision(&mut self, subdivision: u32) -> MetronomeResult<()> {
        Self::check_subdivision(subdivision)?;
        self.subdivision = subdivision;
        Ok(())
    }

    /// Number of scheduled events in one full measure
    pub fn events_per_measure(&self) -> u32 {
        self.beats_per_measure * self.subdivision
    }

    fn check_beats_per_measure(value: u32) -> MetronomeResult<()> {
        if value < 1 {
            return Err(MetronomeError::InvalidConfig(
                "beats per measure must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn check_subdivision(value: u32) -> MetronomeResult<()> {
        if !(1..=Self::MAX_SUBDIVISION).contains(&value) {
            return Err(MetronomeError::InvalidConfig(format!(
                "subdivision must be between 1 and {}, got {}",
                Self::MAX_SUBDIVISION,
                value
            )));
        }
        Ok(())
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/4 x{}", self.beats_per_measure, self.subdivision)
    }
}

/// Position inside a measure (both 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub beat: u32,
    pub subdivision: u32,
}

impl Position {
    pub fn new(beat: u32, subdivision: u32) -> Self {
        Self { beat, subdivision }
    }

    /// Beat 1, subdivision 1
    pub fn downbeat() -> Self {
        Self::new(1, 1)
    }

    /// True on the first subdivision of a beat (the audible main pulse)
    pub fn is_primary(&self) -> bool {
        self.subdivision == 1
    }

    pub fn is_within(&self, meter: &Meter) -> bool {
        (1..=meter.beats_per_measure()).contains(&self.beat)
            && (1..=meter.subdivision()).contains(&self.subdivision)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::downbeat()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.beat, self.subdivision)
    }
}
