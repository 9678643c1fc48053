// Transport - Run state of the metronome
// Tempo, meter, accent flag, sequencer position and next event time

use super::state::Sequencer;
use super::timeline::{Meter, Position, Tempo};
use crate::error::MetronomeResult;

/// Transport state (single mutable instance owned by the scheduler)
#[derive(Debug, Clone)]
pub struct Transport {
    running: bool,
    tempo: Tempo,
    meter: Meter,
    accent_enabled: bool,
    next_event_time: f64,
    sequencer: Sequencer,
}

impl Transport {
    pub fn new(tempo: Tempo, meter: Meter, accent_enabled: bool) -> Self {
        Self {
            running: false,
            tempo,
            meter,
            accent_enabled,
            next_event_time: 0.0,
            sequencer: Sequencer::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin a run whose first event lands at `first_event_time`
    pub fn begin(&mut self, first_event_time: f64) {
        self.sequencer.reset();
        self.next_event_time = first_event_time;
        self.running = true;
    }

    /// End the run (position and next event time are left as they were)
    pub fn halt(&mut self) {
        self.running = false;
    }

    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }

    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
    }

    pub fn meter(&self) -> &Meter {
        &self.meter
    }

    pub fn set_beats_per_measure(&mut self, beats_per_measure: u32) -> MetronomeResult<()> {
        self.meter.set_beats_per_measure(beats_per_measure)?;
        self.sequencer.normalize(&self.meter);
        Ok(())
    }

    pub fn set_subdivision(&mut self, subdivision: u32) -> MetronomeResult<()> {
        self.meter.set_subdivision(subdivision)?;
        self.sequencer.normalize(&self.meter);
        Ok(())
    }

    pub fn accent_enabled(&self) -> bool {
        self.accent_enabled
    }

    pub fn set_accent_enabled(&mut self, enabled: bool) {
        self.accent_enabled = enabled;
    }

    /// Absolute clock time of the next unscheduled event
    pub fn next_event_time(&self) -> f64 {
        self.next_event_time
    }

    /// Position of the next unscheduled event
    pub fn position(&self) -> Position {
        self.sequencer.position()
    }

    /// Move past the current event using the tempo and meter in force now
    /// Returns the new next event time
    pub fn advance(&mut self) -> f64 {
        let delta = self.sequencer.advance(&self.tempo, &self.meter);
        self.next_event_time += delta;
        self.next_event_time
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(Tempo::default(), Meter::default(), true)
    }
}
