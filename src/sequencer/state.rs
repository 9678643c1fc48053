// Sequencer state machine - beat/subdivision counters
// Deterministic advancement of the position inside a measure

use super::timeline::{Meter, Position, Tempo};

/// Beat sequencer
///
/// Holds only the current position; tempo and meter are passed on every
/// `advance` so that changes apply to the next step and never to events that
/// were already scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sequencer {
    position: Position,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to beat 1, subdivision 1 (run start)
    pub fn reset(&mut self) {
        self.position = Position::downbeat();
    }

    /// Position of the next event to schedule
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn current_beat(&self) -> u32 {
        self.position.beat
    }

    pub fn current_subdivision(&self) -> u32 {
        self.position.subdivision
    }

    /// Step to the next subdivision
    ///
    /// Returns the spacing in seconds between the event at the old position
    /// and the one at the new position.
    pub fn advance(&mut self, tempo: &Tempo, meter: &Meter) -> f64 {
        let seconds_per_subdivision = tempo.subdivision_duration_seconds(meter.subdivision());

        self.position.subdivision += 1;
        if self.position.subdivision > meter.subdivision() {
            self.position.subdivision = 1;
            self.position.beat += 1;
            if self.position.beat > meter.beats_per_measure() {
                self.position.beat = 1;
            }
        }

        seconds_per_subdivision
    }

    /// Pull a pending position back into range after the meter shrank
    ///
    /// A subdivision past the new count rolls over to the next beat, a beat
    /// past the new count rolls over to 1.
    pub fn normalize(&mut self, meter: &Meter) {
        if self.position.subdivision > meter.subdivision() {
            self.position.subdivision = 1;
            self.position.beat += 1;
        }
        if self.position.beat > meter.beats_per_measure() {
            self.position.beat = 1;
        }
    }
}
