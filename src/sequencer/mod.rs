// Sequencer module
// Musical time representation, beat counters and run state

pub mod state;
pub mod timeline;
pub mod transport;

pub use state::Sequencer;
pub use timeline::{Meter, Position, Tempo};
pub use transport::Transport;
