// Dispatch module
// Sounds, gain channels and the position -> (sound, channel) mapping

pub mod channel;
pub mod dispatcher;
pub mod sound;

pub use channel::{Channel, ChannelGains, GainRamp, GainReader};
pub use dispatcher::{ChannelDispatcher, Resolution};
pub use sound::{SoundBank, SoundClass, SoundHandle};
