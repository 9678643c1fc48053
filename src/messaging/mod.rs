// Messaging module
// Host commands and the ring buffers that carry them

pub mod channels;
pub mod command;

pub use channels::{
    CommandConsumer, CommandProducer, PlaybackConsumer, PlaybackProducer, create_command_channel,
    create_playback_channel, push_until_accepted,
};
pub use command::{Command, CommandParseError, TimedCommand};
