// Playback sink - where scheduled clicks go

use crate::dispatch::{Channel, SoundClass, SoundHandle};

/// Play `sound` on `channel` starting exactly at `target_time` (clock domain)
///
/// The channel's gain is applied by the output while the sound plays, so a
/// volume change made after dispatch still reaches the note.
#[derive(Debug, Clone)]
pub struct PlaybackCommand {
    pub sound: SoundHandle,
    pub class: SoundClass,
    pub channel: Channel,
    pub target_time: f64,
}

/// Output that honors sample-accurate start times
pub trait PlaybackSink {
    fn schedule(&mut self, command: PlaybackCommand);
}

impl PlaybackSink for Vec<PlaybackCommand> {
    fn schedule(&mut self, command: PlaybackCommand) {
        self.push(command);
    }
}

impl<P: PlaybackSink + ?Sized> PlaybackSink for Box<P> {
    fn schedule(&mut self, command: PlaybackCommand) {
        (**self).schedule(command);
    }
}

/// Beat notification callback: (beat number, target time)
///
/// `target_time` is when the beat will sound, not when it was scheduled; the
/// receiver delays its own rendering by `target_time - now`.
pub type BeatCallback = Box<dyn FnMut(u32, f64) + Send>;
