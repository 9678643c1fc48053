// Channel dispatcher - maps a sequencer position to a sound and a gain channel

use super::channel::{Channel, ChannelGains, GainRamp, GainReader, level_to_gain};
use super::sound::{SoundBank, SoundClass, SoundHandle};
use crate::sequencer::Position;

/// Result of resolving a position: which sound to play on which channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub class: SoundClass,
    pub channel: Channel,
}

/// Owns the sound bank and the three gain channels
#[derive(Debug)]
pub struct ChannelDispatcher {
    sounds: SoundBank,
    gains: ChannelGains,
    ramp_seconds: f64,
}

impl ChannelDispatcher {
    /// Default gain ramp length (50ms)
    pub const DEFAULT_RAMP_SECONDS: f64 = 0.05;

    pub fn new(sounds: SoundBank) -> Self {
        Self::with_gains(sounds, ChannelGains::default())
    }

    /// Use gains whose reader was already handed to an output
    pub fn with_gains(sounds: SoundBank, gains: ChannelGains) -> Self {
        Self {
            sounds,
            gains,
            ramp_seconds: Self::DEFAULT_RAMP_SECONDS,
        }
    }

    pub fn with_ramp_seconds(mut self, ramp_seconds: f64) -> Self {
        self.ramp_seconds = ramp_seconds.max(0.0);
        self
    }

    /// Start a channel at `level` (0..=100) with no ramp
    pub fn with_initial_level(mut self, channel: Channel, level: f32) -> Self {
        self.gains.hold(channel, level_to_gain(level));
        self
    }

    /// Sound class and channel for a position
    ///
    /// Primary beats use the accent sound on beat 1 (when enabled) and the
    /// normal sound otherwise. Off-beats use the subdivision sound, or the
    /// normal sound when none is loaded, always on the subdivision channel.
    pub fn resolve(&self, beat: u32, subdivision: u32, accent_enabled: bool) -> Resolution {
        if subdivision == 1 {
            if accent_enabled && beat == 1 {
                Resolution {
                    class: SoundClass::Accent,
                    channel: Channel::Accent,
                }
            } else {
                Resolution {
                    class: SoundClass::Normal,
                    channel: Channel::Normal,
                }
            }
        } else {
            let class = if self.sounds.has(SoundClass::Subdivision) {
                SoundClass::Subdivision
            } else {
                SoundClass::Normal
            };
            Resolution {
                class,
                channel: Channel::Subdivision,
            }
        }
    }

    pub fn resolve_position(&self, position: Position, accent_enabled: bool) -> Resolution {
        self.resolve(position.beat, position.subdivision, accent_enabled)
    }

    /// Handle behind a resolved sound class (None if it is not loaded)
    pub fn sound(&self, class: SoundClass) -> Option<&SoundHandle> {
        self.sounds.get(class)
    }

    pub fn sounds(&self) -> &SoundBank {
        &self.sounds
    }

    pub fn sounds_mut(&mut self) -> &mut SoundBank {
        &mut self.sounds
    }

    /// Set a channel volume (0..=100), ramped over the configured interval from `now`
    pub fn set_gain(&mut self, channel: Channel, level: f32, now: f64) {
        let target = level_to_gain(level);
        self.gains.ramp_to(channel, target, now, self.ramp_seconds);
    }

    /// Channel gain at clock time `time`
    pub fn gain_at(&self, channel: Channel, time: f64) -> f32 {
        self.gains.gain_at(channel, time)
    }

    pub fn ramp(&self, channel: Channel) -> &GainRamp {
        self.gains.ramp(channel)
    }

    /// Handle for the output side, which applies the gains while mixing
    pub fn gain_reader(&self) -> GainReader {
        self.gains.reader()
    }
}

impl Default for ChannelDispatcher {
    fn default() -> Self {
        Self::new(SoundBank::default())
    }
}
