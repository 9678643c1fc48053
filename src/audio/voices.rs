// Voice pool - sample-accurate click playback
//
// Pre-allocated at construction: triggering and mixing never allocate, so the
// pool can live inside the audio callback. Channel gains are read per sample
// from the shared ramps, not frozen when a click is queued.

use crate::dispatch::{Channel, GainReader, SoundHandle};
use crate::scheduler::PlaybackCommand;

/// Simultaneous clicks per output (dense subdivisions overlap at most a few)
pub const DEFAULT_VOICE_COUNT: usize = 16;

#[derive(Debug, Clone)]
struct Voice {
    sound: Option<SoundHandle>,
    channel: Channel,
    /// Absolute sample index of the first sample
    start_sample: u64,
    /// Next sample of `sound` to play
    position: usize,
}

impl Voice {
    fn idle() -> Self {
        Self {
            sound: None,
            channel: Channel::Normal,
            start_sample: 0,
            position: 0,
        }
    }

    fn is_active(&self) -> bool {
        self.sound.is_some()
    }

    fn remaining(&self) -> usize {
        self.sound
            .as_ref()
            .map_or(0, |sound| sound.len().saturating_sub(self.position))
    }
}

#[derive(Debug, Clone)]
pub struct VoicePool {
    voices: Vec<Voice>,
    gains: GainReader,
    sample_rate: f64,
    stolen: u64,
}

impl VoicePool {
    pub fn new(voice_count: usize, gains: GainReader, sample_rate: u32) -> Self {
        Self {
            voices: vec![Voice::idle(); voice_count.max(1)],
            gains,
            sample_rate: sample_rate.max(1) as f64,
            stolen: 0,
        }
    }

    /// Queue a click on `channel` to start at `start_sample`
    ///
    /// When every voice is busy the one closest to finishing is replaced.
    pub fn trigger(&mut self, sound: SoundHandle, start_sample: u64, channel: Channel) {
        if sound.is_empty() {
            return;
        }

        let index = match self.voices.iter().position(|voice| !voice.is_active()) {
            Some(free) => free,
            None => {
                self.stolen += 1;
                self.voices
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, voice)| voice.remaining())
                    .map_or(0, |(index, _)| index)
            }
        };

        self.voices[index] = Voice {
            sound: Some(sound),
            channel,
            start_sample,
            position: 0,
        };
    }

    /// Queue a scheduled command at the sample its target time maps to
    pub fn trigger_command(&mut self, command: PlaybackCommand) {
        let start_sample = (command.target_time * self.sample_rate).round().max(0.0) as u64;
        self.trigger(command.sound, start_sample, command.channel);
    }

    /// Mixed value of all voices at absolute sample index `sample_index`
    ///
    /// Must be called with consecutive indices. A voice whose start lies in the
    /// past begins at the current sample.
    pub fn mix_sample(&mut self, sample_index: u64) -> f32 {
        let time = sample_index as f64 / self.sample_rate;
        let gains = Channel::ALL.map(|channel| self.gains.gain_at(channel, time));

        let mut mixed = 0.0;
        for voice in self.voices.iter_mut() {
            let Some(sound) = voice.sound.as_ref() else {
                continue;
            };
            if sample_index < voice.start_sample {
                continue;
            }

            let samples = sound.samples();
            mixed += samples[voice.position] * gains[voice.channel.index()];
            voice.position += 1;
            if voice.position >= samples.len() {
                voice.sound = None;
            }
        }
        mixed
    }

    /// Mix `out.len()` samples starting at `first_sample`
    pub fn render(&mut self, first_sample: u64, out: &mut [f32]) {
        for (offset, sample) in out.iter_mut().enumerate() {
            *sample = self.mix_sample(first_sample + offset as u64);
        }
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|voice| voice.is_active()).count()
    }

    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate as u32
    }

    /// Voices replaced while still sounding
    pub fn stolen_count(&self) -> u64 {
        self.stolen
    }
}

/// Flags sounds decoded at a rate other than the output's
///
/// Runs on the scheduling side of a sink; playback itself never resamples.
#[derive(Debug, Clone)]
pub struct SampleRateCheck {
    output_rate: u32,
    mismatches: u64,
}

impl SampleRateCheck {
    pub fn new(output_rate: u32) -> Self {
        Self {
            output_rate,
            mismatches: 0,
        }
    }

    /// Warns on the first mismatch, counts the rest
    pub fn check(&mut self, command: &PlaybackCommand) -> bool {
        let sound_rate = command.sound.sample_rate();
        if sound_rate == self.output_rate {
            return true;
        }
        if self.mismatches == 0 {
            log::warn!(
                "{} sound is {} Hz but the output runs at {} Hz; it will play at the wrong speed",
                command.class,
                sound_rate,
                self.output_rate
            );
        }
        self.mismatches += 1;
        false
    }

    pub fn mismatches(&self) -> u64 {
        self.mismatches
    }
}
