// Offline rendering - run the metronome against a simulated clock and write WAV
//
// The scheduler is driven exactly as in real time (same look-ahead, same
// poll period) but ticks advance a `ManualClock` instead of sleeping, so a
// render takes as long as the mixing does. Mixing trails the clock the way a
// sound card does.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use hound::{WavSpec, WavWriter};

use crate::audio::clock::{ClockSource, ManualClock};
use crate::audio::dsp_utils::finish_sample;
use crate::audio::format_conversion::f32_to_i16;
use crate::audio::voices::{DEFAULT_VOICE_COUNT, SampleRateCheck, VoicePool};
use crate::config::{EngineSettings, StartConfig};
use crate::dispatch::{ChannelGains, GainReader, SoundBank};
use crate::error::{MetronomeError, MetronomeResult};
use crate::metronome::Metronome;
use crate::scheduler::{PlaybackCommand, PlaybackSink, SchedulerStats, SimulatedDriver};

/// Output file settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSettings {
    pub sample_rate: u32,
    /// 1 = mono, 2 = stereo (the click is duplicated on every channel)
    pub channels: u16,
    pub master_volume: f32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            master_volume: 1.0,
        }
    }
}

/// Progress callback for WAV writing (0.0 to 1.0)
pub type ProgressCallback = Box<dyn FnMut(f32) + Send>;

/// Playback sink that mixes clicks into memory as the clock advances
///
/// Scheduled clicks wait in the voice pool like they do on a sound card, and
/// channel gains are read while mixing, so `mix_until` must follow the clock
/// for volume changes to land where they would in real time.
#[derive(Debug)]
pub struct OfflineRenderer {
    settings: ExportSettings,
    voices: VoicePool,
    rate_check: SampleRateCheck,
    mix: Vec<f32>,
    clicks: usize,
}

impl OfflineRenderer {
    pub fn new(settings: ExportSettings, gains: GainReader) -> Self {
        Self {
            settings,
            voices: VoicePool::new(DEFAULT_VOICE_COUNT, gains, settings.sample_rate),
            rate_check: SampleRateCheck::new(settings.sample_rate),
            mix: Vec::new(),
            clicks: 0,
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Clicks received so far
    pub fn clicks(&self) -> usize {
        self.clicks
    }

    /// Sounds whose sample rate differs from the render rate
    pub fn rate_mismatches(&self) -> u64 {
        self.rate_check.mismatches()
    }

    /// Mono samples mixed so far
    pub fn mix(&self) -> &[f32] {
        &self.mix
    }

    /// Mix every sample before clock time `time`
    pub fn mix_until(&mut self, time: f64) {
        let end = (time.max(0.0) * self.settings.sample_rate as f64) as usize;
        self.mix.reserve(end.saturating_sub(self.mix.len()));
        while self.mix.len() < end {
            let sample_index = self.mix.len() as u64;
            let mixed = self.voices.mix_sample(sample_index);
            self.mix.push(finish_sample(mixed, self.settings.master_volume));
        }
    }

    /// Mix up to `duration_seconds` and write a 16-bit PCM WAV file
    /// Returns the number of frames written
    pub fn write_wav(
        &mut self,
        path: &Path,
        duration_seconds: f64,
        mut progress_callback: Option<ProgressCallback>,
    ) -> MetronomeResult<u64> {
        if !(duration_seconds.is_finite() && duration_seconds > 0.0) {
            return Err(MetronomeError::InvalidConfig(
                "render duration must be positive".to_string(),
            ));
        }
        if self.settings.channels == 0 {
            return Err(MetronomeError::InvalidConfig(
                "render needs at least one channel".to_string(),
            ));
        }

        let spec = WavSpec {
            channels: self.settings.channels,
            sample_rate: self.settings.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer: WavWriter<BufWriter<File>> = WavWriter::create(path, spec)?;

        self.mix_until(duration_seconds);
        let total_frames = (duration_seconds * self.settings.sample_rate as f64) as usize;
        let frames = &self.mix[..total_frames.min(self.mix.len())];

        let progress_interval = self.settings.sample_rate.max(1) as usize;
        for (frame, &sample) in frames.iter().enumerate() {
            let pcm = f32_to_i16(sample);
            for _ in 0..self.settings.channels {
                writer.write_sample(pcm)?;
            }
            if frame % progress_interval == 0
                && let Some(callback) = progress_callback.as_mut()
            {
                callback(frame as f32 / frames.len() as f32);
            }
        }
        writer.finalize()?;

        if let Some(callback) = progress_callback.as_mut() {
            callback(1.0);
        }

        log::info!(
            "Rendered {} clicks, {:.2}s at {} Hz to {}",
            self.clicks,
            duration_seconds,
            self.settings.sample_rate,
            path.display()
        );
        Ok(frames.len() as u64)
    }
}

impl PlaybackSink for OfflineRenderer {
    fn schedule(&mut self, command: PlaybackCommand) {
        self.rate_check.check(&command);
        self.voices.trigger_command(command);
        self.clicks += 1;
    }
}

/// Outcome of `render_metronome`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    pub frames: u64,
    pub clicks: usize,
    pub stats: SchedulerStats,
}

/// Run a metronome for `duration_seconds` of simulated time and write the result
pub fn render_metronome(
    settings: &EngineSettings,
    config: StartConfig,
    sounds: SoundBank,
    export: ExportSettings,
    duration_seconds: f64,
    path: &Path,
) -> MetronomeResult<RenderSummary> {
    let clock = ManualClock::new(0.0);
    let gains = ChannelGains::default();
    let renderer = OfflineRenderer::new(export, gains.reader());
    let mut metronome = Metronome::with_gains(
        clock.clone(),
        renderer,
        SimulatedDriver::new(clock.clone()),
        sounds,
        gains,
        settings,
    )?;

    metronome.start(config)?;
    while clock.now() < duration_seconds && metronome.wait_and_tick() {
        metronome.sink_mut().mix_until(clock.now());
    }
    metronome.stop();

    let stats = metronome.stats();
    let (_, mut renderer, _) = metronome.into_parts();
    let frames = renderer.write_wav(path, duration_seconds, None)?;

    Ok(RenderSummary {
        frames,
        clicks: renderer.clicks(),
        stats,
    })
}
