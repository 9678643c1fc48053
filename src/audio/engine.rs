// Output engine - cpal stream that plays scheduled clicks
//
// # Format Support
//
// The device's preferred sample format is used as-is: F32, I16 or U16.
// Mixing happens in f32; conversion happens when writing each frame
// (`FromSample<f32>`), without allocation.
//
// # Timing
//
// The callback owns the sample counter behind `AudioClock`. A command whose
// target time maps to sample N starts exactly at N; the scheduler runs far
// enough ahead that N is still in the future when the command arrives.
//
// # Stream Limitations
//
// On macOS (CoreAudio) the Stream is neither Send nor Sync, so the engine
// must stay on the thread that created it.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer};

use crate::audio::clock::AudioClock;
use crate::audio::dsp_utils::finish_sample;
use crate::audio::format_conversion::{write_mono_to_interleaved_frame, write_silence};
use crate::audio::parameters::AtomicF64;
use crate::audio::status::{AtomicDeviceStatus, DeviceStatus};
use crate::audio::voices::{SampleRateCheck, VoicePool};
use crate::dispatch::GainReader;
use crate::error::{MetronomeError, MetronomeResult};
use crate::messaging::channels::{PlaybackConsumer, PlaybackProducer};
use crate::scheduler::{PlaybackCommand, PlaybackSink};

pub struct OutputEngine {
    _device: Device,
    _stream: Stream,
    clock: AudioClock,
    channels: usize,
    /// Master gain applied after the channel gains (0.0..=1.0)
    master_volume: AtomicF64,
    status: AtomicDeviceStatus,
}

impl OutputEngine {
    /// Open the default output device and start streaming
    ///
    /// `gains` is the reader of the metronome's channel gains; the callback
    /// applies them to every voice while it plays.
    pub fn start(
        playback_rx: PlaybackConsumer,
        voice_count: usize,
        gains: GainReader,
    ) -> MetronomeResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| MetronomeError::Device("No audio device found".to_string()))?;

        log::info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported_config = device
            .default_output_config()
            .map_err(|e| MetronomeError::Device(format!("Configuration error: {}", e)))?;

        let sample_format = supported_config.sample_format();
        log::debug!("Audio config: {:?}", supported_config);

        let sample_rate = supported_config.sample_rate().0;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        let clock = AudioClock::new(sample_rate);
        let master_volume = AtomicF64::new(1.0);
        let status = AtomicDeviceStatus::new(DeviceStatus::Connecting);
        let voices = VoicePool::new(voice_count, gains, sample_rate);

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config,
                channels,
                playback_rx,
                voices,
                clock.clone(),
                master_volume.clone(),
                status.clone(),
            ),
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config,
                channels,
                playback_rx,
                voices,
                clock.clone(),
                master_volume.clone(),
                status.clone(),
            ),
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config,
                channels,
                playback_rx,
                voices,
                clock.clone(),
                master_volume.clone(),
                status.clone(),
            ),
            _ => {
                return Err(MetronomeError::Device(format!(
                    "Unsupported sample format: {:?}. Supported formats: F32, I16, U16",
                    sample_format
                )));
            }
        }?;

        stream
            .play()
            .map_err(|e| MetronomeError::Device(format!("Error starting stream: {}", e)))?;
        status.set(DeviceStatus::Connected);

        log::info!("Audio engine started: {} Hz, {} channels", sample_rate, channels);

        Ok(Self {
            _device: device,
            _stream: stream,
            clock,
            channels,
            master_volume,
            status,
        })
    }

    /// Clock driven by this stream's callback
    pub fn clock(&self) -> AudioClock {
        self.clock.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Output level after the channel gains (0.0..=1.0)
    pub fn set_master_volume(&self, gain: f32) {
        self.master_volume.set(gain.clamp(0.0, 1.0) as f64);
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume.get() as f32
    }

    pub fn status(&self) -> DeviceStatus {
        self.status.get()
    }

    /// Fails once the stream reported an error; nothing drains the playback
    /// ring after that
    pub fn ensure_healthy(&self) -> MetronomeResult<()> {
        self.status.ensure_healthy()
    }

    #[allow(clippy::too_many_arguments)]
    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        mut playback_rx: PlaybackConsumer,
        mut voices: VoicePool,
        clock: AudioClock,
        master_volume: AtomicF64,
        status: AtomicDeviceStatus,
    ) -> MetronomeResult<Stream>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // ========== REAL-TIME ZONE ==========
                    // No allocations, no I/O, no locks
                    if channels == 0 {
                        write_silence(data);
                        return;
                    }

                    while let Some(command) = playback_rx.try_pop() {
                        voices.trigger_command(command);
                    }

                    let first_sample = clock.current_sample();
                    let master = master_volume.get() as f32;
                    let mut frames = 0;
                    for frame in data.chunks_mut(channels) {
                        let mixed = voices.mix_sample(first_sample + frames as u64);
                        write_mono_to_interleaved_frame(finish_sample(mixed, master), frame);
                        frames += 1;
                    }

                    clock.advance(frames);
                    // ========== REAL-TIME ZONE END ==========
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                    status.set(DeviceStatus::Error);
                },
                None,
            )
            .map_err(|e| MetronomeError::Device(format!("Error in stream creation: {}", e)))?;

        Ok(stream)
    }
}

/// Scheduler-side end of the playback ring
pub struct OutputSink {
    tx: PlaybackProducer,
    rate_check: SampleRateCheck,
    dropped: u64,
}

impl OutputSink {
    /// `sample_rate` is the output stream's rate
    pub fn new(tx: PlaybackProducer, sample_rate: u32) -> Self {
        Self {
            tx,
            rate_check: SampleRateCheck::new(sample_rate),
            dropped: 0,
        }
    }

    /// Commands lost because the ring was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Sounds whose sample rate differs from the stream's
    pub fn rate_mismatches(&self) -> u64 {
        self.rate_check.mismatches()
    }
}

impl PlaybackSink for OutputSink {
    fn schedule(&mut self, command: PlaybackCommand) {
        self.rate_check.check(&command);
        let target_time = command.target_time;
        if self.tx.try_push(command).is_err() {
            self.dropped += 1;
            log::warn!(
                "Playback ring full, dropping click at {:.4}s ({} dropped)",
                target_time,
                self.dropped
            );
        }
    }
}
