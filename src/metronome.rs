// Metronome - the control surface over scheduler, dispatcher and tap estimator
//
// One owned instance per output; clock, sink and driver are injected so the
// same code runs against a sound card, an offline renderer or a test clock.

use crate::audio::clock::ClockSource;
use crate::config::{EngineSettings, StartConfig};
use crate::dispatch::{Channel, ChannelDispatcher, ChannelGains, GainReader, SoundBank};
use crate::error::MetronomeResult;
use crate::scheduler::{LookAheadScheduler, PlaybackSink, SchedulerStats, TickDriver};
use crate::sequencer::{Tempo, Transport};
use crate::tap::TapTempo;

pub struct Metronome<C, P, D> {
    scheduler: LookAheadScheduler<C, P, D>,
    dispatcher: ChannelDispatcher,
    tap: TapTempo,
    /// Parameters used by the next `start`, kept in sync with live updates
    config: StartConfig,
}

impl<C, P, D> Metronome<C, P, D>
where
    C: ClockSource,
    P: PlaybackSink,
    D: TickDriver,
{
    /// Build a stopped metronome from validated settings
    pub fn new(
        clock: C,
        sink: P,
        driver: D,
        sounds: SoundBank,
        settings: &EngineSettings,
    ) -> MetronomeResult<Self> {
        Self::with_gains(clock, sink, driver, sounds, ChannelGains::default(), settings)
    }

    /// Build a stopped metronome driving `gains`
    ///
    /// The output that plays the sink's clicks should hold `gains.reader()`,
    /// taken before this call; the initial volumes are published through it.
    pub fn with_gains(
        clock: C,
        sink: P,
        driver: D,
        sounds: SoundBank,
        gains: ChannelGains,
        settings: &EngineSettings,
    ) -> MetronomeResult<Self> {
        settings.validate()?;

        let volumes = settings.volumes;
        let dispatcher = ChannelDispatcher::with_gains(sounds, gains)
            .with_ramp_seconds(settings.scheduling.gain_ramp_seconds)
            .with_initial_level(Channel::Accent, volumes.accent)
            .with_initial_level(Channel::Normal, volumes.normal)
            .with_initial_level(Channel::Subdivision, volumes.subdivision);

        Ok(Self {
            scheduler: LookAheadScheduler::new(clock, sink, driver, settings.scheduling),
            dispatcher,
            tap: TapTempo::new(settings.tap),
            config: settings.start,
        })
    }

    /// Start with `config`; no-op when already running
    pub fn start(&mut self, config: StartConfig) -> MetronomeResult<()> {
        if self.scheduler.is_running() {
            return Ok(());
        }
        self.scheduler.start(&config, &self.dispatcher)?;
        self.config = config;
        Ok(())
    }

    /// Start with the current parameters
    pub fn resume(&mut self) -> MetronomeResult<()> {
        self.start(self.config)
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Ramp a channel to `level` (0..=100) starting now
    pub fn set_volume(&mut self, channel: Channel, level: f32) {
        let now = self.scheduler.clock().now();
        self.dispatcher.set_gain(channel, level, now);
        log::debug!("{} volume -> {:.0}", channel, level);
    }

    /// Takes effect on the next advance step
    pub fn update_bpm(&mut self, bpm: f64) -> MetronomeResult<()> {
        let tempo = Tempo::new(bpm)?;
        self.scheduler.transport_mut().set_tempo(tempo);
        self.config.bpm = bpm;
        Ok(())
    }

    pub fn update_subdivision(&mut self, subdivision: u32) -> MetronomeResult<()> {
        self.scheduler.transport_mut().set_subdivision(subdivision)?;
        self.config.subdivision = subdivision;
        Ok(())
    }

    pub fn update_beats_per_measure(&mut self, beats_per_measure: u32) -> MetronomeResult<()> {
        self.scheduler
            .transport_mut()
            .set_beats_per_measure(beats_per_measure)?;
        self.config.beats_per_measure = beats_per_measure;
        Ok(())
    }

    pub fn set_accent_enabled(&mut self, enabled: bool) {
        self.scheduler.transport_mut().set_accent_enabled(enabled);
        self.config.accent_enabled = enabled;
    }

    /// Register the beat notification sink, replacing any previous one
    pub fn on_beat(&mut self, callback: impl FnMut(u32, f64) + Send + 'static) {
        self.scheduler.set_on_beat(Box::new(callback));
    }

    /// Feed a tap; returns the estimate without applying it
    pub fn tap(&mut self, timestamp_ms: f64) -> Option<u32> {
        self.tap.tap(timestamp_ms)
    }

    /// Run one scheduling pass now
    pub fn tick(&mut self) -> usize {
        self.scheduler.tick(&self.dispatcher)
    }

    /// Block on the tick driver, then run a pass
    pub fn wait_and_tick(&mut self) -> bool {
        self.scheduler.wait_and_tick(&self.dispatcher)
    }

    pub fn config(&self) -> &StartConfig {
        &self.config
    }

    pub fn transport(&self) -> &Transport {
        self.scheduler.transport()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn dispatcher(&self) -> &ChannelDispatcher {
        &self.dispatcher
    }

    /// Channel gains as the output should apply them
    pub fn gain_reader(&self) -> GainReader {
        self.dispatcher.gain_reader()
    }

    pub fn sounds_mut(&mut self) -> &mut SoundBank {
        self.dispatcher.sounds_mut()
    }

    pub fn clock(&self) -> &C {
        self.scheduler.clock()
    }

    pub fn sink(&self) -> &P {
        self.scheduler.sink()
    }

    pub fn sink_mut(&mut self) -> &mut P {
        self.scheduler.sink_mut()
    }

    pub fn into_parts(self) -> (C, P, D) {
        self.scheduler.into_parts()
    }
}
