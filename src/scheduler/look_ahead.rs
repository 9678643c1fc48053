// Look-ahead scheduler - bridges the coarse tick domain and the audio clock
//
// Ticks arrive every poll period with several milliseconds of jitter; the
// audio backend starts sounds at sample accuracy when given a future time.
// Every pass therefore dispatches all notes due before `now + look_ahead`,
// each with its exact target time.

use crate::audio::clock::ClockSource;
use crate::config::{SchedulingSettings, StartConfig};
use crate::dispatch::ChannelDispatcher;
use crate::error::{MetronomeError, MetronomeResult};
use crate::sequencer::Transport;

use super::driver::TickDriver;
use super::sink::{BeatCallback, PlaybackCommand, PlaybackSink};

/// Counters accumulated across scheduling passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub passes: u64,
    pub notes_scheduled: u64,
    pub beats_notified: u64,
    /// Notes whose sound was not loaded
    pub notes_skipped: u64,
    /// Notes whose target time had already passed when their pass ran
    pub notes_dropped_late: u64,
    /// Passes ended early because the next event time stopped increasing
    pub stalled_passes: u64,
}

pub struct LookAheadScheduler<C, P, D> {
    clock: C,
    sink: P,
    driver: D,
    transport: Transport,
    timing: SchedulingSettings,
    on_beat: Option<BeatCallback>,
    stats: SchedulerStats,
}

impl<C, P, D> LookAheadScheduler<C, P, D>
where
    C: ClockSource,
    P: PlaybackSink,
    D: TickDriver,
{
    pub fn new(clock: C, sink: P, driver: D, timing: SchedulingSettings) -> Self {
        Self {
            clock,
            sink,
            driver,
            transport: Transport::default(),
            timing,
            on_beat: None,
            stats: SchedulerStats::default(),
        }
    }

    /// Start a run
    ///
    /// No-op when already running. Fails without touching any state when the
    /// configuration is invalid or a required sound is missing.
    pub fn start(
        &mut self,
        config: &StartConfig,
        dispatcher: &ChannelDispatcher,
    ) -> MetronomeResult<()> {
        if self.transport.is_running() {
            return Ok(());
        }

        let (tempo, meter) = config.validate()?;
        if let Some(missing) = dispatcher.sounds().missing_required() {
            return Err(MetronomeError::ResourceUnavailable(missing));
        }

        self.transport = Transport::new(tempo, meter, config.accent_enabled);
        let first_event_time = self.clock.now() + self.timing.start_delay_seconds;
        self.transport.begin(first_event_time);
        self.driver.arm(self.timing.poll_period());

        log::debug!(
            "Scheduler started: {}, {}, first event at {:.4}s",
            tempo,
            meter,
            first_event_time
        );
        Ok(())
    }

    /// Stop scheduling; sounds already handed to the sink keep playing
    pub fn stop(&mut self) {
        if !self.transport.is_running() {
            return;
        }
        self.transport.halt();
        self.driver.disarm();
        log::debug!("Scheduler stopped at {:.4}s", self.clock.now());
    }

    pub fn is_running(&self) -> bool {
        self.transport.is_running()
    }

    /// Run one scheduling pass
    /// Returns the number of playback commands emitted
    pub fn tick(&mut self, dispatcher: &ChannelDispatcher) -> usize {
        if !self.transport.is_running() {
            return 0;
        }

        let now = self.clock.now();
        let horizon = now + self.timing.look_ahead_seconds;
        let mut emitted = 0;
        self.stats.passes += 1;

        while self.transport.next_event_time() < horizon {
            let target_time = self.transport.next_event_time();
            let position = self.transport.position();

            if target_time <= now {
                self.stats.notes_dropped_late += 1;
                log::warn!(
                    "Dropping late note {} at {:.4}s (clock already at {:.4}s)",
                    position,
                    target_time,
                    now
                );
                if !self.step_past(target_time) {
                    break;
                }
                continue;
            }

            let resolution =
                dispatcher.resolve_position(position, self.transport.accent_enabled());
            match dispatcher.sound(resolution.class) {
                Some(sound) => {
                    self.sink.schedule(PlaybackCommand {
                        sound: sound.clone(),
                        class: resolution.class,
                        channel: resolution.channel,
                        target_time,
                    });
                    self.stats.notes_scheduled += 1;
                    emitted += 1;
                }
                None => {
                    self.stats.notes_skipped += 1;
                    log::debug!("No {} sound loaded, skipping note {}", resolution.class, position);
                }
            }

            if position.is_primary() {
                if let Some(on_beat) = self.on_beat.as_mut() {
                    on_beat(position.beat, target_time);
                }
                self.stats.beats_notified += 1;
            }

            if !self.step_past(target_time) {
                break;
            }
        }

        emitted
    }

    /// Advance the transport past the event at `target_time`
    /// Returns false when the next event time did not move forward
    fn step_past(&mut self, target_time: f64) -> bool {
        let next_event_time = self.transport.advance();
        if next_event_time > target_time {
            return true;
        }
        self.stats.stalled_passes += 1;
        log::error!(
            "Next event time stuck at {:.6}s, ending scheduling pass",
            target_time
        );
        false
    }

    /// Wait for the driver's next tick, then run a pass
    /// Returns false when the driver is disarmed (nothing ran)
    pub fn wait_and_tick(&mut self, dispatcher: &ChannelDispatcher) -> bool {
        if !self.driver.wait() {
            return false;
        }
        self.tick(dispatcher);
        true
    }

    /// Replace the beat notification sink
    pub fn set_on_beat(&mut self, callback: BeatCallback) {
        self.on_beat = Some(callback);
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    pub fn timing(&self) -> &SchedulingSettings {
        &self.timing
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.sink
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Give back the injected collaborators
    pub fn into_parts(self) -> (C, P, D) {
        (self.clock, self.sink, self.driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::ManualClock;
    use crate::dispatch::{Channel, SoundBank, SoundClass, SoundHandle};
    use crate::scheduler::driver::SimulatedDriver;
    use crate::sequencer::{Meter, Tempo};
    use std::sync::{Arc, Mutex};

    type TestScheduler = LookAheadScheduler<ManualClock, Vec<PlaybackCommand>, SimulatedDriver>;

    fn scheduler(clock: &ManualClock) -> TestScheduler {
        LookAheadScheduler::new(
            clock.clone(),
            Vec::new(),
            SimulatedDriver::new(clock.clone()),
            SchedulingSettings::default(),
        )
    }

    fn dispatcher() -> ChannelDispatcher {
        ChannelDispatcher::new(SoundBank::synthesized(48000))
    }

    #[test]
    fn test_start_schedules_first_note_after_delay() {
        let clock = ManualClock::new(5.0);
        let mut scheduler = scheduler(&clock);
        let dispatcher = dispatcher();

        scheduler.start(&StartConfig::default(), &dispatcher).unwrap();
        assert!(scheduler.is_running());
        assert!(scheduler.driver().is_armed());
        assert!((scheduler.transport().next_event_time() - 5.1).abs() < 1e-12);

        // Window is [5.0, 5.1): the first note is exactly at the edge, not yet due
        assert_eq!(scheduler.tick(&dispatcher), 0);

        clock.advance(0.025);
        assert_eq!(scheduler.tick(&dispatcher), 1);
        let first = &scheduler.sink()[0];
        assert_eq!(first.class, SoundClass::Accent);
        assert_eq!(first.channel, Channel::Accent);
        assert!((first.target_time - 5.1).abs() < 1e-12);
    }

    #[test]
    fn test_start_fails_without_required_sounds() {
        let clock = ManualClock::new(0.0);
        let mut scheduler = scheduler(&clock);
        let click = SoundHandle::from_samples(vec![1.0], 48000);
        let dispatcher = ChannelDispatcher::new(SoundBank::new(Some(click), None, None));

        let config = StartConfig {
            bpm: 200.0,
            ..StartConfig::default()
        };
        let result = scheduler.start(&config, &dispatcher);
        assert!(matches!(
            result,
            Err(MetronomeError::ResourceUnavailable(SoundClass::Normal))
        ));

        // Nothing changed
        assert!(!scheduler.is_running());
        assert!(!scheduler.driver().is_armed());
        assert_eq!(scheduler.transport().tempo().bpm(), 120.0);
    }

    #[test]
    fn test_start_rejects_invalid_config() {
        let clock = ManualClock::new(0.0);
        let mut scheduler = scheduler(&clock);
        let config = StartConfig {
            subdivision: 0,
            ..StartConfig::default()
        };
        assert!(matches!(
            scheduler.start(&config, &dispatcher()),
            Err(MetronomeError::InvalidConfig(_))
        ));
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_tick_when_stopped_is_noop() {
        let clock = ManualClock::new(0.0);
        let mut scheduler = scheduler(&clock);
        assert_eq!(scheduler.tick(&dispatcher()), 0);
        assert_eq!(scheduler.stats().passes, 0);
        assert!(!scheduler.wait_and_tick(&dispatcher()));
    }

    #[test]
    fn test_beat_notifications_carry_target_time() {
        let clock = ManualClock::new(0.0);
        let mut scheduler = scheduler(&clock);
        let dispatcher = dispatcher();
        let beats = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&beats);
        scheduler.set_on_beat(Box::new(move |beat: u32, time: f64| {
            sink.lock().unwrap().push((beat, time));
        }));

        let config = StartConfig {
            bpm: 120.0,
            subdivision: 2,
            ..StartConfig::default()
        };
        scheduler.start(&config, &dispatcher).unwrap();
        while clock.now() < 1.0 {
            scheduler.wait_and_tick(&dispatcher);
        }

        let beats = beats.lock().unwrap();
        // Only primary beats are notified, each with its scheduled time
        let commands = scheduler.sink();
        let primaries: Vec<f64> = commands
            .iter()
            .filter(|command| command.channel != Channel::Subdivision)
            .map(|command| command.target_time)
            .collect();
        assert_eq!(beats.len(), primaries.len());
        for ((beat, time), expected) in beats.iter().zip(&primaries) {
            assert!(*beat >= 1 && *beat <= 4);
            assert_eq!(time, expected);
        }
        assert!(commands.len() > beats.len());
    }

    #[test]
    fn test_late_notes_are_dropped() {
        let clock = ManualClock::new(0.0);
        let mut scheduler = scheduler(&clock);
        let dispatcher = dispatcher();
        scheduler.start(&StartConfig::default(), &dispatcher).unwrap();

        // Host stalls for over a second: notes at 0.1, 0.6 and 1.1 are already past
        clock.set(1.2);
        let emitted = scheduler.tick(&dispatcher);
        assert_eq!(emitted, 0);
        assert_eq!(scheduler.stats().notes_dropped_late, 3);

        // Counters kept moving: the next note is beat 4 at 1.6
        assert_eq!(scheduler.transport().position().beat, 4);
        clock.set(1.55);
        assert_eq!(scheduler.tick(&dispatcher), 1);
        let command = scheduler.sink().last().unwrap();
        assert!(command.target_time > 1.55);
        assert_eq!(command.class, SoundClass::Normal);
    }

    #[test]
    fn test_pass_ends_when_event_time_stops_increasing() {
        // At 1e16 s one f64 step is 2.0, so adding a 0.5 s beat changes nothing
        let clock = ManualClock::new(1e16);
        let mut scheduler = scheduler(&clock);
        let dispatcher = dispatcher();
        scheduler.start(&StartConfig::default(), &dispatcher).unwrap();

        clock.set(1e16 + 2.0);
        assert_eq!(scheduler.tick(&dispatcher), 0);
        assert_eq!(scheduler.stats().notes_dropped_late, 1);
        assert_eq!(scheduler.stats().stalled_passes, 1);
        assert!(scheduler.is_running());
    }

    #[test]
    fn test_pass_at_fastest_grid_is_bounded() {
        let clock = ManualClock::new(0.0);
        let mut scheduler = scheduler(&clock);
        let dispatcher = dispatcher();
        let config = StartConfig {
            bpm: Tempo::MAX_BPM,
            subdivision: Meter::MAX_SUBDIVISION,
            ..StartConfig::default()
        };
        scheduler.start(&config, &dispatcher).unwrap();

        clock.advance(0.03);
        // Window [0.03, 0.13) with events every 12.5ms from 0.1
        assert_eq!(scheduler.tick(&dispatcher), 3);
        assert_eq!(scheduler.stats().stalled_passes, 0);
    }

    #[test]
    fn test_stop_disarms_and_keeps_emitted_commands() {
        let clock = ManualClock::new(0.0);
        let mut scheduler = scheduler(&clock);
        let dispatcher = dispatcher();
        scheduler.start(&StartConfig::default(), &dispatcher).unwrap();
        for _ in 0..20 {
            scheduler.wait_and_tick(&dispatcher);
        }
        let emitted = scheduler.sink().len();
        assert!(emitted > 0);

        scheduler.stop();
        assert!(!scheduler.is_running());
        assert!(!scheduler.driver().is_armed());
        assert!(!scheduler.wait_and_tick(&dispatcher));
        assert_eq!(scheduler.sink().len(), emitted);

        // Second stop is a no-op
        scheduler.stop();
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_gain_change_after_dispatch_reaches_note() {
        let clock = ManualClock::new(0.0);
        let mut scheduler = scheduler(&clock);
        let mut dispatcher = dispatcher();
        let output_gains = dispatcher.gain_reader();

        scheduler.start(&StartConfig::default(), &dispatcher).unwrap();
        clock.advance(0.025);
        assert_eq!(scheduler.tick(&dispatcher), 1);

        // The accent at 0.1 is already with the sink
        dispatcher.set_gain(Channel::Accent, 50.0, clock.now());
        let first = &scheduler.sink()[0];
        assert_eq!(first.channel, Channel::Accent);
        assert!((output_gains.gain_at(first.channel, first.target_time) - 0.5).abs() < 1e-6);
    }
}
