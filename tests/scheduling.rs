// Integration test: look-ahead scheduling under simulated tick jitter
//
// The tick driver advances a manual clock by one poll period plus random
// jitter, so every run is deterministic for a given seed.

use clicktrack::audio::{ExportSettings, OfflineRenderer};
use clicktrack::{
    Channel, ChannelGains, ClockSource, EngineSettings, ManualClock, Metronome, MetronomeError,
    PlaybackCommand, PlaybackSink, SimulatedDriver, SoundBank, SoundClass, SoundHandle,
    StartConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Sink that remembers the clock time at which each command was handed over
struct RecordingSink {
    clock: ManualClock,
    emitted: Vec<(f64, PlaybackCommand)>,
}

impl RecordingSink {
    fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            emitted: Vec::new(),
        }
    }

    fn times(&self) -> Vec<f64> {
        self.emitted.iter().map(|(_, c)| c.target_time).collect()
    }

    fn classes(&self) -> Vec<SoundClass> {
        self.emitted.iter().map(|(_, c)| c.class).collect()
    }
}

impl PlaybackSink for RecordingSink {
    fn schedule(&mut self, command: PlaybackCommand) {
        self.emitted.push((self.clock.now(), command));
    }
}

type TestMetronome = Metronome<ManualClock, RecordingSink, SimulatedDriver>;

fn build(sounds: SoundBank, jitter_seed: Option<u64>) -> (ManualClock, TestMetronome) {
    let clock = ManualClock::new(0.0);
    let mut driver = SimulatedDriver::new(clock.clone());
    if let Some(seed) = jitter_seed {
        let mut rng = StdRng::seed_from_u64(seed);
        // +/-10ms on a 25ms period
        driver = driver.with_jitter(move || rng.gen_range(-0.010..0.010));
    }
    let metronome = Metronome::new(
        clock.clone(),
        RecordingSink::new(clock.clone()),
        driver,
        sounds,
        &EngineSettings::default(),
    )
    .unwrap();
    (clock, metronome)
}

fn run_until(clock: &ManualClock, metronome: &mut TestMetronome, until: f64) {
    while clock.now() < until {
        assert!(metronome.wait_and_tick());
    }
}

fn config(bpm: f64, beats_per_measure: u32, subdivision: u32) -> StartConfig {
    StartConfig {
        bpm,
        beats_per_measure,
        subdivision,
        accent_enabled: true,
    }
}

#[test]
fn test_accent_pattern_at_120_bpm() {
    let (clock, mut metronome) = build(SoundBank::synthesized(48000), None);
    metronome.start(config(120.0, 4, 1)).unwrap();
    run_until(&clock, &mut metronome, 4.2);

    let sink = metronome.sink();
    let classes = sink.classes();
    assert_eq!(
        &classes[..8],
        &[
            SoundClass::Accent,
            SoundClass::Normal,
            SoundClass::Normal,
            SoundClass::Normal,
            SoundClass::Accent,
            SoundClass::Normal,
            SoundClass::Normal,
            SoundClass::Normal,
        ]
    );

    for (i, time) in sink.times().iter().enumerate() {
        let expected = 0.1 + i as f64 * 0.5;
        assert!(
            (time - expected).abs() < 1e-9,
            "note {} at {} (expected {})",
            i,
            time,
            expected
        );
    }
}

#[test]
fn test_subdivisions_at_90_bpm() {
    let (clock, mut metronome) = build(SoundBank::synthesized(48000), None);
    let beats = Arc::new(Mutex::new(Vec::new()));
    let beat_log = Arc::clone(&beats);
    metronome.on_beat(move |beat, time| beat_log.lock().unwrap().push((beat, time)));

    metronome.start(config(90.0, 4, 2)).unwrap();
    run_until(&clock, &mut metronome, 3.0);

    let sink = metronome.sink();
    let times = sink.times();
    assert!(times.len() >= 8);
    for pair in times.windows(2) {
        assert!((pair[1] - pair[0] - 1.0 / 3.0).abs() < 1e-9);
    }

    // Primary beats alternate with off-beats on the subdivision channel
    for (i, (_, command)) in sink.emitted.iter().enumerate() {
        if i % 2 == 0 {
            assert_ne!(command.channel, Channel::Subdivision);
        } else {
            assert_eq!(command.channel, Channel::Subdivision);
            assert_eq!(command.class, SoundClass::Subdivision);
        }
    }

    // One notification per primary beat, carrying its target time
    let beats = beats.lock().unwrap();
    assert_eq!(beats.len(), times.len().div_ceil(2));
    for (i, (beat, time)) in beats.iter().enumerate() {
        assert_eq!(*beat, (i as u32 % 4) + 1);
        assert_eq!(*time, times[i * 2]);
    }
}

#[test]
fn test_never_late_under_jitter() {
    for seed in [1, 7, 42, 1234] {
        let (clock, mut metronome) = build(SoundBank::synthesized(48000), Some(seed));
        metronome.start(config(240.0, 7, 4)).unwrap();

        while clock.now() < 30.0 {
            metronome.wait_and_tick();
            // Everything due inside the window has been handed over
            assert!(metronome.transport().next_event_time() >= clock.now() + 0.1);
        }

        let sink = metronome.sink();
        for (emitted_at, command) in &sink.emitted {
            assert!(
                command.target_time > *emitted_at,
                "seed {}: note for {} emitted at {}",
                seed,
                command.target_time,
                emitted_at
            );
        }

        let stats = metronome.stats();
        assert_eq!(stats.notes_dropped_late, 0);
        assert_eq!(stats.notes_scheduled as usize, sink.emitted.len());
    }
}

#[test]
fn test_no_gaps_under_jitter() {
    let (clock, mut metronome) = build(SoundBank::synthesized(48000), Some(99));
    metronome.start(config(137.0, 3, 3)).unwrap();
    run_until(&clock, &mut metronome, 20.0);

    let interval = 60.0 / 137.0 / 3.0;
    let times = metronome.sink().times();
    let expected_notes = ((20.0 - 0.1) / interval) as usize;
    assert!(times.len() >= expected_notes);
    for pair in times.windows(2) {
        assert!((pair[1] - pair[0] - interval).abs() < 1e-9);
    }
}

#[test]
fn test_stalled_host_drops_late_notes_and_recovers() {
    let (clock, mut metronome) = build(SoundBank::synthesized(48000), None);
    metronome.start(config(120.0, 4, 1)).unwrap();
    run_until(&clock, &mut metronome, 0.5);

    // Host freezes for two seconds
    clock.advance(2.0);
    metronome.tick();
    assert!(metronome.stats().notes_dropped_late >= 3);

    run_until(&clock, &mut metronome, 5.0);
    for (emitted_at, command) in &metronome.sink().emitted {
        assert!(command.target_time > *emitted_at);
    }
}

#[test]
fn test_subdivision_fallback_to_normal_sound() {
    let normal = SoundHandle::synth_click(48000, 800.0, 12.0, 0.5);
    let accent = SoundHandle::synth_click(48000, 1200.0, 15.0, 0.8);
    let sounds = SoundBank::new(Some(accent), Some(normal.clone()), None);
    let (clock, mut metronome) = build(sounds, None);

    metronome.start(config(100.0, 4, 3)).unwrap();
    run_until(&clock, &mut metronome, 2.0);

    let off_beats: Vec<&PlaybackCommand> = metronome
        .sink()
        .emitted
        .iter()
        .map(|(_, c)| c)
        .filter(|c| c.channel == Channel::Subdivision)
        .collect();
    assert!(!off_beats.is_empty());
    for command in off_beats {
        assert_eq!(command.class, SoundClass::Normal);
        assert!(command.sound.ptr_eq(&normal));
    }
    assert_eq!(metronome.stats().notes_skipped, 0);
}

#[test]
fn test_start_without_accent_sound_changes_nothing() {
    let normal = SoundHandle::synth_click(48000, 800.0, 12.0, 0.5);
    let (clock, mut metronome) = build(SoundBank::new(None, Some(normal), None), None);

    let result = metronome.start(config(150.0, 3, 2));
    assert!(matches!(
        result,
        Err(MetronomeError::ResourceUnavailable(SoundClass::Accent))
    ));
    assert!(!metronome.is_running());
    assert_eq!(metronome.config(), &StartConfig::default());

    // Driver was never armed: nothing ticks, nothing is emitted
    assert!(!metronome.wait_and_tick());
    assert_eq!(clock.now(), 0.0);
    assert!(metronome.sink().emitted.is_empty());
    assert_eq!(metronome.stats().passes, 0);
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let (clock, mut metronome) = build(SoundBank::synthesized(48000), None);
    metronome.stop();
    assert!(!metronome.is_running());

    metronome.start(config(120.0, 4, 1)).unwrap();
    run_until(&clock, &mut metronome, 0.3);
    let next = metronome.transport().next_event_time();
    let position = metronome.transport().position();

    metronome.start(config(60.0, 2, 2)).unwrap();
    assert_eq!(metronome.transport().next_event_time(), next);
    assert_eq!(metronome.transport().position(), position);
    assert_eq!(metronome.transport().tempo().bpm(), 120.0);

    metronome.stop();
    metronome.stop();
    assert!(!metronome.is_running());
    let emitted = metronome.sink().emitted.len();
    assert!(!metronome.wait_and_tick());
    assert_eq!(metronome.sink().emitted.len(), emitted);
}

#[test]
fn test_tempo_change_applies_from_next_advance() {
    let (clock, mut metronome) = build(SoundBank::synthesized(48000), None);
    metronome.start(config(120.0, 4, 1)).unwrap();
    // 0.1 and 0.6 are out, 1.1 is pending
    run_until(&clock, &mut metronome, 0.8);
    assert_eq!(metronome.sink().emitted.len(), 2);

    metronome.update_bpm(60.0).unwrap();
    run_until(&clock, &mut metronome, 3.5);

    let times = metronome.sink().times();
    let expected = [0.1, 0.6, 1.1, 2.1, 3.1];
    assert!(times.len() >= expected.len());
    for (time, expected) in times.iter().zip(expected) {
        assert!((time - expected).abs() < 1e-9, "{} != {}", time, expected);
    }
}

#[test]
fn test_shrinking_meter_wraps_pending_beat() {
    let (clock, mut metronome) = build(SoundBank::synthesized(48000), None);
    metronome.start(config(120.0, 4, 1)).unwrap();
    // Beats 1..3 are out, beat 4 at 1.6 is pending
    run_until(&clock, &mut metronome, 1.2);
    assert_eq!(metronome.transport().position().beat, 4);

    metronome.update_beats_per_measure(3).unwrap();
    assert_eq!(metronome.transport().position().beat, 1);
    run_until(&clock, &mut metronome, 3.2);

    let classes = metronome.sink().classes();
    assert_eq!(
        &classes[..7],
        &[
            SoundClass::Accent,
            SoundClass::Normal,
            SoundClass::Normal,
            SoundClass::Accent,
            SoundClass::Normal,
            SoundClass::Normal,
            SoundClass::Accent,
        ]
    );
}

#[test]
fn test_volume_change_ramps_across_notes() {
    let (clock, mut metronome) = build(SoundBank::synthesized(48000), None);
    metronome.start(config(120.0, 4, 1)).unwrap();
    run_until(&clock, &mut metronome, 0.2);

    metronome.set_volume(Channel::Normal, 25.0);
    metronome.set_accent_enabled(false);
    run_until(&clock, &mut metronome, 2.5);

    let gains = metronome.gain_reader();
    let emitted = &metronome.sink().emitted;
    // First note (accent, before the change) keeps full gain
    assert_eq!(emitted[0].1.class, SoundClass::Accent);
    assert_eq!(gains.gain_at(emitted[0].1.channel, emitted[0].1.target_time), 1.0);
    // Later notes are all normal at the new level
    for (_, command) in &emitted[1..] {
        assert_eq!(command.class, SoundClass::Normal);
        assert!((gains.gain_at(command.channel, command.target_time) - 0.25).abs() < 1e-6);
    }
}

#[test]
fn test_mute_reaches_note_already_dispatched() {
    let clock = ManualClock::new(0.0);
    let gains = ChannelGains::default();
    let export = ExportSettings {
        sample_rate: 8000,
        channels: 1,
        master_volume: 1.0,
    };
    let mut metronome = Metronome::with_gains(
        clock.clone(),
        OfflineRenderer::new(export, gains.reader()),
        SimulatedDriver::new(clock.clone()),
        SoundBank::synthesized(8000),
        gains,
        &EngineSettings::default(),
    )
    .unwrap();

    metronome.start(config(120.0, 4, 1)).unwrap();
    assert!(metronome.wait_and_tick());
    // The accent at 0.1 is with the renderer before the volume changes
    assert_eq!(metronome.sink().clicks(), 1);
    metronome.set_volume(Channel::Accent, 0.0);

    while clock.now() < 0.8 {
        assert!(metronome.wait_and_tick());
        metronome.sink_mut().mix_until(clock.now());
    }

    let mix = metronome.sink().mix();
    // Accent at 800..920 is silent, the normal beat at 0.6 is not
    assert!(mix[790..1000].iter().all(|&s| s == 0.0));
    assert!(mix[4800..4900].iter().any(|&s| s != 0.0));
}

#[test]
fn test_out_of_range_tempo_rejected_and_pass_still_returns() {
    let (_, mut metronome) = build(SoundBank::synthesized(48000), None);
    metronome.start(config(120.0, 4, 1)).unwrap();

    assert!(matches!(
        metronome.update_bpm(1e15),
        Err(MetronomeError::InvalidConfig(_))
    ));
    assert!(metronome.update_subdivision(1 << 20).is_err());
    assert_eq!(metronome.transport().tempo().bpm(), 120.0);
    assert_eq!(metronome.transport().meter().subdivision(), 1);

    assert!(metronome.wait_and_tick());
    assert!(metronome.wait_and_tick());
    assert!(metronome.tick() <= 1);
    assert_eq!(metronome.stats().stalled_passes, 0);
}
