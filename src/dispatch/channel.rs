// Gain channels - accent, normal and subdivision volumes
// Gain changes are linear ramps in the clock domain, never steps

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering, fence};

/// One of the three independent volume channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Accent,
    Normal,
    Subdivision,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Accent, Channel::Normal, Channel::Subdivision];

    pub fn index(self) -> usize {
        match self {
            Channel::Accent => 0,
            Channel::Normal => 1,
            Channel::Subdivision => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Accent => "accent",
            Channel::Normal => "normal",
            Channel::Subdivision => "subdivision",
        };
        f.write_str(name)
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accent" => Ok(Channel::Accent),
            "normal" => Ok(Channel::Normal),
            "sub" | "subdivision" => Ok(Channel::Subdivision),
            other => Err(format!("Unknown channel: {}", other)),
        }
    }
}

/// Linear gain ramp between two clock times
///
/// Before `start_time` the gain is `from`, after `end_time` it is `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainRamp {
    from: f32,
    to: f32,
    start_time: f64,
    end_time: f64,
}

impl GainRamp {
    /// Constant gain
    pub fn hold(gain: f32) -> Self {
        Self {
            from: gain,
            to: gain,
            start_time: 0.0,
            end_time: 0.0,
        }
    }

    pub fn new(from: f32, to: f32, start_time: f64, duration: f64) -> Self {
        Self {
            from,
            to,
            start_time,
            end_time: start_time + duration.max(0.0),
        }
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Gain at clock time `time`
    pub fn value_at(&self, time: f64) -> f32 {
        if time <= self.start_time {
            return self.from;
        }
        if time >= self.end_time {
            return self.to;
        }
        let progress = ((time - self.start_time) / (self.end_time - self.start_time)) as f32;
        self.from + (self.to - self.from) * progress
    }
}

/// Lock-free copy of a `GainRamp`
///
/// Sequence-locked: the writer makes `sequence` odd while it stores the
/// fields, readers retry until they see the same even value on both sides.
#[derive(Debug, Default)]
struct AtomicRamp {
    sequence: AtomicU64,
    from: AtomicU32,
    to: AtomicU32,
    start_time: AtomicU64,
    end_time: AtomicU64,
}

impl AtomicRamp {
    fn new(ramp: GainRamp) -> Self {
        let atomic = Self::default();
        atomic.store(ramp);
        atomic
    }

    /// Single writer only
    fn store(&self, ramp: GainRamp) {
        let sequence = self.sequence.load(Ordering::Relaxed);
        self.sequence.store(sequence.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        self.from.store(ramp.from.to_bits(), Ordering::Relaxed);
        self.to.store(ramp.to.to_bits(), Ordering::Relaxed);
        self.start_time.store(ramp.start_time.to_bits(), Ordering::Relaxed);
        self.end_time.store(ramp.end_time.to_bits(), Ordering::Relaxed);

        self.sequence.store(sequence.wrapping_add(2), Ordering::Release);
    }

    fn load(&self) -> GainRamp {
        loop {
            let before = self.sequence.load(Ordering::Acquire);
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let ramp = GainRamp {
                from: f32::from_bits(self.from.load(Ordering::Relaxed)),
                to: f32::from_bits(self.to.load(Ordering::Relaxed)),
                start_time: f64::from_bits(self.start_time.load(Ordering::Relaxed)),
                end_time: f64::from_bits(self.end_time.load(Ordering::Relaxed)),
            };

            fence(Ordering::Acquire);
            if self.sequence.load(Ordering::Relaxed) == before {
                return ramp;
            }
        }
    }
}

/// Gain automation of the three channels (control side)
///
/// Owns the only write access; `reader()` hands out lock-free handles for the
/// output side, so notes already handed to a sink still follow later ramps.
#[derive(Debug)]
pub struct ChannelGains {
    ramps: [GainRamp; 3],
    shared: Arc<[AtomicRamp; 3]>,
}

impl ChannelGains {
    /// Every channel held at `gain`
    pub fn new(gain: f32) -> Self {
        let ramp = GainRamp::hold(gain.clamp(0.0, 1.0));
        Self {
            ramps: [ramp; 3],
            shared: Arc::new(Channel::ALL.map(|_| AtomicRamp::new(ramp))),
        }
    }

    /// Jump a channel to `gain` with no ramp
    pub fn hold(&mut self, channel: Channel, gain: f32) {
        self.publish(channel, GainRamp::hold(gain.clamp(0.0, 1.0)));
    }

    /// Ramp from whatever the gain is at `now` to `target`
    pub fn ramp_to(&mut self, channel: Channel, target: f32, now: f64, duration: f64) {
        let current = self.ramps[channel.index()].value_at(now);
        self.publish(
            channel,
            GainRamp::new(current, target.clamp(0.0, 1.0), now, duration),
        );
    }

    pub fn gain_at(&self, channel: Channel, time: f64) -> f32 {
        self.ramps[channel.index()].value_at(time)
    }

    pub fn ramp(&self, channel: Channel) -> &GainRamp {
        &self.ramps[channel.index()]
    }

    pub fn reader(&self) -> GainReader {
        GainReader {
            shared: Arc::clone(&self.shared),
        }
    }

    fn publish(&mut self, channel: Channel, ramp: GainRamp) {
        self.ramps[channel.index()] = ramp;
        self.shared[channel.index()].store(ramp);
    }
}

impl Default for ChannelGains {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Read-only view of `ChannelGains`, safe to use from the audio callback
#[derive(Debug, Clone)]
pub struct GainReader {
    shared: Arc<[AtomicRamp; 3]>,
}

impl GainReader {
    pub fn gain_at(&self, channel: Channel, time: f64) -> f32 {
        self.ramp(channel).value_at(time)
    }

    pub fn ramp(&self, channel: Channel) -> GainRamp {
        self.shared[channel.index()].load()
    }
}

/// Convert a 0..=100 volume level to a [0, 1] gain
pub fn level_to_gain(level: f32) -> f32 {
    if level.is_nan() {
        return 0.0;
    }
    level.clamp(0.0, 100.0) / 100.0
}
