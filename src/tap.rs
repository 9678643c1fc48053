// Tap tempo - BPM estimate from user tap timestamps
//
// Only the most recent taps are averaged so that the estimate follows a
// tempo change quickly while still smoothing single-tap noise.

use std::collections::VecDeque;

use crate::config::TapSettings;

/// Tap buffer and estimator
#[derive(Debug, Clone)]
pub struct TapTempo {
    taps: VecDeque<f64>,
    settings: TapSettings,
}

impl TapTempo {
    pub fn new(settings: TapSettings) -> Self {
        Self {
            taps: VecDeque::with_capacity(settings.max_taps + 1),
            settings,
        }
    }

    /// Register a tap at `timestamp_ms`
    ///
    /// Returns the clamped BPM estimate once at least two taps of the current
    /// session are buffered.
    pub fn tap(&mut self, timestamp_ms: f64) -> Option<u32> {
        if let Some(&last) = self.taps.back()
            && timestamp_ms - last > self.settings.timeout_ms
        {
            self.taps.clear();
        }

        self.taps.push_back(timestamp_ms);
        while self.taps.len() > self.settings.max_taps {
            self.taps.pop_front();
        }

        self.estimate()
    }

    /// Current estimate without registering a tap
    pub fn estimate(&self) -> Option<u32> {
        if self.taps.len() < 2 {
            return None;
        }

        let (first, last) = (self.taps.front()?, self.taps.back()?);
        // Mean of consecutive intervals == total span / number of intervals
        let mean_interval = (last - first) / (self.taps.len() - 1) as f64;
        if mean_interval.is_nan() || mean_interval <= 0.0 {
            return None;
        }

        let bpm = (60_000.0 / mean_interval).round();
        let clamped = bpm.clamp(self.settings.min_bpm as f64, self.settings.max_bpm as f64);
        Some(clamped as u32)
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new(TapSettings::default())
    }
}
