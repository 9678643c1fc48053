// Sounds - Opaque click handles and the sound bank
// The core never decodes audio: it only moves handles around

use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Which of the three click sounds a note uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundClass {
    /// Beat 1 of the measure when accent is enabled
    Accent,
    /// Other primary beats
    Normal,
    /// Off-beat subdivisions
    Subdivision,
}

impl fmt::Display for SoundClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SoundClass::Accent => "accent",
            SoundClass::Normal => "normal",
            SoundClass::Subdivision => "subdivision",
        };
        f.write_str(name)
    }
}

/// Decoded, ready-to-play click
///
/// Cloning only bumps a reference count, so handles can be sent to the audio
/// thread with every playback command.
#[derive(Clone)]
pub struct SoundHandle {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl SoundHandle {
    /// Wrap already-decoded mono samples
    pub fn from_samples(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Synthesize a short click: sine burst with exponential decay
    /// Higher frequency and amplitude give a brighter, louder click
    pub fn synth_click(sample_rate: u32, frequency: f32, duration_ms: f32, amplitude: f32) -> Self {
        let num_samples = ((duration_ms / 1000.0) * sample_rate as f32) as usize;
        let phase_increment = 2.0 * PI * frequency / sample_rate as f32;

        let samples: Vec<f32> = (0..num_samples)
            .map(|i| {
                let t = i as f32 / num_samples as f32;
                let envelope = (-t * 8.0).exp();
                (i as f32 * phase_increment).sin() * envelope * amplitude
            })
            .collect();

        Self::from_samples(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Same underlying buffer
    pub fn ptr_eq(&self, other: &SoundHandle) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }
}

impl fmt::Debug for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundHandle")
            .field("samples", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// The three optional click sounds
///
/// Accent and normal are required to start; subdivision is optional and
/// falls back to the normal sound.
#[derive(Debug, Clone, Default)]
pub struct SoundBank {
    accent: Option<SoundHandle>,
    normal: Option<SoundHandle>,
    subdivision: Option<SoundHandle>,
}

impl SoundBank {
    pub fn new(
        accent: Option<SoundHandle>,
        normal: Option<SoundHandle>,
        subdivision: Option<SoundHandle>,
    ) -> Self {
        Self {
            accent,
            normal,
            subdivision,
        }
    }

    /// Built-in synthesized clicks
    pub fn synthesized(sample_rate: u32) -> Self {
        Self::new(
            Some(SoundHandle::synth_click(sample_rate, 1200.0, 15.0, 0.8)),
            Some(SoundHandle::synth_click(sample_rate, 800.0, 12.0, 0.5)),
            Some(SoundHandle::synth_click(sample_rate, 600.0, 8.0, 0.3)),
        )
    }

    pub fn get(&self, class: SoundClass) -> Option<&SoundHandle> {
        match class {
            SoundClass::Accent => self.accent.as_ref(),
            SoundClass::Normal => self.normal.as_ref(),
            SoundClass::Subdivision => self.subdivision.as_ref(),
        }
    }

    pub fn set(&mut self, class: SoundClass, sound: Option<SoundHandle>) {
        match class {
            SoundClass::Accent => self.accent = sound,
            SoundClass::Normal => self.normal = sound,
            SoundClass::Subdivision => self.subdivision = sound,
        }
    }

    pub fn has(&self, class: SoundClass) -> bool {
        self.get(class).is_some()
    }

    /// First required sound that is missing, if any
    pub fn missing_required(&self) -> Option<SoundClass> {
        [SoundClass::Accent, SoundClass::Normal]
            .into_iter()
            .find(|class| !self.has(*class))
    }
}
