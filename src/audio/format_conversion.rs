// Sample format conversion for device buffers and WAV export
//
// The mix is produced as mono f32. Devices get it through cpal's
// `FromSample` (F32, I16 or U16 streams); the renderer writes 16-bit PCM.

use cpal::{FromSample, Sample};

/// Map [-1.0, 1.0] to the full i16 range, clamping anything outside
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped >= 0.0 {
        (clamped * i16::MAX as f32) as i16
    } else {
        (clamped * -(i16::MIN as f32)) as i16
    }
}

/// Write one mono sample to every channel of an interleaved frame
#[inline]
pub fn write_mono_to_interleaved_frame<T>(sample: f32, frame: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    for channel_sample in frame.iter_mut() {
        *channel_sample = Sample::from_sample::<f32>(sample);
    }
}

/// Silence a whole interleaved buffer
#[inline]
pub fn write_silence<T>(data: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    for sample in data.iter_mut() {
        *sample = Sample::from_sample::<f32>(0.0);
    }
}
