// Output hygiene applied to every mixed sample, live or offline

/// Values below this are treated as silence
const DENORMAL_THRESHOLD: f32 = 1e-15;

/// Flush near-zero values to zero so decaying click tails never reach the
/// denormal range
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < DENORMAL_THRESHOLD { 0.0 } else { x }
}

/// tanh saturation into (-1, 1)
///
/// Overlapping clicks at full volume can sum past 1.0; this keeps the
/// peak bounded without a hard corner.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// Final stage for one mixed sample: denormal flush, master gain, saturation
#[inline]
pub fn finish_sample(mixed: f32, master_gain: f32) -> f32 {
    soft_clip(flush_denormals_to_zero(mixed) * master_gain)
}
