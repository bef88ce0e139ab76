//! Conversions between the device's interleaved stereo f32 buffers and the
//! application's complex I/Q domain.

use num_complex::Complex64;

/// Fixed attenuation applied to captured samples before they enter the
/// I/Q domain.
pub const INPUT_GAIN: f64 = 0.01;

/// Convert interleaved stereo `[L0, R0, L1, R1, ...]` to I/Q samples.
///
/// Left maps to the real part and right to the imaginary part, both scaled
/// by [`INPUT_GAIN`]. Converts `min(iq.len(), interleaved.len() / 2)` frames.
pub fn interleaved_to_iq(interleaved: &[f32], iq: &mut [Complex64]) {
    for (sample, frame) in iq.iter_mut().zip(interleaved.chunks_exact(2)) {
        *sample = Complex64::new(frame[0] as f64 * INPUT_GAIN, frame[1] as f64 * INPUT_GAIN);
    }
}

/// Write mono `audio` scaled by `gain` into both channels of `interleaved`.
pub fn mono_to_interleaved(audio: &[f64], gain: f64, interleaved: &mut [f32]) {
    for (frame, &value) in interleaved.chunks_exact_mut(2).zip(audio) {
        let sample = (value * gain) as f32;
        frame[0] = sample;
        frame[1] = sample;
    }
}

/// Exchange real and imaginary parts in place.
pub fn swap_iq(iq: &mut [Complex64]) {
    for sample in iq.iter_mut() {
        *sample = Complex64::new(sample.im, sample.re);
    }
}
