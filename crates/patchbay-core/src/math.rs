//! Level and time-constant helpers shared by the channel DSP.
//!
//! All functions are allocation-free and safe to call from the audio callback.
//!
//! - [`db_to_linear`] / [`linear_to_db`] - level conversions
//! - [`time_coefficient`] - one-pole smoothing coefficient from a time constant
//! - [`DC_OFFSET`] - tiny bias that keeps logarithms and envelopes finite

use libm::{expf, log10f};

/// Bias added before taking logarithms and used as the envelope floor.
///
/// Small enough to be inaudible, large enough to keep `log10` away from
/// `-inf` and the envelope away from denormals.
pub const DC_OFFSET: f32 = 1.0e-25;

/// Convert decibels to linear gain (`10^(dB/20)`).
///
/// ```rust
/// use patchbay_core::math::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert a linear magnitude to decibels, biased by [`DC_OFFSET`].
///
/// Silence maps to roughly -500 dB rather than `-inf`.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * log10f(linear + DC_OFFSET)
}

/// One-pole coefficient for a time constant of `ms` milliseconds.
///
/// Returns `exp(-1 / (ms / 1000 * sample_rate))`. A non-positive time or
/// sample rate yields `0.0`, i.e. the envelope jumps straight to its target.
#[inline]
pub fn time_coefficient(ms: f32, sample_rate: f32) -> f32 {
    let samples = ms / 1000.0 * sample_rate;
    if samples > 0.0 { expf(-1.0 / samples) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_round_trip() {
        for db in [-60.0, -12.0, -3.0, 0.0, 6.0, 12.0] {
            let back = linear_to_db(db_to_linear(db));
            assert!((back - db).abs() < 1e-3, "{db} dB came back as {back}");
        }
    }

    #[test]
    fn test_silence_is_finite() {
        let db = linear_to_db(0.0);
        assert!(db.is_finite());
        assert!(db < -400.0);
    }

    #[test]
    fn test_time_coefficient() {
        // 1 ms at 48 kHz is 48 samples
        let c = time_coefficient(1.0, 48000.0);
        assert!((c - expf(-1.0 / 48.0)).abs() < 1e-7);

        // Longer time constants smooth more
        assert!(time_coefficient(100.0, 48000.0) > c);
    }

    #[test]
    fn test_time_coefficient_degenerate() {
        assert_eq!(time_coefficient(0.0, 48000.0), 0.0);
        assert_eq!(time_coefficient(10.0, 0.0), 0.0);
    }
}
