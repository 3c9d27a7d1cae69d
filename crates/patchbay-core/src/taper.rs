//! Fader curve mapping 7-bit controller values to linear gain.

use libm::powf;

/// Default headroom above unity at full fader travel, in dB.
pub const DEFAULT_MAX_DB: f32 = 12.0;

/// Largest value a 7-bit MIDI controller can send.
pub const MIDI_MAX: u8 = 127;

/// Fourth-power fader taper.
///
/// `gain = (max_linear * value / 127)^4` where
/// `max_linear = 10^(0.0125 * max_db)`. At full travel the gain is
/// `max_db` above unity; the fourth power spreads the useful range over
/// the upper half of the fader.
///
/// ```rust
/// use patchbay_core::FaderTaper;
///
/// let taper = FaderTaper::default();
/// assert_eq!(taper.gain(0), 0.0);
/// // Full travel lands 12 dB above unity
/// assert!((taper.gain(127) - 3.981).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaderTaper {
    max_db: f32,
    max_linear: f32,
}

impl FaderTaper {
    /// Create a taper with `max_db` of headroom at full travel.
    ///
    /// A NaN or infinite `max_db` falls back to [`DEFAULT_MAX_DB`].
    pub fn new(max_db: f32) -> Self {
        let max_db = if max_db.is_finite() {
            max_db
        } else {
            DEFAULT_MAX_DB
        };
        Self {
            max_db,
            max_linear: powf(10.0, 0.0125 * max_db),
        }
    }

    /// Headroom in dB at full travel.
    pub fn max_db(&self) -> f32 {
        self.max_db
    }

    /// Linear multiplier applied before the fourth power.
    pub fn max_linear(&self) -> f32 {
        self.max_linear
    }

    /// Gain for a controller value. Values above 127 are treated as 127.
    #[inline]
    pub fn gain(&self, value: u8) -> f32 {
        let position = f32::from(value.min(MIDI_MAX)) / f32::from(MIDI_MAX);
        let g = self.max_linear * position;
        let g2 = g * g;
        g2 * g2
    }
}

impl Default for FaderTaper {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DB)
    }
}
