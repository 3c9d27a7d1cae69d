//! Envelope-follower gain reduction and the lookahead limiter built on it.
//!
//! # Algorithm
//!
//! [`Compressor`] is a feed-forward peak compressor operating in the dB domain.
//! Endpoint 0 of a channel is the detector: every time it is evaluated the
//! largest magnitude seen since the previous evaluation is converted to dB,
//! the threshold is subtracted (floored at 0) and the result is blended into
//! the envelope with separate attack and release coefficients:
//!
//! ```text
//! over     = max(20·log10(biggest + DC) − threshold, 0) + DC
//! envelope = over + (over > envelope ? attack : release) · (envelope − over)
//! gain     = 10^(0.05 · (envelope − DC) · (ratio − 1))
//! ```
//!
//! All other endpoints reuse the detector's gain, so a stereo pair is
//! reduced identically.
//!
//! [`Limiter`] runs a compressor with ratio 0 and delays the signal by
//! `N - 1` samples, so gain reduction computed from the incoming sample is
//! already in place when that sample reaches the output.
//!
//! # Silence guard
//!
//! After more than [`ZERO_RUN_LIMIT`] consecutive zero samples the envelope
//! stops updating. A bare compressor outputs silence in that state; the
//! limiter keeps its last gain so its delay line still drains.

use libm::fabsf;

use crate::math::{DC_OFFSET, db_to_linear, linear_to_db, time_coefficient};

/// Consecutive zero samples after which the detector stops updating.
pub const ZERO_RUN_LIMIT: u32 = 100;

/// Default lookahead length in samples.
pub const DEFAULT_LOOKAHEAD: usize = 144;

/// Default sample rate used until the channel is told otherwise.
pub const DEFAULT_SAMPLE_RATE: f32 = 48000.0;

/// Multi-endpoint, linked-detection dynamics unit.
///
/// Defaults: threshold -40 dB, ratio 1/8, attack 1 ms, release 100 ms.
#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: f32,
    threshold_db: f32,
    ratio: f32,
    attack_ms: f32,
    release_ms: f32,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
    gain_multiplier: f32,
    biggest: f32,
    zero_run: u32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, -40.0, 1.0 / 8.0, 1.0, 100.0)
    }
}

impl Compressor {
    /// Create a compressor with explicit settings.
    pub fn new(
        sample_rate: f32,
        threshold_db: f32,
        ratio: f32,
        attack_ms: f32,
        release_ms: f32,
    ) -> Self {
        Self {
            sample_rate,
            threshold_db,
            ratio,
            attack_ms,
            release_ms,
            attack_coeff: time_coefficient(attack_ms, sample_rate),
            release_coeff: time_coefficient(release_ms, sample_rate),
            envelope: DC_OFFSET,
            gain_multiplier: 1.0,
            biggest: 0.0,
            zero_run: 0,
        }
    }

    /// Threshold in dB.
    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    /// Set the threshold in dB.
    pub fn set_threshold_db(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db;
    }

    /// Compression ratio (0 = hard limit, 1 = none).
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Set the compression ratio.
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio;
    }

    /// Set the attack time in milliseconds.
    pub fn set_attack_ms(&mut self, ms: f32) {
        if ms == self.attack_ms {
            return;
        }
        self.attack_ms = ms;
        self.attack_coeff = time_coefficient(ms, self.sample_rate);
    }

    /// Set the release time in milliseconds.
    pub fn set_release_ms(&mut self, ms: f32) {
        if ms == self.release_ms {
            return;
        }
        self.release_ms = ms;
        self.release_coeff = time_coefficient(ms, self.sample_rate);
    }

    /// Recompute both coefficients for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.attack_coeff = time_coefficient(self.attack_ms, sample_rate);
        self.release_coeff = time_coefficient(self.release_ms, sample_rate);
    }

    /// Attack coefficient currently in use.
    pub fn attack_coeff(&self) -> f32 {
        self.attack_coeff
    }

    /// Release coefficient currently in use.
    pub fn release_coeff(&self) -> f32 {
        self.release_coeff
    }

    /// Envelope in dB above threshold (floored at [`DC_OFFSET`]).
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Last computed linear gain.
    pub fn gain_multiplier(&self) -> f32 {
        self.gain_multiplier
    }

    /// Clear the envelope and detector history.
    pub fn reset(&mut self) {
        self.envelope = DC_OFFSET;
        self.gain_multiplier = 1.0;
        self.biggest = 0.0;
        self.zero_run = 0;
    }

    /// Feed one sample to the detector and return the gain to apply to it.
    ///
    /// Returns `None` while the silence guard is engaged; the envelope and
    /// stored multiplier are left untouched in that case.
    #[inline]
    pub fn detect(&mut self, sample: f32, endpoint: usize) -> Option<f32> {
        if sample == 0.0 {
            if self.zero_run <= ZERO_RUN_LIMIT {
                self.zero_run += 1;
            }
        } else {
            self.zero_run = 0;
        }
        if self.zero_run > ZERO_RUN_LIMIT {
            return None;
        }

        let magnitude = fabsf(sample);
        if magnitude > self.biggest {
            self.biggest = magnitude;
        }

        if endpoint == 0 {
            let peak = self.biggest;
            self.biggest = 0.0;

            let over = (linear_to_db(peak) - self.threshold_db).max(0.0) + DC_OFFSET;
            let coeff = if over > self.envelope {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope = over + coeff * (self.envelope - over);
            self.gain_multiplier = db_to_linear((self.envelope - DC_OFFSET) * (self.ratio - 1.0));
        }

        Some(self.gain_multiplier)
    }

    /// Compress one sample. Silence is returned while the guard is engaged.
    #[inline]
    pub fn process(&mut self, sample: f32, endpoint: usize) -> f32 {
        self.detect(sample, endpoint).map_or(0.0, |gain| sample * gain)
    }
}

/// Lookahead limiter with one delay lane per endpoint.
///
/// Lanes live in a single flat buffer of `lanes × lookahead` samples and
/// share one read cursor, which advances when endpoint 0 is processed.
///
/// Defaults: threshold -3 dB, ratio 0, attack 1 ms, release 50 ms,
/// lookahead [`DEFAULT_LOOKAHEAD`].
///
/// # Example
///
/// ```rust
/// use patchbay_core::Limiter;
///
/// let mut limiter = Limiter::default();
/// limiter.add_lane();
///
/// let mut loudest: f32 = 0.0;
/// for _ in 0..1000 {
///     loudest = loudest.max(limiter.process(10.0, 0).abs());
/// }
/// assert!(loudest <= 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Limiter {
    compressor: Compressor,
    lookahead: usize,
    lanes: Vec<f32>,
    cursor: usize,
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_LOOKAHEAD)
    }
}

impl Limiter {
    /// Create a limiter with no lanes. `lookahead` is clamped to at least 1.
    pub fn new(sample_rate: f32, lookahead: usize) -> Self {
        Self {
            compressor: Compressor::new(sample_rate, -3.0, 0.0, 1.0, 50.0),
            lookahead: lookahead.max(1),
            lanes: Vec::new(),
            cursor: 0,
        }
    }

    /// The gain stage driving this limiter.
    pub fn compressor(&self) -> &Compressor {
        &self.compressor
    }

    /// Mutable access to the gain stage, e.g. to move the threshold.
    pub fn compressor_mut(&mut self) -> &mut Compressor {
        &mut self.compressor
    }

    /// Delay line length per lane.
    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    /// Samples between input and output.
    pub fn latency_samples(&self) -> usize {
        self.lookahead - 1
    }

    /// Number of delay lanes.
    pub fn lane_count(&self) -> usize {
        self.lanes.len() / self.lookahead
    }

    /// Append a zero-filled lane.
    pub fn add_lane(&mut self) {
        self.lanes.resize(self.lanes.len() + self.lookahead, 0.0);
    }

    /// Remove the lane at `index`; later lanes shift down. Out of range is a no-op.
    pub fn remove_lane(&mut self, index: usize) {
        if index >= self.lane_count() {
            return;
        }
        let start = index * self.lookahead;
        self.lanes.drain(start..start + self.lookahead);
    }

    /// Forward a sample-rate change to the gain stage.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.compressor.set_sample_rate(sample_rate);
    }

    /// Zero every lane and reset the envelope.
    pub fn reset(&mut self) {
        self.lanes.fill(0.0);
        self.cursor = 0;
        self.compressor.reset();
    }

    /// Limit one sample of `endpoint`'s lane.
    ///
    /// Returns the sample written `lookahead - 1` calls earlier on this lane,
    /// scaled by the gain computed from `sample` and clamped to `[-1, 1]`.
    /// A lane index past the end passes the sample through the clamp only.
    #[inline]
    pub fn process(&mut self, sample: f32, endpoint: usize) -> f32 {
        if endpoint >= self.lane_count() {
            return sample.clamp(-1.0, 1.0);
        }

        let n = self.lookahead;
        let lane = &mut self.lanes[endpoint * n..(endpoint + 1) * n];
        let delayed = lane[self.cursor];
        lane[(self.cursor + n - 1) % n] = sample;

        if endpoint == 0 {
            self.cursor = (self.cursor + 1) % n;
        }

        let gain = self
            .compressor
            .detect(sample, endpoint)
            .unwrap_or_else(|| self.compressor.gain_multiplier());

        (delayed * gain).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressor_defaults() {
        let c = Compressor::default();
        assert_eq!(c.threshold_db(), -40.0);
        assert_eq!(c.ratio(), 0.125);
        assert!((c.attack_coeff() - time_coefficient(1.0, 48000.0)).abs() < 1e-7);
        assert!((c.release_coeff() - time_coefficient(100.0, 48000.0)).abs() < 1e-7);
        assert_eq!(c.envelope(), DC_OFFSET);
    }

    #[test]
    fn test_below_threshold_is_transparent() {
        let mut c = Compressor::default();
        // -60 dB sits 20 dB below the -40 dB threshold
        for _ in 0..1000 {
            let out = c.process(0.001, 0);
            assert!((out - 0.001).abs() < 1e-6);
        }
    }

    #[test]
    fn test_above_threshold_reduces_gain() {
        let mut c = Compressor::default();
        let mut out = 0.0;
        for _ in 0..4800 {
            out = c.process(0.5, 0);
        }
        assert!(out < 0.5);
        assert!(c.gain_multiplier() < 1.0);
    }

    #[test]
    fn test_ratio_one_is_transparent() {
        let mut c = Compressor::new(48000.0, -40.0, 1.0, 1.0, 100.0);
        for _ in 0..1000 {
            assert_eq!(c.process(0.9, 0), 0.9);
        }
    }

    #[test]
    fn test_linked_detection_reuses_gain() {
        let mut c = Compressor::default();
        for _ in 0..2000 {
            c.process(0.8, 0);
            c.process(0.1, 1);
        }
        let g = c.gain_multiplier();
        let out = c.process(0.1, 1);
        assert!((out - 0.1 * g).abs() < 1e-7);
    }

    #[test]
    fn test_zero_run_guard() {
        let mut c = Compressor::default();
        for _ in 0..500 {
            c.process(0.5, 0);
        }
        let envelope = c.envelope();
        for i in 0..ZERO_RUN_LIMIT {
            assert!(c.detect(0.0, 0).is_some(), "sample {i}");
        }
        assert!(c.detect(0.0, 0).is_none());
        assert_eq!(c.process(0.0, 0), 0.0);
        // The envelope did move during the first 100 zeros, then froze
        let frozen = c.envelope();
        assert!(frozen < envelope);
        c.detect(0.0, 0);
        assert_eq!(c.envelope(), frozen);

        // Any non-zero sample re-arms the detector
        assert!(c.detect(0.25, 0).is_some());
    }

    #[test]
    fn test_set_sample_rate_recomputes() {
        let mut c = Compressor::default();
        let before = c.attack_coeff();
        c.set_sample_rate(96000.0);
        assert!(c.attack_coeff() > before);
    }

    #[test]
    fn test_limiter_defaults() {
        let l = Limiter::default();
        assert_eq!(l.lookahead(), DEFAULT_LOOKAHEAD);
        assert_eq!(l.latency_samples(), DEFAULT_LOOKAHEAD - 1);
        assert_eq!(l.compressor().threshold_db(), -3.0);
        assert_eq!(l.compressor().ratio(), 0.0);
        assert_eq!(l.lane_count(), 0);
    }

    #[test]
    fn test_limiter_delay() {
        let mut l = Limiter::default();
        l.add_lane();
        // Impulse well below threshold comes out after lookahead - 1 samples
        let mut outputs = Vec::new();
        outputs.push(l.process(0.1, 0));
        for _ in 0..200 {
            outputs.push(l.process(1e-6, 0));
        }
        let pos = outputs
            .iter()
            .position(|&s| (s - 0.1).abs() < 1e-3)
            .unwrap();
        assert_eq!(pos, l.latency_samples());
    }

    #[test]
    fn test_limiter_clamps() {
        let mut l = Limiter::default();
        l.add_lane();
        l.add_lane();
        for i in 0..2000 {
            let x = if i % 3 == 0 { 10.0 } else { -10.0 };
            assert!(l.process(x, 0).abs() <= 1.0);
            assert!(l.process(x, 1).abs() <= 1.0);
        }
    }

    #[test]
    fn test_limiter_reduces_sustained_level() {
        let mut l = Limiter::default();
        l.add_lane();
        let mut out = 0.0;
        for _ in 0..48000 {
            out = l.process(0.9, 0);
        }
        // -3 dB threshold is about 0.708
        assert!(out < 0.75, "settled at {out}");
    }

    #[test]
    fn test_limiter_drains_through_silence() {
        let mut l = Limiter::new(48000.0, 8);
        l.add_lane();
        l.process(0.5, 0);
        let mut tail = Vec::new();
        for _ in 0..200 {
            tail.push(l.process(0.0, 0));
        }
        assert!(tail.iter().any(|&s| s != 0.0));
        assert!(tail[150..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_lane_add_remove() {
        let mut l = Limiter::new(48000.0, 4);
        l.add_lane();
        l.add_lane();
        l.add_lane();
        assert_eq!(l.lane_count(), 3);
        l.remove_lane(1);
        assert_eq!(l.lane_count(), 2);
        l.remove_lane(7);
        assert_eq!(l.lane_count(), 2);
    }

    #[test]
    fn test_unknown_lane_passes_clamped() {
        let mut l = Limiter::default();
        assert_eq!(l.process(0.3, 2), 0.3);
        assert_eq!(l.process(3.0, 2), 1.0);
    }
}
