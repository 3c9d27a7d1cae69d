//! Channel strips: endpoint bundles with gain, optional limiting and metering.
//!
//! A channel groups a set of hardware endpoints (device channel indices).
//! The order of [`ChannelStrip::endpoints`] maps working-sample position to
//! device channel; the same endpoint may appear more than once.
//!
//! Two concrete channels share the strip through the [`Channel`] trait:
//!
//! - [`InputChannel`] reads the hardware input frame and owns one send
//!   level per output channel.
//! - [`OutputChannel`] accumulates sends and adds its result into the
//!   hardware output frame.
//!
//! Everything reachable from `generate`/`receive`/`process` is
//! allocation-free; only the topology-editing calls resize buffers.

use std::collections::BTreeMap;

use crate::dynamics::{DEFAULT_SAMPLE_RATE, Limiter};
use crate::taper::FaderTaper;

/// A channel parameter that a MIDI controller can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiParam {
    /// Channel gain through the fader taper.
    Gain,
}

impl MidiParam {
    /// Look up a parameter by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gain" => Some(Self::Gain),
            _ => None,
        }
    }

    /// Configuration name of this parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gain => "gain",
        }
    }
}

/// State and DSP shared by input and output channels.
///
/// `values`, `peaks` and the limiter lanes always have one slot per entry of
/// `endpoints`.
#[derive(Debug, Clone)]
pub struct ChannelStrip {
    endpoints: Vec<usize>,
    values: Vec<f32>,
    peaks: Vec<f32>,
    gain: f32,
    limiter_enabled: bool,
    limiter: Limiter,
    midi_links: BTreeMap<u8, MidiParam>,
}

impl Default for ChannelStrip {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl ChannelStrip {
    /// Empty strip at unity gain with the limiter off.
    pub fn new(sample_rate: f32) -> Self {
        let mut limiter = Limiter::default();
        limiter.set_sample_rate(sample_rate);
        Self {
            endpoints: Vec::new(),
            values: Vec::new(),
            peaks: Vec::new(),
            gain: 1.0,
            limiter_enabled: false,
            limiter,
            midi_links: BTreeMap::new(),
        }
    }

    /// Device channel indices, in sample order.
    pub fn endpoints(&self) -> &[usize] {
        &self.endpoints
    }

    /// Working samples for the current frame.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Running peak magnitude per endpoint since the last reset.
    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    /// Linear gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Set the linear gain.
    ///
    /// Finite values are accepted and negative ones clamp to zero. NaN and
    /// infinities are ignored and return `false`.
    pub fn set_gain(&mut self, gain: f32) -> bool {
        if !gain.is_finite() {
            return false;
        }
        self.gain = gain.max(0.0);
        true
    }

    /// Whether samples pass through the limiter before gain.
    pub fn limiter_enabled(&self) -> bool {
        self.limiter_enabled
    }

    /// Turn the limiter on or off. Turning it on starts from an empty delay line.
    pub fn set_limiter_enabled(&mut self, enabled: bool) {
        if enabled && !self.limiter_enabled {
            self.limiter.reset();
        }
        self.limiter_enabled = enabled;
    }

    /// The channel's limiter.
    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    /// Mutable access to the channel's limiter.
    pub fn limiter_mut(&mut self) -> &mut Limiter {
        &mut self.limiter
    }

    /// Append an endpoint. Duplicates are allowed.
    pub fn add(&mut self, endpoint: usize) {
        self.endpoints.push(endpoint);
        self.values.push(0.0);
        self.peaks.push(0.0);
        self.limiter.add_lane();
    }

    /// Remove every occurrence of `endpoint`, returning how many were removed.
    pub fn remove(&mut self, endpoint: usize) -> usize {
        let mut removed = 0;
        for pos in (0..self.endpoints.len()).rev() {
            if self.endpoints[pos] == endpoint {
                self.endpoints.remove(pos);
                self.values.remove(pos);
                self.peaks.remove(pos);
                self.limiter.remove_lane(pos);
                removed += 1;
            }
        }
        removed
    }

    /// Set a named parameter. Returns `false` if the name is unknown.
    ///
    /// - `gain`: linear gain
    /// - `limiter`: any non-zero value enables the limiter
    ///
    /// Non-finite values are rejected for every parameter.
    pub fn set_setting(&mut self, name: &str, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        match name {
            "gain" => self.set_gain(value),
            "limiter" => {
                self.set_limiter_enabled(value != 0.0);
                true
            }
            _ => false,
        }
    }

    /// Parameters as `gain=<value>,limiter=<0|1>`.
    ///
    /// `gain` is written in shortest round-trip form, so feeding the text
    /// back through [`apply_settings`](Self::apply_settings) restores it
    /// bit for bit.
    pub fn settings(&self) -> String {
        format!(
            "gain={},limiter={}",
            self.gain,
            u8::from(self.limiter_enabled)
        )
    }

    /// Apply comma-separated `name=value` pairs.
    ///
    /// Returns the entries that were not applied (unknown name, or a value
    /// that is not a finite number). Empty entries are skipped silently.
    pub fn apply_settings<'a>(&mut self, text: &'a str) -> Vec<&'a str> {
        let mut rejected = Vec::new();
        for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let applied = entry
                .split_once('=')
                .and_then(|(name, value)| Some((name.trim(), value.trim().parse::<f32>().ok()?)))
                .is_some_and(|(name, value)| self.set_setting(name, value));
            if !applied {
                rejected.push(entry);
            }
        }
        rejected
    }

    /// Bind controller `cc` to the parameter named `param`.
    ///
    /// Unknown parameter names are ignored and return `false`. Binding a
    /// controller that is already bound replaces the old binding.
    pub fn add_midi_link(&mut self, param: &str, cc: u8) -> bool {
        match MidiParam::from_name(param) {
            Some(p) => {
                self.midi_links.insert(cc, p);
                true
            }
            None => false,
        }
    }

    /// Drop the binding for controller `cc`.
    pub fn remove_midi_link(&mut self, cc: u8) -> bool {
        self.midi_links.remove(&cc).is_some()
    }

    /// Controller bindings, ordered by controller number.
    pub fn midi_links(&self) -> impl Iterator<Item = (u8, MidiParam)> + '_ {
        self.midi_links.iter().map(|(&cc, &p)| (cc, p))
    }

    /// Apply a control change. Returns `true` if `cc` was bound.
    pub fn handle_midi(&mut self, cc: u8, value: u8, taper: &FaderTaper) -> bool {
        match self.midi_links.get(&cc) {
            Some(MidiParam::Gain) => {
                self.gain = taper.gain(value);
                true
            }
            None => false,
        }
    }

    /// Run limiter (if enabled) and gain over the working samples, then
    /// update peaks.
    #[inline]
    pub fn process(&mut self) {
        for (i, (value, peak)) in self.values.iter_mut().zip(self.peaks.iter_mut()).enumerate() {
            let mut s = *value;
            if self.limiter_enabled {
                s = self.limiter.process(s, i);
            }
            s *= self.gain;
            *value = s;
            *peak = peak.max(s.abs());
        }
    }

    /// Zero the peak accumulators.
    pub fn reset_peaks(&mut self) {
        self.peaks.fill(0.0);
    }

    /// Forward a sample-rate change to the limiter.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.limiter.set_sample_rate(sample_rate);
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }
}

/// Operations common to input and output channels.
///
/// Implementors only expose their [`ChannelStrip`]; every operation has a
/// default that forwards to it.
pub trait Channel {
    /// Shared strip state.
    fn strip(&self) -> &ChannelStrip;

    /// Mutable shared strip state.
    fn strip_mut(&mut self) -> &mut ChannelStrip;

    /// See [`ChannelStrip::add`].
    fn add(&mut self, endpoint: usize) {
        self.strip_mut().add(endpoint);
    }

    /// See [`ChannelStrip::remove`].
    fn remove(&mut self, endpoint: usize) -> usize {
        self.strip_mut().remove(endpoint)
    }

    /// See [`ChannelStrip::set_setting`].
    fn set_setting(&mut self, name: &str, value: f32) -> bool {
        self.strip_mut().set_setting(name, value)
    }

    /// See [`ChannelStrip::settings`].
    fn settings(&self) -> String {
        self.strip().settings()
    }

    /// See [`ChannelStrip::add_midi_link`].
    fn add_midi_link(&mut self, param: &str, cc: u8) -> bool {
        self.strip_mut().add_midi_link(param, cc)
    }

    /// See [`ChannelStrip::handle_midi`].
    fn handle_midi(&mut self, cc: u8, value: u8, taper: &FaderTaper) -> bool {
        self.strip_mut().handle_midi(cc, value, taper)
    }

    /// See [`ChannelStrip::process`].
    fn process(&mut self) {
        self.strip_mut().process();
    }

    /// See [`ChannelStrip::peaks`].
    fn peaks(&self) -> &[f32] {
        self.strip().peaks()
    }

    /// See [`ChannelStrip::reset_peaks`].
    fn reset_peaks(&mut self) {
        self.strip_mut().reset_peaks();
    }
}

/// A channel fed from the hardware input frame.
#[derive(Debug, Clone, Default)]
pub struct InputChannel {
    strip: ChannelStrip,
    output_levels: Vec<f32>,
    idle: bool,
}

impl InputChannel {
    /// New input with `outputs` send levels, all zero.
    pub fn new(sample_rate: f32, outputs: usize) -> Self {
        Self {
            strip: ChannelStrip::new(sample_rate),
            output_levels: vec![0.0; outputs],
            idle: true,
        }
    }

    /// Send level per output channel.
    pub fn output_levels(&self) -> &[f32] {
        &self.output_levels
    }

    /// Send level to output `output`, or `None` if out of range.
    pub fn level(&self, output: usize) -> Option<f32> {
        self.output_levels.get(output).copied()
    }

    /// Set the send level to output `output`.
    ///
    /// Returns `false` and leaves the level unchanged if `output` is out of
    /// range or `level` is not finite.
    pub fn set_level(&mut self, output: usize, level: f32) -> bool {
        if !level.is_finite() {
            return false;
        }
        match self.output_levels.get_mut(output) {
            Some(slot) => {
                *slot = level;
                true
            }
            None => false,
        }
    }

    /// Set every send level to zero.
    pub fn clear_levels(&mut self) {
        self.output_levels.fill(0.0);
    }

    /// Whether the last generated frame was exactly silent.
    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Read this channel's endpoints from `frame` and process them.
    ///
    /// Endpoints past the end of the frame read as silence. The channel is
    /// idle when every processed sample is exactly zero, so a limiter tail
    /// still counts as signal.
    #[inline]
    pub fn generate(&mut self, frame: &[f32]) {
        let ChannelStrip {
            endpoints, values, ..
        } = &mut self.strip;
        for (value, &endpoint) in values.iter_mut().zip(endpoints.iter()) {
            *value = frame.get(endpoint).copied().unwrap_or(0.0);
        }
        self.strip.process();
        self.idle = self.strip.values.iter().all(|&v| v == 0.0);
    }

    pub(crate) fn resize_levels(&mut self, outputs: usize) {
        self.output_levels.resize(outputs, 0.0);
    }

    pub(crate) fn remove_level(&mut self, output: usize) {
        if output < self.output_levels.len() {
            self.output_levels.remove(output);
        }
    }
}

impl Channel for InputChannel {
    fn strip(&self) -> &ChannelStrip {
        &self.strip
    }

    fn strip_mut(&mut self) -> &mut ChannelStrip {
        &mut self.strip
    }
}

/// A channel that sums sends and writes to the hardware output frame.
#[derive(Debug, Clone, Default)]
pub struct OutputChannel {
    strip: ChannelStrip,
}

impl OutputChannel {
    /// New output at unity gain.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            strip: ChannelStrip::new(sample_rate),
        }
    }

    /// Accumulate `input` scaled by `level`.
    ///
    /// Sample `i` of the longer side pairs with `i % len` of the shorter, so
    /// a mono input fans out to every endpoint and a wide input folds down.
    /// Either side being empty is a no-op.
    #[inline]
    pub fn receive(&mut self, input: &[f32], level: f32) {
        let values = self.strip.values_mut();
        let (outs, ins) = (values.len(), input.len());
        if outs == 0 || ins == 0 {
            return;
        }
        for i in 0..outs.max(ins) {
            values[i % outs] += input[i % ins] * level;
        }
    }

    /// Zero the accumulator.
    #[inline]
    pub fn clear(&mut self) {
        self.strip.values_mut().fill(0.0);
    }

    /// Process the accumulator, add it into `frame`, then clear it.
    ///
    /// Endpoints past the end of the frame are not written.
    #[inline]
    pub fn generate(&mut self, frame: &mut [f32]) {
        self.strip.process();
        for (&endpoint, &value) in self.strip.endpoints.iter().zip(self.strip.values.iter()) {
            if let Some(slot) = frame.get_mut(endpoint) {
                *slot += value;
            }
        }
        self.clear();
    }
}

impl Channel for OutputChannel {
    fn strip(&self) -> &ChannelStrip {
        &self.strip
    }

    fn strip_mut(&mut self) -> &mut ChannelStrip {
        &mut self.strip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes_match(strip: &ChannelStrip) -> bool {
        let n = strip.endpoints().len();
        strip.values().len() == n && strip.peaks().len() == n && strip.limiter().lane_count() == n
    }

    #[test]
    fn test_add_remove_keeps_sizes() {
        let mut strip = ChannelStrip::default();
        strip.add(0);
        strip.add(3);
        strip.add(0);
        assert_eq!(strip.endpoints(), &[0, 3, 0]);
        assert!(sizes_match(&strip));

        assert_eq!(strip.remove(0), 2);
        assert_eq!(strip.endpoints(), &[3]);
        assert!(sizes_match(&strip));

        assert_eq!(strip.remove(9), 0);
        assert!(sizes_match(&strip));
    }

    #[test]
    fn test_settings_round_trip() {
        let mut a = ChannelStrip::default();
        a.set_gain(0.1);
        a.set_limiter_enabled(true);
        let text = a.settings();

        let mut b = ChannelStrip::default();
        assert!(b.apply_settings(&text).is_empty());
        assert_eq!(b.gain().to_bits(), a.gain().to_bits());
        assert!(b.limiter_enabled());
    }

    #[test]
    fn test_settings_format() {
        let mut strip = ChannelStrip::default();
        strip.set_gain(0.5);
        assert_eq!(strip.settings(), "gain=0.5,limiter=0");
    }

    #[test]
    fn test_apply_settings_reports_rejects() {
        let mut strip = ChannelStrip::default();
        let rejected = strip.apply_settings("gain=0.25, pan=0.5,limiter=x,,limiter=1");
        assert_eq!(rejected, vec!["pan=0.5", "limiter=x"]);
        assert_eq!(strip.gain(), 0.25);
        assert!(strip.limiter_enabled());
    }

    #[test]
    fn test_unknown_setting() {
        let mut strip = ChannelStrip::default();
        assert!(!strip.set_setting("pan", 1.0));
        assert_eq!(strip.gain(), 1.0);
    }

    #[test]
    fn test_midi_gain_curve() {
        let taper = FaderTaper::new(12.0);
        let mut strip = ChannelStrip::default();
        assert!(strip.add_midi_link("gain", 7));
        for v in [0u8, 1, 64, 100, 127] {
            assert!(strip.handle_midi(7, v, &taper));
            let expected = (taper.max_linear() * f32::from(v) / 127.0).powi(4);
            assert!((strip.gain() - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unbound_midi_is_noop() {
        let taper = FaderTaper::default();
        let mut strip = ChannelStrip::default();
        strip.add_midi_link("gain", 7);
        assert!(!strip.handle_midi(8, 0, &taper));
        assert_eq!(strip.gain(), 1.0);
    }

    #[test]
    fn test_unknown_midi_param_ignored() {
        let mut strip = ChannelStrip::default();
        assert!(!strip.add_midi_link("pan", 10));
        assert_eq!(strip.midi_links().count(), 0);
        strip.add_midi_link("gain", 10);
        assert!(strip.remove_midi_link(10));
        assert!(!strip.remove_midi_link(10));
    }

    #[test]
    fn test_process_gain_and_peaks() {
        let mut input = InputChannel::new(48000.0, 0);
        input.add(0);
        input.strip_mut().set_gain(2.0);

        input.generate(&[0.25]);
        assert_eq!(input.strip().values(), &[0.5]);
        assert_eq!(input.peaks(), &[0.5]);

        input.generate(&[-0.1]);
        assert_eq!(input.peaks(), &[0.5]);

        input.generate(&[-0.4]);
        assert_eq!(input.peaks(), &[0.8]);

        input.reset_peaks();
        assert_eq!(input.peaks(), &[0.0]);
    }

    #[test]
    fn test_input_idle() {
        let mut input = InputChannel::new(48000.0, 1);
        input.add(0);
        input.add(1);
        input.generate(&[0.0, 0.0]);
        assert!(input.is_idle());
        input.generate(&[0.0, 0.1]);
        assert!(!input.is_idle());
    }

    #[test]
    fn test_input_missing_endpoint_reads_silence() {
        let mut input = InputChannel::new(48000.0, 1);
        input.add(5);
        input.generate(&[1.0, 1.0]);
        assert_eq!(input.strip().values(), &[0.0]);
        assert!(input.is_idle());
    }

    #[test]
    fn test_levels() {
        let mut input = InputChannel::new(48000.0, 2);
        assert!(input.set_level(1, 0.7));
        assert!(!input.set_level(2, 0.7));
        assert_eq!(input.level(1), Some(0.7));
        assert_eq!(input.level(2), None);
        input.clear_levels();
        assert_eq!(input.output_levels(), &[0.0, 0.0]);
    }

    #[test]
    fn test_receive_fans_out_mono() {
        let mut out = OutputChannel::new(48000.0);
        out.add(0);
        out.add(1);
        out.receive(&[0.5], 0.5);
        assert_eq!(out.strip().values(), &[0.25, 0.25]);
    }

    #[test]
    fn test_receive_folds_wide_input() {
        let mut out = OutputChannel::new(48000.0);
        out.add(0);
        out.receive(&[0.1, 0.2, 0.3], 1.0);
        assert!((out.strip().values()[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_receive_empty_is_noop() {
        let mut out = OutputChannel::new(48000.0);
        out.receive(&[1.0], 1.0);
        out.add(0);
        out.receive(&[], 1.0);
        assert_eq!(out.strip().values(), &[0.0]);
    }

    #[test]
    fn test_output_generate_sums_and_clears() {
        let mut out = OutputChannel::new(48000.0);
        out.add(1);
        out.add(7);
        out.receive(&[0.3, 0.4], 1.0);

        let mut frame = [0.1, 0.1];
        out.generate(&mut frame);
        assert!((frame[0] - 0.1).abs() < 1e-6);
        assert!((frame[1] - 0.4).abs() < 1e-6);
        assert_eq!(out.strip().values(), &[0.0, 0.0]);
        assert_eq!(out.peaks(), &[0.3, 0.4]);
    }

    #[test]
    fn test_limiter_path() {
        let mut input = InputChannel::new(48000.0, 0);
        input.add(0);
        input.set_setting("limiter", 1.0);
        for _ in 0..1000 {
            input.generate(&[10.0]);
            assert!(input.strip().values()[0].abs() <= 1.0);
        }
        // Signal arrives after the lookahead
        assert!(!input.is_idle());
    }

    #[test]
    fn test_non_finite_settings_rejected() {
        let mut strip = ChannelStrip::default();
        strip.set_gain(0.5);

        let rejected = strip.apply_settings("gain=inf,gain=NaN,limiter=NaN,gain=-inf");
        assert_eq!(rejected, vec!["gain=inf", "gain=NaN", "limiter=NaN", "gain=-inf"]);
        assert_eq!(strip.gain(), 0.5);
        assert!(!strip.limiter_enabled());

        assert!(!strip.set_gain(f32::INFINITY));
        assert!(strip.set_gain(-2.0));
        assert_eq!(strip.gain(), 0.0);
    }

    #[test]
    fn test_non_finite_gain_keeps_silence_idle() {
        let mut input = InputChannel::new(48000.0, 1);
        input.add(0);
        input.strip_mut().apply_settings("gain=inf");
        input.generate(&[0.0]);
        assert!(input.is_idle());
        assert_eq!(input.strip().values(), &[0.0]);
    }

    #[test]
    fn test_non_finite_level_rejected() {
        let mut input = InputChannel::new(48000.0, 1);
        assert!(input.set_level(0, 0.5));
        assert!(!input.set_level(0, f32::NAN));
        assert!(!input.set_level(0, f32::INFINITY));
        assert_eq!(input.level(0), Some(0.5));
    }
}
