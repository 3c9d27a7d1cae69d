//! Channel layout: which channels exist and which endpoints they carry.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use patchbay_core::{Channel, ChannelKind, ChannelStrip, Topology};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::file;
use crate::report::{Issue, LoadReport};

/// Channel kind as written in configuration files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// `"input"`
    Input,
    /// `"output"`
    Output,
}

impl From<Kind> for ChannelKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Input => ChannelKind::Input,
            Kind::Output => ChannelKind::Output,
        }
    }
}

impl From<ChannelKind> for Kind {
    fn from(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::Input => Kind::Input,
            ChannelKind::Output => Kind::Output,
        }
    }
}

/// One channel in `channels.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelSpec {
    /// Input or output.
    pub kind: Kind,

    /// Name used by routes and in listings.
    pub name: String,

    /// Device endpoint names, in working-sample order.
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Parameter name to controller number.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub midi: BTreeMap<String, u8>,
}

impl ChannelSpec {
    /// New channel with no endpoints or MIDI links.
    pub fn new(kind: Kind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            endpoints: Vec::new(),
            midi: BTreeMap::new(),
        }
    }

    /// Add an endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    /// Bind a parameter to a controller.
    pub fn with_midi(mut self, param: impl Into<String>, cc: u8) -> Self {
        self.midi.insert(param.into(), cc);
        self
    }
}

/// Contents of `channels.toml`.
///
/// ```toml
/// [[channels]]
/// kind = "input"
/// name = "Mic"
/// endpoints = ["Input 1"]
/// [channels.midi]
/// gain = 7
///
/// [[channels]]
/// kind = "output"
/// name = "Mains"
/// endpoints = ["Output 1", "Output 2"]
/// ```
///
/// Inputs and outputs are numbered separately, in file order; that number is
/// the channel's index in the [`Topology`] after [`apply`](Self::apply).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChannelLayout {
    /// Channels in file order.
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,
}

impl ChannelLayout {
    /// Load a layout from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        file::load(path.as_ref())
    }

    /// Load a layout from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the layout to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        file::save(self, path.as_ref())
    }

    /// Convert to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Add a channel.
    pub fn with_channel(mut self, channel: ChannelSpec) -> Self {
        self.channels.push(channel);
        self
    }

    /// Channels of one kind, in topology order.
    pub fn of_kind(&self, kind: ChannelKind) -> impl Iterator<Item = &ChannelSpec> + '_ {
        let kind = Kind::from(kind);
        self.channels.iter().filter(move |c| c.kind == kind)
    }

    /// Topology index of the first `kind` channel called `name`.
    pub fn index_of(&self, kind: ChannelKind, name: &str) -> Option<usize> {
        self.of_kind(kind).position(|c| c.name == name)
    }

    /// Name of the `kind` channel at topology index `index`.
    pub fn name_of(&self, kind: ChannelKind, index: usize) -> Option<&str> {
        self.of_kind(kind).nth(index).map(|c| c.name.as_str())
    }

    /// Rebuild `topology` from this layout.
    ///
    /// Every existing channel is removed, then each channel is appended in
    /// file order. `lookup(name, is_input)` resolves endpoint names to device
    /// channel indices; names it cannot resolve are skipped and reported, as
    /// are MIDI links to unknown parameters. A repeated channel name is
    /// reported but the channel is still created so indices stay in file
    /// order.
    pub fn apply(
        &self,
        topology: &mut Topology,
        lookup: impl Fn(&str, bool) -> Option<usize>,
    ) -> LoadReport {
        let mut report = LoadReport::new();
        let mut seen = HashSet::new();
        topology.clear();

        for spec in &self.channels {
            let kind = ChannelKind::from(spec.kind);
            if !seen.insert((spec.kind, spec.name.as_str())) {
                report.push(Issue::DuplicateChannel {
                    kind,
                    name: spec.name.clone(),
                });
            }

            let is_input = kind == ChannelKind::Input;
            let strip = if is_input {
                let index = topology.add_input();
                topology.input_mut(index).map(|c| c.strip_mut())
            } else {
                let index = topology.add_output();
                topology.output_mut(index).map(|c| c.strip_mut())
            };
            let Ok(strip) = strip else {
                continue;
            };

            configure_strip(strip, spec, is_input, &lookup, &mut report);
            tracing::debug!(
                kind = %kind,
                channel = %spec.name,
                endpoints = strip.endpoints().len(),
                "channel added"
            );
        }

        report
    }
}

fn configure_strip(
    strip: &mut ChannelStrip,
    spec: &ChannelSpec,
    is_input: bool,
    lookup: &impl Fn(&str, bool) -> Option<usize>,
    report: &mut LoadReport,
) {
    for endpoint in &spec.endpoints {
        match lookup(endpoint, is_input) {
            Some(index) => strip.add(index),
            None => report.push(Issue::UnknownEndpoint {
                channel: spec.name.clone(),
                endpoint: endpoint.clone(),
            }),
        }
    }

    for (param, &cc) in &spec.midi {
        if !strip.add_midi_link(param, cc) {
            report.push(Issue::UnknownMidiParam {
                channel: spec.name.clone(),
                param: param.clone(),
            });
        }
    }
}
