//! Routing: channel settings and input-to-output send levels.

use std::path::Path;

use patchbay_core::{Channel, ChannelKind, Topology};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::file;
use crate::layout::{ChannelLayout, Kind};
use crate::report::{Issue, LoadReport};

/// One channel's entry in `routing.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    /// Channel name from the layout.
    pub channel: String,

    /// Input or output.
    pub kind: Kind,

    /// Comma-separated `name=value` channel settings.
    #[serde(default)]
    pub settings: String,

    /// Sends from an input, as `"Name"` (level 1.0) or `"Name=level"`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
}

/// Contents of `routing.toml`.
///
/// ```toml
/// [[routes]]
/// channel = "Mic"
/// kind = "input"
/// settings = "gain=1,limiter=1"
/// outputs = ["Mains", "Phones=0.5"]
///
/// [[routes]]
/// channel = "Mains"
/// kind = "output"
/// settings = "gain=0.8,limiter=0"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoutingTable {
    /// Routes in file order.
    #[serde(default)]
    pub routes: Vec<Route>,
}

/// Split a send entry into output name and level.
///
/// `None` if the level is not a finite number.
fn parse_send(entry: &str) -> Option<(&str, f32)> {
    match entry.split_once('=') {
        Some((name, level)) => {
            let level: f32 = level.trim().parse().ok()?;
            level.is_finite().then_some((name.trim(), level))
        }
        None => Some((entry.trim(), 1.0)),
    }
}

impl RoutingTable {
    /// Load a routing table from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        file::load(path.as_ref())
    }

    /// Load a routing table from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the routing table to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        file::save(self, path.as_ref())
    }

    /// Convert to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Record the current settings and sends of every channel in `topology`.
    ///
    /// Channels are named through `layout`; a channel with no layout name
    /// (the topology was edited after loading) is left out, as is any send
    /// to such an output. Zero sends are not written.
    pub fn capture(layout: &ChannelLayout, topology: &Topology) -> Self {
        let mut routes = Vec::new();

        for (index, input) in topology.inputs().iter().enumerate() {
            let Some(name) = layout.name_of(ChannelKind::Input, index) else {
                tracing::debug!(index, "unnamed input not captured");
                continue;
            };
            let outputs = input
                .output_levels()
                .iter()
                .enumerate()
                .filter(|&(_, &level)| level != 0.0)
                .filter_map(|(output, &level)| {
                    let target = layout.name_of(ChannelKind::Output, output)?;
                    Some(if level == 1.0 {
                        target.to_string()
                    } else {
                        format!("{target}={level}")
                    })
                })
                .collect();
            routes.push(Route {
                channel: name.to_string(),
                kind: Kind::Input,
                settings: input.settings(),
                outputs,
            });
        }

        for (index, output) in topology.outputs().iter().enumerate() {
            let Some(name) = layout.name_of(ChannelKind::Output, index) else {
                tracing::debug!(index, "unnamed output not captured");
                continue;
            };
            routes.push(Route {
                channel: name.to_string(),
                kind: Kind::Output,
                settings: output.settings(),
                outputs: Vec::new(),
            });
        }

        Self { routes }
    }

    /// Apply settings and sends to a topology built from `layout`.
    ///
    /// Every send level is zeroed first, so sends missing from the table end
    /// up silent. Unknown channels, rejected settings and bad sends are
    /// skipped and reported.
    pub fn apply(&self, layout: &ChannelLayout, topology: &mut Topology) -> LoadReport {
        let mut report = LoadReport::new();
        topology.clear_levels();

        for route in &self.routes {
            let kind = ChannelKind::from(route.kind);
            let index = layout.index_of(kind, &route.channel);
            let strip = match (kind, index) {
                (ChannelKind::Input, Some(i)) => topology.input_mut(i).ok().map(|c| c.strip_mut()),
                (ChannelKind::Output, Some(i)) => {
                    topology.output_mut(i).ok().map(|c| c.strip_mut())
                }
                _ => None,
            };
            let (Some(index), Some(strip)) = (index, strip) else {
                report.push(Issue::UnknownChannel {
                    kind,
                    name: route.channel.clone(),
                });
                continue;
            };

            for entry in strip.apply_settings(&route.settings) {
                report.push(Issue::BadSetting {
                    channel: route.channel.clone(),
                    entry: entry.to_string(),
                });
            }

            if kind == ChannelKind::Output {
                if !route.outputs.is_empty() {
                    tracing::debug!(channel = %route.channel, "sends on an output ignored");
                }
                continue;
            }

            for entry in &route.outputs {
                let Some((target, level)) = parse_send(entry) else {
                    report.push(Issue::BadLevel {
                        channel: route.channel.clone(),
                        entry: entry.clone(),
                    });
                    continue;
                };
                let applied = layout
                    .index_of(ChannelKind::Output, target)
                    .is_some_and(|output| topology.set_level(index, output, level).is_ok());
                if !applied {
                    report.push(Issue::UnknownOutput {
                        channel: route.channel.clone(),
                        output: target.to_string(),
                    });
                }
            }
        }

        report
    }
}
