//! The three configuration files of one directory, loaded together.

use std::path::{Path, PathBuf};

use patchbay_core::Topology;

use crate::error::ConfigError;
use crate::file;
use crate::layout::ChannelLayout;
use crate::paths;
use crate::report::LoadReport;
use crate::routing::RoutingTable;
use crate::settings::Settings;

/// Settings, layout and routing from one configuration directory.
///
/// A missing file reads as its default: default settings, no channels, no
/// routes. A file that exists but cannot be parsed is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    dir: PathBuf,
    /// Contents of `settings.toml`.
    pub settings: Settings,
    /// Contents of `channels.toml`.
    pub layout: ChannelLayout,
    /// Contents of `routing.toml`.
    pub routing: RoutingTable,
}

impl Session {
    /// Load every file in `dir`.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let dir = dir.into();
        let settings = load_or_default(&paths::settings_path(&dir))?;
        let layout = load_or_default(&paths::channels_path(&dir))?;
        let routing = load_or_default(&paths::routing_path(&dir))?;
        Ok(Self {
            dir,
            settings,
            layout,
            routing,
        })
    }

    /// Re-read every file. On error the session is left unchanged.
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        *self = Self::load(self.dir.clone())?;
        Ok(())
    }

    /// Directory the files are read from and written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rebuild `topology` from the layout, then apply routing.
    ///
    /// See [`ChannelLayout::apply`] for `lookup`.
    pub fn apply(
        &self,
        topology: &mut Topology,
        lookup: impl Fn(&str, bool) -> Option<usize>,
    ) -> LoadReport {
        let mut report = self.layout.apply(topology, lookup);
        report.merge(self.routing.apply(&self.layout, topology));
        tracing::info!(
            inputs = topology.inputs().len(),
            outputs = topology.outputs().len(),
            routes = self.routing.routes.len(),
            skipped = report.issues().len(),
            "configuration applied"
        );
        report
    }

    /// Replace the routing table with the current state of `topology`.
    pub fn capture_routing(&mut self, topology: &Topology) {
        self.routing = RoutingTable::capture(&self.layout, topology);
    }

    /// Write `routing.toml`.
    pub fn save_routing(&self) -> Result<(), ConfigError> {
        let path = paths::routing_path(&self.dir);
        self.routing.save(&path)?;
        tracing::info!(path = %path.display(), "routing saved");
        Ok(())
    }

    /// Write all three files.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.settings.save(paths::settings_path(&self.dir))?;
        self.layout.save(paths::channels_path(&self.dir))?;
        self.save_routing()
    }
}

fn load_or_default<T>(path: &Path) -> Result<T, ConfigError>
where
    T: Default + serde::de::DeserializeOwned,
{
    match file::load_optional(path)? {
        Some(value) => {
            tracing::debug!(path = %path.display(), "loaded");
            Ok(value)
        }
        None => {
            tracing::info!(path = %path.display(), "not found, using defaults");
            Ok(T::default())
        }
    }
}
