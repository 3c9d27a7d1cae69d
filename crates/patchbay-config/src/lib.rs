//! Configuration files for the patchbay mixer.
//!
//! A configuration directory holds three TOML files:
//!
//! - [`Settings`] (`settings.toml`): audio device, MIDI ports, stream format,
//!   fader headroom and MIDI-triggered commands
//! - [`ChannelLayout`] (`channels.toml`): the channels to create, their
//!   device endpoints and MIDI links
//! - [`RoutingTable`] (`routing.toml`): channel settings and send levels
//!
//! [`Session`] loads all three and applies them to a
//! [`Topology`](patchbay_core::Topology). Entries that cannot be applied
//! (an endpoint the device lacks, a misspelled channel) are skipped and
//! collected in a [`LoadReport`] rather than failing the load.
//!
//! # Example
//!
//! ```rust
//! use patchbay_config::{ChannelLayout, RoutingTable};
//! use patchbay_core::Topology;
//!
//! let layout = ChannelLayout::from_toml(r#"
//!     [[channels]]
//!     kind = "input"
//!     name = "Mic"
//!     endpoints = ["Input 1"]
//!
//!     [[channels]]
//!     kind = "output"
//!     name = "Mains"
//!     endpoints = ["Output 1"]
//! "#)?;
//! let routing = RoutingTable::from_toml(r#"
//!     [[routes]]
//!     channel = "Mic"
//!     kind = "input"
//!     outputs = ["Mains=0.5"]
//! "#)?;
//!
//! let mut topology = Topology::default();
//! layout.apply(&mut topology, |_, _| Some(0)).log();
//! routing.apply(&layout, &mut topology).log();
//! assert_eq!(topology.level(0, 0)?, 0.5);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
mod file;
pub mod layout;
pub mod paths;
pub mod report;
pub mod routing;
pub mod session;
pub mod settings;

pub use error::ConfigError;
pub use layout::{ChannelLayout, ChannelSpec, Kind};
pub use paths::user_config_dir;
pub use report::{Issue, LoadReport};
pub use routing::{Route, RoutingTable};
pub use session::Session;
pub use settings::{Button, Settings};
