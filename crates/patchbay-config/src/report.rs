//! Problems found while applying configuration to a topology.

use std::fmt;

use patchbay_core::ChannelKind;

/// One configuration entry that was skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    /// An endpoint name the open device does not have.
    UnknownEndpoint {
        /// Channel the endpoint was listed under.
        channel: String,
        /// The endpoint name as written.
        endpoint: String,
    },
    /// A MIDI link to a parameter that does not exist.
    UnknownMidiParam {
        /// Channel the link was listed under.
        channel: String,
        /// The parameter name as written.
        param: String,
    },
    /// A second channel with a name already used by the same kind.
    DuplicateChannel {
        /// Channel kind.
        kind: ChannelKind,
        /// The repeated name.
        name: String,
    },
    /// A route for a channel the layout does not define.
    UnknownChannel {
        /// Channel kind.
        kind: ChannelKind,
        /// The channel name as written.
        name: String,
    },
    /// A `name=value` setting the channel rejected.
    BadSetting {
        /// Channel the setting was listed under.
        channel: String,
        /// The entry as written.
        entry: String,
    },
    /// A send to an output channel the layout does not define.
    UnknownOutput {
        /// Input channel the send was listed under.
        channel: String,
        /// The output name as written.
        output: String,
    },
    /// A send whose `=level` part is not a number.
    BadLevel {
        /// Input channel the send was listed under.
        channel: String,
        /// The entry as written.
        entry: String,
    },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::UnknownEndpoint { channel, endpoint } => {
                write!(f, "channel '{channel}': endpoint '{endpoint}' not found")
            }
            Issue::UnknownMidiParam { channel, param } => {
                write!(f, "channel '{channel}': unknown MIDI parameter '{param}'")
            }
            Issue::DuplicateChannel { kind, name } => {
                write!(f, "{kind} channel '{name}' defined more than once")
            }
            Issue::UnknownChannel { kind, name } => {
                write!(f, "route for unknown {kind} channel '{name}'")
            }
            Issue::BadSetting { channel, entry } => {
                write!(f, "channel '{channel}': bad setting '{entry}'")
            }
            Issue::UnknownOutput { channel, output } => {
                write!(f, "channel '{channel}': unknown output '{output}'")
            }
            Issue::BadLevel { channel, entry } => {
                write!(f, "channel '{channel}': bad send level '{entry}'")
            }
        }
    }
}

/// Entries skipped while applying a layout or routing table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    issues: Vec<Issue>,
}

impl LoadReport {
    /// Empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a skipped entry.
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Append another report's issues.
    pub fn merge(&mut self, other: LoadReport) {
        self.issues.extend(other.issues);
    }

    /// Skipped entries in the order they were found.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// `true` if nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Emit one warning per skipped entry.
    pub fn log(&self) {
        for issue in &self.issues {
            tracing::warn!("skipped: {issue}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display() {
        let issue = Issue::UnknownEndpoint {
            channel: "Mic".into(),
            endpoint: "Input 9".into(),
        };
        assert_eq!(issue.to_string(), "channel 'Mic': endpoint 'Input 9' not found");

        let issue = Issue::UnknownChannel {
            kind: ChannelKind::Output,
            name: "Phones".into(),
        };
        assert_eq!(issue.to_string(), "route for unknown output channel 'Phones'");
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut a = LoadReport::new();
        assert!(a.is_clean());
        a.push(Issue::BadSetting {
            channel: "A".into(),
            entry: "x".into(),
        });
        let mut b = LoadReport::new();
        b.push(Issue::BadLevel {
            channel: "B".into(),
            entry: "y".into(),
        });
        a.merge(b);
        assert_eq!(a.issues().len(), 2);
        assert!(matches!(a.issues()[1], Issue::BadLevel { .. }));
    }
}
