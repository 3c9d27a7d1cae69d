//! Errors returned by topology mutation.

/// Which side of the routing matrix a channel lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Reads from the hardware input frame.
    Input,
    /// Writes to the hardware output frame.
    Output,
}

impl ChannelKind {
    /// Lowercase name, as used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl core::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while editing the topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A channel index was past the end of its list.
    ChannelIndex {
        /// Input or output list.
        kind: ChannelKind,
        /// The offending index.
        index: usize,
        /// Length of the list at the time of the call.
        len: usize,
    },
    /// A send level was NaN or infinite.
    NonFiniteLevel {
        /// Input channel index.
        input: usize,
        /// Output channel index.
        output: usize,
    },
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ChannelIndex { kind, index, len } => {
                write!(f, "{kind} channel {index} out of range (have {len})")
            }
            Self::NonFiniteLevel { input, output } => {
                write!(f, "send level from input {input} to output {output} is not finite")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Convenience result type for topology operations.
pub type Result<T> = core::result::Result<T, Error>;
