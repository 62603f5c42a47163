//! Error types for the proxima core library.
//!
//! Defines the error enum exposed by the public API together with a stable
//! machine-readable code per variant.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// Stable codes describing [`SmallWorldError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum SmallWorldErrorCode {
    /// A parameter was unrecognised or malformed.
    BadParam,
    /// An operation required a seeded graph but none existed.
    NotInitialized,
    /// The graph referenced an internal id outside the legal range, or the
    /// node table ended up inconsistent with the dataset.
    GraphCorruption,
    /// The data passed at load time does not match the saved index.
    DataMutation,
    /// The saved index file was malformed.
    Format,
    /// The requested operation is not supported by this index.
    Unsupported,
    /// An underlying file operation failed.
    Io,
}

impl SmallWorldErrorCode {
    /// Return the stable machine-readable representation of this error code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadParam => "PROXIMA_BAD_PARAM",
            Self::NotInitialized => "PROXIMA_NOT_INITIALIZED",
            Self::GraphCorruption => "PROXIMA_GRAPH_CORRUPTION",
            Self::DataMutation => "PROXIMA_DATA_MUTATION",
            Self::Format => "PROXIMA_FORMAT",
            Self::Unsupported => "PROXIMA_UNSUPPORTED",
            Self::Io => "PROXIMA_IO",
        }
    }
}

impl fmt::Display for SmallWorldErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type produced by [`SmallWorld`](crate::SmallWorld) operations.
///
/// No variant is retried internally and none implies partial recovery; a
/// failed build or load leaves the index unusable.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SmallWorldError {
    /// A parameter was unrecognised or malformed.
    #[error("invalid parameter: {reason}")]
    BadParam { reason: String },
    /// Insertion or search was attempted before the first node was seeded.
    #[error("the graph has no entry point; the first node must be seeded before other operations")]
    NotInitialized,
    /// An internal id outside `[0, N)` was observed, or the node table did
    /// not match the dataset after a build.
    #[error("graph corruption: {message}")]
    GraphCorruption { message: String },
    /// The dataset supplied at load time disagrees with the saved index.
    #[error("stored data does not match the loaded index: {message}")]
    DataMutation { message: String },
    /// The saved index file violated the expected text format.
    #[error("malformed index file at line {line}: {message}")]
    Format { line: usize, message: String },
    /// The requested operation is not supported.
    #[error("{operation} is not supported")]
    Unsupported { operation: &'static str },
    /// A file operation failed; index state is unchanged.
    #[error("i/o failure on `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SmallWorldError {
    /// Retrieve the stable [`SmallWorldErrorCode`] for this error.
    pub const fn code(&self) -> SmallWorldErrorCode {
        match self {
            Self::BadParam { .. } => SmallWorldErrorCode::BadParam,
            Self::NotInitialized => SmallWorldErrorCode::NotInitialized,
            Self::GraphCorruption { .. } => SmallWorldErrorCode::GraphCorruption,
            Self::DataMutation { .. } => SmallWorldErrorCode::DataMutation,
            Self::Format { .. } => SmallWorldErrorCode::Format,
            Self::Unsupported { .. } => SmallWorldErrorCode::Unsupported,
            Self::Io { .. } => SmallWorldErrorCode::Io,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, SmallWorldError>;
