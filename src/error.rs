//! Errors raised while loading a song chart.
//!
//! Fatal problems are [`ChartError`]s, which the load controller wraps into a [`LoadError`]
//! carrying the chart file name and the line being read. Recoverable anomalies are never
//! errors; see [`crate::parse::LoadWarning`].

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::LoadStatus;

/// The chart text itself is unusable.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum FormatError {
    /// No dialect signature matched the text.
    #[error("does not look like any supported song format (wrong header)")]
    Unrecognized,
    /// The file is too small or too large to be a chart.
    #[error("file size {size} bytes is outside of [{min}, {max}] (wrong size)")]
    WrongSize {
        /// Actual size in bytes.
        size: usize,
        /// Smallest accepted size.
        min: usize,
        /// Largest accepted size.
        max: usize,
    },
    /// The file contains control bytes that never appear in text.
    #[error("file looks like binary data")]
    Binary,
    /// A line or element could not be understood.
    #[error("{0}")]
    Malformed(String),
    /// A field value could not be decoded into the expected type.
    #[error("invalid value `{value}` for {field}")]
    InvalidValue {
        /// Name of the field or column.
        field: String,
        /// The raw text that failed to decode.
        value: String,
    },
}

impl FormatError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub(crate) fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Tempo data is inconsistent.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TimingError {
    /// A tempo outside of `[1, 1e12)`.
    #[error("invalid tempo value {0}")]
    InvalidTempo(f64),
    /// A tempo change was inserted before the last one.
    #[error("BPM data not sorted: {ts} comes before {last}")]
    TempoOrder {
        /// Timestamp of the rejected event.
        ts: f64,
        /// Timestamp of the last accepted event.
        last: f64,
    },
    /// A beat timestamp was resolved before any tempo was known.
    #[error("BPM data missing for timestamp {0}")]
    MissingTempo(f64),
    /// A beat timestamp lies before the first tempo event.
    #[error("timestamp {ts} precedes the first BPM event at {first}")]
    BeforeFirstTempo {
        /// The requested timestamp.
        ts: f64,
        /// Timestamp of the first event.
        first: f64,
    },
}

/// A load-status transition that the lifecycle does not allow.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum StatusError {
    /// The song has already failed to load.
    #[error("song is in error state")]
    Failed,
    /// The transition is not part of the lifecycle.
    #[error("cannot go from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current status.
        from: LoadStatus,
        /// Requested status.
        to: LoadStatus,
    },
}

/// Fatal error kinds of a chart load.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ChartError {
    /// The chart text is malformed.
    #[error("{0}")]
    Format(#[from] FormatError),
    /// A required header field is absent or empty.
    #[error("required header field {0} missing")]
    MissingField(&'static str),
    /// Tempo data is inconsistent.
    #[error("{0}")]
    Timing(#[from] TimingError),
    /// The load lifecycle was violated.
    #[error("{0}")]
    Status(#[from] StatusError),
    /// Reading a file failed.
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    /// A JSON sidecar did not match the expected layout.
    #[error("metadata {path}: {source}")]
    Metadata {
        /// The sidecar file.
        path: PathBuf,
        /// Where and why decoding failed.
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    /// The MIDI file could not be decoded.
    #[error("MIDI: {0}")]
    Midi(#[from] midly::Error),
    /// The XML document is not well-formed.
    #[error("XML: {0}")]
    Xml(#[from] roxmltree::Error),
    /// Anything that indicates a bug rather than bad input.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChartError {
    /// Returns a [`LoadError`] for `path`, optionally located at a line.
    pub fn at(self, path: impl AsRef<Path>, line: Option<usize>) -> LoadError {
        LoadError {
            path: path.as_ref().to_path_buf(),
            line,
            kind: self,
        }
    }
}

/// Error returned by the load controller.
#[derive(Debug, Error)]
pub struct LoadError {
    /// The chart file.
    pub path: PathBuf,
    /// The line being read when the error occurred, starts with 1.
    pub line: Option<usize>,
    /// What went wrong.
    #[source]
    pub kind: ChartError,
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.path.display(), line, self.kind),
            None => write!(f, "{}: {}", self.path.display(), self.kind),
        }
    }
}

/// Alias for results of the parsing internals.
pub type Result<T> = core::result::Result<T, ChartError>;
