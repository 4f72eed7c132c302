//! Error types for log ingestion and report generation
//!
//! Every variant is fatal: the pipeline never skips a malformed recognized
//! line and never retries a failed write.

use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

pub type PhaseTimesResult<T> = Result<T, PhaseTimesError>;

/// Errors raised while parsing a build log or writing reports
#[derive(Error, Debug)]
pub enum PhaseTimesError {
    /// A recognized line shape is missing an expected marker or field
    #[error("line {line}: {message}")]
    InputGrammar { line: usize, message: String },

    #[error("line {line}: phase time {value:?} is not an integer: {source}")]
    NumericFormat {
        line: usize,
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// A root path lacks the separator needed to derive a name or strip a segment
    #[error("line {line}: {message}")]
    PathStructure { line: usize, message: String },

    /// A compilation, bin or report total no longer fits in `u64`
    #[error("{context}: {source}")]
    TimeOverflow {
        context: String,
        #[source]
        source: crate::aggregate::TimeOverflow,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read input at line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PhaseTimesError {
    pub(crate) fn grammar(line: usize, message: impl Into<String>) -> Self {
        Self::InputGrammar {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn path_structure(line: usize, message: impl Into<String>) -> Self {
        Self::PathStructure {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        Self::TimeOverflow {
            context: context.into(),
            source: crate::aggregate::TimeOverflow,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
