use std::{error::Error as StdError, fmt, panic::Location};

use thiserror::Error;

/// Category of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raw input file missing, unreadable, or empty.
    DataLoad,
    /// Input columns do not match the expected schema.
    Schema,
    /// Values violate a data-quality precondition.
    DataQuality,
    /// A partition or model artefact is absent at read time.
    MissingArtefact,
    /// Writing or reading an artefact failed.
    Persistence,
    /// Fitting or evaluating the classifier failed.
    Training,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::DataLoad => "data load error",
            Self::Schema => "schema error",
            Self::DataQuality => "data quality error",
            Self::MissingArtefact => "missing artefact error",
            Self::Persistence => "persistence error",
            Self::Training => "training error",
        };
        f.write_str(text)
    }
}

type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// Uniform error carried through every pipeline stage.
///
/// Each error records its kind, a human-readable message, the source
/// location where it was raised, and the underlying cause when one exists.
/// The cause chain stays reachable through [`StdError::source`].
#[derive(Debug, Error)]
#[error("{kind}: {message} (at {origin})")]
pub struct PipelineError {
    kind: ErrorKind,
    message: String,
    origin: String,
    #[source]
    cause: Option<BoxedCause>,
}

impl PipelineError {
    /// Creates an error with no underlying cause, recording the caller as origin.
    #[track_caller]
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let location = Location::caller();
        Self {
            kind,
            message: message.into(),
            origin: format!("{}:{}", location.file(), location.line()),
            cause: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    #[track_caller]
    #[must_use]
    pub fn with_cause(
        kind: ErrorKind,
        message: impl Into<String>,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        let location = Location::caller();
        Self {
            kind,
            message: message.into(),
            origin: format!("{}:{}", location.file(), location.line()),
            cause: Some(Box::new(cause)),
        }
    }

    /// Category of the failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// `file:line` where the error was raised.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// Convenience alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_carries_kind_message_and_origin() {
        let err = PipelineError::new(ErrorKind::Schema, "missing column PetalWidthCm");
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.origin().contains("error.rs"));
        let text = err.to_string();
        assert!(text.contains("schema error"));
        assert!(text.contains("missing column PetalWidthCm"));
    }

    #[test]
    fn cause_chain_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = PipelineError::with_cause(ErrorKind::DataLoad, "failed to read data", io);
        let cause = err.source().expect("cause should be preserved");
        assert!(cause.to_string().contains("no such file"));
    }
}
