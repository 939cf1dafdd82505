//! Error types for the public interface of the crate.
//!
//! Internally we use `anyhow` and attach context as errors travel up. At the boundaries (the
//! command handlers and the binary) errors are tagged with an `ErrorType` so that callers can tell
//! a bad configuration from a failing spreadsheet service.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The internal result type.
pub(crate) type Res<T> = std::result::Result<T, anyhow::Error>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The broad category of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// A required configuration value is missing or malformed.
    Config,
    /// User input was rejected.
    Validation,
    /// The spreadsheet service (or authenticating against it) failed.
    Store,
    /// The chat platform failed.
    Platform,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// The public error type: an `ErrorType` plus the full chain of context messages.
pub struct Error {
    error_type: ErrorType,
    source: anyhow::Error,
}

impl Error {
    pub(crate) fn new(error_type: ErrorType, source: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            source: source.into(),
        }
    }

    /// The category of this error.
    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.source)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:#}", self.error_type, self.source)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Converts an internal result into a public one by tagging the error with an `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_display_includes_type_and_context() {
        let result: Res<()> = Err(anyhow::anyhow!("connection reset")).context("Failed to append");
        let err = result.pub_result(ErrorType::Store).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Store);
        assert_eq!(err.to_string(), "store error: Failed to append: connection reset");
    }

    #[test]
    fn test_error_type_round_trips_through_strings() {
        assert_eq!(ErrorType::Config.to_string(), "config");
        assert_eq!("platform".parse::<ErrorType>().unwrap(), ErrorType::Platform);
    }
}
