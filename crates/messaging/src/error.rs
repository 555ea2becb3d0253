use std::time::Duration;

use tandem_core::EnvelopeError;
use thiserror::Error;

/// Errors returned by direct messaging operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingError {
    /// The request could not be decoded into its internal representation.
    #[error("malformed invoke request: {0}")]
    MalformedRequest(#[from] EnvelopeError),

    /// A failure policy forced the invocation to fail.
    #[error("{0}")]
    InjectedFailure(String),

    /// A failure policy simulated the target not answering in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Broad category of a [`MessagingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedRequest,
    InjectedFailure,
}

impl MessagingError {
    /// Create an injected failure carrying `message`.
    pub fn injected(message: impl Into<String>) -> Self {
        Self::InjectedFailure(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedRequest(_) => ErrorKind::MalformedRequest,
            Self::InjectedFailure(_) | Self::Timeout(_) => ErrorKind::InjectedFailure,
        }
    }

    /// Returns `true` if the error is transient and the invocation may
    /// succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
