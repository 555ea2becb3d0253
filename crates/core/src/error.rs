use thiserror::Error;

/// Errors raised while turning an envelope into its internal representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The payload stream returned an error before it was fully read.
    #[error("failed to read request data: {0}")]
    DataStream(String),
}
