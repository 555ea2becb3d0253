use std::collections::HashMap;

use bytes::Bytes;
use hyper::StatusCode;

/// Status line of an invocation response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeStatus {
    /// HTTP-style status code. Zero means no status was set.
    pub code: i32,
    /// Human-readable status text.
    pub message: String,
}

/// Response to a service invocation.
///
/// The [`Default`] value is the empty response: no status, headers or data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeResponse {
    pub status: InvokeStatus,
    pub headers: HashMap<String, Vec<String>>,
    pub content_type: String,
    pub data: Bytes,
}

impl InvokeResponse {
    /// Create a response with the given status and no payload.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            status: InvokeStatus {
                code,
                message: message.into(),
            },
            ..Self::default()
        }
    }

    /// Create a response whose status text is derived from `code`.
    #[must_use]
    pub fn with_status_code(code: i32) -> Self {
        Self::new(code, status_text(code))
    }

    #[must_use]
    pub fn with_raw_data_bytes(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    #[must_use]
    pub fn with_http_headers(mut self, headers: HashMap<String, Vec<String>>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Returns `true` for 2xx status codes.
    pub fn is_http_success(&self) -> bool {
        (200..300).contains(&self.status.code)
    }

    /// Returns `true` if nothing was set on this response.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Canonical reason phrase for an HTTP status code.
///
/// Returns an empty string for codes that are out of range or have no
/// registered phrase.
pub fn status_text(code: i32) -> &'static str {
    u16::try_from(code)
        .ok()
        .and_then(|c| StatusCode::from_u16(c).ok())
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}
