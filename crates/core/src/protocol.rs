//! Internal protocol representation of an invocation.
//!
//! This is the decoded form exchanged between sidecars. An
//! [`InvokeRequest`](crate::InvokeRequest) with a fully read payload
//! converts into an [`InternalInvokeRequest`].

use std::collections::HashMap;

use bytes::Bytes;

/// Protocol version tag carried by every internal request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiVersion {
    #[default]
    V1,
}

/// HTTP verb and query string for invocations that originate from HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpExtension {
    pub verb: String,
    pub querystring: String,
}

impl HttpExtension {
    #[must_use]
    pub fn new(verb: impl Into<String>, querystring: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            querystring: querystring.into(),
        }
    }
}

/// An ordered list of metadata values for a single key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListStringValue {
    pub values: Vec<String>,
}

impl From<Vec<String>> for ListStringValue {
    fn from(values: Vec<String>) -> Self {
        Self { values }
    }
}

/// The method call carried by an internal request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeMessage {
    pub method: String,
    /// Raw payload; empty when the request carried no data.
    pub data: Bytes,
    pub content_type: String,
    pub http_extension: Option<HttpExtension>,
}

/// Decoded invocation as seen by the messaging layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalInvokeRequest {
    pub ver: ApiVersion,
    pub message: InvokeMessage,
    pub metadata: HashMap<String, ListStringValue>,
}

impl InternalInvokeRequest {
    /// Metadata with each value list unwrapped, suitable for use as headers.
    pub fn flattened_metadata(&self) -> HashMap<String, Vec<String>> {
        self.metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.values.clone()))
            .collect()
    }
}
