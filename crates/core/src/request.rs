use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::sync::Mutex;

use crate::error::EnvelopeError;
use crate::protocol::{
    ApiVersion, HttpExtension, InternalInvokeRequest, InvokeMessage, ListStringValue,
};

/// Payload chunks supplied by the caller instead of a single buffer.
pub type DataStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

enum PayloadSource {
    Raw(Bytes),
    Stream(DataStream),
    Broken(EnvelopeError),
}

/// A service invocation addressed to another app.
///
/// Requests are assembled with the `with_*` builder methods and are not
/// modified afterwards. Clones share the payload source: once a streamed
/// payload has been read through one clone, every clone sees the buffered
/// bytes (or the same read error).
#[derive(Clone)]
pub struct InvokeRequest {
    ver: ApiVersion,
    method: String,
    content_type: String,
    metadata: HashMap<String, Vec<String>>,
    http_extension: Option<HttpExtension>,
    streamed: bool,
    payload: Arc<Mutex<PayloadSource>>,
}

impl fmt::Debug for InvokeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokeRequest")
            .field("method", &self.method)
            .field("content_type", &self.content_type)
            .field("metadata", &self.metadata)
            .field("http_extension", &self.http_extension)
            .field("streamed", &self.streamed)
            .finish_non_exhaustive()
    }
}

impl InvokeRequest {
    /// Create a request for `method` with no payload and no metadata.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            ver: ApiVersion::default(),
            method: method.into(),
            content_type: String::new(),
            metadata: HashMap::new(),
            http_extension: None,
            streamed: false,
            payload: Arc::new(Mutex::new(PayloadSource::Raw(Bytes::new()))),
        }
    }

    /// Use `data` as the payload.
    #[must_use]
    pub fn with_raw_data(mut self, data: impl Into<Bytes>) -> Self {
        self.streamed = false;
        self.payload = Arc::new(Mutex::new(PayloadSource::Raw(data.into())));
        self
    }

    /// Read the payload from `stream` the first time it is needed.
    #[must_use]
    pub fn with_data_stream<S>(mut self, stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
    {
        self.streamed = true;
        self.payload = Arc::new(Mutex::new(PayloadSource::Stream(stream.boxed())));
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Replace the metadata map.
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, Vec<String>>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Append one metadata value under `key`.
    #[must_use]
    pub fn with_metadata_value(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.metadata.entry(key.into()).or_default().push(value.into());
        self
    }

    #[must_use]
    pub fn with_http_extension(
        mut self,
        verb: impl Into<String>,
        querystring: impl Into<String>,
    ) -> Self {
        self.http_extension = Some(HttpExtension::new(verb, querystring));
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn metadata(&self) -> &HashMap<String, Vec<String>> {
        &self.metadata
    }

    pub fn http_extension(&self) -> Option<&HttpExtension> {
        self.http_extension.as_ref()
    }

    /// Whether the payload was supplied as a stream.
    pub fn has_data_stream(&self) -> bool {
        self.streamed
    }

    /// Build the internal protocol representation, reading the full payload.
    ///
    /// A streamed payload is drained on the first call and buffered. If the
    /// stream fails the request stays malformed and later calls return the
    /// same error.
    pub async fn proto_with_data(&self) -> Result<InternalInvokeRequest, EnvelopeError> {
        let data = self.read_data().await?;
        let metadata = self
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), ListStringValue::from(v.clone())))
            .collect();

        Ok(InternalInvokeRequest {
            ver: self.ver,
            message: InvokeMessage {
                method: self.method.clone(),
                data,
                content_type: self.content_type.clone(),
                http_extension: self.http_extension.clone(),
            },
            metadata,
        })
    }

    async fn read_data(&self) -> Result<Bytes, EnvelopeError> {
        let mut source = self.payload.lock().await;
        let read = match &mut *source {
            PayloadSource::Raw(data) => return Ok(data.clone()),
            PayloadSource::Broken(err) => return Err(err.clone()),
            PayloadSource::Stream(stream) => drain(stream).await,
        };

        *source = match &read {
            Ok(data) => PayloadSource::Raw(data.clone()),
            Err(err) => PayloadSource::Broken(err.clone()),
        };
        read
    }
}

async fn drain(stream: &mut DataStream) -> Result<Bytes, EnvelopeError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| EnvelopeError::DataStream(e.to_string()))?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}
