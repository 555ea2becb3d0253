//! Messaging double that echoes requests back unless a failure policy objects.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use tandem_core::{InvokeContext, InvokeRequest, InvokeResponse, status_text};
use tandem_messaging::{AppChannel, DirectMessaging, HttpEndpointAppChannel, MessagingError};
use tracing::{debug, warn};

use crate::config::FailingMessagingConfig;
use crate::failure::{FailurePolicy, KeyedFailure};

/// Status code used for successful invocations when none is configured.
pub const DEFAULT_SUCCESS_STATUS: i32 = 200;

/// A direct messaging double driven by a [`FailurePolicy`].
///
/// Each invocation decodes the request, keys the policy on the payload (see
/// [`policy_key`]) and either returns the policy's error unchanged or echoes
/// the payload, content type and metadata back as a successful response.
/// A request that cannot be decoded fails with
/// [`MessagingError::MalformedRequest`] before the policy is consulted.
pub struct FailingMessaging {
    failure: Arc<dyn FailurePolicy>,
    success_status_code: Option<i32>,
}

impl std::fmt::Debug for FailingMessaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailingMessaging")
            .field("success_status_code", &self.success_status_code)
            .finish_non_exhaustive()
    }
}

impl FailingMessaging {
    pub fn new(failure: Arc<dyn FailurePolicy>) -> Self {
        Self {
            failure,
            success_status_code: None,
        }
    }

    /// Wrap an owned policy.
    pub fn with_policy<P: FailurePolicy + 'static>(policy: P) -> Self {
        Self::new(Arc::new(policy))
    }

    /// Build a double over a [`KeyedFailure`] policy described by `config`.
    pub fn from_config(config: &FailingMessagingConfig) -> Self {
        Self {
            failure: Arc::new(KeyedFailure::from_config(&config.failure)),
            success_status_code: config.success_status_code,
        }
    }

    /// Report `code` instead of 200 for successful invocations. Zero means
    /// unset.
    #[must_use]
    pub fn with_success_status_code(mut self, code: i32) -> Self {
        self.success_status_code = Some(code);
        self
    }

    pub fn success_status_code(&self) -> i32 {
        self.success_status_code
            .filter(|code| *code != 0)
            .unwrap_or(DEFAULT_SUCCESS_STATUS)
    }
}

/// Failure policy key for a payload.
///
/// Valid UTF-8 is used as is. Anything else is ASCII-escaped byte by byte
/// (`[0xff, b'a']` becomes `\xffa`), so distinct binary payloads get distinct
/// keys.
pub fn policy_key(data: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(data.escape_ascii().to_string()),
    }
}

impl DirectMessaging for FailingMessaging {
    async fn invoke(
        &self,
        _ctx: &InvokeContext,
        target_app_id: &str,
        req: &InvokeRequest,
    ) -> Result<InvokeResponse, MessagingError> {
        let proto = req.proto_with_data().await.map_err(|err| {
            warn!(
                target_app_id,
                method = req.method(),
                error = %err,
                "malformed invoke request"
            );
            MessagingError::from(err)
        })?;

        let key = policy_key(&proto.message.data);
        if let Err(err) = self.failure.perform_failure(&key).await {
            debug!(
                target_app_id,
                key = %key,
                error = %err,
                "failure policy rejected invocation"
            );
            return Err(err);
        }

        let code = self.success_status_code();
        debug!(target_app_id, key = %key, code, "echoing invocation");
        let headers = proto.flattened_metadata();
        Ok(InvokeResponse::new(code, status_text(code))
            .with_raw_data_bytes(proto.message.data.clone())
            .with_http_headers(headers)
            .with_content_type(proto.message.content_type))
    }

    fn set_app_channel(&self, _channel: Arc<dyn AppChannel>) {}

    fn set_http_endpoints_app_channels(
        &self,
        _non_resource_channel: Arc<dyn HttpEndpointAppChannel>,
        _resource_channels: HashMap<String, Arc<dyn HttpEndpointAppChannel>>,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use futures::stream;

    use super::*;
    use crate::failure::{AlwaysFail, NeverFail};

    fn ping_request() -> InvokeRequest {
        InvokeRequest::new("ping")
            .with_raw_data("ping")
            .with_content_type("text/plain")
            .with_metadata_value("x-trace", "123")
    }

    #[tokio::test]
    async fn success_echoes_request() {
        let messaging = FailingMessaging::with_policy(NeverFail);

        let resp = messaging
            .invoke(&InvokeContext::default(), "echo", &ping_request())
            .await
            .unwrap();

        assert_eq!(resp.status.code, 200);
        assert_eq!(resp.status.message, "OK");
        assert_eq!(resp.data, Bytes::from_static(b"ping"));
        assert_eq!(resp.headers["x-trace"], vec!["123"]);
        assert_eq!(resp.content_type, "text/plain");
    }

    #[tokio::test]
    async fn policy_error_is_returned_unchanged() {
        let messaging = FailingMessaging::with_policy(AlwaysFail::new("boom"));

        let err = messaging
            .invoke(&InvokeContext::default(), "echo", &ping_request())
            .await
            .unwrap_err();

        assert_eq!(err, MessagingError::injected("boom"));
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn status_code_override() {
        let messaging = FailingMessaging::with_policy(NeverFail).with_success_status_code(404);

        let resp = messaging
            .invoke(&InvokeContext::default(), "echo", &ping_request())
            .await
            .unwrap();

        assert_eq!(resp.status.code, 404);
        assert_eq!(resp.status.message, "Not Found");
        assert_eq!(resp.data, Bytes::from_static(b"ping"));
    }

    #[tokio::test]
    async fn policy_is_keyed_on_payload() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let policy = move |key: &str| -> Result<(), MessagingError> {
            recorder.lock().push(key.to_owned());
            Ok(())
        };
        let messaging = FailingMessaging::with_policy(policy);

        messaging
            .invoke(&InvokeContext::default(), "a", &ping_request())
            .await
            .unwrap();
        messaging
            .invoke(&InvokeContext::default(), "b", &InvokeRequest::new("empty"))
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec!["ping".to_owned(), String::new()]);
    }

    #[tokio::test]
    async fn malformed_request_skips_policy() {
        let consulted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&consulted);
        let policy = move |_key: &str| -> Result<(), MessagingError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let messaging = FailingMessaging::with_policy(policy);

        let chunks: Vec<io::Result<Bytes>> =
            vec![Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated"))];
        let req = InvokeRequest::new("upload").with_data_stream(stream::iter(chunks));

        let err = messaging
            .invoke(&InvokeContext::default(), "store", &req)
            .await
            .unwrap_err();

        assert!(matches!(err, MessagingError::MalformedRequest(_)));
        assert_eq!(consulted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn streamed_payload_is_echoed() {
        let chunks: Vec<io::Result<Bytes>> =
            vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"world"))];
        let req = InvokeRequest::new("upload")
            .with_data_stream(stream::iter(chunks))
            .with_content_type("application/octet-stream");

        let resp = FailingMessaging::with_policy(NeverFail)
            .invoke(&InvokeContext::default(), "store", &req)
            .await
            .unwrap();

        assert_eq!(resp.data, Bytes::from_static(b"hello world"));
        assert_eq!(resp.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn keyed_failure_from_config() {
        let config = FailingMessagingConfig::from_toml_str(
            r#"
success_status_code = 202

[failure.fails]
ping = 1
"#,
        )
        .unwrap();
        let messaging = FailingMessaging::from_config(&config);

        let first = messaging
            .invoke(&InvokeContext::default(), "echo", &ping_request())
            .await;
        assert_eq!(first, Err(MessagingError::injected("forced failure")));

        let second = messaging
            .invoke(&InvokeContext::default(), "echo", &ping_request())
            .await
            .unwrap();
        assert_eq!(second.status.code, 202);
        assert_eq!(second.status.message, "Accepted");
    }

    #[tokio::test]
    async fn binary_payloads_get_distinct_keys() {
        let policy = Arc::new(KeyedFailure::new().with_fails("\\xff", 1));
        let messaging = FailingMessaging::new(policy.clone());
        let ctx = InvokeContext::default();

        let ff = InvokeRequest::new("blob").with_raw_data(Bytes::from_static(&[0xff]));
        let fe = InvokeRequest::new("blob").with_raw_data(Bytes::from_static(&[0xfe]));

        let first = messaging.invoke(&ctx, "store", &ff).await;
        assert_eq!(first, Err(MessagingError::injected("forced failure")));
        let other = messaging.invoke(&ctx, "store", &fe).await.unwrap();
        assert_eq!(other.data, Bytes::from_static(&[0xfe]));

        assert_eq!(policy.call_count("\\xff"), 1);
        assert_eq!(policy.call_count("\\xfe"), 1);
        assert_eq!(policy.call_count("\u{FFFD}"), 0);
    }

    #[test]
    fn policy_key_escapes_only_invalid_utf8() {
        assert_eq!(policy_key(b"ping"), "ping");
        assert_eq!(policy_key("h\u{e9}llo".as_bytes()), "h\u{e9}llo");
        assert_eq!(policy_key(&[0xff, b'a']), "\\xffa");
        assert_ne!(policy_key(&[0xff]), policy_key(&[0xfe]));
        assert!(matches!(policy_key(b""), Cow::Borrowed("")));
    }

    #[tokio::test]
    async fn zero_status_code_means_unset() {
        let messaging = FailingMessaging::with_policy(NeverFail).with_success_status_code(0);
        assert_eq!(messaging.success_status_code(), DEFAULT_SUCCESS_STATUS);

        let resp = messaging
            .invoke(&InvokeContext::default(), "echo", &ping_request())
            .await
            .unwrap();
        assert_eq!(resp.status.code, 200);
        assert_eq!(resp.status.message, "OK");
    }

    #[test]
    fn close_uses_default() {
        let messaging = FailingMessaging::with_policy(NeverFail);
        assert_eq!(DirectMessaging::close(&messaging), Ok(()));
        assert_eq!(messaging.success_status_code(), DEFAULT_SUCCESS_STATUS);
    }
}
