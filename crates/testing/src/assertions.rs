//! Assertion helpers for verifying invocation results.

use tandem_core::InvokeResponse;
use tandem_messaging::{ErrorKind, MessagingError};

/// Extension trait that adds assertion methods to invocation results.
pub trait InvokeResultExt {
    /// Assert the invocation succeeded and return the response.
    fn assert_success(&self) -> &InvokeResponse;

    /// Assert the invocation succeeded with the given status code.
    fn assert_status(&self, code: i32) -> &InvokeResponse;

    /// Assert the invocation failed with an injected failure carrying `message`.
    fn assert_injected(&self, message: &str);

    /// Assert the invocation failed because the request could not be decoded.
    fn assert_malformed(&self);

    /// Assert the invocation timed out.
    fn assert_timed_out(&self);

    /// Check if the invocation succeeded.
    fn is_success(&self) -> bool;

    /// Check if the invocation failed with an injected failure or timeout.
    fn is_injected(&self) -> bool;

    /// Check if the invocation failed because the request was malformed.
    fn is_malformed(&self) -> bool;
}

impl InvokeResultExt for Result<InvokeResponse, MessagingError> {
    fn assert_success(&self) -> &InvokeResponse {
        match self {
            Ok(resp) => resp,
            Err(err) => panic!("expected success, got error: {err}"),
        }
    }

    fn assert_status(&self, code: i32) -> &InvokeResponse {
        let resp = self.assert_success();
        assert_eq!(
            resp.status.code, code,
            "expected status {code}, got {} ({})",
            resp.status.code, resp.status.message
        );
        resp
    }

    fn assert_injected(&self, message: &str) {
        match self {
            Err(MessagingError::InjectedFailure(actual)) => {
                assert_eq!(
                    actual, message,
                    "expected injected failure '{message}', got '{actual}'"
                );
            }
            other => panic!("expected injected failure, got {other:?}"),
        }
    }

    fn assert_malformed(&self) {
        assert!(self.is_malformed(), "expected malformed request, got {self:?}");
    }

    fn assert_timed_out(&self) {
        assert!(
            matches!(self, Err(MessagingError::Timeout(_))),
            "expected timeout, got {self:?}"
        );
    }

    fn is_success(&self) -> bool {
        self.is_ok()
    }

    fn is_injected(&self) -> bool {
        matches!(self, Err(err) if err.kind() == ErrorKind::InjectedFailure)
    }

    fn is_malformed(&self) -> bool {
        matches!(self, Err(err) if err.kind() == ErrorKind::MalformedRequest)
    }
}
