//! Recording messaging double that captures every invocation for verification.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tandem_core::{InvokeContext, InvokeRequest, InvokeResponse};
use tandem_messaging::{AppChannel, DirectMessaging, HttpEndpointAppChannel, MessagingError};
use tracing::debug;

/// Type alias for the behavior function.
type InvokeFn = dyn Fn(&InvokeContext, &str, &InvokeRequest) -> InvokeResult + Send + Sync;

type InvokeResult = Result<InvokeResponse, MessagingError>;

/// What a [`RecordingMessaging`] returns for an invocation.
#[derive(Clone)]
pub enum InvokeBehavior {
    /// Compute the result from the call arguments.
    Respond(Arc<InvokeFn>),
    /// Return a fixed response.
    Return(InvokeResponse),
    /// Return a fixed error.
    Fail(MessagingError),
}

impl InvokeBehavior {
    pub fn respond<F>(f: F) -> Self
    where
        F: Fn(&InvokeContext, &str, &InvokeRequest) -> Result<InvokeResponse, MessagingError>
            + Send
            + Sync
            + 'static,
    {
        Self::Respond(Arc::new(f))
    }

    fn resolve(
        &self,
        ctx: &InvokeContext,
        target_app_id: &str,
        req: &InvokeRequest,
    ) -> Result<InvokeResponse, MessagingError> {
        match self {
            Self::Respond(f) => f(ctx, target_app_id, req),
            Self::Return(resp) => Ok(resp.clone()),
            Self::Fail(err) => Err(err.clone()),
        }
    }
}

impl std::fmt::Debug for InvokeBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Respond(_) => f.write_str("Respond(<fn>)"),
            Self::Return(resp) => f.debug_tuple("Return").field(resp).finish(),
            Self::Fail(err) => f.debug_tuple("Fail").field(err).finish(),
        }
    }
}

/// A captured call to [`RecordingMessaging::invoke`].
#[derive(Debug, Clone)]
pub struct CapturedInvocation {
    /// Timestamp when the call was made.
    pub timestamp: DateTime<Utc>,
    /// One-based position of this call.
    pub call_number: usize,
    pub context: InvokeContext,
    pub target_app_id: String,
    pub request: InvokeRequest,
    /// The result handed back to the caller.
    pub outcome: Result<InvokeResponse, MessagingError>,
}

/// A direct messaging double that records every invocation.
///
/// Results come from configured behaviors: queued one-shot behaviors
/// ([`expect_once`](Self::expect_once)) are used first, in order, then the
/// standing behavior. There is no default: invoking with nothing configured
/// panics, failing the test rather than the code under test.
///
/// The app-channel setters are no-ops and [`close`](DirectMessaging::close)
/// always succeeds.
pub struct RecordingMessaging {
    calls: Mutex<Vec<CapturedInvocation>>,
    call_count: AtomicUsize,
    close_count: AtomicUsize,
    behavior: Mutex<Option<InvokeBehavior>>,
    once: Mutex<VecDeque<InvokeBehavior>>,
}

impl std::fmt::Debug for RecordingMessaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingMessaging")
            .field("call_count", &self.call_count.load(Ordering::SeqCst))
            .field("close_count", &self.close_count.load(Ordering::SeqCst))
            .field("behavior", &*self.behavior.lock())
            .field("queued", &self.once.lock().len())
            .finish_non_exhaustive()
    }
}

impl Default for RecordingMessaging {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingMessaging {
    /// Create a recording double with no behavior configured.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            close_count: AtomicUsize::new(0),
            behavior: Mutex::new(None),
            once: Mutex::new(VecDeque::new()),
        }
    }

    /// Set the standing behavior.
    #[must_use]
    pub fn with_behavior(self, behavior: InvokeBehavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    /// Compute every result with `f`.
    #[must_use]
    pub fn with_response_fn<F>(self, f: F) -> Self
    where
        F: Fn(&InvokeContext, &str, &InvokeRequest) -> Result<InvokeResponse, MessagingError>
            + Send
            + Sync
            + 'static,
    {
        self.with_behavior(InvokeBehavior::respond(f))
    }

    /// Return `response` from every call.
    #[must_use]
    pub fn with_response(self, response: InvokeResponse) -> Self {
        self.with_behavior(InvokeBehavior::Return(response))
    }

    /// Fail every call with `error`.
    #[must_use]
    pub fn with_error(self, error: MessagingError) -> Self {
        self.with_behavior(InvokeBehavior::Fail(error))
    }

    /// Replace the standing behavior.
    pub fn set_behavior(&self, behavior: InvokeBehavior) {
        *self.behavior.lock() = Some(behavior);
    }

    /// Queue a behavior for exactly one upcoming call.
    pub fn expect_once(&self, behavior: InvokeBehavior) {
        self.once.lock().push_back(behavior);
    }

    /// Get all captured calls.
    pub fn calls(&self) -> Vec<CapturedInvocation> {
        self.calls.lock().clone()
    }

    /// Captured calls addressed to `target_app_id`.
    pub fn calls_to(&self, target_app_id: &str) -> Vec<CapturedInvocation> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.target_app_id == target_app_id)
            .cloned()
            .collect()
    }

    /// Get the number of calls.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Number of times `close` was called.
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    /// Clear captured calls. Configured behaviors are kept.
    pub fn clear(&self) {
        self.calls.lock().clear();
        self.call_count.store(0, Ordering::SeqCst);
    }

    /// Get the last captured call, if any.
    pub fn last_call(&self) -> Option<CapturedInvocation> {
        self.calls.lock().last().cloned()
    }

    /// Get the last request that was invoked, if any.
    pub fn last_request(&self) -> Option<InvokeRequest> {
        self.last_call().map(|c| c.request)
    }

    /// Assert that `invoke` was called exactly N times.
    ///
    /// # Panics
    ///
    /// Panics if the double was not called exactly N times.
    pub fn assert_called(&self, n: usize) {
        let count = self.call_count();
        assert_eq!(count, n, "expected {n} invocations, got {count}");
    }

    /// Assert that `invoke` was not called.
    ///
    /// # Panics
    ///
    /// Panics if the double was called.
    pub fn assert_not_called(&self) {
        let count = self.call_count();
        assert_eq!(count, 0, "expected no invocations, got {count}");
    }

    /// Assert that at least one call targeted `target_app_id`.
    ///
    /// # Panics
    ///
    /// Panics if no captured call has that target.
    pub fn assert_called_with_target(&self, target_app_id: &str) {
        let calls = self.calls.lock();
        assert!(
            calls.iter().any(|c| c.target_app_id == target_app_id),
            "expected an invocation of '{target_app_id}', got targets {:?}",
            calls.iter().map(|c| c.target_app_id.as_str()).collect::<Vec<_>>()
        );
    }

    /// Assert that at least one call invoked `method`.
    ///
    /// # Panics
    ///
    /// Panics if no captured call has that method.
    pub fn assert_called_with_method(&self, method: &str) {
        let calls = self.calls.lock();
        assert!(
            calls.iter().any(|c| c.request.method() == method),
            "expected an invocation of method '{method}', got methods {:?}",
            calls.iter().map(|c| c.request.method()).collect::<Vec<_>>()
        );
    }

    fn next_behavior(&self) -> Option<InvokeBehavior> {
        if let Some(behavior) = self.once.lock().pop_front() {
            return Some(behavior);
        }
        self.behavior.lock().clone()
    }
}

impl DirectMessaging for RecordingMessaging {
    async fn invoke(
        &self,
        ctx: &InvokeContext,
        target_app_id: &str,
        req: &InvokeRequest,
    ) -> Result<InvokeResponse, MessagingError> {
        let Some(behavior) = self.next_behavior() else {
            panic!(
                "unexpected invocation #{} of '{target_app_id}' (method '{}'): \
                 no behavior configured on RecordingMessaging",
                self.call_count() + 1,
                req.method()
            );
        };

        let outcome = behavior.resolve(ctx, target_app_id, req);

        // numbered and recorded under the calls lock
        let mut calls = self.calls.lock();
        let call_number = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            target_app_id,
            method = req.method(),
            call_number,
            ok = outcome.is_ok(),
            "recorded invocation"
        );
        calls.push(CapturedInvocation {
            timestamp: Utc::now(),
            call_number,
            context: ctx.clone(),
            target_app_id: target_app_id.to_owned(),
            request: req.clone(),
            outcome: outcome.clone(),
        });
        drop(calls);

        outcome
    }

    fn set_app_channel(&self, _channel: Arc<dyn AppChannel>) {}

    fn set_http_endpoints_app_channels(
        &self,
        _non_resource_channel: Arc<dyn HttpEndpointAppChannel>,
        _resource_channels: HashMap<String, Arc<dyn HttpEndpointAppChannel>>,
    ) {
    }

    fn close(&self) -> Result<(), MessagingError> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
