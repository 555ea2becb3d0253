use std::time::{Duration, Instant};

/// Per-call context passed alongside an invocation.
///
/// Carries caller identity and an optional deadline. Messaging
/// implementations may consult it; in-process doubles accept it only to
/// match the capability signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeContext {
    /// App id of the caller, when known.
    pub caller_app_id: Option<String>,
    /// Point in time after which the caller no longer waits for a response.
    pub deadline: Option<Instant>,
}

impl InvokeContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the calling app id.
    #[must_use]
    pub fn with_caller(mut self, app_id: impl Into<String>) -> Self {
        self.caller_app_id = Some(app_id.into());
        self
    }

    /// Set a deadline `timeout` from now. A timeout too large to represent
    /// leaves the context without a deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    /// Time left before the deadline, `None` when no deadline is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }
}
