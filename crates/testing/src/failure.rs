//! Failure policies that decide, per request key, whether an invocation fails.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tandem_messaging::MessagingError;
use tracing::debug;

use crate::config::FailureConfig;

/// Decides whether an operation identified by `key` should fail.
///
/// Policies may be stateful (counting attempts per key, for instance) and are
/// shared between tasks, so implementations handle their own locking.
#[async_trait]
pub trait FailurePolicy: Send + Sync {
    /// Returns `Ok(())` to let the operation succeed, or the error to fail it with.
    async fn perform_failure(&self, key: &str) -> Result<(), MessagingError>;
}

#[async_trait]
impl<F> FailurePolicy for F
where
    F: Fn(&str) -> Result<(), MessagingError> + Send + Sync,
{
    async fn perform_failure(&self, key: &str) -> Result<(), MessagingError> {
        self(key)
    }
}

/// A policy that never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverFail;

#[async_trait]
impl FailurePolicy for NeverFail {
    async fn perform_failure(&self, _key: &str) -> Result<(), MessagingError> {
        Ok(())
    }
}

/// A policy that fails every call with the same message.
#[derive(Debug, Clone)]
pub struct AlwaysFail {
    message: String,
}

impl AlwaysFail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl FailurePolicy for AlwaysFail {
    async fn perform_failure(&self, _key: &str) -> Result<(), MessagingError> {
        Err(MessagingError::injected(self.message.clone()))
    }
}

/// Call pattern for a [`PatternFailure`] policy.
#[derive(Debug, Clone, Default)]
pub enum FailureMode {
    /// Never fail.
    #[default]
    None,
    /// Fail every N calls.
    EveryN(usize),
    /// Fail the first N calls.
    FirstN(usize),
    /// Always fail.
    Always,
}

/// A policy that fails according to a call-count pattern, regardless of key.
#[derive(Debug)]
pub struct PatternFailure {
    mode: FailureMode,
    message: String,
    call_count: AtomicUsize,
}

impl PatternFailure {
    pub fn new(mode: FailureMode, message: impl Into<String>) -> Self {
        Self {
            mode,
            message: message.into(),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Get the number of calls seen so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Reset the call counter.
    pub fn reset(&self) {
        self.call_count.store(0, Ordering::SeqCst);
    }

    fn should_fail(&self, call_number: usize) -> bool {
        match &self.mode {
            FailureMode::None => false,
            FailureMode::EveryN(n) => call_number.is_multiple_of(*n),
            FailureMode::FirstN(n) => call_number <= *n,
            FailureMode::Always => true,
        }
    }
}

#[async_trait]
impl FailurePolicy for PatternFailure {
    async fn perform_failure(&self, key: &str) -> Result<(), MessagingError> {
        let call_number = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        if self.should_fail(call_number) {
            debug!(key, call_number, "pattern failure triggered");
            return Err(MessagingError::injected(self.message.clone()));
        }
        Ok(())
    }
}

enum Decision {
    Pass,
    Fail,
    TimeOut,
}

#[derive(Debug, Default)]
struct Budgets {
    fails: HashMap<String, u32>,
    timeouts: HashMap<String, u32>,
    call_counts: HashMap<String, u32>,
}

/// A policy with per-key failure budgets.
///
/// A key with a fail budget of `n` fails its first `n` calls; a key with a
/// timeout budget sleeps for the configured duration and then fails with
/// [`MessagingError::Timeout`] on its first `n` calls. Fail budgets are
/// checked first. An exhausted budget is dropped on the call that finds it
/// empty, and that call succeeds. Keys without a budget always succeed.
#[derive(Debug)]
pub struct KeyedFailure {
    budgets: Mutex<Budgets>,
    timeout: Duration,
    message: String,
}

impl Default for KeyedFailure {
    fn default() -> Self {
        Self::from_config(&FailureConfig::default())
    }
}

impl KeyedFailure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &FailureConfig) -> Self {
        Self {
            budgets: Mutex::new(Budgets {
                fails: config.fails.clone(),
                timeouts: config.timeouts.clone(),
                call_counts: HashMap::new(),
            }),
            timeout: config.timeout(),
            message: config.message.clone(),
        }
    }

    /// Fail the first `count` calls for `key`.
    #[must_use]
    pub fn with_fails(mut self, key: impl Into<String>, count: u32) -> Self {
        self.budgets.get_mut().fails.insert(key.into(), count);
        self
    }

    /// Time out the first `count` calls for `key`.
    #[must_use]
    pub fn with_timeouts(mut self, key: impl Into<String>, count: u32) -> Self {
        self.budgets.get_mut().timeouts.insert(key.into(), count);
        self
    }

    #[must_use]
    pub fn with_timeout_duration(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Number of times `key` has been checked, whatever the outcome.
    pub fn call_count(&self, key: &str) -> u32 {
        self.budgets
            .lock()
            .call_counts
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    fn decide(&self, key: &str) -> Decision {
        let mut budgets = self.budgets.lock();
        *budgets.call_counts.entry(key.to_owned()).or_default() += 1;

        match budgets.fails.get(key).copied() {
            Some(0) => {
                budgets.fails.remove(key);
                return Decision::Pass;
            }
            Some(left) => {
                budgets.fails.insert(key.to_owned(), left - 1);
                return Decision::Fail;
            }
            None => {}
        }

        match budgets.timeouts.get(key).copied() {
            Some(0) => {
                budgets.timeouts.remove(key);
                Decision::Pass
            }
            Some(left) => {
                budgets.timeouts.insert(key.to_owned(), left - 1);
                Decision::TimeOut
            }
            None => Decision::Pass,
        }
    }
}

#[async_trait]
impl FailurePolicy for KeyedFailure {
    async fn perform_failure(&self, key: &str) -> Result<(), MessagingError> {
        match self.decide(key) {
            Decision::Pass => Ok(()),
            Decision::Fail => {
                debug!(key, "forcing failure");
                Err(MessagingError::injected(self.message.clone()))
            }
            Decision::TimeOut => {
                debug!(key, timeout = ?self.timeout, "forcing timeout");
                tokio::time::sleep(self.timeout).await;
                Err(MessagingError::Timeout(self.timeout))
            }
        }
    }
}
