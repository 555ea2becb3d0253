//! Tandem Testing
//!
//! Test doubles for the direct messaging capability. Components that call
//! other applications through [`DirectMessaging`](tandem_messaging::DirectMessaging)
//! can be exercised without a real transport:
//!
//! - [`RecordingMessaging`] captures every invocation and returns scripted results
//! - [`FailingMessaging`] echoes requests back unless a [`FailurePolicy`] objects
//! - [`KeyedFailure`] fails or times out specific payloads a set number of times
//! - [`InvokeResultExt`] adds assertions to invocation results
//!
//! # Quick Start
//!
//! ```no_run
//! use tandem_core::{InvokeContext, InvokeRequest};
//! use tandem_testing::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let messaging = FailingMessaging::with_policy(KeyedFailure::new().with_fails("boom", 1));
//!
//!     let ping = InvokeRequest::new("ping").with_raw_data("ping");
//!     let result = messaging.invoke(&InvokeContext::default(), "echo", &ping).await;
//!     result.assert_status(200);
//!
//!     let boom = InvokeRequest::new("boom").with_raw_data("boom");
//!     let result = messaging.invoke(&InvokeContext::default(), "echo", &boom).await;
//!     result.assert_injected("forced failure");
//! }
//! ```
//!
//! # Fixtures
//!
//! Failure budgets can be kept next to the tests in TOML; see
//! [`FailingMessagingConfig`].

pub mod assertions;
pub mod config;
mod error;
pub mod failure;
pub mod logging;
pub mod messaging;

pub use assertions::InvokeResultExt;
pub use config::{FailingMessagingConfig, FailureConfig};
pub use error::ConfigError;
pub use failure::{AlwaysFail, FailureMode, FailurePolicy, KeyedFailure, NeverFail, PatternFailure};
pub use logging::init_tracing;
pub use messaging::{
    CapturedInvocation, DEFAULT_SUCCESS_STATUS, FailingMessaging, InvokeBehavior,
    RecordingMessaging, policy_key,
};

/// Prelude module for convenient imports.
///
/// ```
/// use tandem_testing::prelude::*;
/// ```
pub mod prelude {
    pub use crate::assertions::InvokeResultExt;
    pub use crate::config::{FailingMessagingConfig, FailureConfig};
    pub use crate::error::ConfigError;
    pub use crate::failure::{
        AlwaysFail, FailureMode, FailurePolicy, KeyedFailure, NeverFail, PatternFailure,
    };
    pub use crate::logging::init_tracing;
    pub use crate::messaging::{
        CapturedInvocation, FailingMessaging, InvokeBehavior, RecordingMessaging,
    };
    pub use tandem_messaging::{DirectMessaging, MessagingError};
}
