//! Direct messaging doubles.
//!
//! This module provides messaging implementations that record calls,
//! inject failures and echo requests back for testing purposes.

mod failing;
mod recording;

pub use failing::{DEFAULT_SUCCESS_STATUS, FailingMessaging, policy_key};
pub use recording::{CapturedInvocation, InvokeBehavior, RecordingMessaging};
