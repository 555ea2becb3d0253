use async_trait::async_trait;
use tandem_core::{InvokeRequest, InvokeResponse};

use crate::error::MessagingError;

/// Channel used to deliver invocations to the local app.
#[async_trait]
pub trait AppChannel: Send + Sync {
    /// Deliver `req` to the app identified by `app_id`.
    async fn invoke_method(
        &self,
        req: &InvokeRequest,
        app_id: &str,
    ) -> Result<InvokeResponse, MessagingError>;
}

/// Channel used to deliver invocations to an external HTTP endpoint.
///
/// Direct messaging holds one channel for non-resource endpoints plus one
/// channel per named HTTP endpoint resource.
#[async_trait]
pub trait HttpEndpointAppChannel: Send + Sync {
    async fn invoke_method(
        &self,
        req: &InvokeRequest,
        app_id: &str,
    ) -> Result<InvokeResponse, MessagingError>;
}
