use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tandem_core::{InvokeContext, InvokeRequest, InvokeResponse};

use crate::channel::{AppChannel, HttpEndpointAppChannel};
use crate::error::MessagingError;

/// Strongly-typed direct messaging capability with native `async fn`.
///
/// Invokes methods on other apps by id. This trait is **not** object-safe;
/// use [`DynDirectMessaging`] behind `Arc<dyn ...>`. Every `DirectMessaging`
/// implements `DynDirectMessaging` via a blanket implementation.
pub trait DirectMessaging: Send + Sync {
    /// Invoke `req` on the app `target_app_id`.
    fn invoke(
        &self,
        ctx: &InvokeContext,
        target_app_id: &str,
        req: &InvokeRequest,
    ) -> impl std::future::Future<Output = Result<InvokeResponse, MessagingError>> + Send;

    /// Set the channel used to reach the local app.
    fn set_app_channel(&self, channel: Arc<dyn AppChannel>);

    /// Set the channels used to reach external HTTP endpoints: one for
    /// non-resource endpoints and one per named endpoint resource.
    fn set_http_endpoints_app_channels(
        &self,
        non_resource_channel: Arc<dyn HttpEndpointAppChannel>,
        resource_channels: HashMap<String, Arc<dyn HttpEndpointAppChannel>>,
    );

    /// Release held resources.
    ///
    /// Defaults to doing nothing.
    fn close(&self) -> Result<(), MessagingError> {
        Ok(())
    }
}

/// Object-safe direct messaging trait for use behind `Arc<dyn DynDirectMessaging>`.
///
/// You generally should not implement this trait directly; implement
/// [`DirectMessaging`] and rely on the blanket implementation.
#[async_trait]
pub trait DynDirectMessaging: Send + Sync {
    async fn invoke(
        &self,
        ctx: &InvokeContext,
        target_app_id: &str,
        req: &InvokeRequest,
    ) -> Result<InvokeResponse, MessagingError>;

    fn set_app_channel(&self, channel: Arc<dyn AppChannel>);

    fn set_http_endpoints_app_channels(
        &self,
        non_resource_channel: Arc<dyn HttpEndpointAppChannel>,
        resource_channels: HashMap<String, Arc<dyn HttpEndpointAppChannel>>,
    );

    fn close(&self) -> Result<(), MessagingError> {
        Ok(())
    }
}

#[async_trait]
impl<T: DirectMessaging + Sync> DynDirectMessaging for T {
    async fn invoke(
        &self,
        ctx: &InvokeContext,
        target_app_id: &str,
        req: &InvokeRequest,
    ) -> Result<InvokeResponse, MessagingError> {
        DirectMessaging::invoke(self, ctx, target_app_id, req).await
    }

    fn set_app_channel(&self, channel: Arc<dyn AppChannel>) {
        DirectMessaging::set_app_channel(self, channel);
    }

    fn set_http_endpoints_app_channels(
        &self,
        non_resource_channel: Arc<dyn HttpEndpointAppChannel>,
        resource_channels: HashMap<String, Arc<dyn HttpEndpointAppChannel>>,
    ) {
        DirectMessaging::set_http_endpoints_app_channels(
            self,
            non_resource_channel,
            resource_channels,
        );
    }

    fn close(&self) -> Result<(), MessagingError> {
        DirectMessaging::close(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Forwards every invocation to the app channel, if one is set.
    #[derive(Default)]
    struct LoopbackMessaging {
        channel: Mutex<Option<Arc<dyn AppChannel>>>,
    }

    impl DirectMessaging for LoopbackMessaging {
        async fn invoke(
            &self,
            _ctx: &InvokeContext,
            target_app_id: &str,
            req: &InvokeRequest,
        ) -> Result<InvokeResponse, MessagingError> {
            let channel = self.channel.lock().unwrap().clone();
            match channel {
                Some(channel) => channel.invoke_method(req, target_app_id).await,
                None => Err(MessagingError::injected("no app channel")),
            }
        }

        fn set_app_channel(&self, channel: Arc<dyn AppChannel>) {
            *self.channel.lock().unwrap() = Some(channel);
        }

        fn set_http_endpoints_app_channels(
            &self,
            _non_resource_channel: Arc<dyn HttpEndpointAppChannel>,
            _resource_channels: HashMap<String, Arc<dyn HttpEndpointAppChannel>>,
        ) {
        }
    }

    struct MethodEchoChannel;

    #[async_trait]
    impl AppChannel for MethodEchoChannel {
        async fn invoke_method(
            &self,
            req: &InvokeRequest,
            app_id: &str,
        ) -> Result<InvokeResponse, MessagingError> {
            Ok(InvokeResponse::with_status_code(200)
                .with_raw_data_bytes(format!("{app_id}:{}", req.method())))
        }
    }

    #[tokio::test]
    async fn static_dispatch_invoke() {
        let messaging = LoopbackMessaging::default();
        let req = InvokeRequest::new("orders");

        let err = DirectMessaging::invoke(&messaging, &InvokeContext::default(), "shop", &req)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no app channel");

        DirectMessaging::set_app_channel(&messaging, Arc::new(MethodEchoChannel));
        let resp = DirectMessaging::invoke(&messaging, &InvokeContext::default(), "shop", &req)
            .await
            .unwrap();
        assert_eq!(resp.data, "shop:orders".as_bytes());
    }

    #[tokio::test]
    async fn blanket_dyn_impl() {
        let messaging: Arc<dyn DynDirectMessaging> = Arc::new(LoopbackMessaging::default());
        messaging.set_app_channel(Arc::new(MethodEchoChannel));

        let req = InvokeRequest::new("ping");
        let resp = messaging
            .invoke(&InvokeContext::default(), "pinger", &req)
            .await
            .unwrap();
        assert_eq!(resp.status.code, 200);
        assert_eq!(resp.data, "pinger:ping".as_bytes());
    }

    #[test]
    fn close_defaults_to_ok() {
        let messaging: Arc<dyn DynDirectMessaging> = Arc::new(LoopbackMessaging::default());
        assert_eq!(messaging.close(), Ok(()));
    }
}
