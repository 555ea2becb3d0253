pub mod context;
pub mod error;
pub mod protocol;
pub mod request;
pub mod response;

pub use context::InvokeContext;
pub use error::EnvelopeError;
pub use protocol::{
    ApiVersion, HttpExtension, InternalInvokeRequest, InvokeMessage, ListStringValue,
};
pub use request::{DataStream, InvokeRequest};
pub use response::{InvokeResponse, InvokeStatus, status_text};
