pub mod channel;
pub mod direct;
pub mod error;

pub use channel::{AppChannel, HttpEndpointAppChannel};
pub use direct::{DirectMessaging, DynDirectMessaging};
pub use error::{ErrorKind, MessagingError};
