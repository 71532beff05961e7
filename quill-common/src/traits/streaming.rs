// File: quill-common/src/traits/streaming.rs

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Error;
use crate::models::{StreamAccount, StreamEvent};

/// Receiver side of a streaming connection; implemented by the event
/// router, invoked by the transport for every inbound event.
#[async_trait]
pub trait StreamHandler: Send + Sync {
    async fn on_event(&self, event: StreamEvent);
}

/// One account's streaming transport. `connect` blocks (awaits) until
/// the remote side closes, a protocol error ends the stream, or
/// `disconnect` is called. `disconnect` only signals and never blocks.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn connect(&self, handler: &dyn StreamHandler) -> Result<(), Error>;

    fn disconnect(&self);
}

/// Builds a transport for one account. Failing here (malformed
/// credentials and the like) costs that account its session and nothing
/// else.
pub trait TransportFactory: Send + Sync {
    fn create(&self, account: &StreamAccount) -> Result<Arc<dyn StreamTransport>, Error>;
}
