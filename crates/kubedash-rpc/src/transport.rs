//! Raw transport seam.
//!
//! The host application owns the actual channel between the extension
//! process and its webviews; this layer only requires that it is ordered,
//! reliable, and bidirectional, and that it accepts arbitrary JSON values.
//! On the extension side a single [`RawTransport::post`] reaches every
//! connected webview (send-to-each is the host's job, not the registry's).

use async_trait::async_trait;
use serde_json::Value;

/// Errors the transport can report on send.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The peer side is gone; nothing sent here will ever arrive.
    #[error("transport closed")]
    Closed,

    /// The peer's inbound queue refused the message.
    #[error("transport backpressure: peer queue full")]
    Backpressure,
}

/// One direction of the host-provided message channel.
///
/// `post` returns once the transport has accepted the value, not once any
/// peer has processed it.
pub trait RawTransport: Send + Sync {
    /// Deliver a protocol value to the peer process(es).
    fn post(&self, message: Value) -> Result<(), TransportError>;
}

/// Inbound entry point of an endpoint.
///
/// The host glue feeds every decoded value it receives to exactly one
/// endpoint; the endpoint classifies it with the envelope predicates and
/// ignores anything that is not protocol traffic.
#[async_trait]
pub trait MessageEndpoint: Send + Sync {
    /// Handle one inbound decoded value. Never fails: non-protocol or
    /// malformed traffic is ignored, handler failures become error
    /// responses.
    async fn handle_message(&self, raw: Value);
}
