//! # kubedash-rpc
//!
//! The RPC / channel layer between the extension process and its webview
//! instances. The two processes share no memory; everything crosses a
//! host-provided transport as JSON values.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `channel` | Named, typed channel declarations (invokable + event) |
//! | `envelope` | Wire-level request/response shapes and classification predicates |
//! | `client` | Webview-side endpoint: proxies, pending calls, broadcast receipt |
//! | `extension` | Extension-side endpoint: method tables, dispatch, `fire` |
//! | `transport` | Raw transport seam (collaborator interface) |
//! | `memory` | In-memory transport hub for tests and single-process embedding |
//!
//! ## Data flow
//!
//! Webview proxy call → request envelope with a fresh id → transport →
//! extension method table → response envelope with the same id → transport →
//! pending call settled exactly once. Push data flows the other way through
//! broadcast-shaped envelopes with no pending call attached.

#![deny(unsafe_code)]

pub mod channel;
pub mod client;
pub mod envelope;
pub mod errors;
pub mod extension;
pub mod memory;
pub mod transport;

pub use channel::{ApiChannel, EventChannel};
pub use client::{BroadcastGuard, ChannelProxy, RpcClient};
pub use envelope::{
    BROADCAST_ID, BROADCAST_METHOD, MessageRequest, MessageResponse, ResponseStatus,
    is_message_request, is_message_response,
};
pub use errors::RpcError;
pub use extension::{Method, MethodTable, RpcExtension};
pub use transport::{MessageEndpoint, RawTransport, TransportError};
