//! Dispatch service: payload in, fan-out to whoever is interested.
//!
//! Producers hand a channel and a payload to one sink and are done;
//! per-listener delivery is not their job. The remote variant forwards to
//! subscribed webviews through the extension endpoint's broadcast, the local
//! variant invokes in-process callbacks directly.

use std::sync::Arc;

use kubedash_rpc::channel::EventChannel;
use kubedash_rpc::extension::RpcExtension;
use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use tracing::{trace, warn};

use crate::local::LocalSubscriptions;
use crate::registry::ChannelSubscriptions;

/// Untyped dispatch surface shared by both variants.
pub trait DispatchSink: Send + Sync {
    /// Deliver `payload` to every current subscriber of `channel`.
    fn dispatch_value(&self, channel: &str, payload: Value);
}

/// Forwards dispatches to subscribed webview instances.
pub struct RemoteDispatcher {
    extension: Arc<RpcExtension>,
    registry: Arc<ChannelSubscriptions>,
}

impl RemoteDispatcher {
    /// Couple the extension endpoint with its interest registry.
    pub fn new(extension: Arc<RpcExtension>, registry: Arc<ChannelSubscriptions>) -> Self {
        Self {
            extension,
            registry,
        }
    }

    /// Typed [`DispatchSink::dispatch_value`].
    pub fn dispatch<T: Serialize>(&self, channel: &EventChannel<T>, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(body) => self.dispatch_value(channel.name(), body),
            Err(e) => warn!(channel = channel.name(), error = %e, "payload failed to serialize"),
        }
    }
}

impl DispatchSink for RemoteDispatcher {
    fn dispatch_value(&self, channel: &str, payload: Value) {
        if !self.registry.has_subscribers(channel) {
            trace!(channel, "nobody subscribed, dropping payload");
            return;
        }
        counter!("dispatches_total", "channel" => channel.to_owned()).increment(1);
        if let Err(e) = self.extension.fire_raw(channel, payload) {
            // Delivery already in flight elsewhere is unaffected; this
            // payload is lost with the transport.
            warn!(channel, error = %e, "failed to forward dispatch to webviews");
        }
    }
}

/// Delivers dispatches to in-process listeners.
pub struct LocalDispatcher {
    registry: Arc<LocalSubscriptions>,
}

impl LocalDispatcher {
    /// Wrap an in-process registry.
    pub fn new(registry: Arc<LocalSubscriptions>) -> Self {
        Self { registry }
    }

    /// Typed [`DispatchSink::dispatch_value`].
    pub fn dispatch<T: Serialize>(&self, channel: &EventChannel<T>, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(body) => self.dispatch_value(channel.name(), body),
            Err(e) => warn!(channel = channel.name(), error = %e, "payload failed to serialize"),
        }
    }
}

impl DispatchSink for LocalDispatcher {
    fn dispatch_value(&self, channel: &str, payload: Value) {
        counter!("dispatches_total", "channel" => channel.to_owned()).increment(1);
        self.registry.dispatch(channel, &payload);
    }
}
