//! Webview subscribe surface.
//!
//! UI code subscribes to an event channel with options and gets a disposer
//! back; no other wire detail leaks into components. Under the hood this
//! pairs a local broadcast listener with a `subscribeToChannel` call so the
//! extension knows to start (and parameterize) its producers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use kubedash_rpc::channel::EventChannel;
use kubedash_rpc::client::{BroadcastGuard, ChannelProxy, RpcClient};
use kubedash_rpc::errors::RpcError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::channels::CHANNEL_SUBSCRIPTIONS_API;

/// Allocates uids and wires subscriptions for one webview instance.
pub struct WebviewSubscriber {
    client: Arc<RpcClient>,
    proxy: ChannelProxy,
    next_uid: AtomicU64,
}

impl WebviewSubscriber {
    /// Bind to this webview's RPC client.
    #[must_use]
    pub fn new(client: &Arc<RpcClient>) -> Self {
        Self {
            client: client.clone(),
            proxy: client.proxy(&CHANNEL_SUBSCRIPTIONS_API),
            next_uid: AtomicU64::new(1),
        }
    }

    /// Subscribe to `channel` with `options`; `listener` receives every
    /// pushed payload until the returned handle is disposed.
    pub async fn subscribe<T, O, F>(
        &self,
        channel: &EventChannel<T>,
        options: &O,
        listener: F,
    ) -> Result<ChannelSubscription, RpcError>
    where
        T: DeserializeOwned + 'static,
        O: Serialize,
        F: Fn(T) + Send + Sync + 'static,
    {
        let uid = self.next_uid.fetch_add(1, Ordering::Relaxed);
        let options = serde_json::to_value(options)?;
        // Local delivery is registered before the extension learns about
        // the interest, so the first pushes cannot slip past the listener.
        let guard = self.client.on_broadcast(channel, listener);
        let _ = self
            .proxy
            .call(
                "subscribeToChannel",
                vec![json!(channel.name()), json!(uid), options],
            )
            .await?;
        debug!(channel = channel.name(), uid, "subscribed");
        Ok(ChannelSubscription {
            proxy: self.proxy.clone(),
            channel: channel.name(),
            uid,
            guard: Some(guard),
        })
    }

    /// Withdraw *all* extension-side interest for `channel`.
    ///
    /// The reconnect escape hatch: a fresh webview cannot hold the previous
    /// view's disposers, so it resets the channel before re-subscribing.
    pub async fn reset(&self, channel_name: &str) -> Result<(), RpcError> {
        let _ = self
            .proxy
            .call("resetChannelSubscriptions", vec![json!(channel_name)])
            .await?;
        Ok(())
    }
}

/// Disposer for one webview subscription.
///
/// Dropping it silences the local listener immediately; call
/// [`Self::unsubscribe`] to also withdraw the extension-side interest, or
/// rely on [`WebviewSubscriber::reset`] at reconnect.
pub struct ChannelSubscription {
    proxy: ChannelProxy,
    channel: &'static str,
    uid: u64,
    guard: Option<BroadcastGuard>,
}

impl ChannelSubscription {
    /// The uid this subscription registered with.
    #[must_use]
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Stop receiving and withdraw interest from the extension.
    pub async fn unsubscribe(mut self) -> Result<(), RpcError> {
        if let Some(guard) = self.guard.take() {
            guard.dispose();
        }
        let _ = self
            .proxy
            .call(
                "unsubscribeFromChannel",
                vec![json!(self.channel), json!(self.uid)],
            )
            .await?;
        debug!(channel = self.channel, uid = self.uid, "unsubscribed");
        Ok(())
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        if self.guard.is_some() {
            debug!(
                channel = self.channel,
                uid = self.uid,
                "subscription dropped without unsubscribe; extension keeps its interest until reset"
            );
        }
    }
}
