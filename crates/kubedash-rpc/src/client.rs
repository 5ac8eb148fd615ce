//! Webview-side RPC endpoint: typed proxies, pending-call correlation, and
//! broadcast receipt.
//!
//! Every outbound call registers a pending entry keyed by a fresh id and
//! settles exactly once: on the matching response, or at disposal with a
//! connection-closed error. Inbound envelopes that match no pending call are
//! routed to broadcast listeners for their channel, and ignored if nobody
//! listens — stale responses are not a fault.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use kubedash_core::RequestId;
use metrics::counter;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::channel::{ApiChannel, EventChannel};
use crate::envelope::{self, MessageRequest, MessageResponse, ResponseStatus};
use crate::errors::RpcError;
use crate::transport::{MessageEndpoint, RawTransport};

type PendingSender = oneshot::Sender<Result<Value, RpcError>>;
type Deliver = Arc<dyn Fn(&Value) + Send + Sync>;

struct BroadcastEntry {
    token: u64,
    deliver: Deliver,
}

/// The webview process's endpoint on the extension transport.
pub struct RpcClient {
    transport: Arc<dyn RawTransport>,
    /// Next request id; starts above [`envelope::BROADCAST_ID`].
    next_id: AtomicU64,
    next_token: AtomicU64,
    pending: Mutex<HashMap<RequestId, PendingSender>>,
    listeners: Mutex<HashMap<String, Vec<BroadcastEntry>>>,
    closed: AtomicBool,
}

impl RpcClient {
    /// Wrap the host-provided transport.
    pub fn new(transport: Arc<dyn RawTransport>) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(envelope::BROADCAST_ID.value() + 1),
            next_token: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a callable proxy for an invokable channel.
    #[must_use]
    pub fn proxy(self: &Arc<Self>, channel: &ApiChannel) -> ChannelProxy {
        ChannelProxy {
            client: Arc::clone(self),
            channel: *channel,
        }
    }

    /// Invoke `method` on `channel` and await its settlement.
    pub async fn call(
        &self,
        channel: &ApiChannel,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RpcError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::ConnectionClosed);
        }

        let id = RequestId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        let _ = self.pending.lock().insert(id, tx);

        let request = MessageRequest {
            id,
            channel: channel.name().to_owned(),
            method: method.to_owned(),
            args,
        };
        let encoded = match serde_json::to_value(&request) {
            Ok(v) => v,
            Err(e) => {
                let _ = self.pending.lock().remove(&id);
                return Err(e.into());
            }
        };
        counter!("rpc_calls_total", "channel" => channel.name()).increment(1);
        if let Err(e) = self.transport.post(encoded) {
            let _ = self.pending.lock().remove(&id);
            return Err(e.into());
        }

        match rx.await {
            Ok(outcome) => outcome,
            // Sender dropped without settling: endpoint disposed mid-flight.
            Err(_) => Err(RpcError::ConnectionClosed),
        }
    }

    /// Register a listener for pushes on an event channel.
    ///
    /// The returned guard removes exactly this registration when dropped (or
    /// via [`BroadcastGuard::dispose`]).
    pub fn on_broadcast<T, F>(
        self: &Arc<Self>,
        channel: &EventChannel<T>,
        listener: F,
    ) -> BroadcastGuard
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let name = channel.name();
        let deliver: Deliver = Arc::new(move |body: &Value| {
            match serde_json::from_value::<T>(body.clone()) {
                Ok(payload) => listener(payload),
                Err(e) => warn!(channel = name, error = %e, "broadcast payload failed to decode"),
            }
        });
        self.listeners
            .lock()
            .entry(name.to_owned())
            .or_default()
            .push(BroadcastEntry { token, deliver });

        BroadcastGuard {
            client: Arc::downgrade(self),
            channel: name.to_owned(),
            token,
        }
    }

    /// Number of unsettled calls (for leak checks).
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Tear the endpoint down: every outstanding call is rejected with a
    /// connection-closed error and later calls fail fast.
    pub fn dispose(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let drained: Vec<(RequestId, PendingSender)> = self.pending.lock().drain().collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "rejecting pending calls at disposal");
        }
        for (_, tx) in drained {
            let _ = tx.send(Err(RpcError::ConnectionClosed));
        }
    }

    fn settle_or_route(&self, response: MessageResponse) {
        if let Some(tx) = self.pending.lock().remove(&response.id) {
            let outcome = match response.status {
                ResponseStatus::Success => Ok(response.body),
                ResponseStatus::Error => Err(RpcError::Remote {
                    message: response.error.unwrap_or_default(),
                }),
            };
            // The caller may have abandoned the promise; that is fine.
            let _ = tx.send(outcome);
            return;
        }

        let targets: Vec<Deliver> = self
            .listeners
            .lock()
            .get(&response.channel)
            .map(|entries| entries.iter().map(|e| e.deliver.clone()).collect())
            .unwrap_or_default();
        if targets.is_empty() {
            // Already settled, or from a stale/foreign endpoint.
            trace!(
                channel = response.channel,
                id = response.id.value(),
                "unmatched inbound envelope, ignoring"
            );
            return;
        }
        for deliver in targets {
            deliver(&response.body);
        }
    }
}

#[async_trait]
impl MessageEndpoint for RpcClient {
    async fn handle_message(&self, raw: Value) {
        if !envelope::is_message_response(&raw) {
            trace!("ignoring non-response traffic");
            return;
        }
        let response: MessageResponse = match serde_json::from_value(raw) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "response-shaped value failed to parse, ignoring");
                return;
            }
        };
        self.settle_or_route(response);
    }
}

/// Caller-side stand-in for one invokable channel.
#[derive(Clone)]
pub struct ChannelProxy {
    client: Arc<RpcClient>,
    channel: ApiChannel,
}

impl ChannelProxy {
    /// Invoke a method with raw JSON arguments.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        self.client.call(&self.channel, method, args).await
    }

    /// Invoke a method and decode the result body.
    pub async fn call_typed<R: DeserializeOwned>(
        &self,
        method: &str,
        args: Vec<Value>,
    ) -> Result<R, RpcError> {
        let body = self.call(method, args).await?;
        serde_json::from_value(body).map_err(RpcError::from)
    }

    /// The channel this proxy addresses.
    #[must_use]
    pub fn channel(&self) -> ApiChannel {
        self.channel
    }
}

/// Removes one broadcast registration when dropped.
pub struct BroadcastGuard {
    client: Weak<RpcClient>,
    channel: String,
    token: u64,
}

impl BroadcastGuard {
    /// Explicitly release the registration (same as dropping the guard).
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for BroadcastGuard {
    fn drop(&mut self) {
        if let Some(client) = self.client.upgrade() {
            let mut listeners = client.listeners.lock();
            if let Some(entries) = listeners.get_mut(&self.channel) {
                entries.retain(|e| e.token != self.token);
            }
        }
    }
}
