//! Extension-side RPC endpoint: handler tables, request dispatch, and
//! broadcast fan-out.
//!
//! The dispatch table is explicit: registering a handler builds a map from
//! method name to handler object, and inbound requests are resolved against
//! that map. A failing handler settles the call with an error response —
//! it never takes the extension process down.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use metrics::counter;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::channel::{ApiChannel, EventChannel};
use crate::envelope::{self, MessageRequest, MessageResponse};
use crate::errors::RpcError;
use crate::transport::{MessageEndpoint, RawTransport};

/// One callable method on an invokable channel.
#[async_trait]
pub trait Method: Send + Sync {
    /// Execute with the request's positional arguments.
    async fn call(&self, args: Vec<Value>) -> Result<Value, RpcError>;
}

/// Adapter so plain async closures can serve as methods.
struct FnMethod<F>(F);

#[async_trait]
impl<F> Method for FnMethod<F>
where
    F: Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, RpcError>> + Send + Sync,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value, RpcError> {
        (self.0)(args).await
    }
}

/// Explicit method-name → handler mapping for one invokable channel.
///
/// Built once at registration time; dispatch is a plain map lookup, never a
/// property probe on an arbitrary object.
#[derive(Default)]
pub struct MethodTable {
    methods: HashMap<String, Arc<dyn Method>>,
}

impl MethodTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register a handler for a method name. Re-registration replaces.
    pub fn register(&mut self, name: &str, method: impl Method + 'static) {
        let _ = self.methods.insert(name.to_owned(), Arc::new(method));
    }

    /// Register an async closure as a method.
    pub fn register_fn<F>(&mut self, name: &str, f: F)
    where
        F: Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, RpcError>> + Send + Sync + 'static,
    {
        self.register(name, FnMethod(f));
    }

    /// Check whether a method is registered.
    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// All registered method names (sorted).
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve and invoke a method.
    ///
    /// `channel` only labels the error when the method is missing.
    pub async fn dispatch(
        &self,
        channel: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RpcError> {
        let Some(handler) = self.methods.get(method) else {
            return Err(RpcError::MethodNotFound {
                channel: channel.to_owned(),
                method: method.to_owned(),
            });
        };
        handler.call(args).await
    }
}

/// The extension process's endpoint on the webview transport.
pub struct RpcExtension {
    transport: Arc<dyn RawTransport>,
    handlers: RwLock<HashMap<String, Arc<MethodTable>>>,
}

impl RpcExtension {
    /// Wrap the host-provided transport.
    pub fn new(transport: Arc<dyn RawTransport>) -> Self {
        Self {
            transport,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Associate a channel with its method table. Re-registration replaces
    /// the previous table wholesale.
    pub fn register_handler(&self, channel: &ApiChannel, table: MethodTable) {
        let _ = self
            .handlers
            .write()
            .insert(channel.name().to_owned(), Arc::new(table));
    }

    /// Registered channel names (sorted), for inspection.
    #[must_use]
    pub fn handler_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Push `payload` on `channel` to every connected webview.
    ///
    /// Fire-and-forget: returns once the transport has accepted the send.
    /// No peer acknowledges broadcasts.
    pub fn fire<T: Serialize>(
        &self,
        channel: &EventChannel<T>,
        payload: &T,
    ) -> Result<(), RpcError> {
        self.fire_raw(channel.name(), serde_json::to_value(payload)?)
    }

    /// Untyped [`Self::fire`] for callers that already hold a JSON body.
    pub fn fire_raw(&self, channel: &str, body: Value) -> Result<(), RpcError> {
        let envelope = MessageResponse::broadcast(channel, body);
        counter!("broadcasts_total", "channel" => channel.to_owned()).increment(1);
        self.transport
            .post(serde_json::to_value(&envelope)?)
            .map_err(RpcError::from)
    }

    /// Serve one inbound request and post its response.
    async fn serve(&self, request: MessageRequest) {
        let channel = request.channel.clone();
        let method = request.method.clone();
        counter!("rpc_requests_total", "channel" => channel.clone()).increment(1);
        debug!(channel, method, id = request.id.value(), "dispatching rpc");

        let table = self.handlers.read().get(&channel).cloned();
        let result = match table {
            Some(table) => table.dispatch(&channel, &method, request.args.clone()).await,
            None => Err(RpcError::NoHandler {
                channel: channel.clone(),
            }),
        };

        let response = match result {
            Ok(body) => MessageResponse::success(&request, body),
            Err(err) => {
                counter!("rpc_errors_total", "channel" => channel.clone()).increment(1);
                debug!(channel, method, error = %err, "handler returned error");
                MessageResponse::error(&request, err.to_string())
            }
        };

        let value = match serde_json::to_value(&response) {
            Ok(v) => v,
            Err(e) => {
                warn!(channel, error = %e, "failed to serialize response");
                return;
            }
        };
        if let Err(e) = self.transport.post(value) {
            warn!(channel, id = request.id.value(), error = %e, "failed to post response");
        }
    }
}

#[async_trait]
impl MessageEndpoint for RpcExtension {
    async fn handle_message(&self, raw: Value) {
        // Responses never address this side; everything else that isn't
        // request-shaped is host traffic.
        if !envelope::is_message_request(&raw) || envelope::is_message_response(&raw) {
            trace!("ignoring non-request traffic");
            return;
        }
        let request: MessageRequest = match serde_json::from_value(raw) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "request-shaped value failed to parse, ignoring");
                return;
            }
        };
        self.serve(request).await;
    }
}
