//! Invokable-channel surface: typed proxies for the webview, method tables
//! for the extension.
//!
//! The method tables are the explicit dispatch mapping the extension
//! endpoint resolves requests against; each entry decodes its positional
//! arguments, calls the implementation, and encodes the result. The
//! subscription table is how webview interest crosses the process boundary
//! into the extension-side registry.

use std::sync::Arc;

use async_trait::async_trait;
use kubedash_core::SubscriberUid;
use kubedash_rpc::client::{ChannelProxy, RpcClient};
use kubedash_rpc::errors::RpcError;
use kubedash_rpc::extension::{MethodTable, RpcExtension};
use kubedash_subscriptions::ChannelSubscriptions;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::channels::{CHANNEL_SUBSCRIPTIONS_API, DASHBOARD_API};
use crate::types::KubeContext;

/// Extension-side implementation of the dashboard's callable methods.
///
/// Cluster connectivity lives behind this trait; the RPC layer only decodes
/// arguments and encodes results.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// All kubeconfig contexts known to the extension.
    async fn list_contexts(&self) -> Result<Vec<KubeContext>, RpcError>;

    /// Switch the current context.
    async fn set_current_context(&self, name: String) -> Result<(), RpcError>;

    /// Delete one resource.
    async fn delete_resource(
        &self,
        kind: String,
        name: String,
        namespace: Option<String>,
    ) -> Result<(), RpcError>;
}

/// Decode one positional argument, treating a missing slot as JSON null.
fn arg<T: DeserializeOwned>(args: &[Value], index: usize, name: &str) -> Result<T, RpcError> {
    let value = args.get(index).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|e| RpcError::invalid_args(format!("argument '{name}': {e}")))
}

/// Build the method table serving [`DashboardApi`] calls.
#[must_use]
pub fn dashboard_api_table(api: Arc<dyn DashboardApi>) -> MethodTable {
    let mut table = MethodTable::new();

    let shared = api.clone();
    table.register_fn("listContexts", move |_args| {
        let api = shared.clone();
        Box::pin(async move {
            let contexts = api.list_contexts().await?;
            serde_json::to_value(contexts).map_err(RpcError::from)
        })
    });

    let shared = api.clone();
    table.register_fn("setCurrentContext", move |args| {
        let api = shared.clone();
        Box::pin(async move {
            let name: String = arg(&args, 0, "name")?;
            api.set_current_context(name).await?;
            Ok(Value::Null)
        })
    });

    let shared = api;
    table.register_fn("deleteResource", move |args| {
        let api = shared.clone();
        Box::pin(async move {
            let kind: String = arg(&args, 0, "kind")?;
            let name: String = arg(&args, 1, "name")?;
            let namespace: Option<String> = arg(&args, 2, "namespace")?;
            api.delete_resource(kind, name, namespace).await?;
            Ok(Value::Null)
        })
    });

    table
}

/// Register the dashboard API on its channel.
pub fn register_dashboard_api(extension: &RpcExtension, api: Arc<dyn DashboardApi>) {
    extension.register_handler(&DASHBOARD_API, dashboard_api_table(api));
}

/// Build the method table that lets webviews manage their channel interest.
#[must_use]
pub fn subscriptions_api_table(registry: Arc<ChannelSubscriptions>) -> MethodTable {
    let mut table = MethodTable::new();

    let shared = registry.clone();
    table.register_fn("subscribeToChannel", move |args| {
        let registry = shared.clone();
        Box::pin(async move {
            let channel: String = arg(&args, 0, "channel")?;
            let uid: u64 = arg(&args, 1, "uid")?;
            let options = args.get(2).cloned().unwrap_or(Value::Null);
            registry.subscribe_to_channel(&channel, options, SubscriberUid::new(uid));
            Ok(Value::Null)
        })
    });

    let shared = registry.clone();
    table.register_fn("unsubscribeFromChannel", move |args| {
        let registry = shared.clone();
        Box::pin(async move {
            let channel: String = arg(&args, 0, "channel")?;
            let uid: u64 = arg(&args, 1, "uid")?;
            registry.unsubscribe_from_channel(&channel, SubscriberUid::new(uid));
            Ok(Value::Null)
        })
    });

    let shared = registry;
    table.register_fn("resetChannelSubscriptions", move |args| {
        let registry = shared.clone();
        Box::pin(async move {
            let channel: String = arg(&args, 0, "channel")?;
            registry.reset_subscribers(&channel);
            Ok(Value::Null)
        })
    });

    table
}

/// Register the subscription surface on its channel.
pub fn register_subscriptions_api(extension: &RpcExtension, registry: Arc<ChannelSubscriptions>) {
    extension.register_handler(&CHANNEL_SUBSCRIPTIONS_API, subscriptions_api_table(registry));
}

/// Webview-side typed client for [`DashboardApi`].
#[derive(Clone)]
pub struct DashboardClient {
    proxy: ChannelProxy,
}

impl DashboardClient {
    /// Bind a proxy on the dashboard channel.
    #[must_use]
    pub fn new(client: &Arc<RpcClient>) -> Self {
        Self {
            proxy: client.proxy(&DASHBOARD_API),
        }
    }

    /// All kubeconfig contexts known to the extension.
    pub async fn list_contexts(&self) -> Result<Vec<KubeContext>, RpcError> {
        self.proxy.call_typed("listContexts", Vec::new()).await
    }

    /// Switch the current context.
    pub async fn set_current_context(&self, name: &str) -> Result<(), RpcError> {
        let _ = self
            .proxy
            .call("setCurrentContext", vec![json!(name)])
            .await?;
        Ok(())
    }

    /// Delete one resource.
    pub async fn delete_resource(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<(), RpcError> {
        let _ = self
            .proxy
            .call(
                "deleteResource",
                vec![json!(kind), json!(name), json!(namespace)],
            )
            .await?;
        Ok(())
    }
}
