//! # kubedash-dashboard
//!
//! The Kubernetes dashboard built on the RPC and subscription layers:
//!
//! - **Channels** (`channels`): the stable wire names and payload types the
//!   extension and webview agree on
//! - **API surface** (`api`): typed proxy for the webview, method tables for
//!   the extension, including the channel-subscription RPC surface
//! - **Subscribe helper** (`subscriber`): the webview's
//!   subscribe-with-options-returns-disposer surface
//! - **Producers** (`watchers`, `logs`): interest-driven upstream work —
//!   a resource watch or log tail runs only while somebody is subscribed,
//!   one per distinct parameterization
//!
//! Kubernetes connectivity itself stays behind the `ResourceSource` and
//! `LogSource` collaborator traits; this crate owns the lifecycle, not the
//! cluster.

#![deny(unsafe_code)]

pub mod api;
pub mod channels;
pub mod config;
pub mod logs;
pub mod subscriber;
pub mod types;
pub mod watchers;

pub use api::{DashboardApi, DashboardClient, register_dashboard_api, register_subscriptions_api};
pub use channels::{
    ACTIVE_RESOURCES_COUNT, CHANNEL_SUBSCRIPTIONS_API, DASHBOARD_API, KUBERNETES_CONTEXTS,
    POD_LOGS, UPDATE_RESOURCE,
};
pub use config::DashboardConfig;
pub use logs::{LogSource, PodLogStreamer};
pub use subscriber::{ChannelSubscription, WebviewSubscriber};
pub use types::{
    ActiveResourcesCount, ContextsUpdate, KubeContext, LogChunk, LogTarget, ResourceUpdate,
    UpdateAction,
};
pub use watchers::{ResourceSource, ResourceWatchManager, WatchHandle};
