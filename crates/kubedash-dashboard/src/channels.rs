//! Channel declarations.
//!
//! These names are the only cross-process contract; renaming one is a
//! breaking protocol change. Declared once, referenced everywhere.

use kubedash_rpc::{ApiChannel, EventChannel};

use crate::types::{ActiveResourcesCount, ContextsUpdate, LogChunk, ResourceUpdate};

/// Invokable: context listing/selection and resource operations.
pub const DASHBOARD_API: ApiChannel = ApiChannel::new("KubernetesDashboardApi");

/// Invokable: the webview's interest registration surface.
pub const CHANNEL_SUBSCRIPTIONS_API: ApiChannel = ApiChannel::new("ChannelSubscriptionsApi");

/// Event: live resource counts per context and kind.
pub const ACTIVE_RESOURCES_COUNT: EventChannel<ActiveResourcesCount> =
    EventChannel::new("ActiveResourcesCount");

/// Event: individual resource add/modify/delete updates.
pub const UPDATE_RESOURCE: EventChannel<ResourceUpdate> =
    EventChannel::new("KubernetesUpdateResource");

/// Event: kubeconfig context list snapshots.
pub const KUBERNETES_CONTEXTS: EventChannel<ContextsUpdate> =
    EventChannel::new("KubernetesContexts");

/// Event: streamed pod log chunks.
pub const POD_LOGS: EventChannel<LogChunk> = EventChannel::new("KubernetesPodLogs");
