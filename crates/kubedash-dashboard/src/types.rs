//! Payload types carried on the dashboard channels.
//!
//! Wire format is camelCase JSON; these shapes are part of the
//! extension/webview contract alongside the channel names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many resources of one kind are live in one context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveResourcesCount {
    /// Kube-context the count belongs to.
    pub context_name: String,
    /// Resource kind (e.g. `Pod`, `Deployment`).
    pub resource_kind: String,
    /// Current live count.
    pub count: u64,
}

/// What happened to a watched resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    /// The resource appeared.
    Added,
    /// The resource changed.
    Modified,
    /// The resource went away.
    Deleted,
}

/// One change to a watched resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUpdate {
    /// Kube-context the update came from.
    pub context_name: String,
    /// Resource kind.
    pub kind: String,
    /// Resource name.
    pub name: String,
    /// Namespace, absent for cluster-scoped kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// What happened.
    pub action: UpdateAction,
}

/// One entry of the kubeconfig context list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeContext {
    /// Context name.
    pub name: String,
    /// Cluster the context points at.
    pub cluster: String,
    /// User entry the context authenticates as.
    pub user: String,
    /// Default namespace, if the context sets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Whether this is the currently selected context.
    pub is_current: bool,
}

/// Full snapshot of the known contexts, pushed on every change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextsUpdate {
    /// All known contexts.
    pub contexts: Vec<KubeContext>,
}

/// Which pod a log subscription tails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogTarget {
    /// Pod name.
    pub pod_name: String,
    /// Pod namespace.
    pub namespace: String,
}

/// One chunk of pod log output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogChunk {
    /// Pod the chunk came from.
    pub pod_name: String,
    /// Pod namespace.
    pub namespace: String,
    /// When the chunk was read.
    pub timestamp: DateTime<Utc>,
    /// Raw log text.
    pub data: String,
}
