//! In-process subscription registry.
//!
//! Listener and producer share the extension process here, so listeners are
//! plain callbacks and subscription lifetime is a scoped resource: the guard
//! returned by [`LocalSubscriptions::subscribe`] releases exactly that entry
//! when dropped. Entries are matched by an identity token, not by options
//! value — several listeners may share identical options.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::interest::{InterestChange, InterestNotifier};
use crate::options::distinct_options;

type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

struct LocalEntry {
    token: u64,
    options: Value,
    listener: Listener,
}

/// Callback-keyed registry for same-process consumers.
pub struct LocalSubscriptions {
    entries: Mutex<HashMap<String, Vec<LocalEntry>>>,
    next_token: AtomicU64,
    notifier: InterestNotifier,
}

impl LocalSubscriptions {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
            notifier: InterestNotifier::new(),
        }
    }

    /// Subscribe to interest changes across all channels.
    #[must_use]
    pub fn watch(&self) -> broadcast::Receiver<InterestChange> {
        self.notifier.watch()
    }

    /// Register `listener` for payloads dispatched on `channel`.
    ///
    /// Dropping the returned guard (or calling
    /// [`SubscriptionGuard::dispose`]) removes exactly this entry.
    #[must_use]
    pub fn subscribe<F>(
        self: &Arc<Self>,
        channel: &str,
        options: Value,
        listener: F,
    ) -> SubscriptionGuard
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        {
            let mut entries = self.entries.lock();
            entries
                .entry(channel.to_owned())
                .or_default()
                .push(LocalEntry {
                    token,
                    options,
                    listener: Arc::new(listener),
                });
        }
        debug!(channel, token, "local listener subscribed");
        self.notifier.notify(channel);
        SubscriptionGuard {
            registry: Arc::downgrade(self),
            channel: channel.to_owned(),
            token,
        }
    }

    /// Deliver `payload` synchronously to every current listener on
    /// `channel`, regardless of their options — choosing *what* to dispatch
    /// per parameterization is the producer's job.
    pub fn dispatch(&self, channel: &str, payload: &Value) {
        let targets: Vec<Listener> = {
            let entries = self.entries.lock();
            entries
                .get(channel)
                .map(|list| list.iter().map(|e| e.listener.clone()).collect())
                .unwrap_or_default()
        };
        for listener in targets {
            listener(payload);
        }
    }

    /// Whether the channel currently has at least one entry.
    #[must_use]
    pub fn has_subscribers(&self, channel: &str) -> bool {
        self.entries
            .lock()
            .get(channel)
            .is_some_and(|list| !list.is_empty())
    }

    /// Distinct, falsy-excluded options currently registered on `channel`.
    #[must_use]
    pub fn subscriptions(&self, channel: &str) -> Vec<Value> {
        let entries = self.entries.lock();
        match entries.get(channel) {
            Some(list) => distinct_options(list.iter().map(|e| &e.options)),
            None => Vec::new(),
        }
    }

    /// Drop every entry for `channel`; outstanding guards become no-ops.
    pub fn reset_subscribers(&self, channel: &str) {
        let changed = {
            let mut entries = self.entries.lock();
            let list = entries.entry(channel.to_owned()).or_default();
            let changed = !list.is_empty();
            list.clear();
            changed
        };
        debug!(channel, "reset local subscribers");
        if changed {
            self.notifier.notify(channel);
        }
    }

    fn remove(&self, channel: &str, token: u64) {
        let removed = {
            let mut entries = self.entries.lock();
            match entries.get_mut(channel) {
                Some(list) => {
                    let before = list.len();
                    list.retain(|e| e.token != token);
                    before != list.len()
                }
                None => false,
            }
        };
        if removed {
            debug!(channel, token, "local listener disposed");
            self.notifier.notify(channel);
        }
    }
}

impl Default for LocalSubscriptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped handle releasing one local subscription.
pub struct SubscriptionGuard {
    registry: Weak<LocalSubscriptions>,
    channel: String,
    token: u64,
}

impl SubscriptionGuard {
    /// Explicitly release the subscription (same as dropping the guard).
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.channel, self.token);
        }
    }
}
