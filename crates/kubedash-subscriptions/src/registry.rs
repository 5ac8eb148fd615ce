//! Cross-process subscription registry.
//!
//! Webview listeners live in another process, so they are tracked by a
//! caller-supplied uid rather than a callable reference. Usage errors are
//! deliberately lenient: a duplicate uid warns and leaves both entries, an
//! unknown unsubscribe warns and does nothing. Callers own uid uniqueness;
//! the warnings are developer-console signals, never failures.

use std::collections::HashMap;

use kubedash_core::SubscriberUid;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::interest::{InterestChange, InterestNotifier};
use crate::options::distinct_options;

/// One active subscription on one channel.
#[derive(Clone, Debug)]
pub struct SubscriberEntry {
    /// Caller-supplied identity of the subscription.
    pub uid: SubscriberUid,
    /// Arbitrary parameterization; falsy means none.
    pub options: Value,
}

/// Uid-keyed registry of webview interest, one instance per extension
/// process.
pub struct ChannelSubscriptions {
    entries: Mutex<HashMap<String, Vec<SubscriberEntry>>>,
    notifier: InterestNotifier,
}

impl Default for ChannelSubscriptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelSubscriptions {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            notifier: InterestNotifier::new(),
        }
    }

    /// Subscribe to interest changes across all channels.
    #[must_use]
    pub fn watch(&self) -> broadcast::Receiver<InterestChange> {
        self.notifier.watch()
    }

    /// Record interest of `uid` in `channel` with `options`.
    ///
    /// A uid already active on the channel is a caller bug: it is warned
    /// about and the duplicate entry is kept anyway.
    pub fn subscribe_to_channel(&self, channel: &str, options: Value, uid: SubscriberUid) {
        {
            let mut entries = self.entries.lock();
            let list = entries.entry(channel.to_owned()).or_default();
            if list.iter().any(|e| e.uid == uid) {
                warn!(
                    channel,
                    uid = uid.value(),
                    "subscribe with a uid already active on this channel"
                );
            }
            list.push(SubscriberEntry { uid, options });
            debug!(channel, uid = uid.value(), total = list.len(), "subscribed");
        }
        self.notifier.notify(channel);
    }

    /// Remove `uid`'s interest in `channel`.
    ///
    /// Unknown uids are warned about and absorbed as a no-op.
    pub fn unsubscribe_from_channel(&self, channel: &str, uid: SubscriberUid) {
        let removed = {
            let mut entries = self.entries.lock();
            match entries.get_mut(channel) {
                Some(list) => {
                    let before = list.len();
                    list.retain(|e| e.uid != uid);
                    before != list.len()
                }
                None => false,
            }
        };
        if removed {
            debug!(channel, uid = uid.value(), "unsubscribed");
            self.notifier.notify(channel);
        } else {
            warn!(
                channel,
                uid = uid.value(),
                "unsubscribe for a uid not subscribed to this channel"
            );
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

    /// Drop every entry for `channel`.
    ///
    /// Used when a webview reconnects and re-establishes its subscriptions
    /// from scratch, so stale uids cannot accumulate across reconnects.
    pub fn reset_subscribers(&self, channel: &str) {
        let changed = {
            let mut entries = self.entries.lock();
            let list = entries.entry(channel.to_owned()).or_default();
            let changed = !list.is_empty();
            list.clear();
            changed
        };
        debug!(channel, "reset subscribers");
        if changed {
            self.notifier.notify(channel);
        }
    }
}
