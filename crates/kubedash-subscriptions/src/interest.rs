//! Interest-change notifications.
//!
//! Every mutation of a channel's interest set (subscribe, effective
//! unsubscribe, non-empty reset) emits an [`InterestChange`]. Producers use
//! the stream to start upstream work when a channel gains its first
//! subscriber and to stop when the last one goes away; they read the
//! registry for the current state rather than trusting the event payload.

use tokio::sync::broadcast;

/// Capacity of the notification ring; laggards drop old changes, which is
/// safe because receivers re-read registry state on every wakeup.
const CHANNEL_CAPACITY: usize = 64;

/// A channel's interest set changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterestChange {
    /// Wire name of the affected channel.
    pub channel: String,
}

/// Shared notification fan-out embedded in both registry variants.
pub(crate) struct InterestNotifier {
    tx: broadcast::Sender<InterestChange>,
}

impl InterestNotifier {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to interest changes.
    pub(crate) fn watch(&self) -> broadcast::Receiver<InterestChange> {
        self.tx.subscribe()
    }

    /// Announce a change; nobody listening is fine.
    pub(crate) fn notify(&self, channel: &str) {
        let _ = self.tx.send(InterestChange {
            channel: channel.to_owned(),
        });
    }
}
