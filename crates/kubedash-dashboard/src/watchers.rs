//! Interest-driven resource watching.
//!
//! The manager owns no cluster machinery. It watches the subscription
//! registry: when `KubernetesUpdateResource` gains its first subscriber it
//! starts upstream work through the [`ResourceSource`] seam — one watch per
//! distinct options value — and when the last subscriber goes away it drops
//! the handles, releasing the upstream resources. Every update is forwarded
//! through the dispatcher, which fans out to whoever is subscribed; live
//! counts per context and kind ride along on `ActiveResourcesCount`.

use std::collections::HashMap;
use std::sync::Arc;

use kubedash_subscriptions::{ChannelSubscriptions, RemoteDispatcher};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::channels::{ACTIVE_RESOURCES_COUNT, UPDATE_RESOURCE};
use crate::types::{ActiveResourcesCount, ResourceUpdate, UpdateAction};

/// Handle to one running piece of upstream work; dropping it stops the work
/// and releases its resources.
pub trait WatchHandle: Send {}

/// Collaborator seam to the Kubernetes informer machinery.
pub trait ResourceSource: Send + Sync {
    /// Start watching with one distinct parameterization. Updates flow into
    /// `sink` until the returned handle is dropped.
    fn start(
        &self,
        options: &Value,
        sink: mpsc::UnboundedSender<ResourceUpdate>,
    ) -> Box<dyn WatchHandle>;
}

/// Starts and stops resource watches to match current subscriber interest.
pub struct ResourceWatchManager {
    registry: Arc<ChannelSubscriptions>,
    dispatcher: Arc<RemoteDispatcher>,
    source: Arc<dyn ResourceSource>,
    active: Vec<(Value, Box<dyn WatchHandle>)>,
    counts: HashMap<(String, String), u64>,
}

impl ResourceWatchManager {
    /// Couple the registry, the dispatcher, and the upstream seam.
    pub fn new(
        registry: Arc<ChannelSubscriptions>,
        dispatcher: Arc<RemoteDispatcher>,
        source: Arc<dyn ResourceSource>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            source,
            active: Vec::new(),
            counts: HashMap::new(),
        }
    }

    /// Run the reconcile loop. Picks up interest that existed before the
    /// call, then reacts to every change. Runs until aborted.
    pub async fn run(mut self) {
        let mut interest = self.registry.watch();
        let (sink, mut updates) = mpsc::unbounded_channel();
        self.reconcile(&sink);

        loop {
            tokio::select! {
                change = interest.recv() => match change {
                    Ok(change) if change.channel == UPDATE_RESOURCE.name() => {
                        self.reconcile(&sink);
                    }
                    Ok(_) => {}
                    // Dropped notifications only mean state must be re-read.
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(lagged = n, "interest notifications lagged, reconciling");
                        self.reconcile(&sink);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(update) = updates.recv() => {
                    self.forward(update);
                }
            }
        }
    }

    /// Align running watches with the distinct options currently wanted.
    fn reconcile(&mut self, sink: &mpsc::UnboundedSender<ResourceUpdate>) {
        let channel = UPDATE_RESOURCE.name();
        let mut wanted = self.registry.subscriptions(channel);
        // Subscribers whose options are all falsy still want the default
        // (unparameterized) watch.
        if wanted.is_empty() && self.registry.has_subscribers(channel) {
            wanted.push(Value::Null);
        }

        let before = self.active.len();
        self.active
            .retain(|(options, _)| wanted.iter().any(|w| w == options));
        if self.active.len() != before {
            info!(
                channel,
                stopped = before - self.active.len(),
                "stopped resource watches"
            );
        }

        for options in wanted {
            if !self.active.iter().any(|(o, _)| *o == options) {
                info!(channel, %options, "starting resource watch");
                let handle = self.source.start(&options, sink.clone());
                self.active.push((options, handle));
            }
        }
    }

    /// Forward one upstream update and its refreshed count.
    fn forward(&mut self, update: ResourceUpdate) {
        let key = (update.context_name.clone(), update.kind.clone());
        let count = self.counts.entry(key).or_insert(0);
        match update.action {
            UpdateAction::Added => *count += 1,
            UpdateAction::Deleted => *count = count.saturating_sub(1),
            UpdateAction::Modified => {}
        }
        let snapshot = ActiveResourcesCount {
            context_name: update.context_name.clone(),
            resource_kind: update.kind.clone(),
            count: *count,
        };
        self.dispatcher.dispatch(&UPDATE_RESOURCE, &update);
        self.dispatcher.dispatch(&ACTIVE_RESOURCES_COUNT, &snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubedash_core::SubscriberUid;
    use kubedash_rpc::extension::RpcExtension;
    use kubedash_rpc::transport::{RawTransport, TransportError};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeHandle {
        live: Arc<AtomicUsize>,
    }

    impl WatchHandle for FakeHandle {}

    impl Drop for FakeHandle {
        fn drop(&mut self) {
            let _ = self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct FakeSource {
        started_with: Mutex<Vec<Value>>,
        live: Arc<AtomicUsize>,
        sinks: Mutex<Vec<mpsc::UnboundedSender<ResourceUpdate>>>,
    }

    impl FakeSource {
        fn live(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }

        fn emit(&self, update: ResourceUpdate) {
            for sink in self.sinks.lock().iter() {
                let _ = sink.send(update.clone());
            }
        }
    }

    impl ResourceSource for FakeSource {
        fn start(
            &self,
            options: &Value,
            sink: mpsc::UnboundedSender<ResourceUpdate>,
        ) -> Box<dyn WatchHandle> {
            self.started_with.lock().push(options.clone());
            self.sinks.lock().push(sink);
            let _ = self.live.fetch_add(1, Ordering::SeqCst);
            Box::new(FakeHandle {
                live: self.live.clone(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<Value>>,
    }

    impl RawTransport for RecordingTransport {
        fn post(&self, message: Value) -> Result<(), TransportError> {
            self.sent.lock().push(message);
            Ok(())
        }
    }

    struct Fixture {
        registry: Arc<ChannelSubscriptions>,
        source: Arc<FakeSource>,
        transport: Arc<RecordingTransport>,
    }

    fn spawn_manager() -> (Fixture, tokio::task::JoinHandle<()>) {
        let transport = Arc::new(RecordingTransport::default());
        let extension = Arc::new(RpcExtension::new(transport.clone()));
        let registry = Arc::new(ChannelSubscriptions::new());
        let dispatcher = Arc::new(RemoteDispatcher::new(extension, registry.clone()));
        let source = Arc::new(FakeSource::default());
        let manager =
            ResourceWatchManager::new(registry.clone(), dispatcher, source.clone());
        let task = tokio::spawn(manager.run());
        (
            Fixture {
                registry,
                source,
                transport,
            },
            task,
        )
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    fn update(kind: &str, name: &str, action: UpdateAction) -> ResourceUpdate {
        ResourceUpdate {
            context_name: "kind-dev".into(),
            kind: kind.into(),
            name: name.into(),
            namespace: Some("default".into()),
            action,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_subscriber_starts_a_watch() {
        let (fx, task) = spawn_manager();
        fx.registry.subscribe_to_channel(
            UPDATE_RESOURCE.name(),
            json!({"ns": "default"}),
            SubscriberUid::new(1),
        );

        wait_until(|| fx.source.live() == 1).await;
        assert_eq!(
            fx.source.started_with.lock().as_slice(),
            &[json!({"ns": "default"})]
        );
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn identical_options_share_one_watch() {
        let (fx, task) = spawn_manager();
        fx.registry.subscribe_to_channel(
            UPDATE_RESOURCE.name(),
            json!({"ns": "default"}),
            SubscriberUid::new(1),
        );
        fx.registry.subscribe_to_channel(
            UPDATE_RESOURCE.name(),
            json!({"ns": "default"}),
            SubscriberUid::new(2),
        );

        wait_until(|| fx.source.live() == 1).await;
        // Give the loop a chance to over-start; it must not.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fx.source.live(), 1);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_options_get_distinct_watches() {
        let (fx, task) = spawn_manager();
        fx.registry.subscribe_to_channel(
            UPDATE_RESOURCE.name(),
            json!({"ns": "a"}),
            SubscriberUid::new(1),
        );
        fx.registry.subscribe_to_channel(
            UPDATE_RESOURCE.name(),
            json!({"ns": "b"}),
            SubscriberUid::new(2),
        );

        wait_until(|| fx.source.live() == 2).await;
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn last_unsubscribe_stops_the_watch() {
        let (fx, task) = spawn_manager();
        fx.registry.subscribe_to_channel(
            UPDATE_RESOURCE.name(),
            json!({"ns": "a"}),
            SubscriberUid::new(1),
        );
        wait_until(|| fx.source.live() == 1).await;

        fx.registry
            .unsubscribe_from_channel(UPDATE_RESOURCE.name(), SubscriberUid::new(1));
        wait_until(|| fx.source.live() == 0).await;
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn falsy_options_still_start_the_default_watch() {
        let (fx, task) = spawn_manager();
        fx.registry.subscribe_to_channel(
            UPDATE_RESOURCE.name(),
            Value::Null,
            SubscriberUid::new(1),
        );

        wait_until(|| fx.source.live() == 1).await;
        assert_eq!(fx.source.started_with.lock().as_slice(), &[Value::Null]);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn other_channels_do_not_trigger_watches() {
        let (fx, task) = spawn_manager();
        fx.registry
            .subscribe_to_channel("SomethingElse", json!(1), SubscriberUid::new(1));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fx.source.live(), 0);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn updates_are_forwarded_with_counts() {
        let (fx, task) = spawn_manager();
        fx.registry.subscribe_to_channel(
            UPDATE_RESOURCE.name(),
            json!({"ns": "default"}),
            SubscriberUid::new(1),
        );
        fx.registry.subscribe_to_channel(
            ACTIVE_RESOURCES_COUNT.name(),
            json!(true),
            SubscriberUid::new(2),
        );
        wait_until(|| fx.source.live() == 1).await;

        fx.source.emit(update("Pod", "web-0", UpdateAction::Added));
        fx.source.emit(update("Pod", "web-1", UpdateAction::Added));
        fx.source.emit(update("Pod", "web-0", UpdateAction::Deleted));

        wait_until(|| fx.transport.sent.lock().len() == 6).await;
        let sent = fx.transport.sent.lock().clone();
        let counts: Vec<u64> = sent
            .iter()
            .filter(|v| v["channel"] == ACTIVE_RESOURCES_COUNT.name())
            .map(|v| v["body"]["count"].as_u64().unwrap())
            .collect();
        assert_eq!(counts, vec![1, 2, 1]);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribe_after_stop_restarts_upstream() {
        let (fx, task) = spawn_manager();
        fx.registry.subscribe_to_channel(
            UPDATE_RESOURCE.name(),
            json!({"ns": "a"}),
            SubscriberUid::new(1),
        );
        wait_until(|| fx.source.live() == 1).await;
        fx.registry
            .unsubscribe_from_channel(UPDATE_RESOURCE.name(), SubscriberUid::new(1));
        wait_until(|| fx.source.live() == 0).await;

        fx.registry.subscribe_to_channel(
            UPDATE_RESOURCE.name(),
            json!({"ns": "a"}),
            SubscriberUid::new(2),
        );
        wait_until(|| fx.source.live() == 1).await;
        assert_eq!(fx.source.started_with.lock().len(), 2);
        task.abort();
    }
}
