//! Interest-driven pod log streaming.
//!
//! Same lifecycle as the resource watch manager, with one difference: log
//! subscriptions are meaningless without a target, so options that do not
//! decode into a [`LogTarget`] are warned about and skipped rather than
//! started as a default tail.

use std::sync::Arc;

use kubedash_subscriptions::{ChannelSubscriptions, RemoteDispatcher};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::channels::POD_LOGS;
use crate::config::DashboardConfig;
use crate::types::{LogChunk, LogTarget};
use crate::watchers::WatchHandle;

/// Collaborator seam to the pod log tailing machinery.
pub trait LogSource: Send + Sync {
    /// Start tailing one pod, beginning `tail_lines` back. Chunks flow into
    /// `sink` until the returned handle is dropped.
    fn tail(
        &self,
        target: &LogTarget,
        tail_lines: usize,
        sink: mpsc::UnboundedSender<LogChunk>,
    ) -> Box<dyn WatchHandle>;
}

/// Starts and stops pod log tails to match current subscriber interest.
pub struct PodLogStreamer {
    registry: Arc<ChannelSubscriptions>,
    dispatcher: Arc<RemoteDispatcher>,
    source: Arc<dyn LogSource>,
    config: DashboardConfig,
    active: Vec<(Value, Box<dyn WatchHandle>)>,
}

impl PodLogStreamer {
    /// Couple the registry, the dispatcher, and the upstream seam.
    pub fn new(
        registry: Arc<ChannelSubscriptions>,
        dispatcher: Arc<RemoteDispatcher>,
        source: Arc<dyn LogSource>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            source,
            config,
            active: Vec::new(),
        }
    }

    /// Run the reconcile loop. Picks up interest that existed before the
    /// call, then reacts to every change. Runs until aborted.
    pub async fn run(mut self) {
        let mut interest = self.registry.watch();
        let (sink, mut chunks) = mpsc::unbounded_channel();
        self.reconcile(&sink);

        loop {
            tokio::select! {
                change = interest.recv() => match change {
                    Ok(change) if change.channel == POD_LOGS.name() => {
                        self.reconcile(&sink);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(lagged = n, "interest notifications lagged, reconciling");
                        self.reconcile(&sink);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(chunk) = chunks.recv() => {
                    self.dispatcher.dispatch(&POD_LOGS, &chunk);
                }
            }
        }
    }

    /// Align running tails with the distinct targets currently wanted.
    fn reconcile(&mut self, sink: &mpsc::UnboundedSender<LogChunk>) {
        let channel = POD_LOGS.name();
        let wanted = self.registry.subscriptions(channel);

        let before = self.active.len();
        self.active
            .retain(|(options, _)| wanted.iter().any(|w| w == options));
        if self.active.len() != before {
            info!(
                channel,
                stopped = before - self.active.len(),
                "stopped log tails"
            );
        }

        for options in wanted {
            if self.active.iter().any(|(o, _)| *o == options) {
                continue;
            }
            let target: LogTarget = match serde_json::from_value(options.clone()) {
                Ok(target) => target,
                Err(e) => {
                    warn!(channel, %options, error = %e, "log subscription options are not a pod target");
                    continue;
                }
            };
            info!(channel, pod = target.pod_name, namespace = target.namespace, "starting log tail");
            let handle = self
                .source
                .tail(&target, self.config.log_tail_lines, sink.clone());
            self.active.push((options, handle));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
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
    struct FakeLogSource {
        tails: Mutex<Vec<(LogTarget, usize)>>,
        live: Arc<AtomicUsize>,
        sinks: Mutex<Vec<mpsc::UnboundedSender<LogChunk>>>,
    }

    impl FakeLogSource {
        fn live(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }

        fn emit(&self, chunk: LogChunk) {
            for sink in self.sinks.lock().iter() {
                let _ = sink.send(chunk.clone());
            }
        }
    }

    impl LogSource for FakeLogSource {
        fn tail(
            &self,
            target: &LogTarget,
            tail_lines: usize,
            sink: mpsc::UnboundedSender<LogChunk>,
        ) -> Box<dyn WatchHandle> {
            self.tails.lock().push((target.clone(), tail_lines));
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
        source: Arc<FakeLogSource>,
        transport: Arc<RecordingTransport>,
    }

    fn spawn_streamer(config: DashboardConfig) -> (Fixture, tokio::task::JoinHandle<()>) {
        let transport = Arc::new(RecordingTransport::default());
        let extension = Arc::new(RpcExtension::new(transport.clone()));
        let registry = Arc::new(ChannelSubscriptions::new());
        let dispatcher = Arc::new(RemoteDispatcher::new(extension, registry.clone()));
        let source = Arc::new(FakeLogSource::default());
        let streamer = PodLogStreamer::new(
            registry.clone(),
            dispatcher,
            source.clone(),
            config,
        );
        let task = tokio::spawn(streamer.run());
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

    fn target_options(pod: &str) -> Value {
        json!({"podName": pod, "namespace": "default"})
    }

    #[tokio::test(start_paused = true)]
    async fn subscription_starts_a_tail_with_configured_lines() {
        let (fx, task) = spawn_streamer(DashboardConfig { log_tail_lines: 25 });
        fx.registry.subscribe_to_channel(
            POD_LOGS.name(),
            target_options("web-0"),
            SubscriberUid::new(1),
        );

        wait_until(|| fx.source.live() == 1).await;
        let tails = fx.source.tails.lock().clone();
        assert_eq!(tails[0].0.pod_name, "web-0");
        assert_eq!(tails[0].1, 25);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn chunks_flow_to_subscribed_webviews() {
        let (fx, task) = spawn_streamer(DashboardConfig::default());
        fx.registry.subscribe_to_channel(
            POD_LOGS.name(),
            target_options("web-0"),
            SubscriberUid::new(1),
        );
        wait_until(|| fx.source.live() == 1).await;

        fx.source.emit(LogChunk {
            pod_name: "web-0".into(),
            namespace: "default".into(),
            timestamp: Utc::now(),
            data: "ready\n".into(),
        });

        wait_until(|| !fx.transport.sent.lock().is_empty()).await;
        let sent = fx.transport.sent.lock().clone();
        assert_eq!(sent[0]["channel"], POD_LOGS.name());
        assert_eq!(sent[0]["body"]["data"], "ready\n");
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_stops_the_tail() {
        let (fx, task) = spawn_streamer(DashboardConfig::default());
        fx.registry.subscribe_to_channel(
            POD_LOGS.name(),
            target_options("web-0"),
            SubscriberUid::new(1),
        );
        wait_until(|| fx.source.live() == 1).await;

        fx.registry
            .unsubscribe_from_channel(POD_LOGS.name(), SubscriberUid::new(1));
        wait_until(|| fx.source.live() == 0).await;
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_target_options_are_skipped() {
        let (fx, task) = spawn_streamer(DashboardConfig::default());
        fx.registry.subscribe_to_channel(
            POD_LOGS.name(),
            json!({"nonsense": true}),
            SubscriberUid::new(1),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fx.source.live(), 0);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn two_pods_get_two_tails() {
        let (fx, task) = spawn_streamer(DashboardConfig::default());
        fx.registry.subscribe_to_channel(
            POD_LOGS.name(),
            target_options("web-0"),
            SubscriberUid::new(1),
        );
        fx.registry.subscribe_to_channel(
            POD_LOGS.name(),
            target_options("web-1"),
            SubscriberUid::new(2),
        );

        wait_until(|| fx.source.live() == 2).await;
        task.abort();
    }
}
