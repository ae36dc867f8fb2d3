//! Pulsar-backed event source.
//!
//! Shared subscription, so several daemons may consume the same topic. The
//! consumer runs in its own task: a message is acked only after its envelope
//! has been queued for the event loop. Undecodable payloads are nacked and
//! skipped.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use msync_schemas::EventEnvelope;
use pulsar::{Authentication, Consumer, Pulsar, SubType, TokioExecutor};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::EventSource;

pub const SUBSCRIPTION_NAME: &str = "UNWINDIA_TMT2";

/// Pause after a receive error so a broken connection does not spin.
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Decoded envelopes waiting for the event loop. Anything beyond this stays
/// unacked on the broker.
const HANDOFF_CAPACITY: usize = 1;

pub struct PulsarSource {
    rx: mpsc::Receiver<EventEnvelope>,
    pump: JoinHandle<()>,
    topic: String,
}

impl std::fmt::Debug for PulsarSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulsarSource")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl PulsarSource {
    /// Connect and subscribe. Failing here is a startup error.
    pub async fn connect(url: &str, topic: &str, auth_token: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = Pulsar::builder(url, TokioExecutor);
        if let Some(token) = auth_token {
            builder = builder.with_auth(Authentication {
                name: "token".to_string(),
                data: token.as_bytes().to_vec(),
            });
        }
        let client: Pulsar<TokioExecutor> = builder
            .build()
            .await
            .with_context(|| format!("connect to pulsar at {url}"))?;

        let consumer: Consumer<Vec<u8>, TokioExecutor> = client
            .consumer()
            .with_topic(topic)
            .with_consumer_name("msync-daemon")
            .with_subscription_type(SubType::Shared)
            .with_subscription(SUBSCRIPTION_NAME)
            .build()
            .await
            .with_context(|| format!("subscribe to {topic}"))?;

        info!(topic = %topic, subscription = SUBSCRIPTION_NAME, "started pulsar subscriber");
        let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
        let pump = tokio::spawn(consume(consumer, topic.to_string(), tx));
        Ok(Self {
            rx,
            pump,
            topic: topic.to_string(),
        })
    }
}

async fn consume(
    mut consumer: Consumer<Vec<u8>, TokioExecutor>,
    topic: String,
    tx: mpsc::Sender<EventEnvelope>,
) {
    loop {
        let msg = match consumer.next().await {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                error!(topic = %topic, error = %e, "error receiving message");
                tokio::time::sleep(RECEIVE_RETRY_DELAY).await;
                continue;
            }
            None => {
                info!(topic = %topic, "pulsar consumer closed");
                return;
            }
        };

        match serde_json::from_slice::<EventEnvelope>(&msg.payload.data) {
            Ok(env) => {
                // Left unacked if nobody takes it; the broker redelivers.
                if tx.send(env).await.is_err() {
                    debug!(topic = %topic, "event loop gone, stopping consumer");
                    return;
                }
                if let Err(e) = consumer.ack(&msg).await {
                    error!(topic = %topic, error = %e, "error acking message");
                }
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "undecodable message, nacked");
                if let Err(e) = consumer.nack(&msg).await {
                    error!(topic = %topic, error = %e, "error nacking message");
                }
            }
        }
    }
}

impl Drop for PulsarSource {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[async_trait]
impl EventSource for PulsarSource {
    async fn next(&mut self) -> Option<EventEnvelope> {
        self.rx.recv().await
    }
}
