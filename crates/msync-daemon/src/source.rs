//! Event source port and its adapters.
//!
//! A source yields decoded envelopes until it is exhausted. Acknowledgement
//! (where the transport has one) happens when the envelope is handed out,
//! not when it has been processed.

use async_trait::async_trait;
use msync_schemas::EventEnvelope;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[cfg(feature = "pulsar")]
mod pulsar_source;
#[cfg(feature = "pulsar")]
pub use pulsar_source::{PulsarSource, SUBSCRIPTION_NAME};

/// `next` is awaited inside `select!`; implementations should not hold an
/// envelope across an await point they can be dropped at.
#[async_trait]
pub trait EventSource: Send {
    /// Next envelope, or `None` once the source is closed for good.
    async fn next(&mut self) -> Option<EventEnvelope>;
}

/// In-process source backed by a bounded tokio channel.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<EventEnvelope>,
}

impl ChannelSource {
    /// Returns the sender half alongside the source.
    pub fn new(capacity: usize) -> (mpsc::Sender<EventEnvelope>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn next(&mut self) -> Option<EventEnvelope> {
        self.rx.recv().await
    }
}

/// Drains two sources, whichever is ready first. Ends when both are closed.
///
/// Each side runs in its own task and forwards into one channel, so an
/// envelope a source has already handed out is never dropped because the
/// other side won a race.
pub struct MergedSource {
    rx: mpsc::Receiver<EventEnvelope>,
    pumps: Vec<JoinHandle<()>>,
}

impl MergedSource {
    pub fn new<A, B>(a: A, b: B) -> Self
    where
        A: EventSource + 'static,
        B: EventSource + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let pumps = vec![spawn_pump(a, tx.clone()), spawn_pump(b, tx)];
        Self { rx, pumps }
    }
}

fn spawn_pump<S: EventSource + 'static>(mut source: S, tx: mpsc::Sender<EventEnvelope>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(env) = source.next().await {
            if tx.send(env).await.is_err() {
                return;
            }
        }
    })
}

impl Drop for MergedSource {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
    }
}

#[async_trait]
impl EventSource for MergedSource {
    async fn next(&mut self) -> Option<EventEnvelope> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn channel_source_ends_when_senders_drop() {
        let (tx, mut src) = ChannelSource::new(4);
        tx.send(EventEnvelope::new("UNWINDIA_MATCH_SERVER_READY", json!({ "id": "m1" })))
            .await
            .unwrap();
        drop(tx);

        let env = src.next().await.unwrap();
        assert_eq!(env.sub_type, "UNWINDIA_MATCH_SERVER_READY");
        assert!(src.next().await.is_none());
    }

    #[tokio::test]
    async fn merged_source_drains_both_sides() {
        let (tx_a, a) = ChannelSource::new(4);
        let (tx_b, b) = ChannelSource::new(4);
        let mut merged = MergedSource::new(a, b);

        tx_a.send(EventEnvelope::new("A", json!({}))).await.unwrap();
        tx_b.send(EventEnvelope::new("B", json!({}))).await.unwrap();
        drop(tx_a);
        drop(tx_b);

        let mut seen = Vec::new();
        while let Some(env) = merged.next().await {
            seen.push(env.sub_type);
        }
        seen.sort();
        assert_eq!(seen, vec!["A", "B"]);
    }

    /// Hands out an envelope only after a slow acknowledgement, like a
    /// broker consumer would.
    struct SlowAckSource {
        rx: mpsc::Receiver<EventEnvelope>,
    }

    #[async_trait]
    impl EventSource for SlowAckSource {
        async fn next(&mut self) -> Option<EventEnvelope> {
            let env = self.rx.recv().await?;
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Some(env)
        }
    }

    #[tokio::test]
    async fn merged_source_keeps_envelope_when_other_side_wins() {
        let (tx_http, http) = ChannelSource::new(4);
        let (tx_broker, rx_broker) = mpsc::channel(4);
        let mut merged = MergedSource::new(http, SlowAckSource { rx: rx_broker });

        tx_broker
            .send(EventEnvelope::new("BROKER", json!({})))
            .await
            .unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            tx_http.send(EventEnvelope::new("HTTP", json!({}))).await.unwrap();
        });

        let mut seen = Vec::new();
        for _ in 0..2 {
            let env = tokio::time::timeout(std::time::Duration::from_secs(2), merged.next())
                .await
                .expect("envelope should arrive")
                .expect("source still open");
            seen.push(env.sub_type);
        }
        assert_eq!(seen, vec!["HTTP", "BROKER"]);
    }
}
