// SPDX-License-Identifier: MIT
//! Best-effort event delivery to the analytics sink.
//!
//! Events are queued in memory and flushed to the sink's HTTP endpoint every
//! 60 seconds or when 20 events accumulate, whichever comes first.
//! Flush failures are logged and silently dropped — analytics never blocks
//! request handling or the client runtime.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::DaemonConfig;

const QUEUE_CAPACITY: usize = 200;

// ─── Event ────────────────────────────────────────────────────────────────────

/// A single analytics event, sink-agnostic.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsEvent {
    pub event: String,
    /// RFC 3339 emission timestamp.
    pub ts: String,
    pub properties: Value,
}

impl AnalyticsEvent {
    pub fn new(event: impl Into<String>, properties: Value) -> Self {
        Self {
            event: event.into(),
            ts: Utc::now().to_rfc3339(),
            properties,
        }
    }
}

// ─── Sender handle ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AnalyticsSender {
    tx: mpsc::Sender<AnalyticsEvent>,
}

impl AnalyticsSender {
    /// Queue an event for the next flush. Never blocks — drops silently if
    /// the queue is full.
    pub fn send(&self, event: AnalyticsEvent) {
        let _ = self.tx.try_send(event);
    }
}

/// Create a sender paired with its receiving end.
///
/// `spawn` wires the receiver to the flush task; tests keep it to observe
/// emissions directly.
pub fn channel(capacity: usize) -> (AnalyticsSender, mpsc::Receiver<AnalyticsEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (AnalyticsSender { tx }, rx)
}

// ─── Background flush task ────────────────────────────────────────────────────

/// Spawns the background flush task and returns an `AnalyticsSender`.
///
/// The task flushes on the configured timer or when the batch threshold is
/// reached. A final flush runs when the channel closes at shutdown.
pub fn spawn(config: Arc<DaemonConfig>) -> AnalyticsSender {
    let (sender, mut rx) = channel(QUEUE_CAPACITY);
    let sink_url = config.analytics.sink_url.clone();
    let interval_secs = config.analytics.flush_interval_secs.max(1);
    let batch_size = config.analytics.flush_batch_size.max(1);

    tokio::spawn(async move {
        let client = match reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                warn!("analytics: failed to build HTTP client, events will be dropped: {e:#}");
                // Drain so senders never observe a closed channel.
                while rx.recv().await.is_some() {}
                return;
            }
        };

        let mut buffer: Vec<AnalyticsEvent> = Vec::new();
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        interval.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                // Accumulate incoming events
                Some(event) = rx.recv() => {
                    buffer.push(event);
                    if buffer.len() >= batch_size {
                        flush(&client, &sink_url, &mut buffer).await;
                    }
                }
                // Periodic flush
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        flush(&client, &sink_url, &mut buffer).await;
                    }
                }
                // Channel closed (daemon shutting down)
                else => break,
            }
        }

        // Final flush on shutdown
        if !buffer.is_empty() {
            flush(&client, &sink_url, &mut buffer).await;
        }
    });

    sender
}

async fn flush(client: &reqwest::Client, sink_url: &str, buffer: &mut Vec<AnalyticsEvent>) {
    let events = std::mem::take(buffer);
    let count = events.len();
    let payload = serde_json::json!({ "events": events });

    match client.post(sink_url).json(&payload).send().await {
        Ok(resp) if resp.status().is_success() => {
            debug!("analytics: flushed {count} events");
        }
        Ok(resp) => {
            warn!("analytics: sink returned {}", resp.status());
        }
        Err(e) => {
            warn!("analytics: flush failed: {e:#}");
        }
    }
}
