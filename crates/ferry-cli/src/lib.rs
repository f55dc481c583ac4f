//! Shared pieces of the `ferry` binary: tracing setup and the producer/consumer
//! demo.

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use ferry_core::QueueConfig;
use ferry_worker::{CancellableQueue, ItemHandler, QueueStats};

/// Demo parameters. Defaults reproduce the classic walkthrough: a queue of 10
/// fed 15 items every 50ms by a consumer that needs 100ms per item.
#[derive(Clone, Debug)]
pub struct DemoOptions {
    pub name: String,
    pub capacity: usize,
    pub items: usize,
    pub push_interval: Duration,
    pub handler_delay: Duration,
    pub grace: Duration,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}

impl DemoOptions {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            name: config.name.clone(),
            capacity: config.capacity,
            items: 15,
            push_interval: Duration::from_millis(50),
            handler_delay: Duration::from_millis(100),
            grace: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub processed: Vec<String>,
    pub rejected: Vec<Rejection>,
    pub stats: QueueStats,
}

/// A push that came back, with the queue's reason.
#[derive(Debug, Serialize)]
pub struct Rejection {
    pub item: String,
    pub reason: String,
}

/// Consumer that takes `delay` per item and remembers what it saw.
struct SlowConsumer {
    delay: Duration,
    processed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ItemHandler<String> for SlowConsumer {
    async fn handle(&self, item: String) -> anyhow::Result<()> {
        tracing::info!(item = %item, "Processing item");
        tokio::time::sleep(self.delay).await;
        self.processed.lock().await.push(item);
        Ok(())
    }
}

/// Push `items` strings at a fixed interval into a queue drained by a slow
/// consumer, wait `grace`, then stop the queue and report what happened.
pub async fn run_demo(options: &DemoOptions) -> anyhow::Result<DemoReport> {
    let processed = Arc::new(Mutex::new(Vec::new()));
    let queue = CancellableQueue::with_name(options.name.clone());
    queue
        .start(
            options.capacity,
            SlowConsumer {
                delay: options.handler_delay,
                processed: Arc::clone(&processed),
            },
        )
        .context("Failed to start demo queue")?;

    let mut rejected = Vec::new();
    for i in 0..options.items {
        let item = format!("item-{i}");
        if let Err(e) = queue.try_push(item) {
            tracing::warn!(item = i, reason = %e, "Item rejected");
            rejected.push(Rejection {
                reason: e.to_string(),
                item: e.into_inner(),
            });
        }
        tokio::time::sleep(options.push_interval).await;
    }

    tokio::time::sleep(options.grace).await;
    queue.stop();

    let processed = processed.lock().await.clone();
    Ok(DemoReport {
        processed,
        rejected,
        stats: queue.stats(),
    })
}

/// Initialize tracing for the binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(capacity: usize, items: usize, handler_delay_ms: u64) -> DemoOptions {
        DemoOptions {
            name: "demo-test".to_string(),
            capacity,
            items,
            push_interval: Duration::ZERO,
            handler_delay: Duration::from_millis(handler_delay_ms),
            grace: Duration::from_millis(200),
        }
    }

    #[test]
    fn defaults_match_walkthrough() {
        let options = DemoOptions::default();
        assert_eq!(options.capacity, 10);
        assert_eq!(options.items, 15);
        assert_eq!(options.push_interval, Duration::from_millis(50));
        assert_eq!(options.handler_delay, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn roomy_queue_processes_everything_in_order() {
        let report = run_demo(&quick(10, 3, 0)).await.unwrap();
        assert!(report.rejected.is_empty());
        assert_eq!(report.processed, vec!["item-0", "item-1", "item-2"]);
        assert!(!report.stats.running);
        assert_eq!(report.stats.completed, 3);
    }

    #[tokio::test]
    async fn slow_consumer_causes_rejections() {
        let report = run_demo(&quick(1, 4, 500)).await.unwrap();
        assert!(report.rejected.len() >= 2);
        assert!(report
            .rejected
            .iter()
            .all(|r| r.reason == "queue is full" && r.item.starts_with("item-")));
        assert_eq!(
            report.stats.accepted + report.stats.rejected_full,
            4,
            "every push is either accepted or rejected as full"
        );
        assert!(report.processed.len() <= 1);
    }

    #[tokio::test]
    async fn zero_capacity_is_an_error() {
        let err = run_demo(&quick(0, 1, 0)).await.unwrap_err();
        assert!(err.to_string().contains("Failed to start demo queue"));
    }
}
