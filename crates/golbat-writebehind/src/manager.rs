// Queue manager
//
// Owns every registered queue, runs their dispatch loops, logs a status line
// every 30 seconds and coordinates the shutdown drain.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// Per-queue counters since the last read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QueueMetrics {
    pub batch_count: u64,
    pub batch_entry_count: u64,
    pub batch_avg_write_ms: f64,
    pub batch_avg_latency_ms: f64,
}

/// Anything the manager can run and drain.
#[async_trait]
pub trait Flushable: Send + Sync {
    async fn process_loop(&self, token: CancellationToken);
    async fn flush(&self, token: &CancellationToken);
    fn size(&self) -> usize;
    fn batch_size(&self) -> usize;
    fn name(&self) -> &str;
    fn get_and_reset_metrics(&self) -> QueueMetrics;
}

/// Aggregated view across queues, as printed in the status line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatusSummary {
    pub pending: usize,
    pub in_batches: usize,
    pub entries_written: u64,
    pub batches_written: u64,
    pub avg_write_ms: f64,
    pub avg_latency_ms: f64,
}

impl StatusSummary {
    /// Combine per-queue snapshots. Averages are weighted by batch count.
    pub fn aggregate(queues: &[(usize, usize, QueueMetrics)]) -> Self {
        let mut summary = StatusSummary::default();
        let mut write_total = 0.0;
        let mut latency_total = 0.0;
        let mut latency_batches = 0u64;

        for (pending, batched, metrics) in queues {
            summary.pending += pending;
            summary.in_batches += batched;
            summary.entries_written += metrics.batch_entry_count;
            summary.batches_written += metrics.batch_count;
            write_total += metrics.batch_avg_write_ms * metrics.batch_count as f64;
            if metrics.batch_avg_latency_ms > 0.0 {
                latency_total += metrics.batch_avg_latency_ms * metrics.batch_count as f64;
                latency_batches += metrics.batch_count;
            }
        }

        if summary.batches_written > 0 {
            summary.avg_write_ms = write_total / summary.batches_written as f64;
        }
        if latency_batches > 0 {
            summary.avg_latency_ms = latency_total / latency_batches as f64;
        }
        summary
    }

    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.in_batches == 0 && self.batches_written == 0
    }
}

pub struct QueueManager {
    queues: Vec<Arc<dyn Flushable>>,
    token: Mutex<Option<CancellationToken>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueManager {
    pub fn new() -> Self {
        Self {
            queues: Vec::new(),
            token: Mutex::new(None),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Warn when the configured writer count would starve request-path queries.
    pub fn check_pool_budget(worker_count: usize, max_pool: usize) {
        if worker_count > max_pool / 2 {
            warn!(
                "Write-behind worker count ({}) exceeds half the database pool ({}); request-path queries may starve",
                worker_count, max_pool
            );
        }
    }

    pub fn register(&mut self, queue: Arc<dyn Flushable>) {
        self.queues.push(queue);
    }

    pub fn queues(&self) -> &[Arc<dyn Flushable>] {
        &self.queues
    }

    /// Spawn every queue loop plus the status logger under a child of `parent`.
    pub fn start(&self, parent: &CancellationToken) {
        let token = parent.child_token();
        let mut handles = self.handles.lock();

        for queue in &self.queues {
            let queue = Arc::clone(queue);
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                queue.process_loop(token).await;
            }));
        }

        let queues = self.queues.clone();
        let status_token = token.clone();
        handles.push(tokio::spawn(async move {
            status_loop(queues, status_token).await;
        }));

        *self.token.lock() = Some(token);
    }

    /// Cancel the loops and wait for each one to finish its final flush.
    pub async fn stop(&self) {
        if let Some(token) = self.token.lock().take() {
            token.cancel();
        }
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Write-behind loop ended abnormally: {}", e);
            }
        }
        info!("Write-behind manager stopped");
    }

    /// Drain every queue, including entries still inside their delay window.
    pub async fn flush(&self) {
        let token = CancellationToken::new();
        for queue in &self.queues {
            let size = queue.size() + queue.batch_size();
            if size > 0 {
                info!("Write-behind flushing {} {} entries", size, queue.name());
            }
            queue.flush(&token).await;
        }
        info!("Write-behind flush complete");
    }

    pub fn total_size(&self) -> usize {
        self.queues
            .iter()
            .map(|queue| queue.size() + queue.batch_size())
            .sum()
    }

    pub fn collect_status(&self) -> StatusSummary {
        collect_status(&self.queues)
    }
}

fn collect_status(queues: &[Arc<dyn Flushable>]) -> StatusSummary {
    let snapshots: Vec<(usize, usize, QueueMetrics)> = queues
        .iter()
        .map(|queue| {
            (
                queue.size(),
                queue.batch_size(),
                queue.get_and_reset_metrics(),
            )
        })
        .collect();
    StatusSummary::aggregate(&snapshots)
}

async fn status_loop(queues: Vec<Arc<dyn Flushable>>, token: CancellationToken) {
    let mut ticker = tokio::time::interval(STATUS_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {
                let status = collect_status(&queues);
                if status.is_idle() {
                    continue;
                }
                info!(
                    "Write-behind: {} pending, {} in batches | {} entries in {} batches (avg write: {:.1}ms, avg latency: {:.1}ms)",
                    status.pending,
                    status.in_batches,
                    status.entries_written,
                    status.batches_written,
                    status.avg_write_ms,
                    status.avg_latency_ms
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_weights_by_batch_count() {
        let summary = StatusSummary::aggregate(&[
            (
                3,
                1,
                QueueMetrics {
                    batch_count: 1,
                    batch_entry_count: 10,
                    batch_avg_write_ms: 10.0,
                    batch_avg_latency_ms: 100.0,
                },
            ),
            (
                2,
                0,
                QueueMetrics {
                    batch_count: 3,
                    batch_entry_count: 30,
                    batch_avg_write_ms: 2.0,
                    batch_avg_latency_ms: 0.0,
                },
            ),
        ]);

        assert_eq!(summary.pending, 5);
        assert_eq!(summary.in_batches, 1);
        assert_eq!(summary.entries_written, 40);
        assert_eq!(summary.batches_written, 4);
        assert!((summary.avg_write_ms - 4.0).abs() < 1e-9);
        assert!((summary.avg_latency_ms - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_summary_is_idle() {
        assert!(StatusSummary::aggregate(&[]).is_idle());
    }
}
