// Periodic accumulator
//
// For high-churn rows where only the freshest value matters (S2 cells,
// weather). Snapshots are kept per key, the one with the later `updated`
// timestamp wins, and everything is written in key-ordered chunks on a fixed
// interval. Writes here bypass the shared limiter.

use async_trait::async_trait;
use golbat_stats::SharedStats;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::manager::{Flushable, QueueMetrics};
use crate::queue::{write_with_retry, BatchWriter, KeyFn};

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_CHUNK_SIZE: usize = 100;

pub type UpdatedFn<T> = Arc<dyn Fn(&T) -> i64 + Send + Sync>;

pub struct AccumulatorConfig<K, T> {
    pub name: String,
    pub chunk_size: usize,
    pub flush_interval: Duration,
    pub startup_delay: Duration,
    pub writer: Arc<dyn BatchWriter<T>>,
    pub key_fn: KeyFn<K, T>,
    pub updated_fn: UpdatedFn<T>,
    pub stats: SharedStats,
}

#[derive(Default)]
struct AccumulatorMetrics {
    batch_count: u64,
    entry_count: u64,
    write_secs: f64,
}

struct Inner<K, T> {
    config: AccumulatorConfig<K, T>,
    entries: Mutex<BTreeMap<K, T>>,
    metrics: Mutex<AccumulatorMetrics>,
    start_time: Instant,
    warmup_complete: AtomicBool,
}

pub struct Accumulator<K, T> {
    inner: Arc<Inner<K, T>>,
}

impl<K, T> Clone for Accumulator<K, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, T> Accumulator<K, T>
where
    K: Ord + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn new(mut config: AccumulatorConfig<K, T>) -> Self {
        if config.chunk_size == 0 {
            config.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        if config.flush_interval.is_zero() {
            config.flush_interval = DEFAULT_FLUSH_INTERVAL;
        }
        Self {
            inner: Arc::new(Inner {
                config,
                entries: Mutex::new(BTreeMap::new()),
                metrics: Mutex::new(AccumulatorMetrics::default()),
                start_time: Instant::now(),
                warmup_complete: AtomicBool::new(false),
            }),
        }
    }

    /// Keep `data` unless a snapshot with a later `updated` is already held.
    pub fn accumulate(&self, data: T) {
        let config = &self.inner.config;
        let key = (config.key_fn)(&data);
        let mut entries = self.inner.entries.lock();
        match entries.get_mut(&key) {
            Some(existing) => {
                if (config.updated_fn)(&data) >= (config.updated_fn)(existing) {
                    *existing = data;
                }
                config.stats.inc_write_behind_squashed(&config.name);
            }
            None => {
                entries.insert(key, data);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn process_loop(&self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.inner.config.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Write-behind [{}] shutting down, flushing...", self.inner.config.name);
                    self.flush_all().await;
                    return;
                }
                _ = ticker.tick() => {
                    if self.check_warmup() {
                        self.flush_all().await;
                    }
                }
            }
        }
    }

    fn check_warmup(&self) -> bool {
        if self.inner.warmup_complete.load(Ordering::Acquire) {
            return true;
        }
        if self.inner.start_time.elapsed() < self.inner.config.startup_delay {
            return false;
        }
        if !self.inner.warmup_complete.swap(true, Ordering::AcqRel) {
            info!(
                "Write-behind [{}] warmup complete, processing {} queued writes",
                self.inner.config.name,
                self.len()
            );
        }
        true
    }

    /// Write everything currently held, in chunks.
    pub async fn flush_all(&self) {
        let config = &self.inner.config;
        let rows: Vec<T> = std::mem::take(&mut *self.inner.entries.lock())
            .into_values()
            .collect();
        if rows.is_empty() {
            return;
        }

        for chunk in rows.chunks(config.chunk_size) {
            let start = Instant::now();
            let result = write_with_retry(&config.name, config.writer.as_ref(), chunk).await;
            let secs = start.elapsed().as_secs_f64();

            match result {
                Ok(()) => {
                    config
                        .stats
                        .inc_write_behind_writes(&config.name, chunk.len() as u64);
                    config.stats.inc_write_behind_batches(&config.name);
                    config
                        .stats
                        .observe_write_behind_batch_size(&config.name, chunk.len() as f64);
                    config
                        .stats
                        .observe_write_behind_batch_time(&config.name, secs);
                }
                Err(e) => {
                    config.stats.inc_write_behind_errors(&config.name);
                    error!(
                        "Write-behind [{}] flush error ({} entries): {}",
                        config.name,
                        chunk.len(),
                        e
                    );
                }
            }

            let mut metrics = self.inner.metrics.lock();
            metrics.batch_count += 1;
            metrics.entry_count += chunk.len() as u64;
            metrics.write_secs += secs;
        }
    }
}

#[async_trait]
impl<K, T> Flushable for Accumulator<K, T>
where
    K: Ord + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    async fn process_loop(&self, token: CancellationToken) {
        Accumulator::process_loop(self, token).await
    }

    async fn flush(&self, _token: &CancellationToken) {
        self.flush_all().await
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn batch_size(&self) -> usize {
        0
    }

    fn name(&self) -> &str {
        &self.inner.config.name
    }

    fn get_and_reset_metrics(&self) -> QueueMetrics {
        let mut metrics = self.inner.metrics.lock();
        let snapshot = QueueMetrics {
            batch_count: metrics.batch_count,
            batch_entry_count: metrics.entry_count,
            batch_avg_write_ms: if metrics.batch_count > 0 {
                metrics.write_secs / metrics.batch_count as f64 * 1000.0
            } else {
                0.0
            },
            batch_avg_latency_ms: 0.0,
        };
        *metrics = AccumulatorMetrics::default();
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriteError;
    use golbat_stats::NoopStatsCollector;

    #[derive(Debug, Clone, PartialEq)]
    struct Cell {
        id: u64,
        updated: i64,
    }

    #[derive(Default)]
    struct Sink {
        chunks: Mutex<Vec<Vec<Cell>>>,
    }

    #[async_trait]
    impl BatchWriter<Cell> for Sink {
        async fn write_batch(&self, entries: &[Cell]) -> Result<(), WriteError> {
            self.chunks.lock().push(entries.to_vec());
            Ok(())
        }
    }

    fn accumulator(sink: Arc<Sink>, chunk_size: usize) -> Accumulator<u64, Cell> {
        Accumulator::new(AccumulatorConfig {
            name: "s2cell".into(),
            chunk_size,
            flush_interval: Duration::from_secs(5),
            startup_delay: Duration::ZERO,
            writer: sink,
            key_fn: Arc::new(|cell: &Cell| cell.id),
            updated_fn: Arc::new(|cell: &Cell| cell.updated),
            stats: Arc::new(NoopStatsCollector),
        })
    }

    #[tokio::test]
    async fn later_update_wins() {
        let sink = Arc::new(Sink::default());
        let acc = accumulator(sink.clone(), 100);
        acc.accumulate(Cell { id: 1, updated: 10 });
        acc.accumulate(Cell { id: 1, updated: 5 });
        acc.accumulate(Cell { id: 1, updated: 12 });
        acc.accumulate(Cell { id: 1, updated: 11 });
        assert_eq!(acc.len(), 1);

        acc.flush_all().await;
        assert_eq!(*sink.chunks.lock(), vec![vec![Cell { id: 1, updated: 12 }]]);
        assert!(acc.is_empty());
    }

    #[tokio::test]
    async fn flush_writes_ordered_chunks() {
        let sink = Arc::new(Sink::default());
        let acc = accumulator(sink.clone(), 2);
        for id in [5, 3, 1, 4, 2] {
            acc.accumulate(Cell { id, updated: 1 });
        }
        acc.flush_all().await;

        let chunks = sink.chunks.lock().clone();
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        let ids: Vec<u64> = chunks.into_iter().flatten().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        let metrics = acc.get_and_reset_metrics();
        assert_eq!(metrics.batch_count, 3);
        assert_eq!(metrics.batch_entry_count, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_flushes_on_interval_and_cancel() {
        let sink = Arc::new(Sink::default());
        let acc = accumulator(sink.clone(), 100);
        let token = CancellationToken::new();
        let handle = {
            let acc = acc.clone();
            let token = token.clone();
            tokio::spawn(async move { acc.process_loop(token).await })
        };

        acc.accumulate(Cell { id: 9, updated: 1 });
        tokio::time::sleep(Duration::from_millis(5100)).await;
        assert_eq!(sink.chunks.lock().len(), 1);

        acc.accumulate(Cell { id: 8, updated: 1 });
        token.cancel();
        handle.await.unwrap();
        assert_eq!(sink.chunks.lock().len(), 2);
        assert!(acc.is_empty());
    }
}
