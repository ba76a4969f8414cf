// Typed write-behind queue
//
// Entities are coalesced by key in a pending map until their readiness time,
// moved into a batch map, and written in key order once the batch is full or
// the batch timer fires. Three locks, never nested: `pending`, `batch` and
// `metrics`. The batch lock is never held across a limiter wait or a write.

use async_trait::async_trait;
use golbat_stats::SharedStats;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::WriteError;
use crate::limiter::SharedLimiter;
use crate::manager::{Flushable, QueueMetrics};
use crate::ratelimit::TokenBucket;

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_millis(100);
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);
pub const DEADLOCK_RETRIES: u32 = 3;

/// Persists one batch. Entries arrive sorted ascending by queue key and the
/// implementation should issue a single multi-row upsert.
#[async_trait]
pub trait BatchWriter<T>: Send + Sync {
    async fn write_batch(&self, entries: &[T]) -> Result<(), WriteError>;
}

pub type KeyFn<K, T> = Arc<dyn Fn(&T) -> K + Send + Sync>;

/// Run `writer` with up to [`DEADLOCK_RETRIES`] extra attempts on deadlock,
/// backing off 50ms, 100ms, 150ms. Other errors return immediately.
pub(crate) async fn write_with_retry<T>(
    name: &str,
    writer: &dyn BatchWriter<T>,
    data: &[T],
) -> Result<(), WriteError> {
    let mut attempt = 0;
    loop {
        match writer.write_batch(data).await {
            Ok(()) => return Ok(()),
            Err(WriteError::Deadlock(reason)) if attempt < DEADLOCK_RETRIES => {
                warn!(
                    "Write-behind [{}] deadlock on attempt {}/{} ({} entries), retrying: {}",
                    name,
                    attempt + 1,
                    DEADLOCK_RETRIES,
                    data.len(),
                    reason
                );
                tokio::time::sleep(Duration::from_millis(50 * (u64::from(attempt) + 1))).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// One pending write.
#[derive(Debug, Clone)]
pub struct Entry<K, T> {
    pub key: K,
    pub data: T,
    pub queued_at: Instant,
    pub updated_at: Instant,
    pub ready_at: Instant,
    pub is_new_record: bool,
    pub delay: Duration,
}

impl<K, T> Entry<K, T> {
    fn new(key: K, data: T, is_new_record: bool, delay: Duration, now: Instant) -> Self {
        Self {
            key,
            data,
            queued_at: now,
            updated_at: now,
            ready_at: now + delay,
            is_new_record,
            delay,
        }
    }

    /// Coalesce a later enqueue into this pending entry: data is replaced,
    /// INSERT is sticky, the shortest delay wins and readiness only moves
    /// earlier.
    fn absorb(&mut self, data: T, is_new_record: bool, delay: Duration, now: Instant) {
        self.data = data;
        self.updated_at = now;
        self.is_new_record |= is_new_record;
        if delay < self.delay {
            self.delay = delay;
            self.ready_at = self.ready_at.min(now + delay);
        }
    }

    /// Fold an older entry for the same key into this one. Keeps this entry's
    /// data, the earliest queue/ready times and sticky INSERT.
    fn absorb_older(&mut self, older: Entry<K, T>) {
        self.is_new_record |= older.is_new_record;
        self.queued_at = self.queued_at.min(older.queued_at);
        self.ready_at = self.ready_at.min(older.ready_at);
        self.delay = self.delay.min(older.delay);
    }
}

pub struct TypedQueueConfig<K, T> {
    pub name: String,
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub startup_delay: Duration,
    pub limiter: Option<SharedLimiter>,
    pub rate_limiter: Option<Arc<TokenBucket>>,
    pub writer: Arc<dyn BatchWriter<T>>,
    pub key_fn: KeyFn<K, T>,
    pub stats: SharedStats,
}

#[derive(Debug, Default)]
struct BatchState<K, T> {
    entries: BTreeMap<K, Entry<K, T>>,
    timer_armed: bool,
    generation: u64,
}

impl<K: Ord, T> BatchState<K, T> {
    /// Disarm the timer and take every batched entry in key order.
    fn take(&mut self) -> Vec<Entry<K, T>> {
        self.timer_armed = false;
        self.generation = self.generation.wrapping_add(1);
        std::mem::take(&mut self.entries).into_values().collect()
    }

    fn restore(&mut self, entries: Vec<Entry<K, T>>)
    where
        K: Clone,
    {
        for entry in entries {
            match self.entries.remove(&entry.key) {
                Some(mut newer) => {
                    newer.absorb_older(entry);
                    self.entries.insert(newer.key.clone(), newer);
                }
                None => {
                    self.entries.insert(entry.key.clone(), entry);
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct MetricsState {
    batch_count: u64,
    batch_entry_count: u64,
    batch_write_secs: f64,
    latency_secs: f64,
    latency_count: u64,
}

struct Inner<K, T> {
    name: String,
    batch_size: usize,
    batch_timeout: Duration,
    limiter: Option<SharedLimiter>,
    rate_limiter: Option<Arc<TokenBucket>>,
    writer: Arc<dyn BatchWriter<T>>,
    key_fn: KeyFn<K, T>,
    stats: SharedStats,

    pending: Mutex<BTreeMap<K, Entry<K, T>>>,
    batch: Mutex<BatchState<K, T>>,
    metrics: Mutex<MetricsState>,

    start_time: Instant,
    startup_delay: Duration,
    warmup_complete: AtomicBool,
}

/// Keyed, coalescing, delay-aware write-behind queue. Cheap to clone.
pub struct TypedQueue<K, T> {
    inner: Arc<Inner<K, T>>,
}

impl<K, T> Clone for TypedQueue<K, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, T> TypedQueue<K, T>
where
    K: Ord + Clone + Debug + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn new(config: TypedQueueConfig<K, T>) -> Self {
        let batch_size = if config.batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            config.batch_size
        };
        let batch_timeout = if config.batch_timeout.is_zero() {
            DEFAULT_BATCH_TIMEOUT
        } else {
            config.batch_timeout
        };

        Self {
            inner: Arc::new(Inner {
                name: config.name,
                batch_size,
                batch_timeout,
                limiter: config.limiter,
                rate_limiter: config.rate_limiter,
                writer: config.writer,
                key_fn: config.key_fn,
                stats: config.stats,
                pending: Mutex::new(BTreeMap::new()),
                batch: Mutex::new(BatchState {
                    entries: BTreeMap::new(),
                    timer_armed: false,
                    generation: 0,
                }),
                metrics: Mutex::new(MetricsState::default()),
                start_time: Instant::now(),
                startup_delay: config.startup_delay,
                warmup_complete: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Insert or coalesce a snapshot. Never blocks on I/O.
    pub fn enqueue(&self, data: T, is_new_record: bool, delay: Duration) {
        let inner = &self.inner;
        let key = (inner.key_fn)(&data);
        let now = Instant::now();

        let depth = {
            let mut pending = inner.pending.lock();
            match pending.get_mut(&key) {
                Some(existing) => {
                    existing.absorb(data, is_new_record, delay, now);
                    inner.stats.inc_write_behind_squashed(&inner.name);
                }
                None => {
                    pending.insert(
                        key.clone(),
                        Entry::new(key, data, is_new_record, delay, now),
                    );
                }
            }
            pending.len()
        };

        inner
            .stats
            .set_write_behind_queue_depth(&inner.name, depth as f64);
    }

    pub fn size(&self) -> usize {
        self.inner.pending.lock().len()
    }

    pub fn batch_size(&self) -> usize {
        self.inner.batch.lock().entries.len()
    }

    pub fn is_warmup_complete(&self) -> bool {
        self.inner.warmup_complete.load(Ordering::Acquire)
    }

    /// Copy of the pending entry for `key`, if any.
    pub fn pending_entry(&self, key: &K) -> Option<Entry<K, T>>
    where
        T: Clone,
    {
        self.inner.pending.lock().get(key).cloned()
    }

    /// Dispatch loop. Returns after flushing everything once `token` is cancelled.
    pub async fn process_loop(&self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Write-behind [{}] shutting down, flushing...", self.inner.name);
                    self.flush(&CancellationToken::new()).await;
                    return;
                }
                _ = ticker.tick() => {
                    if self.inner.check_warmup() {
                        self.inner.dispatch_ready(&token).await;
                    }
                }
            }
        }
    }

    /// Move every pending entry into the batch, ignoring readiness, and write
    /// the batch out. Entries still inside their delay window are written now.
    pub async fn flush(&self, token: &CancellationToken) {
        let entries: Vec<Entry<K, T>> = {
            let mut pending = self.inner.pending.lock();
            std::mem::take(&mut *pending).into_values().collect()
        };

        for entry in entries {
            self.inner.add_to_batch(entry, token).await;
        }

        let remaining = self.inner.batch.lock().take();
        if !remaining.is_empty() {
            self.inner.write_batch(remaining, token).await;
        }
    }

    pub fn get_and_reset_metrics(&self) -> QueueMetrics {
        let mut metrics = self.inner.metrics.lock();
        let snapshot = QueueMetrics {
            batch_count: metrics.batch_count,
            batch_entry_count: metrics.batch_entry_count,
            batch_avg_write_ms: if metrics.batch_count > 0 {
                metrics.batch_write_secs / metrics.batch_count as f64 * 1000.0
            } else {
                0.0
            },
            batch_avg_latency_ms: if metrics.latency_count > 0 {
                metrics.latency_secs / metrics.latency_count as f64 * 1000.0
            } else {
                0.0
            },
        };
        *metrics = MetricsState::default();
        snapshot
    }
}

impl<K, T> Inner<K, T>
where
    K: Ord + Clone + Debug + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn check_warmup(&self) -> bool {
        if self.warmup_complete.load(Ordering::Acquire) {
            return true;
        }
        if self.start_time.elapsed() < self.startup_delay {
            return false;
        }
        let pending = self.pending.lock();
        if !self.warmup_complete.swap(true, Ordering::AcqRel) {
            info!(
                "Write-behind [{}] warmup complete, processing {} queued writes",
                self.name,
                pending.len()
            );
        }
        true
    }

    async fn dispatch_ready(self: &Arc<Self>, token: &CancellationToken) {
        let now = Instant::now();
        let ready: Vec<Entry<K, T>> = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                return;
            }
            let keys: Vec<K> = pending
                .iter()
                .filter(|(_, entry)| entry.ready_at <= now)
                .map(|(key, _)| key.clone())
                .collect();
            keys.iter().filter_map(|key| pending.remove(key)).collect()
        };

        for entry in ready {
            self.add_to_batch(entry, token).await;
        }
    }

    async fn add_to_batch(self: &Arc<Self>, mut entry: Entry<K, T>, token: &CancellationToken) {
        let full = {
            let mut batch = self.batch.lock();
            if let Some(existing) = batch.entries.remove(&entry.key) {
                entry.absorb_older(existing);
                self.stats.inc_write_behind_squashed(&self.name);
            }
            batch.entries.insert(entry.key.clone(), entry);

            if batch.entries.len() >= self.batch_size {
                Some(batch.take())
            } else {
                if !batch.timer_armed {
                    batch.timer_armed = true;
                    self.arm_batch_timer(batch.generation);
                }
                None
            }
        };

        if let Some(entries) = full {
            self.write_batch(entries, token).await;
        }
    }

    fn arm_batch_timer(self: &Arc<Self>, generation: u64) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(inner.batch_timeout).await;
            let entries = {
                let mut batch = inner.batch.lock();
                if !batch.timer_armed || batch.generation != generation {
                    return;
                }
                batch.take()
            };
            if !entries.is_empty() {
                inner.write_batch(entries, &CancellationToken::new()).await;
            }
        });
    }

    /// Write one batch. `entries` are in ascending key order (BTreeMap drain),
    /// which keeps row-lock acquisition order stable across concurrent batches.
    async fn write_batch(&self, entries: Vec<Entry<K, T>>, token: &CancellationToken) {
        if entries.is_empty() {
            return;
        }

        if let Some(bucket) = &self.rate_limiter {
            let wanted = (entries.len() as f64).min(bucket.capacity()).max(1.0) as u32;
            let waited = bucket.wait_acquire(wanted).await;
            if !waited.is_zero() {
                debug!(queue = %self.name, waited_ms = waited.as_millis() as u64, "rate limited");
            }
        }

        let _permit = match &self.limiter {
            Some(limiter) => match limiter.acquire(token).await {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.batch.lock().restore(entries);
                    return;
                }
            },
            None => None,
        };

        let entry_count = entries.len();
        let ready_at: Vec<Instant> = entries.iter().map(|entry| entry.ready_at).collect();
        let data: Vec<T> = entries.into_iter().map(|entry| entry.data).collect();

        let start = Instant::now();
        let result = write_with_retry(&self.name, self.writer.as_ref(), &data).await;
        let batch_secs = start.elapsed().as_secs_f64();

        match result {
            Ok(()) => {
                self.stats
                    .inc_write_behind_writes(&self.name, entry_count as u64);
                self.stats.inc_write_behind_batches(&self.name);
                self.stats
                    .observe_write_behind_batch_size(&self.name, entry_count as f64);
                self.stats
                    .observe_write_behind_batch_time(&self.name, batch_secs);
            }
            Err(e) => {
                self.stats.inc_write_behind_errors(&self.name);
                error!(
                    "Write-behind [{}] batch error ({} entries): {}",
                    self.name, entry_count, e
                );
            }
        }

        let now = Instant::now();
        let mut metrics = self.metrics.lock();
        metrics.batch_count += 1;
        metrics.batch_entry_count += entry_count as u64;
        metrics.batch_write_secs += batch_secs;
        for ready in ready_at {
            let latency = now.saturating_duration_since(ready).as_secs_f64();
            metrics.latency_secs += latency;
            metrics.latency_count += 1;
            self.stats.observe_write_behind_latency(&self.name, latency);
        }
    }
}

#[async_trait]
impl<K, T> Flushable for TypedQueue<K, T>
where
    K: Ord + Clone + Debug + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    async fn process_loop(&self, token: CancellationToken) {
        TypedQueue::process_loop(self, token).await
    }

    async fn flush(&self, token: &CancellationToken) {
        TypedQueue::flush(self, token).await
    }

    fn size(&self) -> usize {
        TypedQueue::size(self)
    }

    fn batch_size(&self) -> usize {
        TypedQueue::batch_size(self)
    }

    fn name(&self) -> &str {
        TypedQueue::name(self)
    }

    fn get_and_reset_metrics(&self) -> QueueMetrics {
        TypedQueue::get_and_reset_metrics(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use golbat_stats::NoopStatsCollector;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        q: i64,
    }

    fn row(id: &str, q: i64) -> Row {
        Row { id: id.to_string(), q }
    }

    #[derive(Default)]
    struct Recorder {
        batches: Mutex<Vec<Vec<Row>>>,
        deadlocks_before_success: AtomicUsize,
        calls: AtomicUsize,
    }

    impl Recorder {
        fn failing(deadlocks: usize) -> Self {
            Self {
                deadlocks_before_success: AtomicUsize::new(deadlocks),
                ..Default::default()
            }
        }

        fn batches(&self) -> Vec<Vec<Row>> {
            self.batches.lock().clone()
        }

        fn written(&self) -> Vec<Row> {
            self.batches().into_iter().flatten().collect()
        }
    }

    #[async_trait]
    impl BatchWriter<Row> for Recorder {
        async fn write_batch(&self, entries: &[Row]) -> Result<(), WriteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.deadlocks_before_success.load(Ordering::SeqCst);
            if remaining > 0 {
                self.deadlocks_before_success
                    .store(remaining - 1, Ordering::SeqCst);
                return Err(WriteError::Deadlock("Error 1213".into()));
            }
            self.batches.lock().push(entries.to_vec());
            Ok(())
        }
    }

    fn queue_with(
        writer: Arc<Recorder>,
        batch_size: usize,
        batch_timeout: Duration,
        startup_delay: Duration,
    ) -> TypedQueue<String, Row> {
        TypedQueue::new(TypedQueueConfig {
            name: "test".into(),
            batch_size,
            batch_timeout,
            startup_delay,
            limiter: Some(SharedLimiter::new(4)),
            rate_limiter: None,
            writer,
            key_fn: Arc::new(|row: &Row| row.id.clone()),
            stats: Arc::new(NoopStatsCollector),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn coalesces_by_key() {
        let writer = Arc::new(Recorder::default());
        let queue = queue_with(writer, 50, DEFAULT_BATCH_TIMEOUT, Duration::ZERO);

        let first = Instant::now();
        queue.enqueue(row("p:1", 1), false, Duration::from_secs(5));
        tokio::time::advance(Duration::from_millis(10)).await;
        queue.enqueue(row("p:1", 2), true, Duration::from_secs(2));
        tokio::time::advance(Duration::from_millis(10)).await;
        queue.enqueue(row("p:1", 3), false, Duration::from_secs(9));
        queue.enqueue(row("p:2", 1), false, Duration::ZERO);

        assert_eq!(queue.size(), 2);
        let entry = queue.pending_entry(&"p:1".to_string()).unwrap();
        assert_eq!(entry.data, row("p:1", 3));
        assert!(entry.is_new_record);
        assert_eq!(entry.delay, Duration::from_secs(2));
        assert_eq!(entry.queued_at, first);
        assert!(entry.ready_at <= first + Duration::from_secs(2) + Duration::from_millis(10));
        assert!(entry.ready_at >= entry.queued_at);
    }

    #[tokio::test(start_paused = true)]
    async fn latest_snapshot_with_sticky_insert_is_written() {
        let writer = Arc::new(Recorder::default());
        let queue = queue_with(writer.clone(), 50, DEFAULT_BATCH_TIMEOUT, Duration::ZERO);

        queue.enqueue(row("p:1", 1), true, Duration::ZERO);
        queue.enqueue(row("p:1", 2), false, Duration::ZERO);
        assert!(queue.pending_entry(&"p:1".to_string()).unwrap().is_new_record);

        let token = CancellationToken::new();
        let handle = {
            let queue = queue.clone();
            let token = token.clone();
            tokio::spawn(async move { queue.process_loop(token).await })
        };
        tokio::time::sleep(TICK_INTERVAL + DEFAULT_BATCH_TIMEOUT + Duration::from_millis(50)).await;

        assert_eq!(writer.batches(), vec![vec![row("p:1", 2)]]);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_delay_pulls_readiness_forward() {
        let writer = Arc::new(Recorder::default());
        let queue = queue_with(writer.clone(), 50, DEFAULT_BATCH_TIMEOUT, Duration::ZERO);
        let token = CancellationToken::new();
        let handle = {
            let queue = queue.clone();
            let token = token.clone();
            tokio::spawn(async move { queue.process_loop(token).await })
        };

        queue.enqueue(row("p:1", 1), true, Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(writer.batches().is_empty());
        assert_eq!(queue.size(), 1);

        queue.enqueue(row("p:1", 2), false, Duration::ZERO);
        tokio::time::sleep(TICK_INTERVAL + DEFAULT_BATCH_TIMEOUT + Duration::from_millis(20)).await;

        assert_eq!(writer.written(), vec![row("p:1", 2)]);
        assert_eq!(queue.size(), 0);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn full_batch_flushes_before_timeout() {
        let writer = Arc::new(Recorder::default());
        let queue = queue_with(writer.clone(), 3, Duration::from_secs(10), Duration::ZERO);
        let token = CancellationToken::new();
        let handle = {
            let queue = queue.clone();
            let token = token.clone();
            tokio::spawn(async move { queue.process_loop(token).await })
        };

        for id in ["c", "a", "b"] {
            queue.enqueue(row(id, 0), true, Duration::ZERO);
        }
        tokio::time::sleep(TICK_INTERVAL * 2).await;

        let batches = writer.batches();
        assert_eq!(batches.len(), 1);
        let keys: Vec<&str> = batches[0].iter().map(|r| r.id.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn partial_batch_flushes_on_timer() {
        let writer = Arc::new(Recorder::default());
        let timeout = Duration::from_millis(300);
        let queue = queue_with(writer.clone(), 50, timeout, Duration::ZERO);
        let token = CancellationToken::new();
        let handle = {
            let queue = queue.clone();
            let token = token.clone();
            tokio::spawn(async move { queue.process_loop(token).await })
        };

        queue.enqueue(row("x", 1), false, Duration::ZERO);
        queue.enqueue(row("y", 1), false, Duration::ZERO);
        tokio::time::sleep(TICK_INTERVAL).await;
        assert!(writer.batches().is_empty());
        assert_eq!(queue.batch_size(), 2);

        tokio::time::sleep(timeout + TICK_INTERVAL).await;
        assert_eq!(writer.written().len(), 2);
        assert_eq!(queue.batch_size(), 0);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn warmup_gates_dispatch() {
        let writer = Arc::new(Recorder::default());
        let queue = queue_with(
            writer.clone(),
            50,
            DEFAULT_BATCH_TIMEOUT,
            Duration::from_secs(2),
        );
        let token = CancellationToken::new();
        let handle = {
            let queue = queue.clone();
            let token = token.clone();
            tokio::spawn(async move { queue.process_loop(token).await })
        };

        queue.enqueue(row("w", 1), false, Duration::ZERO);
        queue.enqueue(row("w", 2), false, Duration::ZERO);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!queue.is_warmup_complete());
        assert_eq!(queue.size(), 1);
        assert!(writer.batches().is_empty());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(queue.is_warmup_complete());
        assert_eq!(writer.written(), vec![row("w", 2)]);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(queue.is_warmup_complete());

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn deadlocks_are_retried() {
        let writer = Arc::new(Recorder::failing(DEADLOCK_RETRIES as usize));
        let queue = queue_with(writer.clone(), 50, DEFAULT_BATCH_TIMEOUT, Duration::ZERO);

        queue.enqueue(row("d", 1), false, Duration::ZERO);
        queue.flush(&CancellationToken::new()).await;

        assert_eq!(
            writer.calls.load(Ordering::SeqCst),
            DEADLOCK_RETRIES as usize + 1
        );
        assert_eq!(writer.written(), vec![row("d", 1)]);
        let metrics = queue.get_and_reset_metrics();
        assert_eq!(metrics.batch_count, 1);
        assert_eq!(metrics.batch_entry_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_deadlock_retries_drop_the_batch() {
        let writer = Arc::new(Recorder::failing(DEADLOCK_RETRIES as usize + 1));
        let queue = queue_with(writer.clone(), 50, DEFAULT_BATCH_TIMEOUT, Duration::ZERO);

        queue.enqueue(row("d", 1), false, Duration::ZERO);
        queue.flush(&CancellationToken::new()).await;

        assert_eq!(
            writer.calls.load(Ordering::SeqCst),
            DEADLOCK_RETRIES as usize + 1
        );
        assert!(writer.written().is_empty());
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.batch_size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_drains_pending_and_batch() {
        let writer = Arc::new(Recorder::default());
        let queue = queue_with(writer.clone(), 50, Duration::from_secs(60), Duration::ZERO);
        let token = CancellationToken::new();

        queue.enqueue(row("b1", 1), false, Duration::ZERO);
        queue.enqueue(row("b2", 1), false, Duration::ZERO);
        queue.inner.dispatch_ready(&token).await;
        assert_eq!(queue.batch_size(), 2);

        queue.enqueue(row("p1", 1), false, Duration::from_secs(30));
        queue.enqueue(row("b1", 2), false, Duration::from_secs(30));
        queue.enqueue(row("p2", 1), true, Duration::from_secs(30));
        assert_eq!(queue.size(), 3);

        queue.flush(&token).await;

        let mut keys: Vec<String> = writer.written().into_iter().map(|r| r.id).collect();
        keys.sort();
        assert_eq!(keys, vec!["b1", "b2", "p1", "p2"]);
        assert!(writer.written().contains(&row("b1", 2)));
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.batch_size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_acquire_returns_entries_to_batch() {
        let writer = Arc::new(Recorder::default());
        let limiter = SharedLimiter::new(1);
        let queue: TypedQueue<String, Row> = TypedQueue::new(TypedQueueConfig {
            name: "blocked".into(),
            batch_size: 1,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            startup_delay: Duration::ZERO,
            limiter: Some(limiter.clone()),
            rate_limiter: None,
            writer: writer.clone(),
            key_fn: Arc::new(|row: &Row| row.id.clone()),
            stats: Arc::new(NoopStatsCollector),
        });

        let held = limiter.try_acquire().unwrap();
        let token = CancellationToken::new();
        token.cancel();

        queue.enqueue(row("r", 1), true, Duration::ZERO);
        queue.inner.dispatch_ready(&token).await;
        assert!(writer.batches().is_empty());
        assert_eq!(queue.batch_size(), 1);

        drop(held);
        queue.flush(&CancellationToken::new()).await;
        assert_eq!(writer.written(), vec![row("r", 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn metrics_reset_after_read() {
        let writer = Arc::new(Recorder::default());
        let queue = queue_with(writer, 50, DEFAULT_BATCH_TIMEOUT, Duration::ZERO);
        queue.enqueue(row("m1", 1), false, Duration::ZERO);
        queue.enqueue(row("m2", 1), false, Duration::ZERO);
        queue.flush(&CancellationToken::new()).await;

        let metrics = queue.get_and_reset_metrics();
        assert_eq!(metrics.batch_count, 1);
        assert_eq!(metrics.batch_entry_count, 2);

        let metrics = queue.get_and_reset_metrics();
        assert_eq!(metrics.batch_count, 0);
        assert_eq!(metrics.batch_entry_count, 0);
        assert_eq!(metrics.batch_avg_latency_ms, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn integer_keys_sort_numerically() {
        let writer = Arc::new(Recorder::default());
        let queue: TypedQueue<u64, Row> = TypedQueue::new(TypedQueueConfig {
            name: "int".into(),
            batch_size: 50,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            startup_delay: Duration::ZERO,
            limiter: None,
            rate_limiter: None,
            writer: writer.clone(),
            key_fn: Arc::new(|row: &Row| row.q as u64),
            stats: Arc::new(NoopStatsCollector),
        });
        for q in [100, 9, 25] {
            queue.enqueue(row("n", q), false, Duration::ZERO);
        }
        queue.flush(&CancellationToken::new()).await;
        let order: Vec<i64> = writer.written().into_iter().map(|r| r.q).collect();
        assert_eq!(order, vec![9, 25, 100]);
    }
}
