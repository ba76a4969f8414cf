//! Write-behind persistence layer.
//!
//! Request handlers hand entity snapshots to a [`TypedQueue`] and return
//! immediately. Queues coalesce repeated writes per key, hold them for an
//! optional delay, and write them to the database in sorted batches under a
//! [`SharedLimiter`] that caps concurrent writers across all queues.
//! High-churn tables use an [`Accumulator`] instead. The [`QueueManager`] runs
//! all loops and drains them on shutdown.

pub mod accumulator;
pub mod error;
pub mod limiter;
pub mod manager;
pub mod queue;
pub mod ratelimit;

pub use accumulator::{Accumulator, AccumulatorConfig, UpdatedFn};
pub use error::{LimiterError, WriteError, MYSQL_DEADLOCK};
pub use limiter::{LimiterPermit, SharedLimiter};
pub use manager::{Flushable, QueueManager, QueueMetrics, StatusSummary};
pub use queue::{BatchWriter, Entry, KeyFn, TypedQueue, TypedQueueConfig};
pub use ratelimit::TokenBucket;
