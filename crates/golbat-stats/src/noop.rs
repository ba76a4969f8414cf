use crate::StatsCollector;

/// Collector used when Prometheus is disabled and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatsCollector;

impl StatsCollector for NoopStatsCollector {}
