use crate::collector::{method_key, LatencyRecorder, RecordError};
use crate::snapshot::{MethodMetrics, MetricsSnapshot};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::{Duration, Instant};

/// Configuration for the metrics registry.
///
/// # Example
///
/// ```rust
/// use ormi_metrics::{MetricsConfig, MetricsRegistry};
///
/// let registry = MetricsRegistry::with_config(MetricsConfig { max_methods: 64 });
/// ```
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Maximum number of distinct `service#method` keys to track.
    ///
    /// Records for new keys beyond this limit are rejected with
    /// [`RecordError::CapacityExceeded`]; existing keys keep counting.
    pub max_methods: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { max_methods: 1000 }
    }
}

/// Per-method counters.
#[derive(Debug, Default)]
struct MethodStats {
    call_count: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    total_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
}

impl MethodStats {
    fn record(&self, latency_us: u64, success: bool) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        self.max_latency_us.fetch_max(latency_us, Ordering::Relaxed);

        if success {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> MethodMetrics {
        let call_count = self.call_count.load(Ordering::Relaxed);
        let total = self.total_latency_us.load(Ordering::Relaxed);

        MethodMetrics {
            call_count,
            success_count: self.success_count.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            avg_latency_us: if call_count == 0 { 0 } else { total / call_count },
            max_latency_us: self.max_latency_us.load(Ordering::Relaxed),
        }
    }
}

/// Thread-safe in-memory latency registry.
///
/// # Concurrency
///
/// - Global and per-method counters are `AtomicU64` with relaxed ordering;
///   snapshots are eventually consistent.
/// - The method table is a `RwLock<HashMap>`. Recording for a known key
///   takes only the read lock.
#[derive(Debug)]
pub struct MetricsRegistry {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    dropped_records: AtomicU64,
    methods: StdRwLock<HashMap<String, Arc<MethodStats>>>,
    start_time: Instant,
    config: MetricsConfig,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::with_config(MetricsConfig::default())
    }

    pub fn with_config(config: MetricsConfig) -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            dropped_records: AtomicU64::new(0),
            methods: StdRwLock::new(HashMap::new()),
            start_time: Instant::now(),
            config,
        }
    }

    fn stats_for(&self, key: &str) -> Result<Arc<MethodStats>, RecordError> {
        {
            let methods = self.methods.read().unwrap_or_else(|e| e.into_inner());
            if let Some(stats) = methods.get(key) {
                return Ok(Arc::clone(stats));
            }
        }

        let mut methods = self.methods.write().unwrap_or_else(|e| e.into_inner());
        if let Some(stats) = methods.get(key) {
            return Ok(Arc::clone(stats));
        }
        if methods.len() >= self.config.max_methods {
            return Err(RecordError::CapacityExceeded(methods.len()));
        }
        let stats = Arc::new(MethodStats::default());
        methods.insert(key.to_string(), Arc::clone(&stats));
        Ok(stats)
    }

    /// Number of distinct methods tracked.
    pub fn method_count(&self) -> usize {
        self.methods.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn uptime_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Takes a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let methods = {
            let guard = self.methods.read().unwrap_or_else(|e| e.into_inner());
            guard
                .iter()
                .map(|(name, stats)| (name.clone(), stats.snapshot()))
                .collect()
        };

        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            dropped_records: self.dropped_records.load(Ordering::Relaxed),
            uptime_ms: self.uptime_ms(),
            methods,
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyRecorder for MetricsRegistry {
    fn record(
        &self,
        service: &str,
        method: &str,
        latency: Duration,
        success: bool,
    ) -> Result<(), RecordError> {
        let key = method_key(service, method);
        let stats = match self.stats_for(&key) {
            Ok(stats) => stats,
            Err(e) => {
                self.dropped_records.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        stats.record(latency_us, success);

        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}
