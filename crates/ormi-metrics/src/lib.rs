//! ORMI Invocation Metrics
//!
//! This crate provides the latency recording seam used by the ORMI broker.
//! Every completed invocation is reported once, keyed by `service#method`,
//! together with its wall-clock latency and whether it succeeded.
//!
//! # Architecture
//!
//! - [`LatencyRecorder`]: The trait the broker records through
//! - [`MetricsRegistry`]: Thread-safe in-memory implementation
//! - [`MetricsSnapshot`]: Serializable snapshot of the registry
//!
//! # Usage Example
//!
//! ```rust
//! use ormi_metrics::{LatencyRecorder, MetricsRegistry};
//! use std::time::Duration;
//!
//! let registry = MetricsRegistry::new();
//! registry.record("Calc", "add", Duration::from_micros(120), true).unwrap();
//!
//! let snapshot = registry.snapshot();
//! assert_eq!(snapshot.total_requests, 1);
//! assert_eq!(snapshot.methods["Calc#add"].call_count, 1);
//! ```
//!
//! # Thread Safety
//!
//! Counters are atomics; the method table sits behind an `RwLock` that is
//! only write-locked the first time a method is seen.

mod collector;
mod registry;
mod snapshot;

pub use collector::{method_key, LatencyRecorder, NoopRecorder, RecordError};
pub use registry::{MetricsConfig, MetricsRegistry};
pub use snapshot::{MethodMetrics, MetricsSnapshot};
