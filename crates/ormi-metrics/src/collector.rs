use std::time::Duration;
use thiserror::Error;

/// Errors a recorder may report. The broker logs and drops them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Method table full ({0} methods tracked)")]
    CapacityExceeded(usize),

    #[error("Recorder unavailable: {0}")]
    Unavailable(String),
}

/// Key under which a method's latency is recorded.
pub fn method_key(service: &str, method: &str) -> String {
    format!("{}#{}", service, method)
}

/// Trait for recording invocation latency.
///
/// Implementations must be cheap and thread-safe: `record` is called on the
/// broker's hot path, once per resolved invocation, from many tasks at once.
pub trait LatencyRecorder: Send + Sync {
    /// Records one invocation of `service#method`.
    ///
    /// # Arguments
    /// * `service` - The service id the call was routed to
    /// * `method` - The resolved method name
    /// * `latency` - Wall-clock time spent invoking
    /// * `success` - `false` if the invocation produced an error
    fn record(
        &self,
        service: &str,
        method: &str,
        latency: Duration,
        success: bool,
    ) -> Result<(), RecordError>;
}

/// Recorder that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl LatencyRecorder for NoopRecorder {
    fn record(&self, _: &str, _: &str, _: Duration, _: bool) -> Result<(), RecordError> {
        Ok(())
    }
}
