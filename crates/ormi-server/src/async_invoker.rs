//! Bounded asynchronous invocation.
//!
//! [`AsyncInvoker`] runs calls on blocking worker threads, at most
//! `pool_size` at a time. Submissions beyond that wait for a permit, so a
//! full pool applies backpressure instead of rejecting work.
//!
//! The [`AsyncHandle`] returned for each call can be awaited with a
//! timeout. A timeout ends the caller's wait only; the call runs to
//! completion in the background and its result is dropped.

use ormi_common::protocol::error::{RemotingError, Result};
use ormi_common::protocol::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Semaphore};

use crate::invoker::{Invoker, ResolvedCall};

#[derive(Debug, Clone)]
pub struct AsyncInvoker {
    invoker: Invoker,
    semaphore: Arc<Semaphore>,
    pool_size: usize,
}

impl AsyncInvoker {
    /// Creates a pool of `pool_size` workers. Zero is treated as one.
    pub fn new(invoker: Invoker, pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            invoker,
            semaphore: Arc::new(Semaphore::new(pool_size)),
            pool_size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Workers not currently running a call.
    pub fn available_workers(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Submits a call. Must be called from within a Tokio runtime.
    pub fn invoke_async(&self, call: ResolvedCall) -> AsyncHandle {
        let (tx, rx) = oneshot::channel();
        let label = call.label();
        let invoker = self.invoker;
        let semaphore = Arc::clone(&self.semaphore);
        let task_label = label.clone();

        tokio::spawn(async move {
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    let _ = tx.send(Err(RemotingError::Invocation(format!(
                        "Failed to acquire worker: {}",
                        e
                    ))));
                    return;
                }
            };

            let result = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                invoker.invoke(&call)
            })
            .await
            .unwrap_or_else(|e| Err(RemotingError::Invocation(format!("Worker failed: {}", e))));

            // The receiver is gone if the caller timed out
            if tx.send(result).is_err() {
                tracing::debug!("Result of {} discarded after caller stopped waiting", task_label);
            }
        });

        AsyncHandle { rx, label }
    }
}

/// Pending result of an asynchronous call.
#[derive(Debug)]
pub struct AsyncHandle {
    rx: oneshot::Receiver<Result<Value>>,
    label: String,
}

impl AsyncHandle {
    /// Waits at most `timeout` for the result.
    ///
    /// Fails with `Timeout` if the call has not completed in time.
    pub async fn wait(self, timeout: Duration) -> Result<Value> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RemotingError::Invocation(format!(
                "Worker for {} stopped without a result",
                self.label
            ))),
            Err(_) => {
                tracing::warn!("{} timed out after {:?}", self.label, timeout);
                Err(RemotingError::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    /// Waits for the result without a bound.
    pub async fn join(self) -> Result<Value> {
        self.rx.await.unwrap_or_else(|_| {
            Err(RemotingError::Invocation(format!(
                "Worker for {} stopped without a result",
                self.label
            )))
        })
    }
}
