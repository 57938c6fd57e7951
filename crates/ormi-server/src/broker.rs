//! Invocation Broker
//!
//! The single entry point between the transports and the business methods.
//!
//! # Architecture
//!
//! For every [`InvocationRequest`] the broker, in order:
//! 1. notifies every extension (`on_invoke`), ignoring failures
//! 2. resolves the overload for the typed arguments
//! 3. runs it on a blocking worker (sync mode) or on the [`AsyncInvoker`]
//!    pool bounded by the configured timeout (async mode)
//! 4. records the elapsed time against `service#method`, ignoring recorder
//!    failures
//!
//! and always answers with an [`InvocationResponse`]. Nothing escapes as a
//! panic or an `Err`.

use ormi_common::protocol::error::RemotingError;
use ormi_common::protocol::{MethodName, Value};
use ormi_metrics::LatencyRecorder;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::async_invoker::AsyncInvoker;
use crate::config::{InvocationMode, MiddlewareConfig};
use crate::extension::ExtensionManager;
use crate::invoker::{Invoker, ResolvedCall};
use crate::resolver;
use crate::service::RegisteredService;

/// A decoded call on its way to the broker.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub service: Arc<RegisteredService>,
    pub method: MethodName,
    pub args: Vec<Value>,
}

impl InvocationRequest {
    pub fn new(service: Arc<RegisteredService>, method: impl Into<MethodName>, args: Vec<Value>) -> Self {
        Self {
            service,
            method: method.into(),
            args,
        }
    }
}

/// Outcome of one invocation: exactly one of a result or an error.
#[derive(Debug)]
pub enum InvocationResponse {
    Success(Value),
    Error(RemotingError),
}

impl InvocationResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResponse::Success(_))
    }

    pub fn into_result(self) -> Result<Value, RemotingError> {
        match self {
            InvocationResponse::Success(value) => Ok(value),
            InvocationResponse::Error(err) => Err(err),
        }
    }
}

impl From<Result<Value, RemotingError>> for InvocationResponse {
    fn from(result: Result<Value, RemotingError>) -> Self {
        match result {
            Ok(value) => InvocationResponse::Success(value),
            Err(err) => InvocationResponse::Error(err),
        }
    }
}

pub struct Broker {
    invoker: Invoker,
    async_invoker: AsyncInvoker,
    extensions: Arc<ExtensionManager>,
    recorder: Arc<dyn LatencyRecorder>,
    mode: InvocationMode,
    async_timeout: Duration,
}

impl Broker {
    /// Creates a broker for the invocation mode in `config`.
    ///
    /// # Arguments
    /// * `config` - supplies the mode, the async pool size and the async timeout
    /// * `extensions` - notified before every invocation
    /// * `recorder` - receives the latency and outcome of every invocation
    pub fn new(
        config: &MiddlewareConfig,
        extensions: Arc<ExtensionManager>,
        recorder: Arc<dyn LatencyRecorder>,
    ) -> Self {
        let invoker = Invoker::new();
        Self {
            invoker,
            async_invoker: AsyncInvoker::new(invoker, config.async_pool_size),
            extensions,
            recorder,
            mode: config.invocation_mode,
            async_timeout: config.async_timeout(),
        }
    }

    pub fn mode(&self) -> InvocationMode {
        self.mode
    }

    pub fn async_invoker(&self) -> &AsyncInvoker {
        &self.async_invoker
    }

    /// Runs a prepared call and records its latency.
    ///
    /// The method is resolved against the typed arguments, then run on a
    /// blocking worker (sync mode) or on the async invoker with the
    /// configured timeout (async mode). Failures of any kind come back as
    /// [`InvocationResponse::Error`]; nothing here panics on a bad call.
    pub async fn invoke(&self, request: InvocationRequest) -> InvocationResponse {
        let InvocationRequest { service, method, args } = request;
        tracing::debug!("Broker invoking {}#{} ({:?} mode)", service.id(), method, self.mode);

        self.extensions.notify_invoke(service.id(), &method, &args);

        let start = Instant::now();
        let result = self.execute(Arc::clone(&service), &method, args).await;
        let elapsed = start.elapsed();

        if let Err(e) = self
            .recorder
            .record(service.id().as_str(), &method, elapsed, result.is_ok())
        {
            tracing::warn!("Failed to record latency for {}#{}: {}", service.id(), method, e);
        }

        if let Err(e) = &result {
            tracing::debug!("{}#{} failed: {}", service.id(), method, e);
        }
        result.into()
    }

    async fn execute(
        &self,
        service: Arc<RegisteredService>,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RemotingError> {
        let resolved = resolver::resolve(&service, method, &args)?;
        let call = ResolvedCall::new(service, resolved, args)?;

        match self.mode {
            InvocationMode::Sync => {
                let invoker = self.invoker;
                tokio::task::spawn_blocking(move || invoker.invoke(&call))
                    .await
                    .unwrap_or_else(|e| Err(RemotingError::Invocation(format!("Worker failed: {}", e))))
            }
            InvocationMode::Async => {
                self.async_invoker
                    .invoke_async(call)
                    .wait(self.async_timeout)
                    .await
            }
        }
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("mode", &self.mode)
            .field("async_timeout", &self.async_timeout)
            .field("async_pool_size", &self.async_invoker.pool_size())
            .finish_non_exhaustive()
    }
}
