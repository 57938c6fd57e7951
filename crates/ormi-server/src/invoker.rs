//! Synchronous invocation of resolved calls.

use ormi_common::protocol::error::{RemotingError, Result};
use ormi_common::protocol::Value;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::service::{ArgumentError, Args, RegisteredService, RemoteMethod};

/// A method bound to the arguments it was resolved for.
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub service: Arc<RegisteredService>,
    pub method: Arc<RemoteMethod>,
    pub args: Args,
}

impl ResolvedCall {
    /// Binds `args` to `method`.
    ///
    /// Fails with `Invocation` when the argument count differs from the
    /// method's arity.
    pub fn new(service: Arc<RegisteredService>, method: Arc<RemoteMethod>, args: Vec<Value>) -> Result<Self> {
        if args.len() != method.arity() {
            return Err(RemotingError::Invocation(format!(
                "{} expects {} arguments, got {}",
                method.signature(),
                method.arity(),
                args.len()
            )));
        }
        Ok(Self {
            service,
            method,
            args: Args::new(args),
        })
    }

    /// `service#method`, for logs.
    pub fn label(&self) -> String {
        format!("{}#{}", self.service.id(), self.method.name())
    }
}

/// Runs resolved calls on the current thread.
///
/// Failures are classified as:
/// - `Invocation` when the handler could not bind its arguments
/// - `Callee` when the business method returned an error or panicked; the
///   returned error is kept as the source
#[derive(Debug, Default, Clone, Copy)]
pub struct Invoker;

impl Invoker {
    pub fn new() -> Self {
        Invoker
    }

    pub fn invoke(&self, call: &ResolvedCall) -> Result<Value> {
        tracing::debug!("Invoking {}", call.label());

        let outcome = catch_unwind(AssertUnwindSafe(|| call.method.call(&call.args)));

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => match err.downcast::<ArgumentError>() {
                Ok(arg_err) => Err(RemotingError::Invocation(format!(
                    "Failed to bind arguments of {}: {}",
                    call.method.signature(),
                    arg_err
                ))),
                Err(err) => Err(RemotingError::Callee {
                    method: call.method.name().to_string(),
                    source: err,
                }),
            },
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!("{} panicked: {}", call.label(), message);
                Err(RemotingError::callee(call.method.name(), message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
