//! Extension Hooks
//!
//! Extensions observe registrations and invocations. They are called in the
//! order they were added, best effort: an extension that returns an error or
//! panics is logged and skipped, and never affects the request.

use ormi_common::protocol::{BoxError, ServiceId, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use crate::service::RegisteredService;

/// Observer of registry and broker events.
///
/// Every hook defaults to a no-op.
pub trait Extension: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn on_register(&self, _service: &RegisteredService) -> Result<(), BoxError> {
        Ok(())
    }

    fn on_unregister(&self, _service: &ServiceId) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called before every invocation, before the method is resolved.
    fn on_invoke(&self, _service: &ServiceId, _method: &str, _args: &[Value]) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Ordered, shareable list of extensions.
#[derive(Default)]
pub struct ExtensionManager {
    extensions: RwLock<Vec<Arc<dyn Extension>>>,
}

impl ExtensionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, extension: Arc<dyn Extension>) {
        tracing::info!("Added extension {}", extension.name());
        self.extensions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(extension);
    }

    pub fn len(&self) -> usize {
        self.extensions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn Extension>> {
        self.extensions.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn notify<F>(&self, event: &str, hook: F)
    where
        F: Fn(&dyn Extension) -> Result<(), BoxError>,
    {
        for extension in self.snapshot() {
            match catch_unwind(AssertUnwindSafe(|| hook(extension.as_ref()))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!("Extension {} failed in {}: {}", extension.name(), event, e);
                }
                Err(_) => {
                    tracing::warn!("Extension {} panicked in {}", extension.name(), event);
                }
            }
        }
    }

    pub fn notify_register(&self, service: &RegisteredService) {
        self.notify("on_register", |ext| ext.on_register(service));
    }

    pub fn notify_unregister(&self, service: &ServiceId) {
        self.notify("on_unregister", |ext| ext.on_unregister(service));
    }

    pub fn notify_invoke(&self, service: &ServiceId, method: &str, args: &[Value]) {
        self.notify("on_invoke", |ext| ext.on_invoke(service, method, args));
    }
}

impl std::fmt::Debug for ExtensionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.snapshot().iter().map(|e| e.name().to_string()).collect();
        f.debug_struct("ExtensionManager").field("extensions", &names).finish()
    }
}
