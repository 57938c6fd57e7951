//! Service Registry
//!
//! Maps [`ServiceId`]s to immutable [`RegisteredService`] snapshots.
//!
//! Entries are swapped as whole `Arc`s under a write lock, so a reader sees
//! either a fully-built service or nothing. Re-registering a name replaces
//! the snapshot; an invocation that already looked up the old one keeps it
//! until it finishes.

use ormi_common::protocol::error::{RemotingError, Result};
use ormi_common::protocol::ServiceId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::service::{RegisteredService, Service};

#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<ServiceId, Arc<RegisteredService>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service` under `name`, replacing any previous entry.
    ///
    /// Fails with `Registration` if the name is empty or the service
    /// declares no methods.
    pub fn register(&self, name: &str, service: Service) -> Result<Arc<RegisteredService>> {
        let id = ServiceId::new(name)?;
        if service.methods().is_empty() {
            return Err(RemotingError::Registration(format!(
                "Service {} ({}) exposes no remote methods",
                id,
                service.type_name()
            )));
        }

        let registered = Arc::new(service.into_registered(id.clone()));
        let previous = self
            .services
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::clone(&registered));

        if previous.is_some() {
            tracing::info!("Replaced service {}", registered.id());
        } else {
            tracing::info!(
                "Registered service {} with {} methods",
                registered.id(),
                registered.methods().len()
            );
        }
        Ok(registered)
    }

    /// Looks up a service, failing with `NotFound`.
    pub fn lookup(&self, name: &str) -> Result<Arc<RegisteredService>> {
        self.services
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| RemotingError::NotFound(name.to_string()))
    }

    /// Removes a service. Returns whether anything was removed.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self
            .services
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
            .is_some();
        if removed {
            tracing::info!("Unregistered service {}", name);
        }
        removed
    }

    /// Whether a service is registered under `name`.
    ///
    /// # Example
    ///
    /// ```
    /// use ormi_common::protocol::{ParamType, Value};
    /// use ormi_server::{ServiceBuilder, ServiceRegistry};
    ///
    /// let registry = ServiceRegistry::new();
    /// let service = ServiceBuilder::new(())
    ///     .method("ping", &[], ParamType::Str, |_, _| Ok(Value::from("pong")))
    ///     .build();
    /// registry.register("Pinger", service).unwrap();
    ///
    /// assert!(registry.contains("Pinger"));
    /// assert!(!registry.contains("pinger"));
    /// ```
    pub fn contains(&self, name: &str) -> bool {
        self.services
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered ids, sorted.
    ///
    /// # Returns
    /// A snapshot; services registered afterwards are not reflected.
    pub fn service_ids(&self) -> Vec<ServiceId> {
        let mut ids: Vec<_> = self
            .services
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Removes every service without notifying extensions.
    pub fn clear(&self) {
        self.services.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
