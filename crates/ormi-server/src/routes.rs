//! HTTP Route Table
//!
//! Maps `(verb, path)` pairs to service methods. Entries come from the routes
//! services declare at registration time and are removed when the service is
//! unregistered.

use hyper::Method;
use ormi_common::protocol::ServiceId;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::service::RegisteredService;

/// Where a route points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub service: ServiceId,
    pub method: String,
}

/// Result of looking up a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    Found(RouteTarget),
    /// The path is known but not for this verb.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

#[derive(Debug, Default)]
pub struct RouteTable {
    routes: RwLock<HashMap<String, HashMap<Method, RouteTarget>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the declared routes of `service`, replacing any it previously had.
    ///
    /// A path/verb pair already owned by another service is taken over.
    pub fn add_service(&self, service: &RegisteredService) {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        remove_service_locked(&mut routes, service.id());

        for (verb, path, method) in service.routes() {
            tracing::info!("Route {} {} -> {}#{}", verb, path, service.id(), method);
            let previous = routes.entry(path.clone()).or_default().insert(
                verb.clone(),
                RouteTarget {
                    service: service.id().clone(),
                    method: method.to_string(),
                },
            );
            if let Some(previous) = previous {
                tracing::warn!(
                    "Route {} {} moved from {}#{}",
                    verb,
                    path,
                    previous.service,
                    previous.method
                );
            }
        }
    }

    /// Removes every route pointing at `service`.
    pub fn remove_service(&self, service: &ServiceId) {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        remove_service_locked(&mut routes, service);
    }

    /// Looks up the method bound to `verb` on `path`.
    ///
    /// # Arguments
    /// * `verb` - HTTP method of the request
    /// * `path` - request path, already percent-decoded, matched exactly
    ///
    /// # Returns
    /// `Found` with the target, `MethodNotAllowed` listing the verbs the
    /// path does accept (sorted), or `NotFound` for an unknown path.
    pub fn resolve(&self, verb: &Method, path: &str) -> RouteMatch {
        let routes = self.routes.read().unwrap_or_else(|e| e.into_inner());
        match routes.get(path) {
            None => RouteMatch::NotFound,
            Some(by_verb) => match by_verb.get(verb) {
                Some(target) => RouteMatch::Found(target.clone()),
                None => {
                    let mut allowed: Vec<Method> = by_verb.keys().cloned().collect();
                    allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                    RouteMatch::MethodNotAllowed(allowed)
                }
            },
        }
    }

    /// Number of `(verb, path)` entries.
    pub fn len(&self) -> usize {
        self.routes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove_service_locked(routes: &mut HashMap<String, HashMap<Method, RouteTarget>>, service: &ServiceId) {
    routes.retain(|_, by_verb| {
        by_verb.retain(|_, target| &target.service != service);
        !by_verb.is_empty()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceBuilder;
    use ormi_common::protocol::{ParamType, Value};

    struct Calc;

    fn calc(name: &str) -> RegisteredService {
        ServiceBuilder::new(Calc)
            .base_path("/calculator")
            .method("add", &[ParamType::Int, ParamType::Int], ParamType::Int, |_, a| {
                Ok(Value::Int(a.i32(0)? + a.i32(1)?))
            })
            .route(Method::POST, "/add")
            .method("status", &[], ParamType::Str, |_, _| Ok("ok".into()))
            .route(Method::GET, "/status")
            .method("unrouted", &[], ParamType::Unit, |_, _| Ok(Value::Null))
            .build()
            .into_registered(ServiceId::new(name).unwrap())
    }

    #[test]
    fn test_resolve_routes() {
        let table = RouteTable::new();
        table.add_service(&calc("Calc"));
        assert_eq!(table.len(), 2);

        match table.resolve(&Method::POST, "/calculator/add") {
            RouteMatch::Found(target) => {
                assert_eq!(target.service.as_str(), "Calc");
                assert_eq!(target.method, "add");
            }
            other => panic!("unexpected match: {:?}", other),
        }

        assert_eq!(
            table.resolve(&Method::GET, "/calculator/add"),
            RouteMatch::MethodNotAllowed(vec![Method::POST])
        );
        assert_eq!(table.resolve(&Method::GET, "/nowhere"), RouteMatch::NotFound);
    }

    #[test]
    fn test_remove_service_drops_routes() {
        let table = RouteTable::new();
        table.add_service(&calc("Calc"));
        table.remove_service(&ServiceId::new("Calc").unwrap());
        assert!(table.is_empty());
        assert_eq!(table.resolve(&Method::GET, "/calculator/status"), RouteMatch::NotFound);
    }

    #[test]
    fn test_later_service_takes_over_path() {
        let table = RouteTable::new();
        table.add_service(&calc("Calc"));
        table.add_service(&calc("Calc2"));

        match table.resolve(&Method::GET, "/calculator/status") {
            RouteMatch::Found(target) => assert_eq!(target.service.as_str(), "Calc2"),
            other => panic!("unexpected match: {:?}", other),
        }

        // Removing the first owner leaves the taken-over routes alone
        table.remove_service(&ServiceId::new("Calc").unwrap());
        assert_eq!(table.len(), 2);
    }
}
