//! Platform facade.
//!
//! [`Platform`] wires the registry, route table, extensions, latency
//! registry, broker and dispatcher from one [`MiddlewareConfig`], and starts
//! the three transport servers.
//!
//! # Example
//!
//! ```no_run
//! use ormi_common::ParamType;
//! use ormi_server::config::MiddlewareConfig;
//! use ormi_server::service::ServiceBuilder;
//! use ormi_server::Platform;
//!
//! struct Calc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let platform = Platform::new(MiddlewareConfig::default());
//!     let calc = ServiceBuilder::new(Calc)
//!         .method("add", &[ParamType::Int, ParamType::Int], ParamType::Int, |_, args| {
//!             Ok((args.i32(0)? + args.i32(1)?).into())
//!         })
//!         .build();
//!     platform.register("Calc", calc).unwrap();
//!
//!     let running = platform.start().await.unwrap();
//!     println!("stream transport on {}", running.stream_addr());
//!     tokio::signal::ctrl_c().await.unwrap();
//!     running.shutdown();
//! }
//! ```

use ormi_common::protocol::error::{RemotingError, Result};
use ormi_metrics::{MetricsConfig, MetricsRegistry, MetricsSnapshot};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::broker::Broker;
use crate::config::MiddlewareConfig;
use crate::dispatch::Dispatcher;
use crate::extension::{Extension, ExtensionManager};
use crate::registry::ServiceRegistry;
use crate::routes::RouteTable;
use crate::service::{RegisteredService, Service};
use crate::transport::{DatagramServer, HttpServer, StreamServer};

#[derive(Debug)]
pub struct Platform {
    config: MiddlewareConfig,
    registry: Arc<ServiceRegistry>,
    routes: Arc<RouteTable>,
    extensions: Arc<ExtensionManager>,
    metrics: Arc<MetricsRegistry>,
    broker: Arc<Broker>,
    dispatcher: Arc<Dispatcher>,
}

impl Platform {
    pub fn new(config: MiddlewareConfig) -> Self {
        let registry = Arc::new(ServiceRegistry::new());
        let routes = Arc::new(RouteTable::new());
        let extensions = Arc::new(ExtensionManager::new());
        let metrics = Arc::new(MetricsRegistry::with_config(MetricsConfig {
            max_methods: config.max_tracked_methods,
        }));
        let broker = Arc::new(Broker::new(&config, Arc::clone(&extensions), metrics.clone()));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry), Arc::clone(&broker)));

        Self {
            config,
            registry,
            routes,
            extensions,
            metrics,
            broker,
            dispatcher,
        }
    }

    pub fn config(&self) -> &MiddlewareConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<ServiceRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn routes(&self) -> Arc<RouteTable> {
        Arc::clone(&self.routes)
    }

    pub fn broker(&self) -> Arc<Broker> {
        Arc::clone(&self.broker)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Adds an extension. Extensions should be added before serving starts.
    pub fn add_extension(&self, extension: Arc<dyn Extension>) {
        self.extensions.add(extension);
    }

    /// Registers a service, publishes its routes and notifies extensions.
    pub fn register(&self, name: &str, service: Service) -> Result<Arc<RegisteredService>> {
        let registered = self.registry.register(name, service)?;
        self.routes.add_service(&registered);
        self.extensions.notify_register(&registered);
        Ok(registered)
    }

    /// Unregisters a service. Returns whether it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.registry.unregister(name);
        if removed {
            // Only ids that were registered reach here, so they are valid
            if let Ok(id) = ormi_common::ServiceId::new(name) {
                self.routes.remove_service(&id);
                self.extensions.notify_unregister(&id);
            }
        }
        removed
    }

    /// Binds all three transports and starts serving.
    pub async fn start(&self) -> Result<RunningPlatform> {
        self.config
            .validate()
            .map_err(|e| RemotingError::InvalidRequest(format!("Invalid configuration: {}", e)))?;

        let stream = StreamServer::bind(
            &self.config.stream_addr(),
            self.dispatcher(),
            self.config.stream_pool_size,
        )
        .await?
        .with_read_timeout(self.config.read_timeout());
        let datagram = DatagramServer::bind(
            &self.config.datagram_addr(),
            self.dispatcher(),
            self.config.datagram_pool_size,
        )
        .await?;
        let http = HttpServer::bind(
            &self.config.http_addr(),
            self.dispatcher(),
            self.routes(),
            self.config.http_pool_size,
        )
        .await?
        .with_read_timeout(self.config.read_timeout());

        let running = RunningPlatform {
            stream_addr: stream.local_addr()?,
            datagram_addr: datagram.local_addr()?,
            http_addr: http.local_addr()?,
            tasks: vec![
                tokio::spawn(stream.run()),
                tokio::spawn(datagram.run()),
                tokio::spawn(http.run()),
            ],
        };

        tracing::info!(
            "Platform started ({} mode): stream {}, datagram {}, http {}",
            self.broker.mode(),
            running.stream_addr,
            running.datagram_addr,
            running.http_addr
        );
        Ok(running)
    }
}

/// Handles to the serving tasks of a started platform.
#[derive(Debug)]
pub struct RunningPlatform {
    stream_addr: SocketAddr,
    datagram_addr: SocketAddr,
    http_addr: SocketAddr,
    tasks: Vec<JoinHandle<Result<()>>>,
}

impl RunningPlatform {
    pub fn stream_addr(&self) -> SocketAddr {
        self.stream_addr
    }

    pub fn datagram_addr(&self) -> SocketAddr {
        self.datagram_addr
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Stops accepting on every transport. In-flight requests are dropped.
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        tracing::info!("Platform stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceBuilder;
    use hyper::Method;
    use ormi_common::protocol::{BoxError, ParamType, ServiceId, Value};
    use std::sync::Mutex;

    struct Calc;

    fn calc() -> Service {
        ServiceBuilder::new(Calc)
            .base_path("/calc")
            .method("add", &[ParamType::Int, ParamType::Int], ParamType::Int, |_, a| {
                Ok(Value::Int(a.i32(0)? + a.i32(1)?))
            })
            .route(Method::POST, "/add")
            .build()
    }

    #[derive(Default)]
    struct Audit(Mutex<Vec<String>>);

    impl Extension for Audit {
        fn name(&self) -> &str {
            "audit"
        }

        fn on_register(&self, service: &RegisteredService) -> std::result::Result<(), BoxError> {
            self.0.lock().unwrap().push(format!("+{}", service.id()));
            Ok(())
        }

        fn on_unregister(&self, service: &ServiceId) -> std::result::Result<(), BoxError> {
            self.0.lock().unwrap().push(format!("-{}", service));
            Ok(())
        }
    }

    #[test]
    fn test_register_publishes_routes_and_notifies() {
        let platform = Platform::new(MiddlewareConfig::ephemeral());
        let audit = Arc::new(Audit::default());
        platform.add_extension(audit.clone());

        platform.register("Calc", calc()).unwrap();
        assert_eq!(platform.routes().len(), 1);

        assert!(platform.unregister("Calc"));
        assert!(!platform.unregister("Calc"));
        assert!(platform.routes().is_empty());

        assert_eq!(*audit.0.lock().unwrap(), vec!["+Calc", "-Calc"]);
    }

    #[tokio::test]
    async fn test_start_binds_ephemeral_ports() {
        let platform = Platform::new(MiddlewareConfig::ephemeral());
        platform.register("Calc", calc()).unwrap();

        let running = platform.start().await.unwrap();
        assert_ne!(running.stream_addr().port(), 0);
        assert_ne!(running.datagram_addr().port(), 0);
        assert_ne!(running.http_addr().port(), 0);
        running.shutdown();
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let mut config = MiddlewareConfig::ephemeral();
        config.http_pool_size = 0;
        let err = Platform::new(config).start().await.unwrap_err();
        assert!(err.to_string().contains("http pool size"));
    }
}
