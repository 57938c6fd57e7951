//! ORMI Server
//!
//! This crate provides the remote invocation engine: services are declared
//! with [`ServiceBuilder`], registered in a [`ServiceRegistry`], and invoked
//! through the [`Broker`] by any of the three transport servers.
//!
//! # Architecture
//!
//! ```text
//! transport (stream | datagram | http)
//!     -> Dispatcher: lookup, decode parameters
//!     -> Broker: extensions, resolve, invoke (sync or async), record latency
//!     -> Invoker: run the handler, classify failures
//! ```
//!
//! [`Platform`] wires all of it from one [`MiddlewareConfig`].

pub mod async_invoker;
pub mod broker;
pub mod config;
pub mod dispatch;
pub mod extension;
pub mod invoker;
pub mod platform;
pub mod registry;
pub mod resolver;
pub mod routes;
pub mod service;
pub mod transport;

pub use async_invoker::{AsyncHandle, AsyncInvoker};
pub use broker::{Broker, InvocationRequest, InvocationResponse};
pub use config::{InvocationMode, MiddlewareConfig};
pub use dispatch::Dispatcher;
pub use extension::{Extension, ExtensionManager};
pub use invoker::{Invoker, ResolvedCall};
pub use platform::{Platform, RunningPlatform};
pub use registry::ServiceRegistry;
pub use routes::RouteTable;
pub use service::{Args, RegisteredService, RemoteMethod, Service, ServiceBuilder};
