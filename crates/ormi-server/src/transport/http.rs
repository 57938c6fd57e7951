//! HTTP Transport Server
//!
//! This module provides the HTTP/1.1 binding of the broker using hyper.
//!
//! # Architecture
//!
//! The HTTP server:
//! - Listens on a TCP socket for incoming HTTP connections
//! - Spawns a tokio task per connection and holds a worker permit only
//!   while a request is handled
//! - Drops connections that take longer than the read timeout to send
//!   request headers
//! - Resolves `POST /invoke/{service}/{method}` directly and every other
//!   path through the [`RouteTable`]
//! - Reads the body as the JSON parameter array (an empty body is `[]`)
//! - Answers 200 with the JSON result, or a JSON error body with the status
//!   for its error kind
//!
//! # Example
//!
//! ```no_run
//! use ormi_server::transport::HttpServer;
//! use ormi_server::Platform;
//! use ormi_server::config::MiddlewareConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let platform = Platform::new(MiddlewareConfig::default());
//!     let server = HttpServer::bind(
//!         "127.0.0.1:8082",
//!         platform.dispatcher(),
//!         platform.routes(),
//!         16,
//!     )
//!     .await
//!     .unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

use http_body_util::BodyExt;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use ormi_common::protocol::error::{RemotingError, Result};
use ormi_common::transport::{ErrorBody, HttpTransport, HyperRequest, HyperResponse, INVOKE_BASE_PATH};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::dispatch::Dispatcher;
use crate::routes::{RouteMatch, RouteTable};
use crate::transport::{accept_retrying, DEFAULT_READ_TIMEOUT};

pub struct HttpServer {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    routes: Arc<RouteTable>,
    workers: Arc<Semaphore>,
    read_timeout: Duration,
}

impl HttpServer {
    /// Binds the listener.
    ///
    /// # Arguments
    /// * `addr` - `host:port` to listen on, port 0 for an ephemeral one
    /// * `dispatcher` - shared request dispatcher
    /// * `routes` - verb + path table consulted outside `/invoke`
    /// * `pool_size` - requests processed at once (zero is treated as one)
    ///
    /// # Errors
    /// `Transport` if the address cannot be bound.
    pub async fn bind(
        addr: &str,
        dispatcher: Arc<Dispatcher>,
        routes: Arc<RouteTable>,
        pool_size: usize,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RemotingError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;

        Ok(Self {
            listener,
            dispatcher,
            routes,
            workers: Arc::new(Semaphore::new(pool_size.max(1))),
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// How long a connection may take to send the headers of a request.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| RemotingError::Transport(format!("Failed to get local address: {}", e)))
    }

    /// Serves connections until the task is dropped.
    ///
    /// Every connection gets its own task. The worker pool bounds requests,
    /// not connections: a permit is held only while a request is handled,
    /// so idle keep-alive connections never block other clients.
    pub async fn run(self) -> Result<()> {
        tracing::info!("HTTP server listening on {}", self.local_addr()?);

        loop {
            let (stream, peer_addr) = accept_retrying("HTTP", || self.listener.accept()).await;

            let io = TokioIo::new(stream);
            let dispatcher = Arc::clone(&self.dispatcher);
            let routes = Arc::clone(&self.routes);
            let workers = Arc::clone(&self.workers);
            let read_timeout = self.read_timeout;

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let dispatcher = Arc::clone(&dispatcher);
                    let routes = Arc::clone(&routes);
                    let workers = Arc::clone(&workers);
                    async move {
                        let _permit = match workers.acquire_owned().await {
                            Ok(permit) => permit,
                            Err(e) => {
                                let err = RemotingError::Transport(format!("Worker pool closed: {}", e));
                                return Ok::<_, Infallible>(HttpTransport::to_http_error(&err));
                            }
                        };
                        Ok::<_, Infallible>(handle_request(dispatcher, routes, req).await)
                    }
                });

                if let Err(err) = http1::Builder::new()
                    .timer(TokioTimer::new())
                    .header_read_timeout(read_timeout)
                    .serve_connection(io, service)
                    .await
                {
                    tracing::debug!("HTTP connection from {} ended: {}", peer_addr, err);
                }
            });
        }
    }
}

/// Where an HTTP request is headed.
#[derive(Debug, PartialEq, Eq)]
enum Target {
    Call { service: String, method: String },
    MethodNotAllowed(String),
    NotFound(String),
}

fn route(routes: &RouteTable, verb: &Method, path: &str) -> Target {
    if let Some(rest) = path
        .strip_prefix(INVOKE_BASE_PATH)
        .and_then(|rest| rest.strip_prefix('/'))
    {
        let mut segments = rest.split('/');
        if let (Some(service), Some(method), None) = (segments.next(), segments.next(), segments.next()) {
            if !service.is_empty() && !method.is_empty() {
                if *verb != Method::POST {
                    return Target::MethodNotAllowed(format!("{} is not supported on {}, use POST", verb, path));
                }
                return Target::Call {
                    service: percent_decode(service),
                    method: percent_decode(method),
                };
            }
        }
    }

    match routes.resolve(verb, path) {
        RouteMatch::Found(target) => Target::Call {
            service: target.service.to_string(),
            method: target.method,
        },
        RouteMatch::MethodNotAllowed(allowed) => {
            let allowed: Vec<&str> = allowed.iter().map(Method::as_str).collect();
            Target::MethodNotAllowed(format!(
                "{} is not supported on {}, allowed: {}",
                verb,
                path,
                allowed.join(", ")
            ))
        }
        RouteMatch::NotFound => Target::NotFound(format!("No route for {} {}", verb, path)),
    }
}

/// Decodes `%XX` escapes. Malformed escapes are kept verbatim.
fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

async fn handle_request(
    dispatcher: Arc<Dispatcher>,
    routes: Arc<RouteTable>,
    req: HyperRequest,
) -> HyperResponse {
    let verb = req.method().clone();
    let path = req.uri().path().to_string();
    tracing::debug!("HTTP {} {}", verb, path);

    let (service, method) = match route(&routes, &verb, &path) {
        Target::Call { service, method } => (service, method),
        Target::MethodNotAllowed(message) => {
            return HttpTransport::error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorBody::new("MethodNotAllowed", message),
            );
        }
        Target::NotFound(message) => {
            return HttpTransport::error_response(StatusCode::NOT_FOUND, ErrorBody::new("NotFound", message));
        }
    };

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let err = RemotingError::InvalidRequest(format!("Failed to read request body: {}", e));
            return HttpTransport::to_http_error(&err);
        }
    };

    let params = match std::str::from_utf8(&body) {
        Ok(text) => text,
        Err(e) => {
            let err = RemotingError::InvalidRequest(format!("Request body is not UTF-8: {}", e));
            return HttpTransport::to_http_error(&err);
        }
    };

    match dispatcher.dispatch_json(&service, &method, params).await {
        Ok(json) => HttpTransport::to_http_response(json),
        Err(e) => {
            tracing::debug!("HTTP {} {} failed: {}", verb, path, e);
            HttpTransport::to_http_error(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceBuilder;
    use ormi_common::protocol::{ParamType, Value};

    struct Calc;

    fn routes() -> RouteTable {
        let table = RouteTable::new();
        let service = ServiceBuilder::new(Calc)
            .base_path("/calculator")
            .method("status", &[], ParamType::Str, |_, _| Ok(Value::from("ok")))
            .route(Method::GET, "/status")
            .build()
            .into_registered(ormi_common::protocol::ServiceId::new("Calc").unwrap());
        table.add_service(&service);
        table
    }

    #[test]
    fn test_invoke_path() {
        assert_eq!(
            route(&routes(), &Method::POST, "/invoke/Calc/add"),
            Target::Call {
                service: "Calc".into(),
                method: "add".into()
            }
        );
    }

    #[test]
    fn test_invoke_path_requires_post() {
        assert!(matches!(
            route(&routes(), &Method::GET, "/invoke/Calc/add"),
            Target::MethodNotAllowed(_)
        ));
    }

    #[test]
    fn test_invoke_path_with_extra_segments_falls_through() {
        assert!(matches!(
            route(&routes(), &Method::POST, "/invoke/Calc/add/more"),
            Target::NotFound(_)
        ));
    }

    #[test]
    fn test_route_table_paths() {
        assert_eq!(
            route(&routes(), &Method::GET, "/calculator/status"),
            Target::Call {
                service: "Calc".into(),
                method: "status".into()
            }
        );
        assert!(matches!(
            route(&routes(), &Method::DELETE, "/calculator/status"),
            Target::MethodNotAllowed(_)
        ));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("My%20Service"), "My Service");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }
}
