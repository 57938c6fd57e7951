//! Middleware configuration.
//!
//! One [`MiddlewareConfig`] value describes the whole platform: bind host,
//! the port and worker bound of each transport, the invocation mode and the
//! async pool. Worker bounds are clamped to at least one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the broker runs business methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationMode {
    /// On a blocking worker, waited for without a bound.
    #[default]
    Sync,
    /// On the async invoker pool, waited for up to the configured timeout.
    Async,
}

impl FromStr for InvocationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sync" => Ok(InvocationMode::Sync),
            "async" => Ok(InvocationMode::Async),
            other => Err(format!("unknown invocation mode '{}' (expected sync or async)", other)),
        }
    }
}

impl fmt::Display for InvocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationMode::Sync => f.write_str("sync"),
            InvocationMode::Async => f.write_str("async"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    pub host: String,
    pub stream_port: u16,
    pub datagram_port: u16,
    pub http_port: u16,
    pub stream_pool_size: usize,
    pub datagram_pool_size: usize,
    pub http_pool_size: usize,
    pub async_pool_size: usize,
    pub invocation_mode: InvocationMode,
    pub async_timeout_ms: u64,
    /// How long a stream connection may take to send its request line, and
    /// an HTTP connection the headers of a request.
    pub read_timeout_ms: u64,
    /// Distinct `service#method` keys the latency recorder tracks.
    pub max_tracked_methods: usize,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            stream_port: 8085,
            datagram_port: 8086,
            http_port: 8082,
            stream_pool_size: 10,
            datagram_pool_size: 20,
            http_pool_size: 16,
            async_pool_size: 8,
            invocation_mode: InvocationMode::Sync,
            async_timeout_ms: 5000,
            read_timeout_ms: 30_000,
            max_tracked_methods: 1000,
        }
    }
}

impl MiddlewareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every transport to an ephemeral port on localhost.
    pub fn ephemeral() -> Self {
        Self::default()
            .with_stream_port(0)
            .with_datagram_port(0)
            .with_http_port(0)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_stream_port(mut self, port: u16) -> Self {
        self.stream_port = port;
        self
    }

    pub fn with_datagram_port(mut self, port: u16) -> Self {
        self.datagram_port = port;
        self
    }

    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    pub fn with_stream_pool_size(mut self, size: usize) -> Self {
        self.stream_pool_size = size.max(1);
        self
    }

    pub fn with_datagram_pool_size(mut self, size: usize) -> Self {
        self.datagram_pool_size = size.max(1);
        self
    }

    pub fn with_http_pool_size(mut self, size: usize) -> Self {
        self.http_pool_size = size.max(1);
        self
    }

    pub fn with_async_pool_size(mut self, size: usize) -> Self {
        self.async_pool_size = size.max(1);
        self
    }

    pub fn with_invocation_mode(mut self, mode: InvocationMode) -> Self {
        self.invocation_mode = mode;
        self
    }

    pub fn with_async_timeout(mut self, timeout: Duration) -> Self {
        self.async_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_max_tracked_methods(mut self, max: usize) -> Self {
        self.max_tracked_methods = max;
        self
    }

    pub fn async_timeout(&self) -> Duration {
        Duration::from_millis(self.async_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn stream_addr(&self) -> String {
        format!("{}:{}", self.host, self.stream_port)
    }

    pub fn datagram_addr(&self) -> String {
        format!("{}:{}", self.host, self.datagram_port)
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }

        if self.invocation_mode == InvocationMode::Async && self.async_timeout_ms == 0 {
            return Err("async timeout must be greater than zero".to_string());
        }

        if self.read_timeout_ms == 0 {
            return Err("read timeout must be greater than zero".to_string());
        }

        let pools = [
            ("stream", self.stream_pool_size),
            ("datagram", self.datagram_pool_size),
            ("http", self.http_pool_size),
            ("async", self.async_pool_size),
        ];
        if let Some((name, _)) = pools.iter().find(|(_, size)| *size == 0) {
            return Err(format!("{} pool size must be at least 1", name));
        }

        Ok(())
    }
}
