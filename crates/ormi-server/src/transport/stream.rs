//! Byte-stream transport.
//!
//! One request per connection: the client writes a single
//! `service|method|params` line, the server answers with one line and closes
//! the connection.

use ormi_common::protocol::error::{RemotingError, Result};
use ormi_common::transport::{LineCodec, MAX_LINE_LENGTH};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::dispatch::Dispatcher;
use crate::transport::{accept_retrying, DEFAULT_READ_TIMEOUT};

pub struct StreamServer {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    workers: Arc<Semaphore>,
    read_timeout: Duration,
}

impl StreamServer {
    /// Binds the listener.
    ///
    /// # Arguments
    /// * `addr` - `host:port` to listen on, port 0 for an ephemeral one
    /// * `dispatcher` - shared request dispatcher
    /// * `pool_size` - connections served at once (zero is treated as one)
    ///
    /// # Errors
    /// `Transport` if the address cannot be bound.
    pub async fn bind(addr: &str, dispatcher: Arc<Dispatcher>, pool_size: usize) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RemotingError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;

        Ok(Self {
            listener,
            dispatcher,
            workers: Arc::new(Semaphore::new(pool_size.max(1))),
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// How long a connection may take to send its request line.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| RemotingError::Transport(format!("Failed to get local addr: {}", e)))
    }

    /// Accepts connections until the task is dropped.
    ///
    /// A failed `accept` is logged and retried after a short pause.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Stream server listening on {}", self.local_addr()?);

        loop {
            // Wait for a free worker before taking the next connection
            let permit = Arc::clone(&self.workers)
                .acquire_owned()
                .await
                .map_err(|e| RemotingError::Transport(format!("Worker pool closed: {}", e)))?;

            let (stream, peer_addr) = accept_retrying("stream", || self.listener.accept()).await;

            tracing::debug!("Stream connection from {}", peer_addr);

            let dispatcher = Arc::clone(&self.dispatcher);
            let read_timeout = self.read_timeout;
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = handle_connection(stream, dispatcher, read_timeout).await {
                    tracing::error!("Stream connection error from {}: {}", peer_addr, e);
                }
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, dispatcher: Arc<Dispatcher>, read_timeout: Duration) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half.take(MAX_LINE_LENGTH as u64 + 1));

    let mut line = String::new();
    let reply = match tokio::time::timeout(read_timeout, reader.read_line(&mut line)).await {
        Err(_) => LineCodec::encode_error(&format!(
            "No request line within {}ms",
            read_timeout.as_millis()
        )),
        Ok(Ok(n)) if n > MAX_LINE_LENGTH => LineCodec::encode_error(&format!(
            "Request line exceeds {} bytes",
            MAX_LINE_LENGTH
        )),
        Ok(Ok(_)) => dispatcher.dispatch_line(&line).await,
        Ok(Err(e)) => LineCodec::encode_error(&format!("Failed to read request: {}", e)),
    };

    write_half.write_all(reply.as_bytes()).await?;
    write_half.write_all(b"\n").await?;
    write_half.flush().await?;
    write_half.shutdown().await?;
    Ok(())
}
