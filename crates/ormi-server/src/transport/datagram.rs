//! Datagram transport.
//!
//! Every datagram carries one `service|method|params` request and gets one
//! reply datagram back. A bare `HEARTBEAT` is answered with `HEARTBEAT_ACK`
//! directly from the receive loop.

use ormi_common::protocol::error::{RemotingError, Result};
use ormi_common::transport::{LineCodec, HEARTBEAT, HEARTBEAT_ACK, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;

use crate::dispatch::Dispatcher;

pub struct DatagramServer {
    socket: Arc<UdpSocket>,
    dispatcher: Arc<Dispatcher>,
    workers: Arc<Semaphore>,
}

impl DatagramServer {
    pub async fn bind(addr: &str, dispatcher: Arc<Dispatcher>, pool_size: usize) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| RemotingError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;

        Ok(Self {
            socket: Arc::new(socket),
            dispatcher,
            workers: Arc::new(Semaphore::new(pool_size.max(1))),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| RemotingError::Transport(format!("Failed to get local addr: {}", e)))
    }

    pub async fn run(self) -> Result<()> {
        tracing::info!("Datagram server listening on {}", self.local_addr()?);

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (len, peer_addr) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    // ICMP errors from earlier replies surface here on some platforms
                    tracing::warn!("Datagram receive failed: {}", e);
                    continue;
                }
            };

            let payload = String::from_utf8_lossy(&buf[..len]).into_owned();

            if payload.trim() == HEARTBEAT {
                if let Err(e) = self.socket.send_to(HEARTBEAT_ACK.as_bytes(), peer_addr).await {
                    tracing::warn!("Failed to answer heartbeat from {}: {}", peer_addr, e);
                }
                continue;
            }

            let permit = Arc::clone(&self.workers)
                .acquire_owned()
                .await
                .map_err(|e| RemotingError::Transport(format!("Worker pool closed: {}", e)))?;

            let socket = Arc::clone(&self.socket);
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                let _permit = permit;
                let mut reply = dispatcher.dispatch_line(&payload).await;
                if reply.len() > MAX_DATAGRAM_SIZE {
                    reply = LineCodec::encode_error(&format!(
                        "Response of {} bytes exceeds the datagram limit",
                        reply.len()
                    ));
                }
                if let Err(e) = socket.send_to(reply.as_bytes(), peer_addr).await {
                    tracing::error!("Failed to send datagram reply to {}: {}", peer_addr, e);
                }
            });
        }
    }
}
