//! Transport Servers
//!
//! Each transport runs one accept/receive loop and bounds the requests it
//! processes concurrently with its own semaphore, so a busy transport never
//! starves the others.
//!
//! - [`StreamServer`]: one `service|method|params` line per TCP connection
//! - [`DatagramServer`]: one request per UDP datagram, plus `HEARTBEAT`
//! - [`HttpServer`]: route table and `POST /invoke/{service}/{method}`

use std::future::Future;
use std::time::Duration;

pub mod datagram;
pub mod http;
pub mod stream;

pub use datagram::DatagramServer;
pub use http::HttpServer;
pub use stream::StreamServer;

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Default bound on how long a client may take to send its request.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs `accept` until it succeeds.
///
/// Failures such as `EMFILE` or `ECONNABORTED` are logged and retried after
/// [`ACCEPT_BACKOFF`], so a transport never stops accepting.
pub(crate) async fn accept_retrying<T, F, Fut>(transport: &str, mut accept: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(accepted) => return accepted,
            Err(e) => {
                tracing::warn!("Failed to accept {} connection: {}", transport, e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}
