use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use ormi_common::protocol::error::{RemotingError, Result};
use ormi_common::protocol::Value;
use ormi_common::transport::{LineCodec, Reply, HEARTBEAT, HEARTBEAT_ACK, JSON_CONTENT_TYPE, MAX_DATAGRAM_SIZE};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UdpSocket};

/// Default time a client waits for a reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Encodes arguments as the JSON parameter array expected by every transport.
pub fn encode_params(args: &[Value]) -> Result<String> {
    let items = args.iter().map(Value::to_json).collect::<Result<Vec<_>>>()?;
    serde_json::to_string(&items).map_err(|e| RemotingError::Marshalling {
        message: format!("Failed to encode parameters: {}", e),
        source: Some(e),
    })
}

async fn with_timeout<T>(timeout: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| RemotingError::Timeout(timeout.as_millis() as u64))?
}

/// Client for the byte-stream transport.
///
/// Opens a fresh connection for each call, so one client can be shared by
/// concurrent tasks.
#[derive(Debug, Clone)]
pub struct StreamClient {
    addr: String,
    timeout: Duration,
}

impl StreamClient {
    /// Creates a client for the stream server at `addr`.
    ///
    /// No connection is made until the first call.
    ///
    /// # Arguments
    /// * `addr` - server address as `host:port`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ormi_client::StreamClient;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let client = StreamClient::new("127.0.0.1:8085").with_timeout(Duration::from_secs(5));
    ///     let reply = client.call("Calculator", "add", "[10,20]").await.unwrap();
    ///     println!("{:?}", reply);
    /// }
    /// ```
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bounds the whole exchange: connect, send and reply.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends `service|method|params` and returns the decoded reply.
    pub async fn call(&self, service: &str, method: &str, params: &str) -> Result<Reply> {
        let line = LineCodec::encode_request(service, method, params);
        let raw = self.send_line(&line).await?;
        Ok(LineCodec::decode_reply(&raw))
    }

    /// Like [`call`](Self::call), encoding `args` first.
    pub async fn invoke(&self, service: &str, method: &str, args: &[Value]) -> Result<Reply> {
        self.call(service, method, &encode_params(args)?).await
    }

    /// Sends one raw line and returns the raw reply line.
    pub async fn send_line(&self, line: &str) -> Result<String> {
        with_timeout(self.timeout, async {
            let stream = TcpStream::connect(&self.addr)
                .await
                .map_err(|e| RemotingError::Transport(format!("Failed to connect to {}: {}", self.addr, e)))?;
            let (read_half, mut write_half) = stream.into_split();

            write_half.write_all(line.as_bytes()).await?;
            write_half.write_all(b"\n").await?;
            write_half.flush().await?;

            let mut reply = String::new();
            BufReader::new(read_half).read_line(&mut reply).await?;
            if reply.is_empty() {
                return Err(RemotingError::Transport(format!(
                    "Connection to {} closed without a reply",
                    self.addr
                )));
            }
            Ok::<_, RemotingError>(reply.trim_end_matches(['\r', '\n']).to_string())
        })
        .await
    }
}

/// Client for the datagram transport.
#[derive(Debug, Clone)]
pub struct DatagramClient {
    addr: String,
    timeout: Duration,
}

impl DatagramClient {
    /// Creates a client for the datagram server at `addr` (`host:port`).
    ///
    /// Every call binds a fresh ephemeral socket, so replies to one call
    /// never reach another.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// How long to wait for the reply datagram. A lost datagram surfaces as
    /// `Timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends `service|method|params` in one datagram.
    pub async fn call(&self, service: &str, method: &str, params: &str) -> Result<Reply> {
        let raw = self.exchange(&LineCodec::encode_request(service, method, params)).await?;
        Ok(LineCodec::decode_reply(&raw))
    }

    pub async fn invoke(&self, service: &str, method: &str, args: &[Value]) -> Result<Reply> {
        self.call(service, method, &encode_params(args)?).await
    }

    /// Returns whether the server answered the heartbeat.
    pub async fn heartbeat(&self) -> Result<bool> {
        Ok(self.exchange(HEARTBEAT).await? == HEARTBEAT_ACK)
    }

    /// Sends one datagram and waits for one reply datagram.
    pub async fn exchange(&self, payload: &str) -> Result<String> {
        if payload.len() > MAX_DATAGRAM_SIZE {
            return Err(RemotingError::InvalidRequest(format!(
                "Request of {} bytes exceeds the datagram limit",
                payload.len()
            )));
        }

        with_timeout(self.timeout, async {
            let socket = UdpSocket::bind("0.0.0.0:0")
                .await
                .map_err(|e| RemotingError::Transport(format!("Failed to bind socket: {}", e)))?;
            socket
                .connect(&self.addr)
                .await
                .map_err(|e| RemotingError::Transport(format!("Failed to connect to {}: {}", self.addr, e)))?;
            socket.send(payload.as_bytes()).await?;

            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            let len = socket.recv(&mut buf).await?;
            Ok::<_, RemotingError>(String::from_utf8_lossy(&buf[..len]).into_owned())
        })
        .await
    }
}

/// Status and body of an HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client for the HTTP transport.
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    timeout: Duration,
    client: Client<hyper_util::client::legacy::connect::HttpConnector, Full<Bytes>>,
}

impl HttpClient {
    /// Creates a client backed by a pooled hyper connection.
    ///
    /// # Arguments
    /// * `addr` - `host:port` or a full `http://` URL, trailing `/` ignored
    ///
    /// # Example
    ///
    /// ```
    /// use ormi_client::HttpClient;
    ///
    /// let client = HttpClient::new("127.0.0.1:8082/");
    /// assert_eq!(client.base_url(), "http://127.0.0.1:8082");
    /// ```
    pub fn new(addr: impl Into<String>) -> Self {
        let addr = addr.into();
        let base_url = if addr.starts_with("http://") {
            addr.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", addr.trim_end_matches('/'))
        };

        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /invoke/{service}/{method}` with `params` as the body.
    pub async fn invoke(&self, service: &str, method: &str, params: &str) -> Result<HttpReply> {
        let path = format!("/invoke/{}/{}", encode_segment(service), encode_segment(method));
        self.request(Method::POST, &path, params).await
    }

    pub async fn post(&self, path: &str, body: &str) -> Result<HttpReply> {
        self.request(Method::POST, path, body).await
    }

    pub async fn get(&self, path: &str) -> Result<HttpReply> {
        self.request(Method::GET, path, "").await
    }

    pub async fn request(&self, method: Method, path: &str, body: &str) -> Result<HttpReply> {
        let url = format!("{}{}", self.base_url, path);
        let request = Request::builder()
            .method(method)
            .uri(&url)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .body(Full::new(Bytes::from(body.to_string())))
            .map_err(|e| RemotingError::Transport(format!("Failed to build request: {}", e)))?;

        with_timeout(self.timeout, async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| RemotingError::Transport(format!("HTTP request failed: {}", e)))?;

            let status = response.status().as_u16();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| RemotingError::Transport(format!("Failed to read response: {}", e)))?
                .to_bytes();

            tracing::debug!("HTTP {} -> {}", url, status);
            Ok::<_, RemotingError>(HttpReply {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            })
        })
        .await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Percent-encodes everything outside the unreserved set.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
