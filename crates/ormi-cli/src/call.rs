//! One-off calls for the `call` and `ping` commands.

use anyhow::{anyhow, bail, Result};
use ormi_client::{DatagramClient, HttpClient, StreamClient};
use ormi_common::transport::Reply;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which transport a call goes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stream,
    Datagram,
    Http,
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" | "tcp" => Ok(Transport::Stream),
            "datagram" | "udp" => Ok(Transport::Datagram),
            "http" => Ok(Transport::Http),
            other => Err(format!(
                "unknown transport '{}' (expected stream, datagram or http)",
                other
            )),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stream => f.write_str("stream"),
            Transport::Datagram => f.write_str("datagram"),
            Transport::Http => f.write_str("http"),
        }
    }
}

/// Calls `service.method` and returns the raw JSON result.
///
/// Remote failures become errors carrying the server's message.
pub async fn call(
    transport: Transport,
    addr: &str,
    service: &str,
    method: &str,
    params: &str,
    timeout: Duration,
) -> Result<String> {
    // Reject malformed input locally rather than round-tripping it
    let parsed: serde_json::Value =
        serde_json::from_str(params).map_err(|e| anyhow!("Invalid JSON in params: {}", e))?;
    if !parsed.is_array() {
        bail!("Params must be a JSON array, got {}", params);
    }

    tracing::debug!("Calling {}#{} over {} at {}", service, method, transport, addr);

    let reply = match transport {
        Transport::Stream => {
            StreamClient::new(addr)
                .with_timeout(timeout)
                .call(service, method, params)
                .await?
        }
        Transport::Datagram => {
            DatagramClient::new(addr)
                .with_timeout(timeout)
                .call(service, method, params)
                .await?
        }
        Transport::Http => {
            let reply = HttpClient::new(addr)
                .with_timeout(timeout)
                .invoke(service, method, params)
                .await?;
            if reply.is_success() {
                Reply::Success(reply.body)
            } else {
                Reply::Error(format!("HTTP {}: {}", reply.status, reply.body))
            }
        }
    };

    match reply {
        Reply::Success(json) => Ok(json),
        Reply::Error(message) => Err(anyhow!("{}", message)),
    }
}

/// Sends a datagram heartbeat and fails unless it is acknowledged.
pub async fn ping(addr: &str, timeout: Duration) -> Result<()> {
    let client = DatagramClient::new(addr).with_timeout(timeout);
    if client.heartbeat().await? {
        Ok(())
    } else {
        bail!("{} answered the heartbeat with an unexpected reply", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_from_str() {
        assert_eq!("stream".parse::<Transport>().unwrap(), Transport::Stream);
        assert_eq!("UDP".parse::<Transport>().unwrap(), Transport::Datagram);
        assert_eq!("http".parse::<Transport>().unwrap(), Transport::Http);
        assert!("smoke".parse::<Transport>().is_err());
    }

    #[tokio::test]
    async fn test_call_rejects_non_array_params() {
        let err = call(
            Transport::Stream,
            "127.0.0.1:1",
            "Calculator",
            "add",
            "{\"a\":1}",
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[tokio::test]
    async fn test_call_rejects_invalid_json() {
        let err = call(
            Transport::Http,
            "127.0.0.1:1",
            "Calculator",
            "add",
            "[1,",
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }
}
