use crate::protocol::error::{RemotingError, Result};

/// Separator between the fields of a request line.
pub const SEPARATOR: char = '|';
/// Prefix of an error reply line.
pub const ERROR_PREFIX: &str = "ERROR: ";
/// Datagram payload answered without reaching the broker.
pub const HEARTBEAT: &str = "HEARTBEAT";
/// Reply to [`HEARTBEAT`].
pub const HEARTBEAT_ACK: &str = "HEARTBEAT_ACK";

/// A parsed `service|method|params` request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub service: String,
    pub method: String,
    /// Raw JSON parameter array, unparsed.
    pub params: String,
}

/// A reply line as seen by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// JSON-encoded result.
    Success(String),
    /// Message following the `ERROR: ` prefix.
    Error(String),
}

/// Codec for the line-oriented framing shared by the stream and datagram
/// transports.
///
/// # Wire Format
///
/// ```text
/// request: <service>|<method>|<json params array>
/// reply:   <json result>            on success
///          ERROR: <message>         on failure
/// ```
///
/// The parameter array is the last field, so it may itself contain `|`.
///
/// # Example
///
/// ```
/// use ormi_common::transport::{LineCodec, Reply};
///
/// let line = LineCodec::encode_request("Calc", "add", "[10,20]");
/// let request = LineCodec::decode_request(&line).unwrap();
/// assert_eq!(request.method, "add");
///
/// assert_eq!(LineCodec::decode_reply("30"), Reply::Success("30".into()));
/// ```
pub struct LineCodec;

impl LineCodec {
    /// Encode a request line (without trailing newline)
    pub fn encode_request(service: &str, method: &str, params: &str) -> String {
        format!("{}{}{}{}{}", service, SEPARATOR, method, SEPARATOR, params)
    }

    /// Decode a request line
    ///
    /// Trailing CR/LF is ignored. Fails with `InvalidRequest` for an empty
    /// line or a line with fewer than three fields.
    pub fn decode_request(line: &str) -> Result<RequestLine> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(RemotingError::InvalidRequest("Empty request".to_string()));
        }

        let mut parts = line.splitn(3, SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(service), Some(method), Some(params)) => Ok(RequestLine {
                service: service.trim().to_string(),
                method: method.trim().to_string(),
                params: params.to_string(),
            }),
            _ => Err(RemotingError::InvalidRequest(
                "Invalid request format. Expected: SERVICE|METHOD|PARAMS_JSON".to_string(),
            )),
        }
    }

    /// Encode a success reply carrying JSON result text
    pub fn encode_success(json: &str) -> String {
        json.to_string()
    }

    /// Encode an error reply
    ///
    /// Newlines in the message are flattened so the reply stays one line.
    pub fn encode_error(message: &str) -> String {
        format!("{}{}", ERROR_PREFIX, message.replace(['\r', '\n'], " "))
    }

    /// Decode a reply line
    pub fn decode_reply(line: &str) -> Reply {
        let line = line.trim_end_matches(['\r', '\n']);
        match line.strip_prefix(ERROR_PREFIX) {
            Some(message) => Reply::Error(message.to_string()),
            None => Reply::Success(line.to_string()),
        }
    }
}
