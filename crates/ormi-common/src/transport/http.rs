//! HTTP Transport Utilities
//!
//! This module provides the HTTP-specific pieces of the wire contract that
//! server and client share.
//!
//! # Architecture
//!
//! - Success: status 200, body is the JSON-encoded result
//! - Failure: status 404/400/405/500, body is `{"error": <kind>, "message": <text>}`
//!
//! # Components
//!
//! - **[`HttpTransport`]**: Status mapping and response construction
//! - **[`ErrorBody`]**: The JSON error envelope
//! - **[`HyperRequest`]** / **[`HyperResponse`]**: Type aliases for Hyper messages

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::protocol::error::{ErrorKind, RemotingError};

/// Type alias for Hyper incoming requests
pub type HyperRequest = Request<Incoming>;

/// Type alias for Hyper responses with full body
pub type HyperResponse = Response<Full<Bytes>>;

/// Content type of every response body.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Base path of the canonical `POST /invoke/{service}/{method}` route.
pub const INVOKE_BASE_PATH: &str = "/invoke";

/// JSON error envelope returned with every non-200 status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

impl From<&RemotingError> for ErrorBody {
    fn from(err: &RemotingError) -> Self {
        ErrorBody::new(err.kind().as_str(), err.to_string())
    }
}

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Maps an error kind to its HTTP status.
    ///
    /// - 404: unknown service, route or method
    /// - 400: malformed request, marshalling failure, ambiguous overload
    /// - 500: everything that went wrong after the call was accepted
    pub fn status_for(kind: ErrorKind) -> StatusCode {
        match kind {
            ErrorKind::NotFound | ErrorKind::MethodNotFound => StatusCode::NOT_FOUND,
            ErrorKind::MarshallingError | ErrorKind::AmbiguousMethod | ErrorKind::InvalidRequest => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::InvocationError
            | ErrorKind::CalleeFailure
            | ErrorKind::Timeout
            | ErrorKind::RegistrationError
            | ErrorKind::TransportError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a 200 response carrying JSON result text
    pub fn to_http_response(json: String) -> HyperResponse {
        Self::json_response(StatusCode::OK, Bytes::from(json))
    }

    /// Create an error response for a remoting error
    pub fn to_http_error(err: &RemotingError) -> HyperResponse {
        Self::error_response(Self::status_for(err.kind()), ErrorBody::from(err))
    }

    /// Create an error response with an explicit status
    pub fn error_response(status: StatusCode, body: ErrorBody) -> HyperResponse {
        match serde_json::to_vec(&body) {
            Ok(bytes) => Self::json_response(status, Bytes::from(bytes)),
            Err(_) => Self::json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(
                    br#"{"error":"InternalServerError","message":"Failed to marshal error response."}"#,
                ),
            ),
        }
    }

    fn json_response(status: StatusCode, body: Bytes) -> HyperResponse {
        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        response
    }

    /// Path of the canonical invoke route for a service method
    pub fn invoke_path(service: &str, method: &str) -> String {
        format!("{}/{}/{}", INVOKE_BASE_PATH, service, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(HttpTransport::status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(HttpTransport::status_for(ErrorKind::MethodNotFound), StatusCode::NOT_FOUND);
        assert_eq!(HttpTransport::status_for(ErrorKind::MarshallingError), StatusCode::BAD_REQUEST);
        assert_eq!(
            HttpTransport::status_for(ErrorKind::CalleeFailure),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(HttpTransport::status_for(ErrorKind::Timeout), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_response_headers() {
        let err = RemotingError::NotFound("Calc".into());
        let response = HttpTransport::to_http_error(&err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_error_body_from_error() {
        let body = ErrorBody::from(&RemotingError::MethodNotFound("missing".into()));
        assert_eq!(body.error, "MethodNotFound");
        assert!(body.message.contains("missing"));
    }

    #[test]
    fn test_invoke_path() {
        assert_eq!(HttpTransport::invoke_path("Calc", "add"), "/invoke/Calc/add");
    }
}
