use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Boxed error type returned by business methods.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Wire-level classification of a [`RemotingError`].
///
/// The string form of each kind is what transports put on the wire (for
/// example the `error` field of an HTTP error body).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    MethodNotFound,
    AmbiguousMethod,
    MarshallingError,
    InvocationError,
    CalleeFailure,
    Timeout,
    RegistrationError,
    InvalidRequest,
    TransportError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::MethodNotFound => "MethodNotFound",
            ErrorKind::AmbiguousMethod => "AmbiguousMethod",
            ErrorKind::MarshallingError => "MarshallingError",
            ErrorKind::InvocationError => "InvocationError",
            ErrorKind::CalleeFailure => "CalleeFailure",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::RegistrationError => "RegistrationError",
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::TransportError => "TransportError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum RemotingError {
    #[error("Service not found: {0}")]
    NotFound(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Ambiguous method: {0}")]
    AmbiguousMethod(String),

    #[error("Marshalling error: {message}")]
    Marshalling {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Invocation error: {0}")]
    Invocation(String),

    /// The business method itself failed. `source` is the error it returned.
    #[error("{method} failed: {source}")]
    Callee {
        method: String,
        #[source]
        source: BoxError,
    },

    #[error("Invocation timed out after {0}ms")]
    Timeout(u64),

    #[error("Invalid registration: {0}")]
    Registration(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemotingError {
    pub fn marshalling(message: impl Into<String>) -> Self {
        RemotingError::Marshalling {
            message: message.into(),
            source: None,
        }
    }

    pub fn callee(method: impl Into<String>, source: impl Into<BoxError>) -> Self {
        RemotingError::Callee {
            method: method.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RemotingError::NotFound(_) => ErrorKind::NotFound,
            RemotingError::MethodNotFound(_) => ErrorKind::MethodNotFound,
            RemotingError::AmbiguousMethod(_) => ErrorKind::AmbiguousMethod,
            RemotingError::Marshalling { .. } => ErrorKind::MarshallingError,
            RemotingError::Invocation(_) => ErrorKind::InvocationError,
            RemotingError::Callee { .. } => ErrorKind::CalleeFailure,
            RemotingError::Timeout(_) => ErrorKind::Timeout,
            RemotingError::Registration(_) => ErrorKind::RegistrationError,
            RemotingError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            RemotingError::Transport(_) | RemotingError::Io(_) => ErrorKind::TransportError,
        }
    }
}

impl From<serde_json::Error> for RemotingError {
    fn from(err: serde_json::Error) -> Self {
        RemotingError::Marshalling {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<std::net::AddrParseError> for RemotingError {
    fn from(err: std::net::AddrParseError) -> Self {
        RemotingError::InvalidRequest(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RemotingError>;
