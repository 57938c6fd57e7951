use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use super::error::{RemotingError, Result};

pub type MethodName = String;

/// Logical name a service is registered under.
///
/// Equality is by value. An id is never empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RemotingError::Registration(
                "Service id cannot be empty".to_string(),
            ));
        }
        Ok(ServiceId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ServiceId {
    type Error = RemotingError;

    fn try_from(value: String) -> Result<Self> {
        ServiceId::new(value)
    }
}

impl TryFrom<&str> for ServiceId {
    type Error = RemotingError;

    fn try_from(value: &str) -> Result<Self> {
        ServiceId::new(value)
    }
}

impl From<ServiceId> for String {
    fn from(id: ServiceId) -> Self {
        id.0
    }
}

impl Borrow<str> for ServiceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ServiceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
