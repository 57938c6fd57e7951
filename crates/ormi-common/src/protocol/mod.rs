pub mod error;
pub mod requests;
pub mod value;


pub use error::{BoxError, ErrorKind, RemotingError, Result};
pub use requests::{MethodName, ServiceId};
pub use value::{ParamType, Value, ValueKind};
