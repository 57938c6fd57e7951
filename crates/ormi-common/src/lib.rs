//! ORMI Common Types, Marshalling and Framing
//!
//! This crate provides the protocol definitions shared by ORMI servers and
//! clients.
//!
//! # Overview
//!
//! ORMI (Object Remote Method Invocation) lets an application register plain
//! Rust objects under a logical name and have remote callers invoke their
//! methods over a byte-stream, datagram or HTTP transport. Every transport
//! carries the same JSON parameter/result convention:
//!
//! - **Protocol Layer**: [`Value`], [`ParamType`], [`ServiceId`] and the
//!   [`RemotingError`] taxonomy
//! - **Marshalling**: [`JsonMarshaller`], JSON text to typed values and back
//! - **Transport Layer**: line framing and HTTP envelopes
//!
//! # Example
//!
//! ```
//! use ormi_common::{JsonMarshaller, ParamType, Value};
//! use ormi_common::transport::LineCodec;
//!
//! let request = LineCodec::decode_request("Calc|add|[10,20]").unwrap();
//! let args = JsonMarshaller::new()
//!     .decode_parameters(&request.params, &[ParamType::Int, ParamType::Int])
//!     .unwrap();
//! assert_eq!(args[1], Value::Int(20));
//! ```

pub mod marshal;
pub mod protocol;
pub mod transport;

pub use marshal::JsonMarshaller;
pub use protocol::*;
