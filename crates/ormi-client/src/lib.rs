//! ORMI Client
//!
//! Thin clients for the three ORMI transports:
//! - [`StreamClient`]: one `service|method|params` line per connection
//! - [`DatagramClient`]: one request datagram, one reply datagram
//! - [`HttpClient`]: `POST /invoke/{service}/{method}` and routed paths
//!
//! # Example
//!
//! ```no_run
//! use ormi_client::StreamClient;
//! use ormi_common::transport::Reply;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = StreamClient::new("127.0.0.1:8085");
//!     match client.call("Calculator", "add", "[10,20]").await.unwrap() {
//!         Reply::Success(json) => println!("{}", json),
//!         Reply::Error(message) => eprintln!("{}", message),
//!     }
//! }
//! ```

pub mod client;

pub use client::{encode_params, DatagramClient, HttpClient, HttpReply, StreamClient, DEFAULT_TIMEOUT};
