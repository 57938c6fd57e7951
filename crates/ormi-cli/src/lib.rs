//! # ORMI CLI
//!
//! Library half of the `ormi` binary.
//!
//! - [`demo`]: the `Calculator` service the `serve` command registers
//! - [`call`]: one-off calls over any transport, printing raw JSON
//!
//! ## Key Commands
//!
//! - `ormi serve`: start the platform with the demo service
//! - `ormi call`: make one call (outputs raw JSON for scripting)
//! - `ormi ping`: send a datagram heartbeat

pub mod call;
pub mod demo;
