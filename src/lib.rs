//! edge-echo: a single-threaded, edge-triggered echo server.
//!
//! The crate is built around a small reactor:
//! - `net`: IPv4 endpoints and owned socket handles
//! - `runtime`: readiness multiplexer, connection registry and the loop
//!   that drains every ready descriptor into a read handler
//!
//! The shipped read handler echoes each chunk back to its sender.

pub mod config;
pub mod error;
pub mod net;
pub mod runtime;

pub use error::{Error, Result};
