//! Readiness-based runtime.
//!
//! - `Multiplexer`: owns the OS readiness context (epoll/kqueue via mio)
//! - `Watched`: per-descriptor interest and registration state
//! - `ConnectionRegistry`: slab of accepted connections keyed by token
//! - `Reactor`: the poll/dispatch loop
//! - `ReadHandler`: what happens to the bytes (echo by default)

mod connection;
mod event_loop;
mod handler;
mod multiplexer;
mod watched;

pub use connection::{Connection, ConnectionRegistry};
pub use event_loop::{Reactor, ReactorOptions, LISTENER_TOKEN};
pub use handler::{EchoHandler, EchoMode, ReadHandler};
pub use multiplexer::{Multiplexer, MultiplexerStats, Ready, DEFAULT_EVENTS_CAPACITY};
pub use watched::{Interest, Readiness, Watched};

use crate::config::Config;
use crate::error::Result;
use crate::net::{ConnectionHandle, Endpoint};

/// Bind the configured address and run the echo reactor until the process
/// exits.
pub fn run(config: &Config) -> Result<()> {
    let endpoint = Endpoint::parse(&config.listen)?;
    let listener = ConnectionHandle::bind_listener(&endpoint, config.backlog)?;
    let handler = EchoHandler::new(config.echo_mode, config.buffer_size);

    let mut reactor = Reactor::new(listener, handler, ReactorOptions::from(config))?;
    reactor.run()
}
