//! Single-threaded reactor loop.
//!
//! Readiness-based model: poll tells us when sockets are ready, then we
//! perform non-blocking accept/read syscalls until the OS reports
//! `WouldBlock`. Registrations are edge-triggered, so every ready
//! descriptor must be drained completely before going back to poll.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::net::{ConnectionHandle, Endpoint};
use crate::runtime::connection::ConnectionRegistry;
use crate::runtime::handler::ReadHandler;
use crate::runtime::multiplexer::{Multiplexer, MultiplexerStats, DEFAULT_EVENTS_CAPACITY};
use crate::runtime::watched::{Interest, Readiness, Watched};
use tracing::{debug, error, info, trace, warn};

/// Token reserved for the listening socket.
pub const LISTENER_TOKEN: usize = usize::MAX;

/// Tunables for [`Reactor`].
#[derive(Debug, Clone, Copy)]
pub struct ReactorOptions {
    /// Ready slots filled per poll.
    pub max_events: usize,
    pub max_connections: usize,
    /// Size of the read buffer used while draining one connection.
    pub buffer_size: usize,
    /// Timeout used by [`Reactor::run`]; negative blocks indefinitely.
    pub poll_timeout_ms: i32,
}

impl Default for ReactorOptions {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_EVENTS_CAPACITY,
            max_connections: 10_000,
            buffer_size: 1024,
            poll_timeout_ms: -1,
        }
    }
}

impl From<&Config> for ReactorOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_events: config.max_events,
            max_connections: config.max_connections,
            buffer_size: config.buffer_size,
            poll_timeout_ms: config.poll_timeout_ms,
        }
    }
}

/// How a drain of one connection ended.
#[derive(Debug)]
enum Drain {
    /// Read until `WouldBlock`; the connection stays open.
    Exhausted { bytes: usize },
    /// Peer closed its side.
    Eof { bytes: usize },
    /// Read or handler failure.
    Failed(Error),
}

/// Owns the multiplexer, the listening socket and every accepted connection.
pub struct Reactor<H> {
    mux: Multiplexer,
    listener: ConnectionHandle,
    listener_watch: Watched,
    connections: ConnectionRegistry,
    handler: H,
    options: ReactorOptions,
}

impl<H: ReadHandler> Reactor<H> {
    /// Take over a bound, listening handle and register it for edge-triggered
    /// read readiness.
    pub fn new(listener: ConnectionHandle, handler: H, options: ReactorOptions) -> Result<Self> {
        let mut mux = Multiplexer::new(options.max_events)?;

        listener.set_nonblocking()?;
        let mut listener_watch = Watched::new(listener.raw_fd(), LISTENER_TOKEN);
        listener_watch.set_interest(Interest::READABLE | Interest::EDGE);
        mux.update_or_register(&mut listener_watch)?;

        Ok(Self {
            mux,
            listener,
            listener_watch,
            connections: ConnectionRegistry::new(options.max_connections),
            handler,
            options,
        })
    }

    /// Poll and dispatch forever. Only returns on a poll failure.
    pub fn run(&mut self) -> Result<()> {
        let local = self.local_endpoint()?;
        info!(
            addr = %local,
            max_events = self.options.max_events,
            max_connections = self.options.max_connections,
            buffer_size = self.options.buffer_size,
            "Reactor started"
        );

        loop {
            self.turn(self.options.poll_timeout_ms)?;
        }
    }

    /// One poll-and-dispatch cycle. Returns how many ready items were handled.
    pub fn turn(&mut self, timeout_ms: i32) -> Result<usize> {
        let ready = self.mux.poll(timeout_ms)?;

        for item in &ready {
            match item.token {
                LISTENER_TOKEN => {
                    self.listener_watch.record_readiness(item.readiness);
                    self.accept_connections();
                }
                token => self.handle_connection_event(token, item.readiness),
            }
        }

        Ok(ready.len())
    }

    /// Accept until the backlog is empty; an edge is reported once per
    /// burst of incoming connections.
    fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((handle, peer)) => self.admit(handle, peer),
                Err(Error::WouldBlock) => break,
                Err(Error::Interrupted) => continue,
                Err(e) => {
                    error!(error = %e, "Accept error");
                    break;
                }
            }
        }
    }

    fn admit(&mut self, handle: ConnectionHandle, peer: Endpoint) {
        let fd = handle.raw_fd();

        if let Err(e) = handle.set_nonblocking() {
            warn!(fd, peer = %peer, error = %e, "Rejecting connection");
            return;
        }

        let token = match self.connections.insert(handle, peer) {
            Ok(token) => token,
            Err(_rejected) => {
                warn!(fd, peer = %peer, "Connection limit reached");
                return;
            }
        };

        let registered = match self.connections.get_mut(token) {
            Some(conn) => {
                conn.watched.set_interest(Interest::READABLE | Interest::EDGE);
                self.mux.update_or_register(&mut conn.watched)
            }
            None => return,
        };

        match registered {
            Ok(()) => debug!(fd, token, peer = %peer, "Accepted connection"),
            Err(e) => {
                warn!(fd, peer = %peer, error = %e, "Failed to register connection");
                self.close_connection(token);
            }
        }
    }

    fn handle_connection_event(&mut self, token: usize, readiness: Readiness) {
        let Some(conn) = self.connections.get_mut(token) else {
            // Closed earlier in this batch
            trace!(token, "Stale readiness");
            return;
        };
        conn.watched.record_readiness(readiness);

        if !(readiness.readable || readiness.read_closed || readiness.error) {
            trace!(token, ?readiness, "Ignoring non-read readiness");
            return;
        }

        let mut buf = vec![0u8; self.options.buffer_size];
        let fd = conn.handle.raw_fd();

        match drain(&mut conn.handle, &mut buf, &mut self.handler) {
            Drain::Exhausted { bytes } => {
                trace!(fd, token, bytes, "Finished reading once");
            }
            Drain::Eof { bytes } => {
                debug!(fd, token, bytes, "EOF, client disconnected");
                self.close_connection(token);
            }
            Drain::Failed(e) => {
                debug!(fd, token, error = %e, "Connection error");
                self.close_connection(token);
            }
        }
    }

    /// Deregister then drop the handle, which closes the descriptor.
    fn close_connection(&mut self, token: usize) {
        if let Some(mut conn) = self.connections.remove(token) {
            if let Err(e) = self.mux.deregister(&mut conn.watched) {
                debug!(token, error = %e, "Deregister failed");
            }
            debug!(fd = conn.handle.raw_fd(), token, peer = %conn.peer, "Connection closed");
        }
    }

    pub fn local_endpoint(&self) -> Result<Endpoint> {
        self.listener.local_endpoint()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn multiplexer_stats(&self) -> MultiplexerStats {
        self.mux.stats()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

/// Read into `buf` until the OS has nothing more, passing each chunk to
/// `handler`.
fn drain<H: ReadHandler>(conn: &mut ConnectionHandle, buf: &mut [u8], handler: &mut H) -> Drain {
    let mut bytes = 0;
    loop {
        match conn.read(buf) {
            Ok(0) => return Drain::Eof { bytes },
            Ok(n) => {
                bytes += n;
                trace!(
                    fd = conn.raw_fd(),
                    n,
                    data = %String::from_utf8_lossy(&buf[..n]),
                    "Message from client"
                );
                if let Err(e) = handler.on_read(conn, &buf[..n]) {
                    return Drain::Failed(e);
                }
            }
            Err(Error::WouldBlock) => return Drain::Exhausted { bytes },
            Err(Error::Interrupted) => continue,
            Err(e) => return Drain::Failed(e),
        }
    }
}
