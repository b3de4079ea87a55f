//! Owned stream-socket handle.
//!
//! A `ConnectionHandle` is the sole owner of one descriptor. It is moved, never
//! cloned, and the descriptor is closed exactly once when the handle drops.

use crate::error::{Error, Result};
use crate::net::Endpoint;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use tracing::trace;

/// Exclusive owner of a TCP socket descriptor.
#[derive(Debug)]
pub struct ConnectionHandle {
    socket: Socket,
}

impl ConnectionHandle {
    /// Allocate a new IPv4 stream socket (blocking).
    pub fn create() -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(Error::SocketCreate)?;
        trace!(fd = socket.as_raw_fd(), "Socket created");
        Ok(Self { socket })
    }

    pub fn bind(&self, endpoint: &Endpoint) -> Result<()> {
        self.socket
            .bind(&endpoint.to_sock_addr())
            .map_err(|e| Error::Bind(*endpoint, e))
    }

    /// Start accepting connections. `None` uses the platform maximum backlog.
    pub fn listen(&self, backlog: Option<i32>) -> Result<()> {
        self.socket
            .listen(backlog.unwrap_or(libc::SOMAXCONN))
            .map_err(Error::Listen)
    }

    /// Accept one pending connection.
    ///
    /// Returns a new handle for the peer together with the peer's address.
    /// The two values are owned independently: dropping the endpoint has no
    /// effect on the handle.
    pub fn accept(&self) -> Result<(ConnectionHandle, Endpoint)> {
        let (socket, addr) = self
            .socket
            .accept()
            .map_err(|e| Error::signal_or(e, Error::Accept))?;
        // `socket` is dropped (closed) if the address is not IPv4.
        let peer = Endpoint::from_sock_addr(&addr)?;
        Ok((ConnectionHandle { socket }, peer))
    }

    /// Create, bind and listen in one step. The returned handle is still in
    /// blocking mode.
    pub fn bind_listener(endpoint: &Endpoint, backlog: Option<i32>) -> Result<Self> {
        let handle = Self::create()?;
        // Allow rebinding a port that still has connections in `TIME_WAIT`
        handle
            .socket
            .set_reuse_address(true)
            .map_err(|e| Error::Bind(*endpoint, e))?;
        handle.bind(endpoint)?;
        handle.listen(backlog)?;
        Ok(handle)
    }

    pub fn connect(&self, endpoint: &Endpoint) -> Result<()> {
        self.socket
            .connect(&endpoint.to_sock_addr())
            .map_err(|e| Error::Connect(*endpoint, e))
    }

    /// Create a socket and connect it in one step.
    pub fn connect_to(endpoint: &Endpoint) -> Result<Self> {
        let handle = Self::create()?;
        handle.connect(endpoint)?;
        Ok(handle)
    }

    /// Switch to non-blocking mode. Calling this again is a no-op.
    pub fn set_nonblocking(&self) -> Result<()> {
        self.socket.set_nonblocking(true).map_err(Error::NonBlocking)
    }

    pub fn is_nonblocking(&self) -> Result<bool> {
        self.socket.nonblocking().map_err(Error::NonBlocking)
    }

    /// Raw read. `Ok(0)` means the peer shut down its side.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.socket.read(buf).map_err(Error::from_io)
    }

    /// Raw write. May write fewer bytes than `buf.len()`.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.socket.write(buf).map_err(Error::from_io)
    }

    /// Address the socket is bound to.
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        let addr = self.socket.local_addr().map_err(Error::Io)?;
        Endpoint::from_sock_addr(&addr)
    }

    pub fn raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl AsRawFd for ConnectionHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}
