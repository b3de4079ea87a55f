//! Error taxonomy for the socket layer and the reactor.
//!
//! Setup failures (`SocketCreate` through `Poll`) are fatal for the server.
//! `WouldBlock` and `Interrupted` are control signals that drive the
//! reactor's drain and accept loops; they never escape the loop.

use crate::net::Endpoint;
use std::fmt;
use std::io;
use std::os::unix::io::RawFd;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Address string could not be parsed as IPv4.
    InvalidAddress(String),
    /// The OS refused to allocate a socket.
    SocketCreate(io::Error),
    Bind(Endpoint, io::Error),
    Listen(io::Error),
    Accept(io::Error),
    Connect(Endpoint, io::Error),
    /// Switching a descriptor to non-blocking mode failed.
    NonBlocking(io::Error),
    MultiplexerCreate(io::Error),
    Register(RawFd, io::Error),
    Poll(io::Error),
    /// Non-blocking operation has nothing to do right now.
    WouldBlock,
    /// Interrupted by a signal; the same call may be retried.
    Interrupted,
    /// Any other read/write failure on an established connection.
    Io(io::Error),
}

impl Error {
    /// Map a raw read/write error into the control signals the loop acts on.
    pub(crate) fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock => Error::WouldBlock,
            io::ErrorKind::Interrupted => Error::Interrupted,
            _ => Error::Io(err),
        }
    }

    /// Same as [`Error::from_io`], but wraps hard failures with `wrap`.
    pub(crate) fn signal_or(err: io::Error, wrap: impl FnOnce(io::Error) -> Self) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock => Error::WouldBlock,
            io::ErrorKind::Interrupted => Error::Interrupted,
            _ => wrap(err),
        }
    }

    /// True for `WouldBlock` and `Interrupted`.
    pub fn is_control_signal(&self) -> bool {
        matches!(self, Error::WouldBlock | Error::Interrupted)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidAddress(addr) => write!(f, "Invalid IPv4 address '{addr}'"),
            Error::SocketCreate(e) => write!(f, "Socket create error: {e}"),
            Error::Bind(ep, e) => write!(f, "Socket bind error on {ep}: {e}"),
            Error::Listen(e) => write!(f, "Socket listen error: {e}"),
            Error::Accept(e) => write!(f, "Socket accept error: {e}"),
            Error::Connect(ep, e) => write!(f, "Socket connect error to {ep}: {e}"),
            Error::NonBlocking(e) => write!(f, "Failed to set non-blocking mode: {e}"),
            Error::MultiplexerCreate(e) => write!(f, "Multiplexer create error: {e}"),
            Error::Register(fd, e) => write!(f, "Failed to register fd {fd}: {e}"),
            Error::Poll(e) => write!(f, "Multiplexer poll error: {e}"),
            Error::WouldBlock => write!(f, "Operation would block"),
            Error::Interrupted => write!(f, "Operation interrupted"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SocketCreate(e)
            | Error::Bind(_, e)
            | Error::Listen(e)
            | Error::Accept(e)
            | Error::Connect(_, e)
            | Error::NonBlocking(e)
            | Error::MultiplexerCreate(e)
            | Error::Register(_, e)
            | Error::Poll(e)
            | Error::Io(e) => Some(e),
            Error::InvalidAddress(_) | Error::WouldBlock | Error::Interrupted => None,
        }
    }
}
