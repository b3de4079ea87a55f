//! Readiness multiplexer.
//!
//! Thin owner of a mio `Poll` (epoll on Linux, kqueue on macOS). Descriptors
//! are registered by raw fd and identified on readiness by an integer token;
//! the multiplexer holds no ownership over the descriptors themselves.

use crate::error::{Error, Result};
use crate::runtime::watched::{Interest, Readiness, Watched};
use mio::unix::SourceFd;
use mio::{Events, Poll, Token};
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;
use tracing::trace;

/// Default number of ready slots filled per poll.
pub const DEFAULT_EVENTS_CAPACITY: usize = 1000;

/// One ready item returned by [`Multiplexer::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready {
    pub token: usize,
    pub readiness: Readiness,
}

/// Registration counters, mostly useful for tests and debug logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiplexerStats {
    pub adds: u64,
    pub modifies: u64,
    pub deletes: u64,
}

pub struct Multiplexer {
    poll: Poll,
    events: Events,
    stats: MultiplexerStats,
}

impl Multiplexer {
    /// Allocate the OS readiness context with room for `capacity` ready items
    /// per poll.
    pub fn new(capacity: usize) -> Result<Self> {
        let poll = Poll::new().map_err(Error::MultiplexerCreate)?;
        Ok(Self {
            poll,
            events: Events::with_capacity(capacity.max(1)),
            stats: MultiplexerStats::default(),
        })
    }

    /// First-time registration of `fd` under `token`.
    ///
    /// Fails if the descriptor is closed or already registered here.
    pub fn register(&mut self, fd: RawFd, token: usize, interest: Interest) -> Result<()> {
        let mio_interest = to_mio(fd, interest)?;
        self.poll
            .registry()
            .register(&mut SourceFd(&fd), Token(token), mio_interest)
            .map_err(|e| Error::Register(fd, e))?;
        self.stats.adds += 1;
        trace!(fd, token, ?interest, "Registered");
        Ok(())
    }

    /// Register `watched` if it is new, otherwise modify its registration to
    /// the current interest mask.
    pub fn update_or_register(&mut self, watched: &mut Watched) -> Result<()> {
        let fd = watched.fd();
        let token = watched.token();
        let interest = watched.interest();

        if !watched.is_registered() {
            self.register(fd, token, interest)?;
            watched.mark_registered();
        } else {
            let mio_interest = to_mio(fd, interest)?;
            self.poll
                .registry()
                .reregister(&mut SourceFd(&fd), Token(token), mio_interest)
                .map_err(|e| Error::Register(fd, e))?;
            self.stats.modifies += 1;
            trace!(fd, token, ?interest, "Modified registration");
        }
        Ok(())
    }

    /// Remove `watched` from the readiness set. No-op if it is not registered.
    ///
    /// Must be called before the descriptor is closed.
    pub fn deregister(&mut self, watched: &mut Watched) -> Result<()> {
        if !watched.is_registered() {
            return Ok(());
        }
        let fd = watched.fd();
        // Clear the flag even on failure: the registration is unusable either way.
        watched.mark_unregistered();
        self.poll
            .registry()
            .deregister(&mut SourceFd(&fd))
            .map_err(|e| Error::Register(fd, e))?;
        self.stats.deletes += 1;
        trace!(fd, token = watched.token(), "Deregistered");
        Ok(())
    }

    /// Wait for readiness.
    ///
    /// A negative `timeout_ms` blocks until something is ready, `0` returns
    /// immediately. Signal interruptions are retried. The returned items are
    /// copied out of the internal buffer, so each call yields an independent
    /// set.
    pub fn poll(&mut self, timeout_ms: i32) -> Result<Vec<Ready>> {
        let timeout = u64::try_from(timeout_ms).ok().map(Duration::from_millis);

        loop {
            match self.poll.poll(&mut self.events, timeout) {
                Ok(()) => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Poll(e)),
            }
        }

        Ok(self
            .events
            .iter()
            .map(|event| Ready {
                token: event.token().0,
                readiness: Readiness::from(event),
            })
            .collect())
    }

    /// Ready slots available per poll.
    pub fn capacity(&self) -> usize {
        self.events.capacity()
    }

    pub fn stats(&self) -> MultiplexerStats {
        self.stats
    }
}

/// mio registrations are always edge-triggered and need at least one of
/// readable/writable.
fn to_mio(fd: RawFd, interest: Interest) -> Result<mio::Interest> {
    let unsupported = |msg: &str| {
        Error::Register(fd, io::Error::new(io::ErrorKind::Unsupported, msg.to_string()))
    };

    if !interest.is_edge() {
        return Err(unsupported("level-triggered registration is not supported"));
    }

    match (interest.is_readable(), interest.is_writable()) {
        (true, true) => Ok(mio::Interest::READABLE | mio::Interest::WRITABLE),
        (true, false) => Ok(mio::Interest::READABLE),
        (false, true) => Ok(mio::Interest::WRITABLE),
        (false, false) => Err(unsupported("empty interest mask")),
    }
}
