//! Per-descriptor multiplexing state.
//!
//! A `Watched` record carries what the reactor wants to hear about a
//! descriptor and what the multiplexer last saw for it. It never talks to the
//! OS itself; the multiplexer reads it when adding or modifying a
//! registration.

use std::fmt;
use std::ops::BitOr;
use std::os::unix::io::RawFd;

/// Events a descriptor is registered for.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Interest(u8);

impl Interest {
    pub const NONE: Interest = Interest(0);
    pub const READABLE: Interest = Interest(0b001);
    pub const WRITABLE: Interest = Interest(0b010);
    /// Report readiness once per not-ready to ready transition.
    pub const EDGE: Interest = Interest(0b100);

    pub fn contains(self, other: Interest) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_readable(self) -> bool {
        self.contains(Interest::READABLE)
    }

    pub fn is_writable(self) -> bool {
        self.contains(Interest::WRITABLE)
    }

    pub fn is_edge(self) -> bool {
        self.contains(Interest::EDGE)
    }
}

impl BitOr for Interest {
    type Output = Interest;

    fn bitor(self, rhs: Interest) -> Interest {
        Interest(self.0 | rhs.0)
    }
}

impl fmt::Debug for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.is_readable() {
            parts.push("READABLE");
        }
        if self.is_writable() {
            parts.push("WRITABLE");
        }
        if self.is_edge() {
            parts.push("EDGE");
        }
        if parts.is_empty() {
            parts.push("NONE");
        }
        write!(f, "{}", parts.join(" | "))
    }
}

/// Readiness observed by the multiplexer for one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
    /// Peer shut down its write half (or the connection is gone).
    pub read_closed: bool,
    pub write_closed: bool,
    pub error: bool,
}

impl Readiness {
    pub fn is_empty(&self) -> bool {
        *self == Readiness::default()
    }
}

impl From<&mio::event::Event> for Readiness {
    fn from(event: &mio::event::Event) -> Self {
        Self {
            readable: event.is_readable(),
            writable: event.is_writable(),
            read_closed: event.is_read_closed(),
            write_closed: event.is_write_closed(),
            error: event.is_error(),
        }
    }
}

/// A descriptor together with its registration state.
///
/// `registered` is true iff the descriptor currently has a live registration
/// in one multiplexer. Only the multiplexer flips it.
#[derive(Debug)]
pub struct Watched {
    fd: RawFd,
    token: usize,
    interest: Interest,
    readiness: Readiness,
    registered: bool,
}

impl Watched {
    pub fn new(fd: RawFd, token: usize) -> Self {
        Self {
            fd,
            token,
            interest: Interest::NONE,
            readiness: Readiness::default(),
            registered: false,
        }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Key handed back by the multiplexer when this descriptor is ready.
    pub fn token(&self) -> usize {
        self.token
    }

    /// Update the desired event mask. Takes effect on the next
    /// `Multiplexer::update_or_register`.
    pub fn set_interest(&mut self, interest: Interest) {
        self.interest = interest;
    }

    pub fn interest(&self) -> Interest {
        self.interest
    }

    pub fn record_readiness(&mut self, readiness: Readiness) {
        self.readiness = readiness;
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub(crate) fn mark_registered(&mut self) {
        self.registered = true;
    }

    pub(crate) fn mark_unregistered(&mut self) {
        self.registered = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_bits() {
        let i = Interest::READABLE | Interest::EDGE;
        assert!(i.is_readable());
        assert!(i.is_edge());
        assert!(!i.is_writable());
        assert_eq!(format!("{:?}", i), "READABLE | EDGE");
        assert_eq!(format!("{:?}", Interest::NONE), "NONE");
    }

    #[test]
    fn test_watched_local_state() {
        let mut w = Watched::new(7, 3);
        assert_eq!(w.fd(), 7);
        assert_eq!(w.token(), 3);
        assert!(!w.is_registered());
        assert_eq!(w.interest(), Interest::NONE);

        w.set_interest(Interest::READABLE | Interest::EDGE);
        // Setting interest is purely local
        assert!(!w.is_registered());
        assert!(w.interest().is_readable());

        let seen = Readiness {
            readable: true,
            ..Readiness::default()
        };
        w.record_readiness(seen);
        assert_eq!(w.readiness(), seen);
        assert!(!w.readiness().is_empty());

        w.mark_registered();
        assert!(w.is_registered());
        w.mark_unregistered();
        assert!(!w.is_registered());
    }
}
