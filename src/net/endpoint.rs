//! IPv4 endpoint value type.

use crate::error::{Error, Result};
use socket2::SockAddr;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// An immutable IPv4 address and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    addr: SocketAddrV4,
}

impl Endpoint {
    /// Build an endpoint from a dotted-quad address and a port.
    ///
    /// Anything that is not a complete IPv4 address is rejected rather than
    /// truncated: `"127.0.0.1x"` and `"256.0.0.1"` both fail.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let ip: Ipv4Addr = host
            .parse()
            .map_err(|_| Error::InvalidAddress(host.to_string()))?;
        Ok(Self {
            addr: SocketAddrV4::new(ip, port),
        })
    }

    /// Unspecified address, port 0. Used as a placeholder before an accept.
    pub fn empty() -> Self {
        Self {
            addr: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
        }
    }

    /// Parse `host:port`.
    pub fn parse(s: &str) -> Result<Self> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidAddress(s.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| Error::InvalidAddress(s.to_string()))?;
        Self::new(host, port)
    }

    pub fn ip(&self) -> Ipv4Addr {
        *self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Convert an OS socket address. Only IPv4 addresses are representable.
    pub(crate) fn from_sock_addr(addr: &SockAddr) -> Result<Self> {
        match addr.as_socket() {
            Some(SocketAddr::V4(v4)) => Ok(Self { addr: v4 }),
            Some(other) => Err(Error::InvalidAddress(other.to_string())),
            None => Err(Error::InvalidAddress("<non-inet address>".to_string())),
        }
    }

    pub(crate) fn to_sock_addr(self) -> SockAddr {
        SockAddr::from(self.addr)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<SocketAddrV4> for Endpoint {
    fn from(addr: SocketAddrV4) -> Self {
        Self { addr }
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(ep: Endpoint) -> Self {
        SocketAddr::V4(ep.addr)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let ep = Endpoint::new("127.0.0.1", 8888).unwrap();
        assert_eq!(ep.ip(), Ipv4Addr::LOCALHOST);
        assert_eq!(ep.port(), 8888);
        assert_eq!(ep.to_string(), "127.0.0.1:8888");
    }

    #[test]
    fn test_invalid_address() {
        for bad in ["", "localhost", "127.0.0.1x", "256.0.0.1", "1.2.3", "::1"] {
            match Endpoint::new(bad, 80) {
                Err(Error::InvalidAddress(s)) => assert_eq!(s, bad),
                other => panic!("unexpected for {bad:?}: {:?}", other),
            }
        }
    }

    #[test]
    fn test_empty() {
        let ep = Endpoint::empty();
        assert_eq!(ep.ip(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(ep.port(), 0);
        assert_eq!(ep, Endpoint::default());
    }

    #[test]
    fn test_parse() {
        let ep = Endpoint::parse("0.0.0.0:11211").unwrap();
        assert_eq!(ep.port(), 11211);
        assert!(Endpoint::parse("127.0.0.1").is_err());
        assert!(Endpoint::parse("127.0.0.1:99999").is_err());
    }

    #[test]
    fn test_sock_addr_conversion() {
        let ep = Endpoint::new("10.0.0.7", 4242).unwrap();
        let back = Endpoint::from_sock_addr(&ep.to_sock_addr()).unwrap();
        assert_eq!(ep, back);
    }
}
