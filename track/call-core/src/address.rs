use std::fmt;
use std::net::IpAddr;

/// An (IP, port) pair as observed on the wire.
///
/// Equality is purely structural — two `Endpoint`s are equal iff both the
/// address and the port match. This is the only notion of identity the
/// core needs for retransmission detection and media stream correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub addr: IpAddr,
    pub port: u16,
}

impl Endpoint {
    pub fn new(addr: IpAddr, port: u16) -> Self {
        Self { addr, port }
    }
}

impl fmt::Display for Endpoint {
    /// Formats as `IP:port`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}
