//! A network abstraction layer for embedded systems
//!
//! This module defines the contract between the HTTP client and the TCP/IP stack
//! underneath it. The stack is expected to be non-blocking and event driven: reads
//! return `Ok(0)` when no data is buffered, writes may accept fewer bytes than
//! offered, and readiness is reported through [`SocketEvents`] delivered to
//! [`Registry::on_socket_event`](application::http::Registry::on_socket_event).
//!

#![allow(missing_docs)]
#![deny(unsafe_code)]

use core::fmt;
use core::net::SocketAddrV4;
use core::ops::{BitOr, BitOrAssign};

/// Common error types for network operations
pub mod error;

/// Application layer protocols built on the transport traits
pub mod application;

/// `std::net` backed transport
#[cfg(feature = "std")]
pub mod std_net;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connect, Connection, Read, Resolve, Write};
}

// Core synchronous traits
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection.
    ///
    /// Returns `Ok(0)` when nothing is available right now (would block).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection, returning how many bytes were accepted
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// A synchronous connector (client)
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open a connection to an IPv4 endpoint.
    ///
    /// The connection does not have to be established when this returns; the stack
    /// reports [`SocketEvents::CONNECTED`] once it is.
    fn connect(&mut self, remote: SocketAddrV4) -> Result<Self::Connection, Self::Error>;
}

/// An asynchronous hostname resolver.
///
/// `resolve` only starts the query. The answer is handed back to
/// [`Registry::on_dns_resolved`](application::http::Registry::on_dns_resolved)
/// with the same `connection_id`.
pub trait Resolve {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Start resolving `host` on behalf of `connection_id`
    fn resolve(&mut self, host: &str, connection_id: u16) -> Result<(), Self::Error>;
}

/// Reading from a byte slice consumes it; an empty slice reports would-block.
impl Read for &[u8] {
    type Error = core::convert::Infallible;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let len = buf.len().min(self.len());
        let (head, tail) = self.split_at(len);
        buf[..len].copy_from_slice(head);
        *self = tail;
        Ok(len)
    }
}

/// Readiness and state changes reported by the TCP/IP stack for one socket.
///
/// Several bits may be set at once.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct SocketEvents(u8);

impl SocketEvents {
    /// No event.
    pub const NONE: Self = Self(0);
    /// The connection has been established.
    pub const CONNECTED: Self = Self(0x01);
    /// The socket failed.
    pub const ERROR: Self = Self(0x02);
    /// The socket has been closed.
    pub const CLOSE: Self = Self(0x04);
    /// The peer finished sending.
    pub const FIN: Self = Self(0x08);
    /// The socket can accept more data.
    pub const WRITABLE: Self = Self(0x10);
    /// The socket has data to read.
    pub const READABLE: Self = Self(0x20);

    const NAMES: [(Self, &'static str); 6] = [
        (Self::CONNECTED, "CONNECTED"),
        (Self::ERROR, "ERROR"),
        (Self::CLOSE, "CLOSE"),
        (Self::FIN, "FIN"),
        (Self::WRITABLE, "WRITABLE"),
        (Self::READABLE, "READABLE"),
    ];

    /// Raw bit representation.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` when every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` when any bit of `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` when no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for SocketEvents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SocketEvents {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for SocketEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SocketEvents {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "SocketEvents({=u8:#x})", self.0)
    }
}
