//! Events delivered to a connection's callback.

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// Callback invoked with the connection ID and the set of events that occurred.
///
/// The callback runs inside the registry call that produced the events, so it
/// cannot call back into the registry; record what happened and react after the
/// call returns.
pub type Wakeup = fn(u16, Events);

/// A set of client events. Several bits may be delivered in one callback, e.g.
/// `REQUEST | BODY` when a `200` header has been parsed.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Events(u16);

impl Events {
    /// No event.
    pub const NONE: Self = Self(0);
    /// The TCP connection has been established.
    pub const CONNECTED: Self = Self(0x0001);
    /// The response header has been parsed (or the server answered `404`).
    pub const REQUEST: Self = Self(0x0002);
    /// Body bytes are available through `read_body`.
    pub const BODY: Self = Self(0x0004);
    /// The peer closed the connection.
    pub const CLOSE: Self = Self(0x0008);
    /// The connection failed or the response was malformed.
    pub const ERROR: Self = Self(0x0010);
    /// The host name has been resolved.
    pub const DNS_RESOLVED: Self = Self(0x0020);
    /// Every request part has been written.
    pub const WRITE_SUCCESS: Self = Self(0x0040);
    /// The pending request was dropped before it was fully written.
    pub const WRITE_FAILED: Self = Self(0x0080);
    /// At least one more request part has been written; more remain.
    pub const WRITE_PROGRESS: Self = Self(0x0100);

    const NAMES: [(Self, &'static str); 9] = [
        (Self::CONNECTED, "CONNECTED"),
        (Self::REQUEST, "REQUEST"),
        (Self::BODY, "BODY"),
        (Self::CLOSE, "CLOSE"),
        (Self::ERROR, "ERROR"),
        (Self::DNS_RESOLVED, "DNS_RESOLVED"),
        (Self::WRITE_SUCCESS, "WRITE_SUCCESS"),
        (Self::WRITE_FAILED, "WRITE_FAILED"),
        (Self::WRITE_PROGRESS, "WRITE_PROGRESS"),
    ];

    /// Raw bit representation.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Builds a set from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u16) -> Self {
        Self(bits & 0x01ff)
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

    /// Adds the bits of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for Events {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Events {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Events {
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
impl defmt::Format for Events {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Events({=u16:#x})", self.0)
    }
}
