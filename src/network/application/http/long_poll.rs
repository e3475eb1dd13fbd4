//! Long-polling reconnect policy.

use super::ConnectionMode;

/// Long-polling mode of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LongPollMode {
    /// No long polling.
    #[default]
    Off,
    /// GET with `Connection: close`; reopen and reissue when the peer closes.
    CloseAfterResponse,
    /// GET with `Connection: Keep-Alive`; reissue as soon as a body completes.
    KeepAliveAfterResponse,
}

/// What the dispatcher does when the socket closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Report [`Events::CLOSE`](super::Events::CLOSE) to the caller.
    Surface,
    /// Reopen the client under the same ID and send the GET again.
    Reopen,
}

/// What `read_body` does once a body has been fully read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteAction {
    /// Leave the client idle.
    Idle,
    /// Send the GET again on the same connection.
    Reissue,
}

impl LongPollMode {
    /// Returns `true` unless the mode is [`LongPollMode::Off`].
    pub fn is_active(self) -> bool {
        self != LongPollMode::Off
    }

    /// Policy for a socket close.
    ///
    /// Keep-alive polling also reconnects: the server may drop an idle
    /// persistent connection at any time.
    pub fn on_close(self) -> CloseAction {
        match self {
            LongPollMode::Off => CloseAction::Surface,
            LongPollMode::CloseAfterResponse | LongPollMode::KeepAliveAfterResponse => {
                CloseAction::Reopen
            }
        }
    }

    /// Policy for a completed body.
    pub fn on_body_complete(self) -> CompleteAction {
        match self {
            LongPollMode::KeepAliveAfterResponse => CompleteAction::Reissue,
            LongPollMode::Off | LongPollMode::CloseAfterResponse => CompleteAction::Idle,
        }
    }

    /// Connection mode of the GET this mode sends.
    pub fn connection_mode(self) -> Option<ConnectionMode> {
        match self {
            LongPollMode::Off => None,
            LongPollMode::CloseAfterResponse => Some(ConnectionMode::Close),
            LongPollMode::KeepAliveAfterResponse => Some(ConnectionMode::KeepAlive),
        }
    }
}

impl From<ConnectionMode> for LongPollMode {
    fn from(mode: ConnectionMode) -> Self {
        match mode {
            ConnectionMode::Close => LongPollMode::CloseAfterResponse,
            ConnectionMode::KeepAlive => LongPollMode::KeepAliveAfterResponse,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LongPollMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            LongPollMode::Off => defmt::write!(f, "Off"),
            LongPollMode::CloseAfterResponse => defmt::write!(f, "CloseAfterResponse"),
            LongPollMode::KeepAliveAfterResponse => defmt::write!(f, "KeepAliveAfterResponse"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policies() {
        assert_eq!(LongPollMode::Off.on_close(), CloseAction::Surface);
        assert_eq!(LongPollMode::CloseAfterResponse.on_close(), CloseAction::Reopen);
        assert_eq!(LongPollMode::Off.on_body_complete(), CompleteAction::Idle);
        assert_eq!(
            LongPollMode::CloseAfterResponse.on_body_complete(),
            CompleteAction::Idle
        );
        assert_eq!(
            LongPollMode::KeepAliveAfterResponse.on_body_complete(),
            CompleteAction::Reissue
        );
    }

    #[test]
    fn mode_round_trips_connection() {
        for mode in [ConnectionMode::Close, ConnectionMode::KeepAlive] {
            assert_eq!(LongPollMode::from(mode).connection_mode(), Some(mode));
        }
        assert_eq!(LongPollMode::Off.connection_mode(), None);
        assert!(!LongPollMode::Off.is_active());
    }
}
