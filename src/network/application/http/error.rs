//! Error taxonomy of the HTTP client.

/// Errors returned by the HTTP client API.
///
/// Every failure is scoped to a single logical connection. Protocol and socket
/// failures discovered while handling an event are also reported to the
/// connection's callback as [`Events::ERROR`](super::Events::ERROR).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HttpError {
    /// An argument was unusable: empty body, unset host/resource/port, or an
    /// operation that makes no sense in the connection's current state.
    InvalidArgument,
    /// The URI could not be parsed or names an unsupported scheme.
    InvalidUri,
    /// A fixed-capacity buffer, part list or the registry itself is full.
    OutOfMemory,
    /// Unknown connection ID.
    NotFound,
    /// The connection ID is already registered.
    Exists,
    /// A request is already in flight on this connection.
    ConnectionBusy,
    /// The server's response could not be parsed or carried a 5xx status.
    MalformedResponse,
    /// The operation cannot make progress until the socket becomes ready.
    WouldBlock,
    /// The transport reported an error.
    Io,
}

impl core::fmt::Display for HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            HttpError::InvalidArgument => "invalid argument",
            HttpError::InvalidUri => "invalid uri",
            HttpError::OutOfMemory => "out of memory",
            HttpError::NotFound => "not found",
            HttpError::Exists => "connection id already in use",
            HttpError::ConnectionBusy => "connection busy",
            HttpError::MalformedResponse => "malformed response",
            HttpError::WouldBlock => "operation would block",
            HttpError::Io => "transport error",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for HttpError {}

#[cfg(feature = "defmt")]
impl defmt::Format for HttpError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            HttpError::InvalidArgument => defmt::write!(f, "InvalidArgument"),
            HttpError::InvalidUri => defmt::write!(f, "InvalidUri"),
            HttpError::OutOfMemory => defmt::write!(f, "OutOfMemory"),
            HttpError::NotFound => defmt::write!(f, "NotFound"),
            HttpError::Exists => defmt::write!(f, "Exists"),
            HttpError::ConnectionBusy => defmt::write!(f, "ConnectionBusy"),
            HttpError::MalformedResponse => defmt::write!(f, "MalformedResponse"),
            HttpError::WouldBlock => defmt::write!(f, "WouldBlock"),
            HttpError::Io => defmt::write!(f, "Io"),
        }
    }
}
