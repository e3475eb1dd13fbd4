//! HTTP/1.1 protocol implementation for embedded systems.
//!
//! This module provides an event-driven HTTP client designed for `no_std`
//! environments and callback-driven TCP/IP stacks. Nothing in it blocks: requests
//! are queued as a sequence of byte buffers and drained whenever the socket is
//! writable, and responses are parsed one byte at a time so that a header line,
//! a chunk-size line or a chunk body may be split across any number of packets.
//!
//! # Features
//!
//! - HTTP/1.1 GET, DELETE, POST, multipart POST and raw requests
//! - Resumable status-line and header parsing
//! - Transparent chunked transfer-encoding
//! - Write progress reporting for large uploads
//! - Long polling with automatic reissue or reconnect
//! - Fixed-size buffers for predictable memory usage
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   send_*   ┌─────────────────┐  writable  ┌─────────────────┐
//! │     Caller      │──────────▶│ Request Builder │──────────▶│  Part Writer    │
//! └─────────────────┘            └─────────────────┘            └─────────────────┘
//!          ▲  Events                                                     │
//!          │                                                             ▼
//! ┌─────────────────┐  readable  ┌─────────────────┐            ┌─────────────────┐
//! │    Registry     │──────────▶│  Header Parser  │──────────▶│  Chunk Decoder  │
//! │  (dispatcher)   │            └─────────────────┘  read_body └─────────────────┘
//! └─────────────────┘
//! ```
//!
//! # Usage
//!
//! The entry point is the [`Registry`], which owns every logical connection and the
//! network stack handle. The stack forwards socket readiness to
//! [`Registry::on_socket_event`] and resolver answers to
//! [`Registry::on_dns_resolved`]; the registry calls each connection's event
//! callback with an [`Events`] bitmask.
//!
//! ```rust,no_run
//! use libiot_http::network::application::http::{BodyRead, Events, Registry};
//! # use core::net::SocketAddrV4;
//! # use libiot_http::network::{Close, Connect, Connection, Read, Resolve, Write};
//! # struct Socket;
//! # impl Read for Socket {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl Write for Socket {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl Close for Socket {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl Connection for Socket {}
//! # struct Stack;
//! # impl Connect for Stack {
//! #     type Connection = Socket;
//! #     type Error = ();
//! #     fn connect(&mut self, _remote: SocketAddrV4) -> Result<Socket, ()> { Ok(Socket) }
//! # }
//! # impl Resolve for Stack {
//! #     type Error = ();
//! #     fn resolve(&mut self, _host: &str, _id: u16) -> Result<(), ()> { Ok(()) }
//! # }
//! # let mut http: Registry<'_, Stack> = Registry::new(Stack);
//! # let conn = 0;
//!
//! // After the callback reported `Events::BODY`:
//! let mut buf = [0u8; 128];
//! loop {
//!     let BodyRead { len, done } = http.read_body(conn, &mut buf).unwrap();
//!     // consume &buf[..len]
//!     if done || len == 0 {
//!         break;
//!     }
//! }
//! ```

pub mod body;
pub mod client;
pub mod error;
pub mod event;
pub mod header;
pub mod long_poll;
pub mod options;
pub mod registry;
pub mod request;
pub mod uri;
pub mod writer;

pub use body::BodyRead;
pub use client::State;
pub use error::HttpError;
pub use event::{Events, Wakeup};
pub use header::{Header, HeaderParser, Parsed, TransferCoding};
pub use long_poll::{CloseAction, CompleteAction, LongPollMode};
pub use options::ClientOptions;
pub use registry::Registry;
pub use request::{ConnectionMode, MultipartChunk, Ownership, RequestPart};
pub use uri::UriKey;
pub use writer::{PendingRequest, WriteProgress};

use crate::network::Read;

/// Maximum length of a host name.
pub const MAX_HOST_LEN: usize = 64;
/// Maximum length of a request resource (path and query).
pub const MAX_RESOURCE_LEN: usize = 256;
/// Maximum length of a raw URI as passed to [`Registry::open`].
pub const MAX_URI_LEN: usize = 320;
/// Maximum length of a captured `Location` header value.
pub const MAX_LOCATION_LEN: usize = 256;
/// Status lines and header names longer than this are truncated while parsing.
pub const HEADER_LINE_SIZE: usize = 50;
/// Capacity of a request part built by the library.
pub const PART_CAPACITY: usize = 512;
/// Maximum number of multipart chunks in a single POST.
pub const MAX_MULTIPART_CHUNKS: usize = 8;
/// Maximum number of parts in one pending request: header, closing boundary and
/// two parts per multipart chunk.
pub const MAX_REQUEST_PARTS: usize = 2 + 2 * MAX_MULTIPART_CHUNKS;
/// Maximum length of the configured `User-Agent`.
pub const MAX_USER_AGENT_LEN: usize = 32;
/// Maximum length of a configured or overridden POST header value.
pub const MAX_HEADER_VALUE_LEN: usize = 64;
/// Default number of simultaneous logical connections in a [`Registry`].
pub const DEFAULT_MAX_CLIENTS: usize = 8;

/// Multipart boundary token. Fixed for compatibility with existing servers.
pub const MULTIPART_BOUNDARY: &str = "--------------------------c6b5ca0828dmx010";

/// Pulls a single byte from the socket.
///
/// `Ok(None)` means nothing is buffered right now.
pub(crate) fn next_byte<R: Read>(src: &mut R) -> Result<Option<u8>, HttpError> {
    let mut byte = [0u8; 1];
    match src.read(&mut byte) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(byte[0])),
        Err(_) => {
            warn!("socket read failed");
            Err(HttpError::Io)
        }
    }
}
