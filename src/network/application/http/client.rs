//! Per-connection client record and state machine.
//!
//! A [`Client`] is one logical HTTP connection: its URI, its socket once
//! connected, the request being written and the response being parsed. The
//! [`Registry`](super::Registry) owns every client and drives it from socket
//! events and API calls; the methods here implement the transitions.

use core::fmt;

use super::body::ChunkLine;
use super::writer::WriteOutcome;
use super::{
    Events, Header, HeaderParser, HttpError, LongPollMode, Parsed, PendingRequest, TransferCoding,
    UriKey, Wakeup,
};
use crate::network::Connection;

/// Where a client is in the request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No request in flight. Requests may be sent.
    Idle,
    /// Request parts are queued or being written.
    WritingRequest,
    /// The request is written; no response byte has been read yet.
    StartReadingHeader,
    /// Part of the response header has been read.
    ReadingHeader,
    /// Reading body bytes (or data of the current chunk).
    ReadingBody,
    /// Reading a chunk-size line.
    ReadingChunkValue,
    /// Skipping the rest of a chunk-size line.
    ReadingChunkTrailer,
}

impl State {
    /// Returns `true` in the states where `read_body` may return data.
    pub fn is_body(self) -> bool {
        matches!(
            self,
            State::ReadingBody | State::ReadingChunkValue | State::ReadingChunkTrailer
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for State {
    fn format(&self, f: defmt::Formatter) {
        match self {
            State::Idle => defmt::write!(f, "Idle"),
            State::WritingRequest => defmt::write!(f, "WritingRequest"),
            State::StartReadingHeader => defmt::write!(f, "StartReadingHeader"),
            State::ReadingHeader => defmt::write!(f, "ReadingHeader"),
            State::ReadingBody => defmt::write!(f, "ReadingBody"),
            State::ReadingChunkValue => defmt::write!(f, "ReadingChunkValue"),
            State::ReadingChunkTrailer => defmt::write!(f, "ReadingChunkTrailer"),
        }
    }
}

/// One logical HTTP connection.
pub struct Client<'a, C: Connection> {
    pub(super) id: u16,
    pub(super) state: State,
    pub(super) socket: Option<C>,
    pub(super) uri: UriKey,
    pub(super) header: Option<Header>,
    pub(super) parser: HeaderParser,
    pub(super) chunk: ChunkLine,
    pub(super) pending: Option<PendingRequest<'a>>,
    pub(super) body_bytes_read: u32,
    pub(super) body_complete: bool,
    pub(super) long_poll: LongPollMode,
    pub(super) on_event: Wakeup,
}

impl<C: Connection> fmt::Debug for Client<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("connected", &self.socket.is_some())
            .field("uri", &self.uri)
            .field("header", &self.header)
            .field("pending", &self.pending.as_ref().map(|p| p.progress()))
            .field("body_bytes_read", &self.body_bytes_read)
            .field("body_complete", &self.body_complete)
            .field("long_poll", &self.long_poll)
            .finish()
    }
}

impl<'a, C: Connection> Client<'a, C> {
    pub(super) fn new(id: u16, uri: UriKey, on_event: Wakeup) -> Self {
        Self {
            id,
            state: State::Idle,
            socket: None,
            uri,
            header: None,
            parser: HeaderParser::new(),
            chunk: ChunkLine::new(),
            pending: None,
            body_bytes_read: 0,
            body_complete: false,
            long_poll: LongPollMode::Off,
            on_event,
        }
    }

    /// Connection ID.
    pub fn connection_id(&self) -> u16 {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The parsed URI.
    pub fn uri(&self) -> &UriKey {
        &self.uri
    }

    /// Header of the current or last response.
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// The socket, once a connection attempt has started.
    pub fn socket(&self) -> Option<&C> {
        self.socket.as_ref()
    }

    /// Long-polling mode.
    pub fn long_poll(&self) -> LongPollMode {
        self.long_poll
    }

    pub(super) fn wake(&self, events: Events) {
        if !events.is_empty() {
            trace!("conn {} events {:?}", self.id, events);
            (self.on_event)(self.id, events);
        }
    }

    /// Drops a request that has not been fully written, reporting
    /// [`Events::WRITE_FAILED`]. Returns `true` if one was pending.
    pub(super) fn abort_request(&mut self) -> bool {
        if self.pending.take().is_some() {
            debug!("conn {} pending request dropped", self.id);
            self.wake(Events::WRITE_FAILED);
            true
        } else {
            false
        }
    }

    /// Returns to `Idle`, dropping any half-read response framing.
    pub(super) fn go_idle(&mut self) {
        self.state = State::Idle;
        self.parser.reset();
        self.chunk.reset();
        self.body_bytes_read = 0;
        self.body_complete = false;
    }

    /// Queues `request` and writes what the socket accepts right away.
    pub(super) fn start_request(&mut self, request: PendingRequest<'a>) -> Result<(), HttpError> {
        if self.state != State::Idle {
            return Err(HttpError::ConnectionBusy);
        }
        self.pending = Some(request);
        self.state = State::WritingRequest;
        self.flush_request();
        Ok(())
    }

    /// Writes queued request parts until the socket stops accepting data.
    pub(super) fn flush_request(&mut self) {
        let (Some(socket), Some(pending)) = (self.socket.as_mut(), self.pending.as_mut()) else {
            return;
        };
        match pending.write_to(socket) {
            WriteOutcome::Complete => {
                self.pending = None;
                self.state = State::StartReadingHeader;
                debug!("conn {} request written", self.id);
                self.wake(Events::WRITE_SUCCESS);
            }
            WriteOutcome::Partial { progressed } => {
                if progressed && !self.long_poll.is_active() {
                    self.wake(Events::WRITE_PROGRESS);
                }
            }
            WriteOutcome::Failed => {
                self.pending = None;
                self.go_idle();
                self.wake(Events::WRITE_FAILED);
            }
        }
    }

    /// Handles a readable socket: parses the header or tells the caller that
    /// body data is waiting.
    pub(super) fn handle_readable(&mut self) -> Result<(), HttpError> {
        match self.state {
            State::StartReadingHeader | State::ReadingHeader => self.wait_for_header(),
            state if state.is_body() => {
                self.wake(Events::BODY);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn wait_for_header(&mut self) -> Result<(), HttpError> {
        if self.state == State::StartReadingHeader {
            self.header = Some(Header::new());
            self.parser.reset();
            self.chunk.reset();
            self.body_bytes_read = 0;
            self.body_complete = false;
            self.state = State::ReadingHeader;
        }
        let Some(socket) = self.socket.as_mut() else {
            return Err(HttpError::WouldBlock);
        };
        let header = self.header.get_or_insert_with(Header::new);
        let parsed = match self.parser.feed(socket, header) {
            Ok(parsed) => parsed,
            Err(e) => return Err(self.fail(e)),
        };

        match parsed {
            Parsed::Pending => Ok(()),
            Parsed::NotFound => {
                self.go_idle();
                self.wake(Events::REQUEST);
                Ok(())
            }
            Parsed::Complete => {
                let code = header.response_code;
                let chunked = header.transfer_coding == TransferCoding::Chunked;
                if chunked {
                    self.state = State::ReadingChunkValue;
                    if let Err(e) = self.advance_chunk_framing() {
                        return Err(self.fail(e));
                    }
                } else {
                    self.state = State::ReadingBody;
                }
                if code == 200 {
                    self.wake(Events::REQUEST | Events::BODY);
                } else {
                    self.go_idle();
                    self.wake(Events::REQUEST);
                }
                Ok(())
            }
        }
    }

    /// Reports a protocol or socket failure: back to `Idle`, [`Events::ERROR`].
    pub(super) fn fail(&mut self, e: HttpError) -> HttpError {
        warn!("conn {} failed: {}", self.id, e);
        self.go_idle();
        self.wake(Events::ERROR);
        e
    }

    /// Closes the socket, if any.
    pub(super) fn close_socket(&mut self) {
        if let Some(socket) = self.socket.take() {
            if socket.close().is_err() {
                debug!("conn {} socket close reported an error", self.id);
            }
        }
    }
}
