//! Body reading and chunked transfer-encoding.
//!
//! `Full` bodies are passed straight through from the socket, capped at the
//! remaining `Content-Length`. `Chunked` bodies are de-chunked on the fly: the
//! chunk-size lines are parsed byte by byte (so they may be split across
//! packets) and only chunk data is copied into the caller's buffer.

use super::client::{Client, State};
use super::{HttpError, TransferCoding, next_byte};
use crate::network::Connection;

/// Most hex digits accepted in a chunk-size line.
const MAX_CHUNK_DIGITS: u8 = 8;

/// Result of a `read_body` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyRead {
    /// Bytes copied into the caller's buffer.
    pub len: usize,
    /// The body is finished and the client is idle again.
    pub done: bool,
}

impl BodyRead {
    const DONE: Self = Self { len: 0, done: true };

    fn data(len: usize) -> Self {
        Self { len, done: false }
    }
}

/// Progress through the current chunk-size line or trailer section.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ChunkLine {
    /// Hex digits seen on the current size line.
    digits: u8,
    /// Value accumulated from those digits.
    value: u32,
    /// The zero-size chunk has been seen; reading the trailer section.
    last: bool,
    /// Bytes on the current trailer line, CR excluded.
    line_len: usize,
}

impl ChunkLine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}

fn hex_value(byte: u8) -> Option<u32> {
    char::from(byte).to_digit(16)
}

impl<C: Connection> Client<'_, C> {
    /// Copies body bytes into `buf`.
    ///
    /// Once the body is exhausted a call returns `done`, resets the client to
    /// `Idle` and clears the byte counters.
    pub(super) fn read_body(&mut self, buf: &mut [u8]) -> Result<BodyRead, HttpError> {
        match self.state {
            State::WritingRequest | State::StartReadingHeader | State::ReadingHeader => {
                return Err(HttpError::ConnectionBusy);
            }
            State::Idle => return Err(HttpError::InvalidArgument),
            State::ReadingBody | State::ReadingChunkValue | State::ReadingChunkTrailer => {}
        }
        if self.body_complete {
            return Ok(self.finish_body());
        }
        let Some(header) = self.header.as_ref() else {
            return Err(HttpError::InvalidArgument);
        };
        match header.transfer_coding {
            TransferCoding::Full => {
                if self.body_bytes_read >= header.content_length_or_remaining_chunk {
                    self.body_complete = true;
                    return Ok(self.finish_body());
                }
                self.read_full(buf)
            }
            TransferCoding::Chunked => match self.read_chunked(buf) {
                Ok(read) if read.len == 0 && self.body_complete => Ok(self.finish_body()),
                Ok(read) => Ok(read),
                Err(HttpError::MalformedResponse) => Err(self.fail(HttpError::MalformedResponse)),
                Err(e) => Err(e),
            },
        }
    }

    fn finish_body(&mut self) -> BodyRead {
        debug!("conn {} body done, {} bytes", self.id, self.body_bytes_read);
        self.go_idle();
        BodyRead::DONE
    }

    fn read_full(&mut self, buf: &mut [u8]) -> Result<BodyRead, HttpError> {
        let content_length = self
            .header
            .as_ref()
            .map_or(0, |h| h.content_length_or_remaining_chunk);
        let remaining = (content_length - self.body_bytes_read) as usize;
        let want = buf.len().min(remaining);
        let Some(socket) = self.socket.as_mut() else {
            return Err(HttpError::WouldBlock);
        };
        let n = socket.read(&mut buf[..want]).map_err(|_| {
            warn!("body read failed");
            HttpError::Io
        })?;
        self.body_bytes_read += n as u32;
        Ok(BodyRead::data(n))
    }

    fn remaining_chunk(&self) -> usize {
        self.header
            .as_ref()
            .map_or(0, |h| h.content_length_or_remaining_chunk as usize)
    }

    fn consume_chunk(&mut self, n: usize) {
        self.body_bytes_read += n as u32;
        if let Some(header) = self.header.as_mut() {
            header.content_length_or_remaining_chunk -= n as u32;
            if header.content_length_or_remaining_chunk == 0 {
                self.state = State::ReadingChunkValue;
            }
        }
    }

    fn read_chunked(&mut self, buf: &mut [u8]) -> Result<BodyRead, HttpError> {
        self.advance_chunk_framing()?;
        if self.state != State::ReadingBody {
            return Ok(BodyRead::data(0));
        }

        if buf.len() < self.remaining_chunk() {
            let Some(socket) = self.socket.as_mut() else {
                return Err(HttpError::WouldBlock);
            };
            let n = socket.read(buf).map_err(|_| HttpError::Io)?;
            self.consume_chunk(n);
            return Ok(BodyRead::data(n));
        }

        let mut filled = 0;
        while filled < buf.len() && !self.body_complete {
            if self.state != State::ReadingBody {
                match self.advance_chunk_framing() {
                    Ok(()) => {}
                    Err(HttpError::Io) if filled > 0 => break,
                    Err(e) => return Err(e),
                }
                if self.state != State::ReadingBody {
                    break;
                }
                continue;
            }
            let want = (buf.len() - filled).min(self.remaining_chunk());
            let Some(socket) = self.socket.as_mut() else {
                break;
            };
            match socket.read(&mut buf[filled..filled + want]) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    self.consume_chunk(n);
                }
                Err(_) if filled > 0 => break,
                Err(_) => {
                    warn!("chunk read failed");
                    return Err(HttpError::Io);
                }
            }
        }
        Ok(BodyRead::data(filled))
    }

    /// Consumes chunk framing (size lines, the CRLF after chunk data and the
    /// trailer section) until chunk data is next, the body ends or the socket
    /// runs dry.
    pub(super) fn advance_chunk_framing(&mut self) -> Result<(), HttpError> {
        let Some(socket) = self.socket.as_mut() else {
            return Ok(());
        };
        while !self.body_complete
            && matches!(
                self.state,
                State::ReadingChunkValue | State::ReadingChunkTrailer
            )
        {
            let Some(byte) = next_byte(socket)? else {
                return Ok(());
            };
            let line = &mut self.chunk;
            match self.state {
                State::ReadingChunkValue if line.last => match byte {
                    b'\n' if line.line_len == 0 => {
                        trace!("chunked body complete");
                        self.body_complete = true;
                    }
                    b'\n' => line.line_len = 0,
                    b'\r' => {}
                    _ => line.line_len += 1,
                },
                State::ReadingChunkValue => {
                    if let Some(digit) = hex_value(byte) {
                        line.digits += 1;
                        if line.digits > MAX_CHUNK_DIGITS {
                            warn!("chunk size has too many digits");
                            return Err(HttpError::MalformedResponse);
                        }
                        line.value = (line.value << 4) | digit;
                    } else {
                        match byte {
                            b'\r' | b';' => self.state = State::ReadingChunkTrailer,
                            b' ' | b'\t' => {}
                            b'\n' if line.digits == 0 => {}
                            _ => {
                                warn!("unexpected byte in chunk size line");
                                return Err(HttpError::MalformedResponse);
                            }
                        }
                    }
                }
                _ => {
                    if byte != b'\n' {
                        continue;
                    }
                    if line.digits == 0 {
                        // End of the CRLF that closes a chunk's data.
                        self.state = State::ReadingChunkValue;
                    } else if line.value == 0 {
                        line.last = true;
                        line.line_len = 0;
                        line.digits = 0;
                        self.state = State::ReadingChunkValue;
                    } else {
                        trace!("chunk of {} bytes", line.value);
                        if let Some(header) = self.header.as_mut() {
                            header.content_length_or_remaining_chunk = line.value;
                        }
                        line.digits = 0;
                        line.value = 0;
                        self.state = State::ReadingBody;
                    }
                }
            }
        }
        Ok(())
    }
}
