//! Incremental response-header parsing.
//!
//! The parser pulls one byte at a time from the socket and keeps its position in
//! [`HeaderParser`], so a status line or header field split across any number of
//! packets is resumed exactly where the previous read stopped. Only the fields the
//! client acts on are kept: `Location`, `Content-Length` and `Transfer-Encoding`.

use heapless::{String, Vec};

use super::{HEADER_LINE_SIZE, HttpError, MAX_LOCATION_LEN, next_byte};
use crate::network::Read;

const STATUS_PREFIX: &[u8] = b"HTTP/1.";
const STATUS_CODE_OFFSET: usize = 9;
const MIN_STATUS_LINE: usize = STATUS_CODE_OFFSET + 3;
const CHUNKED: &[u8] = b"chunked";

/// How the response body is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferCoding {
    /// `Content-Length` bytes follow the header.
    #[default]
    Full,
    /// `Transfer-Encoding: chunked`.
    Chunked,
}

/// The parts of a response header the client keeps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    /// Status code from the status line.
    pub response_code: u16,
    /// Value of the `Location` header, if present.
    pub location: Option<String<MAX_LOCATION_LEN>>,
    /// `Content-Length` for [`TransferCoding::Full`] bodies; bytes left in the
    /// current chunk for [`TransferCoding::Chunked`] ones.
    pub content_length_or_remaining_chunk: u32,
    /// Body framing.
    pub transfer_coding: TransferCoding,
}

impl Header {
    /// An empty header, as at the start of a response.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Progress of a [`HeaderParser::feed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed {
    /// The socket ran dry mid-header; call again when more data arrives.
    Pending,
    /// The blank line ending the header has been consumed.
    Complete,
    /// The status line carried `404`; the rest of the response is not read.
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    StatusLine,
    StatusLf,
    FieldName,
    ValueStart,
    Value,
    LineLf,
    FinalLf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Location,
    ContentLength,
    TransferEncoding { matched: usize, ok: bool },
    Other,
}

impl Field {
    fn from_name(name: &[u8]) -> Self {
        if name.eq_ignore_ascii_case(b"Location") {
            Field::Location
        } else if name.eq_ignore_ascii_case(b"Content-Length") {
            Field::ContentLength
        } else if name.eq_ignore_ascii_case(b"Transfer-Encoding") {
            Field::TransferEncoding {
                matched: 0,
                ok: true,
            }
        } else {
            Field::Other
        }
    }
}

/// Resumable status-line and header-field parser.
#[derive(Debug, Clone)]
pub struct HeaderParser {
    phase: Phase,
    line: Vec<u8, HEADER_LINE_SIZE>,
    field: Field,
    consumed: usize,
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderParser {
    /// A parser positioned at the start of a status line.
    pub fn new() -> Self {
        Self {
            phase: Phase::StatusLine,
            line: Vec::new(),
            field: Field::Other,
            consumed: 0,
        }
    }

    /// Forgets any partial input.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Bytes consumed since the last reset.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Returns `true` when no byte of the current response has been seen.
    pub fn is_at_start(&self) -> bool {
        self.phase == Phase::StatusLine && self.consumed == 0
    }

    /// Consumes bytes from `src` into `header` until the header ends or `src`
    /// would block.
    ///
    /// The parser resets itself after [`Parsed::Complete`], [`Parsed::NotFound`]
    /// or an error, ready for the next response.
    ///
    /// # Errors
    ///
    /// [`HttpError::MalformedResponse`] for a bad status line, a `5xx` status, a
    /// `Content-Length` that does not fit in `u32` or a line not ended by CRLF.
    /// [`HttpError::OutOfMemory`] for an oversized `Location`.
    /// [`HttpError::Io`] when the socket fails.
    pub fn feed<R: Read>(&mut self, src: &mut R, header: &mut Header) -> Result<Parsed, HttpError> {
        loop {
            let byte = match next_byte(src) {
                Ok(Some(byte)) => byte,
                Ok(None) => return Ok(Parsed::Pending),
                Err(e) => {
                    self.reset();
                    return Err(e);
                }
            };
            self.consumed += 1;
            match self.step(byte, header) {
                Ok(None) => {}
                Ok(Some(done)) => {
                    self.reset();
                    return Ok(done);
                }
                Err(e) => {
                    self.reset();
                    return Err(e);
                }
            }
        }
    }

    fn step(&mut self, byte: u8, header: &mut Header) -> Result<Option<Parsed>, HttpError> {
        match self.phase {
            Phase::StatusLine => {
                if byte == b'\r' {
                    self.phase = Phase::StatusLf;
                } else {
                    // Long status lines are truncated; the code sits near the front.
                    let _ = self.line.push(byte);
                }
            }
            Phase::StatusLf => {
                expect_lf(byte)?;
                let code = status_code(&self.line)?;
                self.line.clear();
                header.response_code = code;
                debug!("status {}", code);
                if code == 404 {
                    return Ok(Some(Parsed::NotFound));
                }
                if code >= 500 {
                    warn!("server error status {}", code);
                    return Err(HttpError::MalformedResponse);
                }
                self.phase = Phase::FieldName;
            }
            Phase::FieldName => match byte {
                b'\r' if self.line.is_empty() => self.phase = Phase::FinalLf,
                b'\r' => {
                    self.line.clear();
                    self.phase = Phase::LineLf;
                }
                b':' => {
                    self.field = Field::from_name(&self.line);
                    self.line.clear();
                    match self.field {
                        Field::Location => header.location = Some(String::new()),
                        Field::ContentLength => {
                            header.transfer_coding = TransferCoding::Full;
                            header.content_length_or_remaining_chunk = 0;
                        }
                        _ => {}
                    }
                    self.phase = Phase::ValueStart;
                }
                _ => {
                    let _ = self.line.push(byte);
                }
            },
            Phase::ValueStart if byte == b' ' || byte == b'\t' => {}
            Phase::ValueStart | Phase::Value => {
                self.phase = Phase::Value;
                if byte == b'\r' {
                    self.end_field(header);
                    self.phase = Phase::LineLf;
                } else {
                    self.value_byte(byte, header)?;
                }
            }
            Phase::LineLf => {
                expect_lf(byte)?;
                self.phase = Phase::FieldName;
            }
            Phase::FinalLf => {
                expect_lf(byte)?;
                if header.response_code == 100 {
                    trace!("100 continue, waiting for the final status");
                    *header = Header::new();
                    self.phase = Phase::StatusLine;
                } else {
                    return Ok(Some(Parsed::Complete));
                }
            }
        }
        Ok(None)
    }

    fn value_byte(&mut self, byte: u8, header: &mut Header) -> Result<(), HttpError> {
        match self.field {
            Field::Location => {
                if let Some(location) = header.location.as_mut() {
                    location
                        .push(char::from(byte))
                        .map_err(|_| HttpError::OutOfMemory)?;
                }
            }
            Field::ContentLength => {
                if byte.is_ascii_digit() {
                    header.content_length_or_remaining_chunk = header
                        .content_length_or_remaining_chunk
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(u32::from(byte - b'0')))
                        .ok_or(HttpError::MalformedResponse)?;
                } else {
                    self.field = Field::Other;
                }
            }
            Field::TransferEncoding {
                ref mut matched,
                ref mut ok,
            } => {
                if *ok && *matched < CHUNKED.len() {
                    if byte.eq_ignore_ascii_case(&CHUNKED[*matched]) {
                        *matched += 1;
                    } else {
                        *ok = false;
                    }
                }
            }
            Field::Other => {}
        }
        Ok(())
    }

    fn end_field(&mut self, header: &mut Header) {
        if let Field::TransferEncoding { matched, ok } = self.field {
            if ok && matched == CHUNKED.len() {
                header.transfer_coding = TransferCoding::Chunked;
                header.content_length_or_remaining_chunk = 0;
            }
        }
        self.field = Field::Other;
    }
}

fn expect_lf(byte: u8) -> Result<(), HttpError> {
    if byte == b'\n' {
        Ok(())
    } else {
        Err(HttpError::MalformedResponse)
    }
}

fn status_code(line: &[u8]) -> Result<u16, HttpError> {
    if line.len() < MIN_STATUS_LINE || !line.starts_with(STATUS_PREFIX) {
        warn!("bad status line");
        return Err(HttpError::MalformedResponse);
    }
    line[STATUS_CODE_OFFSET..MIN_STATUS_LINE]
        .iter()
        .try_fold(0u16, |acc, &b| {
            b.is_ascii_digit().then(|| acc * 10 + u16::from(b - b'0'))
        })
        .ok_or(HttpError::MalformedResponse)
}
