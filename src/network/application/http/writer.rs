//! Draining queued request parts onto a non-blocking socket.

use heapless::Vec;

use super::{HttpError, MAX_REQUEST_PARTS, RequestPart};
use crate::network::Write;

/// Bytes of the pending request accepted by the socket so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteProgress {
    /// Bytes written across all parts.
    pub written: usize,
    /// Total bytes of the request.
    pub total: usize,
}

/// Result of one writer pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every part has been written.
    Complete,
    /// The socket stopped accepting data. `progressed` is set when at least one
    /// part was finished during this pass.
    Partial {
        /// A part was completed in this pass.
        progressed: bool,
    },
    /// The socket reported an error.
    Failed,
}

/// A request queued for writing: its parts, in order, and how many are done.
#[derive(Debug, Default)]
pub struct PendingRequest<'a> {
    parts: Vec<RequestPart<'a>, MAX_REQUEST_PARTS>,
    done: usize,
}

impl<'a> PendingRequest<'a> {
    /// An empty request.
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            done: 0,
        }
    }

    /// Appends a part.
    pub fn push(&mut self, part: RequestPart<'a>) -> Result<(), HttpError> {
        self.parts.push(part).map_err(|_| HttpError::OutOfMemory)
    }

    /// The queued parts.
    pub fn parts(&self) -> &[RequestPart<'a>] {
        &self.parts
    }

    /// Number of fully written parts.
    pub fn parts_done(&self) -> usize {
        self.done
    }

    /// Returns `true` once every part has been written.
    pub fn is_complete(&self) -> bool {
        self.done == self.parts.len()
    }

    /// Bytes written so far out of the request's total.
    pub fn progress(&self) -> WriteProgress {
        self.parts.iter().fold(
            WriteProgress {
                written: 0,
                total: 0,
            },
            |acc, part| WriteProgress {
                written: acc.written + part.written(),
                total: acc.total + part.len(),
            },
        )
    }

    /// Writes as much as `sink` accepts, starting at the first unfinished part.
    ///
    /// A short write ends the pass; the next pass resumes at the same byte.
    pub fn write_to<W: Write>(&mut self, sink: &mut W) -> WriteOutcome {
        let mut progressed = false;
        while let Some(part) = self.parts.get_mut(self.done) {
            if !part.is_done() {
                match sink.write(part.remaining()) {
                    Ok(n) => part.advance(n),
                    Err(_) => {
                        warn!("request write failed after {} parts", self.done);
                        return WriteOutcome::Failed;
                    }
                }
            }
            if !part.is_done() {
                trace!("short write on part {}", self.done);
                return WriteOutcome::Partial { progressed };
            }
            self.done += 1;
            progressed = true;
        }
        WriteOutcome::Complete
    }
}
