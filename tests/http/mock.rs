//! Scriptable network stack for driving the HTTP registry in tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::SocketAddrV4;
use std::rc::Rc;

use libiot_http::network::application::http::Events;
use libiot_http::network::error::Error;
use libiot_http::network::{Close, Connect, Connection, Read, Resolve, Write};

/// Both directions of one mock TCP connection.
#[derive(Debug, Default)]
pub struct Wire {
    /// Bytes the server has sent and the client has not read yet.
    pub inbound: VecDeque<u8>,
    /// Everything the client wrote.
    pub outbound: Vec<u8>,
    /// Bytes the socket still accepts; `None` accepts everything.
    pub write_budget: Option<usize>,
    /// Largest read served at once; `None` serves whatever is buffered.
    pub read_chunk: Option<usize>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub closed: bool,
}

impl Wire {
    /// Queues server bytes for the client to read.
    pub fn push(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    pub fn outbound_str(&self) -> &str {
        std::str::from_utf8(&self.outbound).unwrap()
    }
}

/// Socket handed to the registry; the test keeps the other end of the wire.
#[derive(Debug)]
pub struct MockSocket {
    pub wire: Rc<RefCell<Wire>>,
}

impl Read for MockSocket {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.fail_reads {
            return Err(Error::ReadError);
        }
        let limit = wire.read_chunk.unwrap_or(usize::MAX);
        let n = buf.len().min(wire.inbound.len()).min(limit);
        for (slot, byte) in buf.iter_mut().zip(wire.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MockSocket {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.closed {
            return Err(Error::NotOpen);
        }
        if wire.fail_writes {
            return Err(Error::WriteError);
        }
        let budget = wire.write_budget;
        let n = match budget {
            Some(budget) => {
                let n = buf.len().min(budget);
                wire.write_budget = Some(budget - n);
                n
            }
            None => buf.len(),
        };
        wire.outbound.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for MockSocket {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        self.wire.borrow_mut().closed = true;
        Ok(())
    }
}

impl Connection for MockSocket {}

/// Connector and resolver that records every request made of it.
#[derive(Debug, Default)]
pub struct MockNetwork {
    /// One wire per successful connect, oldest first.
    pub wires: Vec<Rc<RefCell<Wire>>>,
    pub connects: Vec<SocketAddrV4>,
    pub queries: Vec<(String, u16)>,
    /// Write budget given to new wires.
    pub initial_write_budget: Option<usize>,
    pub refuse_connect: bool,
    pub refuse_resolve: bool,
}

impl MockNetwork {
    pub fn wire(&self, index: usize) -> Rc<RefCell<Wire>> {
        Rc::clone(&self.wires[index])
    }

    pub fn last_wire(&self) -> Rc<RefCell<Wire>> {
        Rc::clone(self.wires.last().expect("no connection was made"))
    }
}

impl Connect for MockNetwork {
    type Connection = MockSocket;
    type Error = Error;

    fn connect(&mut self, remote: SocketAddrV4) -> Result<MockSocket, Error> {
        self.connects.push(remote);
        if self.refuse_connect {
            return Err(Error::ConnectionRefused);
        }
        let wire = Rc::new(RefCell::new(Wire {
            write_budget: self.initial_write_budget,
            ..Wire::default()
        }));
        self.wires.push(Rc::clone(&wire));
        Ok(MockSocket { wire })
    }
}

impl Resolve for MockNetwork {
    type Error = Error;

    fn resolve(&mut self, host: &str, connection_id: u16) -> Result<(), Error> {
        if self.refuse_resolve {
            return Err(Error::ResolveFailed);
        }
        self.queries.push((host.to_string(), connection_id));
        Ok(())
    }
}

thread_local! {
    static EVENTS: RefCell<Vec<(u16, Events)>> = const { RefCell::new(Vec::new()) };
}

/// Event callback that records every invocation for the current test thread.
pub fn record(conn: u16, events: Events) {
    EVENTS.with(|log| log.borrow_mut().push((conn, events)));
}

/// Drains the events recorded so far.
pub fn take_events() -> Vec<(u16, Events)> {
    EVENTS.with(|log| log.borrow_mut().drain(..).collect())
}
