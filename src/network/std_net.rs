//! Transport over `std::net`, for hosted targets and tests.
//!
//! Connects block until the TCP handshake is done; the socket is then switched
//! to non-blocking mode. Name lookups run synchronously inside
//! [`Resolve::resolve`] and the answers are queued until the event loop drains
//! them with [`StdNetwork::take_resolved`] and hands them to
//! [`Registry::on_dns_resolved`](super::application::http::Registry::on_dns_resolved).

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read as _, Write as _};
use std::net::{IpAddr, Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs};

use super::error::Error;
use super::{Close, Connect, Connection, Read, Resolve, SocketEvents, Write};

/// A non-blocking TCP stream.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl TcpConnection {
    /// Wraps a connected stream and switches it to non-blocking mode.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self { stream })
    }

    /// Readiness of the socket right now.
    ///
    /// The socket is always reported writable; an orderly shutdown by the peer
    /// is reported as [`SocketEvents::FIN`].
    pub fn poll(&self) -> SocketEvents {
        let mut events = SocketEvents::WRITABLE;
        let mut probe = [0u8; 1];
        match self.stream.peek(&mut probe) {
            Ok(0) => events |= SocketEvents::FIN,
            Ok(_) => events |= SocketEvents::READABLE,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(_) => events |= SocketEvents::ERROR,
        }
        events
    }
}

fn would_block(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted)
}

impl Read for TcpConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.stream.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if would_block(&e) => Ok(0),
            Err(_) => Err(Error::ReadError),
        }
    }
}

impl Write for TcpConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        match self.stream.write(buf) {
            Ok(n) => Ok(n),
            Err(e) if would_block(&e) => Ok(0),
            Err(_) => Err(Error::WriteError),
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        match self.stream.flush() {
            Ok(()) => Ok(()),
            Err(e) if would_block(&e) => Ok(()),
            Err(_) => Err(Error::WriteError),
        }
    }
}

impl Close for TcpConnection {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(_) => Err(Error::ConnectionClosed),
        }
    }
}

impl Connection for TcpConnection {}

/// `std::net` backed connector and resolver.
#[derive(Debug, Default)]
pub struct StdNetwork {
    resolved: VecDeque<(u16, Option<Ipv4Addr>)>,
}

impl StdNetwork {
    /// A network with no queued lookups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pops the next finished lookup: the connection ID and the address, or
    /// `None` when the host has no IPv4 address.
    pub fn take_resolved(&mut self) -> Option<(u16, Option<Ipv4Addr>)> {
        self.resolved.pop_front()
    }
}

impl Connect for StdNetwork {
    type Connection = TcpConnection;
    type Error = Error;

    fn connect(&mut self, remote: SocketAddrV4) -> Result<Self::Connection, Self::Error> {
        let stream = TcpStream::connect(SocketAddr::V4(remote)).map_err(|_| {
            warn!("tcp connect failed");
            Error::ConnectionRefused
        })?;
        TcpConnection::new(stream).map_err(|_| Error::NotOpen)
    }
}

impl Resolve for StdNetwork {
    type Error = Error;

    fn resolve(&mut self, host: &str, connection_id: u16) -> Result<(), Self::Error> {
        let ip = (host, 0)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| {
                addrs.find_map(|addr| match addr.ip() {
                    IpAddr::V4(ip) => Some(ip),
                    IpAddr::V6(_) => None,
                })
            });
        if ip.is_none() {
            debug!("no IPv4 address for conn {}", connection_id);
        }
        self.resolved.push_back((connection_id, ip));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn loopback_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let SocketAddr::V4(addr) = listener.local_addr().unwrap() else {
            panic!("expected an IPv4 listener");
        };

        let mut net = StdNetwork::new();
        let mut conn = net.connect(addr).unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(conn.read(&mut buf), Ok(0));
        assert!(!conn.poll().contains(SocketEvents::READABLE));

        io::Write::write_all(&mut peer, b"pong").unwrap();
        let mut got = 0;
        while got == 0 {
            got = conn.read(&mut buf).unwrap();
        }
        assert_eq!(&buf[..got], &b"pong"[..got]);

        assert_eq!(conn.write(b"ping"), Ok(4));
        conn.close().unwrap();
    }

    #[test]
    fn lookups_are_queued() {
        let mut net = StdNetwork::new();
        net.resolve("127.0.0.1", 3).unwrap();
        assert_eq!(net.take_resolved(), Some((3, Some(Ipv4Addr::LOCALHOST))));
        assert_eq!(net.take_resolved(), None);
    }
}
