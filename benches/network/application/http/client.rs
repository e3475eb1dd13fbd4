use std::net::SocketAddrV4;

use criterion::{BatchSize, Criterion, Throughput};
use libiot_http::network::application::http::{
    ClientOptions, ConnectionMode, Events, Header, HeaderParser, MultipartChunk, Parsed, Registry,
    UriKey, request,
};
use libiot_http::network::{Close, Connect, Connection, Read, Resolve, SocketEvents, Write};

const HEADER: &[u8] = b"HTTP/1.1 200 OK\r\nServer: bench\r\nContent-Type: text/plain\r\n\
Cache-Control: no-cache\r\nTransfer-Encoding: chunked\r\n\r\n";

/// Serves a canned response, optionally one byte per read.
struct CannedSocket {
    inbound: &'static [u8],
    bytewise: bool,
}

impl Read for CannedSocket {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let limit = if self.bytewise { 1 } else { buf.len() };
        let n = limit.min(buf.len()).min(self.inbound.len());
        buf[..n].copy_from_slice(&self.inbound[..n]);
        self.inbound = &self.inbound[n..];
        Ok(n)
    }
}

impl Write for CannedSocket {
    type Error = ();

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for CannedSocket {
    type Error = ();

    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Connection for CannedSocket {}

struct CannedNetwork {
    response: &'static [u8],
    bytewise: bool,
}

impl Connect for CannedNetwork {
    type Connection = CannedSocket;
    type Error = ();

    fn connect(&mut self, _remote: SocketAddrV4) -> Result<CannedSocket, ()> {
        Ok(CannedSocket {
            inbound: self.response,
            bytewise: self.bytewise,
        })
    }
}

impl Resolve for CannedNetwork {
    type Error = ();

    fn resolve(&mut self, _host: &str, _connection_id: u16) -> Result<(), ()> {
        Ok(())
    }
}

fn ignore(_conn: u16, _events: Events) {}

/// A chunked response carrying `chunks` chunks of 64 bytes.
fn chunked_response(chunks: usize) -> &'static [u8] {
    let mut response = HEADER.to_vec();
    for _ in 0..chunks {
        response.extend_from_slice(b"40\r\n");
        response.extend_from_slice(&[b'z'; 64]);
        response.extend_from_slice(b"\r\n");
    }
    response.extend_from_slice(b"0\r\n\r\n");
    response.leak()
}

fn run_get(http: &mut Registry<'static, CannedNetwork>, conn: u16) -> usize {
    http.send_get(conn, ConnectionMode::Close)
        .expect("Failed to send");
    http.on_socket_event(conn, SocketEvents::READABLE)
        .expect("Failed to parse header");
    let mut buf = [0u8; 256];
    let mut total = 0;
    loop {
        let read = http.read_body(conn, &mut buf).expect("Failed to read body");
        total += read.len;
        if read.done {
            return total;
        }
    }
}

pub fn bench_parse_header(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_header");
    group.throughput(Throughput::Bytes(HEADER.len() as u64));
    group.bench_function("parse_header", |b| {
        let mut parser = HeaderParser::new();
        b.iter(|| {
            let mut src = HEADER;
            let mut header = Header::new();
            let parsed = parser.feed(&mut src, &mut header).expect("Failed to parse");
            assert_eq!(parsed, Parsed::Complete);
            header
        })
    });
    group.finish();
}

pub fn bench_build_requests(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_requests");
    let uri = UriKey::parse("http://192.168.1.20:8080/api/v1/readings?since=0")
        .expect("Failed to parse uri");
    let opts = ClientOptions::default();
    let payload = [0x5au8; 512];
    group.bench_function("get", |b| {
        b.iter(|| request::get(&uri, &opts, ConnectionMode::KeepAlive).expect("Failed to build"))
    });
    group.bench_function("post_multipart", |b| {
        let chunks = [
            MultipartChunk::new(&payload)
                .with_name("capture")
                .with_filename("capture.bin")
                .with_content_type("application/octet-stream"),
            MultipartChunk::new(b"{\"device\":\"bench\"}")
                .with_name("meta")
                .with_content_type("application/json"),
        ];
        b.iter(|| {
            request::post_multipart(&uri, &opts, ConnectionMode::Close, &chunks)
                .expect("Failed to build")
        })
    });
    group.finish();
}

fn bench_get(c: &mut Criterion, name: &str, bytewise: bool) {
    let mut group = c.benchmark_group(name);
    let response = chunked_response(64);
    group.throughput(Throughput::Bytes(response.len() as u64));
    group.bench_function(name, |b| {
        b.iter_batched_ref(
            || {
                let mut http: Registry<'static, CannedNetwork> = Registry::new(CannedNetwork {
                    response,
                    bytewise,
                });
                let conn = http
                    .open("http://10.0.0.2/stream", ignore)
                    .expect("Failed to open");
                (http, conn)
            },
            |(http, conn)| {
                assert_eq!(run_get(http, *conn), 64 * 64);
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_get_chunked(c: &mut Criterion) {
    bench_get(c, "get_chunked", false);
}

pub fn bench_get_chunked_bytewise(c: &mut Criterion) {
    bench_get(c, "get_chunked_bytewise", true);
}
