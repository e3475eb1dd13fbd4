//! # libiot-http - Event-driven HTTP client for embedded network stacks
//!
//! An HTTP/1.1 client designed for minimal, callback-driven TCP/IP stacks. It builds
//! requests, drains them onto a non-blocking socket across as many write events as
//! it takes, and parses the server's response one byte at a time so that every step
//! can be resumed when the next packet arrives. Many logical connections share one
//! single-threaded event loop.
//!
//! ## Features
//!
//! - **Request builders**: GET, DELETE, POST (form), multipart POST and raw requests
//! - **Resumable parsing**: status line, `Location`, `Content-Length` and
//!   `Transfer-Encoding` headers survive arbitrary packet fragmentation
//! - **Chunked decoding**: transparently de-chunks bodies on demand
//! - **Long polling**: automatic reissue after every response or reconnect
//! - **No allocation**: every buffer is a fixed-capacity [`heapless`] container
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libiot-http = "0.1.0"
//! ```
//!
//! ### Basic GET
//!
//! ```rust,no_run
//! use core::net::SocketAddrV4;
//! use libiot_http::network::application::http::{ConnectionMode, Events, Registry};
//! use libiot_http::network::{Close, Connect, Connection, Read, Resolve, SocketEvents, Write};
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
//!
//! fn on_event(conn: u16, events: Events) {
//!     if events.contains(Events::BODY) {
//!         // body bytes are ready, pull them with `read_body`
//!     }
//! }
//!
//! let mut http: Registry<'_, Stack> = Registry::new(Stack);
//! let conn = http.open("http://10.0.0.2:8080/status", on_event).unwrap();
//! http.send_get(conn, ConnectionMode::Close).unwrap();
//!
//! // later, from the network stack's socket callback:
//! http.on_socket_event(conn, SocketEvents::WRITABLE).unwrap();
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable the `std::net` transport (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging
//! - `log`: Route the same log statements through the `log` facade instead

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]
#![doc(html_root_url = "https://shishir-dey.github.io/libiot/")]

#[macro_use]
mod fmt;

/// Network abstraction layer: the transport contract and the HTTP client built on it.
///
/// The transport traits describe the non-blocking socket and resolver the client
/// expects from the underlying TCP/IP stack; the HTTP client itself lives under
/// [`network::application::http`].
pub mod network;
