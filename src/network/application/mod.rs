//! # Application Layer Network Protocols
//!
//! Application layer (OSI Layer 7) protocols built on the core network traits.
//!
//! ## Available Protocols
//!
//! - **[`http`]**: event-driven HTTP/1.1 client for RESTful API communication and
//!   long polling
//!
//! ## Design Principles
//!
//! - **Connection Agnostic**: Work with any type implementing [`Connection`](crate::network::Connection)
//! - **No-std Compatible**: Designed for embedded systems without heap allocation
//! - **Resource Conscious**: Use fixed-size buffers and minimal memory
//! - **Non-blocking**: Every operation returns instead of waiting for the network

/// Event-driven HTTP/1.1 client.
///
/// Builds requests, writes them across partial-write events and parses responses
/// incrementally, including chunked transfer-encoding.
pub mod http;
