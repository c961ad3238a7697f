//! HTTP protocol implementation.
//!
//! This module implements just enough HTTP/1.1 to serve static files: every
//! connection carries a single request and is closed after the response.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The per-connection state machine tying the stages together
//! - **`reader`**: Accumulates socket reads until a request head is complete
//! - **`parser`**: Parses a request head into a [`request::Request`]
//! - **`request`**: HTTP request representation with case-insensitive headers
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for the request head
//!        └──────┬──────┘
//!               │ Head received
//!               ▼
//!        ┌─────────────┐
//!        │   Parsing   │ ── other method ──────────┐
//!        └──────┬──────┘                           │
//!               │ GET / HEAD                       │
//!               ▼                                  │
//!        ┌─────────────┐                           │
//!        │  Resolving  │ ← Map target to a file    │
//!        └──────┬──────┘                           │
//!               │ 200 / 403 / 404                  │ 405
//!               ▼                                  │
//!        ┌─────────────┐                           │
//!        │ Responding  │ ◄─────────────────────────┘
//!        └──────┬──────┘
//!               ▼
//!        ┌─────────────┐
//!        │   Closed    │
//!        └─────────────┘
//! ```
//!
//! Read and parse failures take a detour through `Erroring`, which sends a
//! minimal 400/408 response when the socket is still usable.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lantern::config::ServerConfig;
//! use lantern::http::connection::Connection;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(ServerConfig::new("./public").validate()?);
//!     let listener = TcpListener::bind(config.listen_addr()).await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let config = Arc::clone(&config);
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, config);
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod request;
pub mod response;
pub mod reader;
pub mod parser;
pub mod connection;
pub mod writer;
pub mod mime;
