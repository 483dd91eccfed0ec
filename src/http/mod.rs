//! HTTP/1.0 and HTTP/1.1 protocol implementation over blocking sockets.
//!
//! # Architecture
//!
//! - **`connection`**: Owns one accepted socket and serves one request per call
//! - **`parser`**: Incremental request parser, resumable at any byte boundary
//! - **`body`**: Body decoders per transfer encoding (identity, chunked)
//! - **`keep_alive`**: `Connection` / `Keep-Alive` negotiation
//! - **`request`**: HTTP request representation
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//!
//! # Request parser state machine
//!
//! ```text
//!        ┌──────────────┐
//!        │ Request line │ ← collect bytes until CRLF
//!        └──────┬───────┘
//!               │ line parsed (or CRLF CRLF: no headers)
//!               ▼
//!        ┌──────────────┐
//!        │   Headers    │ ← collect bytes until CRLF CRLF
//!        └──────┬───────┘
//!               │ header block parsed
//!               ▼
//!        ┌──────────────┐
//!        │     Body     │ ← delegate to the transfer encoding's body parser
//!        └──────┬───────┘
//!               │ body complete, or any failure on the way
//!               ▼
//!            Complete
//! ```
//!
//! # Connection lifecycle
//!
//! ```text
//!   Reading → Processing → Writing ─┬─ keep-alive → Reading (same socket)
//!                                   └─ close      → Closed
//! ```

pub mod body;
pub mod connection;
pub mod keep_alive;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
