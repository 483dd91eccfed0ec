//! Wicket - HTTP/1.0 and HTTP/1.1 server over blocking sockets
//!
//! Core library: protocol handling, connection concurrency, request
//! dispatch and file storage handlers.

pub mod config;
pub mod dispatch;
pub mod http;
pub mod server;
pub mod storage;
