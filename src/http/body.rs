//! Body decoding per transfer encoding.
//!
//! A body parser is created once the header section is complete and then fed
//! raw bytes until it reports [`Status::Complete`]. Like the request parser it
//! accepts input split at arbitrary points.

use std::str::FromStr;

use bytes::{Buf, BytesMut};
use tracing::{debug, info, warn};

use crate::http::parser::Status;
use crate::http::request::{RequestBody, RequestHeaders};
use crate::http::response::StatusCode;

const CRLF: &[u8] = b"\r\n";

/// Longest chunk-size or trailer line accepted before the framing is
/// considered broken.
const MAX_CHUNK_LINE: usize = 8 * 1024;

/// Transfer encodings named by HTTP/1.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferEncoding {
    Chunked,
    Compress,
    Deflate,
    Gzip,
    Identity,
}

impl FromStr for TransferEncoding {
    type Err = ();

    /// Matches the trimmed, lower-cased header value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chunked" => Ok(TransferEncoding::Chunked),
            "compress" => Ok(TransferEncoding::Compress),
            "deflate" => Ok(TransferEncoding::Deflate),
            "gzip" => Ok(TransferEncoding::Gzip),
            "identity" => Ok(TransferEncoding::Identity),
            _ => Err(()),
        }
    }
}

impl TransferEncoding {
    /// Resolves the encoding declared by `Transfer-Encoding`, defaulting to
    /// identity. `None` for values that are not transfer encodings at all.
    pub fn of(headers: &RequestHeaders) -> Option<Self> {
        match headers.get("transfer-encoding") {
            Some(value) => value.parse().ok(),
            None => Some(TransferEncoding::Identity),
        }
    }

    /// Creates the body parser for this encoding. Encodings without a
    /// decoder yield `None`.
    pub fn body_parser(&self, headers: &RequestHeaders) -> Option<Box<dyn BodyParser>> {
        match self {
            TransferEncoding::Identity => Some(Box::new(IdentityParser::from_headers(headers))),
            TransferEncoding::Chunked => Some(Box::new(ChunkedParser::new())),
            TransferEncoding::Compress | TransferEncoding::Deflate | TransferEncoding::Gzip => None,
        }
    }
}

/// A resumable body decoder.
pub trait BodyParser: Send {
    /// Consumes the next slice of raw bytes.
    fn parse(&mut self, buf: &[u8]) -> Status;

    /// The failure detected while parsing, if any.
    fn failure(&self) -> Option<StatusCode>;

    /// Hands out the decoded body. Empty unless parsing completed successfully.
    fn take_body(&mut self) -> RequestBody;
}

/// Length-delimited body as announced by `Content-Length`.
#[derive(Debug)]
pub struct IdentityParser {
    content_length: Option<usize>,
    collected: BytesMut,
    failure: Option<StatusCode>,
    body: Option<RequestBody>,
}

impl IdentityParser {
    pub fn new(content_length: Option<usize>) -> Self {
        Self {
            content_length,
            collected: BytesMut::with_capacity(content_length.unwrap_or(0).min(64 * 1024)),
            failure: None,
            body: None,
        }
    }

    /// Reads the declared length from the headers. A value that is not a
    /// number counts as a broken request.
    pub fn from_headers(headers: &RequestHeaders) -> Self {
        match headers.get("content-length").map(|v| v.trim().parse::<usize>()) {
            Some(Ok(length)) => Self::new(Some(length)),
            Some(Err(_)) => {
                info!("Content-Length is not a valid length. Rejecting as bad request.");
                let mut parser = Self::new(Some(0));
                parser.failure = Some(StatusCode::BadRequest);
                parser
            }
            None => Self::new(None),
        }
    }
}

impl BodyParser for IdentityParser {
    fn parse(&mut self, buf: &[u8]) -> Status {
        if self.failure.is_some() {
            return Status::Complete;
        }

        let Some(content_length) = self.content_length else {
            info!("Length header is missing but required for this body.");
            self.failure = Some(StatusCode::LengthRequired);
            return Status::Complete;
        };

        self.collected.extend_from_slice(buf);
        if self.collected.len() == content_length {
            self.body = Some(RequestBody::new(self.collected.split().to_vec()));
            Status::Complete
        } else if self.collected.len() > content_length {
            info!(
                content_length,
                received = self.collected.len(),
                "Body is longer than the given content length. Rejecting as bad request."
            );
            self.failure = Some(StatusCode::BadRequest);
            Status::Complete
        } else {
            Status::Partial
        }
    }

    fn failure(&self) -> Option<StatusCode> {
        self.failure
    }

    fn take_body(&mut self) -> RequestBody {
        self.body.take().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    /// Waiting for a chunk-size line.
    Size,
    /// Collecting chunk data; the count is what is still missing.
    Data(usize),
    /// Waiting for the CRLF closing a chunk's data.
    DataEnd,
    /// After the zero-size chunk: trailer lines until an empty line.
    Trailer,
    Done,
}

/// Self-delimited `chunked` body.
///
/// Chunk extensions and trailer fields are logged and dropped; the body is
/// the concatenation of the chunk payloads.
#[derive(Debug)]
pub struct ChunkedParser {
    state: ChunkState,
    pending: BytesMut,
    body: BytesMut,
    failure: Option<StatusCode>,
}

impl Default for ChunkedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedParser {
    pub fn new() -> Self {
        Self {
            state: ChunkState::Size,
            pending: BytesMut::new(),
            body: BytesMut::new(),
            failure: None,
        }
    }

    fn fail(&mut self, reason: &str) -> Status {
        info!(reason, "Malformed chunked body. Rejecting as bad request.");
        self.failure = Some(StatusCode::BadRequest);
        self.state = ChunkState::Done;
        Status::Complete
    }

    /// Splits the next CRLF-terminated line off the pending bytes.
    fn next_line(&mut self) -> Option<BytesMut> {
        let end = find(&self.pending, CRLF)?;
        let line = self.pending.split_to(end);
        self.pending.advance(CRLF.len());
        Some(line)
    }
}

impl BodyParser for ChunkedParser {
    fn parse(&mut self, buf: &[u8]) -> Status {
        if self.state == ChunkState::Done {
            return Status::Complete;
        }

        self.pending.extend_from_slice(buf);
        loop {
            match self.state {
                ChunkState::Size => {
                    let Some(line) = self.next_line() else {
                        if self.pending.len() > MAX_CHUNK_LINE {
                            return self.fail("chunk size line too long");
                        }
                        return Status::Partial;
                    };
                    let line = String::from_utf8_lossy(&line);
                    let (size, extension) = match line.split_once(';') {
                        Some((size, extension)) => (size, Some(extension)),
                        None => (&*line, None),
                    };
                    if let Some(extension) = extension {
                        debug!(extension, "Ignoring chunk extension");
                    }
                    let size = size.trim();
                    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
                        return self.fail("chunk size is not hexadecimal");
                    }
                    let Ok(size) = usize::from_str_radix(size, 16) else {
                        return self.fail("chunk size out of range");
                    };
                    if size == 0 {
                        debug!("Last chunk received");
                        self.state = ChunkState::Trailer;
                    } else {
                        debug!(size, "Next chunk");
                        self.state = ChunkState::Data(size);
                    }
                }
                ChunkState::Data(missing) => {
                    let take = missing.min(self.pending.len());
                    let data = self.pending.split_to(take);
                    self.body.extend_from_slice(&data);
                    if take < missing {
                        self.state = ChunkState::Data(missing - take);
                        return Status::Partial;
                    }
                    debug!(body = self.body.len(), "Chunk complete");
                    self.state = ChunkState::DataEnd;
                }
                ChunkState::DataEnd => {
                    if self.pending.len() < CRLF.len() {
                        return Status::Partial;
                    }
                    if &self.pending[..CRLF.len()] != CRLF {
                        return self.fail("chunk data not terminated by CRLF");
                    }
                    self.pending.advance(CRLF.len());
                    self.state = ChunkState::Size;
                }
                ChunkState::Trailer => {
                    let Some(line) = self.next_line() else {
                        if self.pending.len() > MAX_CHUNK_LINE {
                            return self.fail("trailer line too long");
                        }
                        return Status::Partial;
                    };
                    if !line.is_empty() {
                        debug!(trailer = %String::from_utf8_lossy(&line), "Ignoring trailer");
                        continue;
                    }
                    if !self.pending.is_empty() {
                        warn!(
                            bytes = self.pending.len(),
                            "Received data after the end of a chunked body"
                        );
                    }
                    self.state = ChunkState::Done;
                    return Status::Complete;
                }
                ChunkState::Done => return Status::Complete,
            }
        }
    }

    fn failure(&self) -> Option<StatusCode> {
        self.failure
    }

    fn take_body(&mut self) -> RequestBody {
        if self.state == ChunkState::Done && self.failure.is_none() {
            RequestBody::new(self.body.split().to_vec())
        } else {
            RequestBody::empty()
        }
    }
}

/// Position of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
