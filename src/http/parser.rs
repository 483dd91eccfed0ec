use bytes::BytesMut;
use tracing::{debug, info};
use url::Url;

use crate::http::body::{BodyParser, TransferEncoding, find};
use crate::http::request::{
    HttpVersion, Method, Request, RequestBody, RequestHeaders, RequestLine,
};
use crate::http::response::StatusCode;

const CRLF: &[u8] = b"\r\n";
const BLANK_LINE: &[u8] = b"\r\n\r\n";

/// Longest request head (request line, headers and their terminators)
/// accepted before the request is rejected.
pub const MAX_HEAD_SIZE: usize = 8 * 1024;

/// Origin-form targets are resolved against this base to get an absolute URL.
const TARGET_BASE: &str = "http://localhost";

/// Progress reported by a parser after consuming a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// More bytes are needed.
    Partial,
    /// The message is assembled or a failure was detected.
    Complete,
}

impl Status {
    pub fn is_complete(&self) -> bool {
        matches!(self, Status::Complete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    RequestLine,
    Headers,
    Body,
    Done,
}

/// Incremental parser for one HTTP request.
///
/// [`parse`](Self::parse) may be called with buffers of any size, down to a
/// single byte; the result is the same as parsing the whole message at once.
/// It reports [`Status::Complete`] exactly once, after which the outcome is
/// taken with [`finish`](Self::finish). A parser serves one request only.
///
/// Request line and headers are collected as raw bytes and only decoded once
/// their terminating CRLF is seen, so body bytes that arrive in the same read
/// are handed to the body parser untouched.
pub struct RequestParser {
    mode: Mode,
    buffer: BytesMut,
    offset: usize,
    /// Bytes of `buffer` already searched for the current terminator.
    scanned: usize,
    request_line: Option<RequestLine>,
    headers: Option<RequestHeaders>,
    body_parser: Option<Box<dyn BodyParser>>,
    body: Option<RequestBody>,
    failure: Option<StatusCode>,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            mode: Mode::RequestLine,
            buffer: BytesMut::with_capacity(1024),
            offset: 0,
            scanned: 0,
            request_line: None,
            headers: None,
            body_parser: None,
            body: None,
            failure: None,
        }
    }

    /// Feeds the next slice of bytes read from the connection.
    pub fn parse(&mut self, buf: &[u8]) -> Status {
        match self.mode {
            Mode::Done => return Status::Complete,
            Mode::Body => return self.parse_body(buf),
            Mode::RequestLine | Mode::Headers => self.buffer.extend_from_slice(buf),
        }

        loop {
            let advanced = match self.mode {
                Mode::RequestLine => self.advance_request_line(),
                Mode::Headers => self.advance_headers(),
                Mode::Body => return self.start_body(),
                Mode::Done => return Status::Complete,
            };

            if self.failure.is_some() {
                self.mode = Mode::Done;
                return Status::Complete;
            }
            if !advanced {
                return Status::Partial;
            }
        }
    }

    /// The failure recorded during parsing, if any.
    pub fn failure(&self) -> Option<StatusCode> {
        self.failure
    }

    /// Returns the parsed request, or the status code describing why the
    /// request was rejected.
    pub fn finish(mut self) -> Result<Request, StatusCode> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }

        let line = self.request_line.take().ok_or(StatusCode::BadRequest)?;
        let headers = self.headers.take().unwrap_or_default();
        let body = self.body.take().unwrap_or_default();
        Ok(Request::new(line, headers, body))
    }

    fn fail(&mut self, status: StatusCode) -> bool {
        self.failure = Some(status);
        false
    }

    /// Searches `needle` in the bytes not scanned before. Returns its absolute
    /// position in `buffer`.
    fn scan(&mut self, needle: &[u8]) -> Option<usize> {
        let from = self.scanned.max(self.offset);
        match find(&self.buffer[from..], needle) {
            Some(at) => Some(from + at),
            None => {
                self.scanned = self.buffer.len().saturating_sub(needle.len() - 1).max(from);
                None
            }
        }
    }

    /// Fails once the head cannot end within [`MAX_HEAD_SIZE`] bytes.
    fn head_too_long(&mut self, end: Option<usize>) -> bool {
        let too_long = match end {
            Some(end) => end > MAX_HEAD_SIZE,
            None => self.buffer.len() >= MAX_HEAD_SIZE,
        };
        if too_long {
            info!(limit = MAX_HEAD_SIZE, "Request head too long. Rejecting as bad request.");
            self.failure = Some(StatusCode::BadRequest);
        }
        too_long
    }

    fn advance_request_line(&mut self) -> bool {
        let found = self.scan(CRLF);
        if self.head_too_long(found.map(|end| end + CRLF.len())) {
            return false;
        }
        let Some(end) = found else {
            return false;
        };

        let Ok(line) = std::str::from_utf8(&self.buffer[..end]) else {
            info!("Retrieved request line that is not valid UTF-8");
            return self.fail(StatusCode::BadRequest);
        };

        match parse_request_line(line) {
            Ok(request_line) => {
                debug!(
                    method = %request_line.method(),
                    target = request_line.target(),
                    version = %request_line.version(),
                    "Parsed request line"
                );
                self.request_line = Some(request_line);
                self.offset = end + CRLF.len();
                self.scanned = self.offset;
                self.mode = Mode::Headers;
                true
            }
            Err(status) => self.fail(status),
        }
    }

    fn advance_headers(&mut self) -> bool {
        // the request line was directly followed by the blank line
        if self.buffer[self.offset..].starts_with(CRLF) {
            self.headers = Some(RequestHeaders::default());
            self.offset += CRLF.len();
            self.mode = Mode::Body;
            return true;
        }

        let found = self.scan(BLANK_LINE);
        if self.head_too_long(found.map(|end| end + BLANK_LINE.len())) {
            return false;
        }
        let Some(end) = found else {
            return false;
        };

        let block = String::from_utf8_lossy(&self.buffer[self.offset..end]).into_owned();
        match parse_header_block(&block) {
            Ok(headers) => {
                self.headers = Some(headers);
                self.offset = end + BLANK_LINE.len();
                self.mode = Mode::Body;
                true
            }
            Err(status) => self.fail(status),
        }
    }

    /// Chooses the body parser once the header section is complete and hands
    /// it whatever followed the headers in the bytes read so far.
    fn start_body(&mut self) -> Status {
        let headers = self.headers.take().unwrap_or_default();
        let method = self.request_line.as_ref().map(|line| line.method());

        let Some(encoding) = TransferEncoding::of(&headers) else {
            info!(
                transfer_encoding = headers.get("transfer-encoding").unwrap_or_default(),
                "Unknown transfer encoding"
            );
            self.headers = Some(headers);
            return self.complete_with(Some(StatusCode::BadRequest));
        };

        if encoding == TransferEncoding::Identity && !expects_identity_body(method, &headers) {
            self.headers = Some(headers);
            return self.complete_with(None);
        }

        let Some(body_parser) = encoding.body_parser(&headers) else {
            info!(?encoding, "Unsupported transfer encoding");
            self.headers = Some(headers);
            return self.complete_with(Some(StatusCode::BadRequest));
        };

        self.headers = Some(headers);
        self.body_parser = Some(body_parser);

        let carry_forward = self.buffer.split_off(self.offset);
        self.buffer.clear();
        self.offset = 0;
        debug!(bytes = carry_forward.len(), "Switching to body parsing");
        self.parse_body(&carry_forward)
    }

    fn parse_body(&mut self, buf: &[u8]) -> Status {
        let Some(body_parser) = self.body_parser.as_mut() else {
            return self.complete_with(None);
        };

        if body_parser.parse(buf).is_complete() {
            let failure = body_parser.failure();
            self.body = Some(body_parser.take_body());
            self.body_parser = None;
            return self.complete_with(failure);
        }

        Status::Partial
    }

    fn complete_with(&mut self, failure: Option<StatusCode>) -> Status {
        self.failure = failure;
        self.mode = Mode::Done;
        Status::Complete
    }
}

/// Whether an identity-framed body has to be read: a non-zero
/// `Content-Length`, or a method that carries a body and left the length out.
fn expects_identity_body(method: Option<Method>, headers: &RequestHeaders) -> bool {
    match headers.get("content-length") {
        Some(length) => length.trim().parse::<usize>().map_or(true, |length| length > 0),
        None => matches!(method, Some(Method::POST) | Some(Method::PUT)),
    }
}

/// Parses `<method> <target> <version>`, separated by single spaces.
pub fn parse_request_line(line: &str) -> Result<RequestLine, StatusCode> {
    let segments: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = segments.as_slice() else {
        info!(line, "Retrieved invalid request line");
        return Err(StatusCode::BadRequest);
    };

    let Some(version) = HttpVersion::from_token(version) else {
        info!(version, "Retrieved invalid HTTP version");
        return Err(if is_version_token(version) {
            StatusCode::HttpVersionNotSupported
        } else {
            StatusCode::BadRequest
        });
    };

    let Some(method) = Method::from_str(method) else {
        info!(method, "Retrieved unknown method");
        return Err(StatusCode::BadRequest);
    };

    let uri = parse_target(target).ok_or_else(|| {
        info!(target, "Invalid uri in request line");
        StatusCode::BadRequest
    })?;

    Ok(RequestLine::new(method, *target, uri, version))
}

/// `HTTP/<digit>.<digit>`: well formed, even if not a version we speak.
fn is_version_token(token: &str) -> bool {
    match token.strip_prefix("HTTP/").map(str::as_bytes) {
        Some([major, b'.', minor]) => major.is_ascii_digit() && minor.is_ascii_digit(),
        _ => false,
    }
}

/// Resolves a request target to an absolute URL, rejecting characters the
/// URI grammar does not allow.
pub fn parse_target(target: &str) -> Option<Url> {
    if target.is_empty() || !is_uri_text(target) {
        return None;
    }

    if target.starts_with('/') || target == "*" {
        let base = Url::parse(TARGET_BASE).ok()?;
        base.join(target).ok()
    } else {
        Url::parse(target).ok()
    }
}

fn is_uri_text(target: &str) -> bool {
    let bytes = target.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let escape = bytes.get(i + 1..i + 3);
                if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                    return false;
                }
                i += 3;
                continue;
            }
            b if b.is_ascii_control() || b == b' ' => return false,
            b'"' | b'<' | b'>' | b'\\' | b'^' | b'`' | b'{' | b'|' | b'}' => return false,
            _ => {}
        }
        i += 1;
    }
    true
}

/// Parses the header section (without the terminating blank line).
///
/// A line starting with a space or tab continues the previous header; it is
/// appended verbatim, leading whitespace included.
pub fn parse_header_block(block: &str) -> Result<RequestHeaders, StatusCode> {
    let mut builder = RequestHeaders::builder();
    let mut lines = block.split("\r\n").peekable();

    while let Some(line) = lines.next() {
        let Some((name, value)) = line.split_once(':') else {
            info!(line, "Retrieved header line without a name");
            return Err(StatusCode::BadRequest);
        };
        if name.is_empty() || name.starts_with([' ', '\t']) {
            info!(line, "Retrieved header line without a name");
            return Err(StatusCode::BadRequest);
        }

        let mut value = value.to_string();
        while let Some(next) = lines.next_if(|next| next.starts_with([' ', '\t'])) {
            value.push_str(next);
        }

        builder.add(name, &value);
    }

    Ok(builder.build())
}
