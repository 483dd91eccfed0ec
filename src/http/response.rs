use std::collections::BTreeMap;

use crate::http::request::HttpVersion;

/// HTTP status codes used by the server.
///
/// - `Ok` (200): Request successful
/// - `Created` (201): Resource created successfully
/// - `NoContent` (204): Successful request with no content
/// - `BadRequest` (400): Malformed request or unsupported method
/// - `NotFound` (404): Resource not found
/// - `LengthRequired` (411): Body without `Content-Length`
/// - `UnsupportedMediaType` (415): No handler for the content type
/// - `InternalServerError` (500): Server error
/// - `HttpVersionNotSupported` (505): Unknown protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 411 Length Required
    LengthRequired,
    /// 415 Unsupported Media Type
    UnsupportedMediaType,
    /// 500 Internal Server Error
    InternalServerError,
    /// 505 HTTP Version not supported
    HttpVersionNotSupported,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use wicket::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::LengthRequired.as_u16(), 411);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::LengthRequired => 411,
            StatusCode::UnsupportedMediaType => 415,
            StatusCode::InternalServerError => 500,
            StatusCode::HttpVersionNotSupported => 505,
        }
    }

    /// Returns the reason phrase written on the status line.
    ///
    /// # Example
    ///
    /// ```
    /// # use wicket::http::response::StatusCode;
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// assert_eq!(
    ///     StatusCode::HttpVersionNotSupported.reason_phrase(),
    ///     "HTTP Version not supported"
    /// );
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::LengthRequired => "Length Required",
            StatusCode::UnsupportedMediaType => "Unsupported Media Type",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::HttpVersionNotSupported => "HTTP Version not supported",
        }
    }
}

/// Text encoding for the status line and header section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    /// ISO-8859-1. Characters outside the range are written as `?`.
    Latin1,
}

impl Charset {
    pub fn encode_into(&self, text: &str, buf: &mut Vec<u8>) {
        match self {
            Charset::Utf8 => buf.extend_from_slice(text.as_bytes()),
            Charset::Latin1 => buf.extend(text.chars().map(|c| u8::try_from(c).unwrap_or(b'?'))),
        }
    }
}

/// An HTTP response ready to be serialized.
///
/// Built once by a handler, after which only the header map may still change:
/// the connection adjusts `Connection` before the response is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Protocol version on the status line
    pub version: HttpVersion,
    /// Encoding of status line and headers
    pub charset: Charset,
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers as name-value pairs
    pub headers: BTreeMap<String, String>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// Defaults to HTTP/1.1, UTF-8, `200 OK`, no headers and an empty body.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new()
///     .status(StatusCode::Created)
///     .header("Content-Length", "0")
///     .build();
/// ```
#[derive(Debug)]
pub struct ResponseBuilder {
    version: HttpVersion,
    charset: Charset,
    status: StatusCode,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self {
            version: HttpVersion::Http11,
            charset: Charset::Utf8,
            status: StatusCode::Ok,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: HttpVersion) -> Self {
        self.version = version;
        self
    }

    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds or replaces a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the final Response.
    ///
    /// No header is derived implicitly; handlers set `Content-Length`
    /// themselves where the response carries one.
    pub fn build(self) -> Response {
        Response {
            version: self.version,
            charset: self.charset,
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    /// Creates a 200 OK response carrying `body` and its `Content-Length`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        ResponseBuilder::new()
            .header("Content-Length", body.len().to_string())
            .body(body)
            .build()
    }

    /// Creates an error response with an empty body and `Content-Length: 0`.
    pub fn error(status: StatusCode) -> Self {
        ResponseBuilder::new()
            .status(status)
            .header("Content-Length", "0")
            .build()
    }

    /// Creates an error response with a UTF-8 message body.
    pub fn error_with_message(status: StatusCode, message: &str) -> Self {
        ResponseBuilder::new()
            .status(status)
            .header("Content-Length", message.len().to_string())
            .body(message.as_bytes().to_vec())
            .build()
    }

    /// Retrieves a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Sets a header, replacing any value stored under the same name in any case.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.remove_header(name);
        self.headers.insert(name.to_string(), value.into());
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
    }

    /// Whether the response announces the end of the connection.
    pub fn closes_connection(&self) -> bool {
        self.header("Connection")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("close"))
    }
}
