use std::collections::HashMap;
use std::fmt;

use url::Url;

/// HTTP request methods.
///
/// Every method of HTTP/1.1 is recognized by the parser. Whether a method is
/// served depends on the handler bindings; unbound methods get a 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// CONNECT - Establish a tunnel
    CONNECT,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// TRACE - Message loop-back test
    TRACE,
}

impl Method {
    pub const ALL: [Method; 8] = [
        Method::GET,
        Method::HEAD,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::CONNECT,
        Method::OPTIONS,
        Method::TRACE,
    ];

    /// Parses an HTTP method from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of the method (case-sensitive, uppercase)
    ///
    /// # Returns
    ///
    /// `Some(Method)` if the string matches a known method, `None` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use wicket::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "CONNECT" => Some(Method::CONNECT),
            "OPTIONS" => Some(Method::OPTIONS),
            "TRACE" => Some(Method::TRACE),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::CONNECT => "CONNECT",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP protocol versions the server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    /// Looks up the version for a request-line token such as `HTTP/1.1`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "HTTP/1.0" => Some(HttpVersion::Http10),
            "HTTP/1.1" => Some(HttpVersion::Http11),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parsed first line of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: Method,
    target: String,
    uri: Url,
    version: HttpVersion,
}

impl RequestLine {
    pub fn new(method: Method, target: impl Into<String>, uri: Url, version: HttpVersion) -> Self {
        Self {
            method,
            target: target.into(),
            uri,
            version,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The request target exactly as it appeared on the wire.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The target resolved to an absolute URL.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }
}

/// Request headers keyed by lower-cased, trimmed name.
///
/// Repeated names are folded into one value joined by `,` in the order they
/// were received. Built once through [`RequestHeadersBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    headers: HashMap<String, String>,
}

impl RequestHeaders {
    pub fn builder() -> RequestHeadersBuilder {
        RequestHeadersBuilder::default()
    }

    /// Retrieves a header value by name, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.headers.get(name) {
            Some(v) => Some(v.as_str()),
            None => self.headers.get(&name.to_ascii_lowercase()).map(|v| v.as_str()),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Append-only builder for [`RequestHeaders`].
#[derive(Debug, Default)]
pub struct RequestHeadersBuilder {
    headers: HashMap<String, String>,
}

impl RequestHeadersBuilder {
    /// Adds a header. The name is lower-cased and trimmed, the value trimmed.
    /// A name seen before gets the new value appended after a comma.
    pub fn add(&mut self, name: &str, value: &str) -> &mut Self {
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        self.headers
            .entry(name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.add(name, value);
        self
    }

    pub fn build(self) -> RequestHeaders {
        RequestHeaders {
            headers: self.headers,
        }
    }
}

/// Owned request body bytes. Empty when the request carried no body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestBody {
    content: Vec<u8>,
}

impl RequestBody {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Represents a parsed HTTP request from a client.
///
/// Assembled exactly once by the request parser and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    line: RequestLine,
    headers: RequestHeaders,
    body: RequestBody,
}

impl Request {
    pub fn new(line: RequestLine, headers: RequestHeaders, body: RequestBody) -> Self {
        Self {
            line,
            headers,
            body,
        }
    }

    pub fn line(&self) -> &RequestLine {
        &self.line
    }

    pub fn method(&self) -> Method {
        self.line.method
    }

    pub fn version(&self) -> HttpVersion {
        self.line.version
    }

    pub fn uri(&self) -> &Url {
        &self.line.uri
    }

    pub fn headers(&self) -> &RequestHeaders {
        &self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Retrieves a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The media type of the `Content-Type` header without parameters, or
    /// `*` when the header is absent.
    pub fn media_type(&self) -> &str {
        match self.header("content-type") {
            Some(value) => value.split(';').next().unwrap_or_default().trim(),
            None => "*",
        }
    }
}
