use wicket::http::parser::{
    MAX_HEAD_SIZE, RequestParser, Status, parse_header_block, parse_request_line,
};
use wicket::http::request::{HttpVersion, Method, Request};
use wicket::http::response::StatusCode;

fn parse_whole(raw: &[u8]) -> Result<Request, StatusCode> {
    let mut parser = RequestParser::new();
    assert_eq!(parser.parse(raw), Status::Complete, "request should be complete");
    parser.finish()
}

fn parse_bytewise(raw: &[u8]) -> Result<Request, StatusCode> {
    let mut parser = RequestParser::new();
    for byte in raw {
        if parser.parse(std::slice::from_ref(byte)).is_complete() {
            return parser.finish();
        }
    }
    panic!("request never completed");
}

fn assert_same_either_way(raw: &[u8]) -> Result<Request, StatusCode> {
    let whole = parse_whole(raw);
    let bytewise = parse_bytewise(raw);
    assert_eq!(whole, bytewise);
    whole
}

#[test]
fn test_parse_simple_get_request() {
    let req = assert_same_either_way(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();

    assert_eq!(req.method(), Method::GET);
    assert_eq!(req.uri().path(), "/");
    assert_eq!(req.version(), HttpVersion::Http11);
    assert_eq!(req.header("Host"), Some("example.com"));
    assert!(req.body().is_empty());
}

#[test]
fn test_parse_request_without_headers() {
    let req = assert_same_either_way(b"GET /missing HTTP/1.0\r\n\r\n").unwrap();

    assert_eq!(req.version(), HttpVersion::Http10);
    assert_eq!(req.uri().path(), "/missing");
    assert!(req.headers().is_empty());
}

#[test]
fn test_parse_post_request_with_body() {
    let req = assert_same_either_way(
        b"POST /api HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello",
    )
    .unwrap();

    assert_eq!(req.method(), Method::POST);
    assert_eq!(req.body().as_bytes(), b"hello");
}

#[test]
fn test_parse_body_bytes_are_not_decoded() {
    let mut raw = b"PUT /bin HTTP/1.1\r\nContent-Length: 4\r\n\r\n".to_vec();
    raw.extend_from_slice(&[0xff, 0x00, 0xc3, 0x28]);

    let req = assert_same_either_way(&raw).unwrap();
    assert_eq!(req.body().as_bytes(), &[0xffu8, 0x00, 0xc3, 0x28]);
}

#[test]
fn test_parse_request_with_path_and_query_string() {
    let req = assert_same_either_way(b"GET /search?q=rust HTTP/1.1\r\n\r\n").unwrap();

    assert_eq!(req.uri().path(), "/search");
    assert_eq!(req.uri().query(), Some("q=rust"));
    assert_eq!(req.line().target(), "/search?q=rust");
}

#[test]
fn test_parse_multiline_header_is_folded_verbatim() {
    let req = assert_same_either_way(
        b"GET / HTTP/1.1\r\nX-Long: first\r\n  second\r\n\tthird\r\nHost: h\r\n\r\n",
    )
    .unwrap();

    assert_eq!(req.header("x-long"), Some("first  second\tthird"));
    assert_eq!(req.header("host"), Some("h"));
}

#[test]
fn test_parse_repeated_headers_are_joined() {
    let req = assert_same_either_way(
        b"GET / HTTP/1.1\r\nAccept: text/plain\r\naccept: text/html\r\nACCEPT: */*\r\n\r\n",
    )
    .unwrap();

    assert_eq!(req.header("accept"), Some("text/plain,text/html,*/*"));
    assert_eq!(req.headers().len(), 1);
}

#[test]
fn test_parse_chunked_body() {
    let req = assert_same_either_way(
        b"PUT /chunk.json HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nfirst\r\n6;ext=1\r\nsecond\r\n0\r\nX-Trailer: t\r\n\r\n",
    )
    .unwrap();

    assert_eq!(req.body().as_bytes(), b"firstsecond");
}

#[test]
fn test_parse_incomplete_request_missing_blank_line() {
    let mut parser = RequestParser::new();
    assert_eq!(
        parser.parse(b"GET / HTTP/1.1\r\nHost: example.com\r\n"),
        Status::Partial
    );
    assert_eq!(parser.parse(b"\r\n"), Status::Complete);
    assert!(parser.finish().is_ok());
}

#[test]
fn test_parse_incomplete_request_partial_body() {
    let mut parser = RequestParser::new();
    assert_eq!(
        parser.parse(b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello"),
        Status::Partial
    );
    assert_eq!(parser.parse(b"world"), Status::Complete);
    assert_eq!(parser.finish().unwrap().body().as_bytes(), b"helloworld");
}

#[test]
fn test_parse_body_overrun_in_same_read_is_bad_request() {
    let result = parse_whole(b"POST /api HTTP/1.1\r\nContent-Length: 3\r\n\r\nhello");
    assert_eq!(result, Err(StatusCode::BadRequest));
}

#[test]
fn test_parse_body_overrun_split_across_reads() {
    let mut parser = RequestParser::new();
    assert_eq!(
        parser.parse(b"POST /api HTTP/1.1\r\nContent-Length: 3\r\n\r\nhe"),
        Status::Partial
    );
    assert_eq!(parser.parse(b"llo"), Status::Complete);
    assert_eq!(parser.finish(), Err(StatusCode::BadRequest));
}

#[test]
fn test_parse_post_without_length_is_length_required() {
    let result = assert_same_either_way(b"POST /api HTTP/1.1\r\nHost: h\r\n\r\n");
    assert_eq!(result, Err(StatusCode::LengthRequired));
}

#[test]
fn test_parse_get_without_length_has_empty_body() {
    let req = assert_same_either_way(b"DELETE /x HTTP/1.1\r\nHost: h\r\n\r\n").unwrap();
    assert!(req.body().is_empty());
}

#[test]
fn test_parse_unsupported_version() {
    let result = assert_same_either_way(b"GET / HTTP/2.0\r\n\r\n");
    assert_eq!(result, Err(StatusCode::HttpVersionNotSupported));
}

#[test]
fn test_parse_failures_are_bad_request() {
    let cases: [&[u8]; 7] = [
        b"GET /\r\n\r\n",
        b"GET  / HTTP/1.1\r\n\r\n",
        b"GET / FOO\r\n\r\n",
        b"BREW / HTTP/1.1\r\n\r\n",
        b"GET /a{b} HTTP/1.1\r\n\r\n",
        b"GET / HTTP/1.1\r\nno colon here\r\n\r\n",
        b"POST / HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n",
    ];

    for raw in cases {
        let result = assert_same_either_way(raw);
        assert_eq!(
            result,
            Err(StatusCode::BadRequest),
            "{}",
            String::from_utf8_lossy(raw)
        );
    }
}

#[test]
fn test_parse_request_line_tokens() {
    let line = parse_request_line("OPTIONS /x HTTP/1.0").unwrap();
    assert_eq!(line.method(), Method::OPTIONS);
    assert_eq!(line.version(), HttpVersion::Http10);
    assert_eq!(line.uri().path(), "/x");

    assert_eq!(
        parse_request_line("get /x HTTP/1.0").unwrap_err(),
        StatusCode::BadRequest
    );
}

#[test]
fn test_parse_header_block_rejects_leading_continuation() {
    assert_eq!(
        parse_header_block(" orphan\r\nHost: h").unwrap_err(),
        StatusCode::BadRequest
    );
}

fn request_with_header_of(length: usize) -> Vec<u8> {
    let mut raw = b"GET / HTTP/1.1\r\nX-Filler: ".to_vec();
    raw.resize(raw.len() + length, b'a');
    raw.extend_from_slice(b"\r\n\r\n");
    raw
}

#[test]
fn test_parse_oversized_head_is_bad_request() {
    let raw = request_with_header_of(MAX_HEAD_SIZE);

    assert_eq!(parse_whole(&raw), Err(StatusCode::BadRequest));
    assert_eq!(parse_bytewise(&raw), Err(StatusCode::BadRequest));
}

#[test]
fn test_parse_head_at_limit_is_accepted() {
    let overhead = request_with_header_of(0).len();
    let raw = request_with_header_of(MAX_HEAD_SIZE - overhead);
    assert_eq!(raw.len(), MAX_HEAD_SIZE);

    let req = assert_same_either_way(&raw).unwrap();
    assert_eq!(req.header("x-filler").map(str::len), Some(MAX_HEAD_SIZE - overhead));
}

#[test]
fn test_parse_oversized_request_line_is_bad_request() {
    let mut raw = b"GET /".to_vec();
    raw.resize(MAX_HEAD_SIZE + 1, b'a');

    let mut parser = RequestParser::new();
    assert_eq!(parser.parse(&raw), Status::Complete);
    assert_eq!(parser.finish(), Err(StatusCode::BadRequest));
}

#[test]
fn test_parse_unterminated_header_stops_buffering() {
    let chunk = vec![b'a'; 1024 * 1024];
    let mut parser = RequestParser::new();
    assert_eq!(parser.parse(b"GET / HTTP/1.1\r\n"), Status::Partial);

    // the first oversized read already ends the request
    assert_eq!(parser.parse(&chunk), Status::Complete);
    assert_eq!(parser.parse(&chunk), Status::Complete);
    assert_eq!(parser.finish(), Err(StatusCode::BadRequest));
}

#[test]
fn test_parse_terminator_split_across_reads() {
    let mut parser = RequestParser::new();
    let parts: [&[u8]; 3] = [b"GET / HTTP/1.1\r", b"\nHost: h\r\n\r", b"\n"];
    for part in parts {
        parser.parse(part);
    }
    let req = parser.finish().unwrap();
    assert_eq!(req.header("host"), Some("h"));
}
