use wicket::http::body::{BodyParser, ChunkedParser, IdentityParser, TransferEncoding};
use wicket::http::parser::Status;
use wicket::http::request::RequestHeaders;
use wicket::http::response::StatusCode;

fn feed_in_pieces(parser: &mut dyn BodyParser, raw: &[u8], piece: usize) -> Status {
    let mut status = Status::Partial;
    for chunk in raw.chunks(piece) {
        status = parser.parse(chunk);
        if status.is_complete() {
            break;
        }
    }
    status
}

#[test]
fn test_transfer_encoding_lookup() {
    let none = RequestHeaders::default();
    assert_eq!(TransferEncoding::of(&none), Some(TransferEncoding::Identity));

    let chunked = RequestHeaders::builder()
        .header("Transfer-Encoding", " Chunked ")
        .build();
    assert_eq!(TransferEncoding::of(&chunked), Some(TransferEncoding::Chunked));

    let unknown = RequestHeaders::builder()
        .header("Transfer-Encoding", "br")
        .build();
    assert_eq!(TransferEncoding::of(&unknown), None);
}

#[test]
fn test_compression_encodings_have_no_parser() {
    let headers = RequestHeaders::default();
    for encoding in [
        TransferEncoding::Gzip,
        TransferEncoding::Deflate,
        TransferEncoding::Compress,
    ] {
        assert!(encoding.body_parser(&headers).is_none());
    }
    assert!(TransferEncoding::Chunked.body_parser(&headers).is_some());
}

#[test]
fn test_identity_exact_length() {
    let mut parser = IdentityParser::new(Some(11));
    assert_eq!(feed_in_pieces(&mut parser, b"hello world", 3), Status::Complete);
    assert_eq!(parser.failure(), None);
    assert_eq!(parser.take_body().as_bytes(), b"hello world");
}

#[test]
fn test_identity_waits_for_missing_bytes() {
    let mut parser = IdentityParser::new(Some(4));
    assert_eq!(parser.parse(b"ab"), Status::Partial);
    assert_eq!(parser.parse(b"cd"), Status::Complete);
    assert_eq!(parser.take_body().as_bytes(), b"abcd");
}

#[test]
fn test_identity_overrun() {
    let mut parser = IdentityParser::new(Some(2));
    assert_eq!(parser.parse(b"abc"), Status::Complete);
    assert_eq!(parser.failure(), Some(StatusCode::BadRequest));
    assert!(parser.take_body().is_empty());
}

#[test]
fn test_identity_without_length() {
    let mut parser = IdentityParser::from_headers(&RequestHeaders::default());
    assert_eq!(parser.parse(b"data"), Status::Complete);
    assert_eq!(parser.failure(), Some(StatusCode::LengthRequired));
}

#[test]
fn test_identity_invalid_length() {
    let headers = RequestHeaders::builder()
        .header("Content-Length", "ten")
        .build();
    let mut parser = IdentityParser::from_headers(&headers);
    assert_eq!(parser.parse(b""), Status::Complete);
    assert_eq!(parser.failure(), Some(StatusCode::BadRequest));
}

const CHUNKED: &[u8] =
    b"4\r\nWiki\r\n5;name=value\r\npedia\r\nE\r\n in\r\n\r\nchunks.\r\n0\r\nExpires: never\r\n\r\n";

#[test]
fn test_chunked_any_split() {
    for piece in [1, 2, 3, 7, CHUNKED.len()] {
        let mut parser = ChunkedParser::new();
        assert_eq!(feed_in_pieces(&mut parser, CHUNKED, piece), Status::Complete);
        assert_eq!(parser.failure(), None);
        assert_eq!(
            parser.take_body().as_bytes(),
            b"Wikipedia in\r\n\r\nchunks.",
            "piece size {piece}"
        );
    }
}

#[test]
fn test_chunked_without_trailer() {
    let mut parser = ChunkedParser::new();
    assert_eq!(parser.parse(b"3\r\nabc\r\n0\r\n\r\n"), Status::Complete);
    assert_eq!(parser.take_body().as_bytes(), b"abc");
}

#[test]
fn test_chunked_waits_for_last_chunk() {
    let mut parser = ChunkedParser::new();
    assert_eq!(parser.parse(b"3\r\nabc\r\n"), Status::Partial);
    assert_eq!(parser.parse(b"0\r\n"), Status::Partial);
    assert_eq!(parser.parse(b"\r\n"), Status::Complete);
}

#[test]
fn test_chunked_bad_size() {
    let mut parser = ChunkedParser::new();
    assert_eq!(parser.parse(b"zz\r\nabc\r\n"), Status::Complete);
    assert_eq!(parser.failure(), Some(StatusCode::BadRequest));
    assert!(parser.take_body().is_empty());
}

#[test]
fn test_chunked_size_must_be_bare_hex() {
    let cases: [&[u8]; 4] = [
        b"+5\r\nhello\r\n0\r\n\r\n",
        b"-0\r\n\r\n",
        b"\r\n\r\n",
        b"0x5\r\nhello\r\n",
    ];
    for raw in cases {
        let mut parser = ChunkedParser::new();
        assert_eq!(parser.parse(raw), Status::Complete);
        assert_eq!(
            parser.failure(),
            Some(StatusCode::BadRequest),
            "{}",
            String::from_utf8_lossy(raw)
        );
    }
}

#[test]
fn test_chunked_missing_data_terminator() {
    let mut parser = ChunkedParser::new();
    assert_eq!(parser.parse(b"3\r\nabcX\r\n"), Status::Complete);
    assert_eq!(parser.failure(), Some(StatusCode::BadRequest));
}
