use std::time::Duration;

use url::Url;
use wicket::http::keep_alive::{self, KeepAliveParams, Lifetime};
use wicket::http::request::{
    HttpVersion, Method, Request, RequestBody, RequestHeaders, RequestLine,
};
use wicket::http::response::{Response, StatusCode};

fn request(headers: &[(&str, &str)]) -> Request {
    let mut builder = RequestHeaders::builder();
    for (name, value) in headers {
        builder.add(name, value);
    }
    let uri = Url::parse("http://localhost/x").unwrap();
    Request::new(
        RequestLine::new(Method::GET, "/x", uri, HttpVersion::Http11),
        builder.build(),
        RequestBody::empty(),
    )
}

#[test]
fn test_params_parsing() {
    let params = KeepAliveParams::parse("timeout=5, MAX=100");
    assert_eq!(params.timeout, Some(5));
    assert_eq!(params.max, Some(100));

    let params = KeepAliveParams::parse("timeout, max=abc, other=1");
    assert_eq!(params, KeepAliveParams::default());
}

#[test]
fn test_connection_close_is_propagated() {
    let mut lifetime = Lifetime::default();
    let mut response = Response::error(StatusCode::NotFound);

    let timeout = keep_alive::apply(
        &request(&[("Connection", "close"), ("Keep-Alive", "timeout=5")]),
        &mut response,
        &mut lifetime,
    );

    assert_eq!(timeout, None);
    assert_eq!(response.header("Connection"), Some("close"));
    assert!(response.closes_connection());
}

#[test]
fn test_missing_connection_header_removes_it() {
    let mut lifetime = Lifetime::default();
    let mut response = Response::builder().header("Connection", "close").build();

    keep_alive::apply(&request(&[]), &mut response, &mut lifetime);

    assert_eq!(response.header("Connection"), None);
    assert!(!response.closes_connection());
}

#[test]
fn test_keep_alive_is_confirmed() {
    let mut lifetime = Lifetime::default();
    let mut response = Response::ok(b"x".to_vec());

    let timeout = keep_alive::apply(
        &request(&[("Connection", "Keep-Alive")]),
        &mut response,
        &mut lifetime,
    );

    assert_eq!(timeout, None);
    assert_eq!(response.header("Connection"), Some("keep-alive"));
}

#[test]
fn test_timeout_is_returned_for_next_read() {
    let mut lifetime = Lifetime::default();
    let mut response = Response::ok(Vec::new());

    let timeout = keep_alive::apply(
        &request(&[("Connection", "keep-alive"), ("Keep-Alive", "timeout=7")]),
        &mut response,
        &mut lifetime,
    );
    assert_eq!(timeout, Some(Duration::from_secs(7)));

    let timeout = keep_alive::apply(
        &request(&[("Connection", "keep-alive"), ("Keep-Alive", "timeout=0")]),
        &mut response,
        &mut lifetime,
    );
    assert_eq!(timeout, None);
}

#[test]
fn test_max_closes_after_n_requests() {
    let mut lifetime = Lifetime::default();
    let req = request(&[("Connection", "keep-alive"), ("Keep-Alive", "max=3")]);

    for expected in ["keep-alive", "keep-alive", "close"] {
        let mut response = Response::ok(Vec::new());
        keep_alive::apply(&req, &mut response, &mut lifetime);
        assert_eq!(response.header("Connection"), Some(expected));
    }
    assert_eq!(lifetime.requests, 3);
}

#[test]
fn test_non_positive_max_resets_counter() {
    let mut lifetime = Lifetime { requests: 2 };
    let mut response = Response::ok(Vec::new());

    keep_alive::apply(
        &request(&[("Connection", "keep-alive"), ("Keep-Alive", "max=0")]),
        &mut response,
        &mut lifetime,
    );

    assert_eq!(lifetime.requests, 0);
    assert_eq!(response.header("Connection"), Some("keep-alive"));
}
