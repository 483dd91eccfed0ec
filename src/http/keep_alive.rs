//! Connection lifetime negotiation through `Connection` and `Keep-Alive`.

use std::time::Duration;

use tracing::debug;

use crate::http::request::Request;
use crate::http::response::Response;

/// Per-connection bookkeeping that survives across requests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Lifetime {
    /// Requests counted against a `Keep-Alive: max=` limit.
    pub requests: u32,
}

/// Parameters of a `Keep-Alive` header.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeepAliveParams {
    pub timeout: Option<i64>,
    pub max: Option<i64>,
}

impl KeepAliveParams {
    /// Parses comma-separated `name=value` pairs. Names are case-insensitive;
    /// unknown or malformed parameters are skipped.
    pub fn parse(header: &str) -> Self {
        let mut params = Self::default();
        for parameter in header.split(',') {
            let Some((name, value)) = parameter.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let Ok(value) = value.trim().parse::<i64>() else {
                debug!(parameter, "Ignoring malformed keep-alive parameter");
                continue;
            };
            if name.eq_ignore_ascii_case("timeout") {
                params.timeout = Some(value);
            } else if name.eq_ignore_ascii_case("max") {
                params.max = Some(value);
            }
        }
        params
    }
}

/// Applies the client's connection preferences to `response` and to the
/// connection's `lifetime`.
///
/// Returns the read timeout requested for the next read, if the client asked
/// for one through `Keep-Alive: timeout=`.
pub fn apply(request: &Request, response: &mut Response, lifetime: &mut Lifetime) -> Option<Duration> {
    let Some(connection) = request.header("connection").map(str::trim) else {
        response.remove_header("Connection");
        return None;
    };

    if connection.eq_ignore_ascii_case("close") {
        response.set_header("Connection", "close");
        return None;
    }

    if !connection.eq_ignore_ascii_case("keep-alive") {
        return None;
    }

    let params = request
        .header("keep-alive")
        .map(KeepAliveParams::parse)
        .unwrap_or_default();

    let timeout = match params.timeout {
        Some(seconds) if seconds > 0 => Some(Duration::from_secs(seconds.unsigned_abs())),
        Some(seconds) => {
            debug!(seconds, "Ignoring non-positive keep-alive timeout");
            None
        }
        None => None,
    };

    let mut limit_reached = false;
    if let Some(max) = params.max {
        if max <= 0 {
            lifetime.requests = 0;
        } else {
            lifetime.requests += 1;
            limit_reached = i64::from(lifetime.requests) >= max;
        }
    }

    if limit_reached {
        debug!(requests = lifetime.requests, "Keep-alive request limit reached");
        response.set_header("Connection", "close");
    } else {
        response.set_header("Connection", "keep-alive");
    }

    timeout
}
