use std::io::{self, Write};

use crate::http::response::Response;

/// Serializes a response: status line, header lines, blank line, raw body.
pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + resp.body.len());
    let charset = resp.charset;

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        resp.version.as_str(),
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    charset.encode_into(&status_line, &mut buf);

    // Headers
    for (k, v) in &resp.headers {
        charset.encode_into(k, &mut buf);
        buf.extend_from_slice(b": ");
        charset.encode_into(v, &mut buf);
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    // Body
    buf.extend_from_slice(&resp.body);

    buf
}

pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
            written: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.written
    }

    /// Writes the serialized response, resuming where a previous call stopped.
    pub fn write_to<W: Write>(&mut self, stream: &mut W) -> io::Result<()> {
        while self.written < self.buffer.len() {
            let n = match stream.write(&self.buffer[self.written..]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "connection closed while writing",
                ));
            }

            self.written += n;
        }

        stream.flush()
    }
}
