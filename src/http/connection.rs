use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use tracing::{debug, error, info, warn};

use crate::config::ConnectionConfig;
use crate::dispatch::Dispatcher;
use crate::http::keep_alive::{self, Lifetime};
use crate::http::parser::RequestParser;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::server::LiveConnections;
use crate::server::supervisor::Signal;

/// Per-connection socket settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Timeout on socket writes, and on reads unless the client asked for
    /// another one.
    pub socket_timeout: Option<Duration>,
    pub read_buffer_size: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        ConnectionSettings::from(&ConnectionConfig::default())
    }
}

impl From<&ConnectionConfig> for ConnectionSettings {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            socket_timeout: config.socket_timeout(),
            read_buffer_size: config.read_buffer_size.max(1),
        }
    }
}

/// Represents a single client connection.
///
/// Every call to [`serve`](Self::serve) reads, handles and answers one
/// request:
///
/// 1. **Reading**: feeds socket reads to a fresh [`RequestParser`]
/// 2. **Processing**: dispatches the request, or answers the parse failure
/// 3. **Writing**: applies the keep-alive policy and writes the response
///
/// The connection then either stays open for the next request or closes.
pub struct Connection {
    id: u64,
    stream: TcpStream,
    peer: SocketAddr,
    created_at: Instant,
    dispatcher: Arc<dyn Dispatcher>,
    settings: ConnectionSettings,
    lifetime: Lifetime,
    /// Read timeout requested through `Keep-Alive: timeout=`, used once.
    next_timeout: Option<Duration>,
    buffer: Vec<u8>,
    live: LiveConnections,
    served: u64,
    closed: bool,
}

impl Connection {
    /// Wraps an accepted socket and registers it with `live`.
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        created_at: Instant,
        dispatcher: Arc<dyn Dispatcher>,
        settings: ConnectionSettings,
        live: LiveConnections,
    ) -> io::Result<Self> {
        stream.set_write_timeout(settings.socket_timeout)?;
        let id = live.register(&stream)?;
        let buffer = vec![0; settings.read_buffer_size.max(1)];
        Ok(Self {
            id,
            stream,
            peer,
            created_at,
            dispatcher,
            settings,
            lifetime: Lifetime::default(),
            next_timeout: None,
            buffer,
            live,
            served: 0,
            closed: false,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Responses written so far.
    pub fn served(&self) -> u64 {
        self.served
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Serves one request.
    ///
    /// Returns [`Signal::Continue`] while the connection stays open and
    /// [`Signal::Stop`] once it is closed. Faults, socket timeouts included,
    /// are answered with a best-effort 500 and close the connection. Only an
    /// end of stream closes it silently.
    pub fn serve(&mut self) -> Result<Signal> {
        if self.closed {
            return Ok(Signal::Stop);
        }

        match self.exchange() {
            Ok(signal) => Ok(signal),
            Err(e) => {
                error!(peer = %self.peer, error = %e, "Failed to serve request");
                let response = Response::error(StatusCode::InternalServerError);
                if let Err(write_error) = ResponseWriter::new(&response).write_to(&mut self.stream) {
                    warn!(peer = %self.peer, error = %write_error, "Failed to write error response");
                }
                self.close();
                Ok(Signal::Stop)
            }
        }
    }

    fn exchange(&mut self) -> Result<Signal> {
        let mut parser = RequestParser::new();
        let timeout = self.next_timeout.take().or(self.settings.socket_timeout);
        self.stream.set_read_timeout(timeout)?;

        loop {
            let n = match self.stream.read(&mut self.buffer) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                debug!(peer = %self.peer, "Connection closed by peer");
                self.close();
                return Ok(Signal::Stop);
            }
            debug!(peer = %self.peer, bytes = n, "Read");
            if parser.parse(&self.buffer[..n]).is_complete() {
                break;
            }
        }

        let response = match parser.finish() {
            Err(status) => {
                info!(peer = %self.peer, status = status.as_u16(), "Rejected request");
                Response::error(status)
            }
            Ok(request) => {
                let dispatched = panic::catch_unwind(AssertUnwindSafe(|| {
                    self.dispatcher.handle(&request)
                }))
                .map_err(|_| anyhow!("handler panicked"))?;
                let mut response = dispatched?;
                self.next_timeout =
                    keep_alive::apply(&request, &mut response, &mut self.lifetime);
                info!(
                    peer = %self.peer,
                    method = %request.method(),
                    uri = %request.uri().path(),
                    status = response.status.as_u16(),
                    "Served request"
                );
                response
            }
        };

        ResponseWriter::new(&response).write_to(&mut self.stream)?;
        self.served += 1;

        if response.closes_connection() {
            self.close();
            Ok(Signal::Stop)
        } else {
            Ok(Signal::Continue)
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!(peer = %self.peer, error = %e, "Socket already closed");
        }
        self.live.deregister(self.id);
        info!(
            peer = %self.peer,
            requests = self.served,
            open_ms = self.created_at.elapsed().as_millis() as u64,
            "Connection closed"
        );
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
