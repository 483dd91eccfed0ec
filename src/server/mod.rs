//! Socket server: listener, acceptor threads and the connection pool.
//!
//! ```text
//!   listener ──accept──▶ acceptor-N ──submit──▶ connection pool ──▶ connection-N
//!                        (supervised)           (bounded, blocks)   (supervised, one
//!                                                                    request per serve)
//! ```

pub mod acceptor;
pub mod listener;
pub mod pool;
pub mod supervisor;

use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::http::connection::ConnectionSettings;
use acceptor::Acceptor;
use pool::{PoolSettings, WorkerPool};
use supervisor::Supervisor;

/// Sockets of the connections currently being served.
///
/// Shutdown closes them all, which turns blocked reads into end-of-stream.
#[derive(Clone, Default)]
pub struct LiveConnections {
    streams: Arc<Mutex<HashMap<u64, TcpStream>>>,
    next_id: Arc<AtomicU64>,
}

impl LiveConnections {
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, TcpStream>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tracks a clone of `stream` and returns its id.
    pub fn register(&self, stream: &TcpStream) -> io::Result<u64> {
        let clone = stream.try_clone()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, clone);
        Ok(id)
    }

    pub fn deregister(&self, id: u64) {
        self.lock().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Shuts down every tracked socket.
    pub fn shutdown_all(&self) {
        for (id, stream) in self.lock().drain() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!(connection = id, error = %e, "Socket already closed");
            }
        }
    }
}

/// State shared by the acceptors.
pub(crate) struct Shared {
    pub(crate) listener: TcpListener,
    pub(crate) closed: AtomicBool,
    pub(crate) dispatcher: Arc<dyn Dispatcher>,
    pub(crate) settings: ConnectionSettings,
    pub(crate) connections: WorkerPool,
    pub(crate) live: LiveConnections,
}

/// A running server.
pub struct Server {
    local_addr: SocketAddr,
    shared: Arc<Shared>,
    acceptors: WorkerPool,
    acceptor_count: usize,
}

impl Server {
    /// Binds the configured address and starts the acceptors.
    pub fn start(config: &Config, dispatcher: Arc<dyn Dispatcher>) -> Result<Self> {
        let listener = listener::bind(&config.server.listen_addr(), config.server.backlog)?;
        let local_addr = listener.local_addr()?;

        let connection = &config.connection;
        let connections = WorkerPool::new(PoolSettings {
            name: "connection".to_string(),
            min: connection.min_count,
            max: connection.max_count.max(1),
            capacity: connection.max_count,
            keep_alive: connection.keep_alive_time(),
        });

        let shared = Arc::new(Shared {
            listener,
            closed: AtomicBool::new(false),
            dispatcher,
            settings: ConnectionSettings::from(connection),
            connections,
            live: LiveConnections::default(),
        });

        let count = config.server.acceptors.max(1);
        let acceptors = WorkerPool::new(PoolSettings::fixed("acceptor", count));
        for id in 1..=count {
            let mut acceptor = Acceptor::new(id, shared.clone());
            acceptors.submit(move || {
                info!(acceptor = id, "Acceptor started");
                Supervisor::new(format!("acceptor-{id}"), move || acceptor.accept()).run();
                info!(acceptor = id, "Acceptor stopped");
            })?;
        }

        Ok(Self {
            local_addr,
            shared,
            acceptors,
            acceptor_count: count,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connections currently open.
    pub fn live_connections(&self) -> usize {
        self.shared.live.len()
    }

    /// Stops accepting, closes every open connection and waits for all
    /// worker threads to finish.
    pub fn shutdown(self) {
        info!(addr = %self.local_addr, "Shutting down");
        self.shared.closed.store(true, Ordering::SeqCst);
        self.acceptors.shutdown();
        // wakes acceptors blocked on a saturated pool
        self.shared.connections.shutdown();

        if let Err(e) = listener::close(&self.shared.listener) {
            warn!(error = %e, "Failed to shut down listening socket");
        }
        // an acceptor blocked in accept may not notice the shutdown on every
        // platform; a connection attempt per acceptor wakes it up
        for _ in 0..self.acceptor_count {
            let _ = TcpStream::connect(self.local_addr);
        }
        self.acceptors.join();

        self.shared.live.shutdown_all();
        self.shared.connections.join();
        info!("Server stopped");
    }
}
