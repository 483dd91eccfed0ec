use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info};

use crate::http::connection::Connection;
use crate::server::Shared;
use crate::server::pool::PoolError;
use crate::server::supervisor::{Signal, Supervisor};

/// Accepts connections on the shared listener and hands each one to the
/// connection pool.
pub struct Acceptor {
    id: usize,
    shared: Arc<Shared>,
}

impl Acceptor {
    pub(crate) fn new(id: usize, shared: Arc<Shared>) -> Self {
        Self { id, shared }
    }

    /// Accepts one connection. A closed listener stops the acceptor; any
    /// other accept failure is left to the supervisor.
    pub fn accept(&mut self) -> Result<Signal> {
        let accepted = self.shared.listener.accept();
        if self.shared.closed.load(Ordering::SeqCst) {
            debug!(acceptor = self.id, "Listener closed");
            return Ok(Signal::Stop);
        }

        let (stream, peer) = accepted?;
        let created_at = Instant::now();
        info!(acceptor = self.id, peer = %peer, "Accepted connection");

        let mut connection = Connection::new(
            stream,
            peer,
            created_at,
            self.shared.dispatcher.clone(),
            self.shared.settings.clone(),
            self.shared.live.clone(),
        )?;

        let submitted = self.shared.connections.submit(move || {
            Supervisor::new(format!("connection {peer}"), move || connection.serve()).run();
        });

        match submitted {
            Ok(()) => Ok(Signal::Continue),
            Err(PoolError::ShutDown(_)) => Ok(Signal::Stop),
            Err(e) => Err(e.into()),
        }
    }
}
