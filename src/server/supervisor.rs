//! Long-lived workers built from a repeatable unit of work.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// What a unit of work asks the supervisor to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Run again after the default delay.
    Continue,
    /// Run again after this delay, once; the default applies afterwards.
    ContinueAfter(Duration),
    /// Stop for good.
    Stop,
}

/// Raised by a unit of work to end its supervisor as if it had returned
/// [`Signal::Stop`].
#[derive(Debug, Error, Default, Clone, PartialEq, Eq)]
#[error("work cancelled")]
pub struct Cancelled;

/// Runs a unit of work until it stops or is cancelled.
///
/// Errors and panics raised by a single iteration are logged and swallowed,
/// so one bad iteration never ends the worker.
pub struct Supervisor<W> {
    name: String,
    work: W,
    default_delay: Duration,
}

impl<W> Supervisor<W>
where
    W: FnMut() -> anyhow::Result<Signal>,
{
    pub fn new(name: impl Into<String>, work: W) -> Self {
        Self {
            name: name.into(),
            work,
            default_delay: Duration::ZERO,
        }
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Loops on the calling thread until the work stops. Returns the number
    /// of iterations run.
    pub fn run(mut self) -> u64 {
        let mut iterations = 0u64;
        loop {
            iterations += 1;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.work)()));
            let delay = match outcome {
                Ok(Ok(Signal::Stop)) => break,
                Ok(Ok(Signal::Continue)) => self.default_delay,
                Ok(Ok(Signal::ContinueAfter(delay))) => delay,
                Ok(Err(error)) if error.is::<Cancelled>() => {
                    debug!(worker = self.name.as_str(), "Work cancelled");
                    break;
                }
                Ok(Err(error)) => {
                    warn!(worker = self.name.as_str(), error = %error, "Swallowed fault in worker");
                    self.default_delay
                }
                Err(payload) => {
                    warn!(
                        worker = self.name.as_str(),
                        panic = panic_message(payload.as_ref()),
                        "Swallowed panic in worker"
                    );
                    self.default_delay
                }
            };
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
        debug!(worker = self.name.as_str(), iterations, "Worker stopped");
        iterations
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
