//! Tokio-backed [`TimerScheduler`].

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::traits::{TimerScheduler, TimerSlot, TimerTicket};

/// One sleeping task per armed slot. Fired tickets are delivered over an
/// mpsc channel to whoever drives the coordinator.
pub struct TokioTimers {
    runtime: Handle,
    fired: mpsc::UnboundedSender<TimerTicket>,
    pending: Mutex<HashMap<TimerSlot, AbortHandle>>,
    cancel: CancellationToken,
}

impl TokioTimers {
    /// Must be called from within a tokio runtime.
    pub fn new(
        fired: mpsc::UnboundedSender<TimerTicket>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            runtime: Handle::current(),
            fired,
            pending: Mutex::new(HashMap::new()),
            cancel,
        }
    }

    /// Abort every sleeping timer.
    pub fn abort_all(&self) {
        for (_, handle) in self.pending.lock().drain() {
            handle.abort();
        }
    }
}

impl TimerScheduler for TokioTimers {
    fn arm(&self, ticket: TimerTicket, delay: Duration) {
        let fired = self.fired.clone();
        let cancel = self.cancel.clone();
        let task = self.runtime.spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    if fired.send(ticket).is_err() {
                        debug!("Timer {:?} fired after shutdown", ticket);
                    }
                }
                () = cancel.cancelled() => {}
            }
        });
        if let Some(previous) = self.pending.lock().insert(ticket.slot, task.abort_handle()) {
            previous.abort();
        }
    }

    fn cancel(&self, slot: TimerSlot) {
        if let Some(handle) = self.pending.lock().remove(&slot) {
            handle.abort();
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        self.abort_all();
    }
}
