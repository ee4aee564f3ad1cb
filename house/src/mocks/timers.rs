//! Mock timer scheduler with manually fired tickets.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::traits::{TimerScheduler, TimerSlot, TimerTicket};

#[derive(Debug, Default)]
struct TimersState {
    armed: HashMap<TimerSlot, (TimerTicket, Duration)>,
    history: Vec<(TimerTicket, Duration)>,
}

/// Records armed timers; tests decide when they fire by passing the
/// ticket to `AuctionHouse::on_timer`.
#[derive(Debug, Clone, Default)]
pub struct MockTimers {
    state: Arc<Mutex<TimersState>>,
}

impl MockTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket currently armed in `slot`.
    pub fn armed(&self, slot: TimerSlot) -> Option<TimerTicket> {
        self.state.lock().armed.get(&slot).map(|(ticket, _)| *ticket)
    }

    /// Delay the current timer of `slot` was armed with.
    pub fn delay(&self, slot: TimerSlot) -> Option<Duration> {
        self.state.lock().armed.get(&slot).map(|(_, delay)| *delay)
    }

    /// Remove the armed ticket of `slot`, as if it fired.
    pub fn take(&self, slot: TimerSlot) -> Option<TimerTicket> {
        self.state.lock().armed.remove(&slot).map(|(ticket, _)| ticket)
    }

    /// Every ticket ever armed, in order.
    pub fn history(&self) -> Vec<(TimerTicket, Duration)> {
        self.state.lock().history.clone()
    }
}

impl TimerScheduler for MockTimers {
    fn arm(&self, ticket: TimerTicket, delay: Duration) {
        let mut state = self.state.lock();
        state.armed.insert(ticket.slot, (ticket, delay));
        state.history.push((ticket, delay));
    }

    fn cancel(&self, slot: TimerSlot) {
        self.state.lock().armed.remove(&slot);
    }
}
