//! Timer scheduling abstraction.
//!
//! The coordinator never sleeps. It asks a [`TimerScheduler`] to deliver a
//! [`TimerTicket`] after a delay, and the runtime hands the ticket back to
//! `AuctionHouse::on_timer` under the coordinator lock.

use std::time::Duration;

/// Independent timer slots. Arming a slot replaces whatever it held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    /// Pre-auction countdown.
    Countdown,
    /// Interest window or bid window of the current item.
    Round,
}

/// Identifies one arming of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerTicket {
    pub slot: TimerSlot,
    pub id: u64,
}

pub trait TimerScheduler: Send + Sync {
    /// Deliver `ticket` after `delay`, cancelling the slot's previous timer.
    fn arm(&self, ticket: TimerTicket, delay: Duration);

    /// Cancel the slot's pending timer, if any.
    fn cancel(&self, slot: TimerSlot);
}
