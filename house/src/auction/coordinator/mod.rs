//! The per-house auction coordinator.
//!
//! [`AuctionHouse`] owns the item queue, the current [`Item`], the local and
//! peer [`Phase`]s and the armed timers. Every event (an inbound frame, a
//! fired timer, a disconnect) is handled by one `&mut self` method call, so
//! the runtime serializes events simply by holding one lock around the house.
//!
//! Outbound effects go through the injected [`Outbox`]; time goes through the
//! injected [`TimerScheduler`]. Both are mocked in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::item::Item;
use super::phase::Phase;
use crate::config::{HouseSettings, ItemSpec, Role};
use crate::protocol::{Frame, Inbound, Notice, PeerMessage};
use crate::traits::{
    Origin, Outbox, Recipient, TimerScheduler, TimerSlot, TimerTicket, WinnerStore,
};

mod handlers;
mod rounds;

/// What an armed timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerPurpose {
    Countdown { remaining: Duration },
    InterestWindow,
    BidWindow,
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    id: u64,
    purpose: TimerPurpose,
}

/// State machine of one house.
pub struct AuctionHouse<O, T>
where
    O: Outbox,
    T: TimerScheduler,
{
    role: Role,
    settings: HouseSettings,
    outbox: O,
    timers: T,
    store: Arc<dyn WinnerStore>,
    queue: VecDeque<ItemSpec>,
    current: Option<Item>,
    phase: Phase,
    /// Last phase reported by the peer house.
    peer_phase: Phase,
    ended: bool,
    armed: HashMap<TimerSlot, ArmedTimer>,
    next_ticket: u64,
}

impl<O, T> AuctionHouse<O, T>
where
    O: Outbox,
    T: TimerScheduler,
{
    pub fn new(
        role: Role,
        settings: HouseSettings,
        items: Vec<ItemSpec>,
        outbox: O,
        timers: T,
        store: Arc<dyn WinnerStore>,
    ) -> Self {
        Self {
            role,
            settings,
            outbox,
            timers,
            store,
            queue: items.into(),
            current: None,
            phase: Phase::Offline,
            peer_phase: Phase::Offline,
            ended: false,
            armed: HashMap::new(),
            next_ticket: 0,
        }
    }

    /// Register the items with the store and start the countdown.
    pub fn start(&mut self) {
        let items: Vec<ItemSpec> = self.queue.iter().cloned().collect();
        if let Err(e) = self.store.initialize(&items) {
            warn!("Unable to register items with the store: {}", e);
        }
        info!(
            "Auction house starting with {} items, {}s rounds",
            items.len(),
            self.settings.round.as_secs_f32()
        );
        self.schedule_countdown(self.settings.countdown);
    }

    /// Dispatch entry point for every decoded frame.
    pub fn handle_frame(&mut self, origin: Origin, frame: &Frame) {
        debug!("Received from {:?}: {}", origin, frame);
        let inbound = match Inbound::try_from(frame) {
            Ok(inbound) => inbound,
            Err(e) => {
                match &origin {
                    Origin::Peer => warn!("Ignoring malformed peer frame '{}': {}", frame, e),
                    _ => self.info(&origin.reply_to(), e.to_string()),
                }
                return;
            }
        };

        match (origin, inbound) {
            (Origin::Peer, Inbound::Peer(message)) => self.handle_peer(message),
            (Origin::Peer, Inbound::Bidder(request)) => {
                warn!("Ignoring bidder request from the peer link: {:?}", request);
            }
            (origin, Inbound::Peer(message)) => {
                warn!("Ignoring peer message from {:?}: {:?}", origin, message);
                self.info(&origin.reply_to(), "Unknown command.");
            }
            (origin, Inbound::Bidder(request)) => self.handle_bidder(origin, request),
        }
    }

    /// Deliver a fired timer. Tickets that were cancelled or replaced are
    /// ignored.
    pub fn on_timer(&mut self, ticket: TimerTicket) {
        let purpose = match self.armed.get(&ticket.slot) {
            Some(armed) if armed.id == ticket.id => armed.purpose,
            _ => {
                debug!("Ignoring stale timer {:?}", ticket);
                return;
            }
        };
        self.armed.remove(&ticket.slot);

        match purpose {
            TimerPurpose::Countdown { remaining } => self.countdown_tick(remaining),
            TimerPurpose::InterestWindow => self.interest_window_closed(),
            TimerPurpose::BidWindow => self.bid_window_closed(),
        }
    }

    /// A bidder's connection went away. No rights survive a disconnect.
    pub fn on_disconnect(&mut self, origin: &Origin) {
        match origin {
            Origin::Bidder(name) => {
                self.remove_from_current_item(name);
                info!("User {} disconnected", name);
            }
            Origin::Peer => warn!("Connection with the peer was dropped"),
            Origin::Anonymous(conn) => debug!("Unauthenticated {} disconnected", conn),
        }
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn peer_phase(&self) -> Phase {
        self.peer_phase
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.current.as_ref()
    }

    pub fn items_remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn settings(&self) -> &HouseSettings {
        &self.settings
    }

    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    // ── internal helpers ─────────────────────────────────────────────

    fn set_phase(&mut self, phase: Phase) {
        if self.phase == phase {
            return;
        }
        self.phase = phase;
        info!("Changing state to {}", phase);
    }

    fn arm(&mut self, slot: TimerSlot, purpose: TimerPurpose, delay: Duration) {
        self.next_ticket += 1;
        let ticket = TimerTicket {
            slot,
            id: self.next_ticket,
        };
        self.armed.insert(
            slot,
            ArmedTimer {
                id: ticket.id,
                purpose,
            },
        );
        self.timers.arm(ticket, delay);
    }

    fn cancel(&mut self, slot: TimerSlot) {
        if self.armed.remove(&slot).is_some() {
            self.timers.cancel(slot);
        }
    }

    fn remove_from_current_item(&mut self, name: &str) {
        if let Some(item) = self.current.as_mut() {
            if item.remove_interested(name) {
                debug!("Removed {} from the interested bidders of item {}", name, item.id());
            }
        }
    }

    fn send(&self, to: &Recipient, frame: &Frame) {
        if let Err(e) = self.outbox.send_to(to, frame) {
            debug!("Send to {:?} failed: {}", to, e);
        }
    }

    fn notify(&self, to: &Recipient, notice: Notice) {
        self.send(to, &notice.to_frame());
    }

    fn info(&self, to: &Recipient, message: impl Into<String>) {
        self.notify(to, Notice::info(message));
    }

    fn tell_peer(&self, message: PeerMessage) {
        self.send(&Recipient::Peer, &message.to_frame());
    }

    fn broadcast(&self, notice: Notice) {
        self.outbox.broadcast(&notice.to_frame());
    }

    fn broadcast_interested(&self, notice: Notice) {
        if let Some(item) = &self.current {
            self.outbox.broadcast_to(item.interested(), &notice.to_frame());
        }
    }
}
