//! Handlers for bidder requests and peer coordination messages.

use tracing::{debug, info, warn};

use super::AuctionHouse;
use crate::auction::phase::Phase;
use crate::protocol::{BidderRequest, Holder, Notice, PeerMessage, NO_HOLDER};
use crate::traits::{ConnectionId, Origin, Outbox, Recipient, TimerScheduler};

/// Outcome of validating a local bid against the current item.
enum BidCheck {
    Rejected(String),
    Forward,
    Queue,
}

impl<O, T> AuctionHouse<O, T>
where
    O: Outbox,
    T: TimerScheduler,
{
    pub(super) fn handle_bidder(&mut self, origin: Origin, request: BidderRequest) {
        match (origin, request) {
            (Origin::Anonymous(conn), BidderRequest::Connect { username }) => {
                self.handle_connect(conn, &username);
            }
            (Origin::Bidder(name), BidderRequest::Connect { .. }) => {
                self.info(&Recipient::Bidder(name), "You are already connected.");
            }
            (Origin::Anonymous(conn), request) => {
                debug!("Rejecting {:?} from unauthenticated {}", request, conn);
                self.info(&Recipient::Connection(conn), "Please connect first.");
            }
            (Origin::Bidder(name), BidderRequest::Interested { item_id }) => {
                self.handle_interest(&name, item_id);
            }
            (Origin::Bidder(name), BidderRequest::Bid { item_id, amount }) => {
                self.handle_bid(&name, item_id, amount);
            }
            (Origin::Bidder(name), BidderRequest::Quit) => self.handle_quit(&name),
            (Origin::Peer, request) => {
                warn!("Ignoring bidder request from the peer link: {:?}", request);
            }
        }
    }

    fn handle_connect(&mut self, conn: ConnectionId, username: &str) {
        let username = username.trim();
        let reply = Recipient::Connection(conn);
        if username.is_empty() {
            self.info(&reply, "A username is required.");
            return;
        }
        // Reserved on the wire for an item nobody holds.
        if username == NO_HOLDER {
            self.info(&reply, format!("The name '{NO_HOLDER}' is reserved."));
            return;
        }
        if self.outbox.is_active(username) {
            info!("Rejecting duplicate name '{}' on {}", username, conn);
            self.notify(&reply, Notice::DuplicateName);
            return;
        }
        if let Err(e) = self.outbox.bind_identity(conn, username) {
            warn!("Unable to bind '{}' to {}: {}", username, conn, e);
            self.notify(&reply, Notice::DuplicateName);
            return;
        }
        info!("User {} connected", username);
        self.info(
            &Recipient::Bidder(username.to_string()),
            "You are now connected to the server.",
        );
    }

    fn handle_interest(&mut self, name: &str, item_id: u32) {
        let reply = Recipient::Bidder(name.to_string());
        if self.phase != Phase::AcceptingInterests {
            self.info(&reply, "Not accepting interests at the moment.");
            return;
        }
        match self.current.as_mut() {
            Some(item) if item.id() == item_id => {
                item.add_interested(name);
                debug!("Added user {} to the interested bidders of item {}", name, item_id);
                self.info(&reply, "You will now receive updates for this item.");
            }
            _ => self.info(&reply, "Invalid item ID."),
        }
    }

    fn check_bid(&self, name: &str, item_id: u32, amount: u64) -> BidCheck {
        let Some(item) = self.current.as_ref() else {
            return BidCheck::Rejected("No item being auctioned at the moment.".into());
        };
        if item.id() != item_id {
            return BidCheck::Rejected("Invalid item ID.".into());
        }
        if !item.is_interested(name) {
            return BidCheck::Rejected("You have not declared interest for this item.".into());
        }
        if amount <= item.temp_bid() {
            return BidCheck::Rejected(format!(
                "Your bid must be higher than {}.",
                item.temp_bid()
            ));
        }
        match self.phase {
            Phase::AcceptingBids => BidCheck::Forward,
            Phase::ReadyToEnd => BidCheck::Queue,
            _ => BidCheck::Rejected("Not accepting bids at the moment.".into()),
        }
    }

    /// Validate a local bid, then forward it for confirmation or queue it
    /// until settlement resolves.
    pub(super) fn handle_bid(&mut self, name: &str, item_id: u32, amount: u64) {
        match self.check_bid(name, item_id, amount) {
            BidCheck::Rejected(message) => {
                debug!("Rejected bid of {} from {}: {}", amount, name, message);
                self.info(&Recipient::Bidder(name.to_string()), message);
            }
            BidCheck::Forward => {
                if let Some(item) = self.current.as_mut() {
                    item.offer(amount);
                }
                debug!("Forwarding bid of {} from {} for confirmation", amount, name);
                self.tell_peer(PeerMessage::GotBid {
                    bidder: name.to_string(),
                    amount,
                    item_id: Some(item_id),
                });
            }
            BidCheck::Queue => {
                if let Some(item) = self.current.as_mut() {
                    item.queue_bid(name, amount);
                }
                debug!("Saved pending bid from {}, amount = {}", name, amount);
            }
        }
    }

    fn handle_quit(&mut self, name: &str) {
        self.remove_from_current_item(name);
        self.outbox.close_connection(name);
        info!("User {} quit", name);
    }

    pub(super) fn handle_peer(&mut self, message: PeerMessage) {
        debug!("Got {:?} from the peer", message);
        match message {
            PeerMessage::ReadyToRun => self.peer_ready_to_run(),
            PeerMessage::ReadyToEnd { amount, round } => self.peer_ready_to_end(amount, round),
            PeerMessage::InterestedCount { count } => self.peer_interested_count(count),
            PeerMessage::GotBid {
                bidder,
                amount,
                item_id,
            } => self.handle_got_bid(bidder, amount, item_id),
            PeerMessage::BidOk {
                bidder,
                amount,
                item_id,
            } => self.handle_bid_ok(bidder, amount, item_id),
        }
    }

    /// Whether a peer bid message refers to the item under the hammer.
    fn is_current_item(&self, item_id: Option<u32>, command: &str) -> bool {
        match (&self.current, item_id) {
            (None, _) => {
                warn!("Ignoring {} with no item active", command);
                false
            }
            (Some(item), Some(id)) if item.id() != id => {
                warn!(
                    "Ignoring {} for item {} while item {} is active",
                    command,
                    id,
                    item.id()
                );
                false
            }
            _ => true,
        }
    }

    /// The peer asks us to confirm one of its bids. The role decides ties.
    fn handle_got_bid(&mut self, bidder: String, amount: u64, item_id: Option<u32>) {
        if !self.is_current_item(item_id, "got_bid") {
            return;
        }
        let Some(item) = self.current.as_ref() else {
            return;
        };
        if !self.role.accepts_peer_bid(amount, item.temp_bid()) {
            debug!(
                "Rejected peer bid of {} from {} against temp bid {}",
                amount,
                bidder,
                item.temp_bid()
            );
            return;
        }
        let item_id = item.id();
        self.tell_peer(PeerMessage::BidOk {
            bidder: bidder.clone(),
            amount,
            item_id: Some(item_id),
        });
        self.commit_high_bid(bidder, amount);
    }

    /// The peer confirmed one of our bids.
    fn handle_bid_ok(&mut self, bidder: String, amount: u64, item_id: Option<u32>) {
        if !self.is_current_item(item_id, "bid_ok") {
            return;
        }
        let Some(item) = self.current.as_ref() else {
            return;
        };
        if amount < item.current_bid() {
            debug!(
                "Ignoring bid_ok of {} below the current bid {}",
                amount,
                item.current_bid()
            );
            return;
        }
        self.commit_high_bid(bidder, amount);
    }

    fn commit_high_bid(&mut self, bidder: String, amount: u64) {
        let Some(item) = self.current.as_mut() else {
            return;
        };
        let holder = Holder::Bidder(bidder);
        item.commit(holder.clone(), amount);
        info!("New highest bid from user {}, amount = {}", holder, amount);

        self.broadcast_interested(Notice::NewHighBid { holder, amount });
        self.peer_phase = Phase::AcceptingBids;
        self.open_bid_window();
        self.replay_pending_bids();
    }

    /// Re-run every queued bid through normal bid handling.
    pub(super) fn replay_pending_bids(&mut self) {
        let pending = match self.current.as_mut() {
            Some(item) => item.take_pending_bids(),
            None => return,
        };
        let Some(item_id) = self.current.as_ref().map(|item| item.id()) else {
            return;
        };
        for bid in pending {
            debug!("Replaying pending bid from {}, amount = {}", bid.bidder, bid.amount);
            self.handle_bid(&bid.bidder, item_id, bid.amount);
        }
    }
}
