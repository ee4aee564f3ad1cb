//! Timer-driven progression: countdown, item start, interest decision,
//! bid windows and settlement.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{AuctionHouse, TimerPurpose};
use crate::auction::item::{Item, Settlement};
use crate::auction::phase::Phase;
use crate::protocol::{Holder, Notice, PeerMessage};
use crate::traits::{Outbox, TimerScheduler, TimerSlot};

impl<O, T> AuctionHouse<O, T>
where
    O: Outbox,
    T: TimerScheduler,
{
    pub(super) fn schedule_countdown(&mut self, remaining: Duration) {
        if remaining.is_zero() {
            self.begin_auctions();
            return;
        }
        let step = self.settings.countdown_step;
        let step = if step.is_zero() { remaining } else { step.min(remaining) };
        self.arm(
            TimerSlot::Countdown,
            TimerPurpose::Countdown {
                remaining: remaining - step,
            },
            step,
        );
    }

    pub(super) fn countdown_tick(&mut self, remaining: Duration) {
        if remaining.is_zero() {
            self.begin_auctions();
            return;
        }
        let message = format!("Auctions start in {} seconds!", remaining.as_secs());
        info!("{}", message);
        self.broadcast(Notice::info(message));
        self.schedule_countdown(remaining);
    }

    /// Countdown is over: announce readiness and start once the peer agrees.
    fn begin_auctions(&mut self) {
        info!("Auctions are beginning!");
        self.broadcast(Notice::info("Welcome to the auction house!"));
        self.set_phase(Phase::ReadyToBegin);
        self.tell_peer(PeerMessage::ReadyToRun);

        if self.peer_phase == Phase::ReadyToBegin {
            self.begin_next_item();
        } else {
            debug!("Waiting for the peer to become ready");
        }
    }

    pub(super) fn peer_ready_to_run(&mut self) {
        self.peer_phase = Phase::ReadyToBegin;
        if self.phase == Phase::ReadyToBegin {
            self.begin_next_item();
        }
    }

    /// Pop the next item and open its interest window, or end the auction.
    pub(super) fn begin_next_item(&mut self) {
        self.cancel(TimerSlot::Round);

        let Some(spec) = self.queue.pop_front() else {
            self.current = None;
            self.broadcast(Notice::AuctionComplete);
            self.ended = true;
            self.cancel(TimerSlot::Countdown);
            info!("Auctions have ended");
            return;
        };

        let item = Item::new(spec);
        info!(
            "Starting auction for item {} ({}), starting price {}",
            item.id(),
            item.description(),
            item.starting_price()
        );
        self.broadcast(Notice::BidItem {
            item_id: item.id(),
            description: item.description().to_string(),
            starting_price: item.starting_price(),
        });
        self.current = Some(item);
        self.set_phase(Phase::AcceptingInterests);
        self.peer_phase = Phase::AcceptingInterests;
        self.arm(
            TimerSlot::Round,
            TimerPurpose::InterestWindow,
            self.settings.round,
        );
    }

    pub(super) fn interest_window_closed(&mut self) {
        info!("Interest time ended");
        self.set_phase(Phase::WaitingInterestedCount);
        let count = self
            .current
            .as_ref()
            .map_or(0, |item| item.interested().len() as u32);
        self.tell_peer(PeerMessage::InterestedCount { count });
        self.try_open_bidding();
    }

    pub(super) fn peer_interested_count(&mut self, count: u32) {
        let Some(item) = self.current.as_mut() else {
            warn!("Peer reported {} interested bidders with no item active", count);
            return;
        };
        item.set_peer_interested(count);
        self.peer_phase = Phase::WaitingInterestedCount;
        self.try_open_bidding();
    }

    /// Joint interest decision, taken once both houses know both counts.
    fn try_open_bidding(&mut self) {
        if self.phase != Phase::WaitingInterestedCount
            || self.peer_phase != Phase::WaitingInterestedCount
        {
            return;
        }
        let Some(item) = self.current.as_ref() else {
            return;
        };

        if !item.has_any_interest() {
            debug!("Item {} is discarded due to lack of interest", item.id());
            self.begin_next_item();
            return;
        }

        let notice = Notice::StartBidding {
            item_id: item.id(),
            starting_price: item.starting_price(),
        };
        self.peer_phase = Phase::AcceptingBids;
        self.broadcast_interested(notice);
        self.open_bid_window();
    }

    /// (Re)start the bid window. Any previous round timer is replaced.
    pub(super) fn open_bid_window(&mut self) {
        self.set_phase(Phase::AcceptingBids);
        self.arm(TimerSlot::Round, TimerPurpose::BidWindow, self.settings.round);
    }

    pub(super) fn bid_window_closed(&mut self) {
        debug!("Bid timer ended");
        self.set_phase(Phase::ReadyToEnd);
        let (amount, round) = self
            .current
            .as_ref()
            .map_or((None, None), |item| {
                (Some(item.current_bid()), Some(item.discount_round()))
            });
        self.tell_peer(PeerMessage::ReadyToEnd { amount, round });
        self.try_settle();
    }

    pub(super) fn peer_ready_to_end(&mut self, amount: Option<u64>, round: Option<u32>) {
        if let Some(item) = &self.current {
            let stale = amount.is_some_and(|a| a != item.current_bid())
                || round.is_some_and(|r| r != item.discount_round());
            if stale {
                debug!(
                    "Ignoring stale ready_to_end (peer at {:?}/{:?}, local at {}/{})",
                    amount,
                    round,
                    item.current_bid(),
                    item.discount_round()
                );
                return;
            }
        }
        self.peer_phase = Phase::ReadyToEnd;
        self.try_settle();
    }

    /// Settle the bid window once both houses are done and no confirmation
    /// is outstanding.
    fn try_settle(&mut self) {
        if self.phase != Phase::ReadyToEnd || self.peer_phase != Phase::ReadyToEnd {
            return;
        }
        let Some(item) = self.current.as_mut() else {
            return;
        };
        if item.has_unconfirmed_bid() {
            debug!(
                "Settlement deferred: bid of {} awaits confirmation",
                item.temp_bid()
            );
            return;
        }

        match item.settle() {
            Settlement::Discounted(price) => {
                info!(
                    "No bids on item {}, discount round {}: new price {}",
                    item.id(),
                    item.discount_round(),
                    price
                );
                self.broadcast_interested(Notice::NewHighBid {
                    holder: Holder::Unheld,
                    amount: price,
                });
                self.peer_phase = Phase::AcceptingBids;
                self.open_bid_window();
                self.replay_pending_bids();
            }
            Settlement::Final => {
                self.announce_winner();
                self.peer_phase = Phase::AcceptingInterests;
                self.begin_next_item();
            }
        }
    }

    fn announce_winner(&mut self) {
        let Some(item) = self.current.as_ref() else {
            return;
        };
        let (item_id, winner, amount) = (item.id(), item.holder().clone(), item.current_bid());
        self.broadcast_interested(Notice::StopBidding {
            item_id,
            winner: winner.clone(),
            highest_bid: amount,
        });
        match &winner {
            Holder::Bidder(name) => info!("Item {} sold to {} for {}", item_id, name, amount),
            Holder::Unheld => info!("Item {} closed with no winner", item_id),
        }
        if let Err(e) = self.store.record_winner(item_id, amount, &winner) {
            warn!("Failed to record the result of item {}: {}", item_id, e);
        }
    }
}
