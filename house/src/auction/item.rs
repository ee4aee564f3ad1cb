//! The item currently under the hammer.

use std::collections::{BTreeSet, VecDeque};

use crate::config::{ItemSpec, DISCOUNT_STEP_TENTHS, MAX_DISCOUNT_ROUNDS};
use crate::protocol::Holder;

/// A bid that arrived while settlement was pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBid {
    pub bidder: String,
    pub amount: u64,
}

/// What settling the current bid window leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Nobody bid; bidding reopens at this lower price.
    Discounted(u64),
    /// The item is done, sold or not.
    Final,
}

/// Auction state of one item.
///
/// Invariant: `temp_bid >= current_bid`. The temporary bid is the highest
/// amount accepted locally and still awaiting confirmation from the peer;
/// when nothing is in flight the two are equal.
#[derive(Debug, Clone)]
pub struct Item {
    id: u32,
    description: String,
    starting_price: u64,
    current_bid: u64,
    holder: Holder,
    temp_bid: u64,
    discount_round: u32,
    interested: BTreeSet<String>,
    peer_interested: u32,
    pending_bids: VecDeque<PendingBid>,
}

impl Item {
    pub fn new(spec: ItemSpec) -> Self {
        Self {
            id: spec.id,
            description: spec.description,
            starting_price: spec.starting_price,
            current_bid: spec.starting_price,
            holder: Holder::Unheld,
            temp_bid: spec.starting_price,
            discount_round: 0,
            interested: BTreeSet::new(),
            peer_interested: 0,
            pending_bids: VecDeque::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn starting_price(&self) -> u64 {
        self.starting_price
    }

    pub fn current_bid(&self) -> u64 {
        self.current_bid
    }

    pub fn holder(&self) -> &Holder {
        &self.holder
    }

    pub fn temp_bid(&self) -> u64 {
        self.temp_bid
    }

    pub fn discount_round(&self) -> u32 {
        self.discount_round
    }

    pub fn interested(&self) -> &BTreeSet<String> {
        &self.interested
    }

    pub fn is_interested(&self, name: &str) -> bool {
        self.interested.contains(name)
    }

    pub fn add_interested(&mut self, name: &str) -> bool {
        self.interested.insert(name.to_string())
    }

    pub fn remove_interested(&mut self, name: &str) -> bool {
        self.pending_bids.retain(|bid| bid.bidder != name);
        self.interested.remove(name)
    }

    pub fn peer_interested(&self) -> u32 {
        self.peer_interested
    }

    pub fn set_peer_interested(&mut self, count: u32) {
        self.peer_interested = count;
    }

    /// Whether either house has a bidder interested in this item.
    pub fn has_any_interest(&self) -> bool {
        !self.interested.is_empty() || self.peer_interested > 0
    }

    /// A confirmation is outstanding.
    pub fn has_unconfirmed_bid(&self) -> bool {
        self.temp_bid != self.current_bid
    }

    /// Raise the provisional bid if `amount` beats it.
    pub fn offer(&mut self, amount: u64) -> bool {
        if amount <= self.temp_bid {
            return false;
        }
        self.temp_bid = amount;
        true
    }

    /// Make `holder` at `amount` the authoritative high bid.
    pub fn commit(&mut self, holder: Holder, amount: u64) {
        if amount > self.temp_bid {
            self.temp_bid = amount;
        }
        self.current_bid = amount;
        self.holder = holder;
    }

    /// Close one bid window: count the round and decide between a
    /// discount and finalizing.
    pub fn settle(&mut self) -> Settlement {
        self.discount_round += 1;
        if self.holder.is_held() || self.discount_round >= MAX_DISCOUNT_ROUNDS {
            return Settlement::Final;
        }
        let tenths_off = u64::from(self.discount_round) * DISCOUNT_STEP_TENTHS;
        let kept_tenths = 10u64.saturating_sub(tenths_off);
        // Never above the starting price, so the cast cannot truncate.
        let price = (u128::from(self.starting_price) * u128::from(kept_tenths) / 10) as u64;
        self.current_bid = price;
        self.temp_bid = price;
        Settlement::Discounted(price)
    }

    pub fn queue_bid(&mut self, bidder: &str, amount: u64) {
        if let Some(existing) = self.pending_bids.iter_mut().find(|b| b.bidder == bidder) {
            existing.amount = existing.amount.max(amount);
            return;
        }
        self.pending_bids.push_back(PendingBid {
            bidder: bidder.to_string(),
            amount,
        });
    }

    pub fn take_pending_bids(&mut self) -> Vec<PendingBid> {
        self.pending_bids.drain(..).collect()
    }

    pub fn pending_bids(&self) -> impl Iterator<Item = &PendingBid> {
        self.pending_bids.iter()
    }
}
