//! Two-house test harness for integration testing.
//!
//! Both coordinators run against mocks. Peer frames are carried between them
//! by [`TwoHouseHarness::pump`], encoded and decoded through the wire codec on
//! the way. Timers fire only when a test fires them.

use std::sync::Arc;
use std::time::Duration;

use house::mocks::{MockOutbox, MockStore, MockTimers};
use house::protocol::{BidderRequest, FrameDecoder, Notice};
use house::{AuctionHouse, ConnectionId, HouseSettings, ItemSpec, Origin, Phase, Role, TimerSlot};

pub type TestHouse = AuctionHouse<MockOutbox, MockTimers>;

/// One side of the harness with handles to its mocks.
pub struct Side {
    pub house: TestHouse,
    pub outbox: MockOutbox,
    pub timers: MockTimers,
    pub store: MockStore,
    next_conn: u64,
}

/// Simulates a caller and a callee linked by one in-order peer connection.
pub struct TwoHouseHarness {
    caller: Side,
    callee: Side,
}

pub fn items(list: &[(u64, &str)]) -> Vec<ItemSpec> {
    list.iter()
        .enumerate()
        .map(|(i, (price, description))| ItemSpec {
            id: i as u32 + 1,
            starting_price: *price,
            description: description.to_string(),
        })
        .collect()
}

fn side(role: Role, items: Vec<ItemSpec>) -> Side {
    let outbox = MockOutbox::new();
    let timers = MockTimers::new();
    let store = MockStore::new();
    let house = AuctionHouse::new(
        role,
        HouseSettings::with_round(Duration::from_secs(5)),
        items,
        outbox.clone(),
        timers.clone(),
        Arc::new(store.clone()),
    );
    Side {
        house,
        outbox,
        timers,
        store,
        next_conn: 0,
    }
}

#[allow(dead_code)]
impl TwoHouseHarness {
    /// Create both houses with the same item list and start their countdowns.
    pub fn new(list: &[(u64, &str)]) -> Self {
        let items = items(list);
        let mut harness = Self {
            caller: side(Role::Caller, items.clone()),
            callee: side(Role::Callee, items),
        };
        harness.caller.house.start();
        harness.callee.house.start();
        harness
    }

    pub fn side(&self, role: Role) -> &Side {
        match role {
            Role::Caller => &self.caller,
            Role::Callee => &self.callee,
        }
    }

    pub fn side_mut(&mut self, role: Role) -> &mut Side {
        match role {
            Role::Caller => &mut self.caller,
            Role::Callee => &mut self.callee,
        }
    }

    pub fn house(&self, role: Role) -> &TestHouse {
        &self.side(role).house
    }

    /// Carry peer frames in both directions until the link is quiet.
    ///
    /// Each pass snapshots both outgoing queues before delivering anything,
    /// so frames sent "at the same time" cross on the wire.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        for _ in 0..1000 {
            let to_callee = self.caller.outbox.take_peer_frames();
            let to_caller = self.callee.outbox.take_peer_frames();
            if to_callee.is_empty() && to_caller.is_empty() {
                return delivered;
            }
            delivered += deliver(&mut self.callee, &to_callee);
            delivered += deliver(&mut self.caller, &to_caller);
        }
        panic!("peer link never went quiet");
    }

    /// Fire the armed timer of `slot`, if any. Returns whether one fired.
    pub fn fire(&mut self, role: Role, slot: TimerSlot) -> bool {
        let side = self.side_mut(role);
        match side.timers.take(slot) {
            Some(ticket) => {
                side.house.on_timer(ticket);
                true
            }
            None => false,
        }
    }

    /// Fire the round timer on both houses, caller first, then pump.
    pub fn end_round(&mut self) {
        self.fire(Role::Caller, TimerSlot::Round);
        self.fire(Role::Callee, TimerSlot::Round);
        self.pump();
    }

    /// Run both countdowns to zero and let the first item start.
    pub fn finish_countdown(&mut self) {
        for role in [Role::Caller, Role::Callee] {
            while self.fire(role, TimerSlot::Countdown) {}
        }
        self.pump();
        assert_eq!(self.house(Role::Caller).phase(), Phase::AcceptingInterests);
        assert_eq!(self.house(Role::Callee).phase(), Phase::AcceptingInterests);
    }

    /// Open a connection and complete `connect` as `name`.
    pub fn connect(&mut self, role: Role, name: &str) -> ConnectionId {
        let conn = self.open(role);
        self.send_anonymous(
            role,
            conn,
            BidderRequest::Connect {
                username: name.to_string(),
            },
        );
        conn
    }

    /// Open an unauthenticated connection.
    pub fn open(&mut self, role: Role) -> ConnectionId {
        let side = self.side_mut(role);
        side.next_conn += 1;
        let conn = ConnectionId(side.next_conn);
        side.outbox.open(conn);
        conn
    }

    pub fn send_anonymous(&mut self, role: Role, conn: ConnectionId, request: BidderRequest) {
        let frame = request.to_frame("");
        self.side_mut(role)
            .house
            .handle_frame(Origin::Anonymous(conn), &frame);
    }

    pub fn send(&mut self, role: Role, name: &str, request: BidderRequest) {
        let frame = request.to_frame(name);
        self.side_mut(role)
            .house
            .handle_frame(Origin::Bidder(name.to_string()), &frame);
    }

    pub fn interest(&mut self, role: Role, name: &str, item_id: u32) {
        self.send(role, name, BidderRequest::Interested { item_id });
    }

    pub fn bid(&mut self, role: Role, name: &str, item_id: u32, amount: u64) {
        self.send(role, name, BidderRequest::Bid { item_id, amount });
    }

    /// Every notice delivered to `name`, decoded.
    pub fn notices(&self, role: Role, name: &str) -> Vec<Notice> {
        self.side(role)
            .outbox
            .sent_to_bidder(name)
            .iter()
            .map(|frame| Notice::try_from(frame).expect("house sent an undecodable notice"))
            .collect()
    }

    /// Info messages delivered to `name`.
    pub fn infos(&self, role: Role, name: &str) -> Vec<String> {
        self.notices(role, name)
            .into_iter()
            .filter_map(|notice| match notice {
                Notice::Info(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Committed (current bid, holder name) of the active item on a house.
    pub fn high_bid(&self, role: Role) -> Option<(u64, Option<String>)> {
        self.house(role)
            .current_item()
            .map(|item| (item.current_bid(), item.holder().name().map(str::to_string)))
    }
}

fn deliver(side: &mut Side, frames: &[house::Frame]) -> usize {
    let mut decoder = FrameDecoder::new();
    let mut count = 0;
    for frame in frames {
        for decoded in decoder.decode(frame.encode().as_bytes()) {
            side.house.handle_frame(Origin::Peer, &decoded);
            count += 1;
        }
    }
    count
}
