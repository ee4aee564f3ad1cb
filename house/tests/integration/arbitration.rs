//! Peer bid arbitration: tie-breaks, monotonic bids and queued late bids.

use house::protocol::{Frame, PeerMessage};
use house::{Holder, Notice, Origin, Phase, Role, TimerSlot};

use crate::common::TwoHouseHarness;

/// Two houses in the bidding phase, with `alice` on the caller and `bob` on
/// the callee, both interested in item 1 (starting price 100).
fn bidding() -> TwoHouseHarness {
    let mut harness = TwoHouseHarness::new(&[(100, "Vintage Lamp"), (40, "Oak Chair")]);
    harness.connect(Role::Caller, "alice");
    harness.connect(Role::Callee, "bob");
    harness.finish_countdown();
    harness.interest(Role::Caller, "alice", 1);
    harness.interest(Role::Callee, "bob", 1);
    harness.end_round();
    assert_eq!(harness.house(Role::Caller).phase(), Phase::AcceptingBids);
    assert_eq!(harness.house(Role::Callee).phase(), Phase::AcceptingBids);
    harness
}

#[test]
fn test_equal_simultaneous_bids_go_to_caller_side() {
    for amount in [101, 150, 10_000] {
        let mut harness = bidding();
        harness.bid(Role::Caller, "alice", 1, amount);
        harness.bid(Role::Callee, "bob", 1, amount);
        harness.pump();

        let expected = Some((amount, Some("alice".to_string())));
        assert_eq!(harness.high_bid(Role::Caller), expected);
        assert_eq!(harness.high_bid(Role::Callee), expected);
        assert!(harness
            .notices(Role::Callee, "bob")
            .contains(&Notice::NewHighBid {
                holder: Holder::bidder("alice"),
                amount,
            }));
        for role in [Role::Caller, Role::Callee] {
            let item = harness.house(role).current_item().unwrap();
            assert!(!item.has_unconfirmed_bid());
        }
    }
}

#[test]
fn test_higher_concurrent_bid_wins_on_either_side() {
    let mut harness = bidding();
    harness.bid(Role::Caller, "alice", 1, 150);
    harness.bid(Role::Callee, "bob", 1, 200);
    harness.pump();

    let expected = Some((200, Some("bob".to_string())));
    assert_eq!(harness.high_bid(Role::Caller), expected);
    assert_eq!(harness.high_bid(Role::Callee), expected);
}

#[test]
fn test_committed_bid_never_decreases() {
    let mut harness = bidding();
    let mut last = 100;
    let rounds = [(150, 120), (160, 170), (300, 300), (305, 200)];
    for (alice, bob) in rounds {
        harness.bid(Role::Caller, "alice", 1, alice);
        harness.bid(Role::Callee, "bob", 1, bob);
        harness.pump();
        for role in [Role::Caller, Role::Callee] {
            let (current, _) = harness.high_bid(role).unwrap();
            assert!(current >= last, "{role} went from {last} to {current}");
        }
        let (caller, _) = harness.high_bid(Role::Caller).unwrap();
        last = caller;
    }
    assert_eq!(harness.high_bid(Role::Caller), Some((305, Some("alice".into()))));
    assert_eq!(harness.high_bid(Role::Callee), Some((305, Some("alice".into()))));
}

#[test]
fn test_bid_not_above_temporary_bid_is_rejected() {
    let mut harness = bidding();
    harness.bid(Role::Caller, "alice", 1, 150);
    harness.pump();
    harness.side(Role::Caller).outbox.take_sent();

    harness.bid(Role::Caller, "alice", 1, 150);
    assert!(harness.side(Role::Caller).outbox.take_peer_frames().is_empty());
    assert_eq!(
        harness.infos(Role::Caller, "alice"),
        vec!["Your bid must be higher than 150.".to_string()]
    );
}

#[test]
fn test_stale_bid_ok_below_current_is_ignored() {
    let mut harness = bidding();
    harness.bid(Role::Caller, "alice", 1, 200);
    harness.pump();

    let stale = PeerMessage::BidOk {
        bidder: "bob".into(),
        amount: 150,
        item_id: Some(1),
    };
    harness
        .side_mut(Role::Caller)
        .house
        .handle_frame(Origin::Peer, &stale.to_frame());
    assert_eq!(harness.high_bid(Role::Caller), Some((200, Some("alice".into()))));
}

#[test]
fn test_peer_bid_for_other_item_is_ignored() {
    let mut harness = bidding();
    let wrong = PeerMessage::GotBid {
        bidder: "mallory".into(),
        amount: 500,
        item_id: Some(2),
    };
    harness
        .side_mut(Role::Callee)
        .house
        .handle_frame(Origin::Peer, &wrong.to_frame());
    assert!(harness.side(Role::Callee).outbox.take_peer_frames().is_empty());
    assert_eq!(harness.high_bid(Role::Callee), Some((100, None)));
}

#[test]
fn test_got_bid_without_item_id_is_accepted() {
    let mut harness = bidding();
    let frame = Frame::new("got_bid")
        .with("username", "carol")
        .with("amount", 120);
    harness
        .side_mut(Role::Callee)
        .house
        .handle_frame(Origin::Peer, &frame);
    assert_eq!(harness.high_bid(Role::Callee), Some((120, Some("carol".into()))));
    let replies = harness.side(Role::Callee).outbox.take_peer_frames();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].command(), "bid_ok");
}

#[test]
fn test_late_bid_is_queued_and_replayed_on_reopen() {
    let mut harness = bidding();

    // Caller's window closes first; the callee is still accepting bids.
    harness.fire(Role::Caller, TimerSlot::Round);
    assert_eq!(harness.house(Role::Caller).phase(), Phase::ReadyToEnd);

    harness.bid(Role::Caller, "alice", 1, 130);
    let item = harness.house(Role::Caller).current_item().unwrap();
    assert_eq!(item.pending_bids().count(), 1);
    assert!(!item.has_unconfirmed_bid());
    assert!(harness.infos(Role::Caller, "alice").iter().all(|m| !m.contains("Not accepting")));

    // Nobody holds the item, so settling discounts it and reopens bidding.
    harness.end_round();

    let expected = Some((130, Some("alice".to_string())));
    assert_eq!(harness.high_bid(Role::Caller), expected);
    assert_eq!(harness.high_bid(Role::Callee), expected);
    assert_eq!(
        harness.house(Role::Caller).current_item().unwrap().discount_round(),
        1
    );
    assert_eq!(harness.house(Role::Caller).current_item().unwrap().pending_bids().count(), 0);
}

#[test]
fn test_confirmation_in_flight_defers_settlement() {
    let mut harness = bidding();

    // Alice's bid is still waiting for the callee when both windows close.
    harness.bid(Role::Caller, "alice", 1, 150);
    harness.fire(Role::Caller, TimerSlot::Round);
    harness.fire(Role::Callee, TimerSlot::Round);
    assert!(harness
        .house(Role::Caller)
        .current_item()
        .unwrap()
        .has_unconfirmed_bid());

    harness.pump();

    // The commit reopened both houses instead of settling the item.
    for role in [Role::Caller, Role::Callee] {
        let house = harness.house(role);
        assert_eq!(house.phase(), Phase::AcceptingBids);
        assert_eq!(house.current_item().unwrap().discount_round(), 0);
        assert!(harness.side(role).store.results().is_empty());
    }

    harness.end_round();
    for role in [Role::Caller, Role::Callee] {
        let results = harness.side(role).store.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].holder, Holder::bidder("alice"));
        assert_eq!(results[0].amount, 150);
        assert_eq!(harness.house(role).current_item().unwrap().id(), 2);
    }
}
