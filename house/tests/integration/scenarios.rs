//! Whole-item scenarios: sale, discard for lack of interest and discounting.

use house::mocks::RecordedResult;
use house::{Holder, Notice, Phase, Role};

use crate::common::TwoHouseHarness;

#[test]
fn test_vintage_lamp_sells_to_single_bidder() {
    let mut harness = TwoHouseHarness::new(&[(100, "Vintage Lamp")]);
    harness.connect(Role::Caller, "alice");
    harness.finish_countdown();

    let notices = harness.notices(Role::Caller, "alice");
    assert!(notices.contains(&Notice::BidItem {
        item_id: 1,
        description: "Vintage Lamp".into(),
        starting_price: 100,
    }));

    harness.interest(Role::Caller, "alice", 1);
    harness.end_round();
    assert_eq!(harness.house(Role::Caller).phase(), Phase::AcceptingBids);
    assert_eq!(harness.house(Role::Callee).phase(), Phase::AcceptingBids);
    assert!(harness
        .notices(Role::Caller, "alice")
        .contains(&Notice::StartBidding {
            item_id: 1,
            starting_price: 100,
        }));

    harness.bid(Role::Caller, "alice", 1, 150);
    harness.pump();
    assert_eq!(harness.high_bid(Role::Caller), Some((150, Some("alice".into()))));
    assert_eq!(harness.high_bid(Role::Callee), Some((150, Some("alice".into()))));
    assert!(harness
        .notices(Role::Caller, "alice")
        .contains(&Notice::NewHighBid {
            holder: Holder::bidder("alice"),
            amount: 150,
        }));

    harness.end_round();

    let notices = harness.notices(Role::Caller, "alice");
    assert!(notices.contains(&Notice::StopBidding {
        item_id: 1,
        winner: Holder::bidder("alice"),
        highest_bid: 150,
    }));
    assert_eq!(notices.last(), Some(&Notice::AuctionComplete));

    let expected = vec![RecordedResult {
        item_id: 1,
        amount: 150,
        holder: Holder::bidder("alice"),
    }];
    assert_eq!(harness.side(Role::Caller).store.results(), expected);
    assert_eq!(harness.side(Role::Callee).store.results(), expected);
    assert!(harness.house(Role::Caller).has_ended());
    assert!(harness.house(Role::Callee).has_ended());
}

#[test]
fn test_item_without_interest_is_discarded() {
    let mut harness = TwoHouseHarness::new(&[(100, "Vintage Lamp"), (40, "Oak Chair")]);
    harness.connect(Role::Caller, "alice");
    harness.connect(Role::Callee, "bob");
    harness.finish_countdown();

    harness.end_round();

    for role in [Role::Caller, Role::Callee] {
        let house = harness.house(role);
        assert_eq!(house.phase(), Phase::AcceptingInterests);
        assert_eq!(house.current_item().map(|item| item.id()), Some(2));
        assert!(harness.side(role).outbox.with_command("start_bidding").is_empty());
        assert!(harness.side(role).outbox.with_command("stop_bidding").is_empty());
        assert!(harness.side(role).store.results().is_empty());
    }
    assert!(harness
        .notices(Role::Callee, "bob")
        .contains(&Notice::BidItem {
            item_id: 2,
            description: "Oak Chair".into(),
            starting_price: 40,
        }));
}

#[test]
fn test_interest_on_peer_only_still_opens_bidding() {
    let mut harness = TwoHouseHarness::new(&[(100, "Vintage Lamp")]);
    harness.connect(Role::Callee, "bob");
    harness.finish_countdown();
    harness.interest(Role::Callee, "bob", 1);
    harness.end_round();

    assert_eq!(harness.house(Role::Caller).phase(), Phase::AcceptingBids);
    let item = harness.house(Role::Caller).current_item().unwrap();
    assert_eq!(item.peer_interested(), 1);
    assert!(item.interested().is_empty());
}

#[test]
fn test_unsold_item_is_discounted_four_times() {
    let mut harness = TwoHouseHarness::new(&[(100, "Vintage Lamp")]);
    harness.connect(Role::Caller, "alice");
    harness.finish_countdown();
    harness.interest(Role::Caller, "alice", 1);
    harness.end_round();

    let mut prices = Vec::new();
    while !harness.house(Role::Caller).has_ended() {
        if let Some(item) = harness.house(Role::Caller).current_item() {
            assert_eq!(harness.house(Role::Callee).current_item().unwrap().current_bid(), item.current_bid());
        }
        harness.end_round();
        if let Some(item) = harness.house(Role::Caller).current_item() {
            prices.push(item.current_bid());
        }
        assert!(prices.len() <= 4, "item discounted more than four times");
    }
    assert_eq!(prices, vec![90, 80, 70, 60]);

    let discounts: Vec<Notice> = harness
        .notices(Role::Caller, "alice")
        .into_iter()
        .filter(|notice| matches!(notice, Notice::NewHighBid { holder: Holder::Unheld, .. }))
        .collect();
    assert_eq!(discounts.len(), 4);
    assert!(harness
        .notices(Role::Caller, "alice")
        .contains(&Notice::StopBidding {
            item_id: 1,
            winner: Holder::Unheld,
            highest_bid: 60,
        }));
    assert_eq!(
        harness.side(Role::Callee).store.results(),
        vec![RecordedResult {
            item_id: 1,
            amount: 60,
            holder: Holder::Unheld,
        }]
    );
}

#[test]
fn test_bid_after_discount_sells_at_discounted_floor() {
    let mut harness = TwoHouseHarness::new(&[(100, "Vintage Lamp")]);
    harness.connect(Role::Callee, "bob");
    harness.finish_countdown();
    harness.interest(Role::Callee, "bob", 1);
    harness.end_round();
    harness.end_round();
    assert_eq!(harness.high_bid(Role::Callee), Some((90, None)));

    harness.bid(Role::Callee, "bob", 1, 95);
    harness.pump();
    assert_eq!(harness.high_bid(Role::Caller), Some((95, Some("bob".into()))));

    harness.end_round();
    assert_eq!(
        harness.side(Role::Caller).store.results()[0].holder,
        Holder::bidder("bob")
    );
    assert_eq!(harness.side(Role::Caller).store.results()[0].amount, 95);
}

#[test]
fn test_store_failure_does_not_stop_auction() {
    let mut harness = TwoHouseHarness::new(&[(100, "Vintage Lamp"), (40, "Oak Chair")]);
    harness.side(Role::Caller).store.set_fail(true);
    harness.connect(Role::Caller, "alice");
    harness.finish_countdown();
    harness.interest(Role::Caller, "alice", 1);
    harness.end_round();
    harness.bid(Role::Caller, "alice", 1, 150);
    harness.pump();
    harness.end_round();

    assert_eq!(
        harness.house(Role::Caller).current_item().map(|item| item.id()),
        Some(2)
    );
    assert!(harness.side(Role::Caller).store.results().is_empty());
    assert_eq!(harness.side(Role::Callee).store.results().len(), 1);
}

#[test]
fn test_huge_starting_price_is_discounted_without_overflow() {
    let start = u64::MAX / 5;
    let mut harness = TwoHouseHarness::new(&[(start, "Crown Jewels")]);
    harness.connect(Role::Caller, "alice");
    harness.finish_countdown();
    harness.interest(Role::Caller, "alice", 1);
    harness.end_round();

    harness.end_round();
    let discounted = (u128::from(start) * 9 / 10) as u64;
    assert_eq!(harness.high_bid(Role::Caller), Some((discounted, None)));
    assert_eq!(harness.high_bid(Role::Callee), Some((discounted, None)));
}
