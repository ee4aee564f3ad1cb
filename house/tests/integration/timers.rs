//! Countdown, joint readiness and stale timer suppression.

use std::time::Duration;

use house::protocol::PeerMessage;
use house::{Origin, Phase, Role, TimerSlot};

use crate::common::TwoHouseHarness;

#[test]
fn test_countdown_announces_remaining_time() {
    let mut harness = TwoHouseHarness::new(&[(100, "Vintage Lamp")]);
    harness.connect(Role::Caller, "alice");
    assert_eq!(
        harness.side(Role::Caller).timers.delay(TimerSlot::Countdown),
        Some(Duration::from_secs(5))
    );

    harness.fire(Role::Caller, TimerSlot::Countdown);
    assert!(harness
        .infos(Role::Caller, "alice")
        .contains(&"Auctions start in 5 seconds!".to_string()));
    assert_eq!(harness.house(Role::Caller).phase(), Phase::Offline);

    harness.fire(Role::Caller, TimerSlot::Countdown);
    assert!(harness
        .infos(Role::Caller, "alice")
        .contains(&"Welcome to the auction house!".to_string()));
    assert_eq!(harness.house(Role::Caller).phase(), Phase::ReadyToBegin);
    assert!(harness.side(Role::Caller).timers.armed(TimerSlot::Countdown).is_none());
}

#[test]
fn test_first_item_waits_for_peer_readiness() {
    let mut harness = TwoHouseHarness::new(&[(100, "Vintage Lamp")]);
    while harness.fire(Role::Caller, TimerSlot::Countdown) {}
    harness.pump();
    assert_eq!(harness.house(Role::Caller).phase(), Phase::ReadyToBegin);
    assert!(harness.house(Role::Caller).current_item().is_none());

    while harness.fire(Role::Callee, TimerSlot::Countdown) {}
    // The callee already knows the caller is ready.
    assert_eq!(harness.house(Role::Callee).phase(), Phase::AcceptingInterests);
    harness.pump();
    assert_eq!(harness.house(Role::Caller).phase(), Phase::AcceptingInterests);
    assert_eq!(harness.house(Role::Caller).items_remaining(), 0);
}

#[test]
fn test_stale_round_timer_is_ignored() {
    let mut harness = TwoHouseHarness::new(&[(100, "Vintage Lamp")]);
    harness.connect(Role::Caller, "alice");
    harness.finish_countdown();
    harness.interest(Role::Caller, "alice", 1);
    harness.end_round();

    // The bid window fires, but a commit re-arms it before the ticket is
    // handled.
    let stale = harness.side(Role::Caller).timers.take(TimerSlot::Round).unwrap();
    harness.bid(Role::Caller, "alice", 1, 150);
    harness.pump();
    let fresh = harness.side(Role::Caller).timers.armed(TimerSlot::Round).unwrap();
    assert_ne!(stale, fresh);

    harness.side_mut(Role::Caller).house.on_timer(stale);
    assert_eq!(harness.house(Role::Caller).phase(), Phase::AcceptingBids);

    assert!(harness.fire(Role::Caller, TimerSlot::Round));
    assert_eq!(harness.house(Role::Caller).phase(), Phase::ReadyToEnd);
}

#[test]
fn test_stale_ready_to_end_is_ignored() {
    let mut harness = TwoHouseHarness::new(&[(100, "Vintage Lamp")]);
    harness.connect(Role::Caller, "alice");
    harness.finish_countdown();
    harness.interest(Role::Caller, "alice", 1);
    harness.end_round();
    harness.bid(Role::Caller, "alice", 1, 150);
    harness.pump();
    harness.fire(Role::Caller, TimerSlot::Round);

    let stale = PeerMessage::ReadyToEnd {
        amount: Some(100),
        round: Some(0),
    };
    harness
        .side_mut(Role::Caller)
        .house
        .handle_frame(Origin::Peer, &stale.to_frame());
    assert_eq!(harness.house(Role::Caller).peer_phase(), Phase::AcceptingBids);
    assert!(harness.side(Role::Caller).store.results().is_empty());
}

#[test]
fn test_every_window_uses_round_duration() {
    let mut harness = TwoHouseHarness::new(&[(100, "Vintage Lamp")]);
    harness.connect(Role::Caller, "alice");
    harness.finish_countdown();
    harness.interest(Role::Caller, "alice", 1);
    harness.end_round();
    harness.end_round();

    let round = harness.house(Role::Caller).settings().round;
    let windows: Vec<Duration> = harness
        .side(Role::Caller)
        .timers
        .history()
        .into_iter()
        .filter(|(ticket, _)| ticket.slot == TimerSlot::Round)
        .map(|(_, delay)| delay)
        .collect();
    assert_eq!(windows.len(), 3);
    assert!(windows.iter().all(|delay| *delay == round));
}
