//! Per-house auction state machine.

pub mod coordinator;
pub mod item;
pub mod phase;

pub use coordinator::AuctionHouse;
pub use item::{Item, PendingBid, Settlement};
pub use phase::Phase;
