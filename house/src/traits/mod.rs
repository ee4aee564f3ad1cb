//! Trait abstractions for dependency injection and testability.
//!
//! The coordinator is written against these seams so it can be driven by the
//! real network runtime or by the test mocks.

pub mod store;
pub mod timer;
pub mod transport;

pub use store::WinnerStore;
pub use timer::{TimerScheduler, TimerSlot, TimerTicket};
pub use transport::{ConnectionId, Origin, Outbox, Recipient};
