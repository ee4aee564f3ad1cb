//! Mock implementations for testing.
//!
//! This module provides mock implementations of the trait abstractions
//! so the coordinator can be driven without sockets or real time.

pub mod outbox;
pub mod store;
pub mod timers;

pub use outbox::{MockOutbox, SentFrame};
pub use store::{MockStore, RecordedResult};
pub use timers::MockTimers;
