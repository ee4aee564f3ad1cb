pub mod auction;
pub mod client;
pub mod config;
pub mod error;
pub mod net;
pub mod protocol;
pub mod server;
pub mod store;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use auction::{AuctionHouse, Item, PendingBid, Phase, Settlement};
pub use config::{AuctionConfig, HouseSettings, ItemSpec, Role};
pub use error::{HouseError, HouseResult};
pub use net::{ConnectionRegistry, Multiplexer, PeerLink, TokioTimers};
pub use protocol::{BidderRequest, Frame, FrameDecoder, Holder, Inbound, Notice, PeerMessage};
pub use server::{HouseOptions, HouseServer};
pub use store::{JsonFileStore, LogStore};
pub use traits::{
    ConnectionId, Origin, Outbox, Recipient, TimerScheduler, TimerSlot, TimerTicket, WinnerStore,
};
