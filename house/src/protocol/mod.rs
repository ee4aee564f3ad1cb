//! Line-framed text protocol spoken between bidders and houses, and between
//! the two houses.

pub mod codec;
pub mod frame;
pub mod message;

pub use codec::FrameDecoder;
pub use frame::Frame;
pub use message::{BidderRequest, Holder, Inbound, Notice, PeerMessage, NO_HOLDER};
