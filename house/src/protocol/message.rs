//! Typed protocol messages and their frame representation.

use std::str::FromStr;

use super::frame::Frame;
use crate::error::{HouseError, HouseResult};

/// Command names.
pub mod commands {
    // bidder -> house
    pub const CONNECT: &str = "connect";
    pub const I_AM_INTERESTED: &str = "i_am_interested";
    pub const MY_BID: &str = "my_bid";
    pub const QUIT: &str = "quit";

    // house -> bidder
    pub const BID_ITEM: &str = "bid_item";
    pub const START_BIDDING: &str = "start_bidding";
    pub const NEW_HIGH_BID: &str = "new_high_bid";
    pub const STOP_BIDDING: &str = "stop_bidding";
    pub const DUPLICATE_NAME: &str = "duplicate_name";
    pub const AUCTION_COMPLETE: &str = "auction_complete";
    pub const INFO: &str = "info";

    // house <-> house
    pub const READY_TO_RUN: &str = "ready_to_run";
    pub const READY_TO_END: &str = "ready_to_end";
    pub const GOT_BID: &str = "got_bid";
    pub const BID_OK: &str = "bid_ok";
    pub const INTERESTED_COUNT: &str = "interested_count";
}

/// Property names.
pub mod props {
    pub const USERNAME: &str = "username";
    pub const ITEM_ID: &str = "item_id";
    pub const DESCRIPTION: &str = "description";
    pub const STARTING_PRICE: &str = "starting_price";
    pub const WINNER: &str = "winner";
    pub const HIGHEST_BID: &str = "highest_bid";
    pub const MESSAGE: &str = "message";
    pub const AMOUNT: &str = "amount";
    pub const ROUND: &str = "round";
}

/// Wire spelling of [`Holder::Unheld`].
pub const NO_HOLDER: &str = "no_holder";

/// Who currently holds the high bid on an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Holder {
    #[default]
    Unheld,
    Bidder(String),
}

impl Holder {
    pub fn bidder(name: impl Into<String>) -> Self {
        Holder::Bidder(name.into())
    }

    pub fn from_wire(name: &str) -> Self {
        if name == NO_HOLDER {
            Holder::Unheld
        } else {
            Holder::Bidder(name.to_string())
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            Holder::Unheld => NO_HOLDER,
            Holder::Bidder(name) => name,
        }
    }

    pub fn is_held(&self) -> bool {
        matches!(self, Holder::Bidder(_))
    }

    /// The holder's display name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Holder::Unheld => None,
            Holder::Bidder(name) => Some(name),
        }
    }
}

impl std::fmt::Display for Holder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Requests a bidder sends to its house.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidderRequest {
    Connect { username: String },
    Interested { item_id: u32 },
    Bid { item_id: u32, amount: u64 },
    Quit,
}

/// Notices a house sends to its bidders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    BidItem {
        item_id: u32,
        description: String,
        starting_price: u64,
    },
    StartBidding {
        item_id: u32,
        starting_price: u64,
    },
    NewHighBid {
        holder: Holder,
        amount: u64,
    },
    StopBidding {
        item_id: u32,
        winner: Holder,
        highest_bid: u64,
    },
    DuplicateName,
    AuctionComplete,
    Info(String),
}

/// Coordination messages exchanged over the peer link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    ReadyToRun,
    /// The sender's bid window closed. `amount`/`round` are the sender's
    /// committed bid and discount round at that moment, absent from older
    /// peers.
    ReadyToEnd {
        amount: Option<u64>,
        round: Option<u32>,
    },
    GotBid {
        bidder: String,
        amount: u64,
        item_id: Option<u32>,
    },
    BidOk {
        bidder: String,
        amount: u64,
        item_id: Option<u32>,
    },
    InterestedCount {
        count: u32,
    },
}

/// Any frame a house can receive, classified by its command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Bidder(BidderRequest),
    Peer(PeerMessage),
}

impl BidderRequest {
    /// Frame as sent by the bidder client, which names itself in every request.
    pub fn to_frame(&self, username: &str) -> Frame {
        match self {
            BidderRequest::Connect { username } => {
                Frame::new(commands::CONNECT).with(props::USERNAME, username)
            }
            BidderRequest::Interested { item_id } => Frame::new(commands::I_AM_INTERESTED)
                .with(props::USERNAME, username)
                .with(props::ITEM_ID, item_id),
            BidderRequest::Bid { item_id, amount } => Frame::new(commands::MY_BID)
                .with(props::USERNAME, username)
                .with(props::AMOUNT, amount)
                .with(props::ITEM_ID, item_id),
            BidderRequest::Quit => Frame::new(commands::QUIT).with(props::USERNAME, username),
        }
    }
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice::Info(message.into())
    }

    pub fn to_frame(&self) -> Frame {
        match self {
            Notice::BidItem {
                item_id,
                description,
                starting_price,
            } => Frame::new(commands::BID_ITEM)
                .with(props::ITEM_ID, item_id)
                .with(props::DESCRIPTION, description)
                .with(props::STARTING_PRICE, starting_price),
            Notice::StartBidding {
                item_id,
                starting_price,
            } => Frame::new(commands::START_BIDDING)
                .with(props::STARTING_PRICE, starting_price)
                .with(props::ITEM_ID, item_id),
            Notice::NewHighBid { holder, amount } => Frame::new(commands::NEW_HIGH_BID)
                .with(props::USERNAME, holder)
                .with(props::AMOUNT, amount),
            Notice::StopBidding {
                item_id,
                winner,
                highest_bid,
            } => Frame::new(commands::STOP_BIDDING)
                .with(props::ITEM_ID, item_id)
                .with(props::WINNER, winner)
                .with(props::HIGHEST_BID, highest_bid),
            Notice::DuplicateName => Frame::new(commands::DUPLICATE_NAME),
            Notice::AuctionComplete => Frame::new(commands::AUCTION_COMPLETE),
            Notice::Info(message) => Frame::new(commands::INFO).with(props::MESSAGE, message),
        }
    }
}

impl PeerMessage {
    pub fn to_frame(&self) -> Frame {
        match self {
            PeerMessage::ReadyToRun => Frame::new(commands::READY_TO_RUN),
            PeerMessage::ReadyToEnd { amount, round } => {
                let mut frame = Frame::new(commands::READY_TO_END);
                if let Some(amount) = amount {
                    frame.set(props::AMOUNT, amount);
                }
                if let Some(round) = round {
                    frame.set(props::ROUND, round);
                }
                frame
            }
            PeerMessage::GotBid {
                bidder,
                amount,
                item_id,
            } => bid_frame(commands::GOT_BID, bidder, *amount, *item_id),
            PeerMessage::BidOk {
                bidder,
                amount,
                item_id,
            } => bid_frame(commands::BID_OK, bidder, *amount, *item_id),
            PeerMessage::InterestedCount { count } => {
                Frame::new(commands::INTERESTED_COUNT).with(props::AMOUNT, count)
            }
        }
    }
}

fn bid_frame(command: &str, bidder: &str, amount: u64, item_id: Option<u32>) -> Frame {
    let mut frame = Frame::new(command)
        .with(props::USERNAME, bidder)
        .with(props::AMOUNT, amount);
    if let Some(item_id) = item_id {
        frame.set(props::ITEM_ID, item_id);
    }
    frame
}

impl TryFrom<&Frame> for Inbound {
    type Error = HouseError;

    fn try_from(frame: &Frame) -> HouseResult<Self> {
        let inbound = match frame.command() {
            commands::CONNECT => Inbound::Bidder(BidderRequest::Connect {
                username: required(frame, props::USERNAME)?.to_string(),
            }),
            commands::I_AM_INTERESTED => Inbound::Bidder(BidderRequest::Interested {
                item_id: number(frame, props::ITEM_ID)?,
            }),
            commands::MY_BID => Inbound::Bidder(BidderRequest::Bid {
                item_id: number(frame, props::ITEM_ID)?,
                amount: number(frame, props::AMOUNT)?,
            }),
            commands::QUIT => Inbound::Bidder(BidderRequest::Quit),
            commands::READY_TO_RUN => Inbound::Peer(PeerMessage::ReadyToRun),
            commands::READY_TO_END => Inbound::Peer(PeerMessage::ReadyToEnd {
                amount: optional_number(frame, props::AMOUNT)?,
                round: optional_number(frame, props::ROUND)?,
            }),
            commands::GOT_BID => Inbound::Peer(PeerMessage::GotBid {
                bidder: required(frame, props::USERNAME)?.to_string(),
                amount: number(frame, props::AMOUNT)?,
                item_id: optional_number(frame, props::ITEM_ID)?,
            }),
            commands::BID_OK => Inbound::Peer(PeerMessage::BidOk {
                bidder: required(frame, props::USERNAME)?.to_string(),
                amount: number(frame, props::AMOUNT)?,
                item_id: optional_number(frame, props::ITEM_ID)?,
            }),
            commands::INTERESTED_COUNT => Inbound::Peer(PeerMessage::InterestedCount {
                count: number(frame, props::AMOUNT)?,
            }),
            other => {
                return Err(HouseError::InvalidRequest(format!(
                    "unknown command '{other}'"
                )))
            }
        };
        Ok(inbound)
    }
}

impl TryFrom<&Frame> for Notice {
    type Error = HouseError;

    fn try_from(frame: &Frame) -> HouseResult<Self> {
        let notice = match frame.command() {
            commands::BID_ITEM => Notice::BidItem {
                item_id: number(frame, props::ITEM_ID)?,
                description: required(frame, props::DESCRIPTION)?.to_string(),
                starting_price: number(frame, props::STARTING_PRICE)?,
            },
            commands::START_BIDDING => Notice::StartBidding {
                item_id: number(frame, props::ITEM_ID)?,
                starting_price: number(frame, props::STARTING_PRICE)?,
            },
            commands::NEW_HIGH_BID => Notice::NewHighBid {
                holder: Holder::from_wire(required(frame, props::USERNAME)?),
                amount: number(frame, props::AMOUNT)?,
            },
            commands::STOP_BIDDING => Notice::StopBidding {
                item_id: number(frame, props::ITEM_ID)?,
                winner: Holder::from_wire(required(frame, props::WINNER)?),
                highest_bid: number(frame, props::HIGHEST_BID)?,
            },
            commands::DUPLICATE_NAME => Notice::DuplicateName,
            commands::AUCTION_COMPLETE => Notice::AuctionComplete,
            commands::INFO => Notice::Info(frame.get(props::MESSAGE).unwrap_or_default().to_string()),
            other => {
                return Err(HouseError::InvalidRequest(format!(
                    "unknown notice '{other}'"
                )))
            }
        };
        Ok(notice)
    }
}

fn required<'a>(frame: &'a Frame, key: &str) -> HouseResult<&'a str> {
    frame.get(key).ok_or_else(|| {
        HouseError::InvalidRequest(format!("'{}' is missing '{key}'", frame.command()))
    })
}

fn number<T: FromStr>(frame: &Frame, key: &str) -> HouseResult<T> {
    let raw = required(frame, key)?;
    raw.trim().parse().map_err(|_| {
        HouseError::InvalidRequest(format!(
            "'{}' has a non-numeric '{key}': '{raw}'",
            frame.command()
        ))
    })
}

fn optional_number<T: FromStr>(frame: &Frame, key: &str) -> HouseResult<Option<T>> {
    match frame.get(key) {
        Some(_) => number(frame, key).map(Some),
        None => Ok(None),
    }
}
