//! Outbound message transport abstraction.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::HouseResult;
use crate::protocol::Frame;

/// Handle of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Reserved for the peer link.
    pub const PEER: ConnectionId = ConnectionId(0);

    pub fn is_peer(self) -> bool {
        self == Self::PEER
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_peer() {
            f.write_str("peer")
        } else {
            write!(f, "conn-{}", self.0)
        }
    }
}

/// Destination of a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// The other house.
    Peer,
    /// An authenticated bidder, by display name.
    Bidder(String),
    /// A connection that has not completed `connect`.
    Connection(ConnectionId),
}

/// Where an inbound frame came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    Peer,
    Bidder(String),
    Anonymous(ConnectionId),
}

impl Origin {
    /// Address replies to this origin.
    pub fn reply_to(&self) -> Recipient {
        match self {
            Origin::Peer => Recipient::Peer,
            Origin::Bidder(name) => Recipient::Bidder(name.clone()),
            Origin::Anonymous(conn) => Recipient::Connection(*conn),
        }
    }
}

/// Abstraction over the set of connections a house can write to.
///
/// All operations are non-blocking: frames are queued for delivery and a
/// connection that fails to accept them is closed by the implementation.
pub trait Outbox: Send + Sync {
    /// Send to every authenticated bidder. Returns how many were addressed.
    fn broadcast(&self, frame: &Frame) -> usize;

    /// Send a frame to one recipient.
    fn send_to(&self, recipient: &Recipient, frame: &Frame) -> HouseResult<()>;

    /// Close a bidder's connection and forget its identity.
    fn close_connection(&self, name: &str);

    /// Whether a bidder with this display name is connected.
    fn is_active(&self, name: &str) -> bool;

    /// Attach a display name to an unauthenticated connection.
    fn bind_identity(&self, conn: ConnectionId, name: &str) -> HouseResult<()>;

    /// Send to a subset of bidders. Returns how many sends were queued.
    fn broadcast_to(&self, names: &BTreeSet<String>, frame: &Frame) -> usize {
        names
            .iter()
            .filter(|name| {
                self.send_to(&Recipient::Bidder((*name).clone()), frame)
                    .is_ok()
            })
            .count()
    }
}
