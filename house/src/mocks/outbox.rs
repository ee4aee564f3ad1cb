//! Mock outbox that records every frame instead of writing to sockets.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{HouseError, HouseResult};
use crate::protocol::Frame;
use crate::traits::{ConnectionId, Outbox, Recipient};

/// A recorded delivery for test assertions. Broadcasts are recorded once per
/// addressed bidder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub to: Recipient,
    pub frame: Frame,
}

#[derive(Debug, Default)]
struct OutboxState {
    sent: Vec<SentFrame>,
    /// Open connections and the name bound to each.
    connections: BTreeMap<ConnectionId, Option<String>>,
    closed: Vec<String>,
    fail_sends: bool,
}

/// Mock outbox for testing coordinator output.
///
/// Clones share state, so a test can keep one handle while the coordinator
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MockOutbox {
    state: Arc<Mutex<OutboxState>>,
}

impl MockOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an unauthenticated connection.
    pub fn open(&self, conn: ConnectionId) {
        self.state.lock().connections.insert(conn, None);
    }

    /// Open a connection that has already completed `connect`.
    pub fn add_bidder(&self, conn: ConnectionId, name: &str) {
        self.state
            .lock()
            .connections
            .insert(conn, Some(name.to_string()));
    }

    /// Drop a connection as if its socket closed.
    pub fn drop_connection(&self, conn: ConnectionId) {
        self.state.lock().connections.remove(&conn);
    }

    /// Set whether writes to bidders should fail. The peer link keeps working.
    pub fn set_fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }

    /// Get all recorded frames.
    pub fn sent(&self) -> Vec<SentFrame> {
        self.state.lock().sent.clone()
    }

    /// Drain all recorded frames.
    pub fn take_sent(&self) -> Vec<SentFrame> {
        std::mem::take(&mut self.state.lock().sent)
    }

    /// Frames delivered to one recipient, in order.
    pub fn sent_to(&self, to: &Recipient) -> Vec<Frame> {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|sent| &sent.to == to)
            .map(|sent| sent.frame.clone())
            .collect()
    }

    pub fn sent_to_bidder(&self, name: &str) -> Vec<Frame> {
        self.sent_to(&Recipient::Bidder(name.to_string()))
    }

    /// Remove and return the frames addressed to the peer, keeping the rest.
    pub fn take_peer_frames(&self) -> Vec<Frame> {
        let mut state = self.state.lock();
        let (peer, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut state.sent)
            .into_iter()
            .partition(|sent| sent.to == Recipient::Peer);
        state.sent = rest;
        peer.into_iter().map(|sent| sent.frame).collect()
    }

    /// Every recorded frame with the given command, regardless of recipient.
    pub fn with_command(&self, command: &str) -> Vec<SentFrame> {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|sent| sent.frame.command() == command)
            .cloned()
            .collect()
    }

    /// Names whose connections were closed through the outbox.
    pub fn closed(&self) -> Vec<String> {
        self.state.lock().closed.clone()
    }

    fn conn_of(state: &OutboxState, name: &str) -> Option<ConnectionId> {
        state
            .connections
            .iter()
            .find(|(_, bound)| bound.as_deref() == Some(name))
            .map(|(conn, _)| *conn)
    }
}

impl Outbox for MockOutbox {
    fn broadcast(&self, frame: &Frame) -> usize {
        let mut state = self.state.lock();
        if state.fail_sends {
            return 0;
        }
        let names: Vec<String> = state.connections.values().flatten().cloned().collect();
        for name in &names {
            state.sent.push(SentFrame {
                to: Recipient::Bidder(name.clone()),
                frame: frame.clone(),
            });
        }
        names.len()
    }

    fn send_to(&self, recipient: &Recipient, frame: &Frame) -> HouseResult<()> {
        let mut state = self.state.lock();
        if state.fail_sends && *recipient != Recipient::Peer {
            return Err(HouseError::Connection("mock send failure".into()));
        }
        let reachable = match recipient {
            Recipient::Peer => true,
            Recipient::Bidder(name) => Self::conn_of(&state, name).is_some(),
            Recipient::Connection(conn) => state.connections.contains_key(conn),
        };
        if !reachable {
            return Err(HouseError::Connection(format!("{recipient:?} is not open")));
        }
        state.sent.push(SentFrame {
            to: recipient.clone(),
            frame: frame.clone(),
        });
        Ok(())
    }

    fn close_connection(&self, name: &str) {
        let mut state = self.state.lock();
        if let Some(conn) = Self::conn_of(&state, name) {
            state.connections.remove(&conn);
        }
        state.closed.push(name.to_string());
    }

    fn is_active(&self, name: &str) -> bool {
        Self::conn_of(&self.state.lock(), name).is_some()
    }

    fn bind_identity(&self, conn: ConnectionId, name: &str) -> HouseResult<()> {
        let mut state = self.state.lock();
        if Self::conn_of(&state, name).is_some() {
            return Err(HouseError::DuplicateIdentity(name.to_string()));
        }
        match state.connections.get_mut(&conn) {
            Some(bound) => {
                *bound = Some(name.to_string());
                Ok(())
            }
            None => Err(HouseError::Connection(format!("{conn} is not open"))),
        }
    }
}
