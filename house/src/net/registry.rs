//! Connection table shared by the event loop and the coordinator.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{HouseError, HouseResult};
use crate::protocol::Frame;
use crate::traits::{ConnectionId, Origin, Outbox, Recipient};

/// Write side of one connection as seen by the registry.
#[derive(Debug)]
struct ConnectionEntry {
    writer: mpsc::UnboundedSender<String>,
    /// Cancelled when the connection should be torn down.
    closer: CancellationToken,
    identity: Option<String>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    names: HashMap<String, ConnectionId>,
}

/// Every open connection of one house, keyed by [`ConnectionId`], plus the
/// index of authenticated display names.
///
/// Cloning is cheap; all clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly opened connection. It starts unauthenticated.
    pub fn register(
        &self,
        conn: ConnectionId,
        writer: mpsc::UnboundedSender<String>,
        closer: CancellationToken,
    ) {
        self.inner.lock().connections.insert(
            conn,
            ConnectionEntry {
                writer,
                closer,
                identity: None,
            },
        );
    }

    /// Forget a connection. Returns who it belonged to.
    pub fn unregister(&self, conn: ConnectionId) -> Origin {
        let mut inner = self.inner.lock();
        let identity = inner
            .connections
            .remove(&conn)
            .and_then(|entry| {
                entry.closer.cancel();
                entry.identity
            });
        if let Some(name) = &identity {
            inner.names.remove(name);
        }
        Self::classify(conn, identity)
    }

    /// Who frames arriving on `conn` come from, or `None` once it was closed.
    pub fn origin_of(&self, conn: ConnectionId) -> Option<Origin> {
        let identity = self
            .inner
            .lock()
            .connections
            .get(&conn)
            .map(|entry| entry.identity.clone())?;
        Some(Self::classify(conn, identity))
    }

    fn classify(conn: ConnectionId, identity: Option<String>) -> Origin {
        match identity {
            _ if conn.is_peer() => Origin::Peer,
            Some(name) => Origin::Bidder(name),
            None => Origin::Anonymous(conn),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tear down every connection, the peer link included.
    pub fn close_all(&self) {
        let mut inner = self.inner.lock();
        for (conn, entry) in inner.connections.drain() {
            debug!("Closing {}", conn);
            entry.closer.cancel();
        }
        inner.names.clear();
    }

    fn write(entry: &ConnectionEntry, conn: ConnectionId, frame: &Frame) -> HouseResult<()> {
        entry
            .writer
            .send(frame.encode())
            .map_err(|_| HouseError::Connection(format!("{conn} is no longer writable")))
    }
}

impl Outbox for ConnectionRegistry {
    fn broadcast(&self, frame: &Frame) -> usize {
        let inner = self.inner.lock();
        inner
            .names
            .values()
            .filter_map(|conn| inner.connections.get(conn).map(|entry| (*conn, entry)))
            .filter(|(conn, entry)| match Self::write(entry, *conn, frame) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Broadcast skipped {}: {}", conn, e);
                    false
                }
            })
            .count()
    }

    fn send_to(&self, recipient: &Recipient, frame: &Frame) -> HouseResult<()> {
        let inner = self.inner.lock();
        let conn = match recipient {
            Recipient::Peer => ConnectionId::PEER,
            Recipient::Connection(conn) => *conn,
            Recipient::Bidder(name) => *inner
                .names
                .get(name)
                .ok_or_else(|| HouseError::Connection(format!("no bidder named '{name}'")))?,
        };
        let entry = inner
            .connections
            .get(&conn)
            .ok_or_else(|| HouseError::Connection(format!("{conn} is not open")))?;
        Self::write(entry, conn, frame)
    }

    fn close_connection(&self, name: &str) {
        let mut inner = self.inner.lock();
        let Some(conn) = inner.names.remove(name) else {
            return;
        };
        if let Some(entry) = inner.connections.remove(&conn) {
            // Dropping the writer lets queued frames flush before shutdown.
            entry.closer.cancel();
        }
        debug!("Closed connection {} of {}", conn, name);
    }

    fn is_active(&self, name: &str) -> bool {
        self.inner.lock().names.contains_key(name)
    }

    fn bind_identity(&self, conn: ConnectionId, name: &str) -> HouseResult<()> {
        let mut inner = self.inner.lock();
        if inner.names.contains_key(name) {
            return Err(HouseError::DuplicateIdentity(name.to_string()));
        }
        let entry = inner
            .connections
            .get_mut(&conn)
            .ok_or_else(|| HouseError::Connection(format!("{conn} is not open")))?;
        if let Some(previous) = entry.identity.replace(name.to_string()) {
            inner.names.remove(&previous);
        }
        inner.names.insert(name.to_string(), conn);
        Ok(())
    }
}
