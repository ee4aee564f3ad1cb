//! TCP multiplexer: one listener, many bidder connections and one peer link.
//!
//! Each connection gets a reader task that feeds a [`FrameDecoder`] and a
//! writer task fed by the [`ConnectionRegistry`]. Decoded frames come back to
//! a single event loop, which dispatches them into the coordinator while
//! holding its lock.

pub mod link;
pub mod registry;
pub mod timers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use link::{accept_peer, dial_peer, PeerLink};
pub use registry::ConnectionRegistry;
pub use timers::TokioTimers;

use crate::auction::AuctionHouse;
use crate::config::READ_CHUNK_SIZE;
use crate::error::{HouseError, HouseResult};
use crate::protocol::{Frame, FrameDecoder};
use crate::traits::{ConnectionId, Origin};

/// The coordinator as driven by the TCP runtime.
pub type SharedHouse = Arc<Mutex<AuctionHouse<ConnectionRegistry, TokioTimers>>>;

/// What a reader task reports back to the event loop.
#[derive(Debug)]
enum ConnectionEvent {
    Frames(ConnectionId, Vec<Frame>),
    Closed(ConnectionId),
}

pub struct Multiplexer {
    listener: TcpListener,
    registry: ConnectionRegistry,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    events_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    next_conn: u64,
    poll_interval: Duration,
}

impl Multiplexer {
    pub async fn bind(addr: &str, poll_interval: Duration) -> HouseResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HouseError::Connection(format!("Failed to bind {addr}: {e}")))?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(Self {
            listener,
            registry: ConnectionRegistry::new(),
            events_tx,
            events_rx,
            next_conn: ConnectionId::PEER.0,
            poll_interval,
        })
    }

    pub fn local_addr(&self) -> HouseResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> ConnectionRegistry {
        self.registry.clone()
    }

    /// Establish the peer connection. Must complete before [`run`](Self::run).
    pub async fn connect_peer(
        &mut self,
        link: &PeerLink,
        cancel: &CancellationToken,
    ) -> HouseResult<()> {
        let stream = match link {
            PeerLink::Dial(addr) => dial_peer(addr, cancel).await?,
            PeerLink::Accept => accept_peer(&self.listener, cancel).await?,
        };
        self.attach(ConnectionId::PEER, stream, cancel);
        Ok(())
    }

    /// Run the event loop until the auction ends, the peer is lost or
    /// `cancel` fires.
    pub async fn run(mut self, house: SharedHouse, cancel: CancellationToken) -> HouseResult<()> {
        let result = loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        self.next_conn += 1;
                        let conn = ConnectionId(self.next_conn);
                        info!("Accepted new connection {} from {}", conn, addr);
                        self.attach(conn, stream, &cancel);
                    }
                    Err(e) => warn!("Failed to accept a connection: {}", e),
                },
                Some(event) = self.events_rx.recv() => {
                    if let Err(e) = self.dispatch(&house, event) {
                        break Err(e);
                    }
                }
                () = tokio::time::sleep(self.poll_interval) => {
                    if house.lock().has_ended() {
                        info!("Auction has ended, shutting down");
                        break Ok(());
                    }
                }
                () = cancel.cancelled() => {
                    info!("Event loop cancelled");
                    break Ok(());
                }
            }
        };

        self.registry.close_all();
        result
    }

    fn dispatch(&self, house: &SharedHouse, event: ConnectionEvent) -> HouseResult<()> {
        match event {
            ConnectionEvent::Frames(conn, frames) => {
                let mut house = house.lock();
                for frame in &frames {
                    // Identity can change mid-batch on `connect` or `quit`.
                    let Some(origin) = self.registry.origin_of(conn) else {
                        debug!("Dropping frame from closed {}: {}", conn, frame);
                        continue;
                    };
                    house.handle_frame(origin, frame);
                }
                Ok(())
            }
            ConnectionEvent::Closed(conn) => {
                let mut house = house.lock();
                let origin = self.registry.unregister(conn);
                house.on_disconnect(&origin);
                match origin {
                    Origin::Peer if house.has_ended() => {
                        info!("Peer closed its connection after the auction ended");
                        Ok(())
                    }
                    Origin::Peer => {
                        error!("Lost connection with the peer, shutting down");
                        Err(HouseError::PeerConnectionLost)
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    fn attach(&self, conn: ConnectionId, stream: TcpStream, cancel: &CancellationToken) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Unable to set TCP_NODELAY on {}: {}", conn, e);
        }
        let (reader, writer) = stream.into_split();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let closer = cancel.child_token();
        self.registry.register(conn, frames_tx, closer.clone());

        tokio::spawn(read_loop(conn, reader, self.events_tx.clone(), closer.clone()));
        tokio::spawn(write_loop(conn, writer, frames_rx, closer));
    }
}

async fn read_loop(
    conn: ConnectionId,
    mut reader: OwnedReadHalf,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    closer: CancellationToken,
) {
    let mut decoder = FrameDecoder::new();
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = tokio::select! {
            result = reader.read(&mut buf) => match result {
                Ok(0) => {
                    debug!("{} reached end of stream", conn);
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    debug!("Read error on {}: {}", conn, e);
                    break;
                }
            },
            () = closer.cancelled() => break,
        };
        let frames = decoder.decode(&buf[..n]);
        if !frames.is_empty() && events.send(ConnectionEvent::Frames(conn, frames)).is_err() {
            break;
        }
    }
    let _ = events.send(ConnectionEvent::Closed(conn));
}

async fn write_loop(
    conn: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut frames: mpsc::UnboundedReceiver<String>,
    closer: CancellationToken,
) {
    while let Some(line) = frames.recv().await {
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!("Write to {} failed, closing: {}", conn, e);
            closer.cancel();
            return;
        }
    }
    let _ = writer.shutdown().await;
}
