//! Establishing the single peer connection between the two houses.

use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{
    PEER_CONNECT_INITIAL_DELAY_MS, PEER_CONNECT_MAX_DELAY_MS, PEER_CONNECT_MAX_RETRIES,
};
use crate::error::{HouseError, HouseResult};

/// How this house obtains its peer connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerLink {
    /// Dial the other house at this address (the caller).
    Dial(String),
    /// Accept the first inbound connection as the peer (the callee).
    Accept,
}

/// Dial `addr`, retrying with a doubling delay while the callee comes up.
pub async fn dial_peer(addr: &str, cancel: &CancellationToken) -> HouseResult<TcpStream> {
    let mut delay = Duration::from_millis(PEER_CONNECT_INITIAL_DELAY_MS);
    let max_delay = Duration::from_millis(PEER_CONNECT_MAX_DELAY_MS);

    for attempt in 1..=PEER_CONNECT_MAX_RETRIES {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                info!("Connected to peer at {} (attempt {})", addr, attempt);
                return Ok(stream);
            }
            Err(e) => {
                debug!(
                    "Peer dial attempt {}/{} to {} failed: {}",
                    attempt, PEER_CONNECT_MAX_RETRIES, addr, e
                );
            }
        }
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = cancel.cancelled() => {
                return Err(HouseError::Connection("peer dial cancelled".into()));
            }
        }
        delay = (delay * 2).min(max_delay);
    }

    warn!("Giving up on peer at {}", addr);
    Err(HouseError::Connection(format!(
        "unable to reach peer at {addr} after {PEER_CONNECT_MAX_RETRIES} attempts"
    )))
}

/// Wait for the other house to connect.
pub async fn accept_peer(
    listener: &TcpListener,
    cancel: &CancellationToken,
) -> HouseResult<TcpStream> {
    info!("Waiting for the peer to connect");
    tokio::select! {
        result = listener.accept() => {
            let (stream, addr) = result?;
            info!("Peer connected from {}", addr);
            Ok(stream)
        }
        () = cancel.cancelled() => Err(HouseError::Connection("peer accept cancelled".into())),
    }
}
