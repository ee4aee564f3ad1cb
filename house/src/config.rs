//! Configuration for an auction house.
//!
//! Protocol constants and tuning values live here as named constants,
//! alongside [`HouseSettings`] (runtime durations) and [`AuctionConfig`]
//! (the item list file shared by both houses).

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{HouseError, HouseResult};

/// Default listening port of the caller house.
pub const DEFAULT_CALLER_PORT: u16 = 4444;

/// Default listening port of the callee house.
pub const DEFAULT_CALLEE_PORT: u16 = 5556;

/// Default host the caller dials to reach the callee.
pub const DEFAULT_PEER_HOST: &str = "127.0.0.1";

/// Total length of the pre-auction countdown.
pub const COUNTDOWN_SECS: u64 = 10;

/// Step between two countdown notices.
pub const COUNTDOWN_INTERVAL_SECS: u64 = 5;

/// Bounded wait of the network event loop before re-checking for auction end.
pub const POLL_INTERVAL_MS: u64 = 1000;

/// Maximum attempts the caller makes to reach the callee.
pub const PEER_CONNECT_MAX_RETRIES: u32 = 30;

/// Initial delay between peer connection attempts (doubles on each retry).
pub const PEER_CONNECT_INITIAL_DELAY_MS: u64 = 100;

/// Upper bound for the peer connection backoff.
pub const PEER_CONNECT_MAX_DELAY_MS: u64 = 2000;

/// Size of a single socket read.
pub const READ_CHUNK_SIZE: usize = 256;

/// Unterminated bytes a connection may buffer before the buffer is dropped.
pub const MAX_PENDING_BYTES: usize = 64 * 1024;

/// Settlement number at which an unsold item is finalized without a winner.
/// Rounds below it reprice the item, so an item is discounted at most
/// `MAX_DISCOUNT_ROUNDS - 1` times.
pub const MAX_DISCOUNT_ROUNDS: u32 = 5;

/// Price reduction per discount round, in tenths of the starting price.
pub const DISCOUNT_STEP_TENTHS: u64 = 1;

/// Environment variable naming the auction configuration file.
pub const AUCTION_CONFIG_ENV: &str = "AUCTION_CONFIG";

/// Which side of the peer link a house is on.
///
/// The caller dials the callee at startup. The role also decides ties in bid
/// arbitration: the caller's own provisional bid wins over an equal peer bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Caller,
    Callee,
}

impl Role {
    /// Whether a bid submitted by the peer house beats our provisional bid.
    pub fn accepts_peer_bid(self, amount: u64, temp_bid: u64) -> bool {
        match self {
            Role::Caller => amount > temp_bid,
            Role::Callee => amount >= temp_bid,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Caller => "caller",
            Role::Callee => "callee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = HouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "caller" => Ok(Role::Caller),
            "callee" => Ok(Role::Callee),
            other => Err(HouseError::Config(format!("unknown role '{other}'"))),
        }
    }
}

/// Runtime durations of one house.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseSettings {
    /// Length of the interest window and of every bid window.
    pub round: Duration,
    /// Total pre-auction countdown.
    pub countdown: Duration,
    /// Step between countdown notices.
    pub countdown_step: Duration,
    /// Bounded wait of the network event loop.
    pub poll_interval: Duration,
}

impl HouseSettings {
    /// Settings with the default countdown and the given round length.
    pub fn with_round(round: Duration) -> Self {
        Self {
            round,
            countdown: Duration::from_secs(COUNTDOWN_SECS),
            countdown_step: Duration::from_secs(COUNTDOWN_INTERVAL_SECS),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }
}

impl From<&AuctionConfig> for HouseSettings {
    fn from(config: &AuctionConfig) -> Self {
        Self::with_round(Duration::from_secs(config.round_secs))
    }
}

/// One line of the item list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpec {
    pub id: u32,
    pub starting_price: u64,
    pub description: String,
}

/// Parsed auction configuration file.
///
/// Format: line 1 is the per-round time budget in seconds, line 2 the item
/// count N, then N lines of `<startingPrice> <description>`. Items are
/// numbered from 1 in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionConfig {
    pub round_secs: u64,
    pub items: Vec<ItemSpec>,
}

impl AuctionConfig {
    pub fn load(path: impl AsRef<Path>) -> HouseResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            HouseError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> HouseResult<Self> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

        let round_secs = parse_number(lines.next(), "round time")?;
        let count: u32 = parse_number(lines.next(), "item count")?;

        let mut items = Vec::with_capacity(count as usize);
        for id in 1..=count {
            let Some((line_no, line)) = lines.next() else {
                return Err(HouseError::Config(format!(
                    "expected {count} items, found {}",
                    items.len()
                )));
            };
            let (price, description) = line.split_once(' ').ok_or_else(|| {
                HouseError::Config(format!("line {line_no}: expected '<price> <description>'"))
            })?;
            let starting_price = price.parse().map_err(|_| {
                HouseError::Config(format!("line {line_no}: invalid starting price '{price}'"))
            })?;
            let description = description.trim();
            if description.is_empty() {
                return Err(HouseError::Config(format!(
                    "line {line_no}: missing item description"
                )));
            }
            items.push(ItemSpec {
                id,
                starting_price,
                description: description.to_string(),
            });
        }

        Ok(Self { round_secs, items })
    }
}

fn parse_number<T: FromStr>(line: Option<(usize, &str)>, what: &str) -> HouseResult<T> {
    let (line_no, text) =
        line.ok_or_else(|| HouseError::Config(format!("missing {what} line")))?;
    text.parse()
        .map_err(|_| HouseError::Config(format!("line {line_no}: invalid {what} '{text}'")))
}
