//! [`WinnerStore`] implementations.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::ItemSpec;
use crate::error::{HouseError, HouseResult};
use crate::protocol::Holder;
use crate::traits::WinnerStore;

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: u32,
    pub starting_price: u64,
    pub description: String,
    /// Final amount, `None` until the item closes.
    pub bid: Option<u64>,
    /// Winner's display name, `None` when unsold or still open.
    pub bidder: Option<String>,
}

#[derive(Debug)]
enum StoreCommand {
    Write(Vec<ItemRecord>),
    /// Answered once every earlier write has finished.
    Sync(oneshot::Sender<()>),
}

/// Keeps the results table in memory and rewrites a JSON snapshot of it on
/// every change.
///
/// Snapshots are written by a background task, so recording a result never
/// touches the disk on the caller's thread. Call [`JsonFileStore::sync`]
/// before exiting to wait for queued snapshots.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<Vec<ItemRecord>>,
    writer: mpsc::UnboundedSender<StoreCommand>,
}

impl JsonFileStore {
    /// Open a store at `path`, loading an existing snapshot if present, and
    /// start its writer task on the current runtime.
    pub async fn open(path: impl Into<PathBuf>) -> HouseResult<Self> {
        let path = path.into();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                HouseError::Persistence(format!("corrupt snapshot {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let (writer, commands) = mpsc::unbounded_channel();
        tokio::spawn(write_snapshots(path.clone(), commands));
        Ok(Self {
            path,
            records: Mutex::new(records),
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> Vec<ItemRecord> {
        self.records.lock().clone()
    }

    /// Wait until every snapshot queued so far has been written.
    pub async fn sync(&self) -> HouseResult<()> {
        let (done, finished) = oneshot::channel();
        self.send(StoreCommand::Sync(done))?;
        finished.await.map_err(|_| writer_stopped())
    }

    fn queue(&self, records: &[ItemRecord]) -> HouseResult<()> {
        self.send(StoreCommand::Write(records.to_vec()))
    }

    fn send(&self, command: StoreCommand) -> HouseResult<()> {
        self.writer.send(command).map_err(|_| writer_stopped())
    }
}

fn writer_stopped() -> HouseError {
    HouseError::Persistence("store writer has stopped".into())
}

async fn write_snapshots(path: PathBuf, mut commands: mpsc::UnboundedReceiver<StoreCommand>) {
    while let Some(command) = commands.recv().await {
        match command {
            StoreCommand::Write(records) => {
                if let Err(e) = flush(&path, &records).await {
                    warn!("Failed to write {}: {}", path.display(), e);
                }
            }
            StoreCommand::Sync(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Store writer for {} stopped", path.display());
}

async fn flush(path: &Path, records: &[ItemRecord]) -> HouseResult<()> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| HouseError::Persistence(format!("serialize snapshot: {e}")))?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

impl WinnerStore for JsonFileStore {
    fn initialize(&self, items: &[ItemSpec]) -> HouseResult<()> {
        let mut records = self.records.lock();
        *records = items
            .iter()
            .map(|item| ItemRecord {
                id: item.id,
                starting_price: item.starting_price,
                description: item.description.clone(),
                bid: None,
                bidder: None,
            })
            .collect();
        self.queue(&records)
    }

    fn record_winner(&self, item_id: u32, amount: u64, holder: &Holder) -> HouseResult<()> {
        let mut records = self.records.lock();
        let record = records
            .iter_mut()
            .find(|record| record.id == item_id)
            .ok_or_else(|| HouseError::Persistence(format!("unknown item {item_id}")))?;
        record.bid = Some(amount);
        record.bidder = holder.name().map(str::to_string);
        self.queue(&records)
    }
}

/// Store that only logs results.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStore;

impl WinnerStore for LogStore {
    fn record_winner(&self, item_id: u32, amount: u64, holder: &Holder) -> HouseResult<()> {
        info!("Result for item {}: {} at {}", item_id, holder, amount);
        Ok(())
    }
}
