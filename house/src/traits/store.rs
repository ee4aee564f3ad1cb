//! Persistence of auction results.

use crate::config::ItemSpec;
use crate::error::HouseResult;
use crate::protocol::Holder;

/// Durable sink for final results, one per house.
///
/// Callers treat failures as non-fatal: results have already been announced
/// to bidders when `record_winner` runs.
pub trait WinnerStore: Send + Sync {
    /// Register the full item list before the auction starts.
    fn initialize(&self, _items: &[ItemSpec]) -> HouseResult<()> {
        Ok(())
    }

    /// Record the outcome of one item. `holder` is `Unheld` when nobody won.
    fn record_winner(&self, item_id: u32, amount: u64, holder: &Holder) -> HouseResult<()>;
}
