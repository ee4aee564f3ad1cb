//! Mock winner store for testing.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::ItemSpec;
use crate::error::{HouseError, HouseResult};
use crate::protocol::Holder;
use crate::traits::WinnerStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedResult {
    pub item_id: u32,
    pub amount: u64,
    pub holder: Holder,
}

#[derive(Debug, Default)]
struct StoreState {
    items: Vec<ItemSpec>,
    results: Vec<RecordedResult>,
    fail: bool,
}

/// In-memory [`WinnerStore`] with a failure switch.
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<StoreState>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether writes should fail.
    pub fn set_fail(&self, fail: bool) {
        self.state.lock().fail = fail;
    }

    pub fn items(&self) -> Vec<ItemSpec> {
        self.state.lock().items.clone()
    }

    pub fn results(&self) -> Vec<RecordedResult> {
        self.state.lock().results.clone()
    }
}

impl WinnerStore for MockStore {
    fn initialize(&self, items: &[ItemSpec]) -> HouseResult<()> {
        let mut state = self.state.lock();
        if state.fail {
            return Err(HouseError::Persistence("mock store offline".into()));
        }
        state.items = items.to_vec();
        Ok(())
    }

    fn record_winner(&self, item_id: u32, amount: u64, holder: &Holder) -> HouseResult<()> {
        let mut state = self.state.lock();
        if state.fail {
            return Err(HouseError::Persistence("mock store offline".into()));
        }
        state.results.push(RecordedResult {
            item_id,
            amount,
            holder: holder.clone(),
        });
        Ok(())
    }
}
