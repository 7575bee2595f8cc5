//! In-memory fakes for the loot seam (testing only).

use std::cell::RefCell;
use std::path::Path;

use crate::domain::commit::CommitId;
use crate::domain::error::Result;
use crate::loot::LootSource;

/// [`LootSource`] that answers every query with a fixed payload and records
/// what it was asked.
#[derive(Debug)]
pub struct FixedLoot {
    payload: serde_json::Value,
    calls: RefCell<Vec<(CommitId, Vec<String>)>>,
}

impl FixedLoot {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// `(baseline, projects)` of every call so far.
    pub fn calls(&self) -> Vec<(CommitId, Vec<String>)> {
        self.calls.borrow().clone()
    }
}

impl LootSource for FixedLoot {
    fn resolve(
        &self,
        _workspace: &Path,
        baseline: &CommitId,
        projects: &[String],
    ) -> Result<serde_json::Value> {
        self.calls
            .borrow_mut()
            .push((baseline.clone(), projects.to_vec()));
        Ok(self.payload.clone())
    }
}
