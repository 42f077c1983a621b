//! Structured outcomes of multi-step operations.
//!
//! Rename, folder delete and batch upload are sequences of independent store
//! calls with no rollback. Each returns a report naming what succeeded and
//! what failed so callers can decide how to treat a partial result.

use super::{blob::UploadReceipt, records::Listing};
use crate::errors::HierarchyError;
use serde::{Deserialize, Serialize};

/// A key the store refused to process, with the cause.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct KeyFailure {
    pub key: String,
    pub reason: String,
}

impl KeyFailure {
    pub fn new(key: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MovedKey {
    pub from: String,
    pub to: String,
}

/// Outcome of a folder rename, flattened across the whole subtree.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveReport {
    pub from: String,
    pub to: String,
    /// Folder markers written under the new path.
    pub created: Vec<String>,
    pub moved: Vec<MovedKey>,
    pub failed: Vec<KeyFailure>,
}

impl MoveReport {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of a recursive folder delete.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub prefix: String,
    pub deleted: Vec<String>,
    pub failed: Vec<KeyFailure>,
    /// Listing pages walked.
    pub pages: usize,
}

impl DeleteReport {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadFailure {
    /// Original file name as submitted.
    pub name: String,
    pub reason: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    Stored(UploadReceipt),
    Failed(UploadFailure),
}

impl UploadOutcome {
    pub fn name(&self) -> &str {
        match self {
            UploadOutcome::Stored(receipt) => &receipt.name,
            UploadOutcome::Failed(failure) => &failure.name,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, UploadOutcome::Stored(_))
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Empty,
    Complete,
    Partial,
    Failed,
}

/// Per-file results of a batch upload, in submission order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<UploadOutcome>,
}

impl BatchReport {
    pub fn stored(&self) -> impl Iterator<Item = &UploadReceipt> {
        self.outcomes.iter().filter_map(|o| match o {
            UploadOutcome::Stored(receipt) => Some(receipt),
            UploadOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &UploadFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            UploadOutcome::Failed(failure) => Some(failure),
            UploadOutcome::Stored(_) => None,
        })
    }

    pub fn status(&self) -> BatchStatus {
        let stored = self.stored().count();
        match (stored, self.outcomes.len()) {
            (_, 0) => BatchStatus::Empty,
            (s, n) if s == n => BatchStatus::Complete,
            (0, _) => BatchStatus::Failed,
            _ => BatchStatus::Partial,
        }
    }

    /// Treat anything short of a complete batch as an error.
    pub fn into_result(self) -> Result<Self, HierarchyError> {
        match self.status() {
            BatchStatus::Empty | BatchStatus::Complete => Ok(self),
            BatchStatus::Partial | BatchStatus::Failed => {
                Err(HierarchyError::partial("upload batch", PartialReport::Upload(self)))
            }
        }
    }
}

/// Report carried by a partial-failure error.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", content = "report", rename_all = "snake_case")]
pub enum PartialReport {
    Move(MoveReport),
    Delete(DeleteReport),
    Upload(BatchReport),
}

impl PartialReport {
    pub fn succeeded(&self) -> usize {
        match self {
            PartialReport::Move(r) => r.moved.len(),
            PartialReport::Delete(r) => r.deleted.len(),
            PartialReport::Upload(r) => r.stored().count(),
        }
    }

    pub fn failed(&self) -> usize {
        match self {
            PartialReport::Move(r) => r.failed.len(),
            PartialReport::Delete(r) => r.failed.len(),
            PartialReport::Upload(r) => r.failures().count(),
        }
    }
}

/// A mutation's outcome plus a listing of the affected folder fetched after
/// the mutation completed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Refreshed<T> {
    pub outcome: T,
    pub listing: Listing,
}
