//! Transaction state and options.

use crate::error::{CoreError, CoreResult};
use crate::types::TransactionId;
use serde::{Deserialize, Serialize};

/// State of a transaction handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// Accepting operations.
    Open,
    /// Queue applied.
    Committed,
    /// Queue discarded.
    RolledBack,
}

impl TransactionState {
    /// Fails unless the handle is open.
    pub(crate) fn ensure_open(self) -> CoreResult<()> {
        match self {
            TransactionState::Open => Ok(()),
            TransactionState::Committed => Err(CoreError::invalid_operation(
                "transaction already committed",
            )),
            TransactionState::RolledBack => Err(CoreError::invalid_operation(
                "transaction already rolled back",
            )),
        }
    }
}

/// Access mode of a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionMode {
    /// Reads and writes.
    #[default]
    ReadWrite,
    /// Reads only. Recorded, not enforced.
    ReadOnly,
}

/// Options for opening or resuming a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Access mode.
    pub mode: TransactionMode,
    /// Id of a transaction to resume; a fresh id is generated when absent.
    pub id: Option<TransactionId>,
}

impl TransactionOptions {
    /// Read-write options with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only options with a fresh id.
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            mode: TransactionMode::ReadOnly,
            id: None,
        }
    }

    /// Resumes the transaction `id`.
    #[must_use]
    pub fn resume(mut self, id: TransactionId) -> Self {
        self.id = Some(id);
        self
    }
}
