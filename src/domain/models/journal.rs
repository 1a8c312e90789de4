//! Single-slot undo journal.
//!
//! The journal holds the inverse of exactly the most recently applied
//! batch. Applying a new batch replaces the entry (never merges);
//! undoing consumes it. There is no redo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::command::UpdateCommand;

/// Record of the last successfully applied batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedUpdate {
    /// Summary shown next to the undo affordance
    pub summary: String,
    /// Inverse commands in replay order (reverse of application order)
    pub inverse_commands: Vec<UpdateCommand>,
    pub applied_at: DateTime<Utc>,
}

impl AppliedUpdate {
    pub fn new(summary: impl Into<String>, inverse_commands: Vec<UpdateCommand>) -> Self {
        Self {
            summary: summary.into(),
            inverse_commands,
            applied_at: Utc::now(),
        }
    }
}

/// Holds at most one [`AppliedUpdate`].
#[derive(Debug, Clone, Default)]
pub struct UndoJournal {
    entry: Option<AppliedUpdate>,
}

impl UndoJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever was stored with the new entry.
    pub fn record(&mut self, entry: AppliedUpdate) {
        self.entry = Some(entry);
    }

    /// Consume the stored entry, leaving the journal empty.
    pub fn take(&mut self) -> Option<AppliedUpdate> {
        self.entry.take()
    }

    /// Put an entry back after a failed replay.
    pub fn restore(&mut self, entry: AppliedUpdate) {
        self.entry = Some(entry);
    }

    pub fn peek(&self) -> Option<&AppliedUpdate> {
        self.entry.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}
