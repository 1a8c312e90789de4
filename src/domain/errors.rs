//! Domain errors for the contextual update engine.

use thiserror::Error;

/// Errors raised by the update engine.
///
/// None of these are fatal to the host process; every variant is scoped
/// to the current instruction thread and recoverable by retry or
/// cancellation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Transport or provider failure from the interpretation backend,
    /// surfaced verbatim. Retryable by resubmission.
    #[error("Interpretation failed: {0}")]
    Interpretation(String),

    /// A command in the batch violates the vocabulary. The whole batch
    /// is rejected.
    #[error("Invalid command at index {index}: {reason}")]
    InvalidCommand { index: usize, reason: String },

    /// A command references an entity missing from the snapshot.
    #[error("Command at index {index} references unknown {reference}")]
    StaleReference { index: usize, reference: String },

    /// Execution failed mid-batch; the document was rolled back.
    #[error("Apply failed at command {index}: {reason}")]
    ApplyFailed { index: usize, reason: String },

    /// Undo requested with an empty journal. A no-op safety condition,
    /// not an exceptional system error.
    #[error("No update available to undo")]
    NoPendingUndo,

    /// Operation called in a session state that does not permit it.
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
