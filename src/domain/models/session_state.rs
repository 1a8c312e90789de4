//! Clarification state machine.
//!
//! The ask-vs-act decision is an explicit state machine rather than
//! conditionals scattered through UI callbacks, so the decision table is
//! reviewable and testable independent of any interpretation backend.

use serde::{Deserialize, Serialize};

use super::command::UpdateCommand;

/// Discriminant of [`SessionState`], used for the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStateKind {
    /// No pending interpretation
    Idle,
    /// Interpretation call in flight; resubmission is a no-op
    Parsing,
    /// Waiting on the human to answer a clarification question
    NeedsClarification,
    /// Validated batch awaiting acceptance
    Ready,
    /// Interpretation or validation failed; retryable
    Failed,
}

impl SessionStateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Parsing => "parsing",
            Self::NeedsClarification => "needs_clarification",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    /// States this one may legally move to.
    pub fn valid_transitions(&self) -> Vec<SessionStateKind> {
        match self {
            // New instruction submitted
            Self::Idle => vec![Self::Parsing],
            // Interpretation settled
            Self::Parsing => vec![Self::NeedsClarification, Self::Ready, Self::Failed],
            // Answer resubmits; cancel discards
            Self::NeedsClarification => vec![Self::Parsing, Self::Idle],
            // Apply or cancel ends the thread; apply-one may keep it open
            Self::Ready => vec![Self::Ready, Self::Idle],
            // Resubmission retries; cancel dismisses the error
            Self::Failed => vec![Self::Parsing, Self::Idle],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Current position in the instruction thread.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Parsing,
    NeedsClarification {
        /// Composed instruction so far; further clarification turns keep
        /// appending to it
        instruction: String,
        /// Question to put to the human
        prompt: String,
    },
    Ready {
        commands: Vec<UpdateCommand>,
        summary: String,
    },
    Failed {
        /// Backend/validation error, verbatim
        message: String,
    },
}

impl SessionState {
    pub fn kind(&self) -> SessionStateKind {
        match self {
            Self::Idle => SessionStateKind::Idle,
            Self::Parsing => SessionStateKind::Parsing,
            Self::NeedsClarification { .. } => SessionStateKind::NeedsClarification,
            Self::Ready { .. } => SessionStateKind::Ready,
            Self::Failed { .. } => SessionStateKind::Failed,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}
