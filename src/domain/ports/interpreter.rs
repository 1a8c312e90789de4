//! Interpretation service port.
//!
//! This is the boundary to the language-understanding backend that maps
//! free text onto the command vocabulary. The domain layer depends on
//! this trait; the infrastructure layer implements it over HTTP.
//!
//! The call is pure from the engine's point of view: no local state is
//! mutated, failures surface verbatim, and retrying is the hosting UI's
//! decision. A clarification turn is not a separate entry point: the
//! session composes a combined instruction string and calls `interpret`
//! again with the same phase and a fresh snapshot.

use async_trait::async_trait;

use crate::domain::errors::EngineResult;
use crate::domain::models::{CaseDocument, ParsedUpdate, WorkflowPhase};

/// Port trait for the interpretation backend.
///
/// Implementations must be `Send + Sync`; the session holds one behind
/// an `Arc` and awaits a single in-flight call at a time.
#[async_trait]
pub trait UpdateInterpreter: Send + Sync {
    /// Interpret a free-text instruction against the current document.
    ///
    /// Returns either a command batch or a clarification request; the
    /// caller enforces their mutual exclusivity. Transport and provider
    /// errors map to [`EngineError::Interpretation`] with the backend's
    /// message intact.
    ///
    /// [`EngineError::Interpretation`]: crate::domain::errors::EngineError::Interpretation
    async fn interpret(
        &self,
        instruction: &str,
        phase: WorkflowPhase,
        snapshot: &CaseDocument,
    ) -> EngineResult<ParsedUpdate>;
}
