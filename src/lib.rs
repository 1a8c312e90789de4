//! Redline - Contextual Update Engine
//!
//! Redline turns short free-text instructions ("forgot to mention we use
//! a ladder in step 3") into typed, targeted mutations against
//! hierarchical safety documents (risk assessments, job-hazard analyses,
//! incident reports), mediates ambiguity through a clarification
//! dialogue, applies accepted batches atomically, and keeps a
//! single-level undo of the most recently applied batch.
//!
//! # Architecture
//!
//! This crate follows hexagonal architecture principles:
//!
//! - **Domain Layer** (`domain`): document model, command vocabulary
//!   types, session state machine, and the interpretation port
//! - **Application Layer** (`application`): batch validation, the
//!   command applier with inverse synthesis, and the update session
//! - **Infrastructure Layer** (`infrastructure`): configuration loader,
//!   logging setup, and the HTTP interpretation adapter
//! - **CLI Layer** (`cli`): a demonstration shell driving the engine
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use redline::application::UpdateSession;
//! use redline::domain::models::WorkflowPhase;
//! use redline::infrastructure::interpreter::HttpInterpreterClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = redline::infrastructure::config::ConfigLoader::load()?;
//!     let interpreter = Arc::new(HttpInterpreterClient::new(&config.interpreter)?);
//!     let mut session = UpdateSession::new(interpreter, document.kind);
//!     session
//!         .parse_contextual_update("add a tidy-up step", WorkflowPhase::Review, &document)
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use application::{LastApplied, UpdateSession};
pub use domain::errors::{EngineError, EngineResult};
pub use domain::models::{
    CaseDocument, CaseKind, CommandIntent, CommandTarget, Config, ParsedUpdate, SessionState,
    SessionStateKind, UpdateCommand, WorkflowPhase,
};
pub use domain::ports::UpdateInterpreter;
pub use infrastructure::config::{ConfigError, ConfigLoader};
