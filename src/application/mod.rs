//! Application layer: vocabulary, applier, and the update session.

pub mod applier;
pub mod session;
pub mod vocabulary;

pub use applier::{apply_batch, AppliedBatch};
pub use session::{LastApplied, UpdateSession};
pub use vocabulary::{allowed_intents, allowed_targets, validate_batch};
