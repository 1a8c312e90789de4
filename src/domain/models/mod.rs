//! Domain models for the contextual update engine.

pub mod case;
pub mod command;
pub mod config;
pub mod journal;
pub mod phase;
pub mod session_state;
pub mod update;

pub use case::{
    Action, ActionStatus, CaseDocument, CaseKind, Control, ControlClass, ControlStatus, Hazard,
    Step,
};
pub use command::{CommandData, CommandIntent, CommandTarget, LocationRef, UpdateCommand};
pub use config::{Config, InterpreterConfig, LoggingConfig};
pub use journal::{AppliedUpdate, UndoJournal};
pub use phase::WorkflowPhase;
pub use session_state::{SessionState, SessionStateKind};
pub use update::ParsedUpdate;
