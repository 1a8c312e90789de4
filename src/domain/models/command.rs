//! Contextual update commands.
//!
//! A command is one proposed mutation against a case document: an intent
//! (what to do), a target (which entity kind), a location (how to resolve
//! the entity or insertion point), a partial data payload, and a
//! human-facing explanation. Batches of commands are produced by
//! interpretation, screened by the vocabulary validator, and executed by
//! the applier.
//!
//! The payload is deliberately loose: the interpretation backend may emit
//! keys the engine does not recognize. Those land in `extra` where the
//! review UI can surface them; the applier ignores them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::case::{ControlClass, ControlStatus};

/// What a command does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandIntent {
    Insert,
    Modify,
    Delete,
    Reorder,
    Annotate,
}

impl CommandIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Modify => "modify",
            Self::Delete => "delete",
            Self::Reorder => "reorder",
            Self::Annotate => "annotate",
        }
    }
}

/// Which entity kind a command touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandTarget {
    Step,
    Hazard,
    Control,
    Action,
}

impl CommandTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Hazard => "hazard",
            Self::Control => "control",
            Self::Action => "action",
        }
    }
}

/// Reference resolving the commanded entity or insertion point.
///
/// Which fields are required depends on the intent/target combination;
/// the vocabulary validator enforces that before the applier ever sees
/// the command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationRef {
    #[serde(default, alias = "stepId", skip_serializing_if = "Option::is_none")]
    pub step_id: Option<Uuid>,
    /// Zero-based index alternative for steps, as interpretation often
    /// resolves "step 3" positionally
    #[serde(default, alias = "stepIndex", skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    #[serde(default, alias = "hazardId", skip_serializing_if = "Option::is_none")]
    pub hazard_id: Option<Uuid>,
    #[serde(default, alias = "controlId", skip_serializing_if = "Option::is_none")]
    pub control_id: Option<Uuid>,
    #[serde(default, alias = "actionId", skip_serializing_if = "Option::is_none")]
    pub action_id: Option<Uuid>,
    /// Insertion anchor: place the new step directly after this one
    #[serde(default, alias = "afterStepId", skip_serializing_if = "Option::is_none")]
    pub after_step_id: Option<Uuid>,
}

impl LocationRef {
    /// Location addressing a step by id.
    pub fn step(id: Uuid) -> Self {
        Self {
            step_id: Some(id),
            ..Self::default()
        }
    }

    /// Location addressing a hazard by id.
    pub fn hazard(id: Uuid) -> Self {
        Self {
            hazard_id: Some(id),
            ..Self::default()
        }
    }

    /// Location addressing a control by id.
    pub fn control(id: Uuid) -> Self {
        Self {
            control_id: Some(id),
            ..Self::default()
        }
    }

    /// Location addressing an action by id.
    pub fn action(id: Uuid) -> Self {
        Self {
            action_id: Some(id),
            ..Self::default()
        }
    }
}

/// Partial-update payload. All fields optional; recognized fields depend
/// on the target, everything else collects in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    /// Explicit id for an inserted entity. Lets a later command in the
    /// same batch reference it, and lets delete-inverses restore the
    /// original id on undo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Exact sibling position for inserts and the destination for
    /// reorders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Single note appended by an annotate command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Full replacement of the notes list (annotate inverses)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
    /// Hazard -> step links
    #[serde(default, alias = "stepIds", skip_serializing_if = "Option::is_none")]
    pub step_ids: Option<Vec<Uuid>>,
    /// Control/action -> hazard link
    #[serde(default, alias = "hazardId", skip_serializing_if = "Option::is_none")]
    pub hazard_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<u8>,
    /// Control status (existing/proposed) or action status
    /// (open/in_progress/done), parsed per target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<ControlClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, alias = "dueDate", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Optional fields to reset ("owner", "due_date", "hierarchy",
    /// "severity", "likelihood", "hazard_id"). Partial payloads cannot
    /// otherwise express set-back-to-none, which both users ("remove the
    /// due date") and modify-inverses need.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clear: Vec<String>,
    /// Unrecognized keys from interpretation; surfaced for review,
    /// ignored by the applier
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommandData {
    /// True when no recognized field carries a usable value.
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.index.is_none()
            && nonblank(&self.title).is_none()
            && nonblank(&self.description).is_none()
            && nonblank(&self.note).is_none()
            && self.notes.is_none()
            && nonempty_ids(&self.step_ids).is_none()
            && self.hazard_id.is_none()
            && self.severity.is_none()
            && self.likelihood.is_none()
            && nonblank(&self.status).is_none()
            && self.hierarchy.is_none()
            && nonblank(&self.owner).is_none()
            && self.due_date.is_none()
            && self.clear.is_empty()
    }

    /// Keys the engine does not recognize, for the review UI.
    pub fn unknown_keys(&self) -> Vec<&str> {
        self.extra.keys().map(String::as_str).collect()
    }

    /// Parse the `status` payload as a control status.
    pub fn control_status(&self) -> Option<ControlStatus> {
        nonblank(&self.status).and_then(ControlStatus::from_str)
    }

    /// Parse the `status` payload as an action status.
    pub fn action_status(&self) -> Option<super::case::ActionStatus> {
        nonblank(&self.status).and_then(super::case::ActionStatus::from_str)
    }
}

/// One proposed mutation against a case document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCommand {
    pub intent: CommandIntent,
    pub target: CommandTarget,
    #[serde(default)]
    pub location: LocationRef,
    #[serde(default)]
    pub data: CommandData,
    /// Short justification shown to the human; never used for execution
    #[serde(default)]
    pub explanation: String,
}

impl UpdateCommand {
    /// Build a command with empty location/data/explanation.
    pub fn new(intent: CommandIntent, target: CommandTarget) -> Self {
        Self {
            intent,
            target,
            location: LocationRef::default(),
            data: CommandData::default(),
            explanation: String::new(),
        }
    }
}

/// Treat blank strings as absent values.
pub(crate) fn nonblank(opt: &Option<String>) -> Option<&str> {
    opt.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Treat empty id lists as absent values.
pub(crate) fn nonempty_ids(opt: &Option<Vec<Uuid>>) -> Option<&[Uuid]> {
    opt.as_deref().filter(|ids| !ids.is_empty())
}
