//! Workflow phase context.
//!
//! The hosting workflow moves a case document through a fixed sequence of
//! editing phases. The phase is passed verbatim to interpretation as
//! disambiguating context and never drives engine logic directly.

use serde::{Deserialize, Serialize};

/// Stage of the document workflow the user is currently editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    /// Describing the work process step by step
    ProcessDescription,
    /// Identifying hazards against the described steps
    HazardIdentification,
    /// Selecting existing and proposed controls
    ControlPlanning,
    /// Planning follow-up actions with owners and due dates
    ActionPlanning,
    /// Final review of the whole document
    Review,
}

impl Default for WorkflowPhase {
    fn default() -> Self {
        Self::ProcessDescription
    }
}

impl WorkflowPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProcessDescription => "process_description",
            Self::HazardIdentification => "hazard_identification",
            Self::ControlPlanning => "control_planning",
            Self::ActionPlanning => "action_planning",
            Self::Review => "review",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "process_description" => Some(Self::ProcessDescription),
            "hazard_identification" => Some(Self::HazardIdentification),
            "control_planning" => Some(Self::ControlPlanning),
            "action_planning" => Some(Self::ActionPlanning),
            "review" => Some(Self::Review),
            _ => None,
        }
    }
}
