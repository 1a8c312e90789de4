//! Case document domain model.
//!
//! A case document is the aggregate root being edited: a risk assessment,
//! a job-hazard analysis, or an incident report. All variants share the
//! same nested structure of steps, hazards, controls, and actions; which
//! target kinds a variant actually carries is decided by the command
//! vocabulary, not by the model.
//!
//! Every child entity has a stable `id` and an explicit `order` index.
//! Order is significant: the applier keeps indices contiguous and
//! zero-based within each sibling group across every mutation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of safety document a case holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    /// Risk assessment: full step/hazard/control/action structure
    RiskAssessment,
    /// Job-hazard analysis: steps, hazards, and controls
    JobHazardAnalysis,
    /// Incident report: event steps, contributing hazards, corrective actions
    Incident,
}

impl CaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RiskAssessment => "risk_assessment",
            Self::JobHazardAnalysis => "job_hazard_analysis",
            Self::Incident => "incident",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "risk_assessment" => Some(Self::RiskAssessment),
            "job_hazard_analysis" | "jha" => Some(Self::JobHazardAnalysis),
            "incident" => Some(Self::Incident),
            _ => None,
        }
    }
}

/// Whether a control is already in place or proposed as an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    Existing,
    Proposed,
}

impl Default for ControlStatus {
    fn default() -> Self {
        Self::Existing
    }
}

impl ControlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Existing => "existing",
            Self::Proposed => "proposed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "existing" => Some(Self::Existing),
            "proposed" => Some(Self::Proposed),
            _ => None,
        }
    }
}

/// Hierarchy-of-controls class, most to least effective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlClass {
    Elimination,
    Substitution,
    Engineering,
    Administrative,
    Ppe,
}

impl ControlClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elimination => "elimination",
            Self::Substitution => "substitution",
            Self::Engineering => "engineering",
            Self::Administrative => "administrative",
            Self::Ppe => "ppe",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "elimination" => Some(Self::Elimination),
            "substitution" => Some(Self::Substitution),
            "engineering" => Some(Self::Engineering),
            "administrative" => Some(Self::Administrative),
            "ppe" => Some(Self::Ppe),
            _ => None,
        }
    }
}

/// Progress status of a follow-up action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Open,
    InProgress,
    Done,
}

impl Default for ActionStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// One step of the described work process (or event timeline for incidents).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    /// Zero-based position among sibling steps
    pub order: usize,
    #[serde(default)]
    pub title: String,
    pub description: String,
    /// Free-form annotations added during review
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Step {
    /// Create a step with a fresh id at the given position.
    pub fn new(order: usize, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order,
            title: title.into(),
            description: description.into(),
            notes: Vec::new(),
        }
    }
}

/// A hazard identified against one or more steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub id: Uuid,
    pub order: usize,
    pub description: String,
    /// Steps this hazard applies to; never empty
    pub step_ids: Vec<Uuid>,
    /// Severity rating 1-5, where rated
    #[serde(default)]
    pub severity: Option<u8>,
    /// Likelihood rating 1-5, where rated
    #[serde(default)]
    pub likelihood: Option<u8>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// A control mitigating a hazard, existing or proposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub id: Uuid,
    pub order: usize,
    /// Hazard this control mitigates
    pub hazard_id: Uuid,
    pub description: String,
    #[serde(default)]
    pub status: ControlStatus,
    /// Hierarchy-of-controls class, where tagged
    #[serde(default)]
    pub hierarchy: Option<ControlClass>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// A follow-up action, optionally linked to a hazard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub order: usize,
    pub description: String,
    #[serde(default)]
    pub hazard_id: Option<Uuid>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: ActionStatus,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// The hierarchical safety record being edited.
///
/// The engine never caches one of these: the hosting shell passes the
/// authoritative snapshot into every interpretation and apply call and
/// owns persistence of the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDocument {
    pub id: Uuid,
    pub kind: CaseKind,
    pub title: String,
    /// Set at creation by the shell; the engine leaves it untouched
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub hazards: Vec<Hazard>,
    #[serde(default)]
    pub controls: Vec<Control>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl CaseDocument {
    /// Create an empty document of the given kind.
    pub fn new(kind: CaseKind, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            created_at: Utc::now(),
            steps: Vec::new(),
            hazards: Vec::new(),
            controls: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn step(&self, id: Uuid) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn hazard(&self, id: Uuid) -> Option<&Hazard> {
        self.hazards.iter().find(|h| h.id == id)
    }

    pub fn control(&self, id: Uuid) -> Option<&Control> {
        self.controls.iter().find(|c| c.id == id)
    }

    pub fn action(&self, id: Uuid) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Check that order indices are contiguous 0..n-1 in every sibling group.
    pub fn orders_contiguous(&self) -> bool {
        fn contiguous(orders: impl Iterator<Item = usize>, len: usize) -> bool {
            let mut seen = vec![false; len];
            for o in orders {
                if o >= len || seen[o] {
                    return false;
                }
                seen[o] = true;
            }
            true
        }
        contiguous(self.steps.iter().map(|s| s.order), self.steps.len())
            && contiguous(self.hazards.iter().map(|h| h.order), self.hazards.len())
            && contiguous(self.controls.iter().map(|c| c.order), self.controls.len())
            && contiguous(self.actions.iter().map(|a| a.order), self.actions.len())
    }
}
