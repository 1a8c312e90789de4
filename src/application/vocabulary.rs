//! Command vocabulary and batch validation.
//!
//! The vocabulary defines, per document kind, which target kinds are
//! editable and, per target, which intents are legal and which
//! location/data fields they require. The three document kinds share one
//! engine; they differ only in their capability sets here.
//!
//! Validation rejects a batch as a whole on the first offending command,
//! with the command index and reason. This guards the applier from ever
//! executing structurally malformed commands, however permissive the
//! interpretation backend's output is.

use std::collections::HashSet;

use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::command::{nonblank, nonempty_ids};
use crate::domain::models::{
    CaseDocument, CaseKind, CommandData, CommandIntent, CommandTarget, UpdateCommand,
};

const ALL_TARGETS: &[CommandTarget] = &[
    CommandTarget::Step,
    CommandTarget::Hazard,
    CommandTarget::Control,
    CommandTarget::Action,
];
const JHA_TARGETS: &[CommandTarget] = &[
    CommandTarget::Step,
    CommandTarget::Hazard,
    CommandTarget::Control,
];
const INCIDENT_TARGETS: &[CommandTarget] = &[
    CommandTarget::Step,
    CommandTarget::Hazard,
    CommandTarget::Action,
];

const STEP_INTENTS: &[CommandIntent] = &[
    CommandIntent::Insert,
    CommandIntent::Modify,
    CommandIntent::Delete,
    CommandIntent::Reorder,
    CommandIntent::Annotate,
];
const CHILD_INTENTS: &[CommandIntent] = &[
    CommandIntent::Insert,
    CommandIntent::Modify,
    CommandIntent::Delete,
    CommandIntent::Annotate,
];

/// Target kinds a document of the given kind carries.
pub fn allowed_targets(kind: CaseKind) -> &'static [CommandTarget] {
    match kind {
        CaseKind::RiskAssessment => ALL_TARGETS,
        CaseKind::JobHazardAnalysis => JHA_TARGETS,
        CaseKind::Incident => INCIDENT_TARGETS,
    }
}

/// Intents legal against the given target. Reorder is step-only: the
/// step sequence is the one ordering users talk about positionally.
pub fn allowed_intents(target: CommandTarget) -> &'static [CommandIntent] {
    match target {
        CommandTarget::Step => STEP_INTENTS,
        CommandTarget::Hazard | CommandTarget::Control | CommandTarget::Action => CHILD_INTENTS,
    }
}

/// Known entity ids, tracked per collection while walking a batch.
///
/// Inserts with an explicit `data.id` extend the sets so a later command
/// in the same batch may reference an entity that exists only mid-batch;
/// deletes shrink them so references to just-deleted entities fail
/// validation the same way they would fail execution.
struct KnownIds {
    steps: HashSet<Uuid>,
    hazards: HashSet<Uuid>,
    controls: HashSet<Uuid>,
    actions: HashSet<Uuid>,
    step_count: usize,
}

impl KnownIds {
    fn from_snapshot(snapshot: &CaseDocument) -> Self {
        Self {
            steps: snapshot.steps.iter().map(|s| s.id).collect(),
            hazards: snapshot.hazards.iter().map(|h| h.id).collect(),
            controls: snapshot.controls.iter().map(|c| c.id).collect(),
            actions: snapshot.actions.iter().map(|a| a.id).collect(),
            step_count: snapshot.steps.len(),
        }
    }

    fn set_for(&mut self, target: CommandTarget) -> &mut HashSet<Uuid> {
        match target {
            CommandTarget::Step => &mut self.steps,
            CommandTarget::Hazard => &mut self.hazards,
            CommandTarget::Control => &mut self.controls,
            CommandTarget::Action => &mut self.actions,
        }
    }
}

/// Validate a command batch against the vocabulary and a snapshot.
///
/// Returns the typed error for the first offending command; on success
/// the batch is safe to hand to the applier (barring changes to the
/// document between validation and execution, which the applier still
/// detects itself).
pub fn validate_batch(
    kind: CaseKind,
    commands: &[UpdateCommand],
    snapshot: &CaseDocument,
) -> EngineResult<()> {
    let mut known = KnownIds::from_snapshot(snapshot);

    for (index, cmd) in commands.iter().enumerate() {
        validate_command(kind, index, cmd, &mut known)?;
    }
    Ok(())
}

fn invalid(index: usize, reason: impl Into<String>) -> EngineError {
    EngineError::InvalidCommand {
        index,
        reason: reason.into(),
    }
}

fn stale(index: usize, reference: impl Into<String>) -> EngineError {
    EngineError::StaleReference {
        index,
        reference: reference.into(),
    }
}

fn validate_command(
    kind: CaseKind,
    index: usize,
    cmd: &UpdateCommand,
    known: &mut KnownIds,
) -> EngineResult<()> {
    if !allowed_targets(kind).contains(&cmd.target) {
        return Err(invalid(
            index,
            format!(
                "target '{}' is not editable in {} documents",
                cmd.target.as_str(),
                kind.as_str()
            ),
        ));
    }
    if !allowed_intents(cmd.target).contains(&cmd.intent) {
        return Err(invalid(
            index,
            format!(
                "intent '{}' is not defined for target '{}'",
                cmd.intent.as_str(),
                cmd.target.as_str()
            ),
        ));
    }

    check_ratings(index, &cmd.data)?;
    check_status(index, cmd.target, &cmd.data)?;
    check_clear(index, cmd.target, &cmd.data)?;

    match cmd.intent {
        CommandIntent::Insert => validate_insert(index, cmd, known),
        CommandIntent::Modify => validate_modify(index, cmd, known),
        CommandIntent::Delete => validate_delete(index, cmd, known),
        CommandIntent::Reorder => validate_reorder(index, cmd, known),
        CommandIntent::Annotate => validate_annotate(index, cmd, known),
    }
}

fn check_ratings(index: usize, data: &CommandData) -> EngineResult<()> {
    for (name, value) in [("severity", data.severity), ("likelihood", data.likelihood)] {
        if let Some(v) = value {
            if !(1..=5).contains(&v) {
                return Err(invalid(index, format!("{name} must be between 1 and 5")));
            }
        }
    }
    Ok(())
}

fn check_status(index: usize, target: CommandTarget, data: &CommandData) -> EngineResult<()> {
    let Some(raw) = nonblank(&data.status) else {
        return Ok(());
    };
    let ok = match target {
        CommandTarget::Control => data.control_status().is_some(),
        CommandTarget::Action => data.action_status().is_some(),
        CommandTarget::Step | CommandTarget::Hazard => false,
    };
    if ok {
        Ok(())
    } else {
        Err(invalid(
            index,
            format!("status '{raw}' is not valid for target '{}'", target.as_str()),
        ))
    }
}

/// Fields that may be reset per target.
fn clearable_fields(target: CommandTarget) -> &'static [&'static str] {
    match target {
        CommandTarget::Step => &["title", "description"],
        CommandTarget::Hazard => &["severity", "likelihood"],
        CommandTarget::Control => &["hierarchy"],
        CommandTarget::Action => &["hazard_id", "owner", "due_date"],
    }
}

fn check_clear(index: usize, target: CommandTarget, data: &CommandData) -> EngineResult<()> {
    let allowed = clearable_fields(target);
    for key in &data.clear {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid(
                index,
                format!("field '{key}' cannot be cleared on target '{}'", target.as_str()),
            ));
        }
    }
    Ok(())
}

fn validate_insert(index: usize, cmd: &UpdateCommand, known: &mut KnownIds) -> EngineResult<()> {
    let data = &cmd.data;
    match cmd.target {
        CommandTarget::Step => {
            if nonblank(&data.title).is_none() && nonblank(&data.description).is_none() {
                return Err(invalid(index, "inserted step needs a title or description"));
            }
            if let Some(anchor) = cmd.location.after_step_id {
                if !known.steps.contains(&anchor) {
                    return Err(stale(index, format!("step {anchor}")));
                }
            }
            known.step_count += 1;
        }
        CommandTarget::Hazard => {
            if nonblank(&data.description).is_none() {
                return Err(invalid(index, "inserted hazard needs a description"));
            }
            let Some(step_ids) = nonempty_ids(&data.step_ids) else {
                return Err(invalid(index, "inserted hazard needs at least one step link"));
            };
            for id in step_ids {
                if !known.steps.contains(id) {
                    return Err(stale(index, format!("step {id}")));
                }
            }
        }
        CommandTarget::Control => {
            if nonblank(&data.description).is_none() {
                return Err(invalid(index, "inserted control needs a description"));
            }
            let hazard = cmd.location.hazard_id.or(data.hazard_id);
            let Some(hazard) = hazard else {
                return Err(invalid(index, "inserted control needs a hazard reference"));
            };
            if !known.hazards.contains(&hazard) {
                return Err(stale(index, format!("hazard {hazard}")));
            }
        }
        CommandTarget::Action => {
            if nonblank(&data.description).is_none() {
                return Err(invalid(index, "inserted action needs a description"));
            }
            if let Some(hazard) = data.hazard_id {
                if !known.hazards.contains(&hazard) {
                    return Err(stale(index, format!("hazard {hazard}")));
                }
            }
        }
    }

    // An explicit id makes the entity addressable later in the batch.
    if let Some(id) = data.id {
        known.set_for(cmd.target).insert(id);
    }
    Ok(())
}

fn validate_modify(index: usize, cmd: &UpdateCommand, known: &mut KnownIds) -> EngineResult<()> {
    resolve_target_ref(index, cmd, known)?;

    let data = &cmd.data;
    let has_field = match cmd.target {
        CommandTarget::Step => {
            nonblank(&data.title).is_some()
                || nonblank(&data.description).is_some()
                || data.notes.is_some()
                || !data.clear.is_empty()
        }
        CommandTarget::Hazard => {
            nonblank(&data.description).is_some()
                || nonempty_ids(&data.step_ids).is_some()
                || data.severity.is_some()
                || data.likelihood.is_some()
                || data.notes.is_some()
                || !data.clear.is_empty()
        }
        CommandTarget::Control => {
            nonblank(&data.description).is_some()
                || nonblank(&data.status).is_some()
                || data.hierarchy.is_some()
                || data.hazard_id.is_some()
                || data.notes.is_some()
                || !data.clear.is_empty()
        }
        CommandTarget::Action => {
            nonblank(&data.description).is_some()
                || data.hazard_id.is_some()
                || nonblank(&data.owner).is_some()
                || data.due_date.is_some()
                || nonblank(&data.status).is_some()
                || data.notes.is_some()
                || !data.clear.is_empty()
        }
    };
    if !has_field {
        return Err(invalid(
            index,
            format!("modify carries no usable field for target '{}'", cmd.target.as_str()),
        ));
    }

    // Link rewrites must point at known entities.
    if let Some(ids) = nonempty_ids(&data.step_ids) {
        for id in ids {
            if !known.steps.contains(id) {
                return Err(stale(index, format!("step {id}")));
            }
        }
    }
    if let Some(hazard) = data.hazard_id {
        if !known.hazards.contains(&hazard) {
            return Err(stale(index, format!("hazard {hazard}")));
        }
    }
    Ok(())
}

fn validate_delete(index: usize, cmd: &UpdateCommand, known: &mut KnownIds) -> EngineResult<()> {
    let id = resolve_target_ref(index, cmd, known)?;
    known.set_for(cmd.target).remove(&id);
    if cmd.target == CommandTarget::Step {
        known.step_count = known.step_count.saturating_sub(1);
    }
    Ok(())
}

fn validate_reorder(index: usize, cmd: &UpdateCommand, known: &mut KnownIds) -> EngineResult<()> {
    resolve_target_ref(index, cmd, known)?;
    let Some(dest) = cmd.data.index else {
        return Err(invalid(index, "reorder needs a destination index"));
    };
    if dest >= known.step_count {
        return Err(invalid(
            index,
            format!("destination index {dest} is out of range"),
        ));
    }
    Ok(())
}

fn validate_annotate(index: usize, cmd: &UpdateCommand, known: &mut KnownIds) -> EngineResult<()> {
    resolve_target_ref(index, cmd, known)?;
    if nonblank(&cmd.data.note).is_none() {
        return Err(invalid(index, "annotate needs a note"));
    }
    Ok(())
}

/// Resolve the commanded entity reference against the known-id sets.
///
/// Steps may be addressed positionally via `step_index`; a positional
/// reference cannot be tracked through intra-batch membership changes,
/// so it is only bounds-checked here and resolved for real by the
/// applier.
fn resolve_target_ref(
    index: usize,
    cmd: &UpdateCommand,
    known: &KnownIds,
) -> EngineResult<Uuid> {
    let loc = &cmd.location;
    match cmd.target {
        CommandTarget::Step => {
            if let Some(id) = loc.step_id {
                if known.steps.contains(&id) {
                    return Ok(id);
                }
                return Err(stale(index, format!("step {id}")));
            }
            if let Some(pos) = loc.step_index {
                if pos < known.step_count {
                    // Positional refs have no stable id to return; use a
                    // nil sentinel, callers only use the id for removal
                    // and nil is never a member.
                    return Ok(Uuid::nil());
                }
                return Err(stale(index, format!("step at index {pos}")));
            }
            Err(invalid(index, "step reference missing"))
        }
        CommandTarget::Hazard => loc.hazard_id.map_or_else(
            || Err(invalid(index, "hazard reference missing")),
            |id| {
                if known.hazards.contains(&id) {
                    Ok(id)
                } else {
                    Err(stale(index, format!("hazard {id}")))
                }
            },
        ),
        CommandTarget::Control => loc.control_id.map_or_else(
            || Err(invalid(index, "control reference missing")),
            |id| {
                if known.controls.contains(&id) {
                    Ok(id)
                } else {
                    Err(stale(index, format!("control {id}")))
                }
            },
        ),
        CommandTarget::Action => loc.action_id.map_or_else(
            || Err(invalid(index, "action reference missing")),
            |id| {
                if known.actions.contains(&id) {
                    Ok(id)
                } else {
                    Err(stale(index, format!("action {id}")))
                }
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CommandData, LocationRef, Step};

    fn doc_with_steps(kind: CaseKind, count: usize) -> CaseDocument {
        let mut doc = CaseDocument::new(kind, "test");
        for i in 0..count {
            doc.steps.push(Step::new(i, format!("Step {i}"), "work"));
        }
        doc
    }

    fn insert_step(description: &str) -> UpdateCommand {
        UpdateCommand {
            intent: CommandIntent::Insert,
            target: CommandTarget::Step,
            location: LocationRef::default(),
            data: CommandData {
                description: Some(description.to_string()),
                ..CommandData::default()
            },
            explanation: String::new(),
        }
    }

    #[test]
    fn test_capability_sets_per_kind() {
        assert!(allowed_targets(CaseKind::RiskAssessment).contains(&CommandTarget::Action));
        assert!(!allowed_targets(CaseKind::JobHazardAnalysis).contains(&CommandTarget::Action));
        assert!(!allowed_targets(CaseKind::Incident).contains(&CommandTarget::Control));
    }

    #[test]
    fn test_reorder_is_step_only() {
        assert!(allowed_intents(CommandTarget::Step).contains(&CommandIntent::Reorder));
        assert!(!allowed_intents(CommandTarget::Hazard).contains(&CommandIntent::Reorder));
    }

    #[test]
    fn test_target_outside_capability_set_rejected() {
        let doc = doc_with_steps(CaseKind::Incident, 1);
        let cmd = UpdateCommand {
            intent: CommandIntent::Insert,
            target: CommandTarget::Control,
            location: LocationRef::default(),
            data: CommandData {
                description: Some("guard rail".to_string()),
                ..CommandData::default()
            },
            explanation: String::new(),
        };
        let err = validate_batch(CaseKind::Incident, &[cmd], &doc).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidCommand { index: 0, .. }
        ));
    }

    #[test]
    fn test_error_carries_offending_index() {
        let doc = doc_with_steps(CaseKind::RiskAssessment, 2);
        let bad = UpdateCommand::new(CommandIntent::Modify, CommandTarget::Step);
        let err =
            validate_batch(CaseKind::RiskAssessment, &[insert_step("ok"), bad], &doc).unwrap_err();
        match err {
            EngineError::InvalidCommand { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stale_reference_rejected() {
        let doc = doc_with_steps(CaseKind::RiskAssessment, 1);
        let cmd = UpdateCommand {
            intent: CommandIntent::Delete,
            target: CommandTarget::Step,
            location: LocationRef::step(Uuid::new_v4()),
            data: CommandData::default(),
            explanation: String::new(),
        };
        let err = validate_batch(CaseKind::RiskAssessment, &[cmd], &doc).unwrap_err();
        assert!(matches!(err, EngineError::StaleReference { index: 0, .. }));
    }

    #[test]
    fn test_intra_batch_insert_reference_allowed() {
        let doc = doc_with_steps(CaseKind::RiskAssessment, 1);
        let new_step = Uuid::new_v4();

        let mut insert = insert_step("clean up");
        insert.data.id = Some(new_step);

        let hazard = UpdateCommand {
            intent: CommandIntent::Insert,
            target: CommandTarget::Hazard,
            location: LocationRef::default(),
            data: CommandData {
                description: Some("dust".to_string()),
                step_ids: Some(vec![new_step]),
                ..CommandData::default()
            },
            explanation: String::new(),
        };

        validate_batch(CaseKind::RiskAssessment, &[insert, hazard], &doc)
            .expect("forward reference to inserted step should validate");
    }

    #[test]
    fn test_reference_to_deleted_entity_rejected() {
        let doc = doc_with_steps(CaseKind::RiskAssessment, 2);
        let victim = doc.steps[0].id;

        let delete = UpdateCommand {
            intent: CommandIntent::Delete,
            target: CommandTarget::Step,
            location: LocationRef::step(victim),
            data: CommandData::default(),
            explanation: String::new(),
        };
        let annotate = UpdateCommand {
            intent: CommandIntent::Annotate,
            target: CommandTarget::Step,
            location: LocationRef::step(victim),
            data: CommandData {
                note: Some("too late".to_string()),
                ..CommandData::default()
            },
            explanation: String::new(),
        };

        let err = validate_batch(CaseKind::RiskAssessment, &[delete, annotate], &doc).unwrap_err();
        assert!(matches!(err, EngineError::StaleReference { index: 1, .. }));
    }

    #[test]
    fn test_hazard_insert_needs_step_link() {
        let doc = doc_with_steps(CaseKind::RiskAssessment, 1);
        let cmd = UpdateCommand {
            intent: CommandIntent::Insert,
            target: CommandTarget::Hazard,
            location: LocationRef::default(),
            data: CommandData {
                description: Some("noise".to_string()),
                ..CommandData::default()
            },
            explanation: String::new(),
        };
        let err = validate_batch(CaseKind::RiskAssessment, &[cmd], &doc).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCommand { .. }));
    }

    #[test]
    fn test_modify_without_fields_rejected() {
        let doc = doc_with_steps(CaseKind::RiskAssessment, 1);
        let cmd = UpdateCommand {
            intent: CommandIntent::Modify,
            target: CommandTarget::Step,
            location: LocationRef::step(doc.steps[0].id),
            data: CommandData::default(),
            explanation: String::new(),
        };
        let err = validate_batch(CaseKind::RiskAssessment, &[cmd], &doc).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCommand { .. }));
    }

    #[test]
    fn test_rating_bounds() {
        let mut doc = doc_with_steps(CaseKind::RiskAssessment, 1);
        doc.hazards.push(crate::domain::models::Hazard {
            id: Uuid::new_v4(),
            order: 0,
            description: "slip".to_string(),
            step_ids: vec![doc.steps[0].id],
            severity: None,
            likelihood: None,
            notes: vec![],
        });
        let cmd = UpdateCommand {
            intent: CommandIntent::Modify,
            target: CommandTarget::Hazard,
            location: LocationRef::hazard(doc.hazards[0].id),
            data: CommandData {
                severity: Some(9),
                ..CommandData::default()
            },
            explanation: String::new(),
        };
        let err = validate_batch(CaseKind::RiskAssessment, &[cmd], &doc).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCommand { .. }));
    }

    #[test]
    fn test_bad_status_string_rejected() {
        let mut doc = doc_with_steps(CaseKind::RiskAssessment, 1);
        doc.actions.push(crate::domain::models::Action {
            id: Uuid::new_v4(),
            order: 0,
            description: "fix ladder".to_string(),
            hazard_id: None,
            owner: None,
            due_date: None,
            status: crate::domain::models::ActionStatus::Open,
            notes: vec![],
        });
        let cmd = UpdateCommand {
            intent: CommandIntent::Modify,
            target: CommandTarget::Action,
            location: LocationRef::action(doc.actions[0].id),
            data: CommandData {
                status: Some("finished".to_string()),
                ..CommandData::default()
            },
            explanation: String::new(),
        };
        let err = validate_batch(CaseKind::RiskAssessment, &[cmd], &doc).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCommand { .. }));
    }
}
