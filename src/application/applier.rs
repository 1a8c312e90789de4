//! Command applier.
//!
//! Executes a validated batch strictly in array order against a working
//! copy of the document, so a later command may reference an entity
//! inserted earlier in the same batch. For every executed command an
//! inverse is synthesized: an insert becomes a delete, a delete becomes
//! an insert carrying the captured prior values, a modify becomes a
//! modify with the pre-image of the changed fields, a reorder becomes a
//! reorder with the pre-image position. The inverse list is reversed
//! before being returned, since undo replays inverses in reverse
//! application order.
//!
//! Atomicity: the caller's document is never touched. Any failure drops
//! the working copy and returns the error, so partial application is
//! not observable. Sibling order indices are renumbered to contiguous
//! 0..n-1 after every structural change.

use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::command::{nonblank, nonempty_ids};
use crate::domain::models::{
    Action, CaseDocument, CommandData, CommandIntent, CommandTarget, Control, Hazard, LocationRef,
    Step, UpdateCommand,
};

/// Result of a successful batch application.
#[derive(Debug, Clone)]
pub struct AppliedBatch {
    /// The mutated document
    pub document: CaseDocument,
    /// Inverse commands, already in replay order
    pub inverse: Vec<UpdateCommand>,
}

/// Apply a command batch to a document.
///
/// Commands run in the order interpretation chose; the result carries
/// the new document and the inverse batch for the undo journal.
pub fn apply_batch(
    document: &CaseDocument,
    commands: &[UpdateCommand],
) -> EngineResult<AppliedBatch> {
    let mut working = document.clone();
    let mut inverse = Vec::with_capacity(commands.len());

    for (index, cmd) in commands.iter().enumerate() {
        debug!(
            index,
            intent = cmd.intent.as_str(),
            target = cmd.target.as_str(),
            "applying command"
        );
        let inv = execute(&mut working, cmd)
            .map_err(|reason| EngineError::ApplyFailed { index, reason })?;
        inverse.push(inv);
    }

    inverse.reverse();
    debug_assert!(working.orders_contiguous());
    Ok(AppliedBatch {
        document: working,
        inverse,
    })
}

fn execute(doc: &mut CaseDocument, cmd: &UpdateCommand) -> Result<UpdateCommand, String> {
    match cmd.target {
        CommandTarget::Step => execute_step(doc, cmd),
        CommandTarget::Hazard => execute_hazard(doc, cmd),
        CommandTarget::Control => execute_control(doc, cmd),
        CommandTarget::Action => execute_action(doc, cmd),
    }
}

// ---------------------------------------------------------------------
// shared helpers

fn fresh_id(data: &CommandData) -> Uuid {
    data.id.unwrap_or_else(Uuid::new_v4)
}

fn renumber_steps(doc: &mut CaseDocument) {
    for (i, s) in doc.steps.iter_mut().enumerate() {
        s.order = i;
    }
}

fn renumber_hazards(doc: &mut CaseDocument) {
    for (i, h) in doc.hazards.iter_mut().enumerate() {
        h.order = i;
    }
}

fn renumber_controls(doc: &mut CaseDocument) {
    for (i, c) in doc.controls.iter_mut().enumerate() {
        c.order = i;
    }
}

fn renumber_actions(doc: &mut CaseDocument) {
    for (i, a) in doc.actions.iter_mut().enumerate() {
        a.order = i;
    }
}

fn find_step_index(doc: &CaseDocument, loc: &LocationRef) -> Result<usize, String> {
    if let Some(id) = loc.step_id {
        return doc
            .steps
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| format!("step {id} not found"));
    }
    if let Some(pos) = loc.step_index {
        if pos < doc.steps.len() {
            return Ok(pos);
        }
        return Err(format!("step index {pos} out of range"));
    }
    Err("step reference missing".to_string())
}

fn find_hazard_index(doc: &CaseDocument, loc: &LocationRef) -> Result<usize, String> {
    let id = loc.hazard_id.ok_or("hazard reference missing")?;
    doc.hazards
        .iter()
        .position(|h| h.id == id)
        .ok_or_else(|| format!("hazard {id} not found"))
}

fn find_control_index(doc: &CaseDocument, loc: &LocationRef) -> Result<usize, String> {
    let id = loc.control_id.ok_or("control reference missing")?;
    doc.controls
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| format!("control {id} not found"))
}

fn find_action_index(doc: &CaseDocument, loc: &LocationRef) -> Result<usize, String> {
    let id = loc.action_id.ok_or("action reference missing")?;
    doc.actions
        .iter()
        .position(|a| a.id == id)
        .ok_or_else(|| format!("action {id} not found"))
}

fn inverse_delete(target: CommandTarget, location: LocationRef) -> UpdateCommand {
    UpdateCommand {
        intent: CommandIntent::Delete,
        target,
        location,
        data: CommandData::default(),
        explanation: String::new(),
    }
}

fn inverse_modify(target: CommandTarget, location: LocationRef, data: CommandData) -> UpdateCommand {
    UpdateCommand {
        intent: CommandIntent::Modify,
        target,
        location,
        data,
        explanation: String::new(),
    }
}

fn inverse_insert(target: CommandTarget, data: CommandData) -> UpdateCommand {
    UpdateCommand {
        intent: CommandIntent::Insert,
        target,
        location: LocationRef::default(),
        data,
        explanation: String::new(),
    }
}

/// Record a step text-field change: restore the old value, or clear the
/// field when the pre-image was empty (a partial payload cannot carry an
/// empty string).
fn preimage_text(pre: &mut CommandData, field: &'static str, old: &str) {
    if old.is_empty() {
        pre.clear.push(field.to_string());
    } else if field == "title" {
        pre.title = Some(old.to_string());
    } else {
        pre.description = Some(old.to_string());
    }
}

// ---------------------------------------------------------------------
// steps

fn step_insert_pos(doc: &CaseDocument, cmd: &UpdateCommand) -> Result<usize, String> {
    if let Some(i) = cmd.data.index {
        return Ok(i.min(doc.steps.len()));
    }
    if let Some(anchor) = cmd.location.after_step_id {
        let idx = doc
            .steps
            .iter()
            .position(|s| s.id == anchor)
            .ok_or_else(|| format!("step {anchor} not found"))?;
        return Ok(idx + 1);
    }
    Ok(doc.steps.len())
}

fn execute_step(doc: &mut CaseDocument, cmd: &UpdateCommand) -> Result<UpdateCommand, String> {
    match cmd.intent {
        CommandIntent::Insert => {
            let id = fresh_id(&cmd.data);
            if doc.step(id).is_some() {
                return Err(format!("step {id} already exists"));
            }
            let pos = step_insert_pos(doc, cmd)?;
            let step = Step {
                id,
                order: pos,
                title: cmd.data.title.clone().unwrap_or_default(),
                description: cmd.data.description.clone().unwrap_or_default(),
                notes: cmd.data.notes.clone().unwrap_or_default(),
            };
            doc.steps.insert(pos, step);
            renumber_steps(doc);
            Ok(inverse_delete(CommandTarget::Step, LocationRef::step(id)))
        }
        CommandIntent::Modify => {
            let idx = find_step_index(doc, &cmd.location)?;
            let step = &mut doc.steps[idx];
            let id = step.id;
            let mut pre = CommandData::default();

            if let Some(title) = nonblank(&cmd.data.title) {
                if step.title != title {
                    preimage_text(&mut pre, "title", &step.title);
                    step.title = title.to_string();
                }
            }
            if let Some(desc) = nonblank(&cmd.data.description) {
                if step.description != desc {
                    preimage_text(&mut pre, "description", &step.description);
                    step.description = desc.to_string();
                }
            }
            if let Some(notes) = &cmd.data.notes {
                if &step.notes != notes {
                    pre.notes = Some(step.notes.clone());
                    step.notes = notes.clone();
                }
            }
            for field in &cmd.data.clear {
                match field.as_str() {
                    "title" if !step.title.is_empty() => {
                        pre.title = Some(std::mem::take(&mut step.title));
                    }
                    "description" if !step.description.is_empty() => {
                        pre.description = Some(std::mem::take(&mut step.description));
                    }
                    _ => {}
                }
            }
            Ok(inverse_modify(
                CommandTarget::Step,
                LocationRef::step(id),
                pre,
            ))
        }
        CommandIntent::Delete => {
            let idx = find_step_index(doc, &cmd.location)?;
            let id = doc.steps[idx].id;
            if let Some(hazard) = doc.hazards.iter().find(|h| h.step_ids.contains(&id)) {
                return Err(format!(
                    "step {id} is still referenced by hazard {}",
                    hazard.id
                ));
            }
            let step = doc.steps.remove(idx);
            renumber_steps(doc);
            Ok(inverse_insert(
                CommandTarget::Step,
                CommandData {
                    id: Some(step.id),
                    index: Some(idx),
                    title: Some(step.title),
                    description: Some(step.description),
                    notes: Some(step.notes),
                    ..CommandData::default()
                },
            ))
        }
        CommandIntent::Reorder => {
            let idx = find_step_index(doc, &cmd.location)?;
            let dest = cmd.data.index.ok_or("reorder needs a destination index")?;
            let dest = dest.min(doc.steps.len().saturating_sub(1));
            let step = doc.steps.remove(idx);
            let id = step.id;
            doc.steps.insert(dest, step);
            renumber_steps(doc);
            Ok(UpdateCommand {
                intent: CommandIntent::Reorder,
                target: CommandTarget::Step,
                location: LocationRef::step(id),
                data: CommandData {
                    index: Some(idx),
                    ..CommandData::default()
                },
                explanation: String::new(),
            })
        }
        CommandIntent::Annotate => {
            let idx = find_step_index(doc, &cmd.location)?;
            let note = nonblank(&cmd.data.note).ok_or("annotate needs a note")?;
            let step = &mut doc.steps[idx];
            let pre = CommandData {
                notes: Some(step.notes.clone()),
                ..CommandData::default()
            };
            step.notes.push(note.to_string());
            Ok(inverse_modify(
                CommandTarget::Step,
                LocationRef::step(step.id),
                pre,
            ))
        }
    }
}

// ---------------------------------------------------------------------
// hazards

fn execute_hazard(doc: &mut CaseDocument, cmd: &UpdateCommand) -> Result<UpdateCommand, String> {
    match cmd.intent {
        CommandIntent::Insert => {
            let id = fresh_id(&cmd.data);
            if doc.hazard(id).is_some() {
                return Err(format!("hazard {id} already exists"));
            }
            let step_ids = nonempty_ids(&cmd.data.step_ids)
                .ok_or("inserted hazard needs at least one step link")?
                .to_vec();
            for step_id in &step_ids {
                if doc.step(*step_id).is_none() {
                    return Err(format!("step {step_id} not found"));
                }
            }
            let pos = cmd.data.index.map_or(doc.hazards.len(), |i| {
                i.min(doc.hazards.len())
            });
            let hazard = Hazard {
                id,
                order: pos,
                description: cmd.data.description.clone().unwrap_or_default(),
                step_ids,
                severity: cmd.data.severity,
                likelihood: cmd.data.likelihood,
                notes: cmd.data.notes.clone().unwrap_or_default(),
            };
            doc.hazards.insert(pos, hazard);
            renumber_hazards(doc);
            Ok(inverse_delete(CommandTarget::Hazard, LocationRef::hazard(id)))
        }
        CommandIntent::Modify => {
            // Link rewrites are checked before borrowing the hazard.
            if let Some(ids) = nonempty_ids(&cmd.data.step_ids) {
                for step_id in ids {
                    if doc.step(*step_id).is_none() {
                        return Err(format!("step {step_id} not found"));
                    }
                }
            }
            let idx = find_hazard_index(doc, &cmd.location)?;
            let hazard = &mut doc.hazards[idx];
            let id = hazard.id;
            let mut pre = CommandData::default();

            if let Some(desc) = nonblank(&cmd.data.description) {
                if hazard.description != desc {
                    pre.description = Some(hazard.description.clone());
                    hazard.description = desc.to_string();
                }
            }
            if let Some(ids) = nonempty_ids(&cmd.data.step_ids) {
                if hazard.step_ids != ids {
                    pre.step_ids = Some(hazard.step_ids.clone());
                    hazard.step_ids = ids.to_vec();
                }
            }
            if let Some(severity) = cmd.data.severity {
                if hazard.severity != Some(severity) {
                    match hazard.severity {
                        Some(old) => pre.severity = Some(old),
                        None => pre.clear.push("severity".to_string()),
                    }
                    hazard.severity = Some(severity);
                }
            }
            if let Some(likelihood) = cmd.data.likelihood {
                if hazard.likelihood != Some(likelihood) {
                    match hazard.likelihood {
                        Some(old) => pre.likelihood = Some(old),
                        None => pre.clear.push("likelihood".to_string()),
                    }
                    hazard.likelihood = Some(likelihood);
                }
            }
            if let Some(notes) = &cmd.data.notes {
                if &hazard.notes != notes {
                    pre.notes = Some(hazard.notes.clone());
                    hazard.notes = notes.clone();
                }
            }
            for field in &cmd.data.clear {
                match field.as_str() {
                    "severity" => {
                        if let Some(old) = hazard.severity.take() {
                            pre.severity = Some(old);
                        }
                    }
                    "likelihood" => {
                        if let Some(old) = hazard.likelihood.take() {
                            pre.likelihood = Some(old);
                        }
                    }
                    _ => {}
                }
            }
            Ok(inverse_modify(
                CommandTarget::Hazard,
                LocationRef::hazard(id),
                pre,
            ))
        }
        CommandIntent::Delete => {
            let idx = find_hazard_index(doc, &cmd.location)?;
            let id = doc.hazards[idx].id;
            if let Some(control) = doc.controls.iter().find(|c| c.hazard_id == id) {
                return Err(format!(
                    "hazard {id} is still referenced by control {}",
                    control.id
                ));
            }
            if let Some(action) = doc.actions.iter().find(|a| a.hazard_id == Some(id)) {
                return Err(format!(
                    "hazard {id} is still referenced by action {}",
                    action.id
                ));
            }
            let hazard = doc.hazards.remove(idx);
            renumber_hazards(doc);
            Ok(inverse_insert(
                CommandTarget::Hazard,
                CommandData {
                    id: Some(hazard.id),
                    index: Some(idx),
                    description: Some(hazard.description),
                    step_ids: Some(hazard.step_ids),
                    severity: hazard.severity,
                    likelihood: hazard.likelihood,
                    notes: Some(hazard.notes),
                    ..CommandData::default()
                },
            ))
        }
        CommandIntent::Reorder => Err("reorder is not defined for hazards".to_string()),
        CommandIntent::Annotate => {
            let idx = find_hazard_index(doc, &cmd.location)?;
            let note = nonblank(&cmd.data.note).ok_or("annotate needs a note")?;
            let hazard = &mut doc.hazards[idx];
            let pre = CommandData {
                notes: Some(hazard.notes.clone()),
                ..CommandData::default()
            };
            hazard.notes.push(note.to_string());
            Ok(inverse_modify(
                CommandTarget::Hazard,
                LocationRef::hazard(hazard.id),
                pre,
            ))
        }
    }
}

// ---------------------------------------------------------------------
// controls

fn execute_control(doc: &mut CaseDocument, cmd: &UpdateCommand) -> Result<UpdateCommand, String> {
    match cmd.intent {
        CommandIntent::Insert => {
            let id = fresh_id(&cmd.data);
            if doc.control(id).is_some() {
                return Err(format!("control {id} already exists"));
            }
            let hazard_id = cmd
                .location
                .hazard_id
                .or(cmd.data.hazard_id)
                .ok_or("inserted control needs a hazard reference")?;
            if doc.hazard(hazard_id).is_none() {
                return Err(format!("hazard {hazard_id} not found"));
            }
            let pos = cmd.data.index.map_or(doc.controls.len(), |i| {
                i.min(doc.controls.len())
            });
            let control = Control {
                id,
                order: pos,
                hazard_id,
                description: cmd.data.description.clone().unwrap_or_default(),
                status: cmd.data.control_status().unwrap_or_default(),
                hierarchy: cmd.data.hierarchy,
                notes: cmd.data.notes.clone().unwrap_or_default(),
            };
            doc.controls.insert(pos, control);
            renumber_controls(doc);
            Ok(inverse_delete(
                CommandTarget::Control,
                LocationRef::control(id),
            ))
        }
        CommandIntent::Modify => {
            if let Some(hazard_id) = cmd.data.hazard_id {
                if doc.hazard(hazard_id).is_none() {
                    return Err(format!("hazard {hazard_id} not found"));
                }
            }
            let idx = find_control_index(doc, &cmd.location)?;
            let control = &mut doc.controls[idx];
            let id = control.id;
            let mut pre = CommandData::default();

            if let Some(desc) = nonblank(&cmd.data.description) {
                if control.description != desc {
                    pre.description = Some(control.description.clone());
                    control.description = desc.to_string();
                }
            }
            if let Some(status) = cmd.data.control_status() {
                if control.status != status {
                    pre.status = Some(control.status.as_str().to_string());
                    control.status = status;
                }
            }
            if let Some(hierarchy) = cmd.data.hierarchy {
                if control.hierarchy != Some(hierarchy) {
                    match control.hierarchy {
                        Some(old) => pre.hierarchy = Some(old),
                        None => pre.clear.push("hierarchy".to_string()),
                    }
                    control.hierarchy = Some(hierarchy);
                }
            }
            if let Some(hazard_id) = cmd.data.hazard_id {
                if control.hazard_id != hazard_id {
                    pre.hazard_id = Some(control.hazard_id);
                    control.hazard_id = hazard_id;
                }
            }
            if let Some(notes) = &cmd.data.notes {
                if &control.notes != notes {
                    pre.notes = Some(control.notes.clone());
                    control.notes = notes.clone();
                }
            }
            if cmd.data.clear.iter().any(|f| f == "hierarchy") {
                if let Some(old) = control.hierarchy.take() {
                    pre.hierarchy = Some(old);
                }
            }
            Ok(inverse_modify(
                CommandTarget::Control,
                LocationRef::control(id),
                pre,
            ))
        }
        CommandIntent::Delete => {
            let idx = find_control_index(doc, &cmd.location)?;
            let control = doc.controls.remove(idx);
            renumber_controls(doc);
            Ok(inverse_insert(
                CommandTarget::Control,
                CommandData {
                    id: Some(control.id),
                    index: Some(idx),
                    description: Some(control.description),
                    hazard_id: Some(control.hazard_id),
                    status: Some(control.status.as_str().to_string()),
                    hierarchy: control.hierarchy,
                    notes: Some(control.notes),
                    ..CommandData::default()
                },
            ))
        }
        CommandIntent::Reorder => Err("reorder is not defined for controls".to_string()),
        CommandIntent::Annotate => {
            let idx = find_control_index(doc, &cmd.location)?;
            let note = nonblank(&cmd.data.note).ok_or("annotate needs a note")?;
            let control = &mut doc.controls[idx];
            let pre = CommandData {
                notes: Some(control.notes.clone()),
                ..CommandData::default()
            };
            control.notes.push(note.to_string());
            Ok(inverse_modify(
                CommandTarget::Control,
                LocationRef::control(control.id),
                pre,
            ))
        }
    }
}

// ---------------------------------------------------------------------
// actions

fn execute_action(doc: &mut CaseDocument, cmd: &UpdateCommand) -> Result<UpdateCommand, String> {
    match cmd.intent {
        CommandIntent::Insert => {
            let id = fresh_id(&cmd.data);
            if doc.action(id).is_some() {
                return Err(format!("action {id} already exists"));
            }
            if let Some(hazard_id) = cmd.data.hazard_id {
                if doc.hazard(hazard_id).is_none() {
                    return Err(format!("hazard {hazard_id} not found"));
                }
            }
            let pos = cmd.data.index.map_or(doc.actions.len(), |i| {
                i.min(doc.actions.len())
            });
            let action = Action {
                id,
                order: pos,
                description: cmd.data.description.clone().unwrap_or_default(),
                hazard_id: cmd.data.hazard_id,
                owner: cmd.data.owner.clone(),
                due_date: cmd.data.due_date,
                status: cmd.data.action_status().unwrap_or_default(),
                notes: cmd.data.notes.clone().unwrap_or_default(),
            };
            doc.actions.insert(pos, action);
            renumber_actions(doc);
            Ok(inverse_delete(
                CommandTarget::Action,
                LocationRef::action(id),
            ))
        }
        CommandIntent::Modify => {
            if let Some(hazard_id) = cmd.data.hazard_id {
                if doc.hazard(hazard_id).is_none() {
                    return Err(format!("hazard {hazard_id} not found"));
                }
            }
            let idx = find_action_index(doc, &cmd.location)?;
            let action = &mut doc.actions[idx];
            let id = action.id;
            let mut pre = CommandData::default();

            if let Some(desc) = nonblank(&cmd.data.description) {
                if action.description != desc {
                    pre.description = Some(action.description.clone());
                    action.description = desc.to_string();
                }
            }
            if let Some(hazard_id) = cmd.data.hazard_id {
                if action.hazard_id != Some(hazard_id) {
                    match action.hazard_id {
                        Some(old) => pre.hazard_id = Some(old),
                        None => pre.clear.push("hazard_id".to_string()),
                    }
                    action.hazard_id = Some(hazard_id);
                }
            }
            if let Some(owner) = nonblank(&cmd.data.owner) {
                if action.owner.as_deref() != Some(owner) {
                    match &action.owner {
                        Some(old) => pre.owner = Some(old.clone()),
                        None => pre.clear.push("owner".to_string()),
                    }
                    action.owner = Some(owner.to_string());
                }
            }
            if let Some(due) = cmd.data.due_date {
                if action.due_date != Some(due) {
                    match action.due_date {
                        Some(old) => pre.due_date = Some(old),
                        None => pre.clear.push("due_date".to_string()),
                    }
                    action.due_date = Some(due);
                }
            }
            if let Some(status) = cmd.data.action_status() {
                if action.status != status {
                    pre.status = Some(action.status.as_str().to_string());
                    action.status = status;
                }
            }
            if let Some(notes) = &cmd.data.notes {
                if &action.notes != notes {
                    pre.notes = Some(action.notes.clone());
                    action.notes = notes.clone();
                }
            }
            for field in &cmd.data.clear {
                match field.as_str() {
                    "hazard_id" => {
                        if let Some(old) = action.hazard_id.take() {
                            pre.hazard_id = Some(old);
                        }
                    }
                    "owner" => {
                        if let Some(old) = action.owner.take() {
                            pre.owner = Some(old);
                        }
                    }
                    "due_date" => {
                        if let Some(old) = action.due_date.take() {
                            pre.due_date = Some(old);
                        }
                    }
                    _ => {}
                }
            }
            Ok(inverse_modify(
                CommandTarget::Action,
                LocationRef::action(id),
                pre,
            ))
        }
        CommandIntent::Delete => {
            let idx = find_action_index(doc, &cmd.location)?;
            let action = doc.actions.remove(idx);
            renumber_actions(doc);
            Ok(inverse_insert(
                CommandTarget::Action,
                CommandData {
                    id: Some(action.id),
                    index: Some(idx),
                    description: Some(action.description),
                    hazard_id: action.hazard_id,
                    owner: action.owner,
                    due_date: action.due_date,
                    status: Some(action.status.as_str().to_string()),
                    notes: Some(action.notes),
                    ..CommandData::default()
                },
            ))
        }
        CommandIntent::Reorder => Err("reorder is not defined for actions".to_string()),
        CommandIntent::Annotate => {
            let idx = find_action_index(doc, &cmd.location)?;
            let note = nonblank(&cmd.data.note).ok_or("annotate needs a note")?;
            let action = &mut doc.actions[idx];
            let pre = CommandData {
                notes: Some(action.notes.clone()),
                ..CommandData::default()
            };
            action.notes.push(note.to_string());
            Ok(inverse_modify(
                CommandTarget::Action,
                LocationRef::action(action.id),
                pre,
            ))
        }
    }
}
