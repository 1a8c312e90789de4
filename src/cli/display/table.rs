//! Table rendering for documents and proposals.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use uuid::Uuid;

use crate::domain::models::{CaseDocument, CommandIntent, CommandTarget, UpdateCommand};

/// Standard list table: no borders, dynamic widths, uppercase headers.
fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Short id form used everywhere in list output.
fn short(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Render the steps of a document.
pub fn steps_table(doc: &CaseDocument) -> Table {
    let mut table = list_table(&["#", "id", "title", "description", "notes"]);
    for step in &doc.steps {
        table.add_row(vec![
            step.order.to_string(),
            short(step.id),
            step.title.clone(),
            step.description.clone(),
            step.notes.len().to_string(),
        ]);
    }
    table
}

/// Render the hazards of a document.
pub fn hazards_table(doc: &CaseDocument) -> Table {
    let mut table = list_table(&["#", "id", "description", "steps", "sev", "lik"]);
    for hazard in &doc.hazards {
        let steps = hazard
            .step_ids
            .iter()
            .map(|id| short(*id))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            hazard.order.to_string(),
            short(hazard.id),
            hazard.description.clone(),
            steps,
            hazard.severity.map_or_else(String::new, |s| s.to_string()),
            hazard.likelihood.map_or_else(String::new, |l| l.to_string()),
        ]);
    }
    table
}

/// Render the controls of a document.
pub fn controls_table(doc: &CaseDocument) -> Table {
    let mut table = list_table(&["#", "id", "hazard", "description", "status", "class"]);
    for control in &doc.controls {
        table.add_row(vec![
            control.order.to_string(),
            short(control.id),
            short(control.hazard_id),
            control.description.clone(),
            control.status.as_str().to_string(),
            control
                .hierarchy
                .map_or_else(String::new, |h| h.as_str().to_string()),
        ]);
    }
    table
}

/// Render the actions of a document.
pub fn actions_table(doc: &CaseDocument) -> Table {
    let mut table = list_table(&["#", "id", "description", "owner", "due", "status"]);
    for action in &doc.actions {
        table.add_row(vec![
            action.order.to_string(),
            short(action.id),
            action.description.clone(),
            action.owner.clone().unwrap_or_default(),
            action
                .due_date
                .map_or_else(String::new, |d| d.to_string()),
            action.status.as_str().to_string(),
        ]);
    }
    table
}

/// Render a proposed command batch for review.
pub fn proposal_table(commands: &[UpdateCommand]) -> Table {
    let mut table = list_table(&["#", "intent", "target", "detail", "explanation"]);
    for (i, cmd) in commands.iter().enumerate() {
        table.add_row(vec![
            i.to_string(),
            cmd.intent.as_str().to_string(),
            cmd.target.as_str().to_string(),
            describe_command(cmd),
            cmd.explanation.clone(),
        ]);
    }
    table
}

/// One-line summary of what a command would change.
fn describe_command(cmd: &UpdateCommand) -> String {
    let subject = match cmd.target {
        CommandTarget::Step => cmd
            .location
            .step_id
            .map(short)
            .or_else(|| cmd.location.step_index.map(|i| format!("at index {i}")))
            .or_else(|| cmd.location.after_step_id.map(|id| format!("after {}", short(id)))),
        CommandTarget::Hazard => cmd.location.hazard_id.map(short),
        CommandTarget::Control => cmd.location.control_id.map(short),
        CommandTarget::Action => cmd.location.action_id.map(short),
    };

    let mut parts = Vec::new();
    if let Some(subject) = subject {
        parts.push(subject);
    }
    match cmd.intent {
        CommandIntent::Insert | CommandIntent::Modify => {
            if let Some(desc) = &cmd.data.description {
                parts.push(format!("\"{desc}\""));
            } else if let Some(title) = &cmd.data.title {
                parts.push(format!("\"{title}\""));
            }
        }
        CommandIntent::Annotate => {
            if let Some(note) = &cmd.data.note {
                parts.push(format!("note \"{note}\""));
            }
        }
        CommandIntent::Reorder => {
            if let Some(dest) = cmd.data.index {
                parts.push(format!("to index {dest}"));
            }
        }
        CommandIntent::Delete => {}
    }
    if !cmd.data.clear.is_empty() {
        parts.push(format!("clear {}", cmd.data.clear.join(", ")));
    }

    // Keys the engine will ignore still deserve the reviewer's eye.
    let unknown = cmd.data.unknown_keys();
    if !unknown.is_empty() {
        parts.push(format!("(unrecognized: {})", unknown.join(", ")));
    }
    parts.join(" ")
}
