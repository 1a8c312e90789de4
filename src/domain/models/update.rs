//! Interpretation outcomes.

use serde::{Deserialize, Serialize};

use super::command::UpdateCommand;

/// Outcome of one interpretation call: either a command batch ready for
/// review, or a clarification question. The two are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedUpdate {
    /// Proposed commands, in the order interpretation chose
    #[serde(default)]
    pub commands: Vec<UpdateCommand>,
    /// Human-facing summary of the whole batch
    #[serde(default)]
    pub summary: String,
    /// True when the instruction was too ambiguous to act on
    #[serde(default)]
    pub needs_clarification: bool,
    /// The follow-up question to put to the human
    #[serde(default)]
    pub clarification_prompt: Option<String>,
}

impl ParsedUpdate {
    /// A batch ready for review.
    pub fn ready(commands: Vec<UpdateCommand>, summary: impl Into<String>) -> Self {
        Self {
            commands,
            summary: summary.into(),
            needs_clarification: false,
            clarification_prompt: None,
        }
    }

    /// A clarification request.
    pub fn clarification(prompt: impl Into<String>) -> Self {
        Self {
            commands: Vec::new(),
            summary: String::new(),
            needs_clarification: true,
            clarification_prompt: Some(prompt.into()),
        }
    }

    /// Enforce the exclusivity invariant on a backend response.
    ///
    /// A clarification must carry a prompt and no commands. A batch with
    /// zero commands is legal (the summary explains a no-op).
    pub fn check_exclusive(&self) -> Result<(), String> {
        if self.needs_clarification {
            if !self.commands.is_empty() {
                return Err(format!(
                    "clarification response carried {} commands",
                    self.commands.len()
                ));
            }
            if self
                .clarification_prompt
                .as_deref()
                .map_or(true, |p| p.trim().is_empty())
            {
                return Err("clarification requested without a prompt".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::command::{CommandIntent, CommandTarget};

    #[test]
    fn test_ready_passes_exclusivity() {
        let parsed = ParsedUpdate::ready(vec![], "nothing to change");
        assert!(parsed.check_exclusive().is_ok());
    }

    #[test]
    fn test_clarification_needs_prompt() {
        let mut parsed = ParsedUpdate::clarification("which hazard?");
        assert!(parsed.check_exclusive().is_ok());

        parsed.clarification_prompt = None;
        assert!(parsed.check_exclusive().is_err());
    }

    #[test]
    fn test_clarification_with_commands_rejected() {
        let mut parsed = ParsedUpdate::clarification("which step?");
        parsed.commands.push(UpdateCommand::new(
            CommandIntent::Delete,
            CommandTarget::Step,
        ));
        assert!(parsed.check_exclusive().is_err());
    }
}
