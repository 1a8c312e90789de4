//! Update session service.
//!
//! One `UpdateSession` owns a single instruction thread against one case
//! document: it drives interpretation, holds the clarification state
//! machine, validates and applies accepted batches, and keeps the
//! single-slot undo journal.
//!
//! The session never caches the document. The hosting shell passes the
//! authoritative snapshot into every call, upholds apply/undo mutual
//! exclusion, and persists the returned document itself.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::application::{applier, vocabulary};
use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{
    AppliedUpdate, CaseDocument, CaseKind, SessionState, SessionStateKind, UndoJournal,
    UpdateCommand, WorkflowPhase,
};
use crate::domain::ports::UpdateInterpreter;

/// Observable for the undo affordance: present exactly while an applied
/// batch can still be reversed.
#[derive(Debug, Clone, PartialEq)]
pub struct LastApplied {
    pub summary: String,
    pub applied_at: DateTime<Utc>,
}

/// Engine facade exposed to the session/workflow shell.
pub struct UpdateSession {
    interpreter: Arc<dyn UpdateInterpreter>,
    kind: CaseKind,
    state: SessionState,
    journal: UndoJournal,
}

impl UpdateSession {
    /// Create an idle session for a document of the given kind.
    pub fn new(interpreter: Arc<dyn UpdateInterpreter>, kind: CaseKind) -> Self {
        Self {
            interpreter,
            kind,
            state: SessionState::Idle,
            journal: UndoJournal::new(),
        }
    }

    /// Current position in the instruction thread.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Interpret a new free-text instruction.
    ///
    /// A submission while an interpretation is already in flight is a
    /// no-op returning the current state, not a queued retry. From
    /// `NeedsClarification` or `Ready` the pending proposal must be
    /// cancelled first.
    pub async fn parse_contextual_update(
        &mut self,
        instruction: &str,
        phase: WorkflowPhase,
        snapshot: &CaseDocument,
    ) -> EngineResult<SessionState> {
        let kind = self.state.kind();
        if kind == SessionStateKind::Parsing {
            return Ok(self.state.clone());
        }
        if !kind.can_transition_to(SessionStateKind::Parsing) {
            return Err(EngineError::InvalidState {
                operation: "submit an instruction",
                state: kind.as_str(),
            });
        }
        self.run_interpretation(instruction.to_string(), phase, snapshot)
            .await
    }

    /// Answer the pending clarification question.
    ///
    /// The answer is merged with the instruction so far and re-interpreted
    /// against a fresh snapshot; there is no separate backend code path
    /// for clarification turns.
    pub async fn submit_clarification(
        &mut self,
        answer: &str,
        phase: WorkflowPhase,
        snapshot: &CaseDocument,
    ) -> EngineResult<SessionState> {
        let SessionState::NeedsClarification {
            instruction,
            prompt,
        } = &self.state
        else {
            return Err(EngineError::InvalidState {
                operation: "answer a clarification",
                state: self.state.kind().as_str(),
            });
        };
        let combined = compose_clarification(instruction, prompt, answer);
        self.run_interpretation(combined, phase, snapshot).await
    }

    async fn run_interpretation(
        &mut self,
        instruction: String,
        phase: WorkflowPhase,
        snapshot: &CaseDocument,
    ) -> EngineResult<SessionState> {
        self.state = SessionState::Parsing;

        let parsed = match self
            .interpreter
            .interpret(&instruction, phase, snapshot)
            .await
        {
            Ok(parsed) => parsed,
            Err(err) => {
                // Surface the backend's message verbatim; retrying is the
                // shell's decision.
                let message = match &err {
                    EngineError::Interpretation(m) => m.clone(),
                    other => other.to_string(),
                };
                warn!(error = %message, "interpretation call failed");
                self.state = SessionState::Failed { message };
                return Err(err);
            }
        };

        if let Err(reason) = parsed.check_exclusive() {
            self.state = SessionState::Failed {
                message: reason.clone(),
            };
            return Err(EngineError::Interpretation(reason));
        }

        if parsed.needs_clarification {
            let prompt = parsed.clarification_prompt.unwrap_or_default();
            info!(prompt = %prompt, "interpretation needs clarification");
            self.state = SessionState::NeedsClarification {
                instruction,
                prompt,
            };
            return Ok(self.state.clone());
        }

        // A malformed batch is an interpretation failure from the human's
        // perspective: discarded whole, never partially shown.
        if let Err(err) = vocabulary::validate_batch(self.kind, &parsed.commands, snapshot) {
            warn!(error = %err, "interpretation produced an invalid batch");
            self.state = SessionState::Failed {
                message: err.to_string(),
            };
            return Err(err);
        }

        info!(
            commands = parsed.commands.len(),
            summary = %parsed.summary,
            "interpretation ready for review"
        );
        self.state = SessionState::Ready {
            commands: parsed.commands,
            summary: parsed.summary,
        };
        Ok(self.state.clone())
    }

    /// Apply an accepted command batch against the live document.
    ///
    /// Validates against the document as it is now, applies atomically,
    /// replaces the undo journal entry, and settles the instruction
    /// thread back to idle. Returns the mutated document for the shell
    /// to persist.
    pub fn apply_contextual_updates(
        &mut self,
        document: &CaseDocument,
        commands: &[UpdateCommand],
        summary: Option<&str>,
    ) -> EngineResult<CaseDocument> {
        let new_document =
            self.apply_core(document, commands, summary.unwrap_or("Contextual update"))?;
        self.state = SessionState::Idle;
        Ok(new_document)
    }

    /// Apply the whole pending proposal.
    pub fn apply_all(&mut self, document: &CaseDocument) -> EngineResult<CaseDocument> {
        let (commands, summary) = match &self.state {
            SessionState::Ready { commands, summary } => (commands.clone(), summary.clone()),
            other => {
                return Err(EngineError::InvalidState {
                    operation: "apply the proposal",
                    state: other.kind().as_str(),
                })
            }
        };
        let new_document = self.apply_core(document, &commands, &summary)?;
        self.state = SessionState::Idle;
        Ok(new_document)
    }

    /// Apply a single command out of the pending proposal.
    ///
    /// The command is removed from the proposal on success; the session
    /// stays in `Ready` while commands remain. Even a one-command apply
    /// replaces the undo journal entry.
    pub fn apply_one(&mut self, document: &CaseDocument, index: usize) -> EngineResult<CaseDocument> {
        let (cmd, summary) = match &self.state {
            SessionState::Ready { commands, summary } => {
                let Some(cmd) = commands.get(index) else {
                    return Err(EngineError::InvalidCommand {
                        index,
                        reason: "no such command in the proposal".to_string(),
                    });
                };
                (cmd.clone(), summary.clone())
            }
            other => {
                return Err(EngineError::InvalidState {
                    operation: "apply a command",
                    state: other.kind().as_str(),
                })
            }
        };

        let summary = if cmd.explanation.is_empty() {
            summary
        } else {
            cmd.explanation.clone()
        };
        let new_document = self.apply_core(document, std::slice::from_ref(&cmd), &summary)?;

        if let SessionState::Ready { commands, .. } = &mut self.state {
            commands.remove(index);
            if commands.is_empty() {
                self.state = SessionState::Idle;
            }
        }
        Ok(new_document)
    }

    fn apply_core(
        &mut self,
        document: &CaseDocument,
        commands: &[UpdateCommand],
        summary: &str,
    ) -> EngineResult<CaseDocument> {
        vocabulary::validate_batch(self.kind, commands, document)?;
        let batch = applier::apply_batch(document, commands)?;
        info!(
            commands = commands.len(),
            summary = %summary,
            "batch applied"
        );
        self.journal
            .record(AppliedUpdate::new(summary, batch.inverse));
        Ok(batch.document)
    }

    /// Reverse the most recently applied batch.
    ///
    /// Replays the stored inverses through the applier and clears the
    /// journal; undo is not itself undoable. On replay failure the entry
    /// is restored so the affordance survives a stale-document call.
    pub fn undo_last_contextual_update(
        &mut self,
        document: &CaseDocument,
    ) -> EngineResult<CaseDocument> {
        let Some(entry) = self.journal.take() else {
            return Err(EngineError::NoPendingUndo);
        };
        match applier::apply_batch(document, &entry.inverse_commands) {
            Ok(batch) => {
                info!(summary = %entry.summary, "batch undone");
                Ok(batch.document)
            }
            Err(err) => {
                warn!(error = %err, "undo replay failed; journal kept");
                self.journal.restore(entry);
                Err(err)
            }
        }
    }

    /// Summary of the batch the undo affordance would reverse, if any.
    pub fn last_contextual_update(&self) -> Option<LastApplied> {
        self.journal.peek().map(|entry| LastApplied {
            summary: entry.summary.clone(),
            applied_at: entry.applied_at,
        })
    }

    /// Discard the pending proposal or error without side effects.
    ///
    /// Illegal only while an interpretation is in flight; an in-flight
    /// call runs to completion or failure.
    pub fn cancel(&mut self) -> EngineResult<()> {
        if self.state.kind() == SessionStateKind::Parsing {
            return Err(EngineError::InvalidState {
                operation: "cancel",
                state: "parsing",
            });
        }
        self.state = SessionState::Idle;
        Ok(())
    }
}

/// Merge a clarification answer with the instruction so far. Further
/// turns keep compounding onto the combined string.
fn compose_clarification(original: &str, prompt: &str, answer: &str) -> String {
    format!("{original}\n\nClarification question: {prompt}\nAnswer: {answer}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        CommandData, CommandIntent, CommandTarget, LocationRef, ParsedUpdate, Step,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Interpreter returning scripted responses in order, recording the
    /// instructions it was called with.
    struct ScriptedInterpreter {
        responses: Mutex<VecDeque<EngineResult<ParsedUpdate>>>,
        instructions: Mutex<Vec<String>>,
    }

    impl ScriptedInterpreter {
        fn new(responses: Vec<EngineResult<ParsedUpdate>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                instructions: Mutex::new(Vec::new()),
            })
        }

        fn seen_instructions(&self) -> Vec<String> {
            self.instructions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpdateInterpreter for ScriptedInterpreter {
        async fn interpret(
            &self,
            instruction: &str,
            _phase: WorkflowPhase,
            _snapshot: &CaseDocument,
        ) -> EngineResult<ParsedUpdate> {
            self.instructions
                .lock()
                .unwrap()
                .push(instruction.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left")
        }
    }

    fn doc() -> CaseDocument {
        let mut doc = CaseDocument::new(CaseKind::RiskAssessment, "Roof access");
        doc.steps.push(Step::new(0, "Step 1", "Secure the hatch"));
        doc.steps.push(Step::new(1, "Step 2", "Clip on"));
        doc
    }

    fn annotate_cmd(doc: &CaseDocument, note: &str) -> UpdateCommand {
        UpdateCommand {
            intent: CommandIntent::Annotate,
            target: CommandTarget::Step,
            location: LocationRef::step(doc.steps[0].id),
            data: CommandData {
                note: Some(note.to_string()),
                ..CommandData::default()
            },
            explanation: String::new(),
        }
    }

    #[tokio::test]
    async fn test_parse_to_ready_and_apply_all() {
        let document = doc();
        let interp = ScriptedInterpreter::new(vec![Ok(ParsedUpdate::ready(
            vec![annotate_cmd(&document, "use the short ladder")],
            "Annotate step 1",
        ))]);
        let mut session = UpdateSession::new(interp, CaseKind::RiskAssessment);

        let state = session
            .parse_contextual_update(
                "mention the short ladder",
                WorkflowPhase::ProcessDescription,
                &document,
            )
            .await
            .unwrap();
        assert_eq!(state.kind(), SessionStateKind::Ready);

        let updated = session.apply_all(&document).unwrap();
        assert_eq!(updated.steps[0].notes, vec!["use the short ladder"]);
        assert_eq!(session.state().kind(), SessionStateKind::Idle);
        assert_eq!(
            session.last_contextual_update().map(|l| l.summary),
            Some("Annotate step 1".to_string())
        );
    }

    #[tokio::test]
    async fn test_clarification_composes_instruction() {
        let document = doc();
        let interp = ScriptedInterpreter::new(vec![
            Ok(ParsedUpdate::clarification(
                "Which step do you mean: 1 or 2?",
            )),
            Ok(ParsedUpdate::ready(
                vec![annotate_cmd(&document, "noted")],
                "Annotate",
            )),
        ]);
        let mut session = UpdateSession::new(interp.clone(), CaseKind::RiskAssessment);

        let state = session
            .parse_contextual_update("add a note", WorkflowPhase::Review, &document)
            .await
            .unwrap();
        assert_eq!(state.kind(), SessionStateKind::NeedsClarification);

        let state = session
            .submit_clarification("the first one", WorkflowPhase::Review, &document)
            .await
            .unwrap();
        assert_eq!(state.kind(), SessionStateKind::Ready);

        let seen = interp.seen_instructions();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].contains("add a note"));
        assert!(seen[1].contains("Clarification question: Which step do you mean: 1 or 2?"));
        assert!(seen[1].contains("Answer: the first one"));
    }

    #[tokio::test]
    async fn test_interpretation_failure_is_verbatim_and_retryable() {
        let document = doc();
        let interp = ScriptedInterpreter::new(vec![
            Err(EngineError::Interpretation("503: backend busy".to_string())),
            Ok(ParsedUpdate::ready(vec![], "nothing to do")),
        ]);
        let mut session = UpdateSession::new(interp, CaseKind::RiskAssessment);

        let err = session
            .parse_contextual_update("whatever", WorkflowPhase::Review, &document)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Interpretation(_)));
        match session.state() {
            SessionState::Failed { message } => assert_eq!(message, "503: backend busy"),
            other => panic!("expected failed state, got {:?}", other.kind()),
        }

        // Resubmission from Failed re-enters Parsing and can succeed.
        let state = session
            .parse_contextual_update("whatever", WorkflowPhase::Review, &document)
            .await
            .unwrap();
        assert_eq!(state.kind(), SessionStateKind::Ready);
    }

    #[tokio::test]
    async fn test_exclusivity_violation_is_a_failure() {
        let document = doc();
        let mut bad = ParsedUpdate::clarification("which one?");
        bad.commands.push(annotate_cmd(&document, "x"));
        let interp = ScriptedInterpreter::new(vec![Ok(bad)]);
        let mut session = UpdateSession::new(interp, CaseKind::RiskAssessment);

        let err = session
            .parse_contextual_update("ambiguous", WorkflowPhase::Review, &document)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Interpretation(_)));
        assert_eq!(session.state().kind(), SessionStateKind::Failed);
    }

    #[tokio::test]
    async fn test_invalid_batch_discarded_whole() {
        let document = doc();
        // Reorder on a hazard is outside the vocabulary.
        let bad = UpdateCommand::new(CommandIntent::Reorder, CommandTarget::Hazard);
        let interp = ScriptedInterpreter::new(vec![Ok(ParsedUpdate::ready(
            vec![annotate_cmd(&document, "fine"), bad],
            "mixed batch",
        ))]);
        let mut session = UpdateSession::new(interp, CaseKind::RiskAssessment);

        let err = session
            .parse_contextual_update("do things", WorkflowPhase::Review, &document)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidCommand { index: 1, .. }));
        assert_eq!(session.state().kind(), SessionStateKind::Failed);
    }

    #[tokio::test]
    async fn test_apply_one_keeps_remaining_proposal() {
        let document = doc();
        let interp = ScriptedInterpreter::new(vec![Ok(ParsedUpdate::ready(
            vec![
                annotate_cmd(&document, "first note"),
                annotate_cmd(&document, "second note"),
            ],
            "Two notes",
        ))]);
        let mut session = UpdateSession::new(interp, CaseKind::RiskAssessment);
        session
            .parse_contextual_update("add notes", WorkflowPhase::Review, &document)
            .await
            .unwrap();

        let after_one = session.apply_one(&document, 0).unwrap();
        assert_eq!(after_one.steps[0].notes, vec!["first note"]);
        assert_eq!(session.state().kind(), SessionStateKind::Ready);

        let after_two = session.apply_one(&after_one, 0).unwrap();
        assert_eq!(
            after_two.steps[0].notes,
            vec!["first note", "second note"]
        );
        assert_eq!(session.state().kind(), SessionStateKind::Idle);
    }

    #[tokio::test]
    async fn test_new_apply_discards_earlier_undo() {
        let document = doc();
        let interp = ScriptedInterpreter::new(vec![]);
        let mut session = UpdateSession::new(interp, CaseKind::RiskAssessment);

        let first = session
            .apply_contextual_updates(&document, &[annotate_cmd(&document, "one")], Some("first"))
            .unwrap();
        let second = session
            .apply_contextual_updates(&first, &[annotate_cmd(&first, "two")], Some("second"))
            .unwrap();

        // Undo reverses only the second batch.
        let undone = session.undo_last_contextual_update(&second).unwrap();
        assert_eq!(undone, first);
        assert!(session.last_contextual_update().is_none());
        assert!(matches!(
            session.undo_last_contextual_update(&undone),
            Err(EngineError::NoPendingUndo)
        ));
    }

    #[tokio::test]
    async fn test_failed_apply_leaves_journal_untouched() {
        let document = doc();
        let interp = ScriptedInterpreter::new(vec![]);
        let mut session = UpdateSession::new(interp, CaseKind::RiskAssessment);

        let updated = session
            .apply_contextual_updates(&document, &[annotate_cmd(&document, "keep me")], Some("good"))
            .unwrap();

        let stale = UpdateCommand {
            intent: CommandIntent::Delete,
            target: CommandTarget::Step,
            location: LocationRef::step(uuid::Uuid::new_v4()),
            data: CommandData::default(),
            explanation: String::new(),
        };
        let err = session
            .apply_contextual_updates(&updated, &[stale], Some("bad"))
            .unwrap_err();
        assert!(matches!(err, EngineError::StaleReference { .. }));

        assert_eq!(
            session.last_contextual_update().map(|l| l.summary),
            Some("good".to_string())
        );
        let undone = session.undo_last_contextual_update(&updated).unwrap();
        assert_eq!(undone, document);
    }

    #[tokio::test]
    async fn test_cancel_discards_proposal() {
        let document = doc();
        let interp = ScriptedInterpreter::new(vec![Ok(ParsedUpdate::ready(
            vec![annotate_cmd(&document, "discard me")],
            "proposal",
        ))]);
        let mut session = UpdateSession::new(interp, CaseKind::RiskAssessment);
        session
            .parse_contextual_update("note", WorkflowPhase::Review, &document)
            .await
            .unwrap();

        session.cancel().unwrap();
        assert_eq!(session.state().kind(), SessionStateKind::Idle);
        assert!(matches!(
            session.apply_all(&document),
            Err(EngineError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_parse_refused_while_proposal_pending() {
        let document = doc();
        let interp = ScriptedInterpreter::new(vec![Ok(ParsedUpdate::ready(
            vec![annotate_cmd(&document, "pending")],
            "proposal",
        ))]);
        let mut session = UpdateSession::new(interp, CaseKind::RiskAssessment);
        session
            .parse_contextual_update("note", WorkflowPhase::Review, &document)
            .await
            .unwrap();

        let err = session
            .parse_contextual_update("another", WorkflowPhase::Review, &document)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }
}
