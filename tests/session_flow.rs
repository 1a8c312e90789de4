//! End-to-end session flows with a scripted interpretation backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use redline::domain::errors::{EngineError, EngineResult};
use redline::domain::models::{
    CaseDocument, CaseKind, CommandIntent, CommandTarget, Hazard, LocationRef, ParsedUpdate,
    SessionStateKind, Step, UpdateCommand, WorkflowPhase,
};
use redline::domain::ports::UpdateInterpreter;
use redline::{SessionState, UpdateSession};

struct ScriptedBackend {
    responses: Mutex<VecDeque<ParsedUpdate>>,
    instructions: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<ParsedUpdate>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            instructions: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl UpdateInterpreter for ScriptedBackend {
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
            .ok_or_else(|| EngineError::Interpretation("no scripted response".to_string()))
    }
}

/// Two-step document with two hazards that both mention "slip".
fn slippery_document() -> CaseDocument {
    let mut doc = CaseDocument::new(CaseKind::RiskAssessment, "Workshop clean");
    doc.steps.push(Step::new(0, "Step 1", "Sweep the floor"));
    doc.steps.push(Step::new(1, "Step 2", "Degrease the bench"));
    for (j, step_idx) in [0usize, 1].iter().enumerate() {
        doc.hazards.push(Hazard {
            id: Uuid::from_u128(0x500 + j as u128),
            order: j,
            description: format!("slip risk near step {}", j + 1),
            step_ids: vec![doc.steps[*step_idx].id],
            severity: None,
            likelihood: None,
            notes: Vec::new(),
        });
    }
    doc
}

#[tokio::test]
async fn ambiguous_hazard_clarifies_then_modifies_one() {
    let document = slippery_document();
    let target_hazard = document.hazards[1].id;

    let mut modify = UpdateCommand::new(CommandIntent::Modify, CommandTarget::Hazard);
    modify.location = LocationRef::hazard(target_hazard);
    modify.data.description = Some("slip hazard from tools lying around".to_string());
    modify.explanation = "reworded to name the cause".to_string();

    let backend = ScriptedBackend::new(vec![
        ParsedUpdate::clarification(
            "Two hazards mention a slip: 'slip risk near step 1' and 'slip risk near step 2'. \
             Which one do you mean?",
        ),
        ParsedUpdate::ready(vec![modify], "Update the slip hazard description"),
    ]);

    let mut session = UpdateSession::new(
        Arc::clone(&backend) as Arc<dyn UpdateInterpreter>,
        CaseKind::RiskAssessment,
    );

    let state = session
        .parse_contextual_update(
            "the slip hazard was due to tools lying around",
            WorkflowPhase::HazardIdentification,
            &document,
        )
        .await
        .unwrap();
    match &state {
        SessionState::NeedsClarification { prompt, .. } => {
            assert!(prompt.contains("slip risk near step 1"));
            assert!(prompt.contains("slip risk near step 2"));
        }
        other => panic!("expected clarification, got {:?}", other.kind()),
    }

    let state = session
        .submit_clarification("the one in step 2", WorkflowPhase::HazardIdentification, &document)
        .await
        .unwrap();
    let SessionState::Ready { commands, .. } = &state else {
        panic!("expected ready state");
    };
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].intent, CommandIntent::Modify);
    assert_eq!(commands[0].location.hazard_id, Some(target_hazard));

    // The re-interpretation got the merged instruction, not just the answer.
    let seen = backend.instructions.lock().unwrap().clone();
    assert!(seen[1].contains("tools lying around"));
    assert!(seen[1].contains("Answer: the one in step 2"));

    let updated = session.apply_all(&document).unwrap();
    assert_eq!(
        updated.hazards[1].description,
        "slip hazard from tools lying around"
    );

    let restored = session.undo_last_contextual_update(&updated).unwrap();
    assert_eq!(restored, document);
    assert!(session.last_contextual_update().is_none());
}

#[tokio::test]
async fn three_command_batch_applies_and_undoes_through_session() {
    let document = slippery_document();
    let new_hazard = Uuid::from_u128(0x7777);

    let mut reword = UpdateCommand::new(CommandIntent::Modify, CommandTarget::Step);
    reword.location = LocationRef::step(document.steps[0].id);
    reword.data.description = Some("Sweep and mop the floor".to_string());

    let mut insert_hazard = UpdateCommand::new(CommandIntent::Insert, CommandTarget::Hazard);
    insert_hazard.data.id = Some(new_hazard);
    insert_hazard.data.description = Some("wet floor after mopping".to_string());
    insert_hazard.data.step_ids = Some(vec![document.steps[0].id]);

    let mut insert_control = UpdateCommand::new(CommandIntent::Insert, CommandTarget::Control);
    insert_control.location.hazard_id = Some(new_hazard);
    insert_control.data.description = Some("wet floor signs until dry".to_string());

    let backend = ScriptedBackend::new(vec![ParsedUpdate::ready(
        vec![reword, insert_hazard, insert_control],
        "Mop the floor and cover the new wet-floor hazard",
    )]);
    let mut session = UpdateSession::new(
        Arc::clone(&backend) as Arc<dyn UpdateInterpreter>,
        CaseKind::RiskAssessment,
    );

    session
        .parse_contextual_update(
            "we also mop after sweeping, add the wet floor hazard and a sign control",
            WorkflowPhase::HazardIdentification,
            &document,
        )
        .await
        .unwrap();
    let updated = session.apply_all(&document).unwrap();
    assert_eq!(updated.hazards.len(), 3);
    assert_eq!(updated.controls.len(), 1);

    let restored = session.undo_last_contextual_update(&updated).unwrap();
    assert_eq!(restored, document);
}

#[tokio::test]
async fn accepting_a_subset_of_the_preview() {
    let document = slippery_document();

    let mut note_one = UpdateCommand::new(CommandIntent::Annotate, CommandTarget::Step);
    note_one.location = LocationRef::step(document.steps[0].id);
    note_one.data.note = Some("PPE: gloves".to_string());

    let mut note_two = UpdateCommand::new(CommandIntent::Annotate, CommandTarget::Step);
    note_two.location = LocationRef::step(document.steps[1].id);
    note_two.data.note = Some("PPE: goggles".to_string());

    let backend = ScriptedBackend::new(vec![ParsedUpdate::ready(
        vec![note_one, note_two],
        "Add PPE notes",
    )]);
    let mut session = UpdateSession::new(
        Arc::clone(&backend) as Arc<dyn UpdateInterpreter>,
        CaseKind::RiskAssessment,
    );
    session
        .parse_contextual_update("note the PPE", WorkflowPhase::Review, &document)
        .await
        .unwrap();

    // Accept only the second command; the first stays in the proposal.
    let updated = session.apply_one(&document, 1).unwrap();
    assert!(updated.steps[0].notes.is_empty());
    assert_eq!(updated.steps[1].notes, vec!["PPE: goggles"]);
    assert_eq!(session.state().kind(), SessionStateKind::Ready);

    // Undo covers exactly the accepted command, then the rest is discarded.
    let restored = session.undo_last_contextual_update(&updated).unwrap();
    assert_eq!(restored, document);
    session.cancel().unwrap();
    assert_eq!(session.state().kind(), SessionStateKind::Idle);
}

#[tokio::test]
async fn backend_error_reaches_the_human_verbatim() {
    struct FailingBackend;

    #[async_trait]
    impl UpdateInterpreter for FailingBackend {
        async fn interpret(
            &self,
            _instruction: &str,
            _phase: WorkflowPhase,
            _snapshot: &CaseDocument,
        ) -> EngineResult<ParsedUpdate> {
            Err(EngineError::Interpretation(
                "Interpretation server error: model overloaded, try again".to_string(),
            ))
        }
    }

    let document = slippery_document();
    let mut session = UpdateSession::new(Arc::new(FailingBackend), CaseKind::RiskAssessment);

    let err = session
        .parse_contextual_update("anything", WorkflowPhase::Review, &document)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Interpretation failed: Interpretation server error: model overloaded, try again"
    );
    let SessionState::Failed { message } = session.state() else {
        panic!("expected failed state");
    };
    assert_eq!(
        message,
        "Interpretation server error: model overloaded, try again"
    );
}
