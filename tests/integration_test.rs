//! Integration tests for planforge
//!
//! These tests drive the orchestrator end-to-end with scripted
//! collaborators and verify the resumability and dispatch contracts.

use std::collections::VecDeque;

use async_trait::async_trait;
use tempfile::tempdir;

use planforge::config::OrchestrationConfig;
use planforge::domain::{PhaseId, ProjectContext, SessionEvent};
use planforge::driver::{
    Answer, CollaboratorError, CompletionSignal, DialogueCollaborator, DispatchInstruction, DriverError,
    ExecutionCollaborator, LoggingExecutor, Orchestrator, Prompt,
};
use planforge::machine::{PhaseMachine, PhaseState};
use planforge::state::{SessionStore, StoreError};
use planforge::MAX_CONCURRENT_AGENTS;

// =============================================================================
// Scripted collaborators
// =============================================================================

/// Dialogue collaborator that replays a fixed script of answers
struct ScriptedDialogue {
    answers: VecDeque<String>,
}

impl ScriptedDialogue {
    fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl DialogueCollaborator for ScriptedDialogue {
    async fn ask(&mut self, prompts: &[Prompt]) -> Result<Vec<Answer>, CollaboratorError> {
        prompts
            .iter()
            .map(|_| {
                self.answers
                    .pop_front()
                    .ok_or_else(|| CollaboratorError::Failed("answer script exhausted".to_string()))
            })
            .collect()
    }
}

/// Dialogue collaborator that cancels immediately
struct CancellingDialogue;

#[async_trait]
impl DialogueCollaborator for CancellingDialogue {
    async fn ask(&mut self, _prompts: &[Prompt]) -> Result<Vec<Answer>, CollaboratorError> {
        Err(CollaboratorError::Cancelled)
    }
}

/// Executor that fails a fixed number of calls before succeeding
struct FlakyExecutor {
    failures_left: u32,
    inner: LoggingExecutor,
}

#[async_trait]
impl ExecutionCollaborator for FlakyExecutor {
    async fn dispatch(&mut self, instruction: &DispatchInstruction) -> Result<CompletionSignal, CollaboratorError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(CollaboratorError::Failed("executor offline".to_string()));
        }
        self.inner.dispatch(instruction).await
    }
}

/// The answer script for a complete fresh run: the context interview,
/// the per-feature orchestration interview, and the adaptation prompt.
fn full_run_script() -> Vec<&'static str> {
    vec![
        // Context phase
        "web app",
        "online course booking",
        "yoga studios",
        "user accounts, booking calendar",
        "none",
        "3 months",
        "small",
        "ask-each-time",
        "stripe",
        // Orchestration setup: "user accounts" scores 0.2, no breakdown
        "auth-security",
        "3",
        // "booking calendar" scores 0.4: mid band, user confirms breakdown
        "real-time",
        "6",
        "yes",
        "calendar ui, availability engine",
        // Adaptation
        "none",
    ]
}

// =============================================================================
// Full run
// =============================================================================

#[tokio::test]
async fn test_fresh_run_records_every_phase() {
    let temp = tempdir().unwrap();
    let store = SessionStore::open(temp.path()).unwrap();

    let mut orchestrator = Orchestrator::resume_or_start(
        store,
        ScriptedDialogue::new(&full_run_script()),
        LoggingExecutor::default(),
        OrchestrationConfig::default(),
    )
    .unwrap();

    orchestrator.run().await.unwrap();
    assert_eq!(orchestrator.current(), PhaseState::Complete);

    // Every phase recorded exactly one event, in order
    let store = SessionStore::open(temp.path()).unwrap();
    let context = store.load().unwrap();
    let phases: Vec<PhaseId> = context.session_history.iter().map(|e| e.phase).collect();
    assert_eq!(phases, PhaseId::ALL.to_vec());

    // The interview landed in the context record
    assert_eq!(context.project_type, "web app");
    assert_eq!(context.must_have_features, vec!["user accounts", "booking calendar"]);
    assert!(context.integrations.contains("stripe"));
}

#[tokio::test]
async fn test_fresh_run_dispatches_leaves_only() {
    let temp = tempdir().unwrap();
    let store = SessionStore::open(temp.path()).unwrap();

    let mut orchestrator = Orchestrator::resume_or_start(
        store,
        ScriptedDialogue::new(&full_run_script()),
        LoggingExecutor::default(),
        OrchestrationConfig::default(),
    )
    .unwrap();
    orchestrator.run().await.unwrap();

    let dispatched = &orchestrator.executor().dispatched;
    // 3 scaffold docs + 1 research (stripe) + 1 plan + 3 implementation
    // leaves (1 whole feature + 2 subtasks of the broken-down one)
    assert_eq!(dispatched.len(), 8);

    for instruction in dispatched {
        // Only leaf tasks are dispatched, and every count respects the
        // system-wide ceiling
        assert!(instruction.subtasks.is_empty());
        assert!(instruction.agent_count >= 1);
        assert!(instruction.agent_count <= MAX_CONCURRENT_AGENTS);
    }

    // The broken-down feature was never dispatched as a whole
    let parent = orchestrator
        .tasks()
        .iter()
        .find(|t| !t.subtasks.is_empty())
        .expect("booking calendar should have been broken down");
    assert!(dispatched.iter().all(|i| i.task_id != parent.id));
    for leaf in parent.leaves() {
        assert!(dispatched.iter().any(|i| i.task_id == leaf.id));
        assert!(leaf.agent_count.is_some());
    }
}

// =============================================================================
// Resume
// =============================================================================

#[test]
fn test_resume_reenters_at_first_unrecorded_phase() {
    let history = vec![
        SessionEvent::now(PhaseId::Context, vec!["gathered".into()]),
        SessionEvent::now(PhaseId::OrchestrationSetup, vec!["scored".into()]),
    ];
    let machine = PhaseMachine::resume(&history);
    assert_eq!(machine.current(), PhaseState::Phase(PhaseId::DocScaffold));
}

#[tokio::test]
async fn test_driver_resume_skips_recorded_phases() {
    let temp = tempdir().unwrap();
    let store = SessionStore::open(temp.path()).unwrap();

    // Persist a session that already finished the first two phases
    let mut context = ProjectContext {
        project_type: "web app".into(),
        primary_goal: "bookings".into(),
        ..Default::default()
    };
    context.must_have_features.push("auth".into());
    context.push_event(SessionEvent::now(PhaseId::Context, vec!["gathered".into()]));
    context.push_event(SessionEvent::now(PhaseId::OrchestrationSetup, vec!["scored".into()]));
    store.save(&context).unwrap();

    let mut orchestrator = Orchestrator::resume_or_start(
        store,
        // Doc scaffolding needs no answers; nothing in the script
        ScriptedDialogue::new(&[]),
        LoggingExecutor::default(),
        OrchestrationConfig::default(),
    )
    .unwrap();

    assert_eq!(orchestrator.current(), PhaseState::Phase(PhaseId::DocScaffold));

    // One step runs doc scaffolding, not the recorded phases
    orchestrator.step(PhaseId::DocScaffold).await.unwrap();
    assert_eq!(orchestrator.current(), PhaseState::Phase(PhaseId::Research));

    let store = SessionStore::open(temp.path()).unwrap();
    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.session_history.len(), 3);
    assert_eq!(reloaded.session_history[2].phase, PhaseId::DocScaffold);
    // The original events are untouched
    assert_eq!(reloaded.session_history[0].decisions, vec!["gathered".to_string()]);
}

// =============================================================================
// Corruption and cancellation
// =============================================================================

#[test]
fn test_unrecognized_schema_version_surfaces_corrupt() {
    let temp = tempdir().unwrap();
    let store = SessionStore::open(temp.path()).unwrap();
    store.save(&ProjectContext::default()).unwrap();

    let raw = std::fs::read_to_string(temp.path().join("session.json")).unwrap();
    let bumped = raw.replacen("\"schemaVersion\": 1", "\"schemaVersion\": 7", 1);
    std::fs::write(temp.path().join("session.json"), bumped).unwrap();

    let store = SessionStore::open(temp.path()).unwrap();
    let result = Orchestrator::resume_or_start(
        store,
        ScriptedDialogue::new(&[]),
        LoggingExecutor::default(),
        OrchestrationConfig::default(),
    );
    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}

#[tokio::test]
async fn test_cancellation_before_first_step_persists_nothing() {
    let temp = tempdir().unwrap();
    let store = SessionStore::open(temp.path()).unwrap();

    let mut orchestrator = Orchestrator::resume_or_start(
        store,
        CancellingDialogue,
        LoggingExecutor::default(),
        OrchestrationConfig::default(),
    )
    .unwrap();

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(
        err,
        DriverError::Collaborator(CollaboratorError::Cancelled)
    ));

    // Nothing was persisted for the unfinished step
    let store = SessionStore::open(temp.path()).unwrap();
    assert!(matches!(store.load(), Err(StoreError::NotFound)));
}

#[tokio::test]
async fn test_collaborator_failure_is_retried_and_recorded() {
    let temp = tempdir().unwrap();
    let store = SessionStore::open(temp.path()).unwrap();

    let mut context = ProjectContext {
        project_type: "web app".into(),
        primary_goal: "bookings".into(),
        ..Default::default()
    };
    context.push_event(SessionEvent::now(PhaseId::Context, vec!["gathered".into()]));
    context.push_event(SessionEvent::now(PhaseId::OrchestrationSetup, vec!["scored".into()]));
    store.save(&context).unwrap();

    let mut orchestrator = Orchestrator::resume_or_start(
        store,
        ScriptedDialogue::new(&[]),
        FlakyExecutor {
            failures_left: 1,
            inner: LoggingExecutor::default(),
        },
        OrchestrationConfig {
            max_retries: 1,
            ..Default::default()
        },
    )
    .unwrap();

    orchestrator.step(PhaseId::DocScaffold).await.unwrap();

    let store = SessionStore::open(temp.path()).unwrap();
    let reloaded = store.load().unwrap();
    let event = &reloaded.session_history[2];
    assert_eq!(event.phase, PhaseId::DocScaffold);
    // The failure was recorded as a decision entry, then the retry
    // dispatched all three documents
    assert!(event.decisions.iter().any(|d| d.contains("collaborator failure")));
    assert_eq!(
        event.decisions.iter().filter(|d| d.starts_with("dispatched")).count(),
        3
    );
    assert_eq!(orchestrator.executor().inner.dispatched.len(), 3);
}

#[tokio::test]
async fn test_exhausted_retries_surface_without_corrupting_state() {
    let temp = tempdir().unwrap();
    let store = SessionStore::open(temp.path()).unwrap();

    let mut context = ProjectContext::default();
    context.push_event(SessionEvent::now(PhaseId::Context, vec!["gathered".into()]));
    context.push_event(SessionEvent::now(PhaseId::OrchestrationSetup, vec!["scored".into()]));
    store.save(&context).unwrap();

    let mut orchestrator = Orchestrator::resume_or_start(
        store,
        ScriptedDialogue::new(&[]),
        FlakyExecutor {
            failures_left: 10,
            inner: LoggingExecutor::default(),
        },
        OrchestrationConfig {
            max_retries: 1,
            ..Default::default()
        },
    )
    .unwrap();

    assert!(orchestrator.step(PhaseId::DocScaffold).await.is_err());

    // The failed step left the persisted history exactly as it was
    let store = SessionStore::open(temp.path()).unwrap();
    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.session_history.len(), 2);

    // And a later resume re-enters the same phase
    let machine = PhaseMachine::resume(&reloaded.session_history);
    assert_eq!(machine.current(), PhaseState::Phase(PhaseId::DocScaffold));
}

// =============================================================================
// Revision
// =============================================================================

#[tokio::test]
async fn test_revise_appends_new_events_and_keeps_old_ones() {
    let temp = tempdir().unwrap();
    let store = SessionStore::open(temp.path()).unwrap();

    let mut script = full_run_script();
    // The revised pass re-runs research onward; only adaptation prompts
    script.push("switched payment provider");

    let mut orchestrator = Orchestrator::resume_or_start(
        store,
        ScriptedDialogue::new(&script),
        LoggingExecutor::default(),
        OrchestrationConfig::default(),
    )
    .unwrap();

    orchestrator.run().await.unwrap();
    assert_eq!(orchestrator.current(), PhaseState::Complete);
    let first_pass: Vec<PhaseId> = orchestrator.context().session_history.iter().map(|e| e.phase).collect();

    orchestrator.revise(PhaseId::Research).unwrap();
    orchestrator.run().await.unwrap();
    assert_eq!(orchestrator.current(), PhaseState::Complete);

    let history = &orchestrator.context().session_history;
    // 7 original events plus research..adaptation revisited
    assert_eq!(history.len(), 11);
    let original: Vec<PhaseId> = history.iter().take(7).map(|e| e.phase).collect();
    assert_eq!(original, first_pass);
    let revisited: Vec<PhaseId> = history.iter().skip(7).map(|e| e.phase).collect();
    assert_eq!(
        revisited,
        vec![
            PhaseId::Research,
            PhaseId::PlanGeneration,
            PhaseId::ImplementationPlanning,
            PhaseId::Adaptation,
        ]
    );
    assert!(history[10].decisions.iter().any(|d| d.contains("switched payment provider")));
}

#[tokio::test]
async fn test_complete_run_reopens_into_adaptation() {
    let temp = tempdir().unwrap();
    let store = SessionStore::open(temp.path()).unwrap();

    let mut script = full_run_script();
    script.push("pricing model changed");

    let mut orchestrator = Orchestrator::resume_or_start(
        store,
        ScriptedDialogue::new(&script),
        LoggingExecutor::default(),
        OrchestrationConfig::default(),
    )
    .unwrap();

    orchestrator.run().await.unwrap();
    orchestrator.reopen().unwrap();
    assert_eq!(orchestrator.current(), PhaseState::Phase(PhaseId::Adaptation));

    orchestrator.run().await.unwrap();
    assert_eq!(orchestrator.current(), PhaseState::Complete);

    let history = &orchestrator.context().session_history;
    assert_eq!(history.len(), 8);
    assert_eq!(history[7].phase, PhaseId::Adaptation);
    assert!(history[7].decisions.iter().any(|d| d.contains("pricing model changed")));
}
