//! Orchestration driver
//!
//! Top-level control loop. For the current phase it gathers inputs from
//! the dialogue collaborator, runs the scorer/policy/planner, emits
//! dispatch instructions, appends a session event, persists the updated
//! context, and only then consults the phase machine for advancement.
//! The store lock is held for the duration of each phase step.

use thiserror::Error;
use tracing::{info, warn};

use crate::allocation::allocate;
use crate::config::OrchestrationConfig;
use crate::domain::{ComplexityPreference, PhaseId, ProjectContext, SessionEvent, Task};
use crate::machine::{MachineError, PhaseMachine, PhaseState};
use crate::policy::{requires_breakdown, BreakdownDecision};
use crate::scoring::FactorTag;
use crate::state::{SessionStore, StoreError};

use super::answers::{
    non_empty, parse_file_impact, parse_flags, parse_list, parse_preference, parse_yes_no, ValidationError,
};
use super::collab::{
    Answer, CollaboratorError, CompletionSignal, DialogueCollaborator, DispatchInstruction, ExecutionCollaborator,
    Prompt,
};

/// Errors surfaced by the driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Machine(#[from] MachineError),
}

impl DriverError {
    /// Collaborator hiccups and malformed answers are worth retrying the
    /// phase step for; store and machine errors are not.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Collaborator(CollaboratorError::Cancelled) => false,
            Self::Collaborator(_) => true,
            Self::Validation(_) => true,
            Self::Store(_) | Self::Machine(_) => false,
        }
    }
}

/// The three documents scaffolded for every project
const SCAFFOLD_DOCS: [&str; 3] = ["requirements document", "technical specification", "task breakdown"];

/// Orchestration driver over a session store and two collaborators
pub struct Orchestrator<D: DialogueCollaborator, E: ExecutionCollaborator> {
    store: SessionStore,
    dialogue: D,
    executor: E,
    config: OrchestrationConfig,
    context: ProjectContext,
    machine: PhaseMachine,
    /// Task tree for the current run. Owned by the phase that built it
    /// and never persisted; a resumed run rebuilds it on demand.
    tasks: Vec<Task>,
}

impl<D: DialogueCollaborator, E: ExecutionCollaborator> Orchestrator<D, E> {
    /// Resume an existing session or start a fresh one.
    ///
    /// `NotFound` starts a fresh run at the context phase. A corrupt
    /// record is returned to the caller, who must surface it and offer a
    /// fresh start rather than silently discarding history.
    pub fn resume_or_start(
        store: SessionStore,
        dialogue: D,
        executor: E,
        config: OrchestrationConfig,
    ) -> Result<Self, StoreError> {
        let (context, machine) = match store.load() {
            Ok(context) => {
                let machine = PhaseMachine::resume(&context.session_history);
                info!(
                    events = context.session_history.len(),
                    position = %machine.current(),
                    "Resumed session"
                );
                (context, machine)
            }
            Err(StoreError::NotFound) => {
                info!("No existing session; starting fresh");
                (ProjectContext::default(), PhaseMachine::fresh())
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            store,
            dialogue,
            executor,
            config,
            context,
            machine,
            tasks: Vec::new(),
        })
    }

    /// Current position in the workflow
    pub fn current(&self) -> PhaseState {
        self.machine.current()
    }

    /// The project context as of the last completed step
    pub fn context(&self) -> &ProjectContext {
        &self.context
    }

    /// Access the execution collaborator (for inspection after a run)
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// The task tree built during this run, if any
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Explicit user-initiated revision of an earlier phase
    pub fn revise(&mut self, target: PhaseId) -> Result<(), DriverError> {
        self.machine.revise(target)?;
        info!(%target, "Revising earlier phase");
        Ok(())
    }

    /// Re-open a complete run for another adaptation pass
    pub fn reopen(&mut self) -> Result<(), DriverError> {
        self.machine.reopen()?;
        Ok(())
    }

    /// Run phases until the workflow completes
    pub async fn run(&mut self) -> Result<(), DriverError> {
        while let PhaseState::Phase(phase) = self.machine.current() {
            self.step(phase).await?;
        }
        info!("Planning run complete");
        Ok(())
    }

    /// Execute one phase step: gather, decide, dispatch, record, persist,
    /// advance. Holds the store lock for the whole step; the lock guard
    /// is released on every exit path.
    pub async fn step(&mut self, phase: PhaseId) -> Result<(), DriverError> {
        let _lock = self.store.lock_exclusive()?;
        info!(%phase, "Starting phase step");

        let mut decisions = Vec::new();
        let mut attempt = 0;
        loop {
            let mut attempt_decisions = Vec::new();
            match self.execute_phase(phase, &mut attempt_decisions).await {
                Ok(()) => {
                    decisions.extend(attempt_decisions);
                    break;
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(%phase, attempt, error = %e, "Phase step failed; retrying");
                    decisions.push(format!("collaborator failure (attempt {}): {}", attempt, e));
                }
                // Surfaced to the user; nothing has been persisted for
                // this step, so already-recorded state is intact.
                Err(e) => return Err(e),
            }
        }

        self.context.push_event(SessionEvent::now(phase, decisions));
        self.store.save(&self.context)?;
        self.machine.advance(&self.context.session_history)?;
        info!(%phase, next = %self.machine.current(), "Phase step recorded");
        Ok(())
    }

    async fn execute_phase(&mut self, phase: PhaseId, decisions: &mut Vec<String>) -> Result<(), DriverError> {
        match phase {
            PhaseId::Context => self.phase_context(decisions).await,
            PhaseId::OrchestrationSetup => self.phase_orchestration_setup(decisions).await,
            PhaseId::DocScaffold => self.phase_doc_scaffold(decisions).await,
            PhaseId::Research => self.phase_research(decisions).await,
            PhaseId::PlanGeneration => self.phase_plan_generation(decisions).await,
            PhaseId::ImplementationPlanning => self.phase_implementation_planning(decisions).await,
            PhaseId::Adaptation => self.phase_adaptation(decisions).await,
        }
    }

    /// Ask the dialogue collaborator, enforcing the answer-count contract
    async fn ask(&mut self, prompts: Vec<Prompt>) -> Result<Vec<Answer>, DriverError> {
        let expected = prompts.len();
        let answers = self.dialogue.ask(&prompts).await?;
        if answers.len() != expected {
            return Err(CollaboratorError::AnswerCount {
                expected,
                got: answers.len(),
            }
            .into());
        }
        Ok(answers)
    }

    /// Emit one dispatch instruction and record the outcome. An
    /// unsuccessful completion signal is a recorded decision, not an
    /// abort.
    async fn dispatch(&mut self, instruction: DispatchInstruction, decisions: &mut Vec<String>) -> Result<(), DriverError> {
        let CompletionSignal { success, artifact } = self.executor.dispatch(&instruction).await?;
        if success {
            decisions.push(format!(
                "dispatched {} with {} agent(s)",
                instruction.task_id, instruction.agent_count
            ));
            if let Some(artifact) = artifact {
                decisions.push(format!("artifact for {}: {}", instruction.task_id, artifact));
            }
        } else {
            decisions.push(format!("dispatch of {} reported failure", instruction.task_id));
        }
        Ok(())
    }

    fn wants_detail(&self) -> bool {
        self.context.complexity_preference == ComplexityPreference::FullBreakdown
    }

    // === Phase handlers ===

    /// Context gathering: the discovery interview
    async fn phase_context(&mut self, decisions: &mut Vec<String>) -> Result<(), DriverError> {
        let answers = self
            .ask(vec![
                Prompt::new("What type of project is this? (web app, CLI tool, service, ...)"),
                Prompt::new("What is the primary goal?"),
                Prompt::new("Who is the target audience?"),
                Prompt::new("List the must-have features (comma-separated)"),
                Prompt::new("Any technical constraints? (comma-separated, or 'none')"),
                Prompt::new("What is the timeline?"),
                Prompt::new("What is the budget?"),
                Prompt::new("Breakdown preference: full-breakdown, high-level, or ask-each-time?"),
                Prompt::new("External integrations? (comma-separated, or 'none')"),
            ])
            .await?;

        self.context.project_type = non_empty(&answers[0])?;
        self.context.primary_goal = non_empty(&answers[1])?;
        self.context.target_audience = non_empty(&answers[2])?;
        self.context.must_have_features = parse_list(&answers[3]);
        self.context.constraints.technical = parse_list(&answers[4]).into_iter().collect();
        self.context.constraints.timeline = answers[5].trim().to_string();
        self.context.constraints.budget = answers[6].trim().to_string();
        self.context.complexity_preference = parse_preference(&answers[7])?;
        self.context.integrations = parse_list(&answers[8]).into_iter().collect();

        decisions.push(format!("project type: {}", self.context.project_type));
        decisions.push(format!("primary goal: {}", self.context.primary_goal));
        decisions.push(format!(
            "{} must-have features recorded",
            self.context.must_have_features.len()
        ));
        decisions.push(format!("complexity preference: {}", self.context.complexity_preference));
        Ok(())
    }

    /// Orchestration setup: build and score the task tree, decide
    /// breakdowns per task
    async fn phase_orchestration_setup(&mut self, decisions: &mut Vec<String>) -> Result<(), DriverError> {
        if self.context.must_have_features.is_empty() {
            decisions.push("no must-have features; nothing to orchestrate".to_string());
            return Ok(());
        }
        self.build_task_tree(decisions).await
    }

    /// Interview per feature, score it, and apply the breakdown policy.
    /// Also used to rebuild the tree after a resume, since task trees
    /// are not persisted beyond the run.
    async fn build_task_tree(&mut self, decisions: &mut Vec<String>) -> Result<(), DriverError> {
        let features = self.context.must_have_features.clone();
        let preference = self.context.complexity_preference;
        let mut tasks = Vec::new();

        for feature in features {
            let answers = self
                .ask(vec![
                    Prompt::new(format!(
                        "Complexity factors for '{}'? (comma-separated tags, or 'none')",
                        feature
                    )),
                    Prompt::new(format!("Roughly how many files will '{}' touch?", feature)),
                ])
                .await?;

            let flags = parse_flags(&answers[0])?;
            let impact = parse_file_impact(&answers[1])?;

            let mut task = Task::new(&feature);
            task.set_flags(flags);
            task.set_file_impact(impact);
            decisions.push(format!("scored '{}' at {:.2}", feature, task.score()));

            let needs_breakdown = match requires_breakdown(task.score(), preference) {
                BreakdownDecision::Decided(v) => v,
                BreakdownDecision::AskUser => {
                    let reply = self
                        .ask(vec![Prompt::new(format!(
                            "'{}' scores {:.2}; break it into subtasks? (yes/no)",
                            feature,
                            task.score()
                        ))])
                        .await?;
                    let yes = parse_yes_no(&reply[0])?;
                    decisions.push(format!(
                        "user {} breakdown for '{}'",
                        if yes { "confirmed" } else { "declined" },
                        feature
                    ));
                    yes
                }
            };

            if needs_breakdown {
                let reply = self
                    .ask(vec![Prompt::new(format!(
                        "List subtasks for '{}' (comma-separated)",
                        feature
                    ))])
                    .await?;
                let subtasks = parse_list(&reply[0]);
                if subtasks.is_empty() {
                    decisions.push(format!(
                        "breakdown required for '{}' but no subtasks were named; kept whole",
                        feature
                    ));
                } else {
                    decisions.push(format!("broke '{}' into {} subtasks", feature, subtasks.len()));
                    task.break_down(subtasks);
                }
            } else {
                decisions.push(format!("no breakdown for '{}'", feature));
            }

            tasks.push(task);
        }

        self.tasks = tasks;
        Ok(())
    }

    /// Documentation scaffolding: dispatch the three planning documents
    async fn phase_doc_scaffold(&mut self, decisions: &mut Vec<String>) -> Result<(), DriverError> {
        let wants_detail = self.wants_detail();
        for doc in SCAFFOLD_DOCS {
            let task = Task::new(format!("Draft the {} for {}", doc, self.context.primary_goal));
            let agents = allocate(task.score(), 0, self.config.context_budget, wants_detail);
            self.dispatch(
                DispatchInstruction {
                    task_id: task.id.clone(),
                    agent_count: agents,
                    subtasks: Vec::new(),
                },
                decisions,
            )
            .await?;
        }
        Ok(())
    }

    /// Research: one research task per declared integration
    async fn phase_research(&mut self, decisions: &mut Vec<String>) -> Result<(), DriverError> {
        if self.context.integrations.is_empty() {
            decisions.push("no integrations declared; research skipped".to_string());
            return Ok(());
        }

        let wants_detail = self.wants_detail();
        let integrations: Vec<String> = self.context.integrations.iter().cloned().collect();
        for integration in integrations {
            let mut task = Task::new(format!("Research the {} integration", integration));
            task.add_flag(FactorTag::ThirdPartyApiComplexity);
            let agents = allocate(task.score(), 0, self.config.context_budget, wants_detail);
            decisions.push(format!("research '{}' scored {:.2}", integration, task.score()));
            self.dispatch(
                DispatchInstruction {
                    task_id: task.id.clone(),
                    agent_count: agents,
                    subtasks: Vec::new(),
                },
                decisions,
            )
            .await?;
        }
        Ok(())
    }

    /// Plan generation: dispatch the project plan document
    async fn phase_plan_generation(&mut self, decisions: &mut Vec<String>) -> Result<(), DriverError> {
        let task = Task::new(format!("Generate the project plan for {}", self.context.primary_goal));
        let agents = allocate(task.score(), 0, self.config.context_budget, self.wants_detail());
        self.dispatch(
            DispatchInstruction {
                task_id: task.id.clone(),
                agent_count: agents,
                subtasks: Vec::new(),
            },
            decisions,
        )
        .await?;
        Ok(())
    }

    /// Implementation planning: allocate agents to the task tree's
    /// leaves and dispatch them. Tasks with subtasks are never
    /// themselves allocated or dispatched.
    async fn phase_implementation_planning(&mut self, decisions: &mut Vec<String>) -> Result<(), DriverError> {
        if self.tasks.is_empty() && !self.context.must_have_features.is_empty() {
            decisions.push("task tree rebuilt after resume".to_string());
            self.build_task_tree(decisions).await?;
        }
        if self.tasks.is_empty() {
            decisions.push("no implementation tasks to dispatch".to_string());
            return Ok(());
        }

        let wants_detail = self.wants_detail();
        let context_budget = self.config.context_budget;

        let mut roots = std::mem::take(&mut self.tasks);
        let mut instructions = Vec::new();
        for task in &mut roots {
            // Leaves from a breakdown are allocated with the size of the
            // decomposition they belong to; a stand-alone leaf passes 0.
            let sibling_count = task.subtasks.len();
            for leaf in task.leaves_mut() {
                let agents = allocate(leaf.score(), sibling_count, context_budget, wants_detail);
                leaf.agent_count = Some(agents);
                decisions.push(format!(
                    "allocated {} agent(s) to '{}' (score {:.2})",
                    agents,
                    leaf.description,
                    leaf.score()
                ));
                instructions.push(DispatchInstruction {
                    task_id: leaf.id.clone(),
                    agent_count: agents,
                    subtasks: leaf.subtasks.iter().map(|t| t.description.clone()).collect(),
                });
            }
        }
        self.tasks = roots;

        for instruction in instructions {
            self.dispatch(instruction, decisions).await?;
        }
        Ok(())
    }

    /// Continuous adaptation: record living-documentation updates
    async fn phase_adaptation(&mut self, decisions: &mut Vec<String>) -> Result<(), DriverError> {
        let answers = self
            .ask(vec![Prompt::new(
                "Describe any project changes to record (comma-separated, or 'none')",
            )])
            .await?;

        let updates = parse_list(&answers[0]);
        if updates.is_empty() {
            decisions.push("no adaptation updates".to_string());
        } else {
            for update in updates {
                decisions.push(format!("update: {}", update));
            }
        }
        Ok(())
    }
}
