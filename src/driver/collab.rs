//! Collaborator interfaces
//!
//! The decision engine never talks to users or executes work itself.
//! Dialogue and execution are external collaborators behind async trait
//! seams; the driver only maps their answers and emits dispatch
//! instructions.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// A single question put to the dialogue collaborator
#[derive(Debug, Clone)]
pub struct Prompt {
    pub text: String,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Free-text answer from the dialogue collaborator
pub type Answer = String;

/// Errors from external collaborator calls
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Dialogue cancelled by user")]
    Cancelled,

    #[error("Collaborator call failed: {0}")]
    Failed(String),

    #[error("Expected {expected} answers, got {got}")]
    AnswerCount { expected: usize, got: usize },
}

/// Dialogue collaborator: given an ordered sequence of prompts, returns
/// an ordered sequence of answers.
#[async_trait]
pub trait DialogueCollaborator: Send {
    async fn ask(&mut self, prompts: &[Prompt]) -> Result<Vec<Answer>, CollaboratorError>;
}

/// Instruction emitted to the execution collaborator for one leaf task
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchInstruction {
    pub task_id: String,
    pub agent_count: u8,
    pub subtasks: Vec<String>,
}

/// Completion signal returned by the execution collaborator. The driver
/// never inspects artifact contents.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    pub success: bool,
    pub artifact: Option<String>,
}

/// Execution collaborator: performs the dispatched work with up to
/// `agent_count` parallelism and reports completion.
#[async_trait]
pub trait ExecutionCollaborator: Send {
    async fn dispatch(&mut self, instruction: &DispatchInstruction) -> Result<CompletionSignal, CollaboratorError>;
}

/// Interactive dialogue over stdin/stdout
pub struct StdinDialogue;

#[async_trait]
impl DialogueCollaborator for StdinDialogue {
    async fn ask(&mut self, prompts: &[Prompt]) -> Result<Vec<Answer>, CollaboratorError> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut answers = Vec::with_capacity(prompts.len());

        for prompt in prompts {
            println!("\n{}", prompt.text);
            print!("> ");
            stdout.flush().map_err(|e| CollaboratorError::Failed(e.to_string()))?;

            let line = match stdin.lock().lines().next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Err(CollaboratorError::Failed(e.to_string())),
                // EOF - treat as cancel
                None => return Err(CollaboratorError::Cancelled),
            };

            let input = line.trim();
            if matches!(input.to_lowercase().as_str(), "quit" | "exit" | "/quit" | "/exit") {
                return Err(CollaboratorError::Cancelled);
            }

            answers.push(input.to_string());
        }

        Ok(answers)
    }
}

/// Execution collaborator for development runs: logs each dispatch
/// instruction instead of executing it, and remembers what was emitted.
#[derive(Default)]
pub struct LoggingExecutor {
    pub dispatched: Vec<DispatchInstruction>,
}

#[async_trait]
impl ExecutionCollaborator for LoggingExecutor {
    async fn dispatch(&mut self, instruction: &DispatchInstruction) -> Result<CompletionSignal, CollaboratorError> {
        info!(
            task_id = %instruction.task_id,
            agents = instruction.agent_count,
            subtasks = instruction.subtasks.len(),
            "Dispatching task"
        );
        debug!(?instruction, "Dispatch instruction");
        self.dispatched.push(instruction.clone());
        Ok(CompletionSignal {
            success: true,
            artifact: None,
        })
    }
}
