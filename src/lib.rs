//! planforge - interactive planning orchestrator
//!
//! planforge drives a seven-phase planning dialogue that turns an
//! unstructured project idea into structured documentation, deciding
//! along the way how much of the work should be delegated to parallel
//! helper agents.
//!
//! # Core Concepts
//!
//! - **Decision engine, not executor**: planforge scores tasks, decides
//!   breakdowns, and allocates agent counts; the actual dialogue and
//!   execution are external collaborators behind trait seams
//! - **State in one record**: everything durable lives in a single
//!   atomically-written `ProjectContext` record per project
//! - **Resumable by construction**: phases record append-only session
//!   events; resume restarts at the first phase with no event
//!
//! # Modules
//!
//! - [`domain`] - ProjectContext, SessionEvent, Task, PhaseId
//! - [`state`] - durable session store with schema versioning
//! - [`scoring`] - factor tags and the complexity scorer
//! - [`policy`] - the breakdown policy
//! - [`allocation`] - the agent allocation planner
//! - [`machine`] - the phase state machine
//! - [`driver`] - the orchestration driver and collaborator seams
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod allocation;
pub mod cli;
pub mod config;
pub mod domain;
pub mod driver;
pub mod machine;
pub mod policy;
pub mod scoring;
pub mod state;

// Re-export commonly used types
pub use allocation::{allocate, MAX_CONCURRENT_AGENTS};
pub use config::{Config, OrchestrationConfig, StorageConfig};
pub use domain::{ComplexityPreference, Constraints, PhaseId, ProjectContext, SessionEvent, Task};
pub use driver::{
    CollaboratorError, CompletionSignal, DialogueCollaborator, DispatchInstruction, DriverError,
    ExecutionCollaborator, LoggingExecutor, Orchestrator, Prompt, StdinDialogue, ValidationError,
};
pub use machine::{MachineError, PhaseMachine, PhaseState};
pub use policy::{requires_breakdown, BreakdownDecision};
pub use scoring::{score, FactorTag};
pub use state::{SessionStore, StoreError, StoreLock, SCHEMA_VERSION};
