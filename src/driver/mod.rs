//! Orchestration driver and collaborator seams
//!
//! The driver owns the control loop; collaborators (dialogue, execution)
//! are external and reached through async traits. Answer validation
//! happens at this boundary so the pure decision functions never see
//! malformed input.

mod answers;
mod collab;
mod core;

pub use answers::{
    non_empty, parse_file_impact, parse_flags, parse_list, parse_preference, parse_yes_no, ValidationError,
};
pub use collab::{
    Answer, CollaboratorError, CompletionSignal, DialogueCollaborator, DispatchInstruction, ExecutionCollaborator,
    LoggingExecutor, Prompt, StdinDialogue,
};
pub use core::{DriverError, Orchestrator};
