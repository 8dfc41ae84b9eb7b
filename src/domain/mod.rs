//! Domain types for planforge
//!
//! Core domain types: ProjectContext, SessionEvent, Task, PhaseId.
//! `ProjectContext` is the durable aggregate; task trees are owned by the
//! phase that created them and live only for the duration of a run.

mod context;
mod id;
mod phase;
mod task;

pub use context::{ComplexityPreference, Constraints, ProjectContext, SessionEvent};
pub use id::generate_id;
pub use phase::PhaseId;
pub use task::Task;
