//! Workflow phase enumeration
//!
//! The seven planning phases execute strictly in order on a fresh run.
//! On resume, execution restarts at the first phase with no recorded
//! session event.

use serde::{Deserialize, Serialize};

/// One stage of the seven-stage planning workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseId {
    /// Gather project context via dialogue
    Context,
    /// Build and score the task tree, decide breakdowns
    OrchestrationSetup,
    /// Scaffold the planning documents
    DocScaffold,
    /// Research declared integrations
    Research,
    /// Generate the project plan
    PlanGeneration,
    /// Allocate agents and dispatch implementation tasks
    ImplementationPlanning,
    /// Living-documentation updates (re-entrant)
    Adaptation,
}

impl PhaseId {
    /// All phases in execution order
    pub const ALL: [PhaseId; 7] = [
        PhaseId::Context,
        PhaseId::OrchestrationSetup,
        PhaseId::DocScaffold,
        PhaseId::Research,
        PhaseId::PlanGeneration,
        PhaseId::ImplementationPlanning,
        PhaseId::Adaptation,
    ];

    /// The phase that follows this one, if any
    pub fn successor(&self) -> Option<PhaseId> {
        let idx = Self::ALL.iter().position(|p| p == self)?;
        Self::ALL.get(idx + 1).copied()
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Context => write!(f, "context"),
            Self::OrchestrationSetup => write!(f, "orchestration-setup"),
            Self::DocScaffold => write!(f, "doc-scaffold"),
            Self::Research => write!(f, "research"),
            Self::PlanGeneration => write!(f, "plan-generation"),
            Self::ImplementationPlanning => write!(f, "implementation-planning"),
            Self::Adaptation => write!(f, "adaptation"),
        }
    }
}

impl std::str::FromStr for PhaseId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "context" => Ok(Self::Context),
            "orchestration-setup" | "setup" => Ok(Self::OrchestrationSetup),
            "doc-scaffold" | "scaffold" => Ok(Self::DocScaffold),
            "research" => Ok(Self::Research),
            "plan-generation" | "plan" => Ok(Self::PlanGeneration),
            "implementation-planning" | "implementation" => Ok(Self::ImplementationPlanning),
            "adaptation" => Ok(Self::Adaptation),
            _ => Err(format!(
                "Unknown phase: {}. Use one of: context, orchestration-setup, doc-scaffold, \
                 research, plan-generation, implementation-planning, adaptation",
                s
            )),
        }
    }
}
