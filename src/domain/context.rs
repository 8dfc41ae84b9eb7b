//! Project context and session history
//!
//! `ProjectContext` is the single owning aggregate for a planning run.
//! Its session history is append-only: phase steps append `SessionEvent`s
//! and nothing ever rewrites or deletes one.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::PhaseId;

/// How much breakdown detail the user wants for mid-complexity tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplexityPreference {
    /// Always decompose, never ask
    FullBreakdown,
    /// Keep tasks high-level, never ask
    HighLevel,
    /// Surface the question every time
    #[default]
    AskEachTime,
}

impl std::fmt::Display for ComplexityPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullBreakdown => write!(f, "full-breakdown"),
            Self::HighLevel => write!(f, "high-level"),
            Self::AskEachTime => write!(f, "ask-each-time"),
        }
    }
}

/// Project constraints gathered during the context interview
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    /// Technical constraints ("must run on-prem", "Postgres only", ...)
    pub technical: BTreeSet<String>,
    /// Timeline constraint, free text
    pub timeline: String,
    /// Budget constraint, free text
    pub budget: String,
}

/// Immutable record of decisions made during one phase step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    /// When the phase step completed
    pub timestamp: DateTime<Utc>,
    /// The phase this event belongs to
    pub phase: PhaseId,
    /// Decisions made during the step, in order
    pub decisions: Vec<String>,
}

impl SessionEvent {
    /// Create an event stamped with the current time
    pub fn now(phase: PhaseId, decisions: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            phase,
            decisions,
        }
    }
}

/// The durable root record for a planning run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    /// Kind of project ("web app", "CLI tool", ...)
    pub project_type: String,
    /// The single primary goal
    pub primary_goal: String,
    /// Who the project serves
    pub target_audience: String,
    /// Must-have features, in the order the user gave them
    pub must_have_features: Vec<String>,
    /// Technical/timeline/budget constraints
    pub constraints: Constraints,
    /// Breakdown preference for mid-complexity tasks
    pub complexity_preference: ComplexityPreference,
    /// External systems the project integrates with
    pub integrations: BTreeSet<String>,
    /// Append-only history of phase steps
    pub session_history: Vec<SessionEvent>,
}

impl ProjectContext {
    /// Append a session event. This is the only mutation path for history.
    pub fn push_event(&mut self, event: SessionEvent) {
        self.session_history.push(event);
    }

    /// All events recorded for a given phase, in order
    pub fn events_for(&self, phase: PhaseId) -> impl Iterator<Item = &SessionEvent> {
        self.session_history.iter().filter(move |e| e.phase == phase)
    }

    /// Whether any event has been recorded for the given phase
    pub fn has_event(&self, phase: PhaseId) -> bool {
        self.session_history.iter().any(|e| e.phase == phase)
    }
}
