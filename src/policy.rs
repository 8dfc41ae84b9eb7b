//! Breakdown policy
//!
//! Decides, per task, whether decomposition into subtasks is required
//! before allocation. Mid-band scores defer to the user's declared
//! preference; `AskUser` is a control signal, not an error, so callers
//! pattern-match on the result.

use crate::domain::ComplexityPreference;

/// Outcome of a breakdown decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownDecision {
    /// The policy could decide on its own
    Decided(bool),
    /// The driver must obtain an explicit yes/no from the user
    AskUser,
}

/// Decide whether a task requires breakdown.
///
/// Rules, evaluated in order:
/// 1. score > 0.5: always required.
/// 2. score in (0.3, 0.5]: defer to preference; `AskEachTime` surfaces
///    `AskUser`.
/// 3. score <= 0.3: not required.
pub fn requires_breakdown(score: f64, preference: ComplexityPreference) -> BreakdownDecision {
    if score > 0.5 {
        BreakdownDecision::Decided(true)
    } else if score > 0.3 {
        match preference {
            ComplexityPreference::FullBreakdown => BreakdownDecision::Decided(true),
            ComplexityPreference::HighLevel => BreakdownDecision::Decided(false),
            ComplexityPreference::AskEachTime => BreakdownDecision::AskUser,
        }
    } else {
        BreakdownDecision::Decided(false)
    }
}
