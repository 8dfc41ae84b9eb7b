//! Complexity scoring
//!
//! A pure, deterministic function from a task's factor tags and file
//! impact count to a score in [0.0, 1.0]. Weights are additive and never
//! subtract; invalid inputs are rejected upstream, never here.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A boolean feature of a task contributing additively to its score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactorTag {
    // Technical factors
    NewFramework,
    CrossSystemIntegration,
    RealTime,
    PaymentProcessing,
    AuthSecurity,
    // Scope factors
    NewArchitecture,
    BreakingChange,
    SchemaChange,
    // Domain factors
    UnfamiliarDomain,
    RegulatoryCompliance,
    ThirdPartyApiComplexity,
}

impl FactorTag {
    /// All known tags, for parsing help text
    pub const ALL: [FactorTag; 11] = [
        FactorTag::NewFramework,
        FactorTag::CrossSystemIntegration,
        FactorTag::RealTime,
        FactorTag::PaymentProcessing,
        FactorTag::AuthSecurity,
        FactorTag::NewArchitecture,
        FactorTag::BreakingChange,
        FactorTag::SchemaChange,
        FactorTag::UnfamiliarDomain,
        FactorTag::RegulatoryCompliance,
        FactorTag::ThirdPartyApiComplexity,
    ];

    /// Additive weight of this factor
    pub fn weight(&self) -> f64 {
        match self {
            Self::NewFramework => 0.3,
            Self::CrossSystemIntegration => 0.3,
            Self::RealTime => 0.2,
            Self::PaymentProcessing => 0.2,
            Self::AuthSecurity => 0.2,
            Self::NewArchitecture => 0.3,
            Self::BreakingChange => 0.2,
            Self::SchemaChange => 0.2,
            Self::UnfamiliarDomain => 0.2,
            Self::RegulatoryCompliance => 0.3,
            Self::ThirdPartyApiComplexity => 0.2,
        }
    }
}

impl std::fmt::Display for FactorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NewFramework => "new-framework",
            Self::CrossSystemIntegration => "cross-system-integration",
            Self::RealTime => "real-time",
            Self::PaymentProcessing => "payment-processing",
            Self::AuthSecurity => "auth-security",
            Self::NewArchitecture => "new-architecture",
            Self::BreakingChange => "breaking-change",
            Self::SchemaChange => "schema-change",
            Self::UnfamiliarDomain => "unfamiliar-domain",
            Self::RegulatoryCompliance => "regulatory-compliance",
            Self::ThirdPartyApiComplexity => "third-party-api-complexity",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for FactorTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "new-framework" => Ok(Self::NewFramework),
            "cross-system-integration" => Ok(Self::CrossSystemIntegration),
            "real-time" => Ok(Self::RealTime),
            "payment-processing" => Ok(Self::PaymentProcessing),
            "auth-security" => Ok(Self::AuthSecurity),
            "new-architecture" => Ok(Self::NewArchitecture),
            "breaking-change" => Ok(Self::BreakingChange),
            "schema-change" => Ok(Self::SchemaChange),
            "unfamiliar-domain" => Ok(Self::UnfamiliarDomain),
            "regulatory-compliance" => Ok(Self::RegulatoryCompliance),
            "third-party-api-complexity" => Ok(Self::ThirdPartyApiComplexity),
            _ => Err(format!("Unknown factor tag: {}", s)),
        }
    }
}

/// Weight contributed by the file impact count. Ranges are mutually
/// exclusive: >10 files, 5..=10 files, fewer.
fn impact_weight(file_impact_count: u32) -> f64 {
    if file_impact_count > 10 {
        0.3
    } else if file_impact_count >= 5 {
        0.2
    } else {
        0.0
    }
}

/// Score a task from its factor tags and file impact count.
///
/// The result is the sum of all applicable weights, clamped to 1.0.
/// Identical inputs always produce the identical score.
pub fn score(flags: &BTreeSet<FactorTag>, file_impact_count: u32) -> f64 {
    let total: f64 = flags.iter().map(FactorTag::weight).sum::<f64>() + impact_weight(file_impact_count);
    total.min(1.0)
}
