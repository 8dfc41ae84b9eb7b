//! Task domain type
//!
//! A Task is a unit of project work subject to complexity scoring and
//! agent allocation. `score` is derived state: every mutation of the
//! feature flags or file impact count goes through a method that
//! recomputes it, so downstream decisions never read a stale score.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::scoring::{self, FactorTag};

use super::id::generate_id;

/// A unit of project work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier within a planning run
    pub id: String,

    /// What the task accomplishes
    pub description: String,

    /// Complexity factors present in this task
    feature_flags: BTreeSet<FactorTag>,

    /// Number of files the task is expected to touch
    file_impact_count: u32,

    /// Derived complexity score in [0.0, 1.0]
    score: f64,

    /// Whether the breakdown policy required decomposition
    pub breakdown_required: bool,

    /// Subtasks, empty unless broken down
    pub subtasks: Vec<Task>,

    /// Allocated agent count, present only once allocation runs
    pub agent_count: Option<u8>,
}

impl Task {
    /// Create a new task with a generated ID and no factors
    pub fn new(description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            id: generate_id("task", &description),
            description,
            feature_flags: BTreeSet::new(),
            file_impact_count: 0,
            score: 0.0,
            breakdown_required: false,
            subtasks: Vec::new(),
            agent_count: None,
        }
    }

    /// Replace the factor set, recomputing the score
    pub fn set_flags(&mut self, flags: BTreeSet<FactorTag>) {
        self.feature_flags = flags;
        self.recompute();
    }

    /// Add a single factor, recomputing the score
    pub fn add_flag(&mut self, flag: FactorTag) {
        self.feature_flags.insert(flag);
        self.recompute();
    }

    /// Set the file impact count, recomputing the score
    pub fn set_file_impact(&mut self, count: u32) {
        self.file_impact_count = count;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.score = scoring::score(&self.feature_flags, self.file_impact_count);
    }

    /// Current factor set
    pub fn flags(&self) -> &BTreeSet<FactorTag> {
        &self.feature_flags
    }

    /// Current file impact count
    pub fn file_impact(&self) -> u32 {
        self.file_impact_count
    }

    /// Derived complexity score
    pub fn score(&self) -> f64 {
        self.score
    }

    /// A task with subtasks is never itself dispatched
    pub fn is_leaf(&self) -> bool {
        self.subtasks.is_empty()
    }

    /// Break this task into subtasks. Children inherit the parent's
    /// factor set and an even share of its file impact count, so their
    /// scores are derived rather than copied.
    pub fn break_down(&mut self, descriptions: Vec<String>) {
        let n = descriptions.len().max(1) as u32;
        let share = self.file_impact_count / n;
        self.subtasks = descriptions
            .into_iter()
            .map(|d| {
                let mut sub = Task::new(d);
                sub.set_flags(self.feature_flags.clone());
                sub.set_file_impact(share);
                sub
            })
            .collect();
        self.breakdown_required = true;
    }

    /// Leaf tasks of this tree (the task itself when not broken down)
    pub fn leaves(&self) -> Vec<&Task> {
        if self.is_leaf() {
            vec![self]
        } else {
            self.subtasks.iter().flat_map(|t| t.leaves()).collect()
        }
    }

    /// Mutable leaf tasks of this tree
    pub fn leaves_mut(&mut self) -> Vec<&mut Task> {
        if self.is_leaf() {
            vec![self]
        } else {
            self.subtasks.iter_mut().flat_map(|t| t.leaves_mut()).collect()
        }
    }
}
