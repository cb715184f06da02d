use std::fmt;

use crate::error::GitvendError;

/// Registry operation applied to a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Update,
    Push,
    Command,
    Clone,
}

impl Operation {
    pub fn verb(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Update => "update",
            Operation::Push => "push",
            Operation::Command => "command",
            Operation::Clone => "clone",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// What a successful operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Added,
    Updated,
    Synced,
    /// Captured output of an executed command.
    Executed(String),
}

/// A per-plugin failure inside a batch.
#[derive(Debug)]
pub struct Failure {
    pub plugin: String,
    pub operation: Operation,
    pub error: GitvendError,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.operation, self.plugin, self.error)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result of one plugin within a batch.
#[derive(Debug)]
pub struct Outcome {
    pub plugin: String,
    pub result: Result<Disposition, Failure>,
}

/// Everything that happened during one batch, in processing order.
#[derive(Debug)]
pub struct BatchReport {
    pub operation: Operation,
    pub outcomes: Vec<Outcome>,
}

impl BatchReport {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            outcomes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// True when at least one plugin was attempted and none succeeded.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == 0
    }

    /// Names of the plugins that were attempted.
    pub fn touched(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.plugin.as_str()).collect()
    }
}

/// Receives progress notifications while a batch runs.
pub trait BatchObserver {
    fn started(&self, _plugin: &str, _operation: Operation) {}
    fn finished(&self, _outcome: &Outcome) {}
}

/// Observer that ignores every notification.
pub struct Silent;

impl BatchObserver for Silent {}
