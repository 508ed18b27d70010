use thiserror::Error;

use metronome_core::RuleError;

/// Errors raised by registry operations and configuration loading.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Task names must be non-empty.
    #[error("Task name is empty")]
    EmptyName,

    /// Rule text must be non-empty.
    #[error("Rule text is empty")]
    EmptyRule,

    /// A task with this name is already registered.
    #[error("Task already exists: {name}")]
    DuplicateTask { name: String },

    /// No task with this name is registered.
    #[error("Task not found: {name}")]
    TaskNotFound { name: String },

    /// At least one callback is required for this operation.
    #[error("No callbacks supplied")]
    NoCallbacks,

    /// The operation is not permitted while the poll loop runs.
    #[error("Poll loop is running")]
    Running,

    /// The rule text failed decoding or validation.
    #[error("Invalid rule: {0}")]
    Rule(#[from] RuleError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
