use std::io;

use thiserror::Error;

use crate::manager::config::MAX_GRACE_PERIOD;

/// Why a task could not be started.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Command not found: {program}")]
    CommandNotFound { program: String },

    #[error("{detail}")]
    SpawnFailed { detail: String },

    /// The supervisor began shutting down while the task was being launched.
    #[error("launch cancelled, supervisor is shutting down")]
    Cancelled,
}

impl LaunchError {
    pub fn spawn_failed(err: &io::Error) -> Self {
        LaunchError::SpawnFailed { detail: err.to_string() }
    }
}

/// Every condition that drives the supervisor into its shutdown sweep.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShutdownReason {
    #[error("{task} command not found: {program}")]
    CommandNotFound { task: String, program: String },

    #[error("{task} failed to start: {detail}")]
    SpawnFailed { task: String, detail: String },

    #[error("{task} process failed with {}", describe_exit(*.code))]
    AbnormalExit { task: String, code: Option<i32> },

    #[error("User interrupt (Ctrl+C)")]
    UserInterrupt,

    #[error("{task} task unit panicked")]
    UnitPanicked { task: String },
}

impl ShutdownReason {
    /// Maps a launch failure of `task` to the matching reason. `Cancelled`
    /// has no reason: shutdown is already under way.
    pub fn from_launch(task: &str, err: &LaunchError) -> Option<Self> {
        match err {
            LaunchError::CommandNotFound { program } => Some(ShutdownReason::CommandNotFound {
                task: task.to_string(),
                program: program.clone(),
            }),
            LaunchError::SpawnFailed { detail } => Some(ShutdownReason::SpawnFailed {
                task: task.to_string(),
                detail: detail.clone(),
            }),
            LaunchError::Cancelled => None,
        }
    }
}

pub fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry is sealed, cannot register '{0}'")]
    Sealed(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("expected NAME=VALUE, got '{0}'")]
    MalformedPair(String),

    #[error("task '{0}' has an empty command")]
    EmptyCommand(String),

    #[error("task '{0}' has unbalanced quotes in its command")]
    BadQuoting(String),

    #[error("task '{0}' is defined more than once")]
    DuplicateTask(String),

    #[error("'{0}' does not name a configured task")]
    UnknownTask(String),

    #[error("unknown color '{0}'")]
    UnknownColor(String),

    #[error("grace period must be between 0 and {max} seconds, got {0}", max = MAX_GRACE_PERIOD.as_secs())]
    InvalidGrace(f64),
}
