use serde::Serialize;
use thiserror::Error;

/// Errors raised to the caller of the scheduler itself.
///
/// Failures inside task actions never surface here; they are collected in
/// the [`RunReport`](crate::RunReport) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("clock cannot move backwards from {now} to {requested}")]
    InvalidTime { requested: u64, now: u64 },

    #[error("scheduler is already running")]
    AlreadyRunning,
}

/// Why a single task's action did not complete normally.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum TaskExecutionError {
    #[error("task failed: {0}")]
    Failed(String),

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskExecutionError {
    pub(crate) fn from_error(err: &anyhow::Error) -> Self {
        // `{:#}` keeps the whole context chain on one line.
        Self::Failed(format!("{err:#}"))
    }

    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Failed(m) | Self::Panicked(m) => m,
        }
    }
}
