use crate::store::StoreError;
use serde::Serialize;
use showsync_models::Provider;
use showsync_remote::RemoteError;
use std::fmt;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("offline")]
    Offline,

    #[error("{0} is no longer authorized")]
    Unauthorized(Provider),

    #[error("remote limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("failed to parse remote response: {0}")]
    Parse(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("local store error: {0}")]
    Store(#[from] StoreError),

    #[error("sync interrupted")]
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Try again on the next scheduled run.
    Recoverable,
    /// Needs the user (re-auth, account limit) or the caller asked to stop.
    Fatal,
}

impl SyncError {
    pub fn from_remote(provider: Provider, error: RemoteError) -> Self {
        match error {
            RemoteError::Offline => SyncError::Offline,
            RemoteError::Unauthorized => SyncError::Unauthorized(provider),
            RemoteError::LimitExceeded(message) => SyncError::LimitExceeded(message),
            RemoteError::Parse(message) => SyncError::Parse(message),
            other => SyncError::Remote(format!("{}: {}", provider, other)),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            SyncError::Offline
            | SyncError::Parse(_)
            | SyncError::Remote(_)
            | SyncError::Store(_) => Severity::Recoverable,
            SyncError::Unauthorized(_) | SyncError::LimitExceeded(_) | SyncError::Interrupted => {
                Severity::Fatal
            }
        }
    }

    /// Errors an orchestrator must hand to its caller instead of recording.
    pub fn must_propagate(&self) -> bool {
        matches!(self, SyncError::Interrupted | SyncError::Unauthorized(_))
    }
}

/// Aggregated result of a stage, an orchestrator or a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    Recoverable(String),
    Fatal(String),
}

impl StepOutcome {
    pub fn from_error(error: &SyncError) -> Self {
        match error.severity() {
            Severity::Recoverable => StepOutcome::Recoverable(error.to_string()),
            Severity::Fatal => StepOutcome::Fatal(error.to_string()),
        }
    }

    /// Combine two outcomes, keeping the most severe one. On a tie the
    /// first reason wins.
    pub fn and(self, other: StepOutcome) -> StepOutcome {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            StepOutcome::Success => None,
            StepOutcome::Recoverable(reason) | StepOutcome::Fatal(reason) => Some(reason),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            StepOutcome::Success => 0,
            StepOutcome::Recoverable(_) => 1,
            StepOutcome::Fatal(_) => 2,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Success => f.write_str("success"),
            StepOutcome::Recoverable(reason) => write!(f, "failed, will retry: {}", reason),
            StepOutcome::Fatal(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Fold a stage result into an orchestrator outcome.
///
/// Returns whether the stage succeeded. Errors the orchestrator must not
/// swallow, and a lost connection which would fail every later stage too,
/// are returned as `Err`.
pub(crate) fn record_stage(
    outcome: &mut StepOutcome,
    provider: Provider,
    stage: &str,
    result: Result<(), SyncError>,
) -> Result<bool, SyncError> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.must_propagate() || matches!(e, SyncError::Offline) => Err(e),
        Err(e) => {
            warn!(provider = %provider, stage, error = %e, "Sync stage failed");
            let current = std::mem::replace(outcome, StepOutcome::Success);
            *outcome = current.and(StepOutcome::from_error(&e));
            Ok(false)
        }
    }
}

/// Outcome of an orchestrator run that ended early with `error`.
pub(crate) fn finish_early(outcome: StepOutcome, error: SyncError) -> Result<StepOutcome, SyncError> {
    match error {
        SyncError::Offline => Ok(outcome.and(StepOutcome::from_error(&SyncError::Offline))),
        other => Err(other),
    }
}
