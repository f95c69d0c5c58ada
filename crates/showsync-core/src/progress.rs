use crate::error::StepOutcome;
use serde::Serialize;
use std::fmt;

/// Fixed steps of a sync run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStep {
    Metadata,
    PerShow,
    Cloud,
    Social,
    Housekeeping,
}

impl SyncStep {
    pub const ALL: [SyncStep; 5] = [
        SyncStep::Metadata,
        SyncStep::PerShow,
        SyncStep::Cloud,
        SyncStep::Social,
        SyncStep::Housekeeping,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SyncStep::Metadata => "metadata",
            SyncStep::PerShow => "per_show",
            SyncStep::Cloud => "cloud",
            SyncStep::Social => "social",
            SyncStep::Housekeeping => "housekeeping",
        }
    }
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: SyncStep,
    pub outcome: StepOutcome,
}

/// Status of one sync run. Lives only as long as the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncProgress {
    pub current: Option<SyncStep>,
    pub steps: Vec<StepRecord>,
    pub has_error: bool,
    /// First error worth showing to the user.
    pub important_error: Option<String>,
}

impl SyncProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, step: SyncStep) {
        self.current = Some(step);
    }

    pub fn record(&mut self, step: SyncStep, outcome: StepOutcome) {
        if let Some(reason) = outcome.reason() {
            self.has_error = true;
            if self.important_error.is_none() {
                self.important_error = Some(format!("{}: {}", step, reason));
            }
        }
        self.steps.push(StepRecord { step, outcome });
    }

    pub fn finish(&mut self) {
        self.current = None;
    }

    /// Most severe outcome over all recorded steps.
    pub fn outcome(&self) -> StepOutcome {
        self.steps
            .iter()
            .fold(StepOutcome::Success, |acc, r| acc.and(r.outcome.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_is_kept() {
        let mut progress = SyncProgress::new();
        progress.start(SyncStep::Metadata);
        progress.record(SyncStep::Metadata, StepOutcome::Success);
        progress.record(SyncStep::Cloud, StepOutcome::Recoverable("offline".into()));
        progress.record(SyncStep::Social, StepOutcome::Fatal("unauthorized".into()));
        progress.finish();

        assert!(progress.has_error);
        assert_eq!(progress.important_error.as_deref(), Some("cloud: offline"));
        assert_eq!(progress.outcome(), StepOutcome::Fatal("unauthorized".into()));
        assert!(progress.current.is_none());
    }

    #[test]
    fn test_clean_run_is_success() {
        let mut progress = SyncProgress::new();
        for step in SyncStep::ALL {
            progress.record(step, StepOutcome::Success);
        }
        assert!(!progress.has_error);
        assert!(progress.outcome().is_success());
    }
}
