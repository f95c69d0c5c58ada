use chrono::{DateTime, Duration, Utc};
use showsync_config::{SchedulerConfig, StateStore};
use tracing::info;

/// Exponential back-off for automatic syncs:
/// `base * 2^min(failures - 1, max_exponent)` after `failures` failed runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max_exponent: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::minutes(5),
            max_exponent: 6,
        }
    }
}

/// No back-off delay is longer than this.
pub fn max_delay() -> Duration {
    Duration::days(7)
}

impl BackoffPolicy {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let base = i64::try_from(config.backoff_base_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .map_or(max_delay(), |base| base.min(max_delay()));
        Self {
            base,
            max_exponent: config.backoff_max_exponent,
        }
    }

    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::zero();
        }
        let exponent = (failures - 1).min(self.max_exponent).min(30);
        self.base
            .checked_mul(1i32 << exponent)
            .map_or(max_delay(), |delay| delay.min(max_delay()))
    }

    /// Count one more failed run and push the next allowed run out.
    pub fn record_failure(&self, state: &mut StateStore, now: DateTime<Utc>) -> DateTime<Utc> {
        let failures = state.failed_attempts().saturating_add(1);
        let next = now + self.delay(failures);
        state.set_failed_attempts(failures);
        state.set_next_allowed_sync(next);
        info!(failures, next_allowed_at = %next, "Sync failed, backing off");
        next
    }

    pub fn record_success(&self, state: &mut StateStore, now: DateTime<Utc>) {
        state.set_failed_attempts(0);
        state.set_next_allowed_sync(now);
        state.set_last_successful_sync(now);
    }

    pub fn is_allowed(state: &StateStore, now: DateTime<Utc>) -> bool {
        state.next_allowed_sync().map_or(true, |next| now >= next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = BackoffPolicy {
            base: Duration::minutes(5),
            max_exponent: 3,
        };
        assert_eq!(policy.delay(0), Duration::zero());
        assert_eq!(policy.delay(1), Duration::minutes(5));
        assert_eq!(policy.delay(2), Duration::minutes(10));
        assert_eq!(policy.delay(4), Duration::minutes(40));
        assert_eq!(policy.delay(5), Duration::minutes(40));
        assert_eq!(policy.delay(100), Duration::minutes(40));
    }

    #[test]
    fn test_failure_then_success_resets() {
        let policy = BackoffPolicy::default();
        let mut state = StateStore::in_memory();
        let now = Utc::now();

        assert!(BackoffPolicy::is_allowed(&state, now));
        let next = policy.record_failure(&mut state, now);
        assert_eq!(next, now + Duration::minutes(5));
        assert!(!BackoffPolicy::is_allowed(&state, now));

        let next = policy.record_failure(&mut state, now);
        assert_eq!(next, now + Duration::minutes(10));
        assert_eq!(state.failed_attempts(), 2);

        policy.record_success(&mut state, now);
        assert_eq!(state.failed_attempts(), 0);
        assert!(BackoffPolicy::is_allowed(&state, now));
        assert_eq!(state.last_successful_sync(), Some(now));
    }

    #[test]
    fn test_delay_is_bounded() {
        let policy = BackoffPolicy {
            base: Duration::days(3),
            max_exponent: u32::MAX,
        };
        assert_eq!(policy.delay(1), Duration::days(3));
        assert_eq!(policy.delay(2), max_delay());
        assert_eq!(policy.delay(u32::MAX), max_delay());

        let config = SchedulerConfig {
            backoff_base_minutes: u64::MAX,
            ..SchedulerConfig::default()
        };
        assert_eq!(BackoffPolicy::from_config(&config).base, max_delay());
    }

    #[test]
    fn test_from_config() {
        let config = SchedulerConfig::default();
        let policy = BackoffPolicy::from_config(&config);
        assert_eq!(policy.base, Duration::minutes(config.backoff_base_minutes as i64));
        assert_eq!(policy.max_exponent, config.backoff_max_exponent);
    }
}
