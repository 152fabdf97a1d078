//! Trigger policies: the rules deciding whether a job is due
//!
//! A [`TriggerPolicy`] answers "is this job due at time T, given when it
//! last ran?". The closed set of strategies is cron-based, fixed-interval,
//! and one-shot.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tempo_common::time::{CronParseError, CronSchedule};

/// Firing strategy for a registered job.
#[derive(Debug, Clone)]
pub enum TriggerPolicy {
    /// Due whenever the cron schedule matches the evaluation timestamp.
    Cron(CronSchedule),
    /// Due when `period` has elapsed since the last run (or since
    /// registration if the job never ran). With `repeatable` false the job
    /// fires at most once.
    Interval { period: Duration, repeatable: bool },
    /// Due exactly one time; never again after its first dispatch.
    Once,
}

impl TriggerPolicy {
    /// Build a cron trigger from expression text.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`CronParseError`] when the expression is
    /// malformed.
    pub fn cron(expr: &str) -> Result<Self, CronParseError> {
        Ok(Self::Cron(CronSchedule::parse(expr)?))
    }

    /// Recurring fixed-interval trigger.
    pub fn every(period: Duration) -> Self {
        Self::Interval { period, repeatable: true }
    }

    /// Fixed-delay trigger that fires a single time after `period`.
    pub fn after(period: Duration) -> Self {
        Self::Interval { period, repeatable: false }
    }

    /// Evaluate whether the job is due at `now`.
    ///
    /// `last_run` is the most recent dispatch time; `registered_at` anchors
    /// interval triggers that have never fired.
    pub fn is_due(
        &self,
        now: DateTime<Utc>,
        last_run: Option<DateTime<Utc>>,
        registered_at: DateTime<Utc>,
    ) -> bool {
        match self {
            Self::Cron(schedule) => schedule.is_due(&now),
            Self::Interval { period, repeatable } => {
                if !repeatable && last_run.is_some() {
                    return false;
                }
                let anchor = last_run.unwrap_or(registered_at);
                let period = TimeDelta::from_std(*period).unwrap_or(TimeDelta::MAX);
                now.signed_duration_since(anchor) >= period
            }
            Self::Once => last_run.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, second).unwrap()
    }

    #[test]
    fn once_is_due_until_first_dispatch() {
        let trigger = TriggerPolicy::Once;
        assert!(trigger.is_due(t(0), None, t(0)));
        assert!(!trigger.is_due(t(30), Some(t(1)), t(0)));
    }

    #[test]
    fn interval_anchors_on_registration_before_first_run() {
        let trigger = TriggerPolicy::every(Duration::from_secs(10));
        assert!(!trigger.is_due(t(5), None, t(0)));
        assert!(trigger.is_due(t(10), None, t(0)));
    }

    #[test]
    fn interval_anchors_on_last_run_afterwards() {
        let trigger = TriggerPolicy::every(Duration::from_secs(10));
        assert!(!trigger.is_due(t(15), Some(t(10)), t(0)));
        assert!(trigger.is_due(t(20), Some(t(10)), t(0)));
    }

    #[test]
    fn non_repeatable_interval_fires_at_most_once() {
        let trigger = TriggerPolicy::after(Duration::from_secs(10));
        assert!(trigger.is_due(t(10), None, t(0)));
        assert!(!trigger.is_due(t(59), Some(t(10)), t(0)));
    }

    #[test]
    fn cron_trigger_delegates_to_schedule() {
        let trigger = TriggerPolicy::cron("*/15 * * * * *").unwrap();
        assert!(trigger.is_due(t(15), None, t(0)));
        assert!(!trigger.is_due(t(16), None, t(0)));
        // Cron evaluation ignores run history.
        assert!(trigger.is_due(t(30), Some(t(15)), t(0)));
    }

    #[test]
    fn cron_trigger_surfaces_parse_errors() {
        assert!(TriggerPolicy::cron("not a cron").is_err());
    }
}
