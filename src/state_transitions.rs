//! Task status transitions.
//!
//! By default any status can move to any other status. A stricter table is
//! available through [`TransitionPolicy::Strict`] (`transitions.strict` in
//! the config file).

use crate::error::{AppError, AppResult};
use crate::types::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which status changes are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Any status to any status.
    #[default]
    Unrestricted,
    /// Only the moves in [`is_allowed_strict`].
    Strict,
}

impl TransitionPolicy {
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Unrestricted
        }
    }

    /// Validate a status change. Moving to the current status is always allowed.
    pub fn check(&self, from: TaskStatus, to: TaskStatus) -> AppResult<()> {
        match self {
            TransitionPolicy::Unrestricted => Ok(()),
            TransitionPolicy::Strict if from == to || is_allowed_strict(from, to) => Ok(()),
            TransitionPolicy::Strict => Err(AppError::invalid_transition(from, to)),
        }
    }
}

/// The strict transition table.
///
/// Completed and canceled tasks can only be reopened (back to not started).
pub fn is_allowed_strict(from: TaskStatus, to: TaskStatus) -> bool {
    use TaskStatus::*;
    matches!(
        (from, to),
        (NotStarted, InProgress)
            | (NotStarted, Canceled)
            | (NotStarted, Reminded)
            | (Reminded, InProgress)
            | (Reminded, Canceled)
            | (Reminded, NotStarted)
            | (InProgress, Completed)
            | (InProgress, Canceled)
            | (InProgress, NotStarted)
            | (Completed, NotStarted)
            | (Canceled, NotStarted)
    )
}

/// Produce the task that results from moving `task` to `status` at `now`.
///
/// Completing a task stamps `end_time = now` and derives the actual
/// duration as whole minutes since the scheduled start, at least 1.
/// Every other move only changes the status.
pub fn apply_status(task: &Task, status: TaskStatus, now: DateTime<Utc>) -> Task {
    let mut next = task.clone();
    next.status = status;

    if status == TaskStatus::Completed {
        next.end_time = now;
        next.actual_duration = Some(elapsed_minutes(task.start_time, now));
    }

    next
}

/// Whole minutes from `start` to `now`, floored, minimum 1.
pub fn elapsed_minutes(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let elapsed_ms = (now - start).num_milliseconds();
    elapsed_ms.div_euclid(60_000).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;
    use chrono::{Duration, TimeZone};

    fn task_at(start: DateTime<Utc>) -> Task {
        Task {
            id: "t1".into(),
            title: "Write Report".into(),
            task_type: "Work".into(),
            priority: Priority::High,
            status: TaskStatus::InProgress,
            subtasks: vec![],
            created_at: start,
            start_time: start,
            end_time: start + Duration::minutes(30),
            estimated_duration: 30,
            actual_duration: None,
            notes: None,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_complete_sets_end_and_floored_duration() {
        let task = task_at(t0());
        let now = t0() + Duration::minutes(47) + Duration::seconds(59);
        let done = apply_status(&task, TaskStatus::Completed, now);
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.end_time, now);
        assert_eq!(done.actual_duration, Some(47));
    }

    #[test]
    fn test_complete_duration_is_at_least_one_minute() {
        let task = task_at(t0());
        let done = apply_status(&task, TaskStatus::Completed, t0() + Duration::seconds(5));
        assert_eq!(done.actual_duration, Some(1));

        // Completed before the scheduled start
        let early = apply_status(&task, TaskStatus::Completed, t0() - Duration::hours(2));
        assert_eq!(early.actual_duration, Some(1));
    }

    #[test]
    fn test_other_transitions_touch_only_status() {
        let task = task_at(t0());
        for status in [
            TaskStatus::NotStarted,
            TaskStatus::InProgress,
            TaskStatus::Canceled,
            TaskStatus::Reminded,
        ] {
            let next = apply_status(&task, status, t0() + Duration::hours(5));
            assert_eq!(next.status, status);
            assert_eq!(next.end_time, task.end_time);
            assert_eq!(next.actual_duration, task.actual_duration);
            assert_eq!(next.start_time, task.start_time);
        }
    }

    #[test]
    fn test_unrestricted_policy_accepts_everything() {
        let policy = TransitionPolicy::Unrestricted;
        for from in TaskStatus::ALL {
            for to in TaskStatus::ALL {
                assert!(policy.check(from, to).is_ok());
            }
        }
    }

    #[test]
    fn test_strict_policy_rejects_completed_to_in_progress() {
        let policy = TransitionPolicy::Strict;
        assert!(policy.check(TaskStatus::InProgress, TaskStatus::Completed).is_ok());
        assert!(policy.check(TaskStatus::Completed, TaskStatus::Completed).is_ok());
        let err = policy
            .check(TaskStatus::Completed, TaskStatus::InProgress)
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidTransition);
        assert!(policy.check(TaskStatus::NotStarted, TaskStatus::Completed).is_err());
    }
}
