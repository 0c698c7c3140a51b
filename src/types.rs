//! Core types for the focus task tracker.
//!
//! Field names follow the persisted JSON documents (camelCase), so a task
//! list written by one version can be read back by another.

use chrono::{DateTime, Duration, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
    Canceled,
    /// Start time arrived while the task was still not started.
    Reminded,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Canceled,
        TaskStatus::Reminded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Canceled => "CANCELED",
            TaskStatus::Reminded => "REMINDED",
        }
    }

    /// Human readable label used in listings.
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "pending",
            TaskStatus::InProgress => "in progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Canceled => "canceled",
            TaskStatus::Reminded => "reminded",
        }
    }

    /// Parse a status from user input. Accepts the stored form
    /// (`IN_PROGRESS`) as well as `in-progress`, `in progress` or `inprogress`.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "notstarted" | "pending" | "todo" => Some(TaskStatus::NotStarted),
            "inprogress" | "started" | "active" => Some(TaskStatus::InProgress),
            "completed" | "done" => Some(TaskStatus::Completed),
            "canceled" | "cancelled" => Some(TaskStatus::Canceled),
            "reminded" => Some(TaskStatus::Reminded),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
///
/// Documents written by other tools may carry priorities this version does
/// not know; those load as `Unknown` and sort last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
    #[serde(other)]
    Unknown,
}

impl Priority {
    pub const KNOWN: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Sort weight: higher is more important.
    pub fn weight(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
            Priority::Unknown => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
            Priority::Unknown => "UNKNOWN",
        }
    }

    /// Parse a priority string ("high", "medium", "low"), case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" | "h" => Some(Priority::High),
            "medium" | "normal" | "m" => Some(Priority::Medium),
            "low" | "l" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checklist item owned by exactly one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u32>,
}

/// A tracked task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Free-text category.
    #[serde(rename = "type")]
    pub task_type: String,
    pub priority: Priority,
    pub status: TaskStatus,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    pub created_at: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    /// Scheduled end; replaced by the completion time when completed.
    pub end_time: DateTime<Utc>,
    /// Minutes.
    pub estimated_duration: u32,
    /// Minutes, set on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Input for creating a task (the "new task" form).
///
/// Unset fields take the documented defaults in [`crate::app::AppState::create_task`].
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub task_type: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub estimated_duration: Option<u32>,
    pub subtasks: Vec<SubtaskDraft>,
    pub notes: Option<String>,
}

/// Input for a new subtask.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtaskDraft {
    pub title: String,
    pub estimated_duration: Option<u32>,
}

impl SubtaskDraft {
    /// Parse `title` or `title:minutes`.
    pub fn parse(s: &str) -> Self {
        if let Some((title, minutes)) = s.rsplit_once(':')
            && let Ok(minutes) = minutes.trim().parse::<u32>()
        {
            return Self {
                title: title.trim().to_string(),
                estimated_duration: Some(minutes),
            };
        }
        Self {
            title: s.trim().to_string(),
            estimated_duration: None,
        }
    }
}

/// Default estimate for a new task, in minutes.
pub const DEFAULT_ESTIMATE_MINUTES: u32 = 30;

/// Default idle/overdue threshold, in hours.
pub const DEFAULT_IDLE_REMINDER_HOURS: f64 = 2.0;

/// Largest accepted idle/overdue threshold, in hours (one year).
pub const MAX_IDLE_REMINDER_HOURS: f64 = 24.0 * 365.0;

/// User settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Hours before an overdue or idle reminder fires.
    pub idle_reminder_interval: f64,
    pub notifications_enabled: bool,
    /// Fields written by other versions; kept so they survive a save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            idle_reminder_interval: DEFAULT_IDLE_REMINDER_HOURS,
            notifications_enabled: false,
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// The idle/overdue threshold as a duration.
    ///
    /// Stored values come from outside this program, so anything that is not
    /// a positive number falls back to the default and large values are
    /// capped at [`MAX_IDLE_REMINDER_HOURS`].
    pub fn idle_threshold(&self) -> Duration {
        let stored = self.idle_reminder_interval;
        let hours = if stored.is_finite() && stored > 0.0 {
            stored.min(MAX_IDLE_REMINDER_HOURS)
        } else {
            DEFAULT_IDLE_REMINDER_HOURS
        };
        Duration::milliseconds((hours * 3_600_000.0) as i64)
    }
}

/// A filter selection: either everything (`"ALL"` on disk) or one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: PartialEq> Selection<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(selected) => selected == value,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

const ALL_SENTINEL: &str = "ALL";

impl<T: Serialize> Serialize for Selection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selection::All => serializer.serialize_str(ALL_SENTINEL),
            Selection::Only(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Selection<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.as_str() == Some(ALL_SENTINEL) {
            return Ok(Selection::All);
        }
        serde_json::from_value(value)
            .map(Selection::Only)
            .map_err(D::Error::custom)
    }
}

/// Persisted list filters. Only affects the derived view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub status: Selection<TaskStatus>,
    #[serde(rename = "type")]
    pub task_type: Selection<String>,
    pub priority: Selection<Priority>,
    pub search: String,
}

/// Aggregate statistics over completed tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskStats {
    pub completed_count: usize,
    /// Sum of actual durations, in minutes.
    pub focus_minutes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_parse_variants() {
        assert_eq!(TaskStatus::parse("IN_PROGRESS"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::parse("in-progress"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::parse("done"), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::parse("cancelled"), Some(TaskStatus::Canceled));
        assert_eq!(TaskStatus::parse("bogus"), None);
    }

    #[test]
    fn test_unknown_priority_loads_with_zero_weight() {
        let p: Priority = serde_json::from_value(json!("URGENT")).unwrap();
        assert_eq!(p, Priority::Unknown);
        assert_eq!(p.weight(), 0);
    }

    #[test]
    fn test_selection_serde() {
        let all: Selection<TaskStatus> = serde_json::from_value(json!("ALL")).unwrap();
        assert!(all.is_all());
        let only: Selection<TaskStatus> = serde_json::from_value(json!("COMPLETED")).unwrap();
        assert_eq!(only, Selection::Only(TaskStatus::Completed));
        assert_eq!(serde_json::to_value(&only).unwrap(), json!("COMPLETED"));
        assert_eq!(serde_json::to_value(Selection::<String>::All).unwrap(), json!("ALL"));
    }

    #[test]
    fn test_filter_state_defaults_serialize_as_all() {
        let value = serde_json::to_value(FilterState::default()).unwrap();
        assert_eq!(
            value,
            json!({"status": "ALL", "type": "ALL", "priority": "ALL", "search": ""})
        );
    }

    #[test]
    fn test_settings_keep_unknown_fields() {
        let settings: Settings = serde_json::from_value(json!({
            "idleReminderInterval": 3,
            "notificationsEnabled": true,
            "theme": "dark"
        }))
        .unwrap();
        assert_eq!(settings.idle_reminder_interval, 3.0);
        assert_eq!(settings.extra.get("theme"), Some(&json!("dark")));
        let back = serde_json::to_value(&settings).unwrap();
        assert_eq!(back["theme"], json!("dark"));
    }

    #[test]
    fn test_task_reads_browser_timestamps() {
        let task: Task = serde_json::from_value(json!({
            "id": "a",
            "title": "Write Report",
            "type": "Work",
            "priority": "HIGH",
            "status": "NOT_STARTED",
            "subtasks": [],
            "createdAt": "2026-01-05T08:00:00.000Z",
            "startTime": "2026-01-05T09:00:00.000Z",
            "endTime": "2026-01-05T09:30:00.000Z",
            "estimatedDuration": 30
        }))
        .unwrap();
        assert_eq!(task.task_type, "Work");
        assert_eq!(task.end_time - task.start_time, Duration::minutes(30));
        assert!(task.actual_duration.is_none());
    }

    #[test]
    fn test_idle_threshold_is_bounded() {
        let settings = |hours: f64| Settings {
            idle_reminder_interval: hours,
            ..Default::default()
        };
        assert_eq!(settings(1.5).idle_threshold(), Duration::minutes(90));
        assert_eq!(settings(1e10).idle_threshold(), Duration::hours(24 * 365));
        assert_eq!(settings(f64::INFINITY).idle_threshold(), Duration::hours(2));
        assert_eq!(settings(-3.0).idle_threshold(), Duration::hours(2));
        assert_eq!(settings(f64::NAN).idle_threshold(), Duration::hours(2));
    }

    #[test]
    fn test_subtask_draft_parse() {
        assert_eq!(
            SubtaskDraft::parse("Outline: 15"),
            SubtaskDraft {
                title: "Outline".into(),
                estimated_duration: Some(15)
            }
        );
        assert_eq!(SubtaskDraft::parse("Ratio 1:x").estimated_duration, None);
    }
}
