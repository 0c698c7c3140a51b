//! Output formatting for the command line: plain text, markdown and JSON.

use crate::error::AppError;
use crate::types::{FilterState, Selection, Settings, Task, TaskStats};
use crate::view::{format_minutes, is_overdue, subtask_progress};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::json;
use std::fmt::Display;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Markdown,
    Json,
}

/// Length of the id prefix shown in listings.
pub const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Render a timestamp in local time, minute precision.
pub fn format_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// One line per task, used by `list`.
pub fn format_task_line(task: &Task, now: DateTime<Utc>) -> String {
    let mut line = format!(
        "{}  {:<11} {:<6} {:<30} [{}] {} -> {}",
        short_id(&task.id),
        task.status.label(),
        task.priority.as_str(),
        task.title,
        task.task_type,
        format_time(task.start_time),
        format_time(task.end_time),
    );
    let progress = subtask_progress(task);
    if progress.total > 0 {
        line.push_str(&format!(
            "  {}/{} ({}%)",
            progress.completed,
            progress.total,
            progress.percent()
        ));
    }
    if let Some(actual) = task.actual_duration {
        line.push_str(&format!("  took {}m", actual));
    }
    if is_overdue(task, now) {
        line.push_str("  OVERDUE");
    }
    line
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task, now: DateTime<Utc>) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.title));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **status**: {}\n", task.status));
    md.push_str(&format!("- **priority**: {}\n", task.priority.as_str()));
    md.push_str(&format!("- **type**: {}\n", task.task_type));
    md.push_str(&format!("- **start**: {}\n", format_time(task.start_time)));
    md.push_str(&format!("- **end**: {}\n", format_time(task.end_time)));
    md.push_str(&format!("- **estimate**: {}m\n", task.estimated_duration));

    if let Some(actual) = task.actual_duration {
        md.push_str(&format!("- **actual**: {}m\n", actual));
    }
    if is_overdue(task, now) {
        md.push_str("- **overdue**: yes\n");
    }

    if !task.subtasks.is_empty() {
        let progress = subtask_progress(task);
        md.push_str(&format!(
            "\n### Subtasks ({}/{}, {}%)\n",
            progress.completed,
            progress.total,
            progress.percent()
        ));
        for subtask in &task.subtasks {
            let mark = if subtask.is_completed { "x" } else { " " };
            md.push_str(&format!("- [{}] {} `{}`", mark, subtask.title, short_id(&subtask.id)));
            if let Some(minutes) = subtask.estimated_duration {
                md.push_str(&format!(" ({}m)", minutes));
            }
            md.push('\n');
        }
    }

    if let Some(ref notes) = task.notes {
        md.push_str("\n### Notes\n");
        md.push_str(notes);
        md.push('\n');
    }

    md
}

/// Format one task in the requested format.
pub fn format_task(
    task: &Task,
    format: OutputFormat,
    now: DateTime<Utc>,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => to_json(task),
        OutputFormat::Markdown => Ok(format_task_markdown(task, now)),
        OutputFormat::Text => Ok(format_task_line(task, now)),
    }
}

/// Format the visible task list.
pub fn format_tasks(
    tasks: &[&Task],
    format: OutputFormat,
    now: DateTime<Utc>,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => to_json(tasks),
        OutputFormat::Markdown => {
            let mut md = format!("# Tasks ({})\n\n", tasks.len());
            for task in tasks {
                md.push_str(&format_task_markdown(task, now));
                md.push('\n');
            }
            Ok(md)
        }
        OutputFormat::Text => {
            if tasks.is_empty() {
                return Ok("No tasks.".to_string());
            }
            Ok(tasks
                .iter()
                .map(|t| format_task_line(t, now))
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }
}

pub fn format_stats(stats: &TaskStats, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => to_json(&json!({
            "completedCount": stats.completed_count,
            "focusMinutes": stats.focus_minutes,
            "focusTime": format_minutes(stats.focus_minutes),
        })),
        OutputFormat::Markdown => Ok(format!(
            "# Stats\n\n- **completed**: {}\n- **focus time**: {}\n",
            stats.completed_count,
            format_minutes(stats.focus_minutes)
        )),
        OutputFormat::Text => Ok(format!(
            "Completed: {}\nFocus time: {}",
            stats.completed_count,
            format_minutes(stats.focus_minutes)
        )),
    }
}

pub fn format_settings(settings: &Settings, format: OutputFormat) -> serde_json::Result<String> {
    let enabled = if settings.notifications_enabled { "on" } else { "off" };
    match format {
        OutputFormat::Json => to_json(settings),
        OutputFormat::Markdown => Ok(format!(
            "# Settings\n\n- **idle reminder interval**: {}h\n- **notifications**: {}\n",
            settings.idle_reminder_interval, enabled
        )),
        OutputFormat::Text => Ok(format!(
            "Idle reminder interval: {}h\nNotifications: {}",
            settings.idle_reminder_interval, enabled
        )),
    }
}

fn selection<T: Display>(s: &Selection<T>) -> String {
    match s {
        Selection::All => "ALL".to_string(),
        Selection::Only(value) => value.to_string(),
    }
}

pub fn format_filters(filters: &FilterState, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => to_json(filters),
        OutputFormat::Markdown => Ok(format!(
            "# Filters\n\n- **status**: {}\n- **type**: {}\n- **priority**: {}\n- **search**: {}\n",
            selection(&filters.status),
            selection(&filters.task_type),
            selection(&filters.priority),
            filters.search
        )),
        OutputFormat::Text => Ok(format!(
            "Status: {}\nType: {}\nPriority: {}\nSearch: {}",
            selection(&filters.status),
            selection(&filters.task_type),
            selection(&filters.priority),
            if filters.search.is_empty() { "-" } else { filters.search.as_str() }
        )),
    }
}

/// Render an error for the user. JSON output carries the error code.
pub fn format_error(err: &AppError, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(err).unwrap_or_else(|_| err.message.clone()),
        _ => match &err.details {
            Some(details) => format!("Error: {} ({})", err.message, details),
            None => format!("Error: {}", err.message),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Priority, Subtask, TaskStatus};
    use chrono::{Duration, TimeZone};

    fn sample() -> Task {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        Task {
            id: "0123456789abcdef".into(),
            title: "Write Report".into(),
            task_type: "Work".into(),
            priority: Priority::High,
            status: TaskStatus::InProgress,
            subtasks: vec![Subtask {
                id: "s1".into(),
                title: "Outline".into(),
                is_completed: true,
                estimated_duration: Some(10),
            }],
            created_at: start,
            start_time: start,
            end_time: start + Duration::minutes(30),
            estimated_duration: 30,
            actual_duration: None,
            notes: Some("draft first".into()),
        }
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_task_line_flags_overdue_and_progress() {
        let task = sample();
        let line = format_task_line(&task, task.end_time + Duration::minutes(1));
        assert!(line.starts_with("01234567"));
        assert!(line.contains("1/1 (100%)"));
        assert!(line.ends_with("OVERDUE"));
    }

    #[test]
    fn test_markdown_lists_subtasks_and_notes() {
        let task = sample();
        let md = format_task_markdown(&task, task.start_time);
        assert!(md.contains("## Task: Write Report"));
        assert!(md.contains("- [x] Outline"));
        assert!(md.contains("### Notes\ndraft first"));
    }

    #[test]
    fn test_stats_text() {
        let stats = TaskStats {
            completed_count: 3,
            focus_minutes: 95,
        };
        assert_eq!(
            format_stats(&stats, OutputFormat::Text).unwrap(),
            "Completed: 3\nFocus time: 1h 35m"
        );
    }

    #[test]
    fn test_error_json_has_code() {
        let out = format_error(&AppError::task_not_found("x"), OutputFormat::Json);
        assert!(out.contains("TASK_NOT_FOUND"));
    }
}
