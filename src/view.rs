//! Derived views over the task list: filtering, ordering and statistics.
//!
//! Everything here is a pure function of its inputs.

use crate::types::{FilterState, Task, TaskStats, TaskStatus};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Task types offered when no task exists yet.
pub const DEFAULT_TASK_TYPES: [&str; 4] = ["Work", "Study", "Personal", "Health"];

/// Whether `task` passes every filter.
///
/// The search text is a case-insensitive substring match on the title;
/// the three selections must each be `All` or equal to the task's value.
pub fn matches_filters(task: &Task, filters: &FilterState) -> bool {
    let search = filters.search.to_lowercase();
    task.title.to_lowercase().contains(&search)
        && filters.status.matches(&task.status)
        && filters.task_type.matches(&task.task_type)
        && filters.priority.matches(&task.priority)
}

/// Display order: higher priority weight first, then earlier start.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    b.priority
        .weight()
        .cmp(&a.priority.weight())
        .then_with(|| a.start_time.cmp(&b.start_time))
}

/// The filtered, ordered view of `tasks`.
///
/// The sort is stable, so tasks with equal priority and start keep their
/// store order and repeated calls give identical results.
pub fn visible_tasks<'a>(tasks: &'a [Task], filters: &FilterState) -> Vec<&'a Task> {
    let mut visible: Vec<&Task> = tasks
        .iter()
        .filter(|task| matches_filters(task, filters))
        .collect();
    visible.sort_by(|a, b| compare_tasks(a, b));
    visible
}

/// Completed count and total focus minutes.
pub fn compute_stats(tasks: &[Task]) -> TaskStats {
    tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .fold(TaskStats::default(), |mut stats, task| {
            stats.completed_count += 1;
            stats.focus_minutes += task.actual_duration.unwrap_or(0);
            stats
        })
}

/// Distinct task types, in first-seen order.
pub fn available_types(tasks: &[Task]) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for task in tasks {
        if !types.iter().any(|t| t == &task.task_type) {
            types.push(task.task_type.clone());
        }
    }
    types
}

/// Types to offer when creating a task: the existing ones, or the defaults
/// for an empty list.
pub fn type_choices(tasks: &[Task]) -> Vec<String> {
    let types = available_types(tasks);
    if types.is_empty() {
        DEFAULT_TASK_TYPES.iter().map(|t| t.to_string()).collect()
    } else {
        types
    }
}

/// An in-progress task whose scheduled end has passed.
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    task.status == TaskStatus::InProgress && now > task.end_time
}

/// Subtask completion for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtaskProgress {
    pub completed: usize,
    pub total: usize,
}

impl SubtaskProgress {
    /// Rounded completion percentage; 0 when there are no subtasks.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u32
    }
}

pub fn subtask_progress(task: &Task) -> SubtaskProgress {
    SubtaskProgress {
        completed: task.subtasks.iter().filter(|s| s.is_completed).count(),
        total: task.subtasks.len(),
    }
}

/// Render minutes as `Xh Ym`.
pub fn format_minutes(total: i64) -> String {
    format!("{}h {}m", total.div_euclid(60), total.rem_euclid(60))
}
