//! Argument structs and value parsing for the task commands.

use crate::error::{AppError, AppResult};
use crate::types::{FilterState, Priority, Selection, TaskStatus};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use clap::Args;

/// Arguments for `add`
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task title
    pub title: String,

    /// Category, e.g. Work or Study (default: first existing type)
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub task_type: Option<String>,

    /// high, medium or low (default: medium)
    #[arg(short, long)]
    pub priority: Option<String>,

    /// Scheduled start: RFC 3339, `YYYY-MM-DD HH:MM`, `HH:MM` or `now` (default: now)
    #[arg(long)]
    pub start: Option<String>,

    /// Scheduled end (default: start + estimate)
    #[arg(long)]
    pub end: Option<String>,

    /// Estimated minutes (default: 30)
    #[arg(short, long, value_name = "MINUTES")]
    pub estimate: Option<u32>,

    /// Subtask, `title` or `title:minutes`; repeatable
    #[arg(short = 's', long = "subtask", value_name = "SUBTASK")]
    pub subtasks: Vec<String>,

    /// Free-text notes
    #[arg(short, long)]
    pub notes: Option<String>,
}

/// Arguments for `edit`
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Task id or unique id prefix
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub task_type: Option<String>,

    #[arg(short, long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,

    #[arg(short, long, value_name = "MINUTES")]
    pub estimate: Option<u32>,

    #[arg(short, long, conflicts_with = "clear_notes")]
    pub notes: Option<String>,

    /// Remove the notes
    #[arg(long)]
    pub clear_notes: bool,
}

/// Arguments for `list`. Options override the saved filters for this
/// listing only; use `filter set` to change the saved ones.
#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(short, long)]
    pub status: Option<String>,

    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub task_type: Option<String>,

    #[arg(short, long)]
    pub priority: Option<String>,

    /// Case-insensitive title substring
    #[arg(long)]
    pub search: Option<String>,

    /// Ignore the saved filters
    #[arg(short, long)]
    pub all: bool,
}

/// Arguments for `filter set`. `all` resets a selection.
#[derive(Args, Debug)]
pub struct FilterArgs {
    #[arg(short, long)]
    pub status: Option<String>,

    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub task_type: Option<String>,

    #[arg(short, long)]
    pub priority: Option<String>,

    /// Title substring; an empty string clears it
    #[arg(long)]
    pub search: Option<String>,
}

/// Arguments for `suggest`
#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// Title to ask about
    #[arg(required_unless_present = "task", conflicts_with = "task")]
    pub title: Option<String>,

    /// Ask about an existing task instead
    #[arg(long, value_name = "ID")]
    pub task: Option<String>,

    #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "Work")]
    pub task_type: String,

    /// Estimated minutes
    #[arg(long, value_name = "MINUTES", default_value_t = 30)]
    pub duration: u32,
}

impl ListArgs {
    /// The filters to list with: saved ones (or none with `--all`) plus overrides.
    pub fn effective_filters(&self, saved: &FilterState) -> AppResult<FilterState> {
        let base = if self.all {
            FilterState::default()
        } else {
            saved.clone()
        };
        apply_filter_overrides(
            base,
            self.status.as_deref(),
            self.task_type.as_deref(),
            self.priority.as_deref(),
            self.search.as_deref(),
        )
    }
}

impl FilterArgs {
    pub fn apply(&self, saved: &FilterState) -> AppResult<FilterState> {
        apply_filter_overrides(
            saved.clone(),
            self.status.as_deref(),
            self.task_type.as_deref(),
            self.priority.as_deref(),
            self.search.as_deref(),
        )
    }
}

fn apply_filter_overrides(
    mut filters: FilterState,
    status: Option<&str>,
    task_type: Option<&str>,
    priority: Option<&str>,
    search: Option<&str>,
) -> AppResult<FilterState> {
    if let Some(s) = status {
        filters.status = parse_selection(s, parse_status)?;
    }
    if let Some(t) = task_type {
        filters.task_type = parse_selection(t, |v| Ok(v.to_string()))?;
    }
    if let Some(p) = priority {
        filters.priority = parse_selection(p, parse_priority)?;
    }
    if let Some(s) = search {
        filters.search = s.to_string();
    }
    Ok(filters)
}

/// `all` (any case) is the ALL sentinel; anything else goes through `parse`.
pub fn parse_selection<T>(
    s: &str,
    parse: impl FnOnce(&str) -> AppResult<T>,
) -> AppResult<Selection<T>> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("all") {
        Ok(Selection::All)
    } else {
        parse(s).map(Selection::Only)
    }
}

pub fn parse_status(s: &str) -> AppResult<TaskStatus> {
    TaskStatus::parse(s).ok_or_else(|| {
        AppError::invalid_value(
            "status",
            "Status must be not-started, in-progress, completed, canceled or reminded",
        )
    })
}

pub fn parse_priority(s: &str) -> AppResult<Priority> {
    Priority::parse(s)
        .ok_or_else(|| AppError::invalid_value("priority", "Priority must be high, medium or low"))
}

/// Parse a command-line timestamp relative to `now`.
///
/// Accepts `now`, RFC 3339, `YYYY-MM-DD HH:MM` (local) and `HH:MM` (today, local).
pub fn parse_when(field: &str, s: &str, now: DateTime<Local>) -> AppResult<DateTime<Utc>> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("now") {
        return Ok(now.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
        return local_to_utc(field, naive);
    }
    if let Ok(time) = NaiveTime::parse_from_str(s, "%H:%M") {
        let today: NaiveDate = now.date_naive();
        return local_to_utc(field, today.and_time(time));
    }
    Err(AppError::invalid_value(
        field,
        "Expected RFC 3339, 'YYYY-MM-DD HH:MM', 'HH:MM' or 'now'",
    )
    .with_details(s.to_string()))
}

fn local_to_utc(field: &str, naive: NaiveDateTime) -> AppResult<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
        .ok_or_else(|| AppError::invalid_value(field, "That local time does not exist"))
}
