//! Application state: the task store plus settings and filters.
//!
//! `AppState` owns the in-memory copy of the three documents and the
//! injected [`KeyValueStore`]. Every mutation writes the affected document
//! back before returning, so the store always mirrors memory.

use crate::documents;
use crate::error::{AppError, AppResult};
use crate::notify::{NotificationSink, Permission};
use crate::state_transitions::{TransitionPolicy, apply_status};
use crate::store::KeyValueStore;
use crate::types::{
    DEFAULT_ESTIMATE_MINUTES, FilterState, MAX_IDLE_REMINDER_HOURS, Priority, Settings, Subtask,
    SubtaskDraft, Task, TaskDraft, TaskStats, TaskStatus,
};
use crate::view;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const TEST_NOTIFICATION_TITLE: &str = "Test notification";
pub const TEST_NOTIFICATION_BODY: &str = "Notifications are working.";

pub struct AppState {
    store: Arc<dyn KeyValueStore>,
    tasks: Vec<Task>,
    settings: Settings,
    filters: FilterState,
    policy: TransitionPolicy,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tasks", &self.tasks)
            .field("settings", &self.settings)
            .field("filters", &self.filters)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Load all three documents from `store`.
    ///
    /// Fails when the backend cannot be read. Malformed documents load as
    /// their defaults.
    pub fn load(store: Arc<dyn KeyValueStore>) -> AppResult<Self> {
        let tasks = documents::load_tasks(store.as_ref())?;
        let settings = documents::load_settings(store.as_ref())?;
        let filters = documents::load_filters(store.as_ref())?;
        debug!(tasks = tasks.len(), "Loaded application state");
        Ok(Self {
            store,
            tasks,
            settings,
            filters,
            policy: TransitionPolicy::default(),
        })
    }

    /// Use a transition policy other than the default unrestricted one.
    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Re-read every document, picking up writes made by other processes.
    ///
    /// On a backend error the in-memory state is left untouched.
    pub fn reload(&mut self) -> AppResult<()> {
        let tasks = documents::load_tasks(self.store.as_ref())?;
        let settings = documents::load_settings(self.store.as_ref())?;
        let filters = documents::load_filters(self.store.as_ref())?;
        self.tasks = tasks;
        self.settings = settings;
        self.filters = filters;
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Resolve a full id or a unique id prefix.
    pub fn resolve_id(&self, prefix: &str) -> AppResult<String> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(AppError::missing_field("id"));
        }
        if let Some(task) = self.task(prefix) {
            return Ok(task.id.clone());
        }
        let matches: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.id.starts_with(prefix))
            .map(|t| t.id.clone())
            .collect();
        match matches.len() {
            0 => Err(AppError::task_not_found(prefix)),
            1 => Ok(matches[0].clone()),
            _ => Err(AppError::ambiguous_id(prefix, &matches)),
        }
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Create a task from a draft and put it at the front of the list.
    ///
    /// Defaults: first existing type (or `Work`), MEDIUM priority,
    /// NOT_STARTED, start `now`, 30 minute estimate, end = start + estimate.
    pub fn create_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> AppResult<Task> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(AppError::missing_field("title"));
        }

        let estimated_duration = draft.estimated_duration.unwrap_or(DEFAULT_ESTIMATE_MINUTES);
        if estimated_duration == 0 {
            return Err(AppError::invalid_value(
                "estimated_duration",
                "Estimated duration must be at least one minute",
            ));
        }

        let task_type = match draft.task_type.map(|t| t.trim().to_string()) {
            Some(t) if !t.is_empty() => t,
            _ => view::type_choices(&self.tasks)
                .into_iter()
                .next()
                .unwrap_or_else(|| view::DEFAULT_TASK_TYPES[0].to_string()),
        };

        let start_time = draft.start_time.unwrap_or(now);
        let end_time = draft
            .end_time
            .unwrap_or_else(|| start_time + Duration::minutes(i64::from(estimated_duration)));

        let subtasks = draft
            .subtasks
            .into_iter()
            .map(new_subtask)
            .collect::<AppResult<Vec<_>>>()?;

        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            task_type,
            priority: draft.priority.unwrap_or(Priority::Medium),
            status: draft.status.unwrap_or(TaskStatus::NotStarted),
            subtasks,
            created_at: now,
            start_time,
            end_time,
            estimated_duration,
            actual_duration: None,
            notes: draft.notes.filter(|n| !n.trim().is_empty()),
        };

        self.tasks.insert(0, task.clone());
        self.persist_tasks()?;
        info!(task_id = %task.id, title = %task.title, "Task created");
        Ok(task)
    }

    /// Replace an existing task (the edit form). The list order is kept.
    pub fn save_task(&mut self, task: Task) -> AppResult<()> {
        if task.title.trim().is_empty() {
            return Err(AppError::missing_field("title"));
        }
        let slot = self.task_mut(&task.id)?;
        *slot = task;
        self.persist_tasks()
    }

    /// Move a task to `status`, applying the transition rules.
    pub fn update_status(
        &mut self,
        id: &str,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Task> {
        let policy = self.policy;
        let slot = self.task_mut(id)?;
        policy.check(slot.status, status)?;
        let previous = slot.status;
        *slot = apply_status(slot, status, now);
        let updated = slot.clone();
        self.persist_tasks()?;
        info!(task_id = %id, from = %previous, to = %status, "Task status updated");
        Ok(updated)
    }

    /// Mark the given tasks REMINDED with a single write. Unknown ids are ignored.
    pub fn mark_reminded(&mut self, ids: &[String], now: DateTime<Utc>) -> AppResult<()> {
        let mut changed = false;
        for task in self.tasks.iter_mut().filter(|t| ids.contains(&t.id)) {
            *task = apply_status(task, TaskStatus::Reminded, now);
            changed = true;
        }
        if changed {
            self.persist_tasks()?;
        }
        Ok(())
    }

    /// Remove a task. Confirmation is the caller's job.
    pub fn delete_task(&mut self, id: &str) -> AppResult<Task> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| AppError::task_not_found(id))?;
        let removed = self.tasks.remove(index);
        self.persist_tasks()?;
        info!(task_id = %id, "Task deleted");
        Ok(removed)
    }

    // =========================================================================
    // Subtasks
    // =========================================================================

    pub fn add_subtask(&mut self, task_id: &str, draft: SubtaskDraft) -> AppResult<Subtask> {
        let subtask = new_subtask(draft)?;
        self.task_mut(task_id)?.subtasks.push(subtask.clone());
        self.persist_tasks()?;
        Ok(subtask)
    }

    /// Flip a subtask's completion flag. Returns the new value.
    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> AppResult<bool> {
        let task = self.task_mut(task_id)?;
        let index = resolve_subtask(task, subtask_id)?;
        let subtask = &mut task.subtasks[index];
        subtask.is_completed = !subtask.is_completed;
        let done = subtask.is_completed;
        self.persist_tasks()?;
        Ok(done)
    }

    pub fn remove_subtask(&mut self, task_id: &str, subtask_id: &str) -> AppResult<Subtask> {
        let task = self.task_mut(task_id)?;
        let index = resolve_subtask(task, subtask_id)?;
        let removed = task.subtasks.remove(index);
        self.persist_tasks()?;
        Ok(removed)
    }

    // =========================================================================
    // Settings and filters
    // =========================================================================

    pub fn set_idle_interval(&mut self, hours: f64) -> AppResult<()> {
        if !hours.is_finite() || hours <= 0.0 || hours > MAX_IDLE_REMINDER_HOURS {
            return Err(AppError::invalid_value(
                "idle_reminder_interval",
                "Idle reminder interval must be a positive number of hours, at most one year",
            ));
        }
        self.settings.idle_reminder_interval = hours;
        self.persist_settings()
    }

    /// Turn notifications on or off.
    ///
    /// Turning them on asks the sink for permission first and fails with
    /// `PermissionDenied` when it is refused. Returns the new flag.
    pub fn toggle_notifications(&mut self, sink: &dyn NotificationSink) -> AppResult<bool> {
        if self.settings.notifications_enabled {
            self.settings.notifications_enabled = false;
            self.persist_settings()?;
            return Ok(false);
        }

        match sink.request_permission() {
            Ok(Permission::Granted) => {
                self.settings.notifications_enabled = true;
                self.persist_settings()?;
                Ok(true)
            }
            Ok(_) => Err(AppError::permission_denied()),
            Err(e) => Err(AppError::permission_denied().with_details(e.to_string())),
        }
    }

    /// Send a test notification, asking for permission if needed.
    pub fn test_notification(&self, sink: &dyn NotificationSink) -> AppResult<()> {
        if !self.settings.notifications_enabled {
            return Err(AppError::notifications_disabled());
        }

        if sink.permission() != Permission::Granted {
            match sink.request_permission() {
                Ok(Permission::Granted) => {}
                Ok(_) => return Err(AppError::permission_denied()),
                Err(e) => {
                    return Err(AppError::permission_denied().with_details(e.to_string()));
                }
            }
        }

        sink.display(TEST_NOTIFICATION_TITLE, TEST_NOTIFICATION_BODY)
            .map_err(AppError::internal)
    }

    /// On startup: if notifications are on but permission was never
    /// granted, ask once. Refusal is only logged.
    pub fn ensure_permission(&self, sink: &dyn NotificationSink) {
        if !self.settings.notifications_enabled || sink.permission() == Permission::Granted {
            return;
        }
        match sink.request_permission() {
            Ok(Permission::Granted) => debug!("Notification permission granted"),
            Ok(permission) => warn!(?permission, "Notification permission not granted"),
            Err(e) => warn!(error = %e, "Failed to request notification permission"),
        }
    }

    pub fn set_filters(&mut self, filters: FilterState) -> AppResult<()> {
        self.filters = filters;
        documents::save_filters(self.store.as_ref(), &self.filters)?;
        Ok(())
    }

    pub fn clear_filters(&mut self) -> AppResult<()> {
        self.set_filters(FilterState::default())
    }

    // =========================================================================
    // Derived views
    // =========================================================================

    /// Tasks passing the persisted filters, in display order.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        view::visible_tasks(&self.tasks, &self.filters)
    }

    pub fn stats(&self) -> TaskStats {
        view::compute_stats(&self.tasks)
    }

    pub fn available_types(&self) -> Vec<String> {
        view::available_types(&self.tasks)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn task_mut(&mut self, id: &str) -> AppResult<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| AppError::task_not_found(id))
    }

    fn persist_tasks(&self) -> AppResult<()> {
        documents::save_tasks(self.store.as_ref(), &self.tasks)?;
        Ok(())
    }

    fn persist_settings(&self) -> AppResult<()> {
        documents::save_settings(self.store.as_ref(), &self.settings)?;
        Ok(())
    }
}

/// Index of the subtask with this full id or unique id prefix.
fn resolve_subtask(task: &Task, prefix: &str) -> AppResult<usize> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Err(AppError::missing_field("subtask id"));
    }
    if let Some(index) = task.subtasks.iter().position(|s| s.id == prefix) {
        return Ok(index);
    }
    let matches: Vec<usize> = task
        .subtasks
        .iter()
        .enumerate()
        .filter(|(_, s)| s.id.starts_with(prefix))
        .map(|(i, _)| i)
        .collect();
    match matches.as_slice() {
        [] => Err(AppError::subtask_not_found(&task.id, prefix)),
        [index] => Ok(*index),
        _ => {
            let ids: Vec<String> = matches.iter().map(|&i| task.subtasks[i].id.clone()).collect();
            Err(AppError::ambiguous_id(prefix, &ids))
        }
    }
}

fn new_subtask(draft: SubtaskDraft) -> AppResult<Subtask> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(AppError::missing_field("subtask title"));
    }
    Ok(Subtask {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        is_completed: false,
        estimated_duration: draft.estimated_duration,
    })
}
