//! Integration tests for the task store.
//!
//! Every test runs against an in-memory key-value store, then reloads a
//! second `AppState` from the same store to check what was persisted.

use chrono::{DateTime, Duration, TimeZone, Utc};
use focus_tasks::app::{AppState, TEST_NOTIFICATION_TITLE};
use focus_tasks::error::ErrorCode;
use focus_tasks::notify::{MemorySink, Permission};
use focus_tasks::state_transitions::TransitionPolicy;
use focus_tasks::store::{KeyValueStore, MemoryStore, TASKS_KEY};
use focus_tasks::types::{
    FilterState, MAX_IDLE_REMINDER_HOURS, Priority, Selection, Subtask, SubtaskDraft, TaskDraft,
    TaskStatus,
};
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

/// Helper to create an empty app and keep a handle on its store.
fn setup() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let app = AppState::load(store.clone()).unwrap();
    (app, store)
}

fn draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        ..Default::default()
    }
}

mod create_tests {
    use super::*;

    #[test]
    fn create_task_applies_defaults() {
        let (mut app, _) = setup();

        let task = app.create_task(draft("Write Report"), t0()).expect("create");

        assert_eq!(task.title, "Write Report");
        assert_eq!(task.task_type, "Work");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.created_at, t0());
        assert_eq!(task.start_time, t0());
        assert_eq!(task.estimated_duration, 30);
        assert_eq!(task.end_time, t0() + Duration::minutes(30));
        assert!(task.actual_duration.is_none());
        assert!(!task.id.is_empty());
    }

    #[test]
    fn new_tasks_go_first_and_are_persisted() {
        let (mut app, store) = setup();

        let first = app.create_task(draft("first"), t0()).unwrap();
        let second = app.create_task(draft("second"), t0()).unwrap();

        assert_eq!(app.tasks()[0].id, second.id);
        assert_eq!(app.tasks()[1].id, first.id);

        let reloaded = AppState::load(store).unwrap();
        let ids: Vec<&str> = reloaded.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
    }

    #[test]
    fn default_type_is_first_existing_type() {
        let (mut app, _) = setup();
        let mut study = draft("read");
        study.task_type = Some("Study".into());
        app.create_task(study, t0()).unwrap();

        let task = app.create_task(draft("next"), t0()).unwrap();
        assert_eq!(task.task_type, "Study");
    }

    #[test]
    fn end_defaults_to_start_plus_estimate() {
        let (mut app, _) = setup();
        let start = t0() + Duration::hours(2);
        let task = app
            .create_task(
                TaskDraft {
                    title: "gym".into(),
                    start_time: Some(start),
                    estimated_duration: Some(45),
                    ..Default::default()
                },
                t0(),
            )
            .unwrap();
        assert_eq!(task.end_time, start + Duration::minutes(45));
    }

    #[test]
    fn blank_title_is_rejected() {
        let (mut app, store) = setup();
        let err = app.create_task(draft("   "), t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
        assert!(store.get(TASKS_KEY).unwrap().is_none());
    }

    #[test]
    fn zero_estimate_is_rejected() {
        let (mut app, _) = setup();
        let mut d = draft("x");
        d.estimated_duration = Some(0);
        let err = app.create_task(d, t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
    }

    #[test]
    fn subtasks_from_draft_get_ids() {
        let (mut app, _) = setup();
        let mut d = draft("report");
        d.subtasks = vec![SubtaskDraft::parse("Outline:15"), SubtaskDraft::parse("Write")];
        let task = app.create_task(d, t0()).unwrap();
        assert_eq!(task.subtasks.len(), 2);
        assert_eq!(task.subtasks[0].estimated_duration, Some(15));
        assert_ne!(task.subtasks[0].id, task.subtasks[1].id);
        assert!(task.subtasks.iter().all(|s| !s.is_completed));
    }
}

mod status_tests {
    use super::*;

    #[test]
    fn complete_records_actual_duration() {
        let (mut app, store) = setup();
        let task = app.create_task(draft("x"), t0()).unwrap();
        app.update_status(&task.id, TaskStatus::InProgress, t0()).unwrap();

        let now = t0() + Duration::minutes(52) + Duration::seconds(30);
        let done = app.update_status(&task.id, TaskStatus::Completed, now).unwrap();
        assert_eq!(done.actual_duration, Some(52));
        assert_eq!(done.end_time, now);

        let reloaded = AppState::load(store).unwrap();
        assert_eq!(reloaded.tasks()[0].actual_duration, Some(52));
        assert_eq!(reloaded.stats().completed_count, 1);
        assert_eq!(reloaded.stats().focus_minutes, 52);
    }

    #[test]
    fn any_transition_is_allowed_by_default() {
        let (mut app, _) = setup();
        let task = app.create_task(draft("x"), t0()).unwrap();
        app.update_status(&task.id, TaskStatus::Completed, t0()).unwrap();
        let back = app.update_status(&task.id, TaskStatus::InProgress, t0()).unwrap();
        assert_eq!(back.status, TaskStatus::InProgress);
    }

    #[test]
    fn strict_policy_rejects_reopening_into_progress() {
        let store = Arc::new(MemoryStore::new());
        let mut app = AppState::load(store).unwrap().with_policy(TransitionPolicy::Strict);
        let task = app.create_task(draft("x"), t0()).unwrap();
        app.update_status(&task.id, TaskStatus::InProgress, t0()).unwrap();
        app.update_status(&task.id, TaskStatus::Completed, t0()).unwrap();

        let err = app
            .update_status(&task.id, TaskStatus::InProgress, t0())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(app.task(&task.id).unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn unknown_task_is_not_found() {
        let (mut app, _) = setup();
        let err = app
            .update_status("missing", TaskStatus::Completed, t0())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }
}

mod edit_tests {
    use super::*;

    #[test]
    fn save_task_replaces_in_place() {
        let (mut app, store) = setup();
        let a = app.create_task(draft("a"), t0()).unwrap();
        let b = app.create_task(draft("b"), t0()).unwrap();

        let mut edited = a.clone();
        edited.title = "a2".into();
        edited.priority = Priority::High;
        app.save_task(edited).unwrap();

        let reloaded = AppState::load(store).unwrap();
        assert_eq!(reloaded.tasks()[0].id, b.id);
        assert_eq!(reloaded.tasks()[1].title, "a2");
        assert_eq!(reloaded.tasks()[1].priority, Priority::High);
    }

    #[test]
    fn delete_removes_task() {
        let (mut app, store) = setup();
        let a = app.create_task(draft("a"), t0()).unwrap();
        app.delete_task(&a.id).unwrap();
        assert!(app.tasks().is_empty());
        assert!(AppState::load(store).unwrap().tasks().is_empty());
        assert_eq!(app.delete_task(&a.id).unwrap_err().code, ErrorCode::TaskNotFound);
    }

    #[test]
    fn subtask_lifecycle() {
        let (mut app, store) = setup();
        let task = app.create_task(draft("report"), t0()).unwrap();

        let sub = app
            .add_subtask(&task.id, SubtaskDraft::parse("Outline:10"))
            .unwrap();
        assert!(app.toggle_subtask(&task.id, &sub.id).unwrap());
        assert!(AppState::load(store.clone()).unwrap().tasks()[0].subtasks[0].is_completed);
        assert!(!app.toggle_subtask(&task.id, &sub.id).unwrap());

        app.remove_subtask(&task.id, &sub.id).unwrap();
        assert!(AppState::load(store).unwrap().tasks()[0].subtasks.is_empty());

        let err = app.toggle_subtask(&task.id, &sub.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::SubtaskNotFound);
    }

    fn subtask(id: &str) -> Subtask {
        Subtask {
            id: id.to_string(),
            title: id.to_string(),
            is_completed: false,
            estimated_duration: None,
        }
    }

    /// Helper: one task whose subtask ids share the prefix `aa`.
    fn setup_shared_prefix() -> (AppState, Arc<MemoryStore>, String) {
        let (mut app, store) = setup();
        let mut task = app.create_task(draft("report"), t0()).unwrap();
        task.subtasks = vec![subtask("aa1"), subtask("aa2"), subtask("b")];
        app.save_task(task.clone()).unwrap();
        (app, store, task.id)
    }

    #[test]
    fn empty_subtask_id_is_rejected() {
        let (mut app, store, task_id) = setup_shared_prefix();

        let err = app.toggle_subtask(&task_id, "").unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
        let err = app.remove_subtask(&task_id, "  ").unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);

        let stored = AppState::load(store).unwrap();
        let subtasks = &stored.tasks()[0].subtasks;
        assert_eq!(subtasks.len(), 3);
        assert!(subtasks.iter().all(|s| !s.is_completed));
    }

    #[test]
    fn ambiguous_subtask_prefix_is_rejected() {
        let (mut app, store, task_id) = setup_shared_prefix();

        let err = app.toggle_subtask(&task_id, "aa").unwrap_err();
        assert_eq!(err.code, ErrorCode::AmbiguousId);
        let err = app.remove_subtask(&task_id, "a").unwrap_err();
        assert_eq!(err.code, ErrorCode::AmbiguousId);
        assert_eq!(err.details.as_deref(), Some("aa1, aa2"));

        let stored = AppState::load(store).unwrap();
        let subtasks = &stored.tasks()[0].subtasks;
        assert_eq!(subtasks.len(), 3);
        assert!(subtasks.iter().all(|s| !s.is_completed));
    }

    #[test]
    fn subtask_resolves_by_exact_id_or_unique_prefix() {
        let (mut app, _, task_id) = setup_shared_prefix();

        assert!(app.toggle_subtask(&task_id, "aa2").unwrap());
        assert!(!app.task(&task_id).unwrap().subtasks[0].is_completed);
        assert!(app.task(&task_id).unwrap().subtasks[1].is_completed);

        assert_eq!(app.remove_subtask(&task_id, "aa1").unwrap().id, "aa1");
        // With aa1 gone the prefix is unique again
        assert_eq!(app.remove_subtask(&task_id, "aa").unwrap().id, "aa2");
        assert_eq!(
            app.toggle_subtask(&task_id, "zz").unwrap_err().code,
            ErrorCode::SubtaskNotFound
        );
    }

    #[test]
    fn blank_subtask_title_is_rejected() {
        let (mut app, _) = setup();
        let task = app.create_task(draft("report"), t0()).unwrap();
        let err = app.add_subtask(&task.id, SubtaskDraft::parse("  ")).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
    }

    #[test]
    fn resolve_id_by_prefix() {
        let (mut app, _) = setup();
        let task = app.create_task(draft("a"), t0()).unwrap();
        assert_eq!(app.resolve_id(&task.id[..6]).unwrap(), task.id);
        assert_eq!(app.resolve_id(&task.id).unwrap(), task.id);
        assert_eq!(
            app.resolve_id("zzzz-not-an-id").unwrap_err().code,
            ErrorCode::TaskNotFound
        );
        // Every v4 UUID matches the empty prefix, which is rejected outright
        assert_eq!(
            app.resolve_id("").unwrap_err().code,
            ErrorCode::MissingRequiredField
        );
    }
}

mod settings_tests {
    use super::*;

    #[test]
    fn idle_interval_must_be_positive() {
        let (mut app, store) = setup();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert_eq!(
                app.set_idle_interval(bad).unwrap_err().code,
                ErrorCode::InvalidFieldValue
            );
        }
        app.set_idle_interval(1.5).unwrap();
        assert_eq!(AppState::load(store).unwrap().settings().idle_reminder_interval, 1.5);
    }

    #[test]
    fn idle_interval_is_capped_at_one_year() {
        let (mut app, store) = setup();
        for too_long in [1e10, MAX_IDLE_REMINDER_HOURS + 1.0] {
            assert_eq!(
                app.set_idle_interval(too_long).unwrap_err().code,
                ErrorCode::InvalidFieldValue
            );
        }
        app.set_idle_interval(MAX_IDLE_REMINDER_HOURS).unwrap();
        assert_eq!(
            AppState::load(store).unwrap().settings().idle_reminder_interval,
            MAX_IDLE_REMINDER_HOURS
        );
    }

    #[test]
    fn enabling_notifications_requests_permission() {
        let (mut app, store) = setup();
        let sink = MemorySink::new(Permission::Default, Permission::Granted);

        assert!(app.toggle_notifications(&sink).unwrap());
        assert_eq!(sink.permission_requests(), 1);
        assert!(AppState::load(store.clone()).unwrap().settings().notifications_enabled);

        // Disabling never asks
        assert!(!app.toggle_notifications(&sink).unwrap());
        assert_eq!(sink.permission_requests(), 1);
        assert!(!AppState::load(store).unwrap().settings().notifications_enabled);
    }

    #[test]
    fn denied_permission_is_surfaced_and_flag_stays_off() {
        let (mut app, store) = setup();
        let sink = MemorySink::new(Permission::Default, Permission::Denied);

        let err = app.toggle_notifications(&sink).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert!(!app.settings().notifications_enabled);
        assert!(!AppState::load(store).unwrap().settings().notifications_enabled);
    }

    #[test]
    fn test_notification_requires_enabled_flag() {
        let (app, _) = setup();
        let sink = MemorySink::granted();
        let err = app.test_notification(&sink).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotificationsDisabled);
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn test_notification_asks_when_not_yet_granted() {
        let (mut app, _) = setup();
        let granted = MemorySink::granted();
        app.toggle_notifications(&granted).unwrap();

        let sink = MemorySink::new(Permission::Default, Permission::Granted);
        app.test_notification(&sink).unwrap();
        assert_eq!(sink.permission_requests(), 1);
        assert_eq!(sink.titles(), vec![TEST_NOTIFICATION_TITLE.to_string()]);

        let denied = MemorySink::new(Permission::Default, Permission::Denied);
        assert_eq!(
            app.test_notification(&denied).unwrap_err().code,
            ErrorCode::PermissionDenied
        );
    }

    #[test]
    fn ensure_permission_asks_once_when_enabled() {
        let (mut app, _) = setup();
        app.toggle_notifications(&MemorySink::granted()).unwrap();

        let sink = MemorySink::new(Permission::Default, Permission::Granted);
        app.ensure_permission(&sink);
        app.ensure_permission(&sink);
        assert_eq!(sink.permission_requests(), 1);
    }

    #[test]
    fn ensure_permission_does_nothing_when_disabled() {
        let (app, _) = setup();
        let sink = MemorySink::new(Permission::Default, Permission::Granted);
        app.ensure_permission(&sink);
        assert_eq!(sink.permission_requests(), 0);
    }
}

mod filter_tests {
    use super::*;

    #[test]
    fn filters_persist_and_drive_the_view() {
        let (mut app, store) = setup();
        let mut high = draft("Write Report");
        high.priority = Some(Priority::High);
        app.create_task(high, t0()).unwrap();
        app.create_task(draft("Gym"), t0()).unwrap();

        app.set_filters(FilterState {
            search: "report".into(),
            priority: Selection::Only(Priority::High),
            ..Default::default()
        })
        .unwrap();

        let reloaded = AppState::load(store.clone()).unwrap();
        let titles: Vec<&str> = reloaded
            .visible_tasks()
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Write Report"]);

        app.clear_filters().unwrap();
        let reloaded = AppState::load(store).unwrap();
        assert_eq!(reloaded.filters(), &FilterState::default());
        assert_eq!(reloaded.visible_tasks().len(), 2);
    }

    #[test]
    fn available_types_are_distinct() {
        let (mut app, _) = setup();
        for (title, ty) in [("a", "Work"), ("b", "Health"), ("c", "Work")] {
            let mut d = draft(title);
            d.task_type = Some(ty.into());
            app.create_task(d, t0()).unwrap();
        }
        let mut types = app.available_types();
        types.sort();
        assert_eq!(types, vec!["Health", "Work"]);
    }
}
