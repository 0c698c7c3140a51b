//! Reminder monitor.
//!
//! A periodic check over the task list that emits "task starting",
//! "still working?" and "idle" reminders, plus a separate "ready to focus?"
//! check driven by visibility events. Wall-clock alignment uses the local
//! minute and second; all arithmetic on stored timestamps is done in UTC.

use crate::app::AppState;
use crate::config::ReminderConfig;
use crate::notify::Notifier;
use crate::types::{Task, TaskStatus};
use chrono::{DateTime, Duration, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Width of the start-time window, in seconds.
const START_WINDOW_SECS: i64 = 60;

/// A completion within this many minutes suppresses the focus reminder.
const RECENT_COMPLETION_MINS: i64 = 10;

/// Longest configurable cooldown: one year.
const MAX_COOLDOWN_MINS: u64 = 60 * 24 * 365;

/// Source of local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Local>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.set(self.now() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// The kinds of reminder the monitor emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    TaskStarting,
    Overdue,
    Idle,
    Focus,
}

impl ReminderKind {
    pub fn title(&self) -> &'static str {
        match self {
            ReminderKind::TaskStarting => "Task starting",
            ReminderKind::Overdue => "Still working?",
            ReminderKind::Idle => "Idle reminder",
            ReminderKind::Focus => "Ready to focus?",
        }
    }
}

/// How repeated overdue and idle reminders are spaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleMode {
    /// Overdue fires in the first 10 seconds of each half hour on the wall
    /// clock; idle fires in the first minute of each hour since the last
    /// completion, and only in the first 5 seconds of a wall-clock minute.
    #[default]
    ClockAligned,
    /// Each kind fires at most once per its configured cooldown.
    Cooldown,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tasks moved from NOT_STARTED to REMINDED.
    pub reminded: Vec<String>,
    /// Notifications accepted by the sink, in emission order.
    pub fired: Vec<ReminderKind>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.reminded.is_empty() && self.fired.is_empty()
    }
}

pub struct ReminderMonitor {
    throttle: ThrottleMode,
    overdue_cooldown: Duration,
    idle_cooldown: Duration,
    last_fired: HashMap<ReminderKind, DateTime<Utc>>,
}

impl Default for ReminderMonitor {
    fn default() -> Self {
        Self::from_config(&ReminderConfig::default())
    }
}

impl ReminderMonitor {
    pub fn new(throttle: ThrottleMode) -> Self {
        Self {
            throttle,
            ..Self::default()
        }
    }

    pub fn from_config(config: &ReminderConfig) -> Self {
        Self {
            throttle: config.throttle,
            overdue_cooldown: cooldown(config.overdue_cooldown_mins),
            idle_cooldown: cooldown(config.idle_cooldown_mins),
            last_fired: HashMap::new(),
        }
    }

    pub fn throttle(&self) -> ThrottleMode {
        self.throttle
    }

    /// Evaluate the start, overdue and idle rules once.
    ///
    /// The only store mutation is NOT_STARTED -> REMINDED for tasks whose
    /// start fell within the last 60 seconds.
    pub fn tick(
        &mut self,
        app: &mut AppState,
        notifier: &Notifier<'_>,
        now: DateTime<Local>,
    ) -> TickReport {
        let now_utc = now.with_timezone(&Utc);
        let mut report = TickReport::default();

        let starting: Vec<(String, String)> = app
            .tasks()
            .iter()
            .filter(|t| in_start_window(t, now_utc))
            .map(|t| (t.id.clone(), t.title.clone()))
            .collect();

        if !starting.is_empty() {
            let ids: Vec<String> = starting.iter().map(|(id, _)| id.clone()).collect();
            if let Err(e) = app.mark_reminded(&ids, now_utc) {
                warn!(error = %e, "Failed to persist reminded tasks");
            }
            for (id, title) in &starting {
                debug!(task_id = %id, "Task start time reached");
                let body = format!("Time to start: {}", title);
                if self.emit(notifier, app, ReminderKind::TaskStarting, &body, now_utc) {
                    report.fired.push(ReminderKind::TaskStarting);
                }
            }
            report.reminded = ids;
        }

        let threshold = app.settings().idle_threshold();
        let running: Vec<&Task> = app
            .tasks()
            .iter()
            .filter(|t| t.status == TaskStatus::InProgress)
            .collect();

        match running.as_slice() {
            [task] => {
                let overdue = task
                    .end_time
                    .checked_add_signed(threshold)
                    .is_some_and(|limit| now_utc > limit);
                if overdue && self.overdue_due(now, now_utc) {
                    let body = format!(
                        "Task \"{}\" is well past its scheduled end. Update its status?",
                        task.title
                    );
                    if self.emit(notifier, app, ReminderKind::Overdue, &body, now_utc) {
                        report.fired.push(ReminderKind::Overdue);
                    }
                }
            }
            [] => {
                if let Some(last_end) = last_completion(app.tasks()) {
                    let idle_for = now_utc - last_end;
                    if idle_for > threshold && self.idle_due(now, now_utc, idle_for) {
                        let body = "You have been on a break for a while. Start a new task?";
                        if self.emit(notifier, app, ReminderKind::Idle, body, now_utc) {
                            report.fired.push(ReminderKind::Idle);
                        }
                    }
                }
            }
            many => {
                debug!(count = many.len(), "Several tasks in progress, skipping overdue check");
            }
        }

        report
    }

    /// The "ready to focus?" check run on visibility and shortly after startup.
    ///
    /// Fires when there is at least one task, none is in progress and none
    /// was completed in the last 10 minutes. Returns whether it fired.
    pub fn check_focus(
        &mut self,
        app: &AppState,
        notifier: &Notifier<'_>,
        now: DateTime<Local>,
    ) -> bool {
        let now_utc = now.with_timezone(&Utc);
        let tasks = app.tasks();
        if tasks.is_empty() || tasks.iter().any(|t| t.status == TaskStatus::InProgress) {
            return false;
        }
        let recent = Duration::minutes(RECENT_COMPLETION_MINS);
        let recently_completed = tasks
            .iter()
            .any(|t| t.status == TaskStatus::Completed && now_utc - t.end_time < recent);
        if recently_completed {
            return false;
        }
        self.emit(
            notifier,
            app,
            ReminderKind::Focus,
            "You have no task in progress.",
            now_utc,
        )
    }

    fn overdue_due(&self, now: DateTime<Local>, now_utc: DateTime<Utc>) -> bool {
        match self.throttle {
            ThrottleMode::ClockAligned => now.minute() % 30 == 0 && now.second() < 10,
            ThrottleMode::Cooldown => {
                self.cooled_down(ReminderKind::Overdue, self.overdue_cooldown, now_utc)
            }
        }
    }

    fn idle_due(&self, now: DateTime<Local>, now_utc: DateTime<Utc>, idle_for: Duration) -> bool {
        match self.throttle {
            ThrottleMode::ClockAligned => {
                idle_for.num_seconds() % 3600 < 60 && now.second() < 5
            }
            ThrottleMode::Cooldown => {
                self.cooled_down(ReminderKind::Idle, self.idle_cooldown, now_utc)
            }
        }
    }

    fn cooled_down(&self, kind: ReminderKind, cooldown: Duration, now: DateTime<Utc>) -> bool {
        self.last_fired
            .get(&kind)
            .is_none_or(|last| now - *last >= cooldown)
    }

    fn emit(
        &mut self,
        notifier: &Notifier<'_>,
        app: &AppState,
        kind: ReminderKind,
        body: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let sent = notifier.send(app.settings(), kind.title(), body);
        if sent {
            info!(kind = ?kind, "Reminder sent");
            self.last_fired.insert(kind, now);
        }
        sent
    }
}

/// Configured cooldown minutes as a duration, capped at [`MAX_COOLDOWN_MINS`].
fn cooldown(minutes: u64) -> Duration {
    let minutes = i64::try_from(minutes.min(MAX_COOLDOWN_MINS)).unwrap_or(0);
    Duration::minutes(minutes)
}

fn in_start_window(task: &Task, now: DateTime<Utc>) -> bool {
    task.status == TaskStatus::NotStarted
        && now >= task.start_time
        && now < task.start_time + Duration::seconds(START_WINDOW_SECS)
}

/// End time of the most recently completed task.
fn last_completion(tasks: &[Task]) -> Option<DateTime<Utc>> {
    tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .map(|t| t.end_time)
        .max()
}

/// Events fed to [`run_monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The user came back; run the focus check now.
    Visible,
    /// Run a tick now without waiting for the interval.
    Tick,
    Shutdown,
}

/// Counters returned when the run loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: usize,
    pub focus_checks: usize,
    pub notifications: usize,
}

/// Drive the monitor until `Shutdown` arrives or every sender is dropped.
///
/// Ticks run every `tick_interval_secs` (first one after a full period),
/// one focus check runs `startup_delay_secs` after start, and each
/// `Visible` event runs a focus check immediately. The store is reloaded
/// before every check; a check whose reload fails is skipped.
pub async fn run_monitor(
    app: &mut AppState,
    monitor: &mut ReminderMonitor,
    notifier: &Notifier<'_>,
    clock: &dyn Clock,
    config: &ReminderConfig,
    mut events: mpsc::Receiver<MonitorEvent>,
) -> RunSummary {
    let period = std::time::Duration::from_secs(config.tick_interval_secs.max(1));
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let startup = tokio::time::sleep(std::time::Duration::from_secs(config.startup_delay_secs));
    tokio::pin!(startup);
    let mut startup_pending = true;

    app.ensure_permission(notifier.sink());
    info!(
        throttle = ?monitor.throttle(),
        interval_secs = period.as_secs(),
        "Reminder monitor started"
    );

    let mut summary = RunSummary::default();
    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_tick(app, monitor, notifier, clock, &mut summary);
            }
            _ = &mut startup, if startup_pending => {
                startup_pending = false;
                run_focus_check(app, monitor, notifier, clock, &mut summary);
            }
            event = events.recv() => match event {
                Some(MonitorEvent::Visible) => {
                    run_focus_check(app, monitor, notifier, clock, &mut summary);
                }
                Some(MonitorEvent::Tick) => {
                    run_tick(app, monitor, notifier, clock, &mut summary);
                }
                Some(MonitorEvent::Shutdown) | None => break,
            },
        }
    }

    info!(
        ticks = summary.ticks,
        notifications = summary.notifications,
        "Reminder monitor stopped"
    );
    summary
}

fn run_tick(
    app: &mut AppState,
    monitor: &mut ReminderMonitor,
    notifier: &Notifier<'_>,
    clock: &dyn Clock,
    summary: &mut RunSummary,
) {
    // A tick over stale state could write it back over newer tasks
    if let Err(e) = app.reload() {
        warn!(error = %e, "Failed to reload tasks, skipping tick");
        return;
    }
    let report = monitor.tick(app, notifier, clock.now());
    summary.ticks += 1;
    summary.notifications += report.fired.len();
    if !report.is_empty() {
        debug!(reminded = report.reminded.len(), fired = ?report.fired, "Tick");
    }
}

fn run_focus_check(
    app: &mut AppState,
    monitor: &mut ReminderMonitor,
    notifier: &Notifier<'_>,
    clock: &dyn Clock,
    summary: &mut RunSummary,
) {
    if let Err(e) = app.reload() {
        warn!(error = %e, "Failed to reload tasks, skipping focus check");
        return;
    }
    summary.focus_checks += 1;
    if monitor.check_focus(app, notifier, clock.now()) {
        summary.notifications += 1;
    }
}
