//! focus-tasks
//!
//! Command line front end: task editing, listing, settings, suggestions and
//! the reminder monitor.

use anyhow::Result;
use chrono::{Duration, Local, Utc};
use clap::Parser;
use focus_tasks::app::AppState;
use focus_tasks::cli::args::{
    AddArgs, EditArgs, ListArgs, SuggestArgs, parse_priority, parse_status, parse_when,
};
use focus_tasks::cli::{
    Cli, Command, FilterCommand, NotificationAction, SettingsCommand, SubtaskCommand,
};
use focus_tasks::config::{AppConfig, ConfigLoader};
use focus_tasks::error::{AppError, AppResult};
use focus_tasks::format::{
    OutputFormat, format_error, format_filters, format_settings, format_stats, format_task,
    format_tasks, short_id,
};
use focus_tasks::logging::{self, LogTarget};
use focus_tasks::monitor::{MonitorEvent, ReminderMonitor, SystemClock, run_monitor};
use focus_tasks::notify::{NotificationSink, Notifier, sink_from_config};
use focus_tasks::state_transitions::TransitionPolicy;
use focus_tasks::store::{KeyValueStore, SqliteStore};
use focus_tasks::suggest::{GeminiSuggester, SuggestionProvider, SuggestionRequest};
use focus_tasks::types::{SubtaskDraft, TaskDraft, TaskStatus};
use focus_tasks::view;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let loader = ConfigLoader::load(cli.config.clone())?.with_database(cli.database.clone());
    for (tier, path) in loader.sources() {
        debug!(%tier, path = %path.display(), "Using config file");
    }
    let config = loader.into_config();

    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&config.database)?);
    let mut app = match AppState::load(store) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("{}", format_error(&err, cli.format));
            std::process::exit(1);
        }
    }
    .with_policy(TransitionPolicy::from_strict_flag(config.transitions.strict));
    let sink = sink_from_config(&config.notifications);
    let format = cli.format;

    if let Err(err) = run(cli.command, &mut app, sink.as_ref(), &config, format).await {
        match err.downcast_ref::<AppError>() {
            Some(app_err) => {
                eprintln!("{}", format_error(app_err, format));
                std::process::exit(1);
            }
            None => return Err(err),
        }
    }

    Ok(())
}

async fn run(
    command: Command,
    app: &mut AppState,
    sink: &dyn NotificationSink,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<()> {
    let now = Local::now();
    let now_utc = now.with_timezone(&Utc);

    match command {
        Command::Add(args) => {
            let draft = build_draft(args, now)?;
            let task = app.create_task(draft, now_utc)?;
            print_created(&task.id, &task.title, format, || format_task(&task, format, now_utc))?;
        }
        Command::Edit(args) => {
            let task = run_edit(app, args, now)?;
            println!("{}", format_task(&task, format, now_utc)?);
        }
        Command::Show { id } => {
            let id = app.resolve_id(&id)?;
            let task = app.task(&id).ok_or_else(|| AppError::task_not_found(&id))?;
            let format = match format {
                OutputFormat::Text => OutputFormat::Markdown,
                other => other,
            };
            println!("{}", format_task(task, format, now_utc)?);
        }
        Command::Status { id, status } => {
            set_status(app, &id, parse_status(&status)?, format)?;
        }
        Command::Start { id } => set_status(app, &id, TaskStatus::InProgress, format)?,
        Command::Done { id } => set_status(app, &id, TaskStatus::Completed, format)?,
        Command::Cancel { id } => set_status(app, &id, TaskStatus::Canceled, format)?,
        Command::Rm { id, yes } => {
            let id = app.resolve_id(&id)?;
            let title = app.task(&id).map(|t| t.title.clone()).unwrap_or_default();
            if !yes && !confirm(&format!("Delete task \"{}\"?", title))? {
                println!("Aborted.");
                return Ok(());
            }
            app.delete_task(&id)?;
            println!("Deleted {} ({})", short_id(&id), title);
        }
        Command::Subtask(cmd) => run_subtask(app, cmd)?,
        Command::List(args) => run_list(app, &args, format)?,
        Command::Stats => println!("{}", format_stats(&app.stats(), format)?),
        Command::Types => {
            let types = view::type_choices(app.tasks());
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&types)?),
                _ => println!("{}", types.join("\n")),
            }
        }
        Command::Filter(cmd) => run_filter(app, cmd, format)?,
        Command::Settings(cmd) => run_settings(app, cmd, sink, format)?,
        Command::Suggest(args) => run_suggest(app, args, config).await?,
        Command::Check => {
            let mut monitor = ReminderMonitor::from_config(&config.reminders);
            let notifier = Notifier::new(sink);
            let report = monitor.tick(app, &notifier, now);
            let focus = monitor.check_focus(app, &notifier, now);
            for id in &report.reminded {
                println!("Reminded: {}", short_id(id));
            }
            for kind in &report.fired {
                println!("Sent: {}", kind.title());
            }
            if focus {
                println!("Sent: Ready to focus?");
            }
            if report.is_empty() && !focus {
                println!("Nothing to remind.");
            }
        }
        Command::Watch => run_watch(app, sink, config).await,
    }

    Ok(())
}

fn print_created(
    id: &str,
    title: &str,
    format: OutputFormat,
    render: impl FnOnce() -> serde_json::Result<String>,
) -> Result<()> {
    match format {
        OutputFormat::Text => println!("Created {} ({})", short_id(id), title),
        _ => println!("{}", render()?),
    }
    Ok(())
}

fn build_draft(args: AddArgs, now: chrono::DateTime<Local>) -> AppResult<TaskDraft> {
    Ok(TaskDraft {
        title: args.title,
        task_type: args.task_type,
        priority: args.priority.as_deref().map(parse_priority).transpose()?,
        status: None,
        start_time: args
            .start
            .as_deref()
            .map(|s| parse_when("start", s, now))
            .transpose()?,
        end_time: args
            .end
            .as_deref()
            .map(|s| parse_when("end", s, now))
            .transpose()?,
        estimated_duration: args.estimate,
        subtasks: args.subtasks.iter().map(|s| SubtaskDraft::parse(s)).collect(),
        notes: args.notes,
    })
}

fn run_edit(
    app: &mut AppState,
    args: EditArgs,
    now: chrono::DateTime<Local>,
) -> AppResult<focus_tasks::types::Task> {
    let id = app.resolve_id(&args.id)?;
    let mut task = app
        .task(&id)
        .cloned()
        .ok_or_else(|| AppError::task_not_found(&id))?;

    let schedule_moved = args.start.is_some() || args.estimate.is_some();

    if let Some(title) = args.title {
        task.title = title.trim().to_string();
    }
    if let Some(task_type) = args.task_type {
        task.task_type = task_type.trim().to_string();
    }
    if let Some(priority) = args.priority {
        task.priority = parse_priority(&priority)?;
    }
    if let Some(start) = args.start {
        task.start_time = parse_when("start", &start, now)?;
    }
    if let Some(estimate) = args.estimate {
        if estimate == 0 {
            return Err(AppError::invalid_value(
                "estimated_duration",
                "Estimated duration must be at least one minute",
            ));
        }
        task.estimated_duration = estimate;
    }
    match args.end {
        Some(end) => task.end_time = parse_when("end", &end, now)?,
        // Keep end = start + estimate when either of those moved
        None if schedule_moved => {
            task.end_time = task.start_time + Duration::minutes(i64::from(task.estimated_duration));
        }
        None => {}
    }
    if args.clear_notes {
        task.notes = None;
    } else if let Some(notes) = args.notes {
        task.notes = Some(notes).filter(|n| !n.trim().is_empty());
    }

    app.save_task(task.clone())?;
    Ok(task)
}

fn set_status(
    app: &mut AppState,
    id: &str,
    status: TaskStatus,
    format: OutputFormat,
) -> Result<()> {
    let id = app.resolve_id(id)?;
    let now = Utc::now();
    let task = app.update_status(&id, status, now)?;
    match format {
        OutputFormat::Text => {
            print!("{} -> {}", task.title, task.status.label());
            match task.actual_duration {
                Some(minutes) if status == TaskStatus::Completed => println!(" ({}m)", minutes),
                _ => println!(),
            }
        }
        _ => println!("{}", format_task(&task, format, now)?),
    }
    Ok(())
}

fn run_subtask(app: &mut AppState, cmd: SubtaskCommand) -> Result<()> {
    match cmd {
        SubtaskCommand::Add { task, title } => {
            let id = app.resolve_id(&task)?;
            let subtask = app.add_subtask(&id, SubtaskDraft::parse(&title))?;
            println!("Added subtask {} ({})", short_id(&subtask.id), subtask.title);
        }
        SubtaskCommand::Toggle { task, subtask } => {
            let id = app.resolve_id(&task)?;
            let done = app.toggle_subtask(&id, &subtask)?;
            println!("{}", if done { "Done" } else { "Not done" });
        }
        SubtaskCommand::Rm { task, subtask } => {
            let id = app.resolve_id(&task)?;
            let removed = app.remove_subtask(&id, &subtask)?;
            println!("Removed subtask {}", removed.title);
        }
    }
    Ok(())
}

fn run_list(app: &AppState, args: &ListArgs, format: OutputFormat) -> Result<()> {
    let filters = args.effective_filters(app.filters())?;
    let visible = view::visible_tasks(app.tasks(), &filters);
    println!("{}", format_tasks(&visible, format, Utc::now())?);
    Ok(())
}

fn run_filter(app: &mut AppState, cmd: FilterCommand, format: OutputFormat) -> Result<()> {
    match cmd {
        FilterCommand::Show => {}
        FilterCommand::Set(args) => {
            let filters = args.apply(app.filters())?;
            app.set_filters(filters)?;
        }
        FilterCommand::Clear => app.clear_filters()?,
    }
    println!("{}", format_filters(app.filters(), format)?);
    Ok(())
}

fn run_settings(
    app: &mut AppState,
    cmd: SettingsCommand,
    sink: &dyn NotificationSink,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        SettingsCommand::Show => {}
        SettingsCommand::Idle { hours } => app.set_idle_interval(hours)?,
        SettingsCommand::Notifications { action } => match action {
            NotificationAction::On | NotificationAction::Off => {
                let want = action == NotificationAction::On;
                if app.settings().notifications_enabled != want {
                    app.toggle_notifications(sink)?;
                }
            }
            NotificationAction::Test => {
                app.test_notification(sink)?;
                println!("Test notification sent.");
                return Ok(());
            }
        },
    }
    println!("{}", format_settings(app.settings(), format)?);
    Ok(())
}

async fn run_suggest(app: &AppState, args: SuggestArgs, config: &AppConfig) -> Result<()> {
    let request = match &args.task {
        Some(task) => {
            let id = app.resolve_id(task)?;
            let task = app.task(&id).ok_or_else(|| AppError::task_not_found(&id))?;
            SuggestionRequest {
                title: task.title.clone(),
                task_type: task.task_type.clone(),
                duration_minutes: task.estimated_duration,
            }
        }
        None => SuggestionRequest {
            title: args.title.clone().unwrap_or_default(),
            task_type: args.task_type.clone(),
            duration_minutes: args.duration,
        },
    };

    let suggester = GeminiSuggester::from_config(&config.suggestions);
    println!("{}", suggester.suggest(&request).await);
    Ok(())
}

async fn run_watch(app: &mut AppState, sink: &dyn NotificationSink, config: &AppConfig) {
    let (tx, rx) = mpsc::channel(16);

    // Each stdin line is a visibility event. EOF only stops this reader.
    let stdin_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(_)) => {
                    if stdin_tx.send(MonitorEvent::Visible).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin, visibility events disabled");
                    break;
                }
            }
        }
    });

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        let _ = tx.send(MonitorEvent::Shutdown).await;
    });

    let mut monitor = ReminderMonitor::from_config(&config.reminders);
    let notifier = Notifier::new(sink);
    let summary = run_monitor(
        app,
        &mut monitor,
        &notifier,
        &SystemClock,
        &config.reminders,
        rx,
    )
    .await;
    info!(
        ticks = summary.ticks,
        focus_checks = summary.focus_checks,
        notifications = summary.notifications,
        "Watch finished"
    );
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is no.
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
