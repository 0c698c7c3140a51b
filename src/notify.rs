//! Notification delivery.
//!
//! A [`NotificationSink`] is the platform side (terminal, external command,
//! or a recording fake). [`Notifier`] sits in front of it and applies the
//! user's enabled flag and the sink's permission state.

use crate::config::{NotificationConfig, SinkKind};
use crate::types::Settings;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Permission state of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet.
    Default,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification permission not granted")]
    NotPermitted,

    #[error("failed to run notification command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("notification command exited with status {0:?}")]
    CommandFailed(Option<i32>),

    #[error("notifications unavailable: {0}")]
    Unavailable(String),
}

/// Something that can show a title + body to the user.
pub trait NotificationSink: Send + Sync {
    /// Current permission state. Never prompts.
    fn permission(&self) -> Permission;

    /// Ask for permission. Only called from explicit user actions.
    fn request_permission(&self) -> Result<Permission, NotifyError>;

    /// Show a notification.
    fn display(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Prints notifications to stdout with a terminal bell.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&self) -> Result<Permission, NotifyError> {
        Ok(Permission::Granted)
    }

    fn display(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        println!("\u{7}[{}] {}", title, body);
        Ok(())
    }
}

/// Runs an external program (for example `notify-send`) with the title and
/// body appended as the last two arguments.
#[derive(Debug, Clone)]
pub struct CommandSink {
    argv: Vec<String>,
}

impl CommandSink {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl NotificationSink for CommandSink {
    fn permission(&self) -> Permission {
        if self.argv.is_empty() {
            Permission::Denied
        } else {
            Permission::Granted
        }
    }

    fn request_permission(&self) -> Result<Permission, NotifyError> {
        Ok(self.permission())
    }

    fn display(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(NotifyError::Unavailable("no command configured".into()));
        };

        let status = Command::new(program)
            .args(args)
            .arg(title)
            .arg(body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .map_err(NotifyError::Spawn)?;

        if status.success() {
            Ok(())
        } else {
            Err(NotifyError::CommandFailed(status.code()))
        }
    }
}

/// Sink that never shows anything and never grants permission.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSink;

impl NotificationSink for DisabledSink {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    fn request_permission(&self) -> Result<Permission, NotifyError> {
        Ok(Permission::Denied)
    }

    fn display(&self, _title: &str, _body: &str) -> Result<(), NotifyError> {
        Err(NotifyError::NotPermitted)
    }
}

/// Records displayed notifications. Permission and the answer to a
/// permission request are configurable.
#[derive(Debug)]
pub struct MemorySink {
    permission: Mutex<Permission>,
    request_answer: Permission,
    sent: Mutex<Vec<(String, String)>>,
    requests: Mutex<usize>,
}

impl MemorySink {
    /// A sink that has already been granted permission.
    pub fn granted() -> Self {
        Self::new(Permission::Granted, Permission::Granted)
    }

    pub fn new(permission: Permission, request_answer: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
            request_answer,
            sent: Mutex::new(Vec::new()),
            requests: Mutex::new(0),
        }
    }

    /// Notifications displayed so far as `(title, body)`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Titles displayed so far.
    pub fn titles(&self) -> Vec<String> {
        self.sent().into_iter().map(|(title, _)| title).collect()
    }

    /// How many times permission was requested.
    pub fn permission_requests(&self) -> usize {
        self.requests.lock().map(|r| *r).unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

impl NotificationSink for MemorySink {
    fn permission(&self) -> Permission {
        self.permission
            .lock()
            .map(|p| *p)
            .unwrap_or(Permission::Denied)
    }

    fn request_permission(&self) -> Result<Permission, NotifyError> {
        if let Ok(mut count) = self.requests.lock() {
            *count += 1;
        }
        let mut permission = self
            .permission
            .lock()
            .map_err(|_| NotifyError::Unavailable("sink lock poisoned".into()))?;
        *permission = self.request_answer;
        Ok(self.request_answer)
    }

    fn display(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        if self.permission() != Permission::Granted {
            return Err(NotifyError::NotPermitted);
        }
        self.sent
            .lock()
            .map_err(|_| NotifyError::Unavailable("sink lock poisoned".into()))?
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

/// Build the sink selected in the config.
pub fn sink_from_config(config: &NotificationConfig) -> Box<dyn NotificationSink> {
    match config.sink {
        SinkKind::Terminal => Box::new(TerminalSink),
        SinkKind::Command => {
            if config.command.is_empty() {
                warn!("notifications.sink is command but notifications.command is empty");
            }
            Box::new(CommandSink::new(config.command.clone()))
        }
        SinkKind::None => Box::new(DisabledSink),
    }
}

/// Gate in front of a sink.
pub struct Notifier<'a> {
    sink: &'a dyn NotificationSink,
}

impl<'a> Notifier<'a> {
    pub fn new(sink: &'a dyn NotificationSink) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &'a dyn NotificationSink {
        self.sink
    }

    /// Show a notification if the user enabled notifications and the sink
    /// already has permission. Failures are logged, never returned.
    ///
    /// Returns whether the sink accepted the notification.
    pub fn send(&self, settings: &Settings, title: &str, body: &str) -> bool {
        if !settings.notifications_enabled {
            debug!(title, "Notifications disabled, skipping");
            return false;
        }
        if self.sink.permission() != Permission::Granted {
            debug!(title, "Notification permission not granted, skipping");
            return false;
        }
        match self.sink.display(title, body) {
            Ok(()) => {
                debug!(title, "Notification sent");
                true
            }
            Err(e) => {
                warn!(title, error = %e, "Failed to display notification");
                false
            }
        }
    }
}
