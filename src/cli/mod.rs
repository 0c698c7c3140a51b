//! CLI command definitions for focus-tasks
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod args;

use crate::format::OutputFormat;
use args::{AddArgs, EditArgs, FilterArgs, ListArgs, SuggestArgs};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Personal task tracker with start, overdue and idle reminders
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a task
    Add(AddArgs),

    /// Change fields of a task
    Edit(EditArgs),

    /// Show one task
    Show {
        /// Task id or unique id prefix
        id: String,
    },

    /// Set a task's status
    Status {
        /// Task id or unique id prefix
        id: String,
        /// not-started, in-progress, completed, canceled or reminded
        status: String,
    },

    /// Mark a task in progress
    Start { id: String },

    /// Mark a task completed
    Done { id: String },

    /// Mark a task canceled
    Cancel { id: String },

    /// Delete a task
    Rm {
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage a task's checklist
    #[command(subcommand)]
    Subtask(SubtaskCommand),

    /// List tasks through the saved filters
    List(ListArgs),

    /// Completed count and total focus time
    Stats,

    /// Task types in use
    Types,

    /// Show or change the saved list filters
    #[command(subcommand)]
    Filter(FilterCommand),

    /// Show or change settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Ask for a short tip about a task
    Suggest(SuggestArgs),

    /// Run the reminder checks once, now
    Check,

    /// Run the reminder monitor until Ctrl-C; each line on stdin counts as
    /// "the user is back" and triggers the focus check
    Watch,
}

#[derive(Subcommand, Debug)]
pub enum SubtaskCommand {
    /// Add a subtask (`title` or `title:minutes`)
    Add { task: String, title: String },
    /// Flip a subtask's completion flag
    Toggle { task: String, subtask: String },
    /// Remove a subtask
    Rm { task: String, subtask: String },
}

#[derive(Subcommand, Debug)]
pub enum FilterCommand {
    /// Print the saved filters
    Show,
    /// Change the saved filters; unset options keep their value
    Set(FilterArgs),
    /// Reset every filter to ALL and clear the search text
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the settings
    Show,
    /// Hours before overdue and idle reminders fire
    Idle { hours: f64 },
    /// Turn notifications on or off, or send a test notification
    Notifications {
        #[arg(value_enum)]
        action: NotificationAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NotificationAction {
    On,
    Off,
    Test,
}
