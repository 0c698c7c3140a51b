//! focus-tasks library
//!
//! This module exports the core components for testing and integration.

pub mod app;
pub mod cli;
pub mod config;
pub mod documents;
pub mod error;
pub mod format;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod state_transitions;
pub mod store;
pub mod suggest;
pub mod types;
pub mod view;
