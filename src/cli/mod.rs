//! CLI module for the pixelforge library
//!
//! This module is only available when the "cli" feature is enabled.

mod config;
#[path = "main.rs"]
mod main_impl;
mod progress;

pub use main_impl::{main, Cli, Command, RemoveBgArgs, WatermarkArgs};
pub use progress::{create_cli_progress_reporter, IndicatifProgressReporter};
