//! Command-line interface for exemplar.
//!
//! - `args`: clap argument definitions
//! - `run`: entry point, dispatch and error output
//! - `commands`: per-command handlers and summaries

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands};
pub use run::run;
