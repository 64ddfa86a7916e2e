//! Command-line interface for promptpack
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions (clap)
//! - `run`: entry point, configuration discovery and dispatch
//! - `commands`: one module per subcommand

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands};
pub use run::run;
