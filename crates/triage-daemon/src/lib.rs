//! Triage CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    build_index, init_logging, load_settings, query_guidelines, query_hybrid, show_config,
    show_status,
};
