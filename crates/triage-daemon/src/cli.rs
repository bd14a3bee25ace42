//! CLI argument parsing for the triage binary.
//!
//! CLI flags override all other config sources.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Clinical triage guideline retrieval
#[derive(Parser, Debug)]
#[command(name = "triage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (layered over ~/.config/clinical-triage/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show knowledge domain health and governor stats
    Status,

    /// Retrieve guidelines for symptoms from one domain
    Query {
        /// Knowledge domain (chw, clinical)
        #[arg(short, long, default_value = "chw")]
        domain: String,

        /// Number of results (default from config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Symptom terms, space or comma separated
        #[arg(required = true, value_delimiter = ',')]
        symptoms: Vec<String>,
    },

    /// Retrieve with optional live-search enrichment
    Hybrid {
        /// Triage mode (chw, clinical)
        #[arg(short, long, default_value = "chw")]
        mode: String,

        /// Number of local results (default from config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Symptom terms, space or comma separated
        #[arg(required = true, value_delimiter = ',')]
        symptoms: Vec<String>,
    },

    /// Embed guideline records and write a domain's index and metadata
    BuildIndex {
        /// Knowledge domain (chw, clinical)
        #[arg(short, long)]
        domain: String,

        /// JSON array of guideline records
        #[arg(short, long)]
        records: PathBuf,
    },

    /// Print the effective configuration
    Config,
}
