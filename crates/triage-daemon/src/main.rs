//! Triage CLI
//!
//! Guideline retrieval from the command line.
//!
//! # Usage
//!
//! ```bash
//! triage status
//! triage query --domain chw fever,cough
//! triage hybrid --mode clinical fever cough "chest pain"
//! triage build-index --domain chw --records chw_records.json
//! triage config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/clinical-triage/config.toml)
//! 3. `--config` file
//! 4. Environment variables (TRIAGE_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use triage_daemon::{
    build_index, init_logging, load_settings, query_guidelines, query_hybrid, show_config,
    show_status, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings)?;

    match cli.command {
        Commands::Status => {
            show_status(settings)?;
        }
        Commands::Query {
            domain,
            top_k,
            symptoms,
        } => {
            query_guidelines(settings, &domain, top_k, &symptoms).await?;
        }
        Commands::Hybrid {
            mode,
            top_k,
            symptoms,
        } => {
            query_hybrid(settings, &mode, top_k, &symptoms).await?;
        }
        Commands::BuildIndex { domain, records } => {
            build_index(settings, &domain, &records).await?;
        }
        Commands::Config => {
            show_config(&settings)?;
        }
    }

    Ok(())
}
