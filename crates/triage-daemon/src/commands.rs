//! CLI command implementations.
//!
//! Each command builds what it needs from `Settings` and prints JSON to
//! stdout so results can be piped into other tools.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use triage_embeddings::{HttpEmbedder, HttpEmbedderConfig};
use triage_service::TriageCore;
use triage_types::{KnowledgeDomain, Settings};
use triage_vector::{build_knowledge_base, load_metadata};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(config_path: Option<&str>, log_level_override: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over settings.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn parse_domain(value: &str) -> Result<KnowledgeDomain> {
    value
        .parse::<KnowledgeDomain>()
        .with_context(|| format!("Invalid domain '{}', expected chw or clinical", value))
}

/// Trim terms and drop empty ones (from stray commas).
fn normalize_terms(symptoms: &[String]) -> Vec<String> {
    symptoms
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to render output")?
    );
    Ok(())
}

fn status_report(core: &TriageCore) -> serde_json::Value {
    json!({
        "domains": core.status(),
        "cache": core.cache_stats(),
        "rate_limit": core.rate_limit_stats(None),
        "hybrid": core.hybrid_stats(),
    })
}

pub fn show_status(settings: Settings) -> Result<()> {
    let core = TriageCore::from_settings(settings, None).context("Failed to start triage core")?;
    print_json(&status_report(&core))
}

pub async fn query_guidelines(
    settings: Settings,
    domain: &str,
    top_k: Option<usize>,
    symptoms: &[String],
) -> Result<()> {
    let domain = parse_domain(domain)?;
    let terms = normalize_terms(symptoms);
    let core = TriageCore::from_settings(settings, None).context("Failed to start triage core")?;

    let hits = core
        .retrieve_guidelines(domain, &terms, top_k)
        .await
        .with_context(|| format!("Retrieval from {} failed", domain))?;
    print_json(&hits)
}

pub async fn query_hybrid(
    settings: Settings,
    mode: &str,
    top_k: Option<usize>,
    symptoms: &[String],
) -> Result<()> {
    let mode = parse_domain(mode)?;
    let terms = normalize_terms(symptoms);
    let core = TriageCore::from_settings(settings, None).context("Failed to start triage core")?;

    let response = core
        .retrieve_hybrid(&terms, mode, top_k)
        .await
        .context("Hybrid retrieval failed")?;
    print_json(&response)
}

pub async fn build_index(settings: Settings, domain: &str, records_path: &Path) -> Result<()> {
    let domain = parse_domain(domain)?;
    let records = load_metadata(records_path)
        .with_context(|| format!("Failed to read records from {:?}", records_path))?;
    if records.is_empty() {
        bail!("No records in {:?}", records_path);
    }

    let embedder = HttpEmbedder::new(HttpEmbedderConfig::from(&settings.embedding))
        .context("Failed to create embedding client")?;
    let paths = settings.domains.paths(domain);

    info!(domain = %domain, records = records.len(), "Building knowledge base");
    let stats = build_knowledge_base(&records, &embedder, paths)
        .await
        .context("Index build failed")?;

    print_json(&json!({
        "domain": domain,
        "records": stats.records,
        "dimension": stats.dimension,
        "index_path": paths.index_path,
        "metadata_path": paths.metadata_path,
    }))
}

pub fn show_config(settings: &Settings) -> Result<()> {
    print_json(settings)
}
