//! Configuration loading for the triage core.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/clinical-triage/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::domain::KnowledgeDomain;
use crate::error::TriageError;

/// Embedding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Base URL of the embedding service
    #[serde(default = "default_embedding_url")]
    pub base_url: String,

    /// Model name; must be the model the indexes were built with
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension expected by every loaded index
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Optional bearer token (loaded from env, never written back out)
    #[serde(default, skip_serializing, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

fn default_embedding_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "all-minilm".to_string()
}

fn default_dimension() -> usize {
    384 // all-MiniLM-L6-v2
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: default_embedding_url(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_max_retries(),
            api_key: None,
        }
    }
}

impl EmbeddingSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.dimension == 0 {
            return Err("embedding.dimension must be > 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("embedding.timeout_secs must be > 0".to_string());
        }
        Ok(())
    }
}

/// Index and metadata file locations for one domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainPaths {
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
}

/// File locations for every knowledge domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainSettings {
    #[serde(default = "default_chw_paths")]
    pub chw: DomainPaths,

    #[serde(default = "default_clinical_paths")]
    pub clinical: DomainPaths,
}

fn data_dir() -> PathBuf {
    ProjectDirs::from("", "", "clinical-triage")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

fn default_chw_paths() -> DomainPaths {
    let dir = data_dir().join("kb_chw");
    DomainPaths {
        index_path: dir.join("chw_guidelines.index"),
        metadata_path: dir.join("chw_guidelines_metadata.json"),
    }
}

fn default_clinical_paths() -> DomainPaths {
    let dir = data_dir().join("kb_clinical");
    DomainPaths {
        index_path: dir.join("clinical_kb.index"),
        metadata_path: dir.join("clinical_kb_metadata.json"),
    }
}

impl Default for DomainSettings {
    fn default() -> Self {
        Self {
            chw: default_chw_paths(),
            clinical: default_clinical_paths(),
        }
    }
}

impl DomainSettings {
    pub fn paths(&self, domain: KnowledgeDomain) -> &DomainPaths {
        match domain {
            KnowledgeDomain::Chw => &self.chw,
            KnowledgeDomain::Clinical => &self.clinical,
        }
    }
}

/// Local retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Refuse to serve a domain whose index and metadata counts differ.
    /// When false the domain is served truncated to the shorter side.
    #[serde(default)]
    pub strict_alignment: bool,
}

fn default_top_k() -> usize {
    3
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            strict_alignment: false,
        }
    }
}

/// Secondary live-search enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridSettings {
    /// Fraction of simple CHW queries enriched by the live source.
    #[serde(default = "default_usage_rate")]
    pub usage_rate: f64,
}

fn default_usage_rate() -> f64 {
    0.2
}

impl Default for HybridSettings {
    fn default() -> Self {
        Self {
            usage_rate: default_usage_rate(),
        }
    }
}

impl HybridSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.usage_rate) {
            return Err(format!(
                "hybrid.usage_rate must be 0.0-1.0, got {}",
                self.usage_rate
            ));
        }
        Ok(())
    }
}

/// Cache and rate-limit settings for governed calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorSettings {
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Size ceiling that triggers proactive eviction
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,

    /// Share of entries (soonest expiry first) dropped per eviction pass
    #[serde(default = "default_eviction_fraction")]
    pub eviction_fraction: f64,

    #[serde(default = "default_per_minute")]
    pub max_requests_per_minute: usize,

    #[serde(default = "default_per_day")]
    pub max_requests_per_day: usize,

    /// Identifier used when callers are not distinguished
    #[serde(default = "default_identifier")]
    pub default_identifier: String,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_max_cache_entries() -> usize {
    1000
}

fn default_eviction_fraction() -> f64 {
    0.1
}

fn default_per_minute() -> usize {
    50
}

fn default_per_day() -> usize {
    1000
}

fn default_identifier() -> String {
    "global".to_string()
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl_secs: default_cache_ttl(),
            max_cache_entries: default_max_cache_entries(),
            eviction_fraction: default_eviction_fraction(),
            max_requests_per_minute: default_per_minute(),
            max_requests_per_day: default_per_day(),
            default_identifier: default_identifier(),
        }
    }
}

impl GovernorSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_cache_entries == 0 {
            return Err("governor.max_cache_entries must be > 0".to_string());
        }
        if !(self.eviction_fraction > 0.0 && self.eviction_fraction <= 1.0) {
            return Err(format!(
                "governor.eviction_fraction must be in (0.0, 1.0], got {}",
                self.eviction_fraction
            ));
        }
        if self.max_requests_per_minute == 0 || self.max_requests_per_day == 0 {
            return Err("governor request limits must be > 0".to_string());
        }
        if self.default_identifier.is_empty() {
            return Err("governor.default_identifier must not be empty".to_string());
        }
        Ok(())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub domains: DomainSettings,

    #[serde(default)]
    pub retrieval: RetrievalSettings,

    #[serde(default)]
    pub hybrid: HybridSettings,

    #[serde(default)]
    pub governor: GovernorSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            embedding: EmbeddingSettings::default(),
            domains: DomainSettings::default(),
            retrieval: RetrievalSettings::default(),
            hybrid: HybridSettings::default(),
            governor: GovernorSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/clinical-triage/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (TRIAGE_*, nested keys split on `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TriageError> {
        let config_dir = ProjectDirs::from("", "", "clinical-triage")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| TriageError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // e.g. TRIAGE_GOVERNOR__CACHE_TTL_SECS=600, TRIAGE_EMBEDDING__API_KEY=...
        builder = builder.add_source(
            Environment::with_prefix("TRIAGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TriageError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TriageError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), TriageError> {
        self.embedding.validate().map_err(TriageError::Config)?;
        self.hybrid.validate().map_err(TriageError::Config)?;
        self.governor.validate().map_err(TriageError::Config)?;
        if self.retrieval.default_top_k == 0 {
            return Err(TriageError::Config(
                "retrieval.default_top_k must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
