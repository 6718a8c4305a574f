//! YAML configuration for talentmatch.
//!
//! One file describes every stage: how intents compile, which encoder embeds
//! job profiles, where Solr lives, how the session retries and audits, and how
//! profile sections are weighted. Every section is optional.
//!
//! ```yaml
//! version: "1.0"
//!
//! compiler:
//!   dimension: 1024
//!   primary_field: work_experience_job_titles_embedding
//!   primary_boost: 4.0
//!   primary_top_k: 50
//!   location_policy:
//!     mode: filter
//!     match_mode:
//!       type: fuzzy
//!       max_edits: 1
//!
//! encoder:
//!   mode: api
//!   provider: open_ai
//!   model_name: text-embedding-3-large
//!   dimension: 1024
//!
//! solr:
//!   base_url: http://localhost:8983/solr
//!   timeout_secs: 120
//!
//! session:
//!   audit_dir: data/generated_query
//!   default_collections: [cv_collection, profile_collection]
//!   retry:
//!     max_retries: 3
//!     base_delay: 250
//!
//! profile:
//!   skills_boost: 3.0
//!   description_boost: 2.0
//! ```
//!
//! Secrets and endpoints can be supplied through the environment (or a `.env`
//! file) instead; see [`TalentConfig::apply_env_overrides`].

use std::fs;
use std::path::Path;

use encoder::EncoderConfig;
use query::{CompilerConfig, LocationPolicy};
use retrieval::{ProfileWeights, SessionConfig};
use serde::{Deserialize, Serialize};
use store::{validate_collection, SolrConfig};
use thiserror::Error;

/// Solr base URL, e.g. `http://solr:8983/solr`.
pub const ENV_SOLR_URL: &str = "TALENT_SOLR_URL";
pub const ENV_SOLR_USERNAME: &str = "TALENT_SOLR_USERNAME";
pub const ENV_SOLR_PASSWORD: &str = "TALENT_SOLR_PASSWORD";
/// Bearer token for the embedding endpoint.
pub const ENV_OPENAI_API_KEY: &str = "TALENT_OPENAI_API_KEY";
pub const ENV_ENCODER_URL: &str = "TALENT_ENCODER_URL";
/// Overrides `session.audit_dir`; an empty value disables the audit trail.
pub const ENV_AUDIT_DIR: &str = "TALENT_AUDIT_DIR";

/// Errors that can occur when loading configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration for the whole retrieval stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalentConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub compiler: CompilerConfig,

    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub solr: SolrConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub profile: ProfileWeights,
}

impl Default for TalentConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            compiler: CompilerConfig::default(),
            encoder: EncoderConfig::default(),
            solr: SolrConfig::default(),
            session: SessionConfig::default(),
            profile: ProfileWeights::default(),
        }
    }
}

impl TalentConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: TalentConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` (or the defaults), then apply `.env` and process
    /// environment overrides and validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!(path = %env_file.display(), "dotenv_loaded");
        }

        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                serde_yaml::from_str(&content)?
            }
            None => TalentConfig::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overwrite connection settings and secrets from `lookup`, typically
    /// `std::env::var`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SOLR_URL) {
            self.solr.base_url = url;
        }
        if let Some(user) = lookup(ENV_SOLR_USERNAME) {
            self.solr.username = Some(user);
        }
        if let Some(password) = lookup(ENV_SOLR_PASSWORD) {
            self.solr.password = Some(password);
        }
        if let Some(key) = lookup(ENV_OPENAI_API_KEY) {
            self.encoder.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_ENCODER_URL) {
            self.encoder.api_url = url;
        }
        if let Some(dir) = lookup(ENV_AUDIT_DIR) {
            self.session.audit_dir = if dir.trim().is_empty() {
                None
            } else {
                Some(dir.into())
            };
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }

        self.compiler
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;

        if self.encoder.dimension != self.compiler.dimension {
            return Err(ConfigLoadError::Validation(format!(
                "encoder.dimension ({}) must equal compiler.dimension ({})",
                self.encoder.dimension, self.compiler.dimension
            )));
        }
        if !matches!(self.encoder.mode.as_str(), "api" | "stub") {
            return Err(ConfigLoadError::Validation(format!(
                "encoder.mode must be 'api' or 'stub', got '{}'",
                self.encoder.mode
            )));
        }

        if self.solr.base_url.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "solr.base_url cannot be empty".into(),
            ));
        }
        if self.solr.timeout_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "solr.timeout_secs must be greater than zero".into(),
            ));
        }

        if self.session.default_collections.is_empty() {
            return Err(ConfigLoadError::Validation(
                "session.default_collections cannot be empty".into(),
            ));
        }
        for collection in &self.session.default_collections {
            validate_collection(collection)
                .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        }

        self.validate_profile()
    }

    fn validate_profile(&self) -> Result<(), ConfigLoadError> {
        let primary = self.compiler.primary_boost;
        for (name, boost) in [
            ("skills_boost", self.profile.skills_boost),
            ("description_boost", self.profile.description_boost),
        ] {
            if !(boost.is_finite() && boost > 0.0 && boost < primary) {
                return Err(ConfigLoadError::Validation(format!(
                    "profile.{name} must be positive and below compiler.primary_boost ({primary})"
                )));
            }
        }
        if self.profile.page_size == 0 {
            return Err(ConfigLoadError::Validation(
                "profile.page_size must be greater than zero".into(),
            ));
        }
        if self.profile.result_fields.is_empty() {
            return Err(ConfigLoadError::Validation(
                "profile.result_fields cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// True when location text is embedded rather than filtered on.
    pub fn boosts_location(&self) -> bool {
        matches!(self.compiler.location_policy, LocationPolicy::Boost { .. })
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
