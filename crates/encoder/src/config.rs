use resilience::{CircuitBreakerConfig, RetryConfig};
use serde::{Deserialize, Serialize};

use crate::types::DEFAULT_DIMENSION;

/// Which request/response dialect the embedding endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiProvider {
    /// `POST {input, model, dimensions}` → `{data: [{embedding}]}`.
    #[default]
    OpenAi,
    /// Hugging Face feature-extraction: `POST {inputs}` → `[...]` or `[[...]]`.
    HuggingFace,
    /// `POST {text}` → `{embeddings: [[...]]}` or a bare array.
    Custom,
}

impl ApiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiProvider::OpenAi => "openai",
            ApiProvider::HuggingFace => "huggingface",
            ApiProvider::Custom => "custom",
        }
    }
}

/// Runtime configuration for [`ApiEncoder`](crate::ApiEncoder) and
/// [`StubEncoder`](crate::StubEncoder).
///
/// # Example
/// ```no_run
/// use encoder::{ApiEncoder, ApiProvider, EncoderConfig};
///
/// let cfg = EncoderConfig {
///     provider: ApiProvider::OpenAi,
///     api_key: Some("sk-...".into()),
///     ..Default::default()
/// };
/// let encoder = ApiEncoder::new(cfg).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// `"api"` for [`ApiEncoder`](crate::ApiEncoder), `"stub"` for the deterministic stub.
    pub mode: String,
    pub provider: ApiProvider,
    /// Full endpoint URL.
    pub api_url: String,
    /// Sent as `Authorization: Bearer <key>` when present.
    pub api_key: Option<String>,
    pub model_name: String,
    /// Expected vector length; responses of any other length are rejected.
    pub dimension: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// L2-normalize vectors returned by the provider.
    pub normalize: bool,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            mode: "api".into(),
            provider: ApiProvider::OpenAi,
            api_url: "https://api.openai.com/v1/embeddings".into(),
            api_key: None,
            model_name: "text-embedding-3-large".into(),
            dimension: DEFAULT_DIMENSION,
            timeout_secs: 30,
            normalize: false,
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}
