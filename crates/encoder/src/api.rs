use async_trait::async_trait;
use resilience::{execute_with_retry, CircuitBreaker};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::normalize::l2_normalize_in_place;
use crate::{ApiProvider, EmbeddingVector, EncoderConfig, EncoderError, VectorEncoder};

/// Embedding client for a remote provider.
///
/// Each instance owns its HTTP client and circuit breaker, so tests and
/// multi-tenant hosts can run several side by side.
pub struct ApiEncoder {
    cfg: EncoderConfig,
    client: reqwest::Client,
    breaker: CircuitBreaker,
}

impl ApiEncoder {
    pub fn new(cfg: EncoderConfig) -> Result<Self, EncoderError> {
        if cfg.api_url.trim().is_empty() {
            return Err(EncoderError::InvalidConfig(
                "api_url is required for api mode".into(),
            ));
        }
        if cfg.dimension == 0 {
            return Err(EncoderError::InvalidConfig(
                "dimension must be greater than zero".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| EncoderError::InvalidConfig(format!("http client: {e}")))?;
        let breaker = CircuitBreaker::new(cfg.circuit_breaker);
        Ok(Self {
            cfg,
            client,
            breaker,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.cfg
    }

    /// Embed `text`, surfacing provider errors instead of failing closed.
    ///
    /// Blank input short-circuits to the zero vector without a request.
    pub async fn try_embed(&self, text: &str) -> Result<EmbeddingVector, EncoderError> {
        if text.trim().is_empty() {
            return Ok(EmbeddingVector::zeros(self.cfg.dimension));
        }

        let provider = self.cfg.provider.as_str();
        if !self.breaker.allow_request() {
            return Err(EncoderError::CircuitOpen(provider.to_string()));
        }

        let payload = build_api_payload(&self.cfg, text);
        let outcome = execute_with_retry(&self.cfg.retry, EncoderError::is_transient, |attempt| {
            let payload = payload.clone();
            async move {
                if attempt > 0 {
                    debug!(provider, attempt, "embedding_retry");
                }
                self.send_api_request(payload).await
            }
        })
        .await;

        let response = match outcome.result {
            Ok(response) => {
                self.breaker.record_success();
                response
            }
            Err(err) => {
                self.breaker.record_failure();
                return Err(err);
            }
        };

        let mut vector = parse_embeddings_from_value(response)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                EncoderError::InvalidResponse("response did not contain embeddings".into())
            })?;
        if vector.len() != self.cfg.dimension {
            return Err(EncoderError::DimensionMismatch {
                expected: self.cfg.dimension,
                actual: vector.len(),
            });
        }
        if self.cfg.normalize {
            l2_normalize_in_place(&mut vector);
        }
        Ok(EmbeddingVector::new(vector))
    }

    async fn send_api_request(&self, payload: Value) -> Result<Value, EncoderError> {
        let mut request = self.client.post(&self.cfg.api_url).json(&payload);
        if let Some(key) = self.cfg.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EncoderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EncoderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| EncoderError::InvalidResponse(format!("invalid JSON: {e}")))
    }
}

#[async_trait]
impl VectorEncoder for ApiEncoder {
    fn dimension(&self) -> usize {
        self.cfg.dimension
    }

    async fn embed(&self, text: &str) -> EmbeddingVector {
        match self.try_embed(text).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!(
                    provider = self.cfg.provider.as_str(),
                    error = %err,
                    "embedding_failed_using_zero_vector"
                );
                EmbeddingVector::zeros(self.cfg.dimension)
            }
        }
    }
}

fn build_api_payload(cfg: &EncoderConfig, text: &str) -> Value {
    match cfg.provider {
        ApiProvider::OpenAi => json!({
            "input": text,
            "model": cfg.model_name,
            "dimensions": cfg.dimension,
        }),
        ApiProvider::HuggingFace => json!({ "inputs": text }),
        ApiProvider::Custom => json!({ "text": text }),
    }
}

fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, EncoderError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(mut obj) => match obj.remove("embedding") {
                            Some(embedding) => vectors.push(parse_embedding_vector(embedding)?),
                            None => {
                                return Err(EncoderError::InvalidResponse(
                                    "missing `embedding` field in data item".into(),
                                ))
                            }
                        },
                        _ => {
                            return Err(EncoderError::InvalidResponse(
                                "unexpected entry inside `data` array".into(),
                            ))
                        }
                    }
                }
                return Ok(vectors);
            }

            Err(EncoderError::InvalidResponse(
                "unsupported API response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, EncoderError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, EncoderError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| {
                        EncoderError::InvalidResponse("non-finite embedding value".into())
                    }),
                other => Err(EncoderError::InvalidResponse(format!(
                    "embedding entries must be numbers, got {other}"
                ))),
            })
            .collect(),
        other => Err(EncoderError::InvalidResponse(format!(
            "embedding vector must be an array, got {other}"
        ))),
    }
}
