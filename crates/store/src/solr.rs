use async_trait::async_trait;
use query::CompiledQuery;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::{validate_collection, DocumentStore, StoreError};

/// Connection settings for [`SolrStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolrConfig {
    /// Base URL up to and including `/solr`, e.g. `http://localhost:8983/solr`.
    pub base_url: String,
    /// Per-request timeout. Exceeding it is a transient failure.
    pub timeout_secs: u64,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8983/solr".into(),
            timeout_secs: 120,
            username: None,
            password: None,
        }
    }
}

/// [`DocumentStore`] over Solr's HTTP API.
///
/// Queries go to `{base}/{collection}/select` as a form POST, since rendered
/// vectors easily exceed URL length limits.
pub struct SolrStore {
    cfg: SolrConfig,
    client: reqwest::Client,
}

impl SolrStore {
    pub fn new(cfg: SolrConfig) -> Result<Self, StoreError> {
        let base = cfg.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(StoreError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                cfg.base_url
            )));
        }
        if cfg.timeout_secs == 0 {
            return Err(StoreError::Config(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StoreError::Config(format!("http client: {e}")))?;
        Ok(Self { cfg, client })
    }

    pub fn config(&self) -> &SolrConfig {
        &self.cfg
    }

    fn url(&self, collection: &str, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.cfg.base_url.trim().trim_end_matches('/'),
            collection,
            path
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.cfg.username {
            Some(user) => request.basic_auth(user, self.cfg.password.as_deref()),
            None => request,
        }
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, StoreError> {
        let status = response.status();
        let body = response.text().await.map_err(StoreError::from_reqwest)?;
        if !status.is_success() {
            return Err(StoreError::from_status(status.as_u16(), truncate(body)));
        }
        serde_json::from_str(&body)
            .map_err(|e| StoreError::InvalidBody(format!("{e}: {}", truncate(body))))
    }
}

fn truncate(mut body: String) -> String {
    const MAX: usize = 512;
    if body.len() > MAX {
        let mut cut = MAX;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}

#[async_trait]
impl DocumentStore for SolrStore {
    async fn query(&self, collection: &str, compiled: &CompiledQuery) -> Result<Value, StoreError> {
        validate_collection(collection)?;
        let started = Instant::now();
        let params = compiled.to_solr_params();
        let request = self
            .authorize(self.client.post(self.url(collection, "select")))
            .form(&params);
        let response = request.send().await.map_err(StoreError::from_reqwest)?;
        let body = Self::read_json(response).await?;
        debug!(
            collection,
            terms = compiled.terms().len(),
            filters = compiled.filters().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "solr_select"
        );
        Ok(body)
    }

    async fn delete_all(&self, collection: &str) -> Result<(), StoreError> {
        validate_collection(collection)?;
        let request = self
            .authorize(self.client.post(self.url(collection, "update")))
            .query(&[("commit", "true"), ("wt", "json")])
            .json(&json!({ "delete": { "query": "*:*" } }));
        let response = request.send().await.map_err(StoreError::from_reqwest)?;
        Self::read_json(response).await?;
        info!(collection, "solr_collection_cleared");
        Ok(())
    }

    async fn ping(&self, collection: &str) -> Result<(), StoreError> {
        validate_collection(collection)?;
        let request = self
            .authorize(self.client.get(self.url(collection, "admin/ping")))
            .query(&[("wt", "json")]);
        let response = request.send().await.map_err(StoreError::from_reqwest)?;
        let body = Self::read_json(response).await?;
        match body.get("status").and_then(Value::as_str) {
            Some("OK") => Ok(()),
            other => Err(StoreError::Transient(format!(
                "ping status {}",
                other.unwrap_or("missing")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query::{CompilerConfig, QueryCompiler, SearchIntent};

    #[test]
    fn config_defaults() {
        let cfg = SolrConfig::default();
        assert_eq!(cfg.timeout_secs, 120);
        assert!(cfg.base_url.ends_with("/solr"));
    }

    #[test]
    fn rejects_bad_base_url() {
        let cfg = SolrConfig {
            base_url: "localhost:8983".into(),
            ..Default::default()
        };
        assert!(matches!(SolrStore::new(cfg), Err(StoreError::Config(_))));
    }

    #[test]
    fn builds_collection_urls() {
        let store = SolrStore::new(SolrConfig {
            base_url: "https://search.example.com/solr/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            store.url("cv_collection", "select"),
            "https://search.example.com/solr/cv_collection/select"
        );
    }

    #[test]
    fn truncates_long_bodies_on_char_boundary() {
        let long = "é".repeat(400);
        let cut = truncate(long);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 515);
        assert_eq!(truncate("short".into()), "short");
    }

    #[tokio::test]
    async fn unreachable_solr_is_transient() {
        let store = SolrStore::new(SolrConfig {
            base_url: "http://127.0.0.1:9/solr".into(),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();
        let compiled = QueryCompiler::new(CompilerConfig {
            dimension: 2,
            ..Default::default()
        })
        .unwrap()
        .compile(&SearchIntent::new(vec![0.1, 0.2]))
        .unwrap();
        let err = store.query("cv_collection", &compiled).await.unwrap_err();
        assert!(err.is_transient(), "{err:?}");
    }

    #[tokio::test]
    async fn invalid_collection_name_never_hits_network() {
        let store = SolrStore::new(SolrConfig::default()).unwrap();
        let err = store.delete_all("../admin").await.unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
