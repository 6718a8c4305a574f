//! Write-once audit trail of compiled queries.
//!
//! One JSON file per (collection, search) under the audit directory, named
//! `query_<collection>_<UTC timestamp>_<seq>.json`. Files are written to a
//! temporary name and renamed into place, so a reader never sees a partial
//! record and concurrent searches never share a file.

use chrono::{DateTime, Utc};
use query::CompiledQuery;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::AuditError;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Serialize)]
struct AuditRecord<'a> {
    collection: &'a str,
    timestamp: String,
    query: &'a CompiledQuery,
    params: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `compiled` for `collection` and return the written path.
    pub async fn record(
        &self,
        collection: &str,
        compiled: &CompiledQuery,
        at: DateTime<Utc>,
    ) -> Result<PathBuf, AuditError> {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "query_{collection}_{}_{seq}.json",
            at.format("%Y%m%dT%H%M%S%.6f")
        );
        let record = AuditRecord {
            collection,
            timestamp: at.to_rfc3339(),
            query: compiled,
            params: compiled.to_solr_params(),
        };
        let body = serde_json::to_vec_pretty(&record)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&name);
        let tmp = self.dir.join(format!(".{name}.tmp"));
        if let Err(err) = tokio::fs::write(&tmp, &body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }
}
