use encoder::{EmbeddingVector, DEFAULT_DIMENSION};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compiled::{CompiledQuery, FilterPredicate, SimilarityTerm, TextMatch};
use crate::error::CompileError;
use crate::intent::{SearchIntent, TextConstraint};
use crate::location::parse_location;

/// How a free-text location takes part in ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LocationPolicy {
    /// Hard filter: documents must mention one of the settlements.
    Filter {
        #[serde(default)]
        match_mode: LocationMatch,
    },
    /// Soft signal: location text filters are ignored and the caller adds a
    /// location embedding as a secondary vector on `field`.
    Boost { field: String, boost: f32, top_k: usize },
}

impl Default for LocationPolicy {
    fn default() -> Self {
        LocationPolicy::Filter {
            match_mode: LocationMatch::Substring,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationMatch {
    #[default]
    Substring,
    /// Edit distance is capped at 2, the maximum Lucene supports.
    Fuzzy { max_edits: u8 },
}

/// Field names, weights and policies the compiler applies to every intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Dimensionality of every embedding field in the store.
    pub dimension: usize,
    pub primary_field: String,
    /// Must exceed every secondary boost.
    pub primary_boost: f32,
    pub primary_top_k: usize,
    /// Field holding the document identifier; always fetched.
    pub id_field: String,
    pub location_policy: LocationPolicy,
    pub location_delimiter: char,
    /// Settlement tokens with fewer characters are dropped.
    pub min_settlement_len: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            primary_field: "work_experience_job_titles_embedding".into(),
            primary_boost: 4.0,
            primary_top_k: 50,
            id_field: "document_id".into(),
            location_policy: LocationPolicy::default(),
            location_delimiter: ',',
            min_settlement_len: 2,
        }
    }
}

impl CompilerConfig {
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.dimension == 0 {
            return Err(CompileError::InvalidConfig(
                "dimension must be greater than zero".into(),
            ));
        }
        if !is_valid_field_name(&self.primary_field) {
            return Err(CompileError::InvalidConfig(format!(
                "primary_field '{}' is not a valid field name",
                self.primary_field
            )));
        }
        if !is_valid_field_name(&self.id_field) {
            return Err(CompileError::InvalidConfig(format!(
                "id_field '{}' is not a valid field name",
                self.id_field
            )));
        }
        if !(self.primary_boost.is_finite() && self.primary_boost > 0.0) {
            return Err(CompileError::InvalidConfig(
                "primary_boost must be a positive number".into(),
            ));
        }
        if self.primary_top_k == 0 {
            return Err(CompileError::InvalidConfig(
                "primary_top_k must be greater than zero".into(),
            ));
        }
        match &self.location_policy {
            LocationPolicy::Filter {
                match_mode: LocationMatch::Fuzzy { max_edits },
            } if *max_edits > 2 => {
                return Err(CompileError::InvalidConfig(
                    "fuzzy max_edits must be between 0 and 2".into(),
                ));
            }
            LocationPolicy::Boost {
                field,
                boost,
                top_k,
            } => {
                if !is_valid_field_name(field) {
                    return Err(CompileError::InvalidConfig(format!(
                        "location boost field '{field}' is not a valid field name"
                    )));
                }
                if !(boost.is_finite() && *boost > 0.0 && *boost < self.primary_boost) {
                    return Err(CompileError::InvalidConfig(
                        "location boost must be positive and below primary_boost".into(),
                    ));
                }
                if *top_k == 0 {
                    return Err(CompileError::InvalidConfig(
                        "location top_k must be greater than zero".into(),
                    ));
                }
            }
            LocationPolicy::Filter { .. } => {}
        }
        Ok(())
    }
}

/// Store field names are restricted to `[A-Za-z0-9_.]+`.
pub fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Turns a [`SearchIntent`] into a [`CompiledQuery`].
///
/// `compile` is pure: no I/O, no clock, and equal inputs give equal outputs.
/// It is also the only place intents are validated, so nothing reaches the
/// store unless it passed here.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    cfg: CompilerConfig,
}

impl QueryCompiler {
    pub fn new(cfg: CompilerConfig) -> Result<Self, CompileError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.cfg
    }

    pub fn compile(&self, intent: &SearchIntent) -> Result<CompiledQuery, CompileError> {
        let cfg = &self.cfg;

        if intent.primary_vector.is_empty() {
            return Err(CompileError::InvalidIntent(
                "primary_vector is missing or empty".into(),
            ));
        }
        self.check_vector(&cfg.primary_field, &intent.primary_vector)?;
        if intent.page_size == 0 {
            return Err(CompileError::InvalidIntent(
                "page_size must be greater than zero".into(),
            ));
        }
        if intent.result_fields.is_empty() {
            return Err(CompileError::InvalidIntent(
                "result_fields must not be empty".into(),
            ));
        }
        for field in &intent.result_fields {
            check_field_name(field)?;
        }

        let mut terms = Vec::with_capacity(1 + intent.secondary_vectors.len());
        terms.push(SimilarityTerm {
            field: cfg.primary_field.clone(),
            vector: intent.primary_vector.clone(),
            top_k: cfg.primary_top_k,
            boost: cfg.primary_boost,
        });

        for secondary in &intent.secondary_vectors {
            check_field_name(&secondary.field)?;
            if secondary.vector.is_empty() {
                debug!(field = %secondary.field, "secondary_vector_empty_skipped");
                continue;
            }
            self.check_vector(&secondary.field, &secondary.vector)?;
            if !(secondary.boost.is_finite()
                && secondary.boost > 0.0
                && secondary.boost < cfg.primary_boost)
            {
                return Err(CompileError::InvalidIntent(format!(
                    "boost {} for '{}' must be positive and below the primary boost {}",
                    secondary.boost, secondary.field, cfg.primary_boost
                )));
            }
            if secondary.top_k == 0 {
                return Err(CompileError::InvalidIntent(format!(
                    "top_k for '{}' must be greater than zero",
                    secondary.field
                )));
            }
            terms.push(SimilarityTerm {
                field: secondary.field.clone(),
                vector: secondary.vector.clone(),
                top_k: secondary.top_k,
                boost: secondary.boost,
            });
        }

        let mut filters = Vec::with_capacity(intent.text_filters.len() + 1);
        for filter in &intent.text_filters {
            check_field_name(&filter.field)?;
            match &filter.constraint {
                TextConstraint::Exact(value) => {
                    let value = value.trim().to_lowercase();
                    if value.is_empty() {
                        debug!(field = %filter.field, "blank_equality_filter_skipped");
                        continue;
                    }
                    filters.push(FilterPredicate::Exact {
                        field: filter.field.clone(),
                        value,
                    });
                }
                TextConstraint::Location(raw) => {
                    if let Some(predicate) = self.location_filter(&filter.field, raw) {
                        filters.push(predicate);
                    }
                }
            }
        }

        if let Some(threshold) = intent.score_threshold {
            if !threshold.is_finite() {
                return Err(CompileError::InvalidIntent(
                    "score_threshold must be a finite number".into(),
                ));
            }
            filters.push(FilterPredicate::ScoreAbove { threshold });
        }

        Ok(CompiledQuery::new(
            terms,
            filters,
            intent.result_fields.clone(),
            cfg.id_field.clone(),
            intent.page_size,
        ))
    }

    fn location_filter(&self, field: &str, raw: &str) -> Option<FilterPredicate> {
        let match_mode = match &self.cfg.location_policy {
            LocationPolicy::Filter { match_mode } => *match_mode,
            LocationPolicy::Boost { .. } => {
                debug!(field, "location_filter_ignored_under_boost_policy");
                return None;
            }
        };

        let parsed = parse_location(raw, self.cfg.location_delimiter, self.cfg.min_settlement_len);
        if parsed.is_empty() {
            debug!(field, "location_has_no_usable_tokens");
            return None;
        }

        let matches = parsed
            .settlements
            .into_iter()
            .map(|token| match match_mode {
                LocationMatch::Substring => TextMatch::Substring { token },
                LocationMatch::Fuzzy { max_edits } => TextMatch::Fuzzy { token, max_edits },
            })
            .collect();
        Some(FilterPredicate::AnyOf {
            field: field.to_string(),
            matches,
        })
    }

    fn check_vector(&self, field: &str, vector: &EmbeddingVector) -> Result<(), CompileError> {
        if vector.dim() != self.cfg.dimension {
            return Err(CompileError::DimensionMismatch {
                field: field.to_string(),
                expected: self.cfg.dimension,
                actual: vector.dim(),
            });
        }
        if vector.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(CompileError::InvalidIntent(format!(
                "vector for '{field}' contains a non-finite component"
            )));
        }
        Ok(())
    }
}

fn check_field_name(field: &str) -> Result<(), CompileError> {
    if is_valid_field_name(field) {
        Ok(())
    } else {
        Err(CompileError::InvalidIntent(format!(
            "'{field}' is not a valid field name"
        )))
    }
}
