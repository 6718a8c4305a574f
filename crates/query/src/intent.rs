use encoder::EmbeddingVector;
use serde::{Deserialize, Serialize};

/// Fields returned when the caller does not ask for specific ones.
pub const DEFAULT_RESULT_FIELDS: &[&str] = &[
    "document_id",
    "work_experience_job_titles",
    "skills",
    "contact_information_address",
    "work_experience_descriptions",
    "work_experience_seniority",
    "score",
];

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// What the caller is looking for, before it is turned into a store query.
///
/// Secondary vectors and text filters are ordered lists: compiled terms and
/// filters come out in the same order they went in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIntent {
    /// Dominant signal, e.g. the job-title embedding.
    pub primary_vector: EmbeddingVector,
    #[serde(default)]
    pub secondary_vectors: Vec<SecondaryVector>,
    #[serde(default)]
    pub text_filters: Vec<TextFilter>,
    #[serde(default = "default_result_fields")]
    pub result_fields: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Documents scoring at or below this value are excluded.
    #[serde(default)]
    pub score_threshold: Option<f32>,
}

fn default_result_fields() -> Vec<String> {
    DEFAULT_RESULT_FIELDS.iter().map(|f| f.to_string()).collect()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// An additional similarity signal with its own weight and candidate budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryVector {
    pub field: String,
    pub vector: EmbeddingVector,
    pub boost: f32,
    pub top_k: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFilter {
    pub field: String,
    pub constraint: TextConstraint,
}

/// How a text filter value is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextConstraint {
    /// Case-insensitive equality, e.g. seniority.
    Exact(String),
    /// Free-text `"settlement, ..., region"` address.
    Location(String),
}

impl SearchIntent {
    pub fn new(primary_vector: impl Into<EmbeddingVector>) -> Self {
        Self {
            primary_vector: primary_vector.into(),
            secondary_vectors: Vec::new(),
            text_filters: Vec::new(),
            result_fields: default_result_fields(),
            page_size: DEFAULT_PAGE_SIZE,
            score_threshold: None,
        }
    }

    pub fn with_secondary(
        mut self,
        field: impl Into<String>,
        vector: impl Into<EmbeddingVector>,
        boost: f32,
        top_k: usize,
    ) -> Self {
        self.secondary_vectors.push(SecondaryVector {
            field: field.into(),
            vector: vector.into(),
            boost,
            top_k,
        });
        self
    }

    pub fn with_exact_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.text_filters.push(TextFilter {
            field: field.into(),
            constraint: TextConstraint::Exact(value.into()),
        });
        self
    }

    pub fn with_location_filter(
        mut self,
        field: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        self.text_filters.push(TextFilter {
            field: field.into(),
            constraint: TextConstraint::Location(location.into()),
        });
        self
    }

    pub fn with_result_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.result_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }
}
