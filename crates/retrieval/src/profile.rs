//! Building a [`SearchIntent`] from a plain-text job profile.

use encoder::{EmbeddingVector, VectorEncoder};
use query::{CompileError, LocationPolicy, SearchIntent, DEFAULT_PAGE_SIZE, DEFAULT_RESULT_FIELDS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A job posting as scraped: free text per section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobProfile {
    pub title: String,
    pub skills: String,
    pub description: String,
    /// `"settlement, ..., region"`.
    pub location: String,
    pub seniority: String,
}

/// Which store fields each profile section targets, and how much it weighs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileWeights {
    pub skills_field: String,
    pub skills_boost: f32,
    pub skills_top_k: usize,
    pub description_field: String,
    pub description_boost: f32,
    pub description_top_k: usize,
    pub location_field: String,
    pub seniority_field: String,
    pub result_fields: Vec<String>,
    pub page_size: usize,
    pub score_threshold: Option<f32>,
}

impl Default for ProfileWeights {
    fn default() -> Self {
        Self {
            skills_field: "skills_embedding".into(),
            skills_boost: 3.0,
            skills_top_k: 50,
            description_field: "work_experience_descriptions_embedding".into(),
            description_boost: 2.0,
            description_top_k: 30,
            location_field: "contact_information_address".into(),
            seniority_field: "work_experience_seniority".into(),
            result_fields: DEFAULT_RESULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            page_size: DEFAULT_PAGE_SIZE,
            score_threshold: None,
        }
    }
}

/// Embeds the sections of a [`JobProfile`] and assembles the intent.
///
/// Title is the primary vector. Skills and description become secondary
/// terms, seniority an equality filter. Location is a text filter, or a
/// boosted location embedding when the compiler runs a
/// [`LocationPolicy::Boost`]. Blank sections contribute nothing.
pub struct ProfileIntentBuilder {
    encoder: Arc<dyn VectorEncoder>,
    weights: ProfileWeights,
    location_policy: LocationPolicy,
}

impl ProfileIntentBuilder {
    pub fn new(encoder: Arc<dyn VectorEncoder>, weights: ProfileWeights) -> Self {
        Self {
            encoder,
            weights,
            location_policy: LocationPolicy::default(),
        }
    }

    pub fn with_location_policy(mut self, policy: LocationPolicy) -> Self {
        self.location_policy = policy;
        self
    }

    pub fn weights(&self) -> &ProfileWeights {
        &self.weights
    }

    pub async fn build(&self, profile: &JobProfile) -> Result<SearchIntent, CompileError> {
        if profile.title.trim().is_empty() {
            return Err(CompileError::InvalidIntent(
                "job profile title is blank".into(),
            ));
        }
        let w = &self.weights;
        let location_boost = match &self.location_policy {
            LocationPolicy::Boost { field, boost, top_k } => Some((field, *boost, *top_k)),
            LocationPolicy::Filter { .. } => None,
        };

        let (title, skills, description, location) = futures::join!(
            self.encoder.embed(&profile.title),
            self.embed_optional(&profile.skills),
            self.embed_optional(&profile.description),
            async {
                match location_boost {
                    Some(_) => self.embed_optional(&profile.location).await,
                    None => None,
                }
            },
        );

        let mut intent = SearchIntent::new(title)
            .with_result_fields(w.result_fields.iter().cloned())
            .with_page_size(w.page_size);
        if let Some(threshold) = w.score_threshold {
            intent = intent.with_score_threshold(threshold);
        }
        if let Some(v) = skills {
            intent = intent.with_secondary(&w.skills_field, v, w.skills_boost, w.skills_top_k);
        }
        if let Some(v) = description {
            intent = intent.with_secondary(
                &w.description_field,
                v,
                w.description_boost,
                w.description_top_k,
            );
        }
        match (location_boost, location) {
            (Some((field, boost, top_k)), Some(v)) => {
                intent = intent.with_secondary(field, v, boost, top_k);
            }
            (None, _) if !profile.location.trim().is_empty() => {
                intent = intent.with_location_filter(&w.location_field, &profile.location);
            }
            _ => {}
        }
        if !profile.seniority.trim().is_empty() {
            intent = intent.with_exact_filter(&w.seniority_field, &profile.seniority);
        }

        debug!(
            secondary = intent.secondary_vectors.len(),
            filters = intent.text_filters.len(),
            "profile_intent_built"
        );
        Ok(intent)
    }

    async fn embed_optional(&self, text: &str) -> Option<EmbeddingVector> {
        if text.trim().is_empty() {
            None
        } else {
            Some(self.encoder.embed(text).await)
        }
    }
}
