use serde::{Deserialize, Serialize};

/// Deployment-wide embedding dimensionality (`text-embedding-3-large` truncated to 1024).
pub const DEFAULT_DIMENSION: usize = 1024;

/// A fixed-length embedding produced by a [`VectorEncoder`](crate::VectorEncoder).
///
/// The all-zero vector is the fail-closed sentinel returned for blank input or a
/// provider failure. It is still a valid vector: nothing downstream drops it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// The zero-vector sentinel of the given dimensionality.
    pub fn zeros(dim: usize) -> Self {
        Self(vec![0.0; dim])
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True for a non-empty vector whose components are all zero.
    pub fn is_zero(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|v| *v == 0.0)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
