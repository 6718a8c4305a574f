use async_trait::async_trait;
use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::{EmbeddingVector, VectorEncoder};

/// Deterministic encoder for tests, demos and offline runs.
///
/// Generates sinusoid values derived from a hash of the input text, so equal
/// text always maps to an equal vector and no network is involved.
#[derive(Debug, Clone)]
pub struct StubEncoder {
    dimension: usize,
    normalize: bool,
}

impl StubEncoder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            normalize: false,
        }
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub(crate) fn make_vector(&self, text: &str) -> EmbeddingVector {
        if text.trim().is_empty() {
            return EmbeddingVector::zeros(self.dimension);
        }
        let mut v = vec![0f32; self.dimension];
        let h = hash64(text.as_bytes());
        for (idx, value) in v.iter_mut().enumerate() {
            // Offset keeps component 0 away from sin(0) for small hashes.
            *value = (((h >> (idx % 32)) as f32) * 0.0001 + 0.5).sin();
        }
        if self.normalize {
            l2_normalize_in_place(&mut v);
        }
        EmbeddingVector::new(v)
    }
}

#[async_trait]
impl VectorEncoder for StubEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> EmbeddingVector {
        self.make_vector(text)
    }
}
