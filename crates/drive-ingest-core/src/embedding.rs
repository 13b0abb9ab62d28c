//! Embedder trait and vector utilities.
//!
//! Concrete embedders (OpenAI, Ollama) live in the `drive-ingest` app
//! crate; the pipeline only sees [`Embedder`].

use async_trait::async_trait;

use crate::error::IngestError;

/// A service that maps texts to fixed-length vectors.
///
/// `embed` must return exactly one vector per input, in input order, each
/// of length [`dims`](Embedder::dims). Implementations handle their own
/// batching and retries.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError>;
}

/// Check a batch response against the request and the expected dimension.
pub fn validate_batch(
    vectors: &[Vec<f32>],
    requested: usize,
    dims: usize,
) -> Result<(), IngestError> {
    if vectors.len() != requested {
        return Err(IngestError::transient(
            crate::error::Service::Embedding,
            format!("expected {} embeddings, got {}", requested, vectors.len()),
        ));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(IngestError::DimensionMismatch {
            expected: dims,
            actual: bad.len(),
        });
    }
    Ok(())
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_validate_batch() {
        let ok = vec![vec![0.0; 3], vec![1.0; 3]];
        assert!(validate_batch(&ok, 2, 3).is_ok());

        let short = validate_batch(&ok, 3, 3).unwrap_err();
        assert!(matches!(short, IngestError::TransientService { .. }));

        let wrong = validate_batch(&ok, 2, 4).unwrap_err();
        assert!(matches!(
            wrong,
            IngestError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }
}
