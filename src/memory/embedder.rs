//! Text embedding engines for the semantic index
//!
//! The index only depends on the `Embedder` trait. `HashingEmbedder` is the
//! built-in local engine: it hashes word tokens and character trigrams into a
//! fixed number of buckets with SHA-256, so the same text produces the same
//! vector in every process and every build. Vectors are L2-normalized; empty
//! text embeds to the zero vector.

use sha2::{Digest, Sha256};

const TOKEN_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Embedding engine interface
pub trait Embedder: Send + Sync {
    /// Embed a text into a vector of `dimension()` components
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Number of components per vector
    fn dimension(&self) -> usize;

    /// Human-readable engine name (used in logs)
    fn name(&self) -> &str;
}

/// Deterministic feature-hashing embedder
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create an embedder with the given number of buckets (minimum 1)
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, feature: &str) -> usize {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(bytes) % self.dimension as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            vector[self.bucket(&format!("w:{token}"))] += TOKEN_WEIGHT;

            let padded: Vec<char> = format!(" {token} ").chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                vector[self.bucket(&format!("t:{trigram}"))] += TRIGRAM_WEIGHT;
            }
        }

        normalize(&mut vector);
        vector
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

/// Lowercased alphanumeric tokens
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Cosine distance (`1 - cosine similarity`, range 0..2).
///
/// Mismatched lengths or zero vectors have no defined angle and are treated
/// as unrelated (distance 1).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_is_deterministic() {
        let embedder = HashingEmbedder::default();
        assert_eq!(
            embedder.embed("Remember to deploy on Friday"),
            embedder.embed("Remember to deploy on Friday")
        );
    }

    #[test]
    fn test_embedding_is_normalized() {
        let embedder = HashingEmbedder::new(64);
        let v = embedder.embed("some text to embed");
        assert_eq!(v.len(), 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16);
        let v = embedder.embed("  ,. ");
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(cosine_distance(&v, &embedder.embed("anything")), 1.0);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let embedder = HashingEmbedder::default();
        let d = cosine_distance(&embedder.embed("Deploy, Friday!"), &embedder.embed("deploy friday"));
        assert!(d.abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashingEmbedder::default();
        let doc = embedder.embed("Remember to deploy on Friday");
        let related = cosine_distance(&embedder.embed("deploy"), &doc);
        let unrelated = cosine_distance(&embedder.embed("pasta recipe"), &doc);
        assert!(related < unrelated);
        assert!(related < 1.0);
    }

    #[test]
    fn test_cosine_distance_edges() {
        assert_eq!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_distance(&[1.0, 0.0], &[0.0, 1.0]), 1.0);
        assert_eq!(cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]), 2.0);
        assert_eq!(cosine_distance(&[1.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_distance(&[], &[]), 1.0);
    }
}
