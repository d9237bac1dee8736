//! Embedding providers
//!
//! The pipeline treats the embedding model as an opaque `text -> vector`
//! function behind [`EmbeddingProvider`]. The default provider is Harmonic
//! Token Projection (HTP), a deterministic, training-free method:
//! "Harmonic Token Projection: A Vocabulary-Free, Training-Free,
//!  Deterministic, and Reversible Embedding Methodology"
//! https://arxiv.org/html/2511.20665
//!
//! HTP needs no model file, so it is always available. With the `fastembed`
//! feature, `intfloat/multilingual-e5-small` can be used instead.

use std::f64::consts::PI;
use std::sync::Arc;

use thiserror::Error;

/// HTP output dimension (2 per modulus); same width as multilingual-e5-small
pub const EMBEDDING_DIM: usize = 384;

/// Model identifier of the built-in provider
pub const HTP_MODEL_NAME: &str = "htp";

/// Maximum token length (Unicode code points)
const MAX_TOKEN_LENGTH: usize = 64;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Model could not be loaded or run
    #[error("Model error: {0}")]
    Model(String),

    /// Model identifier not available in this build
    #[error("Unsupported embedding model: {0}")]
    Unsupported(String),
}

pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Text to fixed-dimension dense vector.
///
/// Implementations must be deterministic for a given model version and
/// safe to share across threads.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Fixed at construction
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Construct the provider for a configured model identifier
pub fn provider_for(model: &str) -> EmbeddingResult<Arc<dyn EmbeddingProvider>> {
    match model {
        HTP_MODEL_NAME => Ok(Arc::new(HtpEmbedding::new())),
        #[cfg(feature = "fastembed")]
        other => Ok(Arc::new(super::neural::FastEmbedProvider::new(other)?)),
        #[cfg(not(feature = "fastembed"))]
        other => Err(EmbeddingError::Unsupported(format!(
            "{} (rebuild with the `fastembed` feature)",
            other
        ))),
    }
}

/// Harmonic Token Projection embedder
#[derive(Debug, Clone)]
pub struct HtpEmbedding {
    moduli: Vec<u64>,
}

impl HtpEmbedding {
    pub fn new() -> Self {
        Self {
            moduli: first_primes(EMBEDDING_DIM / 2),
        }
    }

    /// Tokenize, project each token, mean-pool, then L2 normalize.
    fn project(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return vec![0.0; EMBEDDING_DIM];
        }

        let mut pooled = vec![0.0f64; EMBEDDING_DIM];
        for token in &tokens {
            let n = token_to_integer(token);
            for (i, &m) in self.moduli.iter().enumerate() {
                let theta = 2.0 * PI * ((n % m) as f64) / (m as f64);
                pooled[2 * i] += theta.sin();
                pooled[2 * i + 1] += theta.cos();
            }
        }

        let count = tokens.len() as f64;
        pooled.iter_mut().for_each(|v| *v /= count);

        let norm = pooled.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            pooled.iter().map(|x| (x / norm) as f32).collect()
        } else {
            pooled.iter().map(|x| *x as f32).collect()
        }
    }
}

impl Default for HtpEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for HtpEmbedding {
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        Ok(self.project(text))
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn model_name(&self) -> &str {
        HTP_MODEL_NAME
    }
}

/// First `n` primes; pairwise coprime moduli for the projection
fn first_primes(n: usize) -> Vec<u64> {
    let mut primes: Vec<u64> = Vec::with_capacity(n);
    let mut candidate = 2u64;
    while primes.len() < n {
        if primes
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

/// Base-2^16 integer of the token's code points (wrapping)
fn token_to_integer(token: &str) -> u64 {
    token
        .chars()
        .take(MAX_TOKEN_LENGTH)
        .fold(0u64, |n, c| n.wrapping_mul(65536).wrapping_add(c as u64))
}

/// Lowercased words split on whitespace and ASCII punctuation
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}
