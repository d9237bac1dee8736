//! FastEmbed-backed provider (`fastembed` feature)

use std::sync::Mutex;

use ::fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::embedding::{EmbeddingError, EmbeddingProvider, EmbeddingResult};

pub const E5_SMALL: &str = "intfloat/multilingual-e5-small";

/// ONNX sentence embedder, loaded once per process
pub struct FastEmbedProvider {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedProvider {
    pub fn new(model_name: &str) -> EmbeddingResult<Self> {
        let (model, dimension) = match model_name {
            E5_SMALL => (EmbeddingModel::MultilingualE5Small, 384),
            "intfloat/multilingual-e5-base" => (EmbeddingModel::MultilingualE5Base, 768),
            "BAAI/bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
            other => return Err(EmbeddingError::Unsupported(other.to_string())),
        };

        tracing::info!(model = model_name, "loading embedding model");
        let options = InitOptions::new(model).with_show_download_progress(false);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::Model(format!("failed to load {}: {}", model_name, e)))?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimension,
        })
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Model("no embedding generated".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::Model("embedding model lock poisoned".to_string()))?;
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        model
            .embed(owned, None)
            .map_err(|e| EmbeddingError::Model(format!("embedding failed: {}", e)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
