use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use lexdb_core::error::EmbeddingError;
use lexdb_core::traits::{require_query_text, EmbeddingProvider};

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

pub const BGE_M3_DIM: usize = 1024;
pub const BGE_M3_MAX_TOKENS: usize = 256;

/// Calls slower than this are logged.
const SLOW_EMBED_MS: u128 = 100;

/// BGE-M3 dense embeddings from local weights.
pub struct BgeM3Provider {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
}

impl BgeM3Provider {
    pub fn new() -> Result<Self> { Self::from_dir(&resolve_model_dir()?) }

    pub fn from_dir(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(model_dir = %model_dir.display(), "loading BGE-M3");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        info!(dim = BGE_M3_DIM, max_tokens = BGE_M3_MAX_TOKENS, "BGE-M3 loaded");
        Ok(Self { model, tokenizer, device, max_len: BGE_M3_MAX_TOKENS })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = Tensor::zeros((1, self.max_len), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        let elapsed = start.elapsed().as_millis();
        if elapsed > SLOW_EMBED_MS {
            warn!(elapsed_ms = elapsed as u64, chars = text.len(), "slow embedding");
        }
        Ok(emb)
    }

    fn checked(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let v = self.embed_one(text).map_err(|e| EmbeddingError::Model(e.to_string()))?;
        if v.len() != BGE_M3_DIM {
            return Err(EmbeddingError::DimensionMismatch { expected: BGE_M3_DIM, actual: v.len() });
        }
        Ok(v)
    }
}

impl EmbeddingProvider for BgeM3Provider {
    fn dim(&self) -> usize { BGE_M3_DIM }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() { return Ok(Vec::new()); }
        debug!(batch = texts.len(), "embedding documents");
        texts.iter().map(|t| self.checked(t)).collect()
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let text = require_query_text(text)?;
        self.checked(text)
    }
}

/// `APP_MODEL_DIR`, then `MODEL_DIR`, then the conventional checkout paths.
pub fn resolve_model_dir() -> Result<PathBuf> {
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { return Ok(p); }
            warn!(var, dir = %p.display(), "model dir from env does not exist");
        }
    }
    for candidate in ["../models/bge-m3", "models/bge-m3"] {
        let p = Path::new(candidate);
        if p.exists() { return Ok(p.to_path_buf()); }
    }
    Err(anyhow!("Could not locate BGE-M3 model directory"))
}
