use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::path::PathBuf;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use grimoire_core::config::{expand_path, EmbeddingConfig};
use grimoire_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::mean_pool_normalize;

/// Sentence embedder over a local BERT-architecture checkpoint
/// (multilingual paraphrase MiniLM, 384 dimensions). The model directory
/// must contain `tokenizer.json`, `config.json`, and `pytorch_model.bin`.
// padding positions are masked out of attention and pooling, so the pad
// token id only needs to be a valid vocabulary index
const PAD_TOKEN_ID: u32 = 0;

pub struct CandleTextEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl CandleTextEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(&cfg.model_dir)?;
        tracing::info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;

        let config_path = model_dir.join("config.json");
        let bert_config: BertConfig =
            serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = BertModel::load(vb, &bert_config)?;
        tracing::info!(dim = cfg.dimension, "embedding model ready");

        Ok(Self { model, tokenizer, device, dim: cfg.dimension, max_len: cfg.max_len })
    }

    fn encode_padded(&self, text: &str) -> Result<(Tensor, Tensor)> {
        let enc = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("tokenization failed: {e}"))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        if ids.len() > self.max_len {
            ids.truncate(self.max_len);
            mask.truncate(self.max_len);
        }
        if ids.len() < self.max_len {
            let pad = self.max_len - ids.len();
            ids.extend(std::iter::repeat(PAD_TOKEN_ID).take(pad));
            mask.extend(std::iter::repeat(0).take(pad));
        }
        let input_ids = Tensor::from_iter(ids, &self.device)?.reshape((1, self.max_len))?;
        let attention_mask = Tensor::from_iter(mask, &self.device)?.reshape((1, self.max_len))?;
        Ok((input_ids, attention_mask))
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) = self.encode_padded(text)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = mean_pool_normalize(&hidden, &attention_mask)?;
        let out = pooled.squeeze(0)?.to_vec1::<f32>()?;
        if out.len() != self.dim {
            bail!("embedding dim mismatch: got {}, expected {}", out.len(), self.dim);
        }
        Ok(out)
    }
}

impl Embedder for CandleTextEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

fn resolve_model_dir(configured: &str) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            return Ok(p);
        }
    }
    let p = expand_path(configured);
    if p.exists() {
        return Ok(p);
    }
    Err(anyhow!("could not locate embedding model directory at {}", p.display()))
}
