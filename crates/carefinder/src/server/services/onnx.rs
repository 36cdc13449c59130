//! Local sentence-transformer encoder running an ONNX export through `ort`

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use hf_hub::api::tokio::Api;
use ndarray::Array2;
use ort::{
  execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch},
  session::Session,
  value::Value,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;

use super::embeddings::{normalize_embedding, Encoder};

pub const DEFAULT_MODEL: &str = "Xenova/all-MiniLM-L6-v2";
const TOKENIZER_FILE: &str = "tokenizer.json";
const MODEL_FILE: &str = "onnx/model.onnx";
const MAX_SEQUENCE_LENGTH: usize = 256;

pub struct OnnxEncoder {
  model_name: String,
  model: Arc<Model>,
  dimensions: usize,
}

/// Session and tokenizer, shared with blocking inference tasks
struct Model {
  session: Mutex<Session>,
  tokenizer: Tokenizer,
}

struct ModelFiles {
  tokenizer_file: PathBuf,
  model_path: PathBuf,
}

// Model initialization
#[cfg(not(tarpaulin_include))]
impl OnnxEncoder {
  /// Download (or reuse the cached copy of) the model and measure its output width
  pub async fn load(model_name: &str) -> Result<Self> {
    bentley::info!("loading embedding model {model_name}...");

    let files = Self::download_model(model_name).await?;
    let tokenizer =
      Tokenizer::from_file(&files.tokenizer_file).map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
    let session = Self::load_session(files.model_path)?;

    let model = Arc::new(Model { session: Mutex::new(session), tokenizer });
    let warmup = model.clone();
    let dimensions = run_blocking(move || warmup.embed("dimension check")).await?.len();

    bentley::success!("embedding model ready ({} dimensions)", dimensions);
    Ok(Self { model_name: model_name.to_string(), model, dimensions })
  }

  async fn download_model(model_name: &str) -> Result<ModelFiles> {
    let api = Api::new().map_err(|e| anyhow!("HF API initialization failed: {}", e))?;
    let repo = api.model(model_name.to_string());

    let tokenizer_file =
      repo.get(TOKENIZER_FILE).await.map_err(|e| anyhow!("Failed to download tokenizer: {}", e))?;
    let model_path =
      repo.get(MODEL_FILE).await.map_err(|e| anyhow!("Failed to download ONNX model: {}", e))?;

    Ok(ModelFiles { tokenizer_file, model_path })
  }

  fn load_session(model_path: PathBuf) -> Result<Session> {
    let providers: Vec<ExecutionProviderDispatch> = vec![CPUExecutionProvider::default().into()];
    let session = Session::builder()?.with_execution_providers(providers)?.commit_from_file(model_path)?;
    Ok(session)
  }
}

// Embedding processing
impl Model {
  fn embed(&self, text: &str) -> Result<Vec<f32>> {
    let encoding = self.tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;

    let length = encoding.get_ids().len().min(MAX_SEQUENCE_LENGTH);
    let ids = &encoding.get_ids()[..length];
    let mask = &encoding.get_attention_mask()[..length];
    let type_ids = &encoding.get_type_ids()[..length];

    let mut session = self.session.lock().map_err(|_| anyhow!("Failed to lock model session"))?;

    let mut input: HashMap<String, Value> = HashMap::new();
    input.insert("input_ids".to_string(), to_tensor(ids)?);
    input.insert("attention_mask".to_string(), to_tensor(mask)?);
    if session.inputs.iter().any(|i| i.name == "token_type_ids") {
      input.insert("token_type_ids".to_string(), to_tensor(type_ids)?);
    }

    let output = session.run(input)?;
    let tensor = output
      .get("last_hidden_state")
      .or_else(|| output.get("0"))
      .ok_or_else(|| anyhow!("No output found from model - expected 'last_hidden_state' or '0'"))?;
    let (shape, data) = tensor.try_extract_tensor::<f32>()?;

    let pooled = mean_pool(shape.as_ref(), data)?;
    Ok(normalize_embedding(pooled))
  }
}

/// Run CPU-bound inference off the async workers; safe on any runtime flavor
async fn run_blocking<T, F>(work: F) -> Result<T>
where
  T: Send + 'static,
  F: FnOnce() -> Result<T> + Send + 'static,
{
  tokio::task::spawn_blocking(work).await.map_err(|e| anyhow!("Embedding task failed: {}", e))?
}

fn to_tensor(values: &[u32]) -> Result<Value> {
  let ids: Vec<i64> = values.iter().map(|&v| i64::from(v)).collect();
  let array: Array2<i64> = Array2::from_shape_vec((1, ids.len()), ids)?;
  let tensor: Value = Value::from_array(array)?.into();
  Ok(tensor)
}

/// Mean pooling over the sequence dimension of a `[1, seq, hidden]` tensor
pub fn mean_pool(shape: &[i64], data: &[f32]) -> Result<Vec<f32>> {
  if shape.len() != 3 {
    return Err(anyhow!("Expected a rank-3 hidden state, got shape {:?}", shape));
  }

  let seq_length = shape[1] as usize;
  let hidden_size = shape[2] as usize;
  if seq_length == 0 {
    return Err(anyhow!("Cannot pool an empty sequence"));
  }

  let mut pooled = vec![0.0f32; hidden_size];
  for token in data.chunks(hidden_size).take(seq_length) {
    for (acc, value) in pooled.iter_mut().zip(token) {
      *acc += value;
    }
  }
  for value in pooled.iter_mut() {
    *value /= seq_length as f32;
  }

  Ok(pooled)
}

#[async_trait]
impl Encoder for OnnxEncoder {
  fn name(&self) -> &str {
    &self.model_name
  }

  fn dimensions(&self) -> usize {
    self.dimensions
  }

  async fn encode(&self, text: &str) -> Result<Vec<f32>> {
    let model = self.model.clone();
    let text = text.to_string();
    run_blocking(move || model.embed(&text)).await
  }

  async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let model = self.model.clone();
    let texts = texts.to_vec();
    run_blocking(move || texts.iter().map(|text| model.embed(text)).collect()).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_mean_pool_averages_tokens() -> Result<()> {
    let pooled = mean_pool(&[1, 2, 3], &[1.0, 2.0, 3.0, 3.0, 4.0, 5.0])?;
    assert_eq!(pooled, vec![2.0, 3.0, 4.0]);
    Ok(())
  }

  #[test]
  fn test_mean_pool_rejects_bad_shapes() {
    assert!(mean_pool(&[2, 3], &[0.0; 6]).is_err());
    assert!(mean_pool(&[1, 0, 3], &[]).is_err());
  }

  // tokio::test defaults to a current-thread runtime
  #[tokio::test]
  async fn test_run_blocking_works_on_current_thread_runtime() -> Result<()> {
    let shared = Arc::new(vec![1.0f32, 2.0]);
    let worker = shared.clone();
    let doubled = run_blocking(move || Ok(worker.iter().map(|v| v * 2.0).collect::<Vec<_>>())).await?;
    assert_eq!(doubled, vec![2.0, 4.0]);

    let failed: Result<()> = run_blocking(|| Err(anyhow!("inference failed"))).await;
    assert_eq!(failed.unwrap_err().to_string(), "inference failed");
    Ok(())
  }
}
