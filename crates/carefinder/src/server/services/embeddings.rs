//! Text encoders producing unit-normalized embedding vectors
//!
//! All backends sit behind the [`Encoder`] trait so the retrieval service can
//! be built with a deterministic offline encoder, a remote OpenAI-compatible
//! embeddings endpoint, or (with the `onnx` feature) a local sentence model.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maps text to fixed-length, unit-normalized vectors
#[async_trait]
pub trait Encoder: Send + Sync {
  /// Backend label reported on the status endpoint
  fn name(&self) -> &str;

  /// Length of every vector this encoder returns
  fn dimensions(&self) -> usize;

  /// Encode a single text
  async fn encode(&self, text: &str) -> Result<Vec<f32>>;

  /// Encode many texts, preserving input order
  async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let mut embeddings = Vec::with_capacity(texts.len());
    for text in texts {
      embeddings.push(self.encode(text).await?);
    }
    Ok(embeddings)
  }
}

/// Normalize embedding vector to unit length for consistent similarity comparisons
pub fn normalize_embedding(mut embedding: Vec<f32>) -> Vec<f32> {
  let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

  // Avoid division by zero
  if magnitude < f32::EPSILON {
    return embedding;
  }

  for value in embedding.iter_mut() {
    *value /= magnitude;
  }

  embedding
}

// Hashing encoder
// ===============

/// Deterministic bag-of-words encoder using signed feature hashing
///
/// Tokens are lowercased alphanumeric runs; each token and each adjacent token
/// pair is hashed (FNV-1a) into a bucket with a hash-derived sign.
pub struct HashingEncoder {
  dimensions: usize,
}

impl HashingEncoder {
  pub const DEFAULT_DIMENSIONS: usize = 384;

  pub fn new(dimensions: usize) -> Result<Self> {
    if dimensions == 0 {
      return Err(anyhow!("Hashing encoder needs at least one dimension"));
    }
    Ok(Self { dimensions })
  }

  fn embed(&self, text: &str) -> Vec<f32> {
    let tokens = tokenize(text);
    let mut embedding = vec![0.0f32; self.dimensions];

    for token in &tokens {
      self.accumulate(&mut embedding, token.as_bytes(), 1.0);
    }
    for pair in tokens.windows(2) {
      let bigram = format!("{} {}", pair[0], pair[1]);
      self.accumulate(&mut embedding, bigram.as_bytes(), 0.5);
    }

    normalize_embedding(embedding)
  }

  fn accumulate(&self, embedding: &mut [f32], feature: &[u8], weight: f32) {
    let hash = fnv1a(feature);
    let bucket = (hash % self.dimensions as u64) as usize;
    let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
    embedding[bucket] += sign * weight;
  }
}

#[async_trait]
impl Encoder for HashingEncoder {
  fn name(&self) -> &str {
    "hashing"
  }

  fn dimensions(&self) -> usize {
    self.dimensions
  }

  async fn encode(&self, text: &str) -> Result<Vec<f32>> {
    Ok(self.embed(text))
  }
}

fn tokenize(text: &str) -> Vec<String> {
  text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|token| !token.is_empty())
    .map(str::to_lowercase)
    .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
  const OFFSET: u64 = 0xcbf29ce484222325;
  const PRIME: u64 = 0x100000001b3;

  bytes.iter().fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}

// OpenAI-compatible encoder
// =========================

const EMBEDDING_BATCH_SIZE: usize = 64;

/// Encoder backed by an OpenAI-compatible `/embeddings` endpoint
pub struct OpenAiEncoder {
  client: reqwest::Client,
  base_url: String,
  api_key: String,
  model: String,
  dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: &'a [String],
  dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
  index: usize,
  embedding: Vec<f32>,
}

impl OpenAiEncoder {
  pub const DEFAULT_MODEL: &'static str = "text-embedding-3-small";

  pub fn new(
    base_url: &str,
    api_key: &str,
    model: &str,
    dimensions: usize,
    timeout: Duration,
  ) -> Result<Self> {
    if api_key.trim().is_empty() {
      return Err(anyhow!("OpenAI encoder requires an API key"));
    }

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key: api_key.to_string(),
      model: model.to_string(),
      dimensions,
    })
  }

  async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let url = format!("{}/embeddings", self.base_url);
    let body = EmbeddingRequest { model: &self.model, input: texts, dimensions: self.dimensions };

    let response = self
      .client
      .post(&url)
      .bearer_auth(&self.api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| anyhow!("Embedding request failed: {}", e))?;

    if !response.status().is_success() {
      let status = response.status();
      let detail = response.text().await.unwrap_or_default();
      return Err(anyhow!("Embedding provider returned {}: {}", status, detail));
    }

    let mut parsed: EmbeddingResponse =
      response.json().await.map_err(|e| anyhow!("Failed to parse embedding response: {}", e))?;

    if parsed.data.len() != texts.len() {
      return Err(anyhow!(
        "Embedding provider returned {} vectors for {} inputs",
        parsed.data.len(),
        texts.len()
      ));
    }

    parsed.data.sort_by_key(|item| item.index);
    parsed.data.into_iter().map(|item| self.check_dimensions(item.embedding)).collect()
  }

  fn check_dimensions(&self, embedding: Vec<f32>) -> Result<Vec<f32>> {
    if embedding.len() != self.dimensions {
      return Err(anyhow!(
        "Embedding dimension mismatch: expected {}, got {}",
        self.dimensions,
        embedding.len()
      ));
    }
    Ok(normalize_embedding(embedding))
  }
}

#[async_trait]
impl Encoder for OpenAiEncoder {
  fn name(&self) -> &str {
    "openai"
  }

  fn dimensions(&self) -> usize {
    self.dimensions
  }

  async fn encode(&self, text: &str) -> Result<Vec<f32>> {
    let mut embeddings = self.request(&[text.to_string()]).await?;
    embeddings.pop().ok_or_else(|| anyhow!("Embedding provider returned no vectors"))
  }

  async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    // Chunks are requested concurrently; results come back in chunk order
    let batches = try_join_all(texts.chunks(EMBEDDING_BATCH_SIZE).map(|chunk| self.request(chunk))).await?;

    Ok(batches.into_iter().flatten().collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
  }

  #[test]
  fn test_normalize_embedding_unit_length() {
    let normalized = normalize_embedding(vec![3.0, 4.0]);
    assert!((normalized[0] - 0.6).abs() < 1e-6);
    assert!((normalized[1] - 0.8).abs() < 1e-6);
  }

  #[test]
  fn test_normalize_embedding_zero_vector_unchanged() {
    assert_eq!(normalize_embedding(vec![0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
  }

  #[test]
  fn test_tokenize_lowercases_and_splits_on_punctuation() {
    assert_eq!(tokenize("Korle-Bu Teaching, ACCRA!"), vec!["korle", "bu", "teaching", "accra"]);
    assert!(tokenize("  ...  ").is_empty());
  }

  #[tokio::test]
  async fn test_hashing_encoder_is_deterministic_and_normalized() -> Result<()> {
    let encoder = HashingEncoder::new(64)?;

    let first = encoder.encode("maternity ward in Tamale").await?;
    let second = encoder.encode("maternity ward in Tamale").await?;
    assert_eq!(first, second);
    assert_eq!(first.len(), 64);
    assert!((dot(&first, &first) - 1.0).abs() < 1e-5);
    Ok(())
  }

  #[tokio::test]
  async fn test_hashing_encoder_similar_texts_score_higher() -> Result<()> {
    let encoder = HashingEncoder::new(HashingEncoder::DEFAULT_DIMENSIONS)?;

    let query = encoder.encode("surgery theatre in Kumasi").await?;
    let related = encoder.encode("Kumasi hospital with a surgery theatre").await?;
    let unrelated = encoder.encode("community pharmacy opening hours").await?;

    assert!(dot(&query, &related) > dot(&query, &unrelated));
    Ok(())
  }

  #[tokio::test]
  async fn test_hashing_encoder_empty_text_yields_zero_vector() -> Result<()> {
    let encoder = HashingEncoder::new(8)?;
    assert_eq!(encoder.encode("").await?, vec![0.0; 8]);
    Ok(())
  }

  #[test]
  fn test_hashing_encoder_rejects_zero_dimensions() {
    assert!(HashingEncoder::new(0).is_err());
  }

  #[tokio::test]
  async fn test_default_encode_batch_preserves_order() -> Result<()> {
    let encoder = HashingEncoder::new(32)?;
    let texts = vec!["alpha".to_string(), "beta".to_string()];

    let batch = encoder.encode_batch(&texts).await?;
    assert_eq!(batch[0], encoder.encode("alpha").await?);
    assert_eq!(batch[1], encoder.encode("beta").await?);
    Ok(())
  }

  #[tokio::test]
  async fn test_openai_encode_batch_spans_chunks_in_input_order() -> Result<()> {
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    // Replies out of order, encoding each numeric input n as the direction (1, n)
    async fn embeddings(Json(body): Json<Value>) -> Json<Value> {
      let inputs = body["input"].as_array().cloned().unwrap_or_default();
      let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(index, text)| {
          let n: f32 = text.as_str().and_then(|t| t.parse().ok()).unwrap_or(0.0);
          json!({ "index": index, "embedding": [1.0, n] })
        })
        .collect();
      Json(json!({ "data": data }))
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, Router::new().route("/embeddings", post(embeddings))).await });

    let encoder = OpenAiEncoder::new(&format!("http://{addr}"), "test-key", "m", 2, Duration::from_secs(5))?;
    let texts: Vec<String> = (0..(EMBEDDING_BATCH_SIZE + 6)).map(|i| i.to_string()).collect();

    let batch = encoder.encode_batch(&texts).await?;
    assert_eq!(batch.len(), texts.len());
    for (i, embedding) in batch.iter().enumerate() {
      assert!((embedding[1] / embedding[0] - i as f32).abs() < 1e-3, "vector {i} out of order");
    }

    assert!(encoder.encode_batch(&[]).await?.is_empty());
    Ok(())
  }

  #[test]
  fn test_openai_encoder_requires_api_key() {
    let result = OpenAiEncoder::new("https://api.openai.com/v1", " ", "m", 8, Duration::from_secs(1));
    assert!(result.is_err());
  }
}
