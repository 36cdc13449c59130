//! Retrieval service: encode → search → drop non-positive scores → top-k
//!
//! Constructed once at startup and shared read-only between requests.

use anyhow::{anyhow, Result};
use std::sync::Arc;

use super::embeddings::Encoder;
use super::index::FlatIndex;
use crate::server::models::facility::Facility;

/// One retrieval result
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
  pub facility_id: String,
  pub passage: String,
  /// Inner-product similarity in (0, 1]
  pub score: f32,
}

pub struct RetrievalService {
  encoder: Arc<dyn Encoder>,
  index: Option<FlatIndex>,
}

impl RetrievalService {
  /// Embed every facility passage and build the index
  ///
  /// An empty corpus leaves the service unbuilt.
  pub async fn build(encoder: Arc<dyn Encoder>, facilities: &[Facility]) -> Result<Self> {
    if facilities.is_empty() {
      return Ok(Self::unbuilt(encoder));
    }

    let facility_ids: Vec<String> = facilities.iter().map(|f| f.id.clone()).collect();
    let passages: Vec<String> = facilities.iter().map(Facility::passage).collect();

    let embeddings = encoder
      .encode_batch(&passages)
      .await
      .map_err(|e| anyhow!("Failed to embed facility passages: {}", e))?;

    let index = FlatIndex::build(facility_ids, passages, embeddings)?;
    Ok(Self { encoder, index: Some(index) })
  }

  /// A service with no index; every retrieval returns nothing
  pub fn unbuilt(encoder: Arc<dyn Encoder>) -> Self {
    Self { encoder, index: None }
  }

  pub fn is_ready(&self) -> bool {
    self.index.as_ref().is_some_and(|index| !index.is_empty())
  }

  pub fn index_size(&self) -> usize {
    self.index.as_ref().map_or(0, FlatIndex::len)
  }

  pub fn encoder_name(&self) -> &str {
    self.encoder.name()
  }

  /// At most `k` passages ordered by descending score, all with score > 0
  pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
    if query.trim().is_empty() {
      return Err(anyhow!("Query text must not be empty"));
    }

    let index = match &self.index {
      Some(index) if !index.is_empty() && k > 0 => index,
      _ => return Ok(Vec::new()),
    };

    let query_embedding = self.encoder.encode(query).await?;
    let hits = index.search(&query_embedding, k)?;

    let results = hits
      .into_iter()
      .filter(|hit| hit.score > 0.0)
      .filter_map(|hit| {
        Some(RetrievedPassage {
          facility_id: index.facility_id(hit.position)?.to_string(),
          passage: index.passage(hit.position)?.to_string(),
          score: hit.score.min(1.0),
        })
      })
      .collect();

    Ok(results)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::server::services::embeddings::HashingEncoder;

  fn corpus() -> Vec<Facility> {
    let mut surgical = Facility::new("f1", "Komfo Anokye Teaching Hospital", "Ashanti");
    surgical.town = "Kumasi".into();
    surgical.services = vec!["Surgery".into(), "Emergency".into()];

    let mut maternity = Facility::new("f2", "Tamale Maternity Home", "Northern");
    maternity.town = "Tamale".into();
    maternity.services = vec!["Maternity".into(), "Antenatal care".into()];

    let mut eye = Facility::new("f3", "Volta Eye Clinic", "Volta");
    eye.specialties = vec!["Ophthalmology".into()];

    vec![surgical, maternity, eye]
  }

  async fn service() -> RetrievalService {
    let encoder: Arc<dyn Encoder> = Arc::new(HashingEncoder::new(256).unwrap());
    RetrievalService::build(encoder, &corpus()).await.unwrap()
  }

  #[tokio::test]
  async fn test_retrieve_respects_k_positive_scores_and_order() -> Result<()> {
    let service = service().await;
    assert_eq!(service.index_size(), 3);

    for k in 0..5 {
      let results = service.retrieve("maternity services in Tamale", k).await?;
      assert!(results.len() <= k);
      assert!(results.iter().all(|r| r.score > 0.0 && r.score <= 1.0));
      assert!(results.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    let top = service.retrieve("maternity services in Tamale", 1).await?;
    assert_eq!(top[0].facility_id, "f2");
    Ok(())
  }

  #[tokio::test]
  async fn test_unbuilt_service_returns_empty() -> Result<()> {
    let encoder: Arc<dyn Encoder> = Arc::new(HashingEncoder::new(16)?);
    let service = RetrievalService::unbuilt(encoder.clone());
    assert!(!service.is_ready());
    assert!(service.retrieve("anything", 5).await?.is_empty());

    let empty_corpus = RetrievalService::build(encoder, &[]).await?;
    assert_eq!(empty_corpus.index_size(), 0);
    assert!(empty_corpus.retrieve("anything", 5).await?.is_empty());
    Ok(())
  }

  #[tokio::test]
  async fn test_empty_query_is_rejected() {
    let service = service().await;
    assert!(service.retrieve("   ", 5).await.is_err());
  }

  #[tokio::test]
  async fn test_passage_text_travels_with_result() -> Result<()> {
    let service = service().await;
    let results = service.retrieve("ophthalmology eye clinic", 1).await?;
    assert_eq!(results[0].facility_id, "f3");
    assert!(results[0].passage.contains("Ophthalmology"));
    Ok(())
  }
}
