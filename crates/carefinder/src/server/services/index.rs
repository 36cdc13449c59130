//! Exact inner-product vector index over the embedded facility corpus
//!
//! Rows of the embedding matrix, the passage texts and the facility ids are
//! parallel: position `i` in each refers to the same facility. The index is
//! built once and never mutated.

use anyhow::{anyhow, Result};
use ndarray::{Array2, ArrayView1};

/// A search hit: position in the index and its inner-product score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
  pub position: usize,
  pub score: f32,
}

pub struct FlatIndex {
  facility_ids: Vec<String>,
  passages: Vec<String>,
  embeddings: Array2<f32>,
}

impl FlatIndex {
  /// Build from parallel vectors; every embedding must have the same length
  pub fn build(facility_ids: Vec<String>, passages: Vec<String>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
    if facility_ids.len() != passages.len() || passages.len() != embeddings.len() {
      return Err(anyhow!(
        "Index inputs are not parallel: {} ids, {} passages, {} embeddings",
        facility_ids.len(),
        passages.len(),
        embeddings.len()
      ));
    }

    let rows = embeddings.len();
    let dimensions = embeddings.first().map(Vec::len).unwrap_or(0);

    if let Some((position, bad)) = embeddings.iter().enumerate().find(|(_, e)| e.len() != dimensions) {
      return Err(anyhow!(
        "Embedding {} for facility '{}' has {} dimensions, expected {}",
        position,
        facility_ids[position],
        bad.len(),
        dimensions
      ));
    }

    let flat: Vec<f32> = embeddings.into_iter().flatten().collect();
    let embeddings = Array2::from_shape_vec((rows, dimensions), flat)?;

    Ok(Self { facility_ids, passages, embeddings })
  }

  pub fn len(&self) -> usize {
    self.facility_ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.facility_ids.is_empty()
  }

  pub fn dimensions(&self) -> usize {
    self.embeddings.ncols()
  }

  pub fn facility_id(&self, position: usize) -> Option<&str> {
    self.facility_ids.get(position).map(String::as_str)
  }

  pub fn passage(&self, position: usize) -> Option<&str> {
    self.passages.get(position).map(String::as_str)
  }

  /// Top `k` rows by inner product with `query`, best first; ties keep index order
  pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>> {
    if self.is_empty() || k == 0 {
      return Ok(Vec::new());
    }
    if query.len() != self.dimensions() {
      return Err(anyhow!(
        "Query has {} dimensions but the index holds {}-dimensional vectors",
        query.len(),
        self.dimensions()
      ));
    }

    let scores = self.embeddings.dot(&ArrayView1::from(query));

    let mut hits: Vec<IndexHit> =
      scores.iter().enumerate().map(|(position, &score)| IndexHit { position, score }).collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(k);

    Ok(hits)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn index() -> FlatIndex {
    FlatIndex::build(
      vec!["a".into(), "b".into(), "c".into()],
      vec!["pa".into(), "pb".into(), "pc".into()],
      vec![vec![1.0, 0.0], vec![0.6, 0.8], vec![-1.0, 0.0]],
    )
    .unwrap()
  }

  #[test]
  fn test_search_orders_by_inner_product() -> Result<()> {
    let hits = index().search(&[1.0, 0.0], 3)?;
    let positions: Vec<_> = hits.iter().map(|h| h.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!((hits[1].score - 0.6).abs() < 1e-6);
    assert!((hits[2].score + 1.0).abs() < 1e-6);
    Ok(())
  }

  #[test]
  fn test_search_truncates_to_k() -> Result<()> {
    assert_eq!(index().search(&[0.0, 1.0], 1)?.len(), 1);
    assert!(index().search(&[0.0, 1.0], 0)?.is_empty());
    Ok(())
  }

  #[test]
  fn test_search_rejects_dimension_mismatch() {
    assert!(index().search(&[1.0, 0.0, 0.0], 2).is_err());
  }

  #[test]
  fn test_parallel_accessors() {
    let index = index();
    assert_eq!(index.len(), 3);
    assert_eq!(index.dimensions(), 2);
    assert_eq!(index.facility_id(1), Some("b"));
    assert_eq!(index.passage(2), Some("pc"));
    assert_eq!(index.passage(3), None);
  }

  #[test]
  fn test_build_rejects_ragged_inputs() {
    assert!(FlatIndex::build(vec!["a".into()], vec![], vec![vec![1.0]]).is_err());
    assert!(FlatIndex::build(
      vec!["a".into(), "b".into()],
      vec!["p".into(), "q".into()],
      vec![vec![1.0, 0.0], vec![1.0]]
    )
    .is_err());
  }

  #[test]
  fn test_empty_index_searches_to_nothing() -> Result<()> {
    let empty = FlatIndex::build(vec![], vec![], vec![])?;
    assert!(empty.is_empty());
    assert!(empty.search(&[1.0], 3)?.is_empty());
    Ok(())
  }
}
