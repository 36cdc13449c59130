//! REST server startup: state construction and the listener loop

use anyhow::{anyhow, Result};
use axum::serve;
use bentley::journal::{Journal, ServiceLog};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{EncoderBackend, ServerConfig, StoreBackend};
use crate::server::models::facility::load_corpus;
use crate::server::routing::create_router;
use crate::server::services::{
  embeddings::{Encoder, HashingEncoder, OpenAiEncoder},
  generation::{ChatSettings, DisabledGenerator, Generator, OpenAiChatGenerator},
  observer::{ExperimentObserver, JournalObserver, NullObserver},
  retrieval::RetrievalService,
  store::{DocumentStore, JsonlStore, MemoryStore},
};
use crate::server::state::{AppState, SharedState};
use crate::server::types::Capabilities;

pub const SERVICE_LOG_FILE: &str = "service.logs.jsonl";
const COMPONENT: &str = "carefinder-server";

/// Build the shared state: store, seed corpus, index, generator, observer
pub async fn build_state(config: &ServerConfig) -> Result<SharedState> {
  let data_dir = config.resolved_data_dir()?;
  std::fs::create_dir_all(&data_dir)?;

  let logs = ServiceLog::new(data_dir.join(SERVICE_LOG_FILE))?;

  let store: Arc<dyn DocumentStore> = match config.store {
    StoreBackend::Memory => Arc::new(MemoryStore::new()),
    StoreBackend::Jsonl => Arc::new(JsonlStore::open(&data_dir).await?),
  };

  if let Some(corpus) = &config.corpus {
    seed_corpus(store.as_ref(), corpus, &logs).await?;
  }

  let encoder = build_encoder(config).await?;
  let facilities = store.facilities().await?;
  logs.info(&format!("Embedding {} facilities with the {} encoder", facilities.len(), encoder.name()), COMPONENT).await;

  let retrieval = match RetrievalService::build(encoder.clone(), &facilities).await {
    Ok(retrieval) => retrieval,
    Err(e) => {
      logs.error(&format!("Index build failed, retrieval disabled: {}", e), COMPONENT).await;
      RetrievalService::unbuilt(encoder.clone())
    }
  };

  let generator: Arc<dyn Generator> = match config.api_key() {
    Some(api_key) => Arc::new(OpenAiChatGenerator::new(ChatSettings {
      base_url: config.llm_base_url.clone(),
      api_key: api_key.to_string(),
      model: config.llm_model.clone(),
      temperature: 0.2,
      max_tokens: 1024,
      timeout: config.llm_timeout(),
    })?),
    None => {
      logs.warn("No LLM API key configured; chat will answer with fallback summaries", COMPONENT).await;
      Arc::new(DisabledGenerator)
    }
  };

  let observer: Arc<dyn ExperimentObserver> = if config.no_tracking {
    Arc::new(NullObserver)
  } else {
    Arc::new(JournalObserver::spawn(Journal::open(data_dir.join(JournalObserver::FILE_NAME))?))
  };

  let capabilities = Capabilities {
    retrieval: retrieval.is_ready(),
    encoder: encoder.name().to_string(),
    generation: config.api_key().is_some(),
    tracking: !config.no_tracking,
    persistent_store: config.store == StoreBackend::Jsonl,
  };

  logs.success(&format!("Vector index ready with {} passages", retrieval.index_size()), COMPONENT).await;

  let state = AppState::new(store, retrieval, generator, observer, logs, capabilities)
    .with_default_top_k(config.top_k)
    .shared();
  Ok(state)
}

/// Load the seed corpus into an empty store
pub async fn seed_corpus(store: &dyn DocumentStore, corpus: &Path, logs: &ServiceLog) -> Result<usize> {
  let existing = store.facility_count().await?;
  if existing > 0 {
    logs.info(&format!("Store already holds {existing} facilities; skipping corpus seed"), COMPONENT).await;
    return Ok(0);
  }

  let facilities = load_corpus(corpus)?;
  let inserted = store.insert_facilities(facilities).await?;
  logs.success(&format!("Loaded {inserted} facilities from {}", corpus.display()), COMPONENT).await;
  Ok(inserted)
}

async fn build_encoder(config: &ServerConfig) -> Result<Arc<dyn Encoder>> {
  let encoder: Arc<dyn Encoder> = match config.encoder {
    EncoderBackend::Hashing => Arc::new(HashingEncoder::new(config.embedding_dim)?),
    EncoderBackend::Openai => {
      let api_key = config.api_key().ok_or_else(|| anyhow!("The openai encoder needs --llm-api-key"))?;
      let model = config.embedding_model.as_deref().unwrap_or(OpenAiEncoder::DEFAULT_MODEL);
      Arc::new(OpenAiEncoder::new(&config.llm_base_url, api_key, model, config.embedding_dim, config.llm_timeout())?)
    }
    EncoderBackend::Onnx => build_onnx_encoder(config).await?,
  };
  Ok(encoder)
}

#[cfg(feature = "onnx")]
async fn build_onnx_encoder(config: &ServerConfig) -> Result<Arc<dyn Encoder>> {
  use crate::server::services::onnx::{OnnxEncoder, DEFAULT_MODEL};

  let model = config.embedding_model.as_deref().unwrap_or(DEFAULT_MODEL);
  Ok(Arc::new(OnnxEncoder::load(model).await?))
}

#[cfg(not(feature = "onnx"))]
async fn build_onnx_encoder(_config: &ServerConfig) -> Result<Arc<dyn Encoder>> {
  Err(anyhow!("This build does not include the onnx encoder; rebuild with --features onnx"))
}

/// Start the REST server
pub async fn start_server(config: ServerConfig) -> Result<()> {
  let state = build_state(&config).await?;
  let logs = state.logs.clone();

  let app = create_router(state)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

  let listener = TcpListener::bind(config.bind).await?;
  logs.info(&format!("Server listening on {}", config.bind), COMPONENT).await;

  match serve(listener, app).await {
    Ok(_) => {
      logs.info("Server shutdown gracefully", COMPONENT).await;
      Ok(())
    }
    Err(e) => {
      logs.error(&format!("Server error: {}", e), COMPONENT).await;
      Err(anyhow!("Server error: {}", e))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;
  use serial_test::serial;
  use tempfile::TempDir;

  fn config(dir: &TempDir, extra: &[&str]) -> ServerConfig {
    let data_dir = dir.path().to_string_lossy().to_string();
    let mut args = vec!["carefinder_server", "--data-dir", data_dir.as_str(), "--no-tracking"];
    // Offline encoder unless a test picks one
    if !extra.contains(&"--encoder") {
      args.extend_from_slice(&["--encoder", "hashing"]);
    }
    args.extend_from_slice(extra);
    ServerConfig::parse_from(args)
  }

  #[tokio::test]
  #[serial]
  async fn test_build_state_seeds_and_indexes_corpus() -> Result<()> {
    let dir = TempDir::new()?;
    let corpus = dir.path().join("corpus.json");
    std::fs::write(&corpus, r#"[{"id":"a","name":"A","region":"Volta"},{"id":"b","name":"B","region":"Oti"}]"#)?;
    let corpus_arg = corpus.to_string_lossy().to_string();

    let state = build_state(&config(&dir, &["--store", "jsonl", "--corpus", corpus_arg.as_str()])).await?;
    assert_eq!(state.retrieval.index_size(), 2);
    assert!(state.capabilities.retrieval);
    assert!(state.capabilities.persistent_store);
    assert!(!state.capabilities.generation);
    drop(state);

    // Second start finds the records already stored
    let again = build_state(&config(&dir, &["--store", "jsonl", "--corpus", corpus_arg.as_str()])).await?;
    assert_eq!(again.store.facility_count().await?, 2);
    Ok(())
  }

  #[tokio::test]
  #[serial]
  async fn test_build_state_without_corpus_serves_unbuilt_index() -> Result<()> {
    let dir = TempDir::new()?;
    let state = build_state(&config(&dir, &["--store", "memory"])).await?;

    assert_eq!(state.retrieval.index_size(), 0);
    assert!(!state.capabilities.retrieval);
    assert!(dir.path().join(SERVICE_LOG_FILE).exists());
    Ok(())
  }

  #[cfg(not(feature = "onnx"))]
  #[tokio::test]
  #[serial]
  async fn test_onnx_encoder_requires_feature() {
    let dir = TempDir::new().unwrap();
    let result = build_state(&config(&dir, &["--store", "memory", "--encoder", "onnx"])).await;
    assert!(result.is_err());
  }
}
