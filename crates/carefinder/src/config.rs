//! Server configuration from command-line flags and environment variables

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
  /// Volatile, lost on restart
  Memory,
  /// JSONL journals under the data directory
  Jsonl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EncoderBackend {
  /// Deterministic feature hashing, works offline
  Hashing,
  /// OpenAI-compatible embeddings endpoint
  Openai,
  /// Local ONNX sentence model (requires the `onnx` feature)
  Onnx,
}

/// Local sentence model when compiled in, feature hashing otherwise
pub const DEFAULT_ENCODER: EncoderBackend =
  if cfg!(feature = "onnx") { EncoderBackend::Onnx } else { EncoderBackend::Hashing };

#[derive(Debug, Clone, Parser)]
#[command(name = "carefinder_server")]
#[command(about = "CareFinder REST API Server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ServerConfig {
  /// Server bind address
  #[arg(long, env = "CAREFINDER_BIND", default_value = "127.0.0.1:3000")]
  pub bind: SocketAddr,

  /// Directory for journals and persisted records [default: ~/.carefinder]
  #[arg(long, env = "CAREFINDER_DATA_DIR")]
  pub data_dir: Option<PathBuf>,

  /// Facility corpus seed (.json, .yaml or .yml), loaded when the store is empty
  #[arg(long, env = "CAREFINDER_CORPUS")]
  pub corpus: Option<PathBuf>,

  /// Document store backend
  #[arg(long, value_enum, env = "CAREFINDER_STORE", default_value_t = StoreBackend::Jsonl)]
  pub store: StoreBackend,

  /// Embedding encoder backend
  #[arg(long, value_enum, env = "CAREFINDER_ENCODER", default_value_t = DEFAULT_ENCODER)]
  pub encoder: EncoderBackend,

  /// Embedding dimensions (hashing and openai encoders)
  #[arg(long, default_value_t = 384)]
  pub embedding_dim: usize,

  /// Embedding model name (openai and onnx encoders)
  #[arg(long, env = "CAREFINDER_EMBEDDING_MODEL")]
  pub embedding_model: Option<String>,

  /// Base URL of the OpenAI-compatible provider
  #[arg(long, env = "CAREFINDER_LLM_BASE_URL", default_value = "https://api.openai.com/v1")]
  pub llm_base_url: String,

  /// Provider API key; generation is disabled without one
  #[arg(long, env = "CAREFINDER_LLM_API_KEY", hide_env_values = true)]
  pub llm_api_key: Option<String>,

  /// Chat model name
  #[arg(long, env = "CAREFINDER_LLM_MODEL", default_value = "gpt-4o-mini")]
  pub llm_model: String,

  /// Provider request timeout in seconds
  #[arg(long, default_value_t = 30)]
  pub llm_timeout_secs: u64,

  /// Facility records retrieved per chat message when the request does not say
  #[arg(long, default_value_t = 5)]
  pub top_k: usize,

  /// Do not record experiment events
  #[arg(long)]
  pub no_tracking: bool,

  /// Enable verbose logging
  #[arg(short, long)]
  pub verbose: bool,
}

impl ServerConfig {
  /// Configured data directory, falling back to `~/.carefinder`
  pub fn resolved_data_dir(&self) -> Result<PathBuf> {
    match &self.data_dir {
      Some(dir) => Ok(dir.clone()),
      None => dirs::home_dir()
        .map(|home| home.join(".carefinder"))
        .ok_or_else(|| anyhow!("Could not determine home directory; pass --data-dir")),
    }
  }

  pub fn llm_timeout(&self) -> Duration {
    Duration::from_secs(self.llm_timeout_secs)
  }

  /// API key, if one is set and non-blank
  pub fn api_key(&self) -> Option<&str> {
    self.llm_api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  const ENV_VARS: [&str; 8] = [
    "CAREFINDER_BIND",
    "CAREFINDER_DATA_DIR",
    "CAREFINDER_CORPUS",
    "CAREFINDER_STORE",
    "CAREFINDER_ENCODER",
    "CAREFINDER_EMBEDDING_MODEL",
    "CAREFINDER_LLM_API_KEY",
    "CAREFINDER_LLM_MODEL",
  ];

  fn clear_env() {
    for var in ENV_VARS {
      std::env::remove_var(var);
    }
  }

  #[test]
  #[serial]
  fn test_defaults() {
    clear_env();
    let config = ServerConfig::parse_from(["carefinder_server"]);

    assert_eq!(config.bind, "127.0.0.1:3000".parse().unwrap());
    assert_eq!(config.store, StoreBackend::Jsonl);
    assert_eq!(config.encoder, DEFAULT_ENCODER);
    assert_eq!(config.embedding_dim, 384);
    assert_eq!(config.top_k, 5);
    assert!(config.api_key().is_none());
    assert!(!config.no_tracking);
  }

  #[test]
  fn test_default_encoder_follows_onnx_feature() {
    #[cfg(feature = "onnx")]
    assert_eq!(DEFAULT_ENCODER, EncoderBackend::Onnx);
    #[cfg(not(feature = "onnx"))]
    assert_eq!(DEFAULT_ENCODER, EncoderBackend::Hashing);
  }

  #[test]
  #[serial]
  fn test_flags_override_defaults() {
    clear_env();
    let config = ServerConfig::parse_from([
      "carefinder_server",
      "--bind",
      "0.0.0.0:8080",
      "--store",
      "memory",
      "--encoder",
      "openai",
      "--data-dir",
      "/tmp/carefinder-test",
      "--llm-timeout-secs",
      "5",
      "--no-tracking",
    ]);

    assert_eq!(config.bind.port(), 8080);
    assert_eq!(config.store, StoreBackend::Memory);
    assert_eq!(config.encoder, EncoderBackend::Openai);
    assert_eq!(config.resolved_data_dir().unwrap(), PathBuf::from("/tmp/carefinder-test"));
    assert_eq!(config.llm_timeout(), Duration::from_secs(5));
    assert!(config.no_tracking);
  }

  #[test]
  #[serial]
  fn test_environment_is_read() {
    clear_env();
    std::env::set_var("CAREFINDER_LLM_API_KEY", "sk-test");
    std::env::set_var("CAREFINDER_STORE", "memory");

    let config = ServerConfig::parse_from(["carefinder_server"]);
    assert_eq!(config.api_key(), Some("sk-test"));
    assert_eq!(config.store, StoreBackend::Memory);

    clear_env();
  }

  #[test]
  #[serial]
  fn test_blank_api_key_counts_as_missing() {
    clear_env();
    let config = ServerConfig::parse_from(["carefinder_server", "--llm-api-key", "  "]);
    assert!(config.api_key().is_none());
  }
}
