//! CareFinder REST Server
//!
//! HTTP API answering questions about Ghanaian healthcare facilities with
//! retrieval-augmented generation.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use carefinder::config::ServerConfig;
use carefinder::server::startup::start_server;

#[tokio::main]
async fn main() -> Result<()> {
  let config = ServerConfig::parse();

  let filter = if config.verbose {
    EnvFilter::new("carefinder=debug,tower_http=debug,info")
  } else {
    EnvFilter::new("carefinder=info,tower_http=warn,warn")
  };

  tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

  bentley::announce(&format!("CareFinder REST Server v{}", env!("CARGO_PKG_VERSION")));
  bentley::info!("Binding to address: {}", config.bind);

  start_server(config).await?;

  Ok(())
}
