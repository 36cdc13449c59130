//! Shared application state injected into every handler

use bentley::journal::ServiceLog;
use std::sync::Arc;

use crate::server::services::{
  context::ContextAssembler, generation::Generator, observer::ExperimentObserver, retrieval::RetrievalService,
  store::DocumentStore,
};
use crate::server::types::Capabilities;

/// Upper bound on `top_k` accepted from chat requests
pub const MAX_TOP_K: usize = 50;

/// Everything a request needs; built once before the listener starts
pub struct AppState {
  pub store: Arc<dyn DocumentStore>,
  pub retrieval: RetrievalService,
  pub assembler: ContextAssembler,
  pub generator: Arc<dyn Generator>,
  pub observer: Arc<dyn ExperimentObserver>,
  pub logs: ServiceLog,
  pub capabilities: Capabilities,
  pub default_top_k: usize,
}

pub type SharedState = Arc<AppState>;

impl AppState {
  pub fn new(
    store: Arc<dyn DocumentStore>,
    retrieval: RetrievalService,
    generator: Arc<dyn Generator>,
    observer: Arc<dyn ExperimentObserver>,
    logs: ServiceLog,
    capabilities: Capabilities,
  ) -> Self {
    let assembler = ContextAssembler::new(store.clone());
    Self { store, retrieval, assembler, generator, observer, logs, capabilities, default_top_k: 5 }
  }

  pub fn with_default_top_k(mut self, top_k: usize) -> Self {
    self.default_top_k = top_k.min(MAX_TOP_K);
    self
  }

  pub fn shared(self) -> SharedState {
    Arc::new(self)
  }
}
