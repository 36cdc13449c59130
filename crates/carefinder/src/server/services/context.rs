//! Conversation context assembly
//!
//! Merges prior session turns and retrieved passages into the single prompt
//! section handed to the generator. Read-only: the caller persists the new
//! turn after generation.

use anyhow::Result;
use std::fmt::Write;
use std::sync::Arc;

use super::retrieval::RetrievedPassage;
use super::store::DocumentStore;
use crate::server::models::conversation::{excerpt, ConversationTurn};

/// Number of prior turns carried into a prompt
pub const HISTORY_WINDOW: usize = 5;

/// Prior assistant replies are cut to this many characters in the prompt
pub const HISTORY_RESPONSE_CHARS: usize = 300;

pub const RECORDS_OPEN: &str = "=== RETRIEVED FACILITY RECORDS ===";
pub const RECORDS_CLOSE: &str = "=== END RETRIEVED FACILITY RECORDS ===";
pub const HISTORY_OPEN: &str = "=== CONVERSATION HISTORY ===";
pub const HISTORY_CLOSE: &str = "=== END CONVERSATION HISTORY ===";

/// Prompt section plus the history it was built from
#[derive(Debug, Clone)]
pub struct AssembledContext {
  pub history: Vec<ConversationTurn>,
  pub prompt_section: String,
}

impl AssembledContext {
  pub fn history_loaded(&self) -> usize {
    self.history.len()
  }
}

pub struct ContextAssembler {
  store: Arc<dyn DocumentStore>,
  window: usize,
}

impl ContextAssembler {
  pub fn new(store: Arc<dyn DocumentStore>) -> Self {
    Self { store, window: HISTORY_WINDOW }
  }

  /// The most recent turns of `session_id`, oldest first
  pub async fn load_history(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
    self.store.recent_turns(session_id, self.window).await
  }

  /// Load history and render it together with `passages`
  pub async fn assemble(&self, session_id: &str, passages: &[RetrievedPassage]) -> Result<AssembledContext> {
    let history = self.load_history(session_id).await?;
    let prompt_section = render(passages, &history);
    Ok(AssembledContext { history, prompt_section })
  }
}

/// Format passages (in the order given) and history into delimited blocks
pub fn render(passages: &[RetrievedPassage], history: &[ConversationTurn]) -> String {
  let mut section = String::new();

  let _ = writeln!(section, "{RECORDS_OPEN}");
  if passages.is_empty() {
    let _ = writeln!(section, "No matching facility records were found.");
  }
  for (rank, passage) in passages.iter().enumerate() {
    let _ = writeln!(section, "[Source {}] {} (relevance {:.2})", rank + 1, passage.facility_id, passage.score);
    let _ = writeln!(section, "{}", passage.passage);
  }
  let _ = writeln!(section, "{RECORDS_CLOSE}");

  if !history.is_empty() {
    let _ = writeln!(section);
    let _ = writeln!(section, "{HISTORY_OPEN}");
    for turn in history {
      let _ = writeln!(section, "User: {}", turn.message);
      let _ = writeln!(section, "Assistant: {}", excerpt(&turn.response, HISTORY_RESPONSE_CHARS));
    }
    let _ = writeln!(section, "{HISTORY_CLOSE}");
  }

  section
}
