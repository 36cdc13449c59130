//! Conversation turns and their citations

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Maximum excerpt length, in characters, kept on a citation
pub const EXCERPT_CHARS: usize = 240;

/// A retrieved facility passage referenced by a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Citation {
  /// Source facility identifier
  pub facility_id: String,
  /// Truncated excerpt of the matched passage
  pub excerpt: String,
  /// Relevance score in [0, 1]
  pub score: f32,
}

impl Citation {
  pub fn new(facility_id: &str, passage: &str, score: f32) -> Self {
    Self { facility_id: facility_id.to_string(), excerpt: excerpt(passage, EXCERPT_CHARS), score: score.clamp(0.0, 1.0) }
  }
}

/// One user-message/response pair within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConversationTurn {
  pub session_id: String,
  pub message: String,
  pub response: String,
  #[serde(default)]
  pub citations: Vec<Citation>,
  #[serde(default)]
  pub reasoning_steps: Vec<String>,
  pub created_at: DateTime<Utc>,
}

/// Truncate on a character boundary, marking the cut with an ellipsis
pub fn excerpt(text: &str, max_chars: usize) -> String {
  match text.char_indices().nth(max_chars) {
    Some((byte_index, _)) => format!("{}…", &text[..byte_index]),
    None => text.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_excerpt_short_text_is_unchanged() {
    assert_eq!(excerpt("Korle Bu", 240), "Korle Bu");
  }

  #[test]
  fn test_excerpt_truncates_on_char_boundary() {
    let text = "é".repeat(10);
    let cut = excerpt(&text, 4);
    assert_eq!(cut, "éééé…");
  }

  #[test]
  fn test_citation_clamps_score() {
    let citation = Citation::new("fac-1", "passage", 1.0000002);
    assert_eq!(citation.score, 1.0);
  }
}
