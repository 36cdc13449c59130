use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A generated resource plan for a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
  pub id: Uuid,
  pub region: String,
  #[serde(default)]
  pub specialty: Option<String>,
  /// Free-text context supplied with the request
  #[serde(default)]
  pub description: Option<String>,
  pub content: String,
  pub created_at: DateTime<Utc>,
}

impl Plan {
  pub fn new(region: &str, specialty: Option<&str>, description: Option<&str>, content: String) -> Self {
    Self {
      id: Uuid::new_v4(),
      region: region.to_string(),
      specialty: specialty.map(str::to_string),
      description: description.map(str::to_string),
      content,
      created_at: Utc::now(),
    }
  }
}
