//! REST API types with schemars annotations for schema generation

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::server::models::{
  conversation::{Citation, ConversationTurn},
  facility::Facility,
  plan::Plan,
};
use crate::server::services::deserts::{CorpusStats, DesertAssessment};
use crate::server::services::observer::ExperimentRun;
use crate::server::services::text_query::QueryOutcome;

// Base Response Structure
// ======================

/// Base response object for all API endpoints
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BaseResponse<T> {
  /// API versioning information
  pub versioning: VersionInfo,

  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,

  /// Optional error information
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub errors: Vec<ApiError>,

  /// Response data (generic for different endpoint types)
  #[serde(flatten)]
  pub data: T,
}

/// API versioning information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionInfo {
  /// The latest version of the API
  pub latest: String,

  /// The version of the API requested by the client
  pub requested: String,

  /// The version of the API that was used in producing the response
  pub resolved: String,
}

/// API error information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
  /// Error key, unique to the error source
  pub key: String,

  /// Human readable error message
  pub message: String,

  /// Error stack trace (if available)
  #[serde(default)]
  pub stack: Vec<String>,

  /// Additional error context
  #[serde(default)]
  pub context: serde_json::Value,
}

// Status/Version Endpoints
// =======================

/// Response for /version endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  /// Current API version
  pub version: String,
}

/// Response for /api endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiInfoResponse {
  /// Latest API version
  pub latest: String,

  /// Version information
  pub versions: ApiVersions,

  /// JSON schemas of the request bodies, keyed by type name
  pub schemas: BTreeMap<String, serde_json::Value>,
}

/// API version details
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiVersions {
  /// Latest version
  pub latest: String,

  /// Currently active versions
  pub active: Vec<String>,
}

/// Features enabled at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Capabilities {
  /// Vector index built and non-empty
  pub retrieval: bool,
  /// Encoder backend name
  pub encoder: String,
  /// A language model provider is configured
  pub generation: bool,
  /// Experiment events are recorded
  pub tracking: bool,
  /// Records survive restarts
  pub persistent_store: bool,
}

/// Response for /status endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
  pub status: String,
  pub version: String,
  /// Passages in the vector index
  pub index_size: usize,
  pub facility_count: usize,
  pub capabilities: Capabilities,
}

// Logs Endpoint
// =============

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
  pub limit: Option<usize>,
  pub level: Option<String>,
}

/// Response for /logs endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LogsResponse {
  /// JSON log entries
  pub logs: Vec<LogEntry>,
}

/// Individual log entry (re-exported from bentley)
pub type LogEntry = bentley::journal::LogEntry;

/// Request context information for logs (re-exported from bentley)
pub type LogContext = bentley::journal::LogContext;

// Facility Endpoints
// ==================

/// Query parameters for GET /facilities
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct FacilityListQuery {
  /// Exact region name (case-insensitive)
  pub region: Option<String>,
  /// Exact facility type (case-insensitive)
  pub facility_type: Option<String>,
  /// Substring of any listed specialty
  pub specialty: Option<String>,
  /// Free-text substring over names, locations, lists and narrative
  pub q: Option<String>,
  pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FacilityListResponse {
  pub facilities: Vec<Facility>,
  pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FacilityResponse {
  pub facility: Facility,
}

// Analysis Endpoints
// ==================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DesertsResponse {
  /// Regions ordered by desert score, worst first
  pub regions: Vec<DesertAssessment>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatsResponse {
  pub stats: CorpusStats,
}

// Chat Endpoints
// ==============

/// Request for POST /chat
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ChatRequest {
  /// The user's question
  pub message: String,

  /// Continue an existing conversation; a new session is opened when absent
  #[serde(default)]
  pub session_id: Option<String>,

  /// Number of facility records to retrieve
  #[serde(default)]
  pub top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ChatResponse {
  pub response: String,
  pub citations: Vec<Citation>,
  /// Fixed-length trace of the steps taken
  pub reasoning_steps: Vec<String>,
  pub session_id: String,
  /// Prior turns loaded into the prompt
  pub history_turns: usize,
  /// Experiment trace identifier, when tracking is enabled
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub trace_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ChatHistoryResponse {
  pub session_id: String,
  /// Turns in chronological order
  pub turns: Vec<ConversationTurn>,
}

// Query Endpoint
// ==============

/// Request for POST /query
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QueryRequest {
  /// Natural-language question about the facilities
  pub question: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QueryResponse {
  #[serde(flatten)]
  pub outcome: QueryOutcome,
}

// Plan Endpoints
// ==============

/// Request for POST /plans
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PlanRequest {
  /// Region to plan for; every region when absent or blank
  #[serde(default)]
  pub region: Option<String>,
  #[serde(default)]
  pub specialty: Option<String>,
  /// Free-text context passed to the planner
  #[serde(default)]
  pub description: Option<String>,
}

/// Query parameters for GET /plans
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct PlanHistoryQuery {
  pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PlanHistoryResponse {
  /// Newest first
  pub plans: Vec<Plan>,
  pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PlanResponse {
  pub plan: Plan,
}

// Experiment Endpoints
// ====================

/// Query parameters for GET /experiments/runs
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ExperimentRunsQuery {
  pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExperimentRunsResponse {
  /// Newest first
  pub runs: Vec<ExperimentRun>,
}

// Helper Functions
// ================

impl<T> BaseResponse<T> {
  /// Create a successful response
  pub fn success(data: T, transaction_id: Uuid) -> Self {
    Self { versioning: VersionInfo::current(), transaction_id, errors: Vec::new(), data }
  }

  /// Create an error response
  pub fn error(errors: Vec<ApiError>, transaction_id: Uuid) -> BaseResponse<()> {
    BaseResponse { versioning: VersionInfo::current(), transaction_id, errors, data: () }
  }
}

impl VersionInfo {
  fn current() -> Self {
    let version = env!("CARGO_PKG_VERSION");
    Self { latest: version.to_string(), requested: version.to_string(), resolved: version.to_string() }
  }
}

impl ApiError {
  /// Create a new API error
  pub fn new(key: &str, message: &str) -> Self {
    Self { key: key.to_string(), message: message.to_string(), stack: Vec::new(), context: serde_json::Value::Null }
  }
}
