//! Status and version endpoint handlers

use axum::{extract::State, response::Json};
use schemars::schema_for;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::server::error::{ApiResult, ServiceError};
use crate::server::state::SharedState;
use crate::server::types::{
  ApiInfoResponse, ApiVersions, BaseResponse, ChatRequest, PlanRequest, QueryRequest, StatusResponse, VersionResponse,
};

/// GET /status - Health check endpoint
pub async fn status(State(state): State<SharedState>) -> ApiResult<StatusResponse> {
  let transaction_id = Uuid::new_v4();

  let facility_count =
    state.store.facility_count().await.map_err(|e| ServiceError::from(e).at(transaction_id))?;

  let response = StatusResponse {
    status: "healthy".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    index_size: state.retrieval.index_size(),
    facility_count,
    capabilities: state.capabilities.clone(),
  };
  Ok(Json(BaseResponse::success(response, transaction_id)))
}

/// GET /version - Returns current API version
pub async fn version() -> Json<BaseResponse<VersionResponse>> {
  let transaction_id = Uuid::new_v4();
  let response = VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() };

  Json(BaseResponse::success(response, transaction_id))
}

/// GET /api - Returns API information and request schemas
pub async fn api_info() -> Json<BaseResponse<ApiInfoResponse>> {
  let transaction_id = Uuid::new_v4();
  let version = env!("CARGO_PKG_VERSION");

  let mut schemas = BTreeMap::new();
  schemas.insert("ChatRequest".to_string(), serde_json::to_value(schema_for!(ChatRequest)).unwrap_or_default());
  schemas.insert("QueryRequest".to_string(), serde_json::to_value(schema_for!(QueryRequest)).unwrap_or_default());
  schemas.insert("PlanRequest".to_string(), serde_json::to_value(schema_for!(PlanRequest)).unwrap_or_default());

  let response = ApiInfoResponse {
    latest: version.to_string(),
    versions: ApiVersions { latest: version.to_string(), active: vec![version.to_string()] },
    schemas,
  };

  Json(BaseResponse::success(response, transaction_id))
}
