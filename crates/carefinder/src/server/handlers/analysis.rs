//! Desert analysis and corpus statistics handlers

use axum::extract::State;
use axum::response::Json;
use uuid::Uuid;

use crate::server::error::{ApiResult, ServiceError};
use crate::server::services::deserts;
use crate::server::state::SharedState;
use crate::server::types::{BaseResponse, DesertsResponse, StatsResponse};

/// GET /analysis/deserts - Region-level desert assessment
pub async fn deserts(State(state): State<SharedState>) -> ApiResult<DesertsResponse> {
  let transaction_id = Uuid::new_v4();

  let facilities = state.store.facilities().await.map_err(|e| ServiceError::from(e).at(transaction_id))?;
  let regions = deserts::assess(&facilities);

  Ok(Json(BaseResponse::success(DesertsResponse { regions }, transaction_id)))
}

/// GET /analysis/stats - Corpus-wide statistics
pub async fn stats(State(state): State<SharedState>) -> ApiResult<StatsResponse> {
  let transaction_id = Uuid::new_v4();

  let facilities = state.store.facilities().await.map_err(|e| ServiceError::from(e).at(transaction_id))?;
  let stats = deserts::corpus_stats(&facilities);

  Ok(Json(BaseResponse::success(StatsResponse { stats }, transaction_id)))
}
