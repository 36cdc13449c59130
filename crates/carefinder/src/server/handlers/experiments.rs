//! Experiment run history handler

use axum::extract::{Extension, Query, State};
use axum::response::Json;
use uuid::Uuid;

use crate::server::error::{ApiResult, ServiceError};
use crate::server::middleware::RequestContext;
use crate::server::state::SharedState;
use crate::server::types::{BaseResponse, ExperimentRunsQuery, ExperimentRunsResponse};

const DEFAULT_RUN_LIMIT: usize = 20;

/// GET /experiments/runs - Recorded chat traces grouped into runs, newest first
pub async fn list_runs(
  Extension(context): Extension<RequestContext>,
  State(state): State<SharedState>,
  Query(params): Query<ExperimentRunsQuery>,
) -> ApiResult<ExperimentRunsResponse> {
  let transaction_id = Uuid::new_v4();
  let limit = params.limit.unwrap_or(DEFAULT_RUN_LIMIT);

  match state.observer.runs(limit).await {
    Ok(runs) => Ok(Json(BaseResponse::success(ExperimentRunsResponse { runs }, transaction_id))),
    Err(e) => {
      context.log_error(&format!("Failed to read experiment runs: {}", e), "experiments-api").await;
      Err(ServiceError::Internal(format!("Failed to read experiment runs: {}", e)).at(transaction_id))
    }
  }
}
