//! Logs endpoint handler

use axum::extract::{Extension, Query};
use axum::response::Json;
use uuid::Uuid;

use crate::server::{
  error::{ApiResult, ServiceError},
  middleware::RequestContext,
  types::{BaseResponse, LogsQuery, LogsResponse},
};

const DEFAULT_LOG_LIMIT: usize = 100;

/// GET /logs - Most recent service log entries
pub async fn get_logs(
  Extension(context): Extension<RequestContext>,
  Query(params): Query<LogsQuery>,
) -> ApiResult<LogsResponse> {
  let transaction_id = Uuid::new_v4();
  let limit = params.limit.unwrap_or(DEFAULT_LOG_LIMIT);

  match context.logger.get_logs(Some(limit), params.level.as_deref()).await {
    Ok(logs) => Ok(Json(BaseResponse::success(LogsResponse { logs }, transaction_id))),
    Err(e) => {
      context.log_error(&format!("Failed to read logs: {}", e), "logs-api").await;
      Err(ServiceError::Internal(format!("Failed to read logs: {}", e)).at(transaction_id))
    }
  }
}
