//! Resource plan handlers

use axum::extract::{rejection::JsonRejection, Extension, Json, Path, Query, State};
use axum::response::Json as ResponseJson;
use uuid::Uuid;

use crate::server::error::{ApiResult, ServiceError};
use crate::server::middleware::RequestContext;
use crate::server::services::planning::{draft_plan, PlanScope};
use crate::server::state::SharedState;
use crate::server::types::{BaseResponse, PlanHistoryQuery, PlanHistoryResponse, PlanRequest, PlanResponse};

const DEFAULT_HISTORY_LIMIT: usize = 20;

fn non_blank(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// POST /plans - Generate and store a plan for a region, or for every region
pub async fn create_plan(
  Extension(context): Extension<RequestContext>,
  State(state): State<SharedState>,
  payload: Result<Json<PlanRequest>, JsonRejection>,
) -> ApiResult<PlanResponse> {
  let transaction_id = Uuid::new_v4();

  let Json(request) = payload
    .map_err(|e| ServiceError::BadRequest(format!("Invalid plan request: {}", e.body_text())).at(transaction_id))?;

  let scope = PlanScope {
    region: non_blank(&request.region),
    specialty: non_blank(&request.specialty),
    description: non_blank(&request.description),
  };

  match draft_plan(state.store.as_ref(), state.generator.as_ref(), scope).await {
    Ok(plan) => {
      context.log_success(&format!("Stored plan {} for {}", plan.id, plan.region), "plans-api").await;
      Ok(ResponseJson(BaseResponse::success(PlanResponse { plan }, transaction_id)))
    }
    Err(e) => {
      let error = ServiceError::from(e);
      context.log_error(&format!("Plan generation failed: {}", error), "plans-api").await;
      Err(error.at(transaction_id))
    }
  }
}

/// GET /plans - Most recently created plans, newest first
pub async fn list_plans(
  State(state): State<SharedState>,
  Query(params): Query<PlanHistoryQuery>,
) -> ApiResult<PlanHistoryResponse> {
  let transaction_id = Uuid::new_v4();
  let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

  let plans = state.store.recent_plans(limit).await.map_err(|e| ServiceError::from(e).at(transaction_id))?;
  let count = plans.len();
  Ok(ResponseJson(BaseResponse::success(PlanHistoryResponse { plans, count }, transaction_id)))
}

/// GET /plans/{id} - A stored plan
pub async fn get_plan(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult<PlanResponse> {
  let transaction_id = Uuid::new_v4();

  let plan_id = Uuid::parse_str(&id)
    .map_err(|_| ServiceError::BadRequest(format!("'{id}' is not a valid plan id")).at(transaction_id))?;

  match state.store.plan(plan_id).await {
    Ok(Some(plan)) => Ok(ResponseJson(BaseResponse::success(PlanResponse { plan }, transaction_id))),
    Ok(None) => Err(ServiceError::NotFound(format!("Plan '{plan_id}' not found")).at(transaction_id)),
    Err(e) => Err(ServiceError::from(e).at(transaction_id)),
  }
}
