//! Natural-language query endpoint

use axum::extract::{rejection::JsonRejection, Extension, Json, State};
use axum::response::Json as ResponseJson;
use uuid::Uuid;

use crate::server::error::{ApiResult, ServiceError};
use crate::server::middleware::RequestContext;
use crate::server::services::generation::GenerationRequest;
use crate::server::services::text_query::{execute, parse_reply, translation_prompt};
use crate::server::state::SharedState;
use crate::server::types::{BaseResponse, QueryRequest, QueryResponse};

/// POST /query - Translate a question into a validated query and run it
pub async fn run_query(
  Extension(context): Extension<RequestContext>,
  State(state): State<SharedState>,
  payload: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<QueryResponse> {
  let transaction_id = Uuid::new_v4();

  let Json(request) = payload
    .map_err(|e| ServiceError::BadRequest(format!("Invalid query request: {}", e.body_text())).at(transaction_id))?;

  let question = request.question.trim();
  if question.is_empty() {
    return Err(ServiceError::BadRequest("Field 'question' must not be empty".to_string()).at(transaction_id));
  }

  let reply = state
    .generator
    .generate(GenerationRequest::new(translation_prompt(), question))
    .await
    .map_err(|e| ServiceError::Upstream(format!("Query translation failed: {}", e)).at(transaction_id))?;

  let query = match parse_reply(&reply) {
    Ok(query) => query,
    Err(e) => {
      context.log_warn(&format!("Rejected translated query: {}", e), "query-api").await;
      return Err(
        ServiceError::Unprocessable(format!(
          "Could not translate the question into a valid query ({e}). Try rephrasing the question."
        ))
        .at(transaction_id),
      );
    }
  };

  let facilities = state.store.facilities().await.map_err(|e| ServiceError::from(e).at(transaction_id))?;
  let outcome = execute(query, &facilities);

  context.log_info(&format!("Query matched {} facilities", outcome.count), "query-api").await;
  Ok(ResponseJson(BaseResponse::success(QueryResponse { outcome }, transaction_id)))
}
