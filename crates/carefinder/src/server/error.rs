//! Error taxonomy at the HTTP boundary

use axum::{http::StatusCode, response::Json};
use thiserror::Error;
use uuid::Uuid;

use crate::server::services::planning::PlanningError;
use crate::server::types::{ApiError, BaseResponse};

/// Handler failure: status code plus an error envelope
pub type ApiFailure = (StatusCode, Json<BaseResponse<()>>);

/// Handler result in the common envelope
pub type ApiResult<T> = Result<Json<BaseResponse<T>>, ApiFailure>;

#[derive(Debug, Error)]
pub enum ServiceError {
  /// Missing or empty required input
  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  NotFound(String),

  /// Model output could not be turned into a valid request
  #[error("{0}")]
  Unprocessable(String),

  /// External provider failed
  #[error("{0}")]
  Upstream(String),

  #[error("{0}")]
  Internal(String),
}

impl ServiceError {
  pub fn status(&self) -> StatusCode {
    match self {
      ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
      ServiceError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ServiceError::Upstream(_) => StatusCode::BAD_GATEWAY,
      ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  pub fn key(&self) -> &'static str {
    match self {
      ServiceError::BadRequest(_) => "bad_request",
      ServiceError::NotFound(_) => "not_found",
      ServiceError::Unprocessable(_) => "unprocessable",
      ServiceError::Upstream(_) => "upstream_failure",
      ServiceError::Internal(_) => "internal_error",
    }
  }

  /// Render into the error envelope for `transaction_id`
  pub fn at(self, transaction_id: Uuid) -> ApiFailure {
    let error = ApiError::new(self.key(), &self.to_string());
    (self.status(), Json(BaseResponse::<()>::error(vec![error], transaction_id)))
  }
}

impl From<anyhow::Error> for ServiceError {
  fn from(error: anyhow::Error) -> Self {
    ServiceError::Internal(error.to_string())
  }
}

impl From<PlanningError> for ServiceError {
  fn from(error: PlanningError) -> Self {
    match error {
      PlanningError::UnknownRegion(_) => ServiceError::NotFound(error.to_string()),
      PlanningError::Generation(_) => ServiceError::Upstream(error.to_string()),
      PlanningError::Store(_) => ServiceError::Internal(error.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_mapping() {
    assert_eq!(ServiceError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
    assert_eq!(ServiceError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    assert_eq!(ServiceError::Unprocessable("x".into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ServiceError::Upstream("x".into()).status(), StatusCode::BAD_GATEWAY);
    assert_eq!(ServiceError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn test_envelope_carries_key_and_message() {
    let transaction_id = Uuid::new_v4();
    let (status, Json(body)) = ServiceError::NotFound("Facility 'x' not found".into()).at(transaction_id);

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body.transaction_id, transaction_id);
    assert_eq!(body.errors[0].key, "not_found");
    assert_eq!(body.errors[0].message, "Facility 'x' not found");
  }

  #[test]
  fn test_planning_errors_map_to_taxonomy() {
    let unknown: ServiceError = PlanningError::UnknownRegion("Oti".into()).into();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let upstream: ServiceError = PlanningError::Generation(anyhow::anyhow!("timeout")).into();
    assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    assert!(upstream.to_string().contains("timeout"));
  }
}
