//! Facility lookup handlers

use axum::extract::{Extension, Path, Query, State};
use axum::response::Json;
use uuid::Uuid;

use crate::server::error::{ApiResult, ServiceError};
use crate::server::middleware::RequestContext;
use crate::server::models::facility::Facility;
use crate::server::state::SharedState;
use crate::server::types::{BaseResponse, FacilityListQuery, FacilityListResponse, FacilityResponse};

/// Whether a facility satisfies every filter present in `params`
pub fn matches_listing(facility: &Facility, params: &FacilityListQuery) -> bool {
  let region = params.region.as_deref().is_none_or(|region| facility.region.eq_ignore_ascii_case(region.trim()));
  let kind = params
    .facility_type
    .as_deref()
    .is_none_or(|kind| facility.facility_type.eq_ignore_ascii_case(kind.trim()));
  let specialty = params.specialty.as_deref().is_none_or(|specialty| {
    let specialty = specialty.to_lowercase();
    facility.specialties.iter().any(|s| s.to_lowercase().contains(&specialty))
  });
  let text = params.q.as_deref().is_none_or(|q| facility.mentions(q.trim()));

  region && kind && specialty && text
}

/// GET /facilities - Filtered facility listing
pub async fn list_facilities(
  State(state): State<SharedState>,
  Query(params): Query<FacilityListQuery>,
) -> ApiResult<FacilityListResponse> {
  let transaction_id = Uuid::new_v4();

  let facilities = state.store.facilities().await.map_err(|e| ServiceError::from(e).at(transaction_id))?;

  let mut facilities: Vec<Facility> = facilities.into_iter().filter(|f| matches_listing(f, &params)).collect();
  if let Some(limit) = params.limit {
    facilities.truncate(limit);
  }

  let count = facilities.len();
  Ok(Json(BaseResponse::success(FacilityListResponse { facilities, count }, transaction_id)))
}

/// GET /facilities/{id} - One facility
pub async fn get_facility(
  Extension(context): Extension<RequestContext>,
  State(state): State<SharedState>,
  Path(id): Path<String>,
) -> ApiResult<FacilityResponse> {
  let transaction_id = Uuid::new_v4();

  match state.store.facility(&id).await {
    Ok(Some(facility)) => Ok(Json(BaseResponse::success(FacilityResponse { facility }, transaction_id))),
    Ok(None) => {
      context.log_warn(&format!("Facility '{id}' not found"), "facilities-api").await;
      Err(ServiceError::NotFound(format!("Facility '{id}' not found")).at(transaction_id))
    }
    Err(e) => Err(ServiceError::from(e).at(transaction_id)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn facility() -> Facility {
    Facility {
      facility_type: "Hospital".into(),
      specialties: vec!["Paediatrics".into(), "General Surgery".into()],
      ..Facility::new("f1", "Ridge Hospital", "Greater Accra")
    }
  }

  #[test]
  fn test_empty_query_matches_everything() {
    assert!(matches_listing(&facility(), &FacilityListQuery::default()));
  }

  #[test]
  fn test_filters_are_case_insensitive_and_combined() {
    let params = FacilityListQuery {
      region: Some("greater accra".into()),
      facility_type: Some("HOSPITAL".into()),
      specialty: Some("surgery".into()),
      q: Some("ridge".into()),
      limit: None,
    };
    assert!(matches_listing(&facility(), &params));

    let wrong_region = FacilityListQuery { region: Some("Volta".into()), ..FacilityListQuery::default() };
    assert!(!matches_listing(&facility(), &wrong_region));

    let wrong_specialty = FacilityListQuery { specialty: Some("oncology".into()), ..FacilityListQuery::default() };
    assert!(!matches_listing(&facility(), &wrong_specialty));
  }
}
