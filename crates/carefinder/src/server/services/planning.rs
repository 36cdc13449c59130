//! Resource-planning drafts for one region or the whole country
//!
//! Gathers the facilities in scope and their desert assessments, asks the
//! generator for a plan and persists the result.

use std::fmt::Write;
use thiserror::Error;

use super::deserts::{aggregate_regions, assess_region, flagged_medical_desert, DesertAssessment};
use super::generation::{GenerationRequest, Generator};
use super::store::DocumentStore;
use crate::server::models::{facility::Facility, plan::Plan};

const PLANNING_INSTRUCTIONS: &str = "You are a health-systems planner for the Ghana Health Service. \
Write a concise, prioritized resource plan (staffing, equipment, services, referral links) for the area \
described below. Ground every recommendation in the facility data provided.";

/// Region label for plans that span the whole corpus
pub const ALL_REGIONS: &str = "All regions";

/// Facilities listed individually when planning a single region
const MAX_LISTED_FACILITIES: usize = 25;

/// Key facilities listed per region when planning across regions
const KEY_FACILITIES_PER_REGION: usize = 10;

#[derive(Debug, Error)]
pub enum PlanningError {
  #[error("no facilities found in region '{0}'")]
  UnknownRegion(String),

  #[error("plan generation failed: {0}")]
  Generation(anyhow::Error),

  #[error("plan storage failed: {0}")]
  Store(anyhow::Error),
}

/// What a plan should cover
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanScope<'a> {
  /// `None` plans across every region
  pub region: Option<&'a str>,
  pub specialty: Option<&'a str>,
  pub description: Option<&'a str>,
}

/// Facilities whose region matches `region`, case-insensitively
pub fn region_facilities(facilities: Vec<Facility>, region: &str) -> Vec<Facility> {
  let region = region.trim().to_lowercase();
  facilities.into_iter().filter(|f| f.region.to_lowercase() == region).collect()
}

/// Large, critical or referral-level facilities worth naming in a cross-region plan
pub fn is_key_facility(facility: &Facility) -> bool {
  let kind = facility.facility_type.to_lowercase();
  facility.beds > 100
    || facility.status.to_lowercase().contains("critical")
    || kind.contains("teaching hospital")
    || kind.contains("regional hospital")
}

pub fn planning_request(
  scope: &PlanScope<'_>,
  facilities: &[Facility],
  assessments: &[DesertAssessment],
) -> GenerationRequest {
  let mut context = String::new();

  let _ = writeln!(context, "{PLANNING_INSTRUCTIONS}\n");
  let _ = writeln!(context, "Region focus: {}", scope.region.unwrap_or(ALL_REGIONS));
  let _ = writeln!(context, "Specialty focus: {}", scope.specialty.unwrap_or("General"));
  let _ = writeln!(context, "Additional context: {}\n", scope.description.unwrap_or("None provided"));

  for assessment in assessments {
    let aggregate = &assessment.aggregate;
    let members: Vec<&Facility> = facilities.iter().filter(|f| f.region == aggregate.region).collect();
    let flagged = members.iter().filter(|f| flagged_medical_desert(f)).count();

    let _ = writeln!(context, "Region: {}", aggregate.region);
    let _ = writeln!(
      context,
      "Facilities: {}, beds: {}, staff: {}, flagged as medical deserts: {}",
      aggregate.facility_count, aggregate.total_beds, aggregate.total_staff, flagged
    );
    let _ = writeln!(
      context,
      "Surgery: {}, ICU: {}, CT/MRI: {}, blood bank: {}, distinct specialties: {}",
      yes_no(aggregate.has_surgery),
      yes_no(aggregate.has_icu),
      yes_no(aggregate.has_ct_mri),
      yes_no(aggregate.has_blood_bank),
      aggregate.specialties.len()
    );
    let _ = writeln!(context, "Desert score: {} ({:?})", assessment.score, assessment.severity);

    let (listed, cap): (Vec<&Facility>, usize) = if scope.region.is_some() {
      (members, MAX_LISTED_FACILITIES)
    } else {
      (members.into_iter().filter(|f| is_key_facility(f)).collect(), KEY_FACILITIES_PER_REGION)
    };
    for facility in listed.iter().take(cap) {
      let _ = writeln!(context, "- {}", facility.passage());
    }
    if listed.len() > cap {
      let _ = writeln!(context, "- ... and {} more", listed.len() - cap);
    }
    let _ = writeln!(context);
  }

  let target = scope.region.unwrap_or("all regions");
  let user = match scope.specialty {
    Some(specialty) => format!("Draft a resource plan for {target} focused on {specialty}."),
    None => format!("Draft a resource plan for {target}."),
  };

  GenerationRequest::new(context, user)
}

fn yes_no(flag: bool) -> &'static str {
  if flag {
    "yes"
  } else {
    "no"
  }
}

/// Generate and persist a plan for the scope
pub async fn draft_plan(
  store: &dyn DocumentStore,
  generator: &dyn Generator,
  scope: PlanScope<'_>,
) -> Result<Plan, PlanningError> {
  let mut facilities = store.facilities().await.map_err(PlanningError::Store)?;
  if let Some(region) = scope.region {
    facilities = region_facilities(facilities, region);
  }

  let assessments: Vec<DesertAssessment> = aggregate_regions(&facilities).into_iter().map(assess_region).collect();
  let label = match (scope.region, assessments.first()) {
    (_, None) => return Err(PlanningError::UnknownRegion(scope.region.unwrap_or(ALL_REGIONS).to_string())),
    (Some(_), Some(assessment)) => assessment.aggregate.region.clone(),
    (None, Some(_)) => ALL_REGIONS.to_string(),
  };

  // Prompt uses the stored spelling of the region
  let scope = PlanScope { region: scope.region.map(|_| label.as_str()), ..scope };
  let request = planning_request(&scope, &facilities, &assessments);
  let content = generator.generate(request).await.map_err(PlanningError::Generation)?;

  let plan = Plan::new(&label, scope.specialty, scope.description, content);
  store.save_plan(&plan).await.map_err(PlanningError::Store)?;
  Ok(plan)
}
