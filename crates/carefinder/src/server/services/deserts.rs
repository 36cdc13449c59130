//! Region-level healthcare desert heuristic and corpus statistics
//!
//! Everything here is a pure function of the facility list.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::server::models::facility::Facility;

/// Totals and capability flags for one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegionAggregate {
  pub region: String,
  /// Facility names, in corpus order
  pub facilities: Vec<String>,
  pub facility_count: usize,
  pub total_beds: u64,
  pub total_staff: u64,
  /// Distinct specialties offered anywhere in the region, sorted
  pub specialties: Vec<String>,
  pub has_surgery: bool,
  pub has_icu: bool,
  pub has_ct_mri: bool,
  pub has_blood_bank: bool,
}

impl RegionAggregate {
  fn empty(region: &str) -> Self {
    Self {
      region: region.to_string(),
      facilities: Vec::new(),
      facility_count: 0,
      total_beds: 0,
      total_staff: 0,
      specialties: Vec::new(),
      has_surgery: false,
      has_icu: false,
      has_ct_mri: false,
      has_blood_bank: false,
    }
  }

  fn add(&mut self, facility: &Facility, specialties: &mut BTreeSet<String>) {
    self.facilities.push(facility.name.clone());
    self.facility_count += 1;
    self.total_beds += u64::from(facility.beds);
    self.total_staff += u64::from(facility.staff_count);
    specialties.extend(facility.specialties.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
    self.has_surgery |= facility.offers("surgery");
    self.has_icu |= facility.offers("icu") || facility.offers("intensive care");
    self.has_ct_mri |= facility.has_equipment("ct scanner") || facility.has_equipment("mri");
    self.has_blood_bank |= facility.offers("blood bank");
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Severity {
  Critical,
  Moderate,
  Adequate,
}

impl Severity {
  pub fn from_score(score: u32) -> Self {
    match score {
      s if s >= 60 => Severity::Critical,
      s if s >= DESERT_THRESHOLD => Severity::Moderate,
      _ => Severity::Adequate,
    }
  }
}

/// Regions scoring at or above this are flagged as deserts
pub const DESERT_THRESHOLD: u32 = 40;

/// Fewer distinct specialties than this counts against a region
pub const MIN_SPECIALTIES: usize = 3;

/// A rule that contributed points to a score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreFactor {
  pub factor: String,
  pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DesertAssessment {
  #[serde(flatten)]
  pub aggregate: RegionAggregate,
  pub score: u32,
  pub severity: Severity,
  pub is_desert: bool,
  pub factors: Vec<ScoreFactor>,
}

/// Group facilities by region, in region name order
pub fn aggregate_regions(facilities: &[Facility]) -> Vec<RegionAggregate> {
  let mut regions: BTreeMap<&str, (RegionAggregate, BTreeSet<String>)> = BTreeMap::new();
  for facility in facilities {
    let (aggregate, specialties) = regions
      .entry(facility.region.as_str())
      .or_insert_with(|| (RegionAggregate::empty(&facility.region), BTreeSet::new()));
    aggregate.add(facility, specialties);
  }
  regions
    .into_values()
    .map(|(mut aggregate, specialties)| {
      aggregate.specialties = specialties.into_iter().collect();
      aggregate
    })
    .collect()
}

/// Rules that fire for a region, with their points
///
/// Capacity rules are banded: a region under 100 beds scores the 100 band
/// only, not both bands.
pub fn score_factors(aggregate: &RegionAggregate) -> Vec<ScoreFactor> {
  let beds = aggregate.total_beds;
  let staff = aggregate.total_staff;

  let rules: [(bool, &str, u32); 9] = [
    (beds < 100, "beds_below_100", 30),
    ((100..200).contains(&beds), "beds_below_200", 15),
    (staff < 200, "staff_below_200", 20),
    ((200..500).contains(&staff), "staff_below_500", 10),
    (!aggregate.has_surgery, "no_surgery", 20),
    (!aggregate.has_icu, "no_icu", 15),
    (!aggregate.has_ct_mri, "no_ct_mri", 10),
    (!aggregate.has_blood_bank, "no_blood_bank", 5),
    (aggregate.specialties.len() < MIN_SPECIALTIES, "few_specialties", 10),
  ];

  rules
    .into_iter()
    .filter(|(fires, _, _)| *fires)
    .map(|(_, factor, points)| ScoreFactor { factor: factor.to_string(), points })
    .collect()
}

/// Desert score in [0, 100]
pub fn desert_score(aggregate: &RegionAggregate) -> u32 {
  clamp_score(&score_factors(aggregate))
}

fn clamp_score(factors: &[ScoreFactor]) -> u32 {
  factors.iter().map(|f| f.points).sum::<u32>().min(100)
}

pub fn assess_region(aggregate: RegionAggregate) -> DesertAssessment {
  let factors = score_factors(&aggregate);
  let score = clamp_score(&factors);
  DesertAssessment {
    aggregate,
    score,
    severity: Severity::from_score(score),
    is_desert: score >= DESERT_THRESHOLD,
    factors,
  }
}

/// Assess every region, worst first; ties ordered by region name
pub fn assess(facilities: &[Facility]) -> Vec<DesertAssessment> {
  let mut assessments: Vec<DesertAssessment> =
    aggregate_regions(facilities).into_iter().map(assess_region).collect();
  assessments.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.aggregate.region.cmp(&b.aggregate.region)));
  assessments
}

// Corpus statistics
// =================

pub const TOP_SPECIALTIES: usize = 10;

const MEDICAL_DESERT_MARKER: &str = "medical desert";

/// Whether the facility's notes carry a medical desert marker
pub fn flagged_medical_desert(facility: &Facility) -> bool {
  facility.notes.to_lowercase().contains(MEDICAL_DESERT_MARKER)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SpecialtyCount {
  pub specialty: String,
  pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CorpusStats {
  pub total_facilities: usize,
  pub total_regions: usize,
  /// Distinct specialties across the corpus
  pub total_specialties: usize,
  pub total_beds: u64,
  pub total_staff: u64,
  pub average_beds: f64,
  /// Facilities whose notes carry a medical desert marker
  pub medical_deserts: usize,
  pub by_region: BTreeMap<String, usize>,
  pub by_type: BTreeMap<String, usize>,
  pub by_ownership: BTreeMap<String, usize>,
  pub by_status: BTreeMap<String, usize>,
  pub top_specialties: Vec<SpecialtyCount>,
}

pub fn corpus_stats(facilities: &[Facility]) -> CorpusStats {
  let total_beds: u64 = facilities.iter().map(|f| u64::from(f.beds)).sum();
  let total_staff: u64 = facilities.iter().map(|f| u64::from(f.staff_count)).sum();
  let average_beds = if facilities.is_empty() { 0.0 } else { total_beds as f64 / facilities.len() as f64 };

  let mut specialties: HashMap<&str, usize> = HashMap::new();
  for specialty in facilities.iter().flat_map(|f| f.specialties.iter()) {
    *specialties.entry(specialty.as_str()).or_default() += 1;
  }
  let mut top_specialties: Vec<SpecialtyCount> = specialties
    .into_iter()
    .map(|(specialty, count)| SpecialtyCount { specialty: specialty.to_string(), count })
    .collect();
  top_specialties.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.specialty.cmp(&b.specialty)));
  let total_specialties = top_specialties.len();
  top_specialties.truncate(TOP_SPECIALTIES);

  let total_regions = facilities.iter().map(|f| f.region.as_str()).collect::<HashSet<_>>().len();
  let medical_deserts = facilities.iter().filter(|f| flagged_medical_desert(f)).count();

  CorpusStats {
    total_facilities: facilities.len(),
    total_regions,
    total_specialties,
    total_beds,
    total_staff,
    average_beds,
    medical_deserts,
    by_region: count_by(facilities.iter().map(|f| f.region.as_str())),
    by_type: count_by(facilities.iter().map(|f| f.facility_type.as_str())),
    by_ownership: count_by(facilities.iter().map(|f| f.ownership.as_str())),
    by_status: count_by(facilities.iter().map(|f| f.status.as_str())),
    top_specialties,
  }
}

fn count_by<'a>(values: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
  let mut counts = BTreeMap::new();
  for value in values {
    let value = value.trim();
    let label = if value.is_empty() { "Unknown" } else { value };
    *counts.entry(label.to_string()).or_default() += 1;
  }
  counts
}
