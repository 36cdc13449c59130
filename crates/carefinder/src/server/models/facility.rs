//! Facility records and corpus loading

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A healthcare facility as held by the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Facility {
  /// Unique, stable identifier
  #[serde(alias = "facility_id")]
  pub id: String,
  pub name: String,
  pub region: String,
  #[serde(default)]
  pub district: String,
  #[serde(default)]
  pub town: String,
  /// Hospital, clinic, CHPS compound, ...
  #[serde(default, alias = "type")]
  pub facility_type: String,
  /// Government, private, mission, ...
  #[serde(default)]
  pub ownership: String,
  #[serde(default)]
  pub beds: u32,
  #[serde(default)]
  pub staff_count: u32,
  #[serde(default)]
  pub specialties: Vec<String>,
  #[serde(default)]
  pub equipment: Vec<String>,
  #[serde(default)]
  pub services: Vec<String>,
  #[serde(default, alias = "operational_status")]
  pub status: String,
  #[serde(default, alias = "capabilities_text")]
  pub narrative: String,
  #[serde(default)]
  pub notes: String,
  #[serde(default, alias = "last_inspection")]
  pub inspection_date: Option<NaiveDate>,
}

impl Facility {
  /// Create a facility with only the identifying fields set
  pub fn new(id: impl Into<String>, name: impl Into<String>, region: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      region: region.into(),
      district: String::new(),
      town: String::new(),
      facility_type: String::new(),
      ownership: String::new(),
      beds: 0,
      staff_count: 0,
      specialties: Vec::new(),
      equipment: Vec::new(),
      services: Vec::new(),
      status: String::new(),
      narrative: String::new(),
      notes: String::new(),
      inspection_date: None,
    }
  }

  /// Synthesized descriptive text used as the unit of semantic search
  pub fn passage(&self) -> String {
    let mut parts = Vec::new();

    let kind = non_empty_or(&self.facility_type, "health facility");
    let location = [self.town.as_str(), self.district.as_str()]
      .into_iter()
      .filter(|part| !part.trim().is_empty())
      .collect::<Vec<_>>()
      .join(", ");

    let mut headline = format!("{} is a {}", self.name, kind);
    if !self.ownership.trim().is_empty() {
      headline.push_str(&format!(" ({} owned)", self.ownership));
    }
    if location.is_empty() {
      headline.push_str(&format!(" in the {} region.", self.region));
    } else {
      headline.push_str(&format!(" in {}, {} region.", location, self.region));
    }
    parts.push(headline);

    parts.push(format!("Beds: {}. Staff: {}.", self.beds, self.staff_count));
    push_list(&mut parts, "Specialties", &self.specialties);
    push_list(&mut parts, "Services", &self.services);
    push_list(&mut parts, "Equipment", &self.equipment);

    if !self.status.trim().is_empty() {
      parts.push(format!("Status: {}.", self.status));
    }
    if !self.narrative.trim().is_empty() {
      parts.push(self.narrative.trim().to_string());
    }
    if !self.notes.trim().is_empty() {
      parts.push(format!("Notes: {}", self.notes.trim()));
    }
    if let Some(date) = self.inspection_date {
      parts.push(format!("Last inspected: {date}."));
    }

    parts.join(" ")
  }

  /// Whether any listed service or specialty mentions the keyword (case-insensitive)
  pub fn offers(&self, keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    self.services.iter().chain(self.specialties.iter()).any(|entry| entry.to_lowercase().contains(&keyword))
  }

  /// Whether any listed equipment mentions the keyword (case-insensitive)
  pub fn has_equipment(&self, keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    self.equipment.iter().any(|item| item.to_lowercase().contains(&keyword))
  }

  /// Case-insensitive substring match across the free-text and list fields
  pub fn mentions(&self, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    let scalars = [
      &self.id,
      &self.name,
      &self.region,
      &self.district,
      &self.town,
      &self.facility_type,
      &self.ownership,
      &self.status,
      &self.narrative,
      &self.notes,
    ];

    scalars.iter().any(|value| value.to_lowercase().contains(&needle))
      || self
        .specialties
        .iter()
        .chain(self.services.iter())
        .chain(self.equipment.iter())
        .any(|value| value.to_lowercase().contains(&needle))
  }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
  if value.trim().is_empty() {
    fallback
  } else {
    value
  }
}

fn push_list(parts: &mut Vec<String>, label: &str, values: &[String]) {
  if !values.is_empty() {
    parts.push(format!("{label}: {}.", values.join(", ")));
  }
}

/// Load a facility corpus from a JSON array or YAML sequence, chosen by file extension
pub fn load_corpus(path: &Path) -> Result<Vec<Facility>> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read corpus file {}", path.display()))?;

  let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default().to_lowercase();

  let facilities: Vec<Facility> = match extension.as_str() {
    "json" => serde_json::from_str(&content)
      .with_context(|| format!("Failed to parse JSON corpus {}", path.display()))?,
    "yaml" | "yml" => serde_yaml::from_str(&content)
      .with_context(|| format!("Failed to parse YAML corpus {}", path.display()))?,
    other => bail!("Unsupported corpus format '{other}' (expected .json, .yaml or .yml)"),
  };

  validate_unique_ids(&facilities)?;
  Ok(facilities)
}

/// Reject corpora where two facilities share an identifier
pub fn validate_unique_ids(facilities: &[Facility]) -> Result<()> {
  let mut seen = HashSet::new();
  for facility in facilities {
    if facility.id.trim().is_empty() {
      return Err(anyhow!("Facility '{}' has an empty id", facility.name));
    }
    if !seen.insert(facility.id.as_str()) {
      return Err(anyhow!("Duplicate facility id '{}' in corpus", facility.id));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn sample() -> Facility {
    Facility {
      district: "Tamale Metropolitan".into(),
      town: "Tamale".into(),
      facility_type: "Hospital".into(),
      ownership: "Government".into(),
      beds: 120,
      staff_count: 80,
      specialties: vec!["Obstetrics".into(), "General Surgery".into()],
      services: vec!["Emergency".into(), "Maternity".into()],
      equipment: vec!["X-ray".into()],
      status: "Operational".into(),
      narrative: "Referral hospital for the northern belt.".into(),
      inspection_date: NaiveDate::from_ymd_opt(2024, 3, 14),
      ..Facility::new("fac-001", "Tamale Teaching Hospital", "Northern")
    }
  }

  #[test]
  fn test_passage_includes_every_descriptive_field() {
    let passage = sample().passage();

    assert!(passage.starts_with("Tamale Teaching Hospital is a Hospital (Government owned) in Tamale"));
    assert!(passage.contains("Northern region"));
    assert!(passage.contains("Beds: 120. Staff: 80."));
    assert!(passage.contains("Specialties: Obstetrics, General Surgery."));
    assert!(passage.contains("Equipment: X-ray."));
    assert!(passage.contains("Referral hospital"));
    assert!(passage.contains("Last inspected: 2024-03-14."));
  }

  #[test]
  fn test_passage_for_sparse_record() {
    let passage = Facility::new("x", "Test Clinic", "Volta").passage();
    assert_eq!(passage, "Test Clinic is a health facility in the Volta region. Beds: 0. Staff: 0.");
  }

  #[test]
  fn test_offers_matches_services_and_specialties_case_insensitively() {
    let facility = sample();
    assert!(facility.offers("surgery"));
    assert!(facility.offers("EMERGENCY"));
    assert!(!facility.offers("dialysis"));
  }

  #[test]
  fn test_has_equipment_only_looks_at_equipment() {
    let facility = sample();
    assert!(facility.has_equipment("x-ray"));
    assert!(!facility.has_equipment("surgery"));
  }

  #[test]
  fn test_mentions_searches_lists_and_text() {
    let facility = sample();
    assert!(facility.mentions("x-RAY"));
    assert!(facility.mentions("northern belt"));
    assert!(!facility.mentions("Kumasi"));
  }

  #[test]
  fn test_load_corpus_json_and_yaml() -> Result<()> {
    let dir = TempDir::new()?;

    let json_path = dir.path().join("corpus.json");
    std::fs::write(&json_path, r#"[{"id":"a","name":"A","region":"Ashanti","beds":4}]"#)?;
    let from_json = load_corpus(&json_path)?;
    assert_eq!(from_json.len(), 1);
    assert_eq!(from_json[0].beds, 4);

    let yaml_path = dir.path().join("corpus.yaml");
    std::fs::write(&yaml_path, "- id: b\n  name: B\n  region: Volta\n  services: [Surgery]\n")?;
    let from_yaml = load_corpus(&yaml_path)?;
    assert_eq!(from_yaml[0].services, vec!["Surgery".to_string()]);

    Ok(())
  }

  #[test]
  fn test_load_corpus_accepts_enriched_dataset_field_names() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("ghana_facilities.json");
    std::fs::write(
      &path,
      r#"[{
        "facility_id": "GH-0001",
        "name": "Tamale Teaching Hospital",
        "region": "Northern",
        "district": "Tamale Metropolitan",
        "town": "Tamale",
        "type": "Teaching Hospital",
        "ownership": "Government",
        "latitude": 9.4034,
        "longitude": -0.8424,
        "beds": 800,
        "staff_count": 1200,
        "specialties": ["Cardiology"],
        "equipment": ["CT Scanner", "MRI"],
        "services": ["ICU", "Blood Bank", "Surgery"],
        "operational_status": "Fully Operational",
        "capabilities_text": "Tamale Teaching Hospital is the main referral centre in the north.",
        "notes": "Key referral facility.",
        "last_inspection": "2024-05-17"
      }]"#,
    )?;

    let facilities = load_corpus(&path)?;
    let facility = &facilities[0];
    assert_eq!(facility.id, "GH-0001");
    assert_eq!(facility.facility_type, "Teaching Hospital");
    assert_eq!(facility.status, "Fully Operational");
    assert!(facility.narrative.starts_with("Tamale Teaching Hospital is the main referral"));
    assert_eq!(facility.inspection_date, NaiveDate::from_ymd_opt(2024, 5, 17));
    assert_eq!(facility.equipment, vec!["CT Scanner".to_string(), "MRI".to_string()]);
    Ok(())
  }

  #[test]
  fn test_load_corpus_rejects_duplicates_and_unknown_formats() -> Result<()> {
    let dir = TempDir::new()?;

    let dup_path = dir.path().join("dup.json");
    std::fs::write(&dup_path, r#"[{"id":"a","name":"A","region":"R"},{"id":"a","name":"B","region":"R"}]"#)?;
    let err = load_corpus(&dup_path).unwrap_err();
    assert!(err.to_string().contains("Duplicate facility id 'a'"));

    let csv_path = dir.path().join("corpus.csv");
    std::fs::write(&csv_path, "id,name")?;
    assert!(load_corpus(&csv_path).is_err());

    Ok(())
  }
}
