//! Natural-language facility queries
//!
//! A question is rendered into a prompt, the model replies with JSON, and the
//! reply is parsed into [`StructuredQuery`], a tagged filter/sort/limit/
//! projection representation. Nothing reaches the store until the query has
//! been fully validated against the facility schema.

use chrono::NaiveDate;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

use crate::server::models::facility::Facility;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

// Intermediate representation
// ===========================

/// Queryable facility fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FacilityField {
  Id,
  Name,
  Region,
  District,
  Town,
  FacilityType,
  Ownership,
  Beds,
  StaffCount,
  Specialties,
  Equipment,
  Services,
  Status,
  Narrative,
  Notes,
  InspectionDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  List,
  Number,
  Date,
}

impl FacilityField {
  pub const ALL: [FacilityField; 16] = [
    FacilityField::Id,
    FacilityField::Name,
    FacilityField::Region,
    FacilityField::District,
    FacilityField::Town,
    FacilityField::FacilityType,
    FacilityField::Ownership,
    FacilityField::Beds,
    FacilityField::StaffCount,
    FacilityField::Specialties,
    FacilityField::Equipment,
    FacilityField::Services,
    FacilityField::Status,
    FacilityField::Narrative,
    FacilityField::Notes,
    FacilityField::InspectionDate,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      FacilityField::Id => "id",
      FacilityField::Name => "name",
      FacilityField::Region => "region",
      FacilityField::District => "district",
      FacilityField::Town => "town",
      FacilityField::FacilityType => "facility_type",
      FacilityField::Ownership => "ownership",
      FacilityField::Beds => "beds",
      FacilityField::StaffCount => "staff_count",
      FacilityField::Specialties => "specialties",
      FacilityField::Equipment => "equipment",
      FacilityField::Services => "services",
      FacilityField::Status => "status",
      FacilityField::Narrative => "narrative",
      FacilityField::Notes => "notes",
      FacilityField::InspectionDate => "inspection_date",
    }
  }

  pub fn kind(self) -> FieldKind {
    match self {
      FacilityField::Beds | FacilityField::StaffCount => FieldKind::Number,
      FacilityField::Specialties | FacilityField::Equipment | FacilityField::Services => FieldKind::List,
      FacilityField::InspectionDate => FieldKind::Date,
      _ => FieldKind::Text,
    }
  }
}

impl fmt::Display for FacilityField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A literal compared against a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Scalar {
  Number(f64),
  Text(String),
}

impl fmt::Display for Scalar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Scalar::Number(n) => write!(f, "{n}"),
      Scalar::Text(s) => write!(f, "\"{s}\""),
    }
  }
}

/// One predicate; all filters of a query are ANDed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
  Eq { field: FacilityField, value: Scalar },
  Ne { field: FacilityField, value: Scalar },
  Contains { field: FacilityField, value: String },
  Gt { field: FacilityField, value: Scalar },
  Gte { field: FacilityField, value: Scalar },
  Lt { field: FacilityField, value: Scalar },
  Lte { field: FacilityField, value: Scalar },
  In { field: FacilityField, values: Vec<Scalar> },
}

impl Filter {
  pub fn field(&self) -> FacilityField {
    match self {
      Filter::Eq { field, .. }
      | Filter::Ne { field, .. }
      | Filter::Contains { field, .. }
      | Filter::Gt { field, .. }
      | Filter::Gte { field, .. }
      | Filter::Lt { field, .. }
      | Filter::Lte { field, .. }
      | Filter::In { field, .. } => *field,
    }
  }

  pub fn op(&self) -> &'static str {
    match self {
      Filter::Eq { .. } => "eq",
      Filter::Ne { .. } => "ne",
      Filter::Contains { .. } => "contains",
      Filter::Gt { .. } => "gt",
      Filter::Gte { .. } => "gte",
      Filter::Lt { .. } => "lt",
      Filter::Lte { .. } => "lte",
      Filter::In { .. } => "in",
    }
  }

  fn describe(&self) -> String {
    match self {
      Filter::Contains { field, value } => format!("{field} contains \"{value}\""),
      Filter::In { field, values } => {
        let values: Vec<String> = values.iter().map(Scalar::to_string).collect();
        format!("{field} in [{}]", values.join(", "))
      }
      Filter::Eq { field, value }
      | Filter::Ne { field, value }
      | Filter::Gt { field, value }
      | Filter::Gte { field, value }
      | Filter::Lt { field, value }
      | Filter::Lte { field, value } => format!("{field} {} {value}", self.op()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  #[default]
  Asc,
  Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SortSpec {
  pub field: FacilityField,
  #[serde(default)]
  pub direction: SortDirection,
}

/// Validated query over the facility collection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StructuredQuery {
  #[serde(default)]
  pub filters: Vec<Filter>,
  #[serde(default)]
  pub sort: Option<SortSpec>,
  #[serde(default)]
  pub limit: Option<usize>,
  /// Fields to return; empty returns whole records
  #[serde(default)]
  pub projection: Vec<FacilityField>,
  #[serde(default)]
  pub explanation: Option<String>,
}

impl StructuredQuery {
  pub fn effective_limit(&self) -> usize {
    self.limit.unwrap_or(DEFAULT_LIMIT)
  }
}

// Errors
// ======

#[derive(Debug, Error, PartialEq)]
pub enum TranslationError {
  #[error("model reply did not contain a JSON object")]
  NoJsonObject,

  #[error("model reply is not a valid query: {0}")]
  Malformed(String),

  #[error("operator '{op}' needs a numeric or date field, but '{field}' is text")]
  OrderingOnText { op: &'static str, field: FacilityField },

  #[error("operator 'contains' needs a text field, but '{field}' is not text")]
  ContainsOnNonText { field: FacilityField },

  #[error("value {value} does not fit field '{field}'")]
  ValueMismatch { field: FacilityField, value: String },

  #[error("operator 'in' on '{field}' needs at least one value")]
  EmptyIn { field: FacilityField },

  #[error("limit {0} is outside 1..=100")]
  LimitOutOfRange(usize),

  #[error("field '{0}' appears more than once in the projection")]
  DuplicateProjection(FacilityField),

  #[error("cannot sort on list field '{0}'")]
  SortOnList(FacilityField),
}

// Parsing and validation
// ======================

/// Parse a model reply: strip code fences, take the first JSON object, validate
pub fn parse_reply(reply: &str) -> Result<StructuredQuery, TranslationError> {
  let body = strip_code_fences(reply)?;
  let start = body.find('{').ok_or(TranslationError::NoJsonObject)?;

  let value = serde_json::Deserializer::from_str(&body[start..])
    .into_iter::<Value>()
    .next()
    .ok_or(TranslationError::NoJsonObject)?
    .map_err(|e| TranslationError::Malformed(e.to_string()))?;

  let query: StructuredQuery =
    serde_json::from_value(value).map_err(|e| TranslationError::Malformed(e.to_string()))?;

  validate(&query)?;
  Ok(query)
}

/// Compiled once on first use
static CODE_FENCE: LazyLock<Result<Regex, regex::Error>> =
  LazyLock::new(|| Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```"));

fn strip_code_fences(reply: &str) -> Result<String, TranslationError> {
  let fence = CODE_FENCE.as_ref().map_err(|e| TranslationError::Malformed(e.to_string()))?;

  Ok(match fence.captures(reply).and_then(|caps| caps.get(1)) {
    Some(inner) => inner.as_str().trim().to_string(),
    None => reply.trim().to_string(),
  })
}

pub fn validate(query: &StructuredQuery) -> Result<(), TranslationError> {
  for filter in &query.filters {
    validate_filter(filter)?;
  }

  if let Some(limit) = query.limit {
    if !(1..=MAX_LIMIT).contains(&limit) {
      return Err(TranslationError::LimitOutOfRange(limit));
    }
  }

  let mut seen = HashSet::new();
  for field in &query.projection {
    if !seen.insert(*field) {
      return Err(TranslationError::DuplicateProjection(*field));
    }
  }

  if let Some(sort) = &query.sort {
    if sort.field.kind() == FieldKind::List {
      return Err(TranslationError::SortOnList(sort.field));
    }
  }

  Ok(())
}

fn validate_filter(filter: &Filter) -> Result<(), TranslationError> {
  let field = filter.field();
  let kind = field.kind();

  match filter {
    Filter::Contains { .. } => {
      if !matches!(kind, FieldKind::Text | FieldKind::List) {
        return Err(TranslationError::ContainsOnNonText { field });
      }
    }
    Filter::Gt { value, .. } | Filter::Gte { value, .. } | Filter::Lt { value, .. } | Filter::Lte { value, .. } => {
      if matches!(kind, FieldKind::Text | FieldKind::List) {
        return Err(TranslationError::OrderingOnText { op: filter.op(), field });
      }
      check_value(field, value)?;
    }
    Filter::Eq { value, .. } | Filter::Ne { value, .. } => check_value(field, value)?,
    Filter::In { values, .. } => {
      if values.is_empty() {
        return Err(TranslationError::EmptyIn { field });
      }
      for value in values {
        check_value(field, value)?;
      }
    }
  }

  Ok(())
}

fn check_value(field: FacilityField, value: &Scalar) -> Result<(), TranslationError> {
  let fits = match (field.kind(), value) {
    (FieldKind::Number, Scalar::Number(n)) => n.is_finite(),
    (FieldKind::Number, Scalar::Text(_)) => false,
    (FieldKind::Date, Scalar::Text(s)) => parse_date(s).is_some(),
    (FieldKind::Date, Scalar::Number(_)) => false,
    (FieldKind::Text | FieldKind::List, _) => true,
  };

  if fits {
    Ok(())
  } else {
    Err(TranslationError::ValueMismatch { field, value: value.to_string() })
  }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

// Execution
// =========

/// Executed query: rows plus a human-readable explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryOutcome {
  pub query: StructuredQuery,
  pub rows: Vec<Value>,
  pub count: usize,
  pub explanation: String,
}

enum FieldValue<'a> {
  Text(&'a str),
  List(&'a [String]),
  Number(f64),
  Date(Option<NaiveDate>),
}

fn field_value(facility: &Facility, field: FacilityField) -> FieldValue<'_> {
  match field {
    FacilityField::Id => FieldValue::Text(&facility.id),
    FacilityField::Name => FieldValue::Text(&facility.name),
    FacilityField::Region => FieldValue::Text(&facility.region),
    FacilityField::District => FieldValue::Text(&facility.district),
    FacilityField::Town => FieldValue::Text(&facility.town),
    FacilityField::FacilityType => FieldValue::Text(&facility.facility_type),
    FacilityField::Ownership => FieldValue::Text(&facility.ownership),
    FacilityField::Status => FieldValue::Text(&facility.status),
    FacilityField::Narrative => FieldValue::Text(&facility.narrative),
    FacilityField::Notes => FieldValue::Text(&facility.notes),
    FacilityField::Beds => FieldValue::Number(f64::from(facility.beds)),
    FacilityField::StaffCount => FieldValue::Number(f64::from(facility.staff_count)),
    FacilityField::Specialties => FieldValue::List(&facility.specialties),
    FacilityField::Equipment => FieldValue::List(&facility.equipment),
    FacilityField::Services => FieldValue::List(&facility.services),
    FacilityField::InspectionDate => FieldValue::Date(facility.inspection_date),
  }
}

fn scalar_text(value: &Scalar) -> String {
  match value {
    Scalar::Number(n) => n.to_string(),
    Scalar::Text(s) => s.clone(),
  }
}

/// Ordering of a field value against a literal; `None` when incomparable
fn compare(actual: &FieldValue<'_>, value: &Scalar) -> Option<Ordering> {
  match (actual, value) {
    (FieldValue::Number(n), Scalar::Number(v)) => n.partial_cmp(v),
    (FieldValue::Date(Some(date)), Scalar::Text(v)) => parse_date(v).map(|v| date.cmp(&v)),
    _ => None,
  }
}

fn equals(actual: &FieldValue<'_>, value: &Scalar) -> bool {
  match actual {
    FieldValue::Text(text) => text.to_lowercase() == scalar_text(value).to_lowercase(),
    FieldValue::List(items) => {
      let wanted = scalar_text(value).to_lowercase();
      items.iter().any(|item| item.to_lowercase() == wanted)
    }
    FieldValue::Number(_) | FieldValue::Date(_) => compare(actual, value) == Some(Ordering::Equal),
  }
}

fn contains(actual: &FieldValue<'_>, needle: &str) -> bool {
  let needle = needle.to_lowercase();
  match actual {
    FieldValue::Text(text) => text.to_lowercase().contains(&needle),
    FieldValue::List(items) => items.iter().any(|item| item.to_lowercase().contains(&needle)),
    FieldValue::Number(_) | FieldValue::Date(_) => false,
  }
}

pub fn matches(filter: &Filter, facility: &Facility) -> bool {
  let actual = field_value(facility, filter.field());
  match filter {
    Filter::Eq { value, .. } => equals(&actual, value),
    Filter::Ne { value, .. } => !equals(&actual, value),
    Filter::Contains { value, .. } => contains(&actual, value),
    Filter::Gt { value, .. } => compare(&actual, value) == Some(Ordering::Greater),
    Filter::Gte { value, .. } => matches!(compare(&actual, value), Some(Ordering::Greater | Ordering::Equal)),
    Filter::Lt { value, .. } => compare(&actual, value) == Some(Ordering::Less),
    Filter::Lte { value, .. } => matches!(compare(&actual, value), Some(Ordering::Less | Ordering::Equal)),
    Filter::In { values, .. } => values.iter().any(|value| equals(&actual, value)),
  }
}

fn sort_key_cmp(a: &Facility, b: &Facility, field: FacilityField) -> Ordering {
  match (field_value(a, field), field_value(b, field)) {
    (FieldValue::Text(x), FieldValue::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
    (FieldValue::Number(x), FieldValue::Number(y)) => x.total_cmp(&y),
    (FieldValue::Date(x), FieldValue::Date(y)) => x.cmp(&y),
    _ => Ordering::Equal,
  }
}

fn project(facility: &Facility, projection: &[FacilityField]) -> Value {
  let record = serde_json::to_value(facility).unwrap_or(Value::Null);
  if projection.is_empty() {
    return record;
  }

  let mut row = serde_json::Map::new();
  for field in projection {
    let value = record.get(field.as_str()).cloned().unwrap_or(Value::Null);
    row.insert(field.as_str().to_string(), value);
  }
  Value::Object(row)
}

/// Run a validated query over `facilities`
pub fn execute(query: StructuredQuery, facilities: &[Facility]) -> QueryOutcome {
  let mut selected: Vec<&Facility> =
    facilities.iter().filter(|facility| query.filters.iter().all(|filter| matches(filter, facility))).collect();

  if let Some(sort) = &query.sort {
    selected.sort_by(|a, b| {
      let ordering = sort_key_cmp(a, b, sort.field);
      match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
      }
    });
  }
  selected.truncate(query.effective_limit());

  let rows: Vec<Value> = selected.iter().map(|facility| project(facility, &query.projection)).collect();
  let count = rows.len();
  let explanation = query
    .explanation
    .clone()
    .filter(|text| !text.trim().is_empty())
    .unwrap_or_else(|| describe(&query, count));

  QueryOutcome { query, rows, count, explanation }
}

/// Synthesized explanation for queries the model did not explain
pub fn describe(query: &StructuredQuery, count: usize) -> String {
  let mut text = format!("Found {count} facilities");
  if !query.filters.is_empty() {
    let conditions: Vec<String> = query.filters.iter().map(Filter::describe).collect();
    text.push_str(&format!(" where {}", conditions.join(" and ")));
  }
  if let Some(sort) = &query.sort {
    let direction = match sort.direction {
      SortDirection::Asc => "ascending",
      SortDirection::Desc => "descending",
    };
    text.push_str(&format!(", sorted by {} {direction}", sort.field));
  }
  text.push_str(&format!(" (limit {}).", query.effective_limit()));
  text
}

// Prompt
// ======

/// System instructions for translating a question into the JSON query language
pub fn translation_prompt() -> String {
  let fields: Vec<String> = FacilityField::ALL
    .iter()
    .map(|field| {
      let kind = match field.kind() {
        FieldKind::Text => "text",
        FieldKind::List => "list of text",
        FieldKind::Number => "number",
        FieldKind::Date => "date YYYY-MM-DD",
      };
      format!("- {} ({kind})", field.as_str())
    })
    .collect();

  format!(
    "You translate questions about Ghanaian healthcare facilities into a JSON query.\n\
     Facility fields:\n{}\n\n\
     Reply with one JSON object and nothing else:\n\
     {{\"filters\": [{{\"op\": \"eq|ne|contains|gt|gte|lt|lte\", \"field\": \"...\", \"value\": ...}} \
     or {{\"op\": \"in\", \"field\": \"...\", \"values\": [...]}}],\n \
     \"sort\": {{\"field\": \"...\", \"direction\": \"asc|desc\"}},\n \
     \"limit\": 1-{MAX_LIMIT},\n \
     \"projection\": [\"field\", ...],\n \
     \"explanation\": \"one sentence\"}}\n\
     Filters are combined with AND. Use gt/gte/lt/lte only on numbers and dates, \
     and contains only on text or list fields.",
    fields.join("\n")
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn corpus() -> Vec<Facility> {
    vec![
      Facility {
        beds: 120,
        facility_type: "Hospital".into(),
        services: vec!["Surgery".into(), "Maternity".into()],
        inspection_date: NaiveDate::from_ymd_opt(2024, 5, 1),
        ..Facility::new("a", "Ho Teaching Hospital", "Volta")
      },
      Facility {
        beds: 15,
        facility_type: "Clinic".into(),
        services: vec!["Outpatient".into()],
        ..Facility::new("b", "Keta Clinic", "Volta")
      },
      Facility {
        beds: 300,
        facility_type: "Hospital".into(),
        services: vec!["Surgery".into()],
        inspection_date: NaiveDate::from_ymd_opt(2023, 1, 10),
        ..Facility::new("c", "Korle Bu", "Greater Accra")
      },
    ]
  }

  #[test]
  fn test_parse_fenced_reply() -> Result<(), TranslationError> {
    let reply = "Here you go:\n```json\n{\"filters\":[{\"op\":\"eq\",\"field\":\"region\",\"value\":\"Volta\"},\
                 {\"op\":\"gt\",\"field\":\"beds\",\"value\":50}],\"sort\":{\"field\":\"beds\",\"direction\":\"desc\"},\
                 \"limit\":5}\n```";
    let query = parse_reply(reply)?;

    assert_eq!(query.filters.len(), 2);
    assert_eq!(query.filters[1], Filter::Gt { field: FacilityField::Beds, value: Scalar::Number(50.0) });
    assert_eq!(query.sort.as_ref().map(|s| s.direction), Some(SortDirection::Desc));
    assert_eq!(query.limit, Some(5));
    Ok(())
  }

  #[test]
  fn test_fence_pattern_compiles_and_handles_untagged_fences() -> Result<(), TranslationError> {
    assert!(CODE_FENCE.is_ok());
    assert_eq!(strip_code_fences("```\n{\"limit\": 2}\n```")?, "{\"limit\": 2}");
    assert_eq!(strip_code_fences("  {\"limit\": 2}  ")?, "{\"limit\": 2}");
    Ok(())
  }

  #[test]
  fn test_parse_takes_first_object_and_ignores_trailing_text() -> Result<(), TranslationError> {
    let query = parse_reply("{\"limit\": 3} and also {\"limit\": 4}")?;
    assert_eq!(query.limit, Some(3));
    Ok(())
  }

  #[test]
  fn test_parse_rejections() {
    let cases = [
      ("no json here", "JSON object"),
      ("{\"filters\":[{\"op\":\"like\",\"field\":\"name\",\"value\":\"x\"}]}", "valid query"),
      ("{\"filters\":[{\"op\":\"eq\",\"field\":\"colour\",\"value\":\"x\"}]}", "valid query"),
      ("{\"filters\":[{\"op\":\"gt\",\"field\":\"name\",\"value\":3}]}", "is text"),
      ("{\"filters\":[{\"op\":\"contains\",\"field\":\"beds\",\"value\":\"3\"}]}", "not text"),
      ("{\"filters\":[{\"op\":\"in\",\"field\":\"region\",\"values\":[]}]}", "at least one value"),
      ("{\"filters\":[{\"op\":\"eq\",\"field\":\"beds\",\"value\":\"many\"}]}", "does not fit"),
      ("{\"limit\": 0}", "outside"),
      ("{\"limit\": 101}", "outside"),
      ("{\"projection\": [\"name\", \"name\"]}", "more than once"),
      ("{\"sort\": {\"field\": \"services\"}}", "list field"),
      ("{\"where\": {}}", "valid query"),
    ];

    for (reply, expected) in cases {
      let err = parse_reply(reply).unwrap_err();
      assert!(err.to_string().contains(expected), "{reply}: {err}");
    }
  }

  #[test]
  fn test_execute_filters_sorts_and_limits() -> Result<(), TranslationError> {
    let query = parse_reply(
      "{\"filters\":[{\"op\":\"contains\",\"field\":\"services\",\"value\":\"surg\"}],\
       \"sort\":{\"field\":\"beds\",\"direction\":\"desc\"},\"limit\":1}",
    )?;
    let outcome = execute(query, &corpus());

    assert_eq!(outcome.count, 1);
    assert_eq!(outcome.rows[0]["id"], "c");
    assert!(outcome.explanation.contains("services contains \"surg\""));
    assert!(outcome.explanation.contains("sorted by beds descending"));
    Ok(())
  }

  #[test]
  fn test_execute_text_comparisons_are_case_insensitive() {
    let query = StructuredQuery {
      filters: vec![Filter::In {
        field: FacilityField::Region,
        values: vec![Scalar::Text("volta".into()), Scalar::Text("ASHANTI".into())],
      }],
      ..StructuredQuery::default()
    };
    let outcome = execute(query, &corpus());
    assert_eq!(outcome.count, 2);
  }

  #[test]
  fn test_execute_dates_and_projection() -> Result<(), TranslationError> {
    let query = parse_reply(
      "{\"filters\":[{\"op\":\"gte\",\"field\":\"inspection_date\",\"value\":\"2024-01-01\"}],\
       \"projection\":[\"name\",\"beds\"],\"explanation\":\"Recently inspected\"}",
    )?;
    let outcome = execute(query, &corpus());

    assert_eq!(outcome.count, 1);
    assert_eq!(outcome.rows[0], serde_json::json!({ "name": "Ho Teaching Hospital", "beds": 120 }));
    assert_eq!(outcome.explanation, "Recently inspected");
    Ok(())
  }

  #[test]
  fn test_execute_default_limit_and_ne() {
    let query = StructuredQuery {
      filters: vec![Filter::Ne { field: FacilityField::FacilityType, value: Scalar::Text("clinic".into()) }],
      ..StructuredQuery::default()
    };
    let outcome = execute(query, &corpus());
    let ids: Vec<_> = outcome.rows.iter().map(|row| row["id"].as_str().unwrap_or_default().to_string()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert!(outcome.explanation.ends_with("(limit 20)."));
  }

  #[test]
  fn test_prompt_lists_every_field() {
    let prompt = translation_prompt();
    for field in FacilityField::ALL {
      assert!(prompt.contains(field.as_str()));
    }
  }
}
