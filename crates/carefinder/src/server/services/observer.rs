//! Experiment tracking for chat requests
//!
//! Emission is fire-and-forget: observers never block the request path and
//! never surface errors to it.

use anyhow::Result;
use async_trait::async_trait;
use bentley::journal::Journal;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;

/// One timed step of a traced request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentEvent {
  pub trace_id: Uuid,
  pub run: String,
  pub step: String,
  pub duration_ms: f64,
  #[serde(default)]
  pub params: serde_json::Value,
  pub recorded_at: DateTime<Utc>,
}

/// Timing and parameters of one step within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunStep {
  pub step: String,
  pub duration_ms: f64,
  pub params: serde_json::Value,
}

/// All recorded steps of one trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExperimentRun {
  pub trace_id: Uuid,
  pub run: String,
  pub started_at: DateTime<Utc>,
  pub total_duration_ms: f64,
  pub steps: Vec<RunStep>,
}

/// Group events by trace, newest run first, keeping at most `limit` runs
pub fn group_runs(events: Vec<ExperimentEvent>, limit: usize) -> Vec<ExperimentRun> {
  let mut order: Vec<Uuid> = Vec::new();
  let mut runs: HashMap<Uuid, ExperimentRun> = HashMap::new();

  for event in events {
    let run = runs.entry(event.trace_id).or_insert_with(|| {
      order.push(event.trace_id);
      ExperimentRun {
        trace_id: event.trace_id,
        run: event.run.clone(),
        started_at: event.recorded_at,
        total_duration_ms: 0.0,
        steps: Vec::new(),
      }
    });
    run.started_at = run.started_at.min(event.recorded_at);
    run.total_duration_ms += event.duration_ms;
    run.steps.push(RunStep { step: event.step, duration_ms: event.duration_ms, params: event.params });
  }

  // Later traces first on equal start times
  order.reverse();
  let mut runs: Vec<ExperimentRun> = order.into_iter().filter_map(|id| runs.remove(&id)).collect();
  runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
  runs.truncate(limit);
  runs
}

#[async_trait]
pub trait ExperimentObserver: Send + Sync {
  /// Open a trace; `None` when tracking is disabled
  fn start_trace(&self, run: &str) -> Option<Uuid>;

  /// Record an event without waiting
  fn emit(&self, event: ExperimentEvent);

  /// Recorded runs, newest first; empty when nothing is persisted
  async fn runs(&self, _limit: usize) -> Result<Vec<ExperimentRun>> {
    Ok(Vec::new())
  }
}

/// Observer used when tracking is off
pub struct NullObserver;

impl ExperimentObserver for NullObserver {
  fn start_trace(&self, _run: &str) -> Option<Uuid> {
    None
  }

  fn emit(&self, _event: ExperimentEvent) {}
}

/// Forwards events over a channel to a background task appending to a journal
pub struct JournalObserver {
  sender: mpsc::UnboundedSender<ExperimentEvent>,
  journal: Journal<ExperimentEvent>,
}

impl JournalObserver {
  pub const FILE_NAME: &'static str = "experiments.jsonl";

  /// Start the writer task; must be called inside a tokio runtime
  pub fn spawn(journal: Journal<ExperimentEvent>) -> Self {
    let (sender, mut receiver) = mpsc::unbounded_channel::<ExperimentEvent>();
    let writer = journal.clone();

    tokio::spawn(async move {
      while let Some(event) = receiver.recv().await {
        if let Err(e) = writer.append(&event).await {
          tracing::warn!("dropping experiment event {}: {}", event.step, e);
        }
      }
    });

    Self { sender, journal }
  }
}

#[async_trait]
impl ExperimentObserver for JournalObserver {
  fn start_trace(&self, _run: &str) -> Option<Uuid> {
    Some(Uuid::new_v4())
  }

  fn emit(&self, event: ExperimentEvent) {
    // Writer gone: drop silently
    let _ = self.sender.send(event);
  }

  async fn runs(&self, limit: usize) -> Result<Vec<ExperimentRun>> {
    Ok(group_runs(self.journal.read_all().await?, limit))
  }
}

/// Times consecutive steps of one trace
pub struct Trace<'a> {
  observer: &'a dyn ExperimentObserver,
  trace_id: Option<Uuid>,
  run: String,
  step_started: Instant,
}

impl<'a> Trace<'a> {
  pub fn start(observer: &'a dyn ExperimentObserver, run: &str) -> Self {
    Self { observer, trace_id: observer.start_trace(run), run: run.to_string(), step_started: Instant::now() }
  }

  pub fn id(&self) -> Option<Uuid> {
    self.trace_id
  }

  /// Close the current step and start timing the next one
  pub fn step(&mut self, name: &str, params: serde_json::Value) {
    let duration_ms = self.step_started.elapsed().as_secs_f64() * 1000.0;
    self.step_started = Instant::now();

    if let Some(trace_id) = self.trace_id {
      self.observer.emit(ExperimentEvent {
        trace_id,
        run: self.run.clone(),
        step: name.to_string(),
        duration_ms,
        params,
        recorded_at: Utc::now(),
      });
    }
  }
}
