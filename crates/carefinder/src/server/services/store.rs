//! Document store abstraction for facilities, conversation turns and plans
//!
//! Collections are independent and append-only; integrity between them is by
//! matching identifier strings only. Two implementations are provided: an
//! in-memory store and a JSONL store that mirrors every write to disk.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bentley::journal::Journal;
use std::collections::HashSet;
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::server::models::{conversation::ConversationTurn, facility::Facility, plan::Plan};

/// Storage interface used by the retrieval, chat, query and planning paths
#[async_trait]
pub trait DocumentStore: Send + Sync {
  /// All facilities in load order
  async fn facilities(&self) -> Result<Vec<Facility>>;

  /// One facility by identifier
  async fn facility(&self, id: &str) -> Result<Option<Facility>>;

  /// Number of stored facilities
  async fn facility_count(&self) -> Result<usize>;

  /// Bulk insert; fails without writing anything if an identifier already exists
  async fn insert_facilities(&self, facilities: Vec<Facility>) -> Result<usize>;

  /// Append a conversation turn
  async fn append_turn(&self, turn: &ConversationTurn) -> Result<()>;

  /// The most recent `limit` turns of a session, oldest first
  async fn recent_turns(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>>;

  /// Every turn of a session, oldest first
  async fn session_history(&self, session_id: &str) -> Result<Vec<ConversationTurn>>;

  /// Persist a generated plan
  async fn save_plan(&self, plan: &Plan) -> Result<()>;

  /// One plan by identifier
  async fn plan(&self, id: Uuid) -> Result<Option<Plan>>;

  /// The `limit` most recently created plans, newest first
  async fn recent_plans(&self, limit: usize) -> Result<Vec<Plan>>;
}

#[derive(Default)]
struct Collections {
  facilities: Vec<Facility>,
  turns: Vec<ConversationTurn>,
  plans: Vec<Plan>,
}

impl Collections {
  fn check_new_ids(&self, incoming: &[Facility]) -> Result<()> {
    let existing: HashSet<&str> = self.facilities.iter().map(|f| f.id.as_str()).collect();
    let mut batch = HashSet::new();

    for facility in incoming {
      if existing.contains(facility.id.as_str()) || !batch.insert(facility.id.as_str()) {
        return Err(anyhow!("Facility '{}' already exists", facility.id));
      }
    }
    Ok(())
  }

  fn session_turns(&self, session_id: &str) -> Vec<ConversationTurn> {
    let mut turns: Vec<ConversationTurn> =
      self.turns.iter().filter(|turn| turn.session_id == session_id).cloned().collect();
    // Stable: equal timestamps keep append order
    turns.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    turns
  }
}

/// Volatile store used for tests and `--store memory`
#[derive(Default)]
pub struct MemoryStore {
  collections: RwLock<Collections>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store pre-populated with a facility corpus
  pub fn with_facilities(facilities: Vec<Facility>) -> Self {
    Self { collections: RwLock::new(Collections { facilities, ..Collections::default() }) }
  }
}

#[async_trait]
impl DocumentStore for MemoryStore {
  async fn facilities(&self) -> Result<Vec<Facility>> {
    Ok(self.collections.read().await.facilities.clone())
  }

  async fn facility(&self, id: &str) -> Result<Option<Facility>> {
    Ok(self.collections.read().await.facilities.iter().find(|f| f.id == id).cloned())
  }

  async fn facility_count(&self) -> Result<usize> {
    Ok(self.collections.read().await.facilities.len())
  }

  async fn insert_facilities(&self, facilities: Vec<Facility>) -> Result<usize> {
    let mut collections = self.collections.write().await;
    collections.check_new_ids(&facilities)?;
    let count = facilities.len();
    collections.facilities.extend(facilities);
    Ok(count)
  }

  async fn append_turn(&self, turn: &ConversationTurn) -> Result<()> {
    self.collections.write().await.turns.push(turn.clone());
    Ok(())
  }

  async fn recent_turns(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
    let mut turns = self.collections.read().await.session_turns(session_id);
    let skip = turns.len().saturating_sub(limit);
    turns.drain(..skip);
    Ok(turns)
  }

  async fn session_history(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
    Ok(self.collections.read().await.session_turns(session_id))
  }

  async fn save_plan(&self, plan: &Plan) -> Result<()> {
    self.collections.write().await.plans.push(plan.clone());
    Ok(())
  }

  async fn plan(&self, id: Uuid) -> Result<Option<Plan>> {
    Ok(self.collections.read().await.plans.iter().find(|p| p.id == id).cloned())
  }

  async fn recent_plans(&self, limit: usize) -> Result<Vec<Plan>> {
    let mut plans = self.collections.read().await.plans.clone();
    // Reversing first keeps the later save ahead on equal timestamps
    plans.reverse();
    plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    plans.truncate(limit);
    Ok(plans)
  }
}

/// Store persisted as one JSONL journal per collection under a data directory
///
/// Journals are replayed into memory on open; reads are served from memory and
/// every write is appended to disk before it becomes visible.
pub struct JsonlStore {
  memory: MemoryStore,
  facilities: Journal<Facility>,
  turns: Journal<ConversationTurn>,
  plans: Journal<Plan>,
}

impl JsonlStore {
  pub const FACILITIES_FILE: &'static str = "facilities.jsonl";
  pub const TURNS_FILE: &'static str = "turns.jsonl";
  pub const PLANS_FILE: &'static str = "plans.jsonl";

  /// Open the journals under `data_dir`, creating them if missing
  pub async fn open(data_dir: &Path) -> Result<Self> {
    let facilities = Journal::open(data_dir.join(Self::FACILITIES_FILE))?;
    let turns = Journal::open(data_dir.join(Self::TURNS_FILE))?;
    let plans = Journal::open(data_dir.join(Self::PLANS_FILE))?;

    let collections = Collections {
      facilities: facilities.read_all().await?,
      turns: turns.read_all().await?,
      plans: plans.read_all().await?,
    };

    Ok(Self { memory: MemoryStore { collections: RwLock::new(collections) }, facilities, turns, plans })
  }
}

#[async_trait]
impl DocumentStore for JsonlStore {
  async fn facilities(&self) -> Result<Vec<Facility>> {
    self.memory.facilities().await
  }

  async fn facility(&self, id: &str) -> Result<Option<Facility>> {
    self.memory.facility(id).await
  }

  async fn facility_count(&self) -> Result<usize> {
    self.memory.facility_count().await
  }

  async fn insert_facilities(&self, facilities: Vec<Facility>) -> Result<usize> {
    let mut collections = self.memory.collections.write().await;
    collections.check_new_ids(&facilities)?;
    self.facilities.append_all(&facilities).await?;

    let count = facilities.len();
    collections.facilities.extend(facilities);
    Ok(count)
  }

  async fn append_turn(&self, turn: &ConversationTurn) -> Result<()> {
    let mut collections = self.memory.collections.write().await;
    self.turns.append(turn).await?;
    collections.turns.push(turn.clone());
    Ok(())
  }

  async fn recent_turns(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
    self.memory.recent_turns(session_id, limit).await
  }

  async fn session_history(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
    self.memory.session_history(session_id).await
  }

  async fn save_plan(&self, plan: &Plan) -> Result<()> {
    let mut collections = self.memory.collections.write().await;
    self.plans.append(plan).await?;
    collections.plans.push(plan.clone());
    Ok(())
  }

  async fn plan(&self, id: Uuid) -> Result<Option<Plan>> {
    self.memory.plan(id).await
  }

  async fn recent_plans(&self, limit: usize) -> Result<Vec<Plan>> {
    self.memory.recent_plans(limit).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, Utc};
  use tempfile::TempDir;

  fn turn(session: &str, message: &str, offset_secs: i64) -> ConversationTurn {
    ConversationTurn {
      session_id: session.to_string(),
      message: message.to_string(),
      response: format!("re: {message}"),
      citations: Vec::new(),
      reasoning_steps: Vec::new(),
      created_at: Utc::now() + Duration::seconds(offset_secs),
    }
  }

  #[tokio::test]
  async fn test_recent_turns_returns_latest_window_in_order() -> Result<()> {
    let store = MemoryStore::new();
    for i in 0..7 {
      store.append_turn(&turn("s1", &format!("m{i}"), i)).await?;
    }
    store.append_turn(&turn("s2", "other", 0)).await?;

    let recent = store.recent_turns("s1", 5).await?;
    let messages: Vec<_> = recent.iter().map(|t| t.message.as_str()).collect();
    assert_eq!(messages, vec!["m2", "m3", "m4", "m5", "m6"]);

    assert!(store.recent_turns("missing", 5).await?.is_empty());
    Ok(())
  }

  #[tokio::test]
  async fn test_insert_facilities_rejects_existing_ids() -> Result<()> {
    let store = MemoryStore::with_facilities(vec![Facility::new("a", "A", "Volta")]);

    let err = store.insert_facilities(vec![Facility::new("a", "A2", "Volta")]).await.unwrap_err();
    assert!(err.to_string().contains("already exists"));

    let inserted = store.insert_facilities(vec![Facility::new("b", "B", "Volta")]).await?;
    assert_eq!(inserted, 1);
    assert_eq!(store.facility_count().await?, 2);
    assert_eq!(store.facility("b").await?.map(|f| f.name), Some("B".to_string()));
    Ok(())
  }

  #[tokio::test]
  async fn test_jsonl_store_survives_reopen() -> Result<()> {
    let dir = TempDir::new()?;

    {
      let store = JsonlStore::open(dir.path()).await?;
      store.insert_facilities(vec![Facility::new("a", "A", "Ashanti")]).await?;
      store.append_turn(&turn("s1", "hello", 0)).await?;
      store.append_turn(&turn("s1", "again", 1)).await?;
      store.save_plan(&Plan::new("Ashanti", None, None, "Build a theatre".into())).await?;
    }

    let reopened = JsonlStore::open(dir.path()).await?;
    assert_eq!(reopened.facility_count().await?, 1);

    let history = reopened.session_history("s1").await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].message, "hello");
    assert_eq!(history[1].message, "again");

    assert!(dir.path().join(JsonlStore::PLANS_FILE).exists());
    Ok(())
  }

  #[tokio::test]
  async fn test_plan_lookup_by_id() -> Result<()> {
    let store = MemoryStore::new();
    let plan = Plan::new("Volta", Some("Maternity"), Some("Rural districts first"), "Add midwives".into());
    store.save_plan(&plan).await?;

    assert_eq!(store.plan(plan.id).await?, Some(plan));
    assert_eq!(store.plan(Uuid::new_v4()).await?, None);
    Ok(())
  }

  #[tokio::test]
  async fn test_recent_plans_newest_first_and_limited() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JsonlStore::open(dir.path()).await?;

    for (i, region) in ["Volta", "Oti", "Bono"].iter().enumerate() {
      let mut plan = Plan::new(region, None, None, format!("plan {i}"));
      plan.created_at = Utc::now() + Duration::seconds(i as i64);
      store.save_plan(&plan).await?;
    }

    let recent = store.recent_plans(2).await?;
    let regions: Vec<_> = recent.iter().map(|p| p.region.as_str()).collect();
    assert_eq!(regions, vec!["Bono", "Oti"]);

    assert_eq!(store.recent_plans(20).await?.len(), 3);
    assert!(MemoryStore::new().recent_plans(20).await?.is_empty());
    Ok(())
  }

  #[tokio::test]
  async fn test_rejected_facility_batch_leaves_journal_untouched() -> Result<()> {
    let dir = TempDir::new()?;

    {
      let store = JsonlStore::open(dir.path()).await?;
      store.insert_facilities(vec![Facility::new("a", "A", "Ashanti")]).await?;

      let batch = vec![
        Facility::new("b", "B", "Volta"),
        Facility::new("c", "C", "Volta"),
        Facility::new("b", "B2", "Volta"),
      ];
      let err = store.insert_facilities(batch).await.unwrap_err();
      assert!(err.to_string().contains("'b' already exists"));
      assert_eq!(store.facility_count().await?, 1);
    }

    let lines = std::fs::read_to_string(dir.path().join(JsonlStore::FACILITIES_FILE))?;
    assert_eq!(lines.lines().count(), 1);

    let reopened = JsonlStore::open(dir.path()).await?;
    let batch = vec![Facility::new("b", "B", "Volta"), Facility::new("c", "C", "Volta")];
    assert_eq!(reopened.insert_facilities(batch).await?, 2);

    let reopened = JsonlStore::open(dir.path()).await?;
    let ids: Vec<_> = reopened.facilities().await?.into_iter().map(|f| f.id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    Ok(())
  }
}
