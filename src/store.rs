//! Persistence boundary for `CardStudy` records.
//!
//! The scheduler only needs load/save by key. `SqliteStore` is the
//! reference implementation; `MemoryStore` backs tests and embedders that
//! keep state elsewhere.

use std::collections::HashMap;
use std::path::Path;

use crate::db::{self, DbPool};
use crate::domain::{CardKey, CardStudy, ReviewLog};
use crate::error::{Result, SchedulerError};

pub trait CardStudyStore {
  /// `None` means the learner has never reviewed this phrase.
  fn load_card_study(&self, key: &CardKey) -> Result<Option<CardStudy>>;

  /// Persist the new record together with its review log, atomically.
  fn save_card_study(&mut self, card: &CardStudy, log: &ReviewLog) -> Result<()>;

  fn list_card_studies(&self, user_id: &str) -> Result<Vec<CardStudy>>;
}

/// SQLite-backed store sharing a locked connection
#[derive(Clone)]
pub struct SqliteStore {
  pool: DbPool,
}

impl SqliteStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }

  pub fn open(path: &Path) -> Result<Self> {
    Ok(Self::new(db::init_db(path)?))
  }

  pub fn open_in_memory() -> Result<Self> {
    Ok(Self::new(db::init_memory_db()?))
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }

  pub fn review_logs(&self, key: &CardKey) -> Result<Vec<ReviewLog>> {
    let conn = db::try_lock(&self.pool).map_err(SchedulerError::persistence)?;
    db::get_review_logs(&conn, key)
  }
}

impl CardStudyStore for SqliteStore {
  fn load_card_study(&self, key: &CardKey) -> Result<Option<CardStudy>> {
    let conn = db::try_lock(&self.pool).map_err(SchedulerError::persistence)?;
    db::get_card_study(&conn, key)
  }

  fn save_card_study(&mut self, card: &CardStudy, log: &ReviewLog) -> Result<()> {
    let mut conn = db::try_lock(&self.pool).map_err(SchedulerError::persistence)?;
    let tx = conn.transaction()?;
    db::upsert_card_study(&tx, card)?;
    db::insert_review_log(&tx, log)?;
    tx.commit()?;
    Ok(())
  }

  fn list_card_studies(&self, user_id: &str) -> Result<Vec<CardStudy>> {
    let conn = db::try_lock(&self.pool).map_err(SchedulerError::persistence)?;
    db::list_card_studies(&conn, user_id)
  }
}

/// HashMap-backed store. Review logs are kept in submission order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  cards: HashMap<CardKey, CardStudy>,
  logs: Vec<ReviewLog>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Seed a record directly, bypassing the scheduler
  pub fn insert(&mut self, card: CardStudy) {
    self.cards.insert(card.key(), card);
  }

  pub fn logs(&self) -> &[ReviewLog] {
    &self.logs
  }
}

impl CardStudyStore for MemoryStore {
  fn load_card_study(&self, key: &CardKey) -> Result<Option<CardStudy>> {
    Ok(self.cards.get(key).cloned())
  }

  fn save_card_study(&mut self, card: &CardStudy, log: &ReviewLog) -> Result<()> {
    self.cards.insert(card.key(), card.clone());
    self.logs.push(log.clone());
    Ok(())
  }

  fn list_card_studies(&self, user_id: &str) -> Result<Vec<CardStudy>> {
    let mut cards: Vec<CardStudy> = self
      .cards
      .values()
      .filter(|card| card.user_id == user_id)
      .cloned()
      .collect();
    cards.sort_by_key(|card| card.phrase_id);
    Ok(cards)
  }
}
