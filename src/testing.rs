//! Test fixtures: fixed clock, card builders and a throwaway SQLite store.

use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tempfile::TempDir;

use crate::domain::{CardState, CardStudy, Rating};
use crate::error::{Result, SchedulerError};
use crate::store::SqliteStore;

/// 2025-01-01T00:00:00Z
const EPOCH_SECS: i64 = 1_735_689_600;

pub const TEST_USER: &str = "user-1";

/// Fixed clock: `days` after 2025-01-01 midnight UTC.
pub fn at(days: i64) -> DateTime<Utc> {
  DateTime::from_timestamp(EPOCH_SECS, 0).unwrap_or_default() + Duration::days(days)
}

/// A Review-state card last reviewed at `last_review`, due `stability` days later.
pub fn review_card(
  phrase_id: i64,
  stability: f64,
  reps: u32,
  lapses: u32,
  last_review: DateTime<Utc>,
) -> CardStudy {
  let scheduled_days = stability.round().max(1.0);
  CardStudy {
    user_id: TEST_USER.to_string(),
    phrase_id,
    due_date: last_review + Duration::days(scheduled_days as i64),
    stability,
    difficulty: 5.0,
    elapsed_days: 0.0,
    scheduled_days,
    reps,
    lapses,
    state: CardState::Review,
    last_review: Some(last_review),
    last_rating: Some(Rating::Good),
  }
}

/// Card with an explicit due date and state, for queue tests.
pub fn due_card(phrase_id: i64, due_date: DateTime<Utc>, state: CardState) -> CardStudy {
  let mut card = review_card(phrase_id, 3.0, 2, 0, due_date - Duration::days(3));
  card.due_date = due_date;
  card.state = state;
  card
}

/// SQLite store living in a temporary directory, deleted on drop.
pub struct TestEnv {
  /// Kept alive for the database file
  pub temp: TempDir,
  pub store: SqliteStore,
}

impl TestEnv {
  pub fn new() -> Result<Self> {
    let temp = TempDir::new().map_err(SchedulerError::persistence)?;
    let store = SqliteStore::open(&temp.path().join("legendas.db"))?;
    Ok(Self { temp, store })
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }
}
