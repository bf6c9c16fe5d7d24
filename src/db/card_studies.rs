//! `card_studies` rows: one per (user, phrase)

use rusqlite::{params, Connection, OptionalExtension};

use super::{format_timestamp, parse_timestamp};
use crate::domain::{CardKey, CardState, CardStudy, Rating};
use crate::error::{Result, SchedulerError};

const SELECT_COLUMNS: &str = r#"
  SELECT user_id, phrase_id, due_date, stability, difficulty, elapsed_days, scheduled_days,
         reps, lapses, state, last_review, last_rating
  FROM card_studies
"#;

/// Row exactly as stored, before any interpretation
#[derive(Debug, Clone)]
struct CardStudyRow {
  user_id: String,
  phrase_id: i64,
  due_date: String,
  stability: f64,
  difficulty: f64,
  elapsed_days: f64,
  scheduled_days: f64,
  reps: i64,
  lapses: i64,
  state: String,
  last_review: Option<String>,
  last_rating: Option<i64>,
}

impl CardStudyRow {
  fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id: row.get(0)?,
      phrase_id: row.get(1)?,
      due_date: row.get(2)?,
      stability: row.get(3)?,
      difficulty: row.get(4)?,
      elapsed_days: row.get(5)?,
      scheduled_days: row.get(6)?,
      reps: row.get(7)?,
      lapses: row.get(8)?,
      state: row.get(9)?,
      last_review: row.get(10)?,
      last_rating: row.get(11)?,
    })
  }

  /// Interpret the row. Anything unparseable is an `InvalidState`, never a guess.
  fn into_card(self) -> Result<CardStudy> {
    let invalid = |reason: String| SchedulerError::InvalidState {
      user_id: self.user_id.clone(),
      phrase_id: self.phrase_id,
      reason,
    };

    let state = CardState::from_str(&self.state)
      .ok_or_else(|| invalid(format!("unknown state '{}'", self.state)))?;
    let reps = u32::try_from(self.reps).map_err(|_| invalid(format!("reps = {}", self.reps)))?;
    let lapses =
      u32::try_from(self.lapses).map_err(|_| invalid(format!("lapses = {}", self.lapses)))?;
    let due_date = parse_timestamp(&self.due_date)
      .ok_or_else(|| invalid(format!("unparseable due_date '{}'", self.due_date)))?;
    let last_review = match &self.last_review {
      Some(raw) => Some(
        parse_timestamp(raw).ok_or_else(|| invalid(format!("unparseable last_review '{}'", raw)))?,
      ),
      None => None,
    };
    let last_rating = match self.last_rating {
      Some(rank) => Some(
        Rating::from_rank(rank).map_err(|_| invalid(format!("stored rating {}", rank)))?,
      ),
      None => None,
    };

    let card = CardStudy {
      user_id: self.user_id,
      phrase_id: self.phrase_id,
      due_date,
      stability: self.stability,
      difficulty: self.difficulty,
      elapsed_days: self.elapsed_days,
      scheduled_days: self.scheduled_days,
      reps,
      lapses,
      state,
      last_review,
      last_rating,
    };
    card.validate()?;
    Ok(card)
  }
}

pub fn get_card_study(conn: &Connection, key: &CardKey) -> Result<Option<CardStudy>> {
  let row = conn
    .query_row(
      &format!("{} WHERE user_id = ?1 AND phrase_id = ?2", SELECT_COLUMNS),
      params![key.user_id, key.phrase_id],
      CardStudyRow::from_row,
    )
    .optional()?;
  row.map(CardStudyRow::into_card).transpose()
}

/// All cards for a user, in phrase order
pub fn list_card_studies(conn: &Connection, user_id: &str) -> Result<Vec<CardStudy>> {
  let mut stmt = conn.prepare(&format!(
    "{} WHERE user_id = ?1 ORDER BY phrase_id ASC",
    SELECT_COLUMNS
  ))?;
  let rows = stmt
    .query_map(params![user_id], CardStudyRow::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  rows.into_iter().map(CardStudyRow::into_card).collect()
}

/// Insert or replace the row for the card's (user, phrase)
pub fn upsert_card_study(conn: &Connection, card: &CardStudy) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO card_studies (user_id, phrase_id, due_date, stability, difficulty, elapsed_days,
                              scheduled_days, reps, lapses, state, last_review, last_rating)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
    ON CONFLICT (user_id, phrase_id) DO UPDATE SET
      due_date = excluded.due_date,
      stability = excluded.stability,
      difficulty = excluded.difficulty,
      elapsed_days = excluded.elapsed_days,
      scheduled_days = excluded.scheduled_days,
      reps = excluded.reps,
      lapses = excluded.lapses,
      state = excluded.state,
      last_review = excluded.last_review,
      last_rating = excluded.last_rating
    "#,
    params![
      card.user_id,
      card.phrase_id,
      format_timestamp(card.due_date),
      card.stability,
      card.difficulty,
      card.elapsed_days,
      card.scheduled_days,
      card.reps,
      card.lapses,
      card.state.as_str(),
      card.last_review.map(format_timestamp),
      card.last_rating.map(|r| r.rank()),
    ],
  )?;
  Ok(())
}
