//! Review history

use rusqlite::{params, Connection};

use super::{format_timestamp, parse_timestamp};
use crate::domain::{CardKey, CardState, Rating, ReviewLog};
use crate::error::{Result, SchedulerError};

pub fn insert_review_log(conn: &Connection, log: &ReviewLog) -> Result<i64> {
  conn.execute(
    r#"
    INSERT INTO review_logs (user_id, phrase_id, rating, previous_state, state, elapsed_days,
                             scheduled_days, stability, difficulty, reviewed_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    "#,
    params![
      log.user_id,
      log.phrase_id,
      log.rating.rank(),
      log.previous_state.as_str(),
      log.state.as_str(),
      log.elapsed_days,
      log.scheduled_days,
      log.stability,
      log.difficulty,
      format_timestamp(log.reviewed_at),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

/// Review history of one card, oldest first
pub fn get_review_logs(conn: &Connection, key: &CardKey) -> Result<Vec<ReviewLog>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT id, user_id, phrase_id, rating, previous_state, state, elapsed_days, scheduled_days,
           stability, difficulty, reviewed_at
    FROM review_logs
    WHERE user_id = ?1 AND phrase_id = ?2
    ORDER BY reviewed_at ASC, id ASC
    "#,
  )?;

  let rows = stmt
    .query_map(params![key.user_id, key.phrase_id], |row| {
      Ok((
        row.get::<_, i64>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, i64>(2)?,
        row.get::<_, i64>(3)?,
        row.get::<_, String>(4)?,
        row.get::<_, String>(5)?,
        row.get::<_, f64>(6)?,
        row.get::<_, f64>(7)?,
        row.get::<_, f64>(8)?,
        row.get::<_, f64>(9)?,
        row.get::<_, String>(10)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows
    .into_iter()
    .map(
      |(id, user_id, phrase_id, rank, previous, state, elapsed, scheduled, s, d, reviewed_at)|
       -> Result<ReviewLog> {
        let invalid = |reason: String| SchedulerError::InvalidState {
          user_id: user_id.clone(),
          phrase_id,
          reason: format!("review log {}: {}", id, reason),
        };
        let parse_state = |raw: &str| {
          CardState::from_str(raw).ok_or_else(|| invalid(format!("unknown state '{}'", raw)))
        };
        let log = ReviewLog {
          id,
          rating: Rating::from_rank(rank).map_err(|_| invalid(format!("rating {}", rank)))?,
          previous_state: parse_state(&previous)?,
          state: parse_state(&state)?,
          elapsed_days: elapsed,
          scheduled_days: scheduled,
          stability: s,
          difficulty: d,
          reviewed_at: parse_timestamp(&reviewed_at)
            .ok_or_else(|| invalid(format!("unparseable reviewed_at '{}'", reviewed_at)))?,
          user_id: user_id.clone(),
          phrase_id,
        };
        Ok(log)
      },
    )
    .collect()
}
