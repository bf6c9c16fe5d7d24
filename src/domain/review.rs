use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CardState, CardStudy};
use crate::error::{Result, SchedulerError};

/// Learner's self-assessment after seeing a card, encoded as ranks 1-4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rating {
  Again = 1,
  Hard = 2,
  Good = 3,
  Easy = 4,
}

impl Rating {
  pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

  /// Parse a rank from the UI. Anything outside 1..=4 is `InvalidRating`.
  pub fn from_rank(rank: i64) -> Result<Self> {
    match rank {
      1 => Ok(Self::Again),
      2 => Ok(Self::Hard),
      3 => Ok(Self::Good),
      4 => Ok(Self::Easy),
      _ => Err(SchedulerError::InvalidRating(rank)),
    }
  }

  pub fn rank(&self) -> u8 {
    *self as u8
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Again => "Again",
      Self::Hard => "Hard",
      Self::Good => "Good",
      Self::Easy => "Easy",
    }
  }
}

/// Append-only record of one accepted review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLog {
  pub id: i64,
  pub user_id: String,
  pub phrase_id: i64,
  pub rating: Rating,
  pub previous_state: CardState,
  pub state: CardState,
  pub elapsed_days: f64,
  pub scheduled_days: f64,
  pub stability: f64,
  pub difficulty: f64,
  pub reviewed_at: DateTime<Utc>,
}

impl ReviewLog {
  /// Build the log entry for a freshly scheduled card.
  ///
  /// `previous_state` is `CardState::New` when there was no prior record.
  pub fn for_review(previous_state: CardState, card: &CardStudy, rating: Rating) -> Self {
    Self {
      id: 0,
      user_id: card.user_id.clone(),
      phrase_id: card.phrase_id,
      rating,
      previous_state,
      state: card.state,
      elapsed_days: card.elapsed_days,
      scheduled_days: card.scheduled_days,
      stability: card.stability,
      difficulty: card.difficulty,
      reviewed_at: card.last_review.unwrap_or(card.due_date),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{at, review_card};

  #[test]
  fn test_rating_from_rank_valid() {
    assert_eq!(Rating::from_rank(1).unwrap(), Rating::Again);
    assert_eq!(Rating::from_rank(2).unwrap(), Rating::Hard);
    assert_eq!(Rating::from_rank(3).unwrap(), Rating::Good);
    assert_eq!(Rating::from_rank(4).unwrap(), Rating::Easy);
  }

  #[test]
  fn test_rating_from_rank_invalid() {
    for rank in [0, 5, -1, 255] {
      let err = Rating::from_rank(rank).unwrap_err();
      assert!(matches!(err, SchedulerError::InvalidRating(r) if r == rank));
    }
  }

  #[test]
  fn test_rating_rank_values() {
    assert_eq!(Rating::Again.rank(), 1);
    assert_eq!(Rating::Hard.rank(), 2);
    assert_eq!(Rating::Good.rank(), 3);
    assert_eq!(Rating::Easy.rank(), 4);
  }

  #[test]
  fn test_rating_ordering_follows_rank() {
    assert!(Rating::Again < Rating::Hard);
    assert!(Rating::Hard < Rating::Good);
    assert!(Rating::Good < Rating::Easy);
  }

  #[test]
  fn test_rating_serde() {
    assert_eq!(serde_json::to_string(&Rating::Good).unwrap(), "\"Good\"");
    let parsed: Rating = serde_json::from_str("\"Again\"").unwrap();
    assert_eq!(parsed, Rating::Again);
  }

  #[test]
  fn test_review_log_copies_card_fields() {
    let card = review_card(9, 4.5, 3, 1, at(10));
    let log = ReviewLog::for_review(CardState::Relearning, &card, Rating::Good);

    assert_eq!(log.id, 0);
    assert_eq!(log.user_id, card.user_id);
    assert_eq!(log.phrase_id, 9);
    assert_eq!(log.rating, Rating::Good);
    assert_eq!(log.previous_state, CardState::Relearning);
    assert_eq!(log.state, CardState::Review);
    assert_eq!(log.stability, 4.5);
    assert_eq!(Some(log.reviewed_at), card.last_review);
  }
}
