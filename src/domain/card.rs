use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Rating;
use crate::error::{Result, SchedulerError};

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Lifecycle state of a learner's memory of one phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardState {
  New,
  Learning,
  Review,
  Relearning,
}

impl CardState {
  /// Parse a stored state. Unknown strings are rejected rather than mapped to New.
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "New" => Some(Self::New),
      "Learning" => Some(Self::Learning),
      "Review" => Some(Self::Review),
      "Relearning" => Some(Self::Relearning),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::New => "New",
      Self::Learning => "Learning",
      Self::Review => "Review",
      Self::Relearning => "Relearning",
    }
  }
}

/// Composite identity of a card: one learner, one phrase
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardKey {
  pub user_id: String,
  pub phrase_id: i64,
}

impl CardKey {
  pub fn new(user_id: impl Into<String>, phrase_id: i64) -> Self {
    Self {
      user_id: user_id.into(),
      phrase_id,
    }
  }
}

/// A learner's memory state for a single phrase card.
///
/// A missing record is an unseen card. Callers pass `Option<&CardStudy>`
/// and the scheduler treats `None` as New.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardStudy {
  pub user_id: String,
  pub phrase_id: i64,

  // Scheduling
  pub due_date: DateTime<Utc>,
  pub stability: f64,
  pub difficulty: f64,
  pub elapsed_days: f64,
  pub scheduled_days: f64,

  // History
  pub reps: u32,
  pub lapses: u32,
  pub state: CardState,
  pub last_review: Option<DateTime<Utc>>,
  pub last_rating: Option<Rating>,
}

impl CardStudy {
  /// An explicit New record. Mostly useful for callers that materialise
  /// placeholders; the scheduler itself never needs one.
  pub fn new(key: CardKey, now: DateTime<Utc>) -> Self {
    Self {
      user_id: key.user_id,
      phrase_id: key.phrase_id,
      due_date: now,
      stability: 0.0,
      difficulty: 0.0,
      elapsed_days: 0.0,
      scheduled_days: 0.0,
      reps: 0,
      lapses: 0,
      state: CardState::New,
      last_review: None,
      last_rating: None,
    }
  }

  pub fn key(&self) -> CardKey {
    CardKey::new(self.user_id.clone(), self.phrase_id)
  }

  /// Check the field combination is one the scheduler could have produced.
  pub fn validate(&self) -> Result<()> {
    if let Some(reason) = self.invalid_reason() {
      return Err(SchedulerError::InvalidState {
        user_id: self.user_id.clone(),
        phrase_id: self.phrase_id,
        reason,
      });
    }
    Ok(())
  }

  fn invalid_reason(&self) -> Option<String> {
    let reals = [
      ("stability", self.stability),
      ("difficulty", self.difficulty),
      ("elapsed_days", self.elapsed_days),
      ("scheduled_days", self.scheduled_days),
    ];
    for (name, value) in reals {
      if !value.is_finite() {
        return Some(format!("{} is not finite", name));
      }
    }
    if self.stability < 0.0 {
      return Some(format!("negative stability {}", self.stability));
    }
    if self.elapsed_days < 0.0 || self.scheduled_days < 0.0 {
      return Some("negative day count".to_string());
    }
    if self.lapses > self.reps {
      return Some(format!("lapses {} exceed reps {}", self.lapses, self.reps));
    }

    match self.state {
      CardState::New => {
        if self.reps > 0 {
          return Some(format!("New card with reps = {}", self.reps));
        }
        if self.last_review.is_some() {
          return Some("New card with a last_review".to_string());
        }
      }
      CardState::Learning | CardState::Review | CardState::Relearning => {
        if self.reps == 0 {
          return Some(format!("{} card with reps = 0", self.state.as_str()));
        }
        if self.last_review.is_none() {
          return Some(format!("{} card without a last_review", self.state.as_str()));
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty) {
          return Some(format!("difficulty {} outside [1, 10]", self.difficulty));
        }
      }
    }
    None
  }
}
