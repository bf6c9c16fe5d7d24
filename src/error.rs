//! Error types for scheduling operations.

use thiserror::Error;

/// Result type alias for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Everything the scheduler and its collaborators can fail with.
#[derive(Error, Debug)]
pub enum SchedulerError {
  /// Rating rank outside 1 (Again) ..= 4 (Easy).
  #[error("Invalid rating {0}: expected 1 (Again), 2 (Hard), 3 (Good) or 4 (Easy)")]
  InvalidRating(i64),

  /// A persisted record with an impossible field combination.
  #[error("Invalid card state for user {user_id}, phrase {phrase_id}: {reason}")]
  InvalidState {
    user_id: String,
    phrase_id: i64,
    reason: String,
  },

  /// Passed through unchanged from the persistence layer.
  #[error("Persistence failure: {0}")]
  PersistenceFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The FSRS model could not be built or evaluated.
  #[error("FSRS model error: {0}")]
  Model(String),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl SchedulerError {
  pub fn persistence<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::PersistenceFailure(Box::new(err))
  }

  pub fn is_invalid_rating(&self) -> bool {
    matches!(self, Self::InvalidRating(_))
  }

  pub fn is_invalid_state(&self) -> bool {
    matches!(self, Self::InvalidState { .. })
  }

  pub fn is_persistence_failure(&self) -> bool {
    matches!(self, Self::PersistenceFailure(_))
  }
}

impl From<rusqlite::Error> for SchedulerError {
  fn from(err: rusqlite::Error) -> Self {
    Self::persistence(err)
  }
}
