//! Review workflow for one authenticated learner.
//!
//! Ties the caller-supplied identity, a `CardStudyStore` and the
//! `Scheduler` together. The user id is trusted as given.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{CardKey, CardState, CardStudy, Rating, ReviewLog};
use crate::error::Result;
use crate::srs::{
  next_due_date, project_progress, select_due_cards, summarize_progress, ProgressProjection,
  ProgressSummary, Scheduler,
};
use crate::store::CardStudyStore;

/// Result of an accepted review
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewOutcome {
  pub card: CardStudy,
  pub previous_state: CardState,
  pub progress: ProgressProjection,
}

/// Review queue for a learner at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueQueue {
  pub due_count: usize,
  /// Earliest upcoming due date, shown when nothing is due yet
  pub next_due: Option<DateTime<Utc>>,
  pub cards: Vec<CardStudy>,
}

pub struct ReviewService<S: CardStudyStore> {
  store: S,
  scheduler: Scheduler,
}

impl<S: CardStudyStore> ReviewService<S> {
  pub fn new(store: S, scheduler: Scheduler) -> Self {
    Self { store, scheduler }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn scheduler(&self) -> &Scheduler {
    &self.scheduler
  }

  /// Grade a phrase with a raw rank from the UI (1 = Again .. 4 = Easy).
  ///
  /// Nothing is written unless every step succeeds, so a failed submission
  /// leaves the stored record as it was.
  pub fn submit_review(
    &mut self,
    user_id: &str,
    phrase_id: i64,
    rank: i64,
    now: DateTime<Utc>,
  ) -> Result<ReviewOutcome> {
    let rating = Rating::from_rank(rank)?;
    let key = CardKey::new(user_id, phrase_id);

    let prior = self.store.load_card_study(&key)?;
    let previous_state = prior.as_ref().map_or(CardState::New, |c| c.state);
    let card = self.scheduler.record_review(&key, prior.as_ref(), rating, now)?;

    let log = ReviewLog::for_review(previous_state, &card, rating);
    self.store.save_card_study(&card, &log)?;

    let progress = project_progress(Some(&card));
    Ok(ReviewOutcome {
      card,
      previous_state,
      progress,
    })
  }

  /// Next interval for each answer button, without saving anything
  pub fn preview(
    &self,
    user_id: &str,
    phrase_id: i64,
    now: DateTime<Utc>,
  ) -> Result<Vec<(Rating, CardStudy)>> {
    let key = CardKey::new(user_id, phrase_id);
    let prior = self.store.load_card_study(&key)?;
    self.scheduler.preview(&key, prior.as_ref(), now)
  }

  /// Cards due for review, earliest first
  pub fn due_cards(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<CardStudy>> {
    let cards = self.store.list_card_studies(user_id)?;
    Ok(select_due_cards(&cards, now).cloned().collect())
  }

  /// Due cards together with their count and the next upcoming due date
  pub fn due_queue(&self, user_id: &str, now: DateTime<Utc>) -> Result<DueQueue> {
    let cards = self.store.list_card_studies(user_id)?;
    let due = select_due_cards(&cards, now);
    Ok(DueQueue {
      due_count: due.len(),
      next_due: next_due_date(&cards, now),
      cards: due.cloned().collect(),
    })
  }

  /// When the learner's next card becomes due, strictly after `now`
  pub fn next_due(&self, user_id: &str, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    let cards = self.store.list_card_studies(user_id)?;
    Ok(next_due_date(&cards, now))
  }

  pub fn progress(&self, user_id: &str, phrase_id: i64) -> Result<ProgressProjection> {
    let card = self.store.load_card_study(&CardKey::new(user_id, phrase_id))?;
    Ok(project_progress(card.as_ref()))
  }

  pub fn summary(&self, user_id: &str) -> Result<ProgressSummary> {
    let cards = self.store.list_card_studies(user_id)?;
    Ok(summarize_progress(&cards))
  }
}
