use chrono::{DateTime, Duration, Utc};
use fsrs::{ItemState, MemoryState, NextStates, DEFAULT_PARAMETERS, FSRS};

use crate::config::SchedulerConfig;
use crate::domain::{CardKey, CardState, CardStudy, Rating, MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::error::{Result, SchedulerError};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// FSRS scheduler with a New/Learning/Review/Relearning state machine on top.
///
/// Stateless apart from the FSRS model: every call takes the prior record
/// and `now` explicitly, and no randomness (fuzz) is applied to intervals.
pub struct Scheduler {
  fsrs: FSRS,
  config: SchedulerConfig,
}

impl Scheduler {
  pub fn new(config: SchedulerConfig) -> Result<Self> {
    let fsrs = FSRS::new(Some(&DEFAULT_PARAMETERS))
      .map_err(|e| SchedulerError::Model(format!("failed to initialize FSRS: {:?}", e)))?;
    Ok(Self { fsrs, config })
  }

  pub fn config(&self) -> &SchedulerConfig {
    &self.config
  }

  /// Apply one review to a card.
  ///
  /// `prior` is `None` for a phrase the learner has never reviewed.
  /// `reps` always increases by one; `lapses` increases on Again unless the
  /// card was New.
  pub fn record_review(
    &self,
    key: &CardKey,
    prior: Option<&CardStudy>,
    rating: Rating,
    now: DateTime<Utc>,
  ) -> Result<CardStudy> {
    let next_states = self.next_states(key, prior, now)?;
    let card = self.apply(key, prior, rating, pick(&next_states, rating), now)?;

    tracing::debug!(
      "Review {}#{}: {} {} -> {} (s={:.3}, d={:.3}, +{:.2}d)",
      key.user_id,
      key.phrase_id,
      rating.as_str(),
      prior.map_or(CardState::New, |c| c.state).as_str(),
      card.state.as_str(),
      card.stability,
      card.difficulty,
      card.scheduled_days
    );
    Ok(card)
  }

  /// What each rating would produce, without committing to one.
  /// Used to label answer buttons with their next interval.
  pub fn preview(
    &self,
    key: &CardKey,
    prior: Option<&CardStudy>,
    now: DateTime<Utc>,
  ) -> Result<Vec<(Rating, CardStudy)>> {
    let next_states = self.next_states(key, prior, now)?;
    Rating::ALL
      .iter()
      .map(|&rating| {
        let card = self.apply(key, prior, rating, pick(&next_states, rating), now)?;
        Ok((rating, card))
      })
      .collect()
  }

  fn next_states(
    &self,
    key: &CardKey,
    prior: Option<&CardStudy>,
    now: DateTime<Utc>,
  ) -> Result<NextStates> {
    if let Some(card) = prior {
      card.validate()?;
      if card.user_id != key.user_id || card.phrase_id != key.phrase_id {
        return Err(SchedulerError::InvalidState {
          user_id: key.user_id.clone(),
          phrase_id: key.phrase_id,
          reason: format!(
            "record belongs to user {}, phrase {}",
            card.user_id, card.phrase_id
          ),
        });
      }
    }

    let memory = prior
      .filter(|c| c.state != CardState::New)
      .map(|c| MemoryState {
        stability: c.stability as f32,
        difficulty: c.difficulty as f32,
      });
    let elapsed = elapsed_days(prior, now).floor() as u32;

    self
      .fsrs
      .next_states(memory, self.config.desired_retention as f32, elapsed)
      .map_err(|e| SchedulerError::Model(format!("failed to calculate next states: {:?}", e)))
  }

  fn apply(
    &self,
    key: &CardKey,
    prior: Option<&CardStudy>,
    rating: Rating,
    item: &ItemState,
    now: DateTime<Utc>,
  ) -> Result<CardStudy> {
    let prior_state = prior.map_or(CardState::New, |c| c.state);
    let raw_stability = item.memory.stability as f64;
    let stability = raw_stability.max(self.config.stability_floor);
    let difficulty = (item.memory.difficulty as f64).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);

    // Interval is proportional to stability, so a floored stability scales it too
    let interval = if raw_stability > 0.0 {
      item.interval as f64 * (stability / raw_stability)
    } else {
      item.interval as f64
    };
    let interval = interval.clamp(0.0, self.config.maximum_interval_days);

    let state = next_card_state(prior_state, rating, interval, self.config.graduation_days);
    let scheduled_days = if state == CardState::Review {
      interval.round().max(1.0).min(self.config.maximum_interval_days)
    } else {
      interval
    };

    let lapsed = rating == Rating::Again && prior_state != CardState::New;
    let (reps, lapses) = prior.map_or((0, 0), |c| (c.reps, c.lapses));
    let exhausted = |counter: &str| SchedulerError::InvalidState {
      user_id: key.user_id.clone(),
      phrase_id: key.phrase_id,
      reason: format!("{} counter is exhausted", counter),
    };
    let reps = reps.checked_add(1).ok_or_else(|| exhausted("reps"))?;
    let lapses = if lapsed {
      lapses.checked_add(1).ok_or_else(|| exhausted("lapses"))?
    } else {
      lapses
    };

    Ok(CardStudy {
      user_id: key.user_id.clone(),
      phrase_id: key.phrase_id,
      due_date: now + Duration::seconds((scheduled_days * SECONDS_PER_DAY).round() as i64),
      stability,
      difficulty,
      elapsed_days: elapsed_days(prior, now),
      scheduled_days,
      reps,
      lapses,
      state,
      last_review: Some(now),
      last_rating: Some(rating),
    })
  }
}

fn pick(next_states: &NextStates, rating: Rating) -> &ItemState {
  match rating {
    Rating::Again => &next_states.again,
    Rating::Hard => &next_states.hard,
    Rating::Good => &next_states.good,
    Rating::Easy => &next_states.easy,
  }
}

/// Days since the last review, or since the due date if never reviewed.
/// Never negative; zero for a New card.
pub fn elapsed_days(prior: Option<&CardStudy>, now: DateTime<Utc>) -> f64 {
  let Some(card) = prior.filter(|c| c.state != CardState::New) else {
    return 0.0;
  };
  let since = card.last_review.unwrap_or(card.due_date);
  ((now - since).num_seconds() as f64 / SECONDS_PER_DAY).max(0.0)
}

/// State machine over a card's lifecycle
pub fn next_card_state(
  prior: CardState,
  rating: Rating,
  interval_days: f64,
  graduation_days: f64,
) -> CardState {
  match (prior, rating) {
    (CardState::New, _) => CardState::Learning,
    (CardState::Review, Rating::Again) => CardState::Relearning,
    (CardState::Review, _) => CardState::Review,
    (CardState::Learning, Rating::Again) => CardState::Learning,
    (CardState::Relearning, Rating::Again) => CardState::Relearning,
    (CardState::Learning | CardState::Relearning, _) if interval_days >= graduation_days => {
      CardState::Review
    }
    (state, _) => state,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::DEFAULT_STABILITY_FLOOR;
  use crate::testing::{at, review_card, TEST_USER};

  fn scheduler() -> Scheduler {
    Scheduler::new(SchedulerConfig::default()).unwrap()
  }

  fn key(phrase_id: i64) -> CardKey {
    CardKey::new(TEST_USER, phrase_id)
  }

  fn learning_card() -> CardStudy {
    let mut card = review_card(1, 1.5, 1, 0, at(0));
    card.state = CardState::Learning;
    card
  }

  #[test]
  fn test_new_card_good_enters_learning() {
    let card = scheduler().record_review(&key(1), None, Rating::Good, at(0)).unwrap();

    assert_eq!(card.state, CardState::Learning);
    assert_eq!(card.reps, 1);
    assert_eq!(card.lapses, 0);
    assert!(card.due_date > at(0));
    assert_eq!(card.last_review, Some(at(0)));
    assert_eq!(card.last_rating, Some(Rating::Good));
    assert_eq!(card.elapsed_days, 0.0);
    assert!(card.validate().is_ok());
  }

  #[test]
  fn test_new_card_any_rating_enters_learning() {
    let s = scheduler();
    for rating in Rating::ALL {
      let card = s.record_review(&key(1), None, rating, at(0)).unwrap();
      assert_eq!(card.state, CardState::Learning, "rating {:?}", rating);
      assert_eq!(card.lapses, 0, "Again on a New card is not a lapse");
    }
  }

  #[test]
  fn test_explicit_new_record_behaves_like_absent() {
    let s = scheduler();
    let new_record = CardStudy::new(key(1), at(0));
    let from_none = s.record_review(&key(1), None, Rating::Hard, at(0)).unwrap();
    let from_new = s.record_review(&key(1), Some(&new_record), Rating::Hard, at(0)).unwrap();
    assert_eq!(from_none, from_new);
  }

  #[test]
  fn test_again_after_learning_is_lapse_and_drops_stability() {
    let s = scheduler();
    let first = s.record_review(&key(1), None, Rating::Good, at(0)).unwrap();
    let second = s
      .record_review(&key(1), Some(&first), Rating::Again, first.due_date)
      .unwrap();

    assert_eq!(second.state, CardState::Learning);
    assert_eq!(second.reps, 2);
    assert_eq!(second.lapses, 1);
    assert!(second.stability < first.stability);
    assert!(second.elapsed_days > 0.0);
  }

  #[test]
  fn test_review_again_goes_to_relearning() {
    let prior = review_card(1, 10.0, 5, 0, at(0));
    let card = scheduler()
      .record_review(&key(1), Some(&prior), Rating::Again, at(10))
      .unwrap();

    assert_eq!(card.state, CardState::Relearning);
    assert_eq!(card.lapses, 1);
    assert_eq!(card.reps, 6);
    assert!(card.stability < prior.stability);
  }

  #[test]
  fn test_review_good_stays_review_with_whole_days() {
    let prior = review_card(1, 10.0, 5, 0, at(0));
    let card = scheduler()
      .record_review(&key(1), Some(&prior), Rating::Good, at(10))
      .unwrap();

    assert_eq!(card.state, CardState::Review);
    assert!(card.stability > prior.stability);
    assert!(card.scheduled_days >= 1.0);
    assert_eq!(card.scheduled_days, card.scheduled_days.round());
    assert_eq!(card.due_date, at(10) + Duration::days(card.scheduled_days as i64));
  }

  #[test]
  fn test_stability_floor_holds_after_lapse() {
    let prior = review_card(1, 0.5, 4, 2, at(0));
    let card = scheduler()
      .record_review(&key(1), Some(&prior), Rating::Again, at(3))
      .unwrap();
    assert!(card.stability >= DEFAULT_STABILITY_FLOOR);
  }

  #[test]
  fn test_difficulty_stays_clamped() {
    let s = scheduler();
    let mut card = s.record_review(&key(1), None, Rating::Again, at(0)).unwrap();
    for day in 1..30 {
      card = s.record_review(&key(1), Some(&card), Rating::Again, at(day)).unwrap();
      assert!((MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&card.difficulty));
    }
    for day in 30..60 {
      card = s.record_review(&key(1), Some(&card), Rating::Easy, at(day)).unwrap();
      assert!((MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&card.difficulty));
    }
  }

  fn assert_monotonic(prior: Option<&CardStudy>, now: DateTime<Utc>) {
    let outcomes = scheduler().preview(&key(1), prior, now).unwrap();
    let cards: Vec<&CardStudy> = outcomes.iter().map(|(_, c)| c).collect();
    for pair in cards.windows(2) {
      let (harder, easier) = (pair[0], pair[1]);
      assert!(
        easier.stability >= harder.stability,
        "stability {} < {}",
        easier.stability,
        harder.stability
      );
      assert!(easier.scheduled_days >= harder.scheduled_days);
      assert!(easier.difficulty <= harder.difficulty);
    }
  }

  #[test]
  fn test_monotonic_for_new_card() {
    assert_monotonic(None, at(0));
  }

  #[test]
  fn test_monotonic_for_learning_card() {
    assert_monotonic(Some(&learning_card()), at(2));
  }

  #[test]
  fn test_monotonic_for_review_card() {
    let prior = review_card(1, 12.0, 6, 1, at(0));
    assert_monotonic(Some(&prior), at(12));
    assert_monotonic(Some(&prior), at(30));
  }

  #[test]
  fn test_monotonic_same_day() {
    let prior = review_card(1, 3.0, 2, 0, at(0));
    assert_monotonic(Some(&prior), at(0));
  }

  #[test]
  fn test_preview_matches_record_review() {
    let s = scheduler();
    let prior = review_card(1, 7.0, 4, 0, at(0));
    for (rating, previewed) in s.preview(&key(1), Some(&prior), at(7)).unwrap() {
      let recorded = s.record_review(&key(1), Some(&prior), rating, at(7)).unwrap();
      assert_eq!(previewed, recorded);
    }
  }

  #[test]
  fn test_deterministic() {
    let s = scheduler();
    let prior = review_card(1, 7.0, 4, 0, at(0));
    let a = s.record_review(&key(1), Some(&prior), Rating::Hard, at(8)).unwrap();
    let b = s.record_review(&key(1), Some(&prior), Rating::Hard, at(8)).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn test_counters_follow_history() {
    let s = scheduler();
    let ratings = [
      Rating::Again,
      Rating::Good,
      Rating::Again,
      Rating::Hard,
      Rating::Good,
      Rating::Again,
      Rating::Easy,
    ];
    let mut card: Option<CardStudy> = None;
    let mut now = at(0);
    let mut expected_lapses = 0;
    for (n, rating) in ratings.iter().enumerate() {
      let was_new = card.is_none();
      let next = s.record_review(&key(1), card.as_ref(), *rating, now).unwrap();
      if *rating == Rating::Again && !was_new {
        expected_lapses += 1;
      }
      assert_eq!(next.reps as usize, n + 1);
      assert_eq!(next.lapses, expected_lapses);
      now = next.due_date;
      card = Some(next);
    }
  }

  #[test]
  fn test_graduates_from_learning_on_long_interval() {
    let s = scheduler();
    let first = s.record_review(&key(1), None, Rating::Good, at(0)).unwrap();
    let second = s
      .record_review(&key(1), Some(&first), Rating::Easy, first.due_date)
      .unwrap();
    assert_eq!(second.state, CardState::Review);
  }

  #[test]
  fn test_invalid_prior_is_rejected() {
    let mut prior = CardStudy::new(key(1), at(0));
    prior.reps = 3;
    let err = scheduler()
      .record_review(&key(1), Some(&prior), Rating::Good, at(1))
      .unwrap_err();
    assert!(err.is_invalid_state());
  }

  #[test]
  fn test_mismatched_key_is_rejected() {
    let prior = review_card(2, 5.0, 3, 0, at(0));
    let err = scheduler()
      .record_review(&key(1), Some(&prior), Rating::Good, at(1))
      .unwrap_err();
    assert!(err.is_invalid_state());
  }

  #[test]
  fn test_exhausted_reps_is_invalid_state() {
    let s = scheduler();
    let prior = review_card(1, 5.0, u32::MAX, 0, at(0));
    assert!(prior.validate().is_ok());

    let err = s.record_review(&key(1), Some(&prior), Rating::Good, at(5)).unwrap_err();
    assert!(err.is_invalid_state());
    assert!(s.preview(&key(1), Some(&prior), at(5)).unwrap_err().is_invalid_state());
  }

  #[test]
  fn test_counters_reach_their_maximum() {
    let s = scheduler();
    let mut prior = review_card(1, 5.0, u32::MAX - 1, 0, at(0));
    prior.lapses = u32::MAX - 1;

    let card = s.record_review(&key(1), Some(&prior), Rating::Again, at(5)).unwrap();
    assert_eq!(card.reps, u32::MAX);
    assert_eq!(card.lapses, u32::MAX);
    assert!(card.validate().is_ok());

    let err = s.record_review(&key(1), Some(&card), Rating::Again, at(6)).unwrap_err();
    assert!(err.is_invalid_state());
  }

  #[test]
  fn test_elapsed_days_uses_last_review() {
    let prior = review_card(1, 5.0, 3, 0, at(2));
    assert_eq!(elapsed_days(Some(&prior), at(5)), 3.0);
    // Clock behind the last review clamps to zero
    assert_eq!(elapsed_days(Some(&prior), at(1)), 0.0);
    assert_eq!(elapsed_days(None, at(5)), 0.0);
  }

  #[test]
  fn test_state_transitions() {
    use CardState::*;
    assert_eq!(next_card_state(New, Rating::Again, 0.1, 1.0), Learning);
    assert_eq!(next_card_state(New, Rating::Easy, 9.0, 1.0), Learning);
    assert_eq!(next_card_state(Learning, Rating::Good, 2.0, 1.0), Review);
    assert_eq!(next_card_state(Learning, Rating::Hard, 0.5, 1.0), Learning);
    assert_eq!(next_card_state(Learning, Rating::Again, 5.0, 1.0), Learning);
    assert_eq!(next_card_state(Review, Rating::Again, 0.4, 1.0), Relearning);
    assert_eq!(next_card_state(Review, Rating::Hard, 0.4, 1.0), Review);
    assert_eq!(next_card_state(Relearning, Rating::Good, 1.0, 1.0), Review);
    assert_eq!(next_card_state(Relearning, Rating::Good, 0.6, 1.0), Relearning);
    assert_eq!(next_card_state(Relearning, Rating::Again, 3.0, 1.0), Relearning);
  }
}
