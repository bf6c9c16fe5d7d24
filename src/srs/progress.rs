//! Read-side progress projection.
//!
//! Recomputed from the raw `CardStudy` fields on every call and never
//! stored, so it cannot go stale after the next review.

use serde::Serialize;

use crate::config::{LEARNED_MIN_REPS, LEARNED_MIN_STABILITY};
use crate::domain::{CardState, CardStudy};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressProjection {
  pub progress_percentage: f64,
  pub state: CardState,
  pub is_learned: bool,
}

impl ProgressProjection {
  /// Projection of a phrase the learner has never reviewed
  pub const UNSEEN: Self = Self {
    progress_percentage: 0.0,
    state: CardState::New,
    is_learned: false,
  };
}

pub fn project_progress(card: Option<&CardStudy>) -> ProgressProjection {
  let Some(card) = card else {
    return ProgressProjection::UNSEEN;
  };

  let stability_part = (card.stability / 10.0).min(1.0) * 60.0;
  let reps_part = (card.reps as f64 / 10.0).min(1.0) * 30.0;
  let state_bonus = match card.state {
    CardState::Review => 10.0,
    CardState::Learning => 5.0,
    CardState::New | CardState::Relearning => 0.0,
  };
  let lapse_penalty = (card.lapses as f64 / 5.0).min(1.0) * 10.0;

  let raw = stability_part + reps_part + state_bonus - lapse_penalty;
  // NaN from a corrupt stability must not escape the [0, 100] range
  let progress_percentage = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 100.0) };

  ProgressProjection {
    progress_percentage,
    state: card.state,
    is_learned: card.state == CardState::Review
      && card.stability >= LEARNED_MIN_STABILITY
      && card.reps >= LEARNED_MIN_REPS,
  }
}

/// Aggregate view of one learner's cards
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressSummary {
  pub total: usize,
  pub learned: usize,
  pub new: usize,
  pub learning: usize,
  pub review: usize,
  pub relearning: usize,
  pub average_percentage: f64,
}

impl ProgressSummary {
  pub fn learned_percentage(&self) -> f64 {
    if self.total > 0 {
      self.learned as f64 * 100.0 / self.total as f64
    } else {
      0.0
    }
  }
}

pub fn summarize_progress(cards: &[CardStudy]) -> ProgressSummary {
  let mut summary = ProgressSummary::default();
  let mut percentage_sum = 0.0;

  for card in cards {
    let projection = project_progress(Some(card));
    summary.total += 1;
    percentage_sum += projection.progress_percentage;
    if projection.is_learned {
      summary.learned += 1;
    }
    match projection.state {
      CardState::New => summary.new += 1,
      CardState::Learning => summary.learning += 1,
      CardState::Review => summary.review += 1,
      CardState::Relearning => summary.relearning += 1,
    }
  }

  if summary.total > 0 {
    summary.average_percentage = percentage_sum / summary.total as f64;
  }
  summary
}

/// Pair each card with its projection, least progressed first.
/// Ties are broken by phrase id so the order is stable across calls.
pub fn sort_by_progress(cards: &[CardStudy]) -> Vec<(&CardStudy, ProgressProjection)> {
  let mut projected: Vec<_> = cards
    .iter()
    .map(|card| (card, project_progress(Some(card))))
    .collect();
  projected.sort_by(|(a, pa), (b, pb)| {
    pa.progress_percentage
      .total_cmp(&pb.progress_percentage)
      .then(a.phrase_id.cmp(&b.phrase_id))
  });
  projected
}

/// Keep only learned (or only not-yet-learned) cards.
pub fn filter_learned(cards: &[CardStudy], learned: bool) -> Vec<&CardStudy> {
  cards
    .iter()
    .filter(|card| project_progress(Some(card)).is_learned == learned)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{at, review_card};

  #[test]
  fn test_unseen_projection() {
    let p = project_progress(None);
    assert_eq!(p.progress_percentage, 0.0);
    assert_eq!(p.state, CardState::New);
    assert!(!p.is_learned);
    assert_eq!(p, ProgressProjection::UNSEEN);
  }

  #[test]
  fn test_review_card_example() {
    // min(5/10,1)*60 + min(10/10,1)*30 + 10 - 0 = 70
    let card = review_card(1, 5.0, 10, 0, at(0));
    let p = project_progress(Some(&card));
    assert!((p.progress_percentage - 70.0).abs() < 1e-9);
    assert_eq!(p.state, CardState::Review);
    assert!(p.is_learned);
  }

  #[test]
  fn test_learning_bonus_and_lapse_penalty() {
    let mut card = review_card(1, 2.0, 4, 2, at(0));
    card.state = CardState::Learning;
    // 12 + 12 + 5 - 4 = 25
    let p = project_progress(Some(&card));
    assert!((p.progress_percentage - 25.0).abs() < 1e-9);
    assert!(!p.is_learned, "only Review cards can be learned");
  }

  #[test]
  fn test_relearning_gets_no_bonus() {
    let mut card = review_card(1, 10.0, 10, 0, at(0));
    card.state = CardState::Relearning;
    let p = project_progress(Some(&card));
    assert!((p.progress_percentage - 90.0).abs() < 1e-9);
  }

  #[test]
  fn test_upper_bound() {
    let card = review_card(1, 500.0, 1000, 0, at(0));
    assert_eq!(project_progress(Some(&card)).progress_percentage, 100.0);
  }

  #[test]
  fn test_lower_bound() {
    let mut card = review_card(1, 0.0, 20, 20, at(0));
    card.reps = 0;
    card.state = CardState::Relearning;
    // 0 + 0 + 0 - 10 clamps to 0
    assert_eq!(project_progress(Some(&card)).progress_percentage, 0.0);
  }

  #[test]
  fn test_bounds_over_grid() {
    for stability in [0.0, 0.4, 1.0, 2.0, 9.9, 10.0, 250.0] {
      for reps in [0, 1, 3, 10, 50] {
        for lapses in [0, 1, 5, 40] {
          for state in [
            CardState::New,
            CardState::Learning,
            CardState::Review,
            CardState::Relearning,
          ] {
            let mut card = review_card(1, stability, reps, lapses, at(0));
            card.state = state;
            let pct = project_progress(Some(&card)).progress_percentage;
            assert!((0.0..=100.0).contains(&pct));
          }
        }
      }
    }
  }

  #[test]
  fn test_nan_stability_clamps_to_zero() {
    let mut card = review_card(1, 1.0, 1, 0, at(0));
    card.stability = f64::NAN;
    assert_eq!(project_progress(Some(&card)).progress_percentage, 0.0);
  }

  #[test]
  fn test_learned_thresholds() {
    assert!(!project_progress(Some(&review_card(1, 1.9, 5, 0, at(0)))).is_learned);
    assert!(!project_progress(Some(&review_card(1, 5.0, 2, 0, at(0)))).is_learned);
    assert!(project_progress(Some(&review_card(1, 2.0, 3, 0, at(0)))).is_learned);
  }

  #[test]
  fn test_projection_is_idempotent() {
    let card = review_card(1, 3.3, 4, 1, at(0));
    assert_eq!(project_progress(Some(&card)), project_progress(Some(&card)));
  }

  #[test]
  fn test_summarize_progress() {
    let mut learning = review_card(3, 1.0, 1, 0, at(0));
    learning.state = CardState::Learning;
    let cards = vec![
      review_card(1, 5.0, 10, 0, at(0)), // 70, learned
      review_card(2, 1.0, 1, 0, at(0)),  // 6 + 3 + 10 = 19
      learning,                          // 6 + 3 + 5 = 14
    ];
    let summary = summarize_progress(&cards);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.learned, 1);
    assert_eq!(summary.review, 2);
    assert_eq!(summary.learning, 1);
    assert_eq!(summary.new, 0);
    assert!((summary.average_percentage - 103.0 / 3.0).abs() < 1e-9);
    assert!((summary.learned_percentage() - 100.0 / 3.0).abs() < 1e-9);
  }

  #[test]
  fn test_summarize_empty() {
    let summary = summarize_progress(&[]);
    assert_eq!(summary, ProgressSummary::default());
    assert_eq!(summary.learned_percentage(), 0.0);
  }

  #[test]
  fn test_sort_by_progress_breaks_ties_by_phrase() {
    let cards = vec![
      review_card(3, 5.0, 10, 0, at(0)),
      review_card(2, 1.0, 1, 0, at(0)),
      review_card(1, 5.0, 10, 0, at(0)),
    ];
    let order: Vec<i64> = sort_by_progress(&cards)
      .iter()
      .map(|(card, _)| card.phrase_id)
      .collect();
    assert_eq!(order, vec![2, 1, 3]);
  }

  #[test]
  fn test_filter_learned() {
    let cards = vec![
      review_card(1, 5.0, 10, 0, at(0)),
      review_card(2, 1.0, 1, 0, at(0)),
    ];
    let learned: Vec<i64> = filter_learned(&cards, true).iter().map(|c| c.phrase_id).collect();
    let pending: Vec<i64> = filter_learned(&cards, false).iter().map(|c| c.phrase_id).collect();
    assert_eq!(learned, vec![1]);
    assert_eq!(pending, vec![2]);
  }
}
