//! Due-card queue for a review session.
//!
//! Due cards are heapified up front (O(n)) and popped in order on demand,
//! so a session that stops after a few cards never pays for a full sort.

use chrono::{DateTime, Utc};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::domain::{CardState, CardStudy};

#[derive(Debug, Clone)]
struct DueEntry<'a>(&'a CardStudy);

impl DueEntry<'_> {
  fn sort_key(&self) -> (DateTime<Utc>, i64, &str) {
    (self.0.due_date, self.0.phrase_id, self.0.user_id.as_str())
  }
}

impl PartialEq for DueEntry<'_> {
  fn eq(&self, other: &Self) -> bool {
    self.sort_key() == other.sort_key()
  }
}

impl Eq for DueEntry<'_> {}

impl PartialOrd for DueEntry<'_> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for DueEntry<'_> {
  fn cmp(&self, other: &Self) -> Ordering {
    self.sort_key().cmp(&other.sort_key())
  }
}

/// Cards due at a fixed instant, earliest first, ties by phrase id.
///
/// Finite and read-only. Clone it to walk the same sequence again.
#[derive(Debug, Clone)]
pub struct DueCards<'a> {
  heap: BinaryHeap<Reverse<DueEntry<'a>>>,
}

impl<'a> Iterator for DueCards<'a> {
  type Item = &'a CardStudy;

  fn next(&mut self) -> Option<Self::Item> {
    self.heap.pop().map(|Reverse(entry)| entry.0)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.heap.len(), Some(self.heap.len()))
  }
}

impl ExactSizeIterator for DueCards<'_> {}

/// Select cards with `due_date <= now`. New cards have no meaningful due
/// date and are never returned.
pub fn select_due_cards<'a, I>(cards: I, now: DateTime<Utc>) -> DueCards<'a>
where
  I: IntoIterator<Item = &'a CardStudy>,
{
  let heap = cards
    .into_iter()
    .filter(|card| card.state != CardState::New && card.due_date <= now)
    .map(|card| Reverse(DueEntry(card)))
    .collect();
  DueCards { heap }
}

/// Earliest due date strictly after `now`, for "next review in ..." displays.
pub fn next_due_date<'a, I>(cards: I, now: DateTime<Utc>) -> Option<DateTime<Utc>>
where
  I: IntoIterator<Item = &'a CardStudy>,
{
  cards
    .into_iter()
    .filter(|card| card.state != CardState::New && card.due_date > now)
    .map(|card| card.due_date)
    .min()
}
