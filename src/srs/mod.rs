pub mod due;
pub mod fsrs_scheduler;
pub mod progress;

pub use due::{next_due_date, select_due_cards, DueCards};
pub use fsrs_scheduler::{elapsed_days, next_card_state, Scheduler};
pub use progress::{
  filter_learned, project_progress, sort_by_progress, summarize_progress, ProgressProjection,
  ProgressSummary,
};
