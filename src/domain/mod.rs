pub mod card;
pub mod review;

pub use card::{CardKey, CardState, CardStudy, MAX_DIFFICULTY, MIN_DIFFICULTY};
pub use review::{Rating, ReviewLog};
