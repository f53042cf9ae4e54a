//! Single-elimination bracket.
//!
//! Qualifiers are placed by the standard seeding map so that seed 1 meets
//! seed N in the first round and the top two seeds can only meet in the
//! final. Qualifier counts that are not a power of two are padded with empty
//! slots; the teams facing an empty slot advance on a walkover.

pub mod bracket;
pub mod seeding;

pub use bracket::{Advancement, Reopening, advance, champion, plan_bracket, reopen};
pub use seeding::{bracket_rounds, bracket_size, generate_seeding_map, meeting_round};
