//! # Swiss Bracket
//!
//! A tournament engine that runs a Swiss-system qualifying phase followed by
//! a single-elimination bracket.
//!
//! ## Architecture
//!
//! A tournament moves through two phases:
//!
//! - **Swiss**: every round pairs teams with similar records who have not met
//!   yet. Odd team counts give one team a bye worth a win. Teams are ranked by
//!   points, cup difference, Median-Buchholz and Opponents' Buchholz.
//! - **Elimination**: the top N of the Swiss standings are seeded into a
//!   bracket where seed 1 meets seed N and the top two seeds can only meet in
//!   the final. Winners advance until one champion remains.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Data models, configuration and the [`TournamentEngine`]
//! - [`swiss`]: Round pairing and the result ledger
//! - [`standings`]: Buchholz tiebreaks and the standings calculator
//! - [`elimination`]: Seeding map and bracket advancement
//! - [`db`]: Storage trait with PostgreSQL and in-memory implementations
//!
//! ## Example
//!
//! ```
//! use swiss_bracket::{calculate_swiss_rounds, generate_seeding_map};
//!
//! assert_eq!(calculate_swiss_rounds(16), 4);
//! assert_eq!(generate_seeding_map(4), vec![1, 4, 2, 3]);
//! ```

/// Storage: repository trait, PostgreSQL and in-memory backends.
pub mod db;

/// Single-elimination seeding and advancement.
pub mod elimination;
pub use elimination::{bracket_rounds, bracket_size, generate_seeding_map};

/// Buchholz tiebreaks and standings.
pub mod standings;
pub use standings::{BuchholzBreakdown, StandingsCalculator, is_median_rule_applied};

/// Swiss pairing and result ledger.
pub mod swiss;
pub use swiss::{PairingStrategy, SwissOutcome, calculate_swiss_rounds, is_bye_match};

/// Tournament models, configuration and engine.
pub mod tournament;
pub use tournament::{
    EngineSettings, Match, Phase, RoundProgress, Standing, Team, TournamentConfig,
    TournamentEngine, TournamentError, TournamentResult,
};
