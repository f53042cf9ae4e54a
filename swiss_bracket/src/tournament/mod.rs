//! Tournament engine for a Swiss phase followed by a single-elimination
//! bracket.
//!
//! This module provides:
//! - Tournament and team data models
//! - Per-tournament configuration (qualifiers, rounds, pairing strategy)
//! - The [`TournamentEngine`] facade that drives rounds, results,
//!   qualification and the bracket
//!
//! ## Example
//!
//! ```no_run
//! use swiss_bracket::db::{Database, DatabaseConfig};
//! use swiss_bracket::tournament::{TournamentConfig, TournamentEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()?).await?;
//!     let engine = TournamentEngine::new(Arc::new(db.repository()));
//!
//!     let tournament = engine
//!         .create_tournament("Spring Cup", TournamentConfig::standard())
//!         .await?;
//!     for name in ["Red", "Blue", "Green", "Gold"] {
//!         engine.register_team(tournament, name).await?;
//!     }
//!     let matches = engine.generate_swiss_round(tournament, 1).await?;
//!     println!("Round 1: {} matches", matches.len());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod locks;
pub mod manager;
pub mod models;

pub use config::{
    DEFAULT_PAIRING_SEARCH_BUDGET, DEFAULT_QUALIFIERS, EngineSettings, TournamentConfig,
};
pub use errors::{TournamentError, TournamentResult};
pub use locks::TournamentLocks;
pub use manager::{RoundProgress, TournamentEngine};
pub use models::{
    Match, MatchId, MatchStatus, NewMatch, POINTS_PER_DRAW, POINTS_PER_WIN, Phase, Standing,
    SwissRecord, Team, TeamId, Tournament, TournamentId, WriteBatch,
};
