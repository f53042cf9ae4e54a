//! Tournament and engine configuration.

use serde::{Deserialize, Serialize};

use crate::swiss::PairingStrategy;

/// Default number of teams that advance to the elimination bracket
pub const DEFAULT_QUALIFIERS: usize = 8;

/// Default node budget for the backtracking pairing search
pub const DEFAULT_PAIRING_SEARCH_BUDGET: usize = 100_000;

/// Per-tournament configuration, stored alongside the tournament row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Qualification cutoff (top N of the final Swiss ranking)
    pub qualifiers: usize,
    /// Number of Swiss rounds; `None` means `ceil(log2(teams))`
    pub swiss_rounds: Option<u32>,
    /// How Swiss rounds are paired
    pub pairing: PairingStrategy,
    /// Generate the next round, or qualify and build the bracket, as soon as
    /// the last result of a round is reported
    pub auto_advance: bool,
}

impl TournamentConfig {
    /// Standard Swiss + top-8 bracket
    pub fn standard() -> Self {
        Self {
            qualifiers: DEFAULT_QUALIFIERS,
            swiss_rounds: None,
            pairing: PairingStrategy::Backtracking,
            auto_advance: true,
        }
    }

    pub fn with_qualifiers(mut self, qualifiers: usize) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    pub fn with_swiss_rounds(mut self, rounds: u32) -> Self {
        self.swiss_rounds = Some(rounds);
        self
    }

    pub fn with_pairing(mut self, pairing: PairingStrategy) -> Self {
        self.pairing = pairing;
        self
    }

    pub fn manual(mut self) -> Self {
        self.auto_advance = false;
        self
    }

    /// Number of Swiss rounds to play with `team_count` teams
    pub fn rounds_for(&self, team_count: usize) -> u32 {
        self.swiss_rounds
            .unwrap_or_else(|| crate::swiss::calculate_swiss_rounds(team_count))
    }
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Maximum search nodes the backtracking pairing may visit per round
    /// before falling back to the greedy result
    pub pairing_search_budget: usize,
}

impl EngineSettings {
    /// Create settings from environment variables
    ///
    /// Expected environment variables:
    /// - `PAIRING_SEARCH_BUDGET`: backtracking node budget (default: 100000)
    pub fn from_env() -> Self {
        let pairing_search_budget = std::env::var("PAIRING_SEARCH_BUDGET")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PAIRING_SEARCH_BUDGET);

        Self {
            pairing_search_budget,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            pairing_search_budget: DEFAULT_PAIRING_SEARCH_BUDGET,
        }
    }
}
