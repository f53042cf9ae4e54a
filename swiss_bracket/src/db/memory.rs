//! In-memory `TournamentRepository`.
//!
//! Every operation takes the single state lock, so a [`WriteBatch`] is
//! validated and applied as one unit exactly like a database transaction.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::repository::TournamentRepository;
use crate::tournament::{
    Match, MatchId, Phase, SwissRecord, Team, TeamId, Tournament, TournamentConfig,
    TournamentError, TournamentId, TournamentResult, WriteBatch,
};

#[derive(Default)]
struct MemoryState {
    tournaments: BTreeMap<TournamentId, Tournament>,
    teams: BTreeMap<TeamId, Team>,
    matches: BTreeMap<MatchId, Match>,
    next_id: i64,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Repository backed by process memory
#[derive(Clone, Default)]
pub struct MemoryTournamentRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTournamentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of match rows across all tournaments
    pub fn match_count(&self) -> usize {
        self.state().matches.len()
    }
}

#[async_trait]
impl TournamentRepository for MemoryTournamentRepository {
    async fn create_tournament(
        &self,
        name: &str,
        config: &TournamentConfig,
    ) -> TournamentResult<TournamentId> {
        let mut state = self.state();
        let id = state.allocate_id();
        state.tournaments.insert(
            id,
            Tournament {
                id,
                name: name.to_string(),
                config: config.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        Ok(self.state().tournaments.get(&id).cloned())
    }

    async fn create_team(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> TournamentResult<TeamId> {
        let mut state = self.state();
        if !state.tournaments.contains_key(&tournament_id) {
            return Err(TournamentError::TournamentNotFound(tournament_id));
        }
        let id = state.allocate_id();
        state.teams.insert(
            id,
            Team {
                id,
                tournament_id,
                name: name.to_string(),
                seed: None,
                record: SwissRecord::default(),
                qualified_for_elimination: false,
                eliminated: false,
            },
        );
        Ok(id)
    }

    async fn get_team(&self, id: TeamId) -> TournamentResult<Option<Team>> {
        Ok(self.state().teams.get(&id).cloned())
    }

    async fn list_teams(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Team>> {
        Ok(self
            .state()
            .teams
            .values()
            .filter(|t| t.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn get_match(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        Ok(self.state().matches.get(&id).cloned())
    }

    async fn list_matches(
        &self,
        tournament_id: TournamentId,
        phase: Option<Phase>,
    ) -> TournamentResult<Vec<Match>> {
        let mut matches: Vec<Match> = self
            .state()
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .filter(|m| phase.is_none_or(|p| m.phase == p))
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.round_number, m.match_number, m.id));
        Ok(matches)
    }

    async fn commit(&self, batch: WriteBatch) -> TournamentResult<Vec<MatchId>> {
        let mut state = self.state();

        // Validate everything before the first write
        for m in &batch.match_updates {
            if !state.matches.contains_key(&m.id) {
                return Err(TournamentError::MatchNotFound(m.id));
            }
        }
        for t in &batch.team_updates {
            if !state.teams.contains_key(&t.id) {
                return Err(TournamentError::TeamNotFound(t.id));
            }
        }
        for m in &batch.new_matches {
            if m.next.is_some_and(|next| next >= batch.new_matches.len()) {
                return Err(TournamentError::invalid("next match index out of range"));
            }
        }

        let ids: Vec<MatchId> = batch
            .new_matches
            .iter()
            .map(|_| state.allocate_id())
            .collect();
        let now = Utc::now();
        for (m, &id) in batch.new_matches.into_iter().zip(&ids) {
            let completed_at = m.is_completed().then_some(now);
            state.matches.insert(
                id,
                Match {
                    id,
                    tournament_id: m.tournament_id,
                    round_number: m.round_number,
                    match_number: m.match_number,
                    phase: m.phase,
                    team1_id: m.team1_id,
                    team2_id: m.team2_id,
                    team1_score: m.team1_score,
                    team2_score: m.team2_score,
                    winner_id: m.winner_id,
                    status: m.status,
                    bracket_position: m.bracket_position,
                    next_match_id: m.next.map(|next| ids[next]),
                    completed_at,
                },
            );
        }
        for m in batch.match_updates {
            state.matches.insert(m.id, m);
        }
        for t in batch.team_updates {
            // seed/qualification/aggregates are mutable, identity is not
            if let Some(existing) = state.teams.get_mut(&t.id) {
                existing.seed = t.seed;
                existing.record = t.record;
                existing.qualified_for_elimination = t.qualified_for_elimination;
                existing.eliminated = t.eliminated;
            }
        }

        Ok(ids)
    }
}
