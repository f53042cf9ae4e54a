//! Standings calculator with per-tournament lookup caching.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::buchholz::{
    OpponentRecord, TeamScores, compare_ranking, is_median_rule_applied, median_split,
    opponents_of, points_snapshot, score_all,
};
use crate::db::TournamentRepository;
use crate::tournament::{
    Match, Phase, Standing, TeamId, TournamentError, TournamentId, TournamentResult,
};

/// One opponent's part in a team's Median-Buchholz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentContribution {
    /// `None` for a bye
    pub opponent_id: Option<TeamId>,
    pub opponent_name: Option<String>,
    pub round_number: u32,
    pub points: i32,
    /// Whether the median rule kept this score
    pub included: bool,
}

/// Audit view of a team's Buchholz scores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuchholzBreakdown {
    pub team_id: TeamId,
    pub swiss_points: i32,
    pub opponents: Vec<OpponentContribution>,
    pub median_rule_applied: bool,
    /// Counted scores, ascending
    pub scores_used: Vec<i32>,
    /// Dropped lowest and highest
    pub scores_excluded: Vec<i32>,
    pub median_buchholz: i32,
    pub opponents_buchholz: i32,
}

#[derive(Default)]
struct Cache {
    matches: HashMap<TournamentId, Arc<Vec<Match>>>,
    opponents: HashMap<(TournamentId, TeamId), Arc<Vec<OpponentRecord>>>,
    /// Bumped by `invalidate`
    epoch: u64,
    /// Bumped by `invalidate_tournament`
    generations: HashMap<TournamentId, u64>,
}

impl Cache {
    /// Entries computed from a read that started at another generation
    /// must not be stored
    fn generation(&self, tournament_id: TournamentId) -> (u64, u64) {
        let own = self.generations.get(&tournament_id).copied().unwrap_or(0);
        (self.epoch, own)
    }
}

/// Computes standings from persisted state.
///
/// Swiss match lists and opponent lists are cached per tournament. Any write
/// that changes a result must be followed by [`invalidate_tournament`] (or
/// [`invalidate`]) before the next calculation, otherwise standings and
/// pairings are computed from stale data. A lookup that was already reading
/// when an invalidation happened returns its result but does not cache it.
///
/// [`invalidate_tournament`]: StandingsCalculator::invalidate_tournament
/// [`invalidate`]: StandingsCalculator::invalidate
pub struct StandingsCalculator {
    repo: Arc<dyn TournamentRepository>,
    cache: Mutex<Cache>,
}

impl StandingsCalculator {
    pub fn new(repo: Arc<dyn TournamentRepository>) -> Self {
        Self {
            repo,
            cache: Mutex::new(Cache::default()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every cached entry
    pub fn invalidate(&self) {
        let mut cache = self.cache();
        cache.matches.clear();
        cache.opponents.clear();
        cache.epoch += 1;
    }

    /// Drop the cached entries of one tournament
    pub fn invalidate_tournament(&self, tournament_id: TournamentId) {
        let mut cache = self.cache();
        cache.matches.remove(&tournament_id);
        cache.opponents.retain(|&(t, _), _| t != tournament_id);
        *cache.generations.entry(tournament_id).or_default() += 1;
    }

    /// Swiss matches of a tournament (cached)
    pub async fn swiss_matches(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Arc<Vec<Match>>> {
        let started = {
            let cache = self.cache();
            if let Some(matches) = cache.matches.get(&tournament_id) {
                return Ok(Arc::clone(matches));
            }
            cache.generation(tournament_id)
        };

        let matches = Arc::new(
            self.repo
                .list_matches(tournament_id, Some(Phase::Swiss))
                .await?,
        );
        let mut cache = self.cache();
        if cache.generation(tournament_id) == started {
            cache.matches.insert(tournament_id, Arc::clone(&matches));
        } else {
            log::debug!(
                "Not caching Swiss matches of tournament {}: invalidated during the read",
                tournament_id
            );
        }
        Ok(matches)
    }

    /// Opponents a team faced in completed Swiss matches (cached)
    pub async fn opponents_of(
        &self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<Arc<Vec<OpponentRecord>>> {
        let started = {
            let cache = self.cache();
            if let Some(opponents) = cache.opponents.get(&(tournament_id, team_id)) {
                return Ok(Arc::clone(opponents));
            }
            cache.generation(tournament_id)
        };

        let matches = self.swiss_matches(tournament_id).await?;
        let opponents = Arc::new(opponents_of(team_id, &matches));
        let mut cache = self.cache();
        if cache.generation(tournament_id) == started {
            cache
                .opponents
                .insert((tournament_id, team_id), Arc::clone(&opponents));
        }
        Ok(opponents)
    }

    async fn opponent_map(
        &self,
        tournament_id: TournamentId,
        team_ids: impl Iterator<Item = TeamId>,
    ) -> TournamentResult<HashMap<TeamId, Vec<OpponentRecord>>> {
        let mut map = HashMap::new();
        for id in team_ids {
            let opponents = self.opponents_of(tournament_id, id).await?;
            map.insert(id, opponents.as_ref().clone());
        }
        Ok(map)
    }

    /// Scores for every team of a tournament, from a single snapshot
    pub async fn calculate_all(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<HashMap<TeamId, TeamScores>> {
        let teams = self.repo.list_teams(tournament_id).await?;
        let opponents = self
            .opponent_map(tournament_id, teams.iter().map(|t| t.id))
            .await?;
        Ok(score_all(&teams, &opponents))
    }

    /// Ranked standings, best first
    pub async fn standings(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Standing>> {
        let teams = self.repo.list_teams(tournament_id).await?;
        let opponents = self
            .opponent_map(tournament_id, teams.iter().map(|t| t.id))
            .await?;
        let scores = score_all(&teams, &opponents);

        let mut ranked: Vec<_> = teams
            .into_iter()
            .map(|team| {
                let s = scores.get(&team.id).copied().unwrap_or_default();
                (team, s)
            })
            .collect();
        ranked.sort_by(|(a, sa), (b, sb)| compare_ranking((a.id, sa), (b.id, sb)));

        Ok(ranked
            .into_iter()
            .enumerate()
            .map(|(i, (team, s))| Standing {
                rank: i + 1,
                team,
                swiss_points: s.swiss_points,
                cup_diff: s.cup_diff,
                median_buchholz: s.median_buchholz,
                opponents_buchholz: s.opponents_buchholz,
            })
            .collect())
    }

    /// Per-opponent explanation of one team's Buchholz scores
    pub async fn calculate_detailed(
        &self,
        team_id: TeamId,
        tournament_id: TournamentId,
    ) -> TournamentResult<BuchholzBreakdown> {
        let teams = self.repo.list_teams(tournament_id).await?;
        let team = teams
            .iter()
            .find(|t| t.id == team_id)
            .ok_or(TournamentError::TeamNotFound(team_id))?;

        let opponents = self
            .opponent_map(tournament_id, teams.iter().map(|t| t.id))
            .await?;
        let scores = score_all(&teams, &opponents);
        let snapshot = points_snapshot(&teams);
        let names: HashMap<TeamId, &str> = teams.iter().map(|t| (t.id, t.name.as_str())).collect();

        let own = opponents.get(&team_id).cloned().unwrap_or_default();
        let points: Vec<i32> = own
            .iter()
            .map(|o| {
                o.opponent_id
                    .and_then(|id| snapshot.get(&id).copied())
                    .unwrap_or(0)
            })
            .collect();
        let split = median_split(&points);

        let contributions = own
            .iter()
            .zip(&points)
            .zip(&split.included)
            .map(|((o, &p), &included)| OpponentContribution {
                opponent_id: o.opponent_id,
                opponent_name: o
                    .opponent_id
                    .and_then(|id| names.get(&id).map(|n| n.to_string())),
                round_number: o.round_number,
                points: p,
                included,
            })
            .collect();

        let team_scores = scores.get(&team_id).copied().unwrap_or_default();
        Ok(BuchholzBreakdown {
            team_id,
            swiss_points: team.record.points,
            opponents: contributions,
            median_rule_applied: is_median_rule_applied(own.len()),
            median_buchholz: split.total(),
            scores_used: split.used,
            scores_excluded: split.excluded,
            opponents_buchholz: team_scores.opponents_buchholz,
        })
    }
}
