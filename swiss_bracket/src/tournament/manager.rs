//! Tournament engine: Swiss rounds, results, qualification and the bracket.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::config::{EngineSettings, TournamentConfig};
use super::errors::{TournamentError, TournamentResult};
use super::locks::TournamentLocks;
use super::models::{
    Match, MatchId, Phase, Standing, Team, TeamId, Tournament, TournamentId, WriteBatch,
};
use crate::db::TournamentRepository;
use crate::elimination;
use crate::standings::{BuchholzBreakdown, StandingsCalculator};
use crate::swiss::{
    self, PairingHistory, SwissOutcome, apply_outcome, clear_score, pair_round, record_score,
    reverse_outcome, stored_outcome,
};

/// What happened after a Swiss result was reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoundProgress {
    /// The round still has unreported matches
    Pending { remaining: usize },
    /// The round is complete and auto-advance is off
    RoundComplete { round: u32 },
    /// The next Swiss round was paired
    NextRound { round: u32 },
    /// The Swiss phase ended and the bracket was built
    BracketGenerated { qualifiers: usize },
}

/// Tournament engine
pub struct TournamentEngine {
    repo: Arc<dyn TournamentRepository>,
    calculator: StandingsCalculator,
    locks: TournamentLocks,
    settings: EngineSettings,
}

impl TournamentEngine {
    /// Create a new engine with default settings
    pub fn new(repo: Arc<dyn TournamentRepository>) -> Self {
        Self::with_settings(repo, EngineSettings::default())
    }

    pub fn with_settings(repo: Arc<dyn TournamentRepository>, settings: EngineSettings) -> Self {
        Self {
            calculator: StandingsCalculator::new(Arc::clone(&repo)),
            repo,
            locks: TournamentLocks::new(),
            settings,
        }
    }

    pub fn repository(&self) -> &Arc<dyn TournamentRepository> {
        &self.repo
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Drop cached standings data of a tournament written to outside the engine
    pub fn invalidate_cache(&self, tournament_id: TournamentId) {
        self.calculator.invalidate_tournament(tournament_id);
    }

    async fn load_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.repo
            .get_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))
    }

    async fn load_team(&self, team_id: TeamId) -> TournamentResult<Team> {
        self.repo
            .get_team(team_id)
            .await?
            .ok_or(TournamentError::TeamNotFound(team_id))
    }

    async fn load_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        self.repo
            .get_match(match_id)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    async fn commit(
        &self,
        tournament_id: TournamentId,
        batch: WriteBatch,
    ) -> TournamentResult<Vec<MatchId>> {
        let result = self.repo.commit(batch).await;
        self.calculator.invalidate_tournament(tournament_id);
        log::debug!("Invalidated standings cache for tournament {}", tournament_id);
        result
    }

    /// Create a tournament
    pub async fn create_tournament(
        &self,
        name: &str,
        config: TournamentConfig,
    ) -> TournamentResult<TournamentId> {
        let id = self.repo.create_tournament(name, &config).await?;
        log::info!("Created tournament {} ({})", id, name);
        Ok(id)
    }

    pub async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Tournament> {
        self.load_tournament(tournament_id).await
    }

    /// Register a team. Only allowed before the first round is paired.
    pub async fn register_team(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> TournamentResult<TeamId> {
        let _guard = self.locks.acquire(tournament_id).await;
        self.load_tournament(tournament_id).await?;

        if !self.repo.list_matches(tournament_id, None).await?.is_empty() {
            return Err(TournamentError::invalid(format!(
                "tournament {} has already started",
                tournament_id
            )));
        }

        let id = self.repo.create_team(tournament_id, name).await?;
        self.calculator.invalidate_tournament(tournament_id);
        log::info!("Registered team {} ({}) in tournament {}", id, name, tournament_id);
        Ok(id)
    }

    pub async fn list_teams(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Team>> {
        self.repo.list_teams(tournament_id).await
    }

    pub async fn list_matches(
        &self,
        tournament_id: TournamentId,
        phase: Option<Phase>,
    ) -> TournamentResult<Vec<Match>> {
        self.repo.list_matches(tournament_id, phase).await
    }

    // ===== Swiss rounds =====

    /// Highest Swiss round paired so far (0 before the first round)
    pub async fn current_round(&self, tournament_id: TournamentId) -> TournamentResult<u32> {
        let matches = self
            .repo
            .list_matches(tournament_id, Some(Phase::Swiss))
            .await?;
        Ok(matches.iter().map(|m| m.round_number).max().unwrap_or(0))
    }

    /// Whether every match of a Swiss round has a result
    pub async fn is_round_complete(
        &self,
        tournament_id: TournamentId,
        round_number: u32,
    ) -> TournamentResult<bool> {
        let matches = self
            .repo
            .list_matches(tournament_id, Some(Phase::Swiss))
            .await?;
        let round: Vec<&Match> = matches
            .iter()
            .filter(|m| m.round_number == round_number)
            .collect();
        Ok(!round.is_empty() && round.iter().all(|m| m.is_completed()))
    }

    /// Pair a Swiss round from the current standings.
    ///
    /// Fails unless `round_number` is the next round, every earlier Swiss
    /// match has a result and the bracket has not been built.
    pub async fn generate_swiss_round(
        &self,
        tournament_id: TournamentId,
        round_number: u32,
    ) -> TournamentResult<Vec<MatchId>> {
        let _guard = self.locks.acquire(tournament_id).await;
        self.generate_round_locked(tournament_id, round_number).await
    }

    async fn generate_round_locked(
        &self,
        tournament_id: TournamentId,
        round_number: u32,
    ) -> TournamentResult<Vec<MatchId>> {
        let tournament = self.load_tournament(tournament_id).await?;
        let matches = self.repo.list_matches(tournament_id, None).await?;

        if matches.iter().any(|m| m.phase == Phase::Elimination) {
            return Err(TournamentError::invalid(
                "the Swiss phase is over, the bracket already exists",
            ));
        }
        if let Some(pending) = matches.iter().find(|m| !m.is_completed()) {
            return Err(TournamentError::invalid(format!(
                "round {} still has pending match {}",
                pending.round_number, pending.id
            )));
        }
        let played = matches.iter().map(|m| m.round_number).max().unwrap_or(0);
        if round_number != played + 1 {
            return Err(TournamentError::invalid(format!(
                "next round to generate is {}, not {}",
                played + 1,
                round_number
            )));
        }

        let standings = self.calculator.standings(tournament_id).await?;
        if standings.len() < 2 {
            return Err(TournamentError::invalid(format!(
                "a Swiss round needs at least 2 teams, got {}",
                standings.len()
            )));
        }
        let planned_rounds = tournament.config.rounds_for(standings.len());
        if round_number > planned_rounds {
            return Err(TournamentError::invalid(format!(
                "tournament {} plays {} Swiss rounds",
                tournament_id, planned_rounds
            )));
        }

        let ranked: Vec<TeamId> = standings.iter().map(|s| s.team.id).collect();
        let history = PairingHistory::from_matches(&matches);
        let pairing = pair_round(
            &ranked,
            &history,
            tournament.config.pairing,
            self.settings.pairing_search_budget,
        );
        if pairing.pairs.is_empty() {
            return Err(TournamentError::PairingExhausted(round_number));
        }

        let teams: HashMap<TeamId, Team> = standings
            .into_iter()
            .map(|s| (s.team.id, s.team))
            .collect();
        let batch = swiss::build_round(tournament_id, round_number, &pairing, &teams)?;
        let ids = self.commit(tournament_id, batch).await?;

        log::info!(
            "Generated Swiss round {} for tournament {}: {} matches, bye: {:?}",
            round_number,
            tournament_id,
            pairing.pairs.len(),
            pairing.bye
        );
        Ok(ids)
    }

    // ===== Swiss results =====

    async fn lock_match(
        &self,
        match_id: MatchId,
    ) -> TournamentResult<tokio::sync::OwnedMutexGuard<()>> {
        let tournament_id = self.load_match(match_id).await?.tournament_id;
        Ok(self.locks.acquire(tournament_id).await)
    }

    async fn match_teams(&self, m: &Match) -> TournamentResult<(Team, Team)> {
        let (Some(team1_id), Some(team2_id)) = (m.team1_id, m.team2_id) else {
            return Err(TournamentError::invalid(format!(
                "match {} is a bye and has no result to edit",
                m.id
            )));
        };
        Ok((self.load_team(team1_id).await?, self.load_team(team2_id).await?))
    }

    async fn editable_swiss_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        let m = self.load_match(match_id).await?;
        if m.phase != Phase::Swiss {
            return Err(TournamentError::invalid(format!(
                "match {} is not a Swiss match",
                match_id
            )));
        }
        if m.is_bye() {
            return Err(TournamentError::invalid(format!(
                "match {} is a bye and has no result to edit",
                match_id
            )));
        }
        let bracket = self
            .repo
            .list_matches(m.tournament_id, Some(Phase::Elimination))
            .await?;
        if !bracket.is_empty() {
            return Err(TournamentError::invalid(
                "Swiss results are frozen once the bracket exists",
            ));
        }
        Ok(m)
    }

    /// Record a Swiss result and credit both teams in one atomic write
    pub async fn apply_match_result(
        &self,
        match_id: MatchId,
        score1: i32,
        score2: i32,
    ) -> TournamentResult<()> {
        let _guard = self.lock_match(match_id).await?;
        self.apply_result_locked(match_id, score1, score2)
            .await
            .map(|_| ())
    }

    async fn apply_result_locked(
        &self,
        match_id: MatchId,
        score1: i32,
        score2: i32,
    ) -> TournamentResult<Match> {
        let mut m = self.editable_swiss_match(match_id).await?;
        if m.is_completed() {
            return Err(TournamentError::invalid(format!(
                "match {} already has a result",
                match_id
            )));
        }

        let (mut team1, mut team2) = self.match_teams(&m).await?;
        apply_outcome(
            &mut team1,
            Some(&mut team2),
            SwissOutcome::Scored { score1, score2 },
        )?;
        record_score(&mut m, score1, score2);

        let batch = WriteBatch::new()
            .update_match(m.clone())
            .update_team(team1)
            .update_team(team2);
        self.commit(m.tournament_id, batch).await?;

        log::info!(
            "Recorded {}-{} in match {} (round {})",
            score1,
            score2,
            match_id,
            m.round_number
        );
        Ok(m)
    }

    /// Subtract a previously applied result from two teams.
    ///
    /// Uses the caller's scores and leaves match rows alone; prefer
    /// [`reopen_swiss_match`](Self::reopen_swiss_match) or
    /// [`correct_swiss_result`](Self::correct_swiss_result), which read the
    /// scores from the match itself.
    pub async fn reverse_match_result(
        &self,
        old_score1: i32,
        old_score2: i32,
        team1_id: TeamId,
        team2_id: TeamId,
    ) -> TournamentResult<()> {
        let tournament_id = self.load_team(team1_id).await?.tournament_id;
        let _guard = self.locks.acquire(tournament_id).await;

        let mut team1 = self.load_team(team1_id).await?;
        let mut team2 = self.load_team(team2_id).await?;
        if team2.tournament_id != tournament_id {
            return Err(TournamentError::invalid(format!(
                "teams {} and {} are in different tournaments",
                team1_id, team2_id
            )));
        }

        reverse_outcome(
            &mut team1,
            Some(&mut team2),
            SwissOutcome::Scored {
                score1: old_score1,
                score2: old_score2,
            },
        )?;
        self.commit(
            tournament_id,
            WriteBatch::new().update_team(team1).update_team(team2),
        )
        .await?;

        log::info!(
            "Reversed {}-{} between teams {} and {}",
            old_score1,
            old_score2,
            team1_id,
            team2_id
        );
        Ok(())
    }

    /// Undo a reported Swiss result and set the match back to pending
    pub async fn reopen_swiss_match(&self, match_id: MatchId) -> TournamentResult<()> {
        let _guard = self.lock_match(match_id).await?;
        let mut m = self.editable_swiss_match(match_id).await?;
        let outcome = stored_outcome(&m)?;

        let (mut team1, mut team2) = self.match_teams(&m).await?;
        reverse_outcome(&mut team1, Some(&mut team2), outcome)?;
        clear_score(&mut m);

        let tournament_id = m.tournament_id;
        self.commit(
            tournament_id,
            WriteBatch::new()
                .update_match(m)
                .update_team(team1)
                .update_team(team2),
        )
        .await?;

        log::info!("Reopened Swiss match {}", match_id);
        Ok(())
    }

    /// Replace the reported score of a completed Swiss match
    pub async fn correct_swiss_result(
        &self,
        match_id: MatchId,
        score1: i32,
        score2: i32,
    ) -> TournamentResult<()> {
        let _guard = self.lock_match(match_id).await?;
        let mut m = self.editable_swiss_match(match_id).await?;
        let old = stored_outcome(&m)?;
        let new = SwissOutcome::Scored { score1, score2 };

        let (mut team1, mut team2) = self.match_teams(&m).await?;
        reverse_outcome(&mut team1, Some(&mut team2), old)?;
        apply_outcome(&mut team1, Some(&mut team2), new)?;
        record_score(&mut m, score1, score2);

        let tournament_id = m.tournament_id;
        self.commit(
            tournament_id,
            WriteBatch::new()
                .update_match(m)
                .update_team(team1)
                .update_team(team2),
        )
        .await?;

        log::info!(
            "Corrected match {} from {:?} to {}-{}",
            match_id,
            old,
            score1,
            score2
        );
        Ok(())
    }

    /// Record a Swiss result, then move the tournament on when the round is
    /// finished and the tournament auto-advances
    pub async fn report_swiss_result(
        &self,
        match_id: MatchId,
        score1: i32,
        score2: i32,
    ) -> TournamentResult<RoundProgress> {
        let _guard = self.lock_match(match_id).await?;
        let m = self.apply_result_locked(match_id, score1, score2).await?;
        let tournament_id = m.tournament_id;
        let round = m.round_number;

        let matches = self
            .repo
            .list_matches(tournament_id, Some(Phase::Swiss))
            .await?;
        let remaining = matches
            .iter()
            .filter(|x| x.round_number == round && !x.is_completed())
            .count();
        if remaining > 0 {
            return Ok(RoundProgress::Pending { remaining });
        }

        let tournament = self.load_tournament(tournament_id).await?;
        if !tournament.config.auto_advance {
            return Ok(RoundProgress::RoundComplete { round });
        }

        let team_count = self.repo.list_teams(tournament_id).await?.len();
        if round < tournament.config.rounds_for(team_count) {
            match self.generate_round_locked(tournament_id, round + 1).await {
                Ok(_) => return Ok(RoundProgress::NextRound { round: round + 1 }),
                Err(TournamentError::PairingExhausted(next)) => log::warn!(
                    "Tournament {} cannot pair round {} without rematches, closing the Swiss phase",
                    tournament_id,
                    next
                ),
                Err(e) => return Err(e),
            }
        }

        let qualified = self
            .qualify_locked(tournament_id, tournament.config.qualifiers)
            .await?;
        self.generate_bracket_locked(tournament_id).await?;
        Ok(RoundProgress::BracketGenerated {
            qualifiers: qualified.len(),
        })
    }

    // ===== Standings =====

    /// Ranked standings, best first
    pub async fn get_standings(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Standing>> {
        self.load_tournament(tournament_id).await?;
        self.calculator.standings(tournament_id).await
    }

    /// Per-opponent breakdown of a team's Buchholz scores
    pub async fn calculate_detailed_buchholz(
        &self,
        team_id: TeamId,
        tournament_id: TournamentId,
    ) -> TournamentResult<BuchholzBreakdown> {
        self.calculator
            .calculate_detailed(team_id, tournament_id)
            .await
    }

    // ===== Elimination =====

    /// Mark the top `top_n` of the Swiss standings as qualified, seeded by
    /// rank, and everyone else as not qualified
    pub async fn qualify_for_elimination(
        &self,
        tournament_id: TournamentId,
        top_n: usize,
    ) -> TournamentResult<Vec<Team>> {
        let _guard = self.locks.acquire(tournament_id).await;
        self.qualify_locked(tournament_id, top_n).await
    }

    async fn qualify_locked(
        &self,
        tournament_id: TournamentId,
        top_n: usize,
    ) -> TournamentResult<Vec<Team>> {
        self.load_tournament(tournament_id).await?;
        let matches = self.repo.list_matches(tournament_id, None).await?;
        if matches.iter().any(|m| m.phase == Phase::Elimination) {
            return Err(TournamentError::invalid(
                "qualification is closed, the bracket already exists",
            ));
        }
        if matches.iter().any(|m| !m.is_completed()) {
            return Err(TournamentError::invalid(
                "cannot qualify teams while Swiss matches are pending",
            ));
        }
        if top_n < 2 {
            return Err(TournamentError::invalid(format!(
                "at least 2 teams must qualify, got {}",
                top_n
            )));
        }

        let standings = self.calculator.standings(tournament_id).await?;
        if standings.len() < top_n {
            log::warn!(
                "Tournament {} has {} teams, qualifying all of them instead of {}",
                tournament_id,
                standings.len(),
                top_n
            );
        }

        let mut batch = WriteBatch::new();
        let mut qualified = Vec::new();
        for standing in standings {
            let mut team = standing.team;
            let selected = standing.rank <= top_n;
            team.qualified_for_elimination = selected;
            team.seed = selected.then_some(standing.rank as u32);
            team.eliminated = false;
            if selected {
                qualified.push(team.clone());
            }
            batch = batch.update_team(team);
        }
        self.commit(tournament_id, batch).await?;

        log::info!(
            "Qualified {} teams for the bracket of tournament {}",
            qualified.len(),
            tournament_id
        );
        Ok(qualified)
    }

    /// Build the whole single-elimination bracket from the qualified teams
    pub async fn generate_bracket(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<MatchId>> {
        let _guard = self.locks.acquire(tournament_id).await;
        self.generate_bracket_locked(tournament_id).await
    }

    async fn generate_bracket_locked(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<MatchId>> {
        self.load_tournament(tournament_id).await?;
        let existing = self
            .repo
            .list_matches(tournament_id, Some(Phase::Elimination))
            .await?;
        if !existing.is_empty() {
            return Err(TournamentError::invalid(format!(
                "tournament {} already has a bracket",
                tournament_id
            )));
        }

        let mut qualified: Vec<Team> = self
            .repo
            .list_teams(tournament_id)
            .await?
            .into_iter()
            .filter(|t| t.qualified_for_elimination)
            .collect();
        qualified.sort_by_key(|t| (t.seed.unwrap_or(u32::MAX), t.id));

        let planned = elimination::plan_bracket(tournament_id, &qualified)?;
        let walkovers = planned.iter().filter(|m| m.is_completed()).count();
        let batch = WriteBatch {
            new_matches: planned,
            ..Default::default()
        };
        let ids = self.commit(tournament_id, batch).await?;

        log::info!(
            "Generated bracket for tournament {}: {} qualifiers, {} matches, {} walkovers",
            tournament_id,
            qualified.len(),
            ids.len(),
            walkovers
        );
        Ok(ids)
    }

    /// Mark an elimination match won and move the winner on.
    ///
    /// Returns the id of the match the winner advanced into, `None` after the
    /// final.
    pub async fn advance_winner(
        &self,
        match_id: MatchId,
        winner_id: TeamId,
    ) -> TournamentResult<Option<MatchId>> {
        let (tournament_id, next) = {
            let _guard = self.lock_match(match_id).await?;
            let target = self.load_match(match_id).await?;
            (target.tournament_id, self.advance_locked(target, winner_id).await?)
        };
        self.release_if_decided(tournament_id, next);
        Ok(next)
    }

    /// Drop the lock entry of a tournament whose final was just played.
    /// Reopening the final later simply creates a new one.
    fn release_if_decided(&self, tournament_id: TournamentId, next: Option<MatchId>) {
        if next.is_none() && self.locks.release(tournament_id) {
            log::debug!("Released lock of finished tournament {}", tournament_id);
        }
    }

    async fn advance_locked(
        &self,
        target: Match,
        winner_id: TeamId,
    ) -> TournamentResult<Option<MatchId>> {
        let tournament_id = target.tournament_id;
        let bracket = self
            .repo
            .list_matches(tournament_id, Some(Phase::Elimination))
            .await?;
        let advancement = elimination::advance(&target, winner_id, &bracket)?;

        let next_id = advancement.next.as_ref().map(|m| m.id);
        let mut batch = WriteBatch::new().update_match(advancement.completed);
        if let Some(next) = advancement.next {
            batch = batch.update_match(next);
        }
        if let Some(loser_id) = advancement.eliminated {
            let mut loser = self.load_team(loser_id).await?;
            loser.eliminated = true;
            batch = batch.update_team(loser);
        }
        self.commit(tournament_id, batch).await?;

        match next_id {
            Some(next) => log::info!(
                "Team {} won match {} and advances to match {}",
                winner_id,
                target.id,
                next
            ),
            None => log::info!(
                "Team {} won the final of tournament {}",
                winner_id,
                tournament_id
            ),
        }
        Ok(next_id)
    }

    /// Record an elimination score and advance its winner. Draws are refused.
    pub async fn report_elimination_result(
        &self,
        match_id: MatchId,
        score1: i32,
        score2: i32,
    ) -> TournamentResult<Option<MatchId>> {
        let (tournament_id, next) = {
            let _guard = self.lock_match(match_id).await?;
            let target = self.load_match(match_id).await?;
            let (target, winner_id) = scored_elimination_match(target, score1, score2)?;
            (target.tournament_id, self.advance_locked(target, winner_id).await?)
        };
        self.release_if_decided(tournament_id, next);
        Ok(next)
    }

    /// Undo a decided elimination match whose next match has not been played
    pub async fn reopen_elimination_match(&self, match_id: MatchId) -> TournamentResult<()> {
        let _guard = self.lock_match(match_id).await?;
        let target = self.load_match(match_id).await?;
        let tournament_id = target.tournament_id;
        let bracket = self
            .repo
            .list_matches(tournament_id, Some(Phase::Elimination))
            .await?;
        let reopening = elimination::reopen(&target, &bracket)?;

        let mut batch = WriteBatch::new().update_match(reopening.reopened);
        if let Some(next) = reopening.next {
            batch = batch.update_match(next);
        }
        if let Some(team_id) = reopening.reinstated {
            let mut team = self.load_team(team_id).await?;
            team.eliminated = false;
            batch = batch.update_team(team);
        }
        self.commit(tournament_id, batch).await?;

        log::info!("Reopened elimination match {}", match_id);
        Ok(())
    }

    /// Winner of the final, once it has been played
    pub async fn champion(&self, tournament_id: TournamentId) -> TournamentResult<Option<Team>> {
        let bracket = self
            .repo
            .list_matches(tournament_id, Some(Phase::Elimination))
            .await?;
        match elimination::champion(&bracket) {
            Some(team_id) => Ok(Some(self.load_team(team_id).await?)),
            None => Ok(None),
        }
    }
}

/// Validate an elimination score and fill it in, returning the winner
fn scored_elimination_match(
    mut target: Match,
    score1: i32,
    score2: i32,
) -> TournamentResult<(Match, TeamId)> {
    if score1 < 0 || score2 < 0 {
        return Err(TournamentError::invalid(format!(
            "scores must be non-negative, got {}-{}",
            score1, score2
        )));
    }
    if score1 == score2 {
        return Err(TournamentError::invalid(format!(
            "elimination match {} cannot end in a draw",
            target.id
        )));
    }
    let winner = if score1 > score2 {
        target.team1_id
    } else {
        target.team2_id
    };
    let winner_id = winner.ok_or_else(|| {
        TournamentError::invalid(format!("match {} is still waiting for an opponent", target.id))
    })?;

    target.team1_score = Some(score1);
    target.team2_score = Some(score2);
    Ok((target, winner_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryTournamentRepository;
    use crate::tournament::MatchStatus;

    async fn engine_with_teams(
        count: usize,
        config: TournamentConfig,
    ) -> (TournamentEngine, TournamentId) {
        let engine = TournamentEngine::new(Arc::new(MemoryTournamentRepository::new()));
        let tournament = engine.create_tournament("Test Open", config).await.unwrap();
        for i in 1..=count {
            engine
                .register_team(tournament, &format!("Team {}", i))
                .await
                .unwrap();
        }
        (engine, tournament)
    }

    #[tokio::test]
    async fn test_round_requires_previous_results() {
        let (engine, tournament) =
            engine_with_teams(4, TournamentConfig::standard().manual()).await;
        engine.generate_swiss_round(tournament, 1).await.unwrap();

        let err = engine.generate_swiss_round(tournament, 2).await.unwrap_err();
        assert!(matches!(err, TournamentError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn test_round_number_must_be_next() {
        let (engine, tournament) = engine_with_teams(4, TournamentConfig::standard()).await;
        assert!(engine.generate_swiss_round(tournament, 2).await.is_err());
        assert_eq!(engine.generate_swiss_round(tournament, 1).await.unwrap().len(), 2);
        assert!(engine.generate_swiss_round(tournament, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_registration_closes_after_first_round() {
        let (engine, tournament) = engine_with_teams(2, TournamentConfig::standard()).await;
        engine.generate_swiss_round(tournament, 1).await.unwrap();
        assert!(engine.register_team(tournament, "Late").await.is_err());
    }

    #[tokio::test]
    async fn test_result_cannot_be_applied_twice() {
        let (engine, tournament) =
            engine_with_teams(2, TournamentConfig::standard().manual()).await;
        let ids = engine.generate_swiss_round(tournament, 1).await.unwrap();

        engine.apply_match_result(ids[0], 10, 4).await.unwrap();
        let err = engine.apply_match_result(ids[0], 10, 4).await.unwrap_err();
        assert!(matches!(err, TournamentError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn test_bye_match_rejects_results() {
        let (engine, tournament) =
            engine_with_teams(3, TournamentConfig::standard().manual()).await;
        let ids = engine.generate_swiss_round(tournament, 1).await.unwrap();
        assert_eq!(ids.len(), 2);

        let bye = engine.repository().get_match(ids[1]).await.unwrap().unwrap();
        assert!(bye.is_bye());
        assert_eq!(bye.status, MatchStatus::Completed);
        assert!(engine.apply_match_result(ids[1], 1, 0).await.is_err());
        assert!(engine.reopen_swiss_match(ids[1]).await.is_err());
    }

    #[tokio::test]
    async fn test_negative_scores_rejected() {
        let (engine, tournament) = engine_with_teams(2, TournamentConfig::standard()).await;
        let ids = engine.generate_swiss_round(tournament, 1).await.unwrap();
        assert!(engine.apply_match_result(ids[0], -1, 3).await.is_err());

        let m = engine.repository().get_match(ids[0]).await.unwrap().unwrap();
        assert_eq!(m.status, MatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_reverse_rejects_unapplied_result() {
        let (engine, tournament) = engine_with_teams(2, TournamentConfig::standard()).await;
        let teams = engine.list_teams(tournament).await.unwrap();
        let err = engine
            .reverse_match_result(10, 5, teams[0].id, teams[1].id)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let engine = TournamentEngine::new(Arc::new(MemoryTournamentRepository::new()));
        assert!(matches!(
            engine.get_standings(5).await.unwrap_err(),
            TournamentError::TournamentNotFound(5)
        ));
        assert!(matches!(
            engine.apply_match_result(9, 1, 0).await.unwrap_err(),
            TournamentError::MatchNotFound(9)
        ));
        assert!(engine.register_team(5, "Nobody").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_report_progress_without_auto_advance() {
        let (engine, tournament) =
            engine_with_teams(4, TournamentConfig::standard().manual()).await;
        let ids = engine.generate_swiss_round(tournament, 1).await.unwrap();

        let first = engine.report_swiss_result(ids[0], 3, 1).await.unwrap();
        assert_eq!(first, RoundProgress::Pending { remaining: 1 });
        let second = engine.report_swiss_result(ids[1], 2, 2).await.unwrap();
        assert_eq!(second, RoundProgress::RoundComplete { round: 1 });
        assert!(engine.is_round_complete(tournament, 1).await.unwrap());
        assert!(!engine.is_round_complete(tournament, 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_elimination_draw_rejected() {
        let (engine, tournament) = engine_with_teams(2, TournamentConfig::standard()).await;
        engine.qualify_for_elimination(tournament, 2).await.unwrap();
        let ids = engine.generate_bracket(tournament).await.unwrap();
        assert_eq!(ids.len(), 1);

        let err = engine.report_elimination_result(ids[0], 5, 5).await.unwrap_err();
        assert!(matches!(err, TournamentError::InvalidOperation(_)));
        assert!(engine.champion(tournament).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bracket_cannot_be_generated_twice() {
        let (engine, tournament) = engine_with_teams(4, TournamentConfig::standard()).await;
        engine.qualify_for_elimination(tournament, 4).await.unwrap();
        engine.generate_bracket(tournament).await.unwrap();
        assert!(engine.generate_bracket(tournament).await.is_err());
        assert!(engine.qualify_for_elimination(tournament, 4).await.is_err());
    }

    #[tokio::test]
    async fn test_round_without_fresh_pairs_is_refused() {
        let config = TournamentConfig::standard().with_swiss_rounds(2).manual();
        let (engine, tournament) = engine_with_teams(2, config).await;
        let ids = engine.generate_swiss_round(tournament, 1).await.unwrap();
        engine.apply_match_result(ids[0], 4, 1).await.unwrap();

        for _ in 0..2 {
            let err = engine.generate_swiss_round(tournament, 2).await.unwrap_err();
            assert!(matches!(err, TournamentError::PairingExhausted(2)));
        }
        assert_eq!(engine.current_round(tournament).await.unwrap(), 1);
        assert_eq!(engine.list_matches(tournament, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_final_releases_tournament_lock() {
        let (engine, tournament) = engine_with_teams(2, TournamentConfig::standard()).await;
        engine.qualify_for_elimination(tournament, 2).await.unwrap();
        let ids = engine.generate_bracket(tournament).await.unwrap();
        assert_eq!(engine.locks.len(), 1);

        assert_eq!(engine.report_elimination_result(ids[0], 3, 1).await.unwrap(), None);
        assert!(engine.locks.is_empty());

        // Reopening the final still serializes through a fresh lock
        engine.reopen_elimination_match(ids[0]).await.unwrap();
        assert_eq!(engine.locks.len(), 1);
        assert!(engine.champion(tournament).await.unwrap().is_none());
    }
}
