//! Swiss phase: pairing and the result ledger.
//!
//! Rounds are paired from the ranked standings, never repeat a pairing, and
//! hand a bye to one team when the count is odd. Results flow through the
//! [`ledger`], which is the only place team aggregates change.

pub mod ledger;
pub mod pairing;

pub use ledger::{
    RecordDelta, SwissOutcome, apply_outcome, clear_score, outcome_deltas, record_score,
    reverse_outcome, stored_outcome,
};
pub use pairing::{
    PairingHistory, PairingStrategy, RoundPairing, pair_backtracking, pair_greedy, pair_round,
};

use std::collections::HashMap;

use crate::tournament::{
    Match, NewMatch, Team, TeamId, TournamentError, TournamentId, TournamentResult, WriteBatch,
};

/// Number of Swiss rounds for `team_count` teams: `ceil(log2(team_count))`
pub fn calculate_swiss_rounds(team_count: usize) -> u32 {
    if team_count <= 1 {
        0
    } else {
        team_count.next_power_of_two().trailing_zeros()
    }
}

/// Whether a match is a Swiss bye
pub fn is_bye_match(m: &Match) -> bool {
    m.is_bye()
}

/// Turn a round's pairing into one write batch: the pending matches, the
/// completed bye match and the bye team's credit.
pub fn build_round(
    tournament_id: TournamentId,
    round_number: u32,
    pairing: &RoundPairing,
    teams: &HashMap<TeamId, Team>,
) -> TournamentResult<WriteBatch> {
    let mut batch = WriteBatch::new();
    let mut match_number = 0;

    for &(team1, team2) in &pairing.pairs {
        match_number += 1;
        batch = batch.insert_match(NewMatch::swiss(
            tournament_id,
            round_number,
            match_number,
            team1,
            team2,
        ));
    }

    if let Some(bye_team) = pairing.bye {
        match_number += 1;
        let mut team = teams
            .get(&bye_team)
            .cloned()
            .ok_or(TournamentError::TeamNotFound(bye_team))?;
        apply_outcome(&mut team, None, SwissOutcome::Bye)?;
        batch = batch
            .insert_match(NewMatch::bye(tournament_id, round_number, match_number, bye_team))
            .update_team(team);
    }

    Ok(batch)
}
