//! Bracket construction and winner advancement.
//!
//! These functions only compute rows; the engine persists them.

use chrono::Utc;

use super::seeding::{bracket_rounds, bracket_size, generate_seeding_map};
use crate::tournament::{
    Match, MatchStatus, NewMatch, Phase, Team, TeamId, TournamentError, TournamentId,
    TournamentResult,
};

/// Build every match of a bracket for `qualified` teams ordered by seed.
///
/// Round-1 matches with an empty side are walkovers: created completed with
/// the present team as winner and already placed in their next match. Later
/// rounds start empty. `next` links point at round r+1 match ⌊i/2⌋.
pub fn plan_bracket(
    tournament_id: TournamentId,
    qualified: &[Team],
) -> TournamentResult<Vec<NewMatch>> {
    if qualified.len() < 2 {
        return Err(TournamentError::invalid(format!(
            "a bracket needs at least 2 qualified teams, got {}",
            qualified.len()
        )));
    }

    let size = bracket_size(qualified.len());
    let rounds = bracket_rounds(qualified.len());
    let slots: Vec<Option<TeamId>> = generate_seeding_map(size)
        .into_iter()
        .map(|seed| qualified.get(seed - 1).map(|t| t.id))
        .collect();

    let mut matches = Vec::with_capacity(size - 1);
    for round in 1..=rounds {
        let count = size >> round;
        for index in 0..count {
            let mut m = NewMatch::elimination(tournament_id, round, index as u32 + 1);
            if round < rounds {
                m.next = Some(matches.len() - index + count + index / 2);
            }
            matches.push(m);
        }
    }

    for (index, pair) in slots.chunks(2).enumerate() {
        let (team1, team2) = (pair[0], pair[1]);
        let first = &mut matches[index];
        first.team1_id = team1;
        first.team2_id = team2;

        let walkover_winner = match (team1, team2) {
            (Some(_), Some(_)) => continue,
            (Some(team), None) | (None, Some(team)) => team,
            (None, None) => {
                return Err(TournamentError::invalid(
                    "bracket slot pair has no teams; seeding map and qualifier count disagree",
                ));
            }
        };
        first.winner_id = Some(walkover_winner);
        first.status = MatchStatus::Completed;

        if let Some(next) = first.next {
            let target = &mut matches[next];
            if index % 2 == 0 {
                target.team1_id = Some(walkover_winner);
            } else {
                target.team2_id = Some(walkover_winner);
            }
        }
    }

    Ok(matches)
}

/// Result of advancing a winner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advancement {
    /// The decided match
    pub completed: Match,
    /// The next match with the winner placed in it
    pub next: Option<Match>,
    /// Loser to mark eliminated (none for a walkover)
    pub eliminated: Option<TeamId>,
}

/// Position of `target` among the feeders of its next match (0 = team1 slot)
fn feeder_slot(target: &Match, bracket: &[Match]) -> Option<(usize, Match)> {
    let next_id = target.next_match_id?;
    let mut feeders: Vec<&Match> = bracket
        .iter()
        .filter(|m| m.next_match_id == Some(next_id))
        .collect();
    feeders.sort_by_key(|m| (m.match_number, m.id));
    let position = feeders.iter().position(|m| m.id == target.id)?;
    let next = bracket.iter().find(|m| m.id == next_id)?.clone();
    Some((position, next))
}

fn check_elimination(target: &Match) -> TournamentResult<()> {
    if target.phase != Phase::Elimination {
        return Err(TournamentError::invalid(format!(
            "match {} is not an elimination match",
            target.id
        )));
    }
    Ok(())
}

/// Mark `target` won by `winner_id` and place the winner in the next match.
///
/// `bracket` holds every elimination match of the tournament.
pub fn advance(
    target: &Match,
    winner_id: TeamId,
    bracket: &[Match],
) -> TournamentResult<Advancement> {
    check_elimination(target)?;
    if target.is_completed() {
        return Err(TournamentError::invalid(format!(
            "match {} is already completed",
            target.id
        )));
    }
    if target.team1_id.is_none() || target.team2_id.is_none() {
        return Err(TournamentError::invalid(format!(
            "match {} is still waiting for an opponent",
            target.id
        )));
    }
    if !target.involves(winner_id) {
        return Err(TournamentError::invalid(format!(
            "team {} is not playing in match {}",
            winner_id, target.id
        )));
    }

    let mut completed = target.clone();
    completed.winner_id = Some(winner_id);
    completed.status = MatchStatus::Completed;
    completed.completed_at = Some(Utc::now());
    let eliminated = completed.loser_id();

    let next = match target.next_match_id {
        None => None,
        Some(next_id) => {
            let (position, mut next) = feeder_slot(target, bracket)
                .ok_or(TournamentError::MatchNotFound(next_id))?;
            let slot = if position == 0 {
                &mut next.team1_id
            } else {
                &mut next.team2_id
            };
            if slot.is_some_and(|t| t != winner_id) {
                return Err(TournamentError::invalid(format!(
                    "slot in match {} is already taken",
                    next.id
                )));
            }
            *slot = Some(winner_id);
            Some(next)
        }
    };

    Ok(Advancement {
        completed,
        next,
        eliminated,
    })
}

/// Result of reopening a decided elimination match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reopening {
    /// The match, back to pending with no result
    pub reopened: Match,
    /// The next match with the slot this match filled cleared
    pub next: Option<Match>,
    /// Loser whose elimination is rolled back
    pub reinstated: Option<TeamId>,
}

/// Undo a decided elimination match.
///
/// Refused when the dependent match has already been played, and for
/// walkovers, which have nothing to re-decide.
pub fn reopen(target: &Match, bracket: &[Match]) -> TournamentResult<Reopening> {
    check_elimination(target)?;
    if !target.is_completed() {
        return Err(TournamentError::invalid(format!(
            "match {} has not been decided",
            target.id
        )));
    }
    if target.team1_id.is_none() || target.team2_id.is_none() {
        return Err(TournamentError::invalid(format!(
            "match {} is a walkover and cannot be reopened",
            target.id
        )));
    }

    let next = match target.next_match_id {
        None => None,
        Some(next_id) => {
            let (position, mut next) = feeder_slot(target, bracket)
                .ok_or(TournamentError::MatchNotFound(next_id))?;
            if next.is_completed() {
                return Err(TournamentError::invalid(format!(
                    "match {} depends on match {} and has already been played",
                    next.id, target.id
                )));
            }
            if position == 0 {
                next.team1_id = None;
            } else {
                next.team2_id = None;
            }
            Some(next)
        }
    };

    let reinstated = target.loser_id();
    let mut reopened = target.clone();
    reopened.team1_score = None;
    reopened.team2_score = None;
    reopened.winner_id = None;
    reopened.status = MatchStatus::Pending;
    reopened.completed_at = None;

    Ok(Reopening {
        reopened,
        next,
        reinstated,
    })
}

/// Winner of the final, once it is decided
pub fn champion(bracket: &[Match]) -> Option<TeamId> {
    bracket
        .iter()
        .find(|m| m.next_match_id.is_none() && m.phase == Phase::Elimination)
        .filter(|m| m.is_completed())
        .and_then(|m| m.winner_id)
}
