//! Match result ledger.
//!
//! Every change to a team's Swiss aggregates goes through [`apply_outcome`] or
//! [`reverse_outcome`]. A bye is just another [`SwissOutcome`], so the bye
//! credit and a reported score share one code path.

use chrono::Utc;

use crate::tournament::{
    Match, MatchStatus, POINTS_PER_DRAW, POINTS_PER_WIN, SwissRecord, Team, TournamentError,
    TournamentResult,
};

/// Result of a Swiss match from the ledger's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwissOutcome {
    /// A played match; equal scores are a draw
    Scored { score1: i32, score2: i32 },
    /// No opponent: the single team gets a win worth a full 3 points
    Bye,
}

impl SwissOutcome {
    pub fn is_draw(&self) -> bool {
        matches!(self, SwissOutcome::Scored { score1, score2 } if score1 == score2)
    }
}

/// Change to one team's aggregates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordDelta {
    pub points: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub cups_for: i32,
    pub cups_against: i32,
}

impl RecordDelta {
    fn scored(own: i32, other: i32) -> Self {
        let mut delta = RecordDelta {
            cups_for: own,
            cups_against: other,
            ..Default::default()
        };
        if own > other {
            delta.points = POINTS_PER_WIN;
            delta.wins = 1;
        } else if own < other {
            delta.losses = 1;
        } else {
            delta.points = POINTS_PER_DRAW;
            delta.draws = 1;
        }
        delta
    }

    fn bye() -> Self {
        RecordDelta {
            points: POINTS_PER_WIN,
            wins: 1,
            ..Default::default()
        }
    }
}

/// Deltas for team1 and (if present) team2
pub fn outcome_deltas(outcome: SwissOutcome) -> (RecordDelta, Option<RecordDelta>) {
    match outcome {
        SwissOutcome::Scored { score1, score2 } => (
            RecordDelta::scored(score1, score2),
            Some(RecordDelta::scored(score2, score1)),
        ),
        SwissOutcome::Bye => (RecordDelta::bye(), None),
    }
}

impl SwissRecord {
    pub fn apply(&mut self, delta: &RecordDelta) {
        self.points += delta.points;
        self.wins += delta.wins;
        self.draws += delta.draws;
        self.losses += delta.losses;
        self.cups_for += delta.cups_for;
        self.cups_against += delta.cups_against;
    }

    /// Inverse of [`SwissRecord::apply`]. Leaves the record untouched and
    /// fails if any field would go negative, which means the delta was never
    /// applied to this record.
    pub fn revert(&mut self, delta: &RecordDelta) -> TournamentResult<()> {
        let reverted = SwissRecord {
            points: self.points - delta.points,
            wins: self.wins - delta.wins,
            draws: self.draws - delta.draws,
            losses: self.losses - delta.losses,
            cups_for: self.cups_for - delta.cups_for,
            cups_against: self.cups_against - delta.cups_against,
        };
        let fields = [
            reverted.points,
            reverted.wins,
            reverted.draws,
            reverted.losses,
            reverted.cups_for,
            reverted.cups_against,
        ];
        if fields.iter().any(|&v| v < 0) {
            return Err(TournamentError::invalid(
                "reversal does not match the recorded aggregates",
            ));
        }
        *self = reverted;
        Ok(())
    }
}

fn check_pair(team1: &Team, team2: Option<&Team>, outcome: SwissOutcome) -> TournamentResult<()> {
    match (outcome, team2) {
        (SwissOutcome::Bye, None) => Ok(()),
        (SwissOutcome::Bye, Some(_)) => Err(TournamentError::invalid(
            "a bye cannot have a second team",
        )),
        (SwissOutcome::Scored { .. }, None) => Err(TournamentError::invalid(
            "cannot record a score on a bye match",
        )),
        (SwissOutcome::Scored { score1, score2 }, Some(team2)) => {
            if score1 < 0 || score2 < 0 {
                return Err(TournamentError::invalid(format!(
                    "scores must be non-negative, got {}-{}",
                    score1, score2
                )));
            }
            if team1.id == team2.id {
                return Err(TournamentError::invalid("a team cannot play itself"));
            }
            Ok(())
        }
    }
}

/// Credit an outcome to the participating teams
pub fn apply_outcome(
    team1: &mut Team,
    team2: Option<&mut Team>,
    outcome: SwissOutcome,
) -> TournamentResult<()> {
    check_pair(team1, team2.as_deref(), outcome)?;
    let (delta1, delta2) = outcome_deltas(outcome);
    team1.record.apply(&delta1);
    if let (Some(team2), Some(delta2)) = (team2, delta2) {
        team2.record.apply(&delta2);
    }
    Ok(())
}

/// Exact inverse of [`apply_outcome`] for the same outcome.
///
/// Either both teams are reverted or neither is.
pub fn reverse_outcome(
    team1: &mut Team,
    team2: Option<&mut Team>,
    outcome: SwissOutcome,
) -> TournamentResult<()> {
    check_pair(team1, team2.as_deref(), outcome)?;
    let (delta1, delta2) = outcome_deltas(outcome);

    let mut record1 = team1.record;
    record1.revert(&delta1)?;
    match (team2, delta2) {
        (Some(team2), Some(delta2)) => {
            let mut record2 = team2.record;
            record2.revert(&delta2)?;
            team2.record = record2;
        }
        _ => {}
    }
    team1.record = record1;
    Ok(())
}

/// Write a reported Swiss score onto the match row
pub fn record_score(swiss_match: &mut Match, score1: i32, score2: i32) {
    swiss_match.team1_score = Some(score1);
    swiss_match.team2_score = Some(score2);
    swiss_match.winner_id = if score1 > score2 {
        swiss_match.team1_id
    } else if score2 > score1 {
        swiss_match.team2_id
    } else {
        None
    };
    swiss_match.status = MatchStatus::Completed;
    swiss_match.completed_at = Some(Utc::now());
}

/// Reset a match row back to pending
pub fn clear_score(swiss_match: &mut Match) {
    swiss_match.team1_score = None;
    swiss_match.team2_score = None;
    swiss_match.winner_id = None;
    swiss_match.status = MatchStatus::Pending;
    swiss_match.completed_at = None;
}

/// Outcome stored on a completed Swiss match row
pub fn stored_outcome(swiss_match: &Match) -> TournamentResult<SwissOutcome> {
    if swiss_match.is_bye() {
        return Ok(SwissOutcome::Bye);
    }
    match (swiss_match.team1_score, swiss_match.team2_score) {
        (Some(score1), Some(score2)) if swiss_match.is_completed() => {
            Ok(SwissOutcome::Scored { score1, score2 })
        }
        _ => Err(TournamentError::invalid(format!(
            "match {} has no reported result",
            swiss_match.id
        ))),
    }
}
