//! Median-Buchholz and Opponents' Buchholz tiebreaks.
//!
//! All scores for a tournament are computed from a single points snapshot so
//! every team is measured against the same state.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tournament::{Match, Phase, Team, TeamId};

/// Current Swiss points per team
pub type PointsSnapshot = HashMap<TeamId, i32>;

/// One opponent faced by a team. `opponent_id == None` is the bye ghost,
/// which always counts as a 0-point opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentRecord {
    pub opponent_id: Option<TeamId>,
    pub round_number: u32,
}

/// Tiebreak scores of one team
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScores {
    pub swiss_points: i32,
    pub cup_diff: i32,
    pub median_buchholz: i32,
    pub opponents_buchholz: i32,
}

/// Whether the median rule drops the extreme opponents
pub fn is_median_rule_applied(opponent_count: usize) -> bool {
    opponent_count >= 3
}

/// Build the points snapshot from team rows
pub fn points_snapshot(teams: &[Team]) -> PointsSnapshot {
    teams.iter().map(|t| (t.id, t.record.points)).collect()
}

/// Opponents a team has faced in non-pending Swiss matches, in round order
pub fn opponents_of(team_id: TeamId, matches: &[Match]) -> Vec<OpponentRecord> {
    let mut opponents: Vec<OpponentRecord> = matches
        .iter()
        .filter(|m| m.phase == Phase::Swiss && m.is_completed() && m.involves(team_id))
        .map(|m| OpponentRecord {
            opponent_id: m.opponent_of(team_id),
            round_number: m.round_number,
        })
        .collect();
    opponents.sort_by_key(|o| o.round_number);
    opponents
}

fn opponent_points(opponent: &OpponentRecord, snapshot: &PointsSnapshot) -> i32 {
    opponent
        .opponent_id
        .and_then(|id| snapshot.get(&id).copied())
        .unwrap_or(0)
}

/// How the median rule split a list of opponent scores
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedianSplit {
    /// Counted scores, ascending
    pub used: Vec<i32>,
    /// Dropped lowest and highest, in that order
    pub excluded: Vec<i32>,
    /// Per input position: whether the score was counted
    pub included: Vec<bool>,
}

impl MedianSplit {
    pub fn total(&self) -> i32 {
        self.used.iter().sum()
    }
}

/// Apply the median rule to scores given in encounter order.
///
/// The sort is stable, so among equal scores the earliest-encountered one is
/// dropped as the lowest and the latest-encountered one as the highest.
pub fn median_split(scores: &[i32]) -> MedianSplit {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by_key(|&i| scores[i]);

    let mut included = vec![true; scores.len()];
    let mut excluded = Vec::new();
    if is_median_rule_applied(scores.len()) {
        let (lowest, highest) = (order[0], order[order.len() - 1]);
        included[lowest] = false;
        included[highest] = false;
        excluded = vec![scores[lowest], scores[highest]];
    }

    let used = order
        .iter()
        .filter(|&&i| included[i])
        .map(|&i| scores[i])
        .collect();

    MedianSplit {
        used,
        excluded,
        included,
    }
}

/// Median-Buchholz of an opponent list
pub fn simple_median_buchholz(opponents: &[OpponentRecord], snapshot: &PointsSnapshot) -> i32 {
    let scores: Vec<i32> = opponents
        .iter()
        .map(|o| opponent_points(o, snapshot))
        .collect();
    median_split(&scores).total()
}

/// Opponents' Buchholz: the sum of each opponent's own Median-Buchholz.
///
/// Only one level deep; opponents' scores come from `median_buchholz`, which
/// must already hold every team of the snapshot. The bye ghost adds 0.
pub fn opponents_buchholz(
    opponents: &[OpponentRecord],
    median_buchholz: &HashMap<TeamId, i32>,
) -> i32 {
    opponents
        .iter()
        .filter_map(|o| o.opponent_id)
        .map(|id| median_buchholz.get(&id).copied().unwrap_or(0))
        .sum()
}

/// Score every team from one snapshot
pub fn score_all(
    teams: &[Team],
    opponents: &HashMap<TeamId, Vec<OpponentRecord>>,
) -> HashMap<TeamId, TeamScores> {
    let snapshot = points_snapshot(teams);
    let no_opponents = Vec::new();
    let opponents_for = |id: TeamId| opponents.get(&id).unwrap_or(&no_opponents);

    let median: HashMap<TeamId, i32> = teams
        .iter()
        .map(|t| (t.id, simple_median_buchholz(opponents_for(t.id), &snapshot)))
        .collect();

    teams
        .iter()
        .map(|t| {
            let scores = TeamScores {
                swiss_points: t.record.points,
                cup_diff: t.record.cup_diff(),
                median_buchholz: median[&t.id],
                opponents_buchholz: opponents_buchholz(opponents_for(t.id), &median),
            };
            (t.id, scores)
        })
        .collect()
}

/// Ranking order: points, cup difference, MB, OMB (all descending), then
/// team id ascending so equal teams always rank the same way.
pub fn compare_ranking(a: (TeamId, &TeamScores), b: (TeamId, &TeamScores)) -> Ordering {
    let (a_id, a) = a;
    let (b_id, b) = b;
    b.swiss_points
        .cmp(&a.swiss_points)
        .then(b.cup_diff.cmp(&a.cup_diff))
        .then(b.median_buchholz.cmp(&a.median_buchholz))
        .then(b.opponents_buchholz.cmp(&a.opponents_buchholz))
        .then(a_id.cmp(&b_id))
}
