//! Tournament data models: teams, matches and the Swiss aggregate record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::TournamentConfig;

/// Tournament ID type
pub type TournamentId = i64;

/// Team ID type
pub type TeamId = i64;

/// Match ID type
pub type MatchId = i64;

/// Points awarded for a Swiss win (and for a bye)
pub const POINTS_PER_WIN: i32 = 3;

/// Points awarded to each side of a Swiss draw
pub const POINTS_PER_DRAW: i32 = 1;

/// Tournament row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub config: TournamentConfig,
    pub created_at: DateTime<Utc>,
}

/// Running Swiss-phase aggregates of a team.
///
/// Between ledger operations `points == 3 * wins + draws` holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwissRecord {
    pub points: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub cups_for: i32,
    pub cups_against: i32,
}

impl SwissRecord {
    /// Cups scored minus cups conceded
    pub fn cup_diff(&self) -> i32 {
        self.cups_for - self.cups_against
    }

    /// Number of Swiss matches (byes included) counted in this record
    pub fn matches_played(&self) -> i32 {
        self.wins + self.draws + self.losses
    }
}

/// Team entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub tournament_id: TournamentId,
    pub name: String,
    /// Elimination seed, assigned at qualification (1 = best)
    pub seed: Option<u32>,
    pub record: SwissRecord,
    pub qualified_for_elimination: bool,
    pub eliminated: bool,
}

/// Tournament phase a match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Swiss,
    Elimination,
}

impl Phase {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Swiss => "swiss",
            Phase::Elimination => "elimination",
        }
    }

    /// Parse the storage representation
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "swiss" => Some(Phase::Swiss),
            "elimination" => Some(Phase::Elimination),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match status. `Completed` is terminal unless explicitly reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Completed,
}

impl MatchStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Completed => "completed",
        }
    }

    /// Parse the storage representation
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MatchStatus::Pending),
            "completed" => Some(MatchStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match row.
///
/// In the Swiss phase `team2_id == None` marks a bye. In the elimination phase
/// either side may be empty until a feeder match fills it, and a completed
/// round-1 match with one empty side is a walkover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round_number: u32,
    /// Ordering within the round (1-based)
    pub match_number: u32,
    pub phase: Phase,
    pub team1_id: Option<TeamId>,
    pub team2_id: Option<TeamId>,
    pub team1_score: Option<i32>,
    pub team2_score: Option<i32>,
    /// `None` on a completed Swiss match means a draw
    pub winner_id: Option<TeamId>,
    pub status: MatchStatus,
    /// Elimination label such as `R2M3`
    pub bracket_position: Option<String>,
    /// Elimination match the winner of this one advances into
    pub next_match_id: Option<MatchId>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Whether this is a Swiss bye (no second team)
    pub fn is_bye(&self) -> bool {
        self.phase == Phase::Swiss && self.team2_id.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    pub fn involves(&self, team_id: TeamId) -> bool {
        self.team1_id == Some(team_id) || self.team2_id == Some(team_id)
    }

    /// The other side of the match from `team_id`'s point of view.
    ///
    /// Returns `None` when `team_id` is not in the match or the other side is
    /// empty.
    pub fn opponent_of(&self, team_id: TeamId) -> Option<TeamId> {
        if self.team1_id == Some(team_id) {
            self.team2_id
        } else if self.team2_id == Some(team_id) {
            self.team1_id
        } else {
            None
        }
    }

    /// Loser of a decided match with two real teams
    pub fn loser_id(&self) -> Option<TeamId> {
        let winner = self.winner_id?;
        match (self.team1_id, self.team2_id) {
            (Some(t1), Some(t2)) if t1 == winner => Some(t2),
            (Some(t1), Some(t2)) if t2 == winner => Some(t1),
            _ => None,
        }
    }
}

/// A match row that has not been persisted yet.
///
/// `next` points at another entry of the same insert batch by index; storage
/// resolves it into `next_match_id` once ids are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub tournament_id: TournamentId,
    pub round_number: u32,
    pub match_number: u32,
    pub phase: Phase,
    pub team1_id: Option<TeamId>,
    pub team2_id: Option<TeamId>,
    pub team1_score: Option<i32>,
    pub team2_score: Option<i32>,
    pub winner_id: Option<TeamId>,
    pub status: MatchStatus,
    pub bracket_position: Option<String>,
    pub next: Option<usize>,
}

impl NewMatch {
    /// Pending Swiss pairing
    pub fn swiss(
        tournament_id: TournamentId,
        round_number: u32,
        match_number: u32,
        team1_id: TeamId,
        team2_id: TeamId,
    ) -> Self {
        Self {
            tournament_id,
            round_number,
            match_number,
            phase: Phase::Swiss,
            team1_id: Some(team1_id),
            team2_id: Some(team2_id),
            team1_score: None,
            team2_score: None,
            winner_id: None,
            status: MatchStatus::Pending,
            bracket_position: None,
            next: None,
        }
    }

    /// Swiss bye: created completed, 0-0, won by the only team
    pub fn bye(
        tournament_id: TournamentId,
        round_number: u32,
        match_number: u32,
        team_id: TeamId,
    ) -> Self {
        Self {
            tournament_id,
            round_number,
            match_number,
            phase: Phase::Swiss,
            team1_id: Some(team_id),
            team2_id: None,
            team1_score: Some(0),
            team2_score: Some(0),
            winner_id: Some(team_id),
            status: MatchStatus::Completed,
            bracket_position: None,
            next: None,
        }
    }

    /// Empty elimination slot pair labeled `R{round}M{match}`
    pub fn elimination(tournament_id: TournamentId, round_number: u32, match_number: u32) -> Self {
        Self {
            tournament_id,
            round_number,
            match_number,
            phase: Phase::Elimination,
            team1_id: None,
            team2_id: None,
            team1_score: None,
            team2_score: None,
            winner_id: None,
            status: MatchStatus::Pending,
            bracket_position: Some(format!("R{}M{}", round_number, match_number)),
            next: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }
}

/// A set of writes that storage must apply atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub new_matches: Vec<NewMatch>,
    pub match_updates: Vec<Match>,
    pub team_updates: Vec<Team>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_match(mut self, new_match: NewMatch) -> Self {
        self.new_matches.push(new_match);
        self
    }

    pub fn update_match(mut self, updated: Match) -> Self {
        self.match_updates.push(updated);
        self
    }

    pub fn update_team(mut self, updated: Team) -> Self {
        self.team_updates.push(updated);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.new_matches.is_empty() && self.match_updates.is_empty() && self.team_updates.is_empty()
    }
}

/// One row of the ranked standings table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// 1-based rank
    pub rank: usize,
    pub team: Team,
    pub swiss_points: i32,
    pub cup_diff: i32,
    pub median_buchholz: i32,
    pub opponents_buchholz: i32,
}
