//! Standings and Buchholz tiebreaks.
//!
//! Teams are ranked by Swiss points, then cup difference, then
//! Median-Buchholz (MB), then Opponents' Buchholz (OMB), then team id.
//!
//! MB sums the current points of a team's opponents, dropping the single
//! lowest and highest value once there are three or more opponents. A bye
//! counts as a 0-point opponent. OMB sums the MB of each opponent and stops
//! there; it is not applied recursively.

pub mod buchholz;
pub mod calculator;

pub use buchholz::{
    MedianSplit, OpponentRecord, PointsSnapshot, TeamScores, compare_ranking,
    is_median_rule_applied, median_split, opponents_buchholz, opponents_of, score_all,
    simple_median_buchholz,
};
pub use calculator::{BuchholzBreakdown, OpponentContribution, StandingsCalculator};
