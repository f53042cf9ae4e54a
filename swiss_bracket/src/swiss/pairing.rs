//! Swiss pairing.
//!
//! Teams arrive ranked best-first. Two strategies are available: the legacy
//! nearest-available greedy scan, and a backtracking search that always finds
//! a rematch-free pairing when one exists.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::tournament::{Match, Phase, TeamId};

/// How a Swiss round is paired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingStrategy {
    /// Forward scan for the first unplayed, unpaired team. Can strand teams.
    Greedy,
    /// Depth-first search for a perfect rematch-free matching
    Backtracking,
}

/// Who has played whom, and who already had a bye
#[derive(Debug, Clone, Default)]
pub struct PairingHistory {
    played: HashSet<(TeamId, TeamId)>,
    byes: HashSet<TeamId>,
}

fn pair_key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl PairingHistory {
    /// Build from every Swiss match of the tournament, pending ones included
    pub fn from_matches(matches: &[Match]) -> Self {
        let mut history = Self::default();
        for m in matches.iter().filter(|m| m.phase == Phase::Swiss) {
            match (m.team1_id, m.team2_id) {
                (Some(a), Some(b)) => history.record_pair(a, b),
                (Some(a), None) => history.record_bye(a),
                _ => {}
            }
        }
        history
    }

    pub fn record_pair(&mut self, a: TeamId, b: TeamId) {
        self.played.insert(pair_key(a, b));
    }

    pub fn record_bye(&mut self, team: TeamId) {
        self.byes.insert(team);
    }

    pub fn has_played(&self, a: TeamId, b: TeamId) -> bool {
        self.played.contains(&pair_key(a, b))
    }

    pub fn has_bye(&self, team: TeamId) -> bool {
        self.byes.contains(&team)
    }
}

/// Pairings for one round. `pairs` hold the higher-ranked team first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundPairing {
    pub pairs: Vec<(TeamId, TeamId)>,
    pub bye: Option<TeamId>,
    /// Teams the strategy could not place at all
    pub unpaired: Vec<TeamId>,
}

/// Nearest-available greedy pairing.
///
/// When the scan strands teams, an odd number of leftovers gives the last one
/// the bye and the rest sit the round out.
pub fn pair_greedy(ranked: &[TeamId], history: &PairingHistory) -> RoundPairing {
    let mut paired = vec![false; ranked.len()];
    let mut pairing = RoundPairing::default();

    for i in 0..ranked.len() {
        if paired[i] {
            continue;
        }
        let partner = (i + 1..ranked.len())
            .find(|&j| !paired[j] && !history.has_played(ranked[i], ranked[j]));
        if let Some(j) = partner {
            paired[i] = true;
            paired[j] = true;
            pairing.pairs.push((ranked[i], ranked[j]));
        }
    }

    let mut leftover: Vec<TeamId> = ranked
        .iter()
        .zip(&paired)
        .filter(|&(_, &p)| !p)
        .map(|(&t, _)| t)
        .collect();
    if leftover.len() % 2 == 1 {
        pairing.bye = leftover.pop();
    }
    pairing.unpaired = leftover;
    pairing
}

enum Search {
    Found,
    Exhausted,
    BudgetSpent,
}

struct Matcher<'a> {
    ranked: &'a [TeamId],
    history: &'a PairingHistory,
    used: Vec<bool>,
    pairs: Vec<(TeamId, TeamId)>,
    steps_left: usize,
}

impl Matcher<'_> {
    fn search(&mut self) -> Search {
        let Some(i) = self.used.iter().position(|&u| !u) else {
            return Search::Found;
        };
        self.used[i] = true;
        for j in i + 1..self.ranked.len() {
            if self.used[j] || self.history.has_played(self.ranked[i], self.ranked[j]) {
                continue;
            }
            if self.steps_left == 0 {
                self.used[i] = false;
                return Search::BudgetSpent;
            }
            self.steps_left -= 1;

            self.used[j] = true;
            self.pairs.push((self.ranked[i], self.ranked[j]));
            match self.search() {
                Search::Exhausted => {}
                done => return done,
            }
            self.pairs.pop();
            self.used[j] = false;
        }
        self.used[i] = false;
        Search::Exhausted
    }
}

/// Backtracking pairing over the "has not played" graph.
///
/// Prefers partners close in the ranking, exactly like the greedy scan, and
/// only deviates where the greedy choice would strand someone. With an odd
/// count the bye goes to the lowest-ranked team without a previous bye for
/// which the rest can still be paired. Returns `None` if no rematch-free
/// pairing exists or the search budget runs out.
pub fn pair_backtracking(
    ranked: &[TeamId],
    history: &PairingHistory,
    budget: usize,
) -> Option<RoundPairing> {
    let mut matcher = Matcher {
        ranked,
        history,
        used: vec![false; ranked.len()],
        pairs: Vec::with_capacity(ranked.len() / 2),
        steps_left: budget,
    };

    if ranked.len() % 2 == 0 {
        return match matcher.search() {
            Search::Found => Some(RoundPairing {
                pairs: matcher.pairs,
                ..Default::default()
            }),
            _ => None,
        };
    }

    let fresh = (0..ranked.len()).rev().filter(|&i| !history.has_bye(ranked[i]));
    let repeat = (0..ranked.len()).rev().filter(|&i| history.has_bye(ranked[i]));
    for candidate in fresh.chain(repeat) {
        matcher.used[candidate] = true;
        match matcher.search() {
            Search::Found => {
                return Some(RoundPairing {
                    pairs: matcher.pairs,
                    bye: Some(ranked[candidate]),
                    unpaired: Vec::new(),
                });
            }
            Search::BudgetSpent => return None,
            Search::Exhausted => matcher.used[candidate] = false,
        }
    }
    None
}

/// Pair a ranked list with the given strategy.
///
/// Backtracking degrades to the greedy result when it cannot find a complete
/// pairing, so the round can still be played.
pub fn pair_round(
    ranked: &[TeamId],
    history: &PairingHistory,
    strategy: PairingStrategy,
    budget: usize,
) -> RoundPairing {
    let pairing = match strategy {
        PairingStrategy::Greedy => pair_greedy(ranked, history),
        PairingStrategy::Backtracking => pair_backtracking(ranked, history, budget)
            .unwrap_or_else(|| {
                log::warn!(
                    "No complete rematch-free pairing found for {} teams, falling back to greedy",
                    ranked.len()
                );
                pair_greedy(ranked, history)
            }),
    };
    if !pairing.unpaired.is_empty() {
        log::warn!(
            "Pairing left {} team(s) without a match: {:?}",
            pairing.unpaired.len(),
            pairing.unpaired
        );
    }
    pairing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(pairs: &[(TeamId, TeamId)]) -> PairingHistory {
        let mut history = PairingHistory::default();
        for &(a, b) in pairs {
            history.record_pair(a, b);
        }
        history
    }

    #[test]
    fn test_greedy_pairs_neighbours() {
        let pairing = pair_greedy(&[1, 2, 3, 4], &PairingHistory::default());
        assert_eq!(pairing.pairs, vec![(1, 2), (3, 4)]);
        assert_eq!(pairing.bye, None);
    }

    #[test]
    fn test_greedy_skips_rematches() {
        let pairing = pair_greedy(&[1, 2, 3, 4], &history(&[(1, 2)]));
        assert_eq!(pairing.pairs, vec![(1, 3), (2, 4)]);
    }

    #[test]
    fn test_greedy_odd_count_gives_last_team_bye() {
        let pairing = pair_greedy(&[1, 2, 3, 4, 5], &PairingHistory::default());
        assert_eq!(pairing.pairs, vec![(1, 2), (3, 4)]);
        assert_eq!(pairing.bye, Some(5));
    }

    #[test]
    fn test_greedy_can_strand_teams() {
        // 1-2 is taken first, leaving 3 and 4 who already met
        let pairing = pair_greedy(&[1, 2, 3, 4], &history(&[(3, 4)]));
        assert_eq!(pairing.pairs, vec![(1, 2)]);
        assert_eq!(pairing.unpaired, vec![3, 4]);
    }

    #[test]
    fn test_backtracking_repairs_greedy_dead_end() {
        let pairing = pair_backtracking(&[1, 2, 3, 4], &history(&[(3, 4)]), 1000).unwrap();
        assert_eq!(pairing.pairs, vec![(1, 3), (2, 4)]);
        assert!(pairing.unpaired.is_empty());
    }

    #[test]
    fn test_backtracking_matches_greedy_when_greedy_works() {
        let ranked = [1, 2, 3, 4, 5, 6];
        let h = history(&[(1, 2), (3, 5)]);
        let greedy = pair_greedy(&ranked, &h);
        let backtracking = pair_backtracking(&ranked, &h, 1000).unwrap();
        assert_eq!(greedy, backtracking);
    }

    #[test]
    fn test_backtracking_bye_prefers_team_without_bye() {
        let mut h = PairingHistory::default();
        h.record_bye(5);
        let pairing = pair_backtracking(&[1, 2, 3, 4, 5], &h, 1000).unwrap();
        assert_eq!(pairing.bye, Some(4));
        assert_eq!(pairing.pairs, vec![(1, 2), (3, 5)]);
    }

    #[test]
    fn test_backtracking_reports_impossible_pairing() {
        assert!(pair_backtracking(&[1, 2], &history(&[(1, 2)]), 1000).is_none());
    }

    #[test]
    fn test_backtracking_respects_budget() {
        let ranked: Vec<TeamId> = (1..=8).collect();
        assert!(pair_backtracking(&ranked, &PairingHistory::default(), 0).is_none());
    }

    #[test]
    fn test_pair_round_falls_back_to_greedy() {
        let pairing = pair_round(&[1, 2], &history(&[(1, 2)]), PairingStrategy::Backtracking, 1000);
        assert!(pairing.pairs.is_empty());
        assert_eq!(pairing.unpaired, vec![1, 2]);
    }

    #[test]
    fn test_history_from_matches_tracks_byes() {
        use crate::tournament::MatchStatus;

        let bye = Match {
            id: 1,
            tournament_id: 1,
            round_number: 1,
            match_number: 2,
            phase: Phase::Swiss,
            team1_id: Some(7),
            team2_id: None,
            team1_score: Some(0),
            team2_score: Some(0),
            winner_id: Some(7),
            status: MatchStatus::Completed,
            bracket_position: None,
            next_match_id: None,
            completed_at: None,
        };
        let h = PairingHistory::from_matches(&[bye]);
        assert!(h.has_bye(7));
        assert!(!h.has_played(7, 8));
    }
}
