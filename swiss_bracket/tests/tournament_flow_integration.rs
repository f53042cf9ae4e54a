//! Integration tests for the full tournament lifecycle
//!
//! These tests drive the engine over the in-memory repository from team
//! registration through the Swiss rounds, qualification and the bracket.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use swiss_bracket::db::{MemoryTournamentRepository, TournamentRepository};
use swiss_bracket::tournament::{
    Match, MatchId, MatchStatus, Phase, RoundProgress, Team, TeamId, Tournament,
    TournamentConfig, TournamentEngine, TournamentError, TournamentId, TournamentResult,
    WriteBatch,
};

/// Helper to create an engine with `count` registered teams
async fn setup(count: usize, config: TournamentConfig) -> (Arc<TournamentEngine>, TournamentId) {
    let engine = Arc::new(TournamentEngine::new(Arc::new(
        MemoryTournamentRepository::new(),
    )));
    let tournament = engine
        .create_tournament("Integration Cup", config)
        .await
        .unwrap();
    for i in 1..=count {
        engine
            .register_team(tournament, &format!("Team {:02}", i))
            .await
            .unwrap();
    }
    (engine, tournament)
}

async fn pending(engine: &TournamentEngine, tournament: TournamentId, phase: Phase) -> Vec<Match> {
    engine
        .list_matches(tournament, Some(phase))
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.status == MatchStatus::Pending)
        .collect()
}

/// Report every pending Swiss match (team1 wins) until the bracket exists
async fn play_swiss(engine: &TournamentEngine, tournament: TournamentId) -> Vec<RoundProgress> {
    let mut progress = Vec::new();
    loop {
        let open = pending(engine, tournament, Phase::Swiss).await;
        if open.is_empty() {
            return progress;
        }
        for m in open {
            progress.push(engine.report_swiss_result(m.id, 10, 4).await.unwrap());
        }
    }
}

/// Report every playable elimination match (team1 wins) until a champion
async fn play_bracket(engine: &TournamentEngine, tournament: TournamentId) {
    loop {
        let playable: Vec<Match> = pending(engine, tournament, Phase::Elimination)
            .await
            .into_iter()
            .filter(|m| m.team1_id.is_some() && m.team2_id.is_some())
            .collect();
        if playable.is_empty() {
            return;
        }
        for m in playable {
            engine.report_elimination_result(m.id, 10, 4).await.unwrap();
        }
    }
}

#[tokio::test]
async fn test_eight_team_tournament_end_to_end() {
    let config = TournamentConfig::standard().with_qualifiers(4);
    let (engine, tournament) = setup(8, config).await;

    engine.generate_swiss_round(tournament, 1).await.unwrap();
    let progress = play_swiss(&engine, tournament).await;

    assert!(progress.contains(&RoundProgress::NextRound { round: 2 }));
    assert!(progress.contains(&RoundProgress::NextRound { round: 3 }));
    assert_eq!(
        progress.last(),
        Some(&RoundProgress::BracketGenerated { qualifiers: 4 })
    );

    // 3 rounds of 4 matches, no pairing repeated
    let swiss = engine.list_matches(tournament, Some(Phase::Swiss)).await.unwrap();
    assert_eq!(swiss.len(), 12);
    let mut seen = HashSet::new();
    for m in &swiss {
        let (a, b) = (m.team1_id.unwrap(), m.team2_id.unwrap());
        assert!(seen.insert((a.min(b), a.max(b))), "rematch {} v {}", a, b);
    }

    // Aggregates stay consistent with the recorded results
    let teams = engine.list_teams(tournament).await.unwrap();
    for team in &teams {
        let r = team.record;
        assert_eq!(r.points, 3 * r.wins + r.draws);
        assert_eq!(r.matches_played(), 3);
    }
    let total_points: i32 = teams.iter().map(|t| t.record.points).sum();
    assert_eq!(total_points, 12 * 3);

    // Seeds follow the final Swiss ranking
    let standings = engine.get_standings(tournament).await.unwrap();
    for standing in &standings {
        if standing.rank <= 4 {
            assert_eq!(standing.team.seed, Some(standing.rank as u32));
            assert!(standing.team.qualified_for_elimination);
        } else {
            assert_eq!(standing.team.seed, None);
            assert!(!standing.team.qualified_for_elimination);
        }
    }

    let bracket = engine
        .list_matches(tournament, Some(Phase::Elimination))
        .await
        .unwrap();
    assert_eq!(bracket.len(), 3);
    assert!(engine.champion(tournament).await.unwrap().is_none());

    play_bracket(&engine, tournament).await;

    let champion = engine.champion(tournament).await.unwrap().unwrap();
    assert_eq!(champion.seed, Some(1));
    let eliminated = engine
        .list_teams(tournament)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.eliminated)
        .count();
    assert_eq!(eliminated, 3);
}

#[tokio::test]
async fn test_odd_field_rotates_the_bye() {
    let (engine, tournament) = setup(5, TournamentConfig::standard().with_qualifiers(2)).await;
    engine.generate_swiss_round(tournament, 1).await.unwrap();
    play_swiss(&engine, tournament).await;

    let swiss = engine.list_matches(tournament, Some(Phase::Swiss)).await.unwrap();
    let byes: Vec<&Match> = swiss.iter().filter(|m| m.is_bye()).collect();
    assert_eq!(byes.len(), 3);

    let receivers: HashSet<TeamId> = byes.iter().map(|m| m.team1_id.unwrap()).collect();
    assert_eq!(receivers.len(), 3, "no team should get two byes");
    for bye in byes {
        assert_eq!(bye.winner_id, bye.team1_id);
        assert_eq!(bye.status, MatchStatus::Completed);
    }

    // Every team's record includes its bye as a win
    for team in engine.list_teams(tournament).await.unwrap() {
        assert_eq!(team.record.matches_played(), 3);
    }
}

#[tokio::test]
async fn test_correct_then_reopen_swiss_result() {
    let (engine, tournament) = setup(4, TournamentConfig::standard().manual()).await;
    let ids = engine.generate_swiss_round(tournament, 1).await.unwrap();
    let m = engine.repository().get_match(ids[0]).await.unwrap().unwrap();
    let (home, away) = (m.team1_id.unwrap(), m.team2_id.unwrap());

    engine.apply_match_result(ids[0], 10, 6).await.unwrap();
    engine.correct_swiss_result(ids[0], 7, 7).await.unwrap();

    let home_team = engine.repository().get_team(home).await.unwrap().unwrap();
    let away_team = engine.repository().get_team(away).await.unwrap().unwrap();
    assert_eq!(home_team.record.points, 1);
    assert_eq!(home_team.record.wins, 0);
    assert_eq!(home_team.record.draws, 1);
    assert_eq!(home_team.record.cups_for, 7);
    assert_eq!(away_team.record.losses, 0);
    assert_eq!(away_team.record.draws, 1);

    let corrected = engine.repository().get_match(ids[0]).await.unwrap().unwrap();
    assert_eq!(corrected.winner_id, None);
    assert_eq!(corrected.team1_score, Some(7));

    engine.reopen_swiss_match(ids[0]).await.unwrap();
    let reopened = engine.repository().get_match(ids[0]).await.unwrap().unwrap();
    assert_eq!(reopened.status, MatchStatus::Pending);
    assert_eq!(reopened.team1_score, None);
    let home_team = engine.repository().get_team(home).await.unwrap().unwrap();
    assert_eq!(home_team.record, Default::default());

    // A pending match has nothing to reopen
    assert!(engine.reopen_swiss_match(ids[0]).await.is_err());
}

#[tokio::test]
async fn test_raw_reverse_matches_apply() {
    let (engine, tournament) = setup(2, TournamentConfig::standard().manual()).await;
    let ids = engine.generate_swiss_round(tournament, 1).await.unwrap();
    let m = engine.repository().get_match(ids[0]).await.unwrap().unwrap();
    let (t1, t2) = (m.team1_id.unwrap(), m.team2_id.unwrap());

    engine.apply_match_result(ids[0], 3, 9).await.unwrap();
    engine.reverse_match_result(3, 9, t1, t2).await.unwrap();

    for id in [t1, t2] {
        let team = engine.repository().get_team(id).await.unwrap().unwrap();
        assert_eq!(team.record, Default::default());
    }
    // The match row is left as reported
    let m = engine.repository().get_match(ids[0]).await.unwrap().unwrap();
    assert_eq!(m.status, MatchStatus::Completed);
}

#[tokio::test]
async fn test_elimination_reopen_rules() {
    let (engine, tournament) = setup(4, TournamentConfig::standard()).await;
    engine.qualify_for_elimination(tournament, 4).await.unwrap();
    let ids = engine.generate_bracket(tournament).await.unwrap();
    assert_eq!(ids.len(), 3);
    let (semi1, semi2, final_id) = (ids[0], ids[1], ids[2]);

    let next = engine.report_elimination_result(semi1, 2, 10).await.unwrap();
    assert_eq!(next, Some(final_id));
    let semi = engine.repository().get_match(semi1).await.unwrap().unwrap();
    let loser = semi.team1_id.unwrap();
    assert!(engine.repository().get_team(loser).await.unwrap().unwrap().eliminated);

    engine.reopen_elimination_match(semi1).await.unwrap();
    assert!(!engine.repository().get_team(loser).await.unwrap().unwrap().eliminated);
    let final_match = engine.repository().get_match(final_id).await.unwrap().unwrap();
    assert_eq!(final_match.team1_id, None);

    engine.report_elimination_result(semi1, 10, 2).await.unwrap();
    engine.report_elimination_result(semi2, 10, 2).await.unwrap();
    assert_eq!(engine.report_elimination_result(final_id, 1, 0).await.unwrap(), None);

    let err = engine.reopen_elimination_match(semi1).await.unwrap_err();
    assert!(matches!(err, TournamentError::InvalidOperation(_)));

    // The final itself can still be reopened and replayed
    engine.reopen_elimination_match(final_id).await.unwrap();
    assert!(engine.champion(tournament).await.unwrap().is_none());
    let final_match = engine.repository().get_match(final_id).await.unwrap().unwrap();
    let underdog = final_match.team2_id.unwrap();
    engine.advance_winner(final_id, underdog).await.unwrap();
    assert_eq!(engine.champion(tournament).await.unwrap().unwrap().id, underdog);
}

#[tokio::test]
async fn test_swiss_results_frozen_after_bracket() {
    let (engine, tournament) = setup(4, TournamentConfig::standard().with_qualifiers(2)).await;
    let ids = engine.generate_swiss_round(tournament, 1).await.unwrap();
    play_swiss(&engine, tournament).await;
    assert!(!engine
        .list_matches(tournament, Some(Phase::Elimination))
        .await
        .unwrap()
        .is_empty());

    assert!(engine.correct_swiss_result(ids[0], 0, 10).await.is_err());
    assert!(engine.reopen_swiss_match(ids[0]).await.is_err());
    assert!(engine.generate_swiss_round(tournament, 3).await.is_err());
}

#[tokio::test]
async fn test_concurrent_reports_advance_once() {
    let (engine, tournament) = setup(4, TournamentConfig::standard()).await;
    let ids = engine.generate_swiss_round(tournament, 1).await.unwrap();

    let handles: Vec<_> = ids
        .iter()
        .map(|&id| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.report_swiss_result(id, 8, 3).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    assert!(results.contains(&RoundProgress::Pending { remaining: 1 }));
    assert!(results.contains(&RoundProgress::NextRound { round: 2 }));
    assert_eq!(engine.current_round(tournament).await.unwrap(), 2);

    let round_two = engine
        .list_matches(tournament, Some(Phase::Swiss))
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.round_number == 2)
        .count();
    assert_eq!(round_two, 2);
}

#[tokio::test]
async fn test_tournaments_are_isolated() {
    let repo = Arc::new(MemoryTournamentRepository::new());
    let engine = TournamentEngine::new(repo);
    let first = engine
        .create_tournament("First", TournamentConfig::standard())
        .await
        .unwrap();
    let second = engine
        .create_tournament("Second", TournamentConfig::standard())
        .await
        .unwrap();
    for name in ["A", "B"] {
        engine.register_team(first, name).await.unwrap();
    }
    for name in ["C", "D", "E", "F"] {
        engine.register_team(second, name).await.unwrap();
    }

    engine.generate_swiss_round(first, 1).await.unwrap();
    engine.generate_swiss_round(second, 1).await.unwrap();

    assert_eq!(engine.get_standings(first).await.unwrap().len(), 2);
    assert_eq!(engine.get_standings(second).await.unwrap().len(), 4);
    assert_eq!(
        engine
            .list_matches(second, Some(Phase::Swiss))
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_auto_advance_closes_swiss_when_no_pairing_is_left() {
    let (engine, tournament) = setup(2, TournamentConfig::standard().with_swiss_rounds(2)).await;
    let ids = engine.generate_swiss_round(tournament, 1).await.unwrap();

    let progress = engine.report_swiss_result(ids[0], 9, 2).await.unwrap();
    assert_eq!(progress, RoundProgress::BracketGenerated { qualifiers: 2 });
    assert_eq!(engine.current_round(tournament).await.unwrap(), 1);

    let bracket = engine
        .list_matches(tournament, Some(Phase::Elimination))
        .await
        .unwrap();
    assert_eq!(bracket.len(), 1);
    play_bracket(&engine, tournament).await;
    let champion = engine.champion(tournament).await.unwrap().unwrap();
    assert_eq!(champion.seed, Some(1));
}

/// Repository whose next Swiss listing is held back after the rows are read,
/// so a writer can commit while the reader still holds the old rows
struct DelayedSwissReads {
    inner: MemoryTournamentRepository,
    delay_next: AtomicBool,
}

#[async_trait]
impl TournamentRepository for DelayedSwissReads {
    async fn create_tournament(
        &self,
        name: &str,
        config: &TournamentConfig,
    ) -> TournamentResult<TournamentId> {
        self.inner.create_tournament(name, config).await
    }

    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        self.inner.get_tournament(id).await
    }

    async fn create_team(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> TournamentResult<TeamId> {
        self.inner.create_team(tournament_id, name).await
    }

    async fn get_team(&self, id: TeamId) -> TournamentResult<Option<Team>> {
        self.inner.get_team(id).await
    }

    async fn list_teams(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Team>> {
        self.inner.list_teams(tournament_id).await
    }

    async fn get_match(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        self.inner.get_match(id).await
    }

    async fn list_matches(
        &self,
        tournament_id: TournamentId,
        phase: Option<Phase>,
    ) -> TournamentResult<Vec<Match>> {
        let matches = self.inner.list_matches(tournament_id, phase).await?;
        if phase == Some(Phase::Swiss) && self.delay_next.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Ok(matches)
    }

    async fn commit(&self, batch: WriteBatch) -> TournamentResult<Vec<MatchId>> {
        self.inner.commit(batch).await
    }
}

#[tokio::test]
async fn test_slow_standings_read_does_not_cache_old_results() {
    let repo = Arc::new(DelayedSwissReads {
        inner: MemoryTournamentRepository::new(),
        delay_next: AtomicBool::new(false),
    });
    let engine = Arc::new(TournamentEngine::new(repo.clone()));
    let tournament = engine
        .create_tournament("Cache Cup", TournamentConfig::standard().manual())
        .await
        .unwrap();
    for name in ["A", "B", "C", "D"] {
        engine.register_team(tournament, name).await.unwrap();
    }
    let ids = engine.generate_swiss_round(tournament, 1).await.unwrap();
    engine.apply_match_result(ids[0], 10, 5).await.unwrap();

    repo.delay_next.store(true, Ordering::SeqCst);
    let reader = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.get_standings(tournament).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    engine.apply_match_result(ids[1], 10, 5).await.unwrap();
    reader.await.unwrap().unwrap();

    let standings = engine.get_standings(tournament).await.unwrap();
    let loser = standings.iter().find(|s| s.team.name == "D").unwrap();
    assert_eq!(loser.swiss_points, 0);
    assert_eq!(loser.median_buchholz, 3);
    let winner = standings.iter().find(|s| s.team.name == "C").unwrap();
    assert_eq!(winner.swiss_points, 3);
    assert_eq!(winner.median_buchholz, 0);
}
