use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use swiss_bracket::db::{MemoryTournamentRepository, TournamentRepository};
use swiss_bracket::elimination::plan_bracket;
use swiss_bracket::swiss::{PairingHistory, pair_backtracking, pair_greedy};
use swiss_bracket::tournament::{
    MatchStatus, Phase, SwissRecord, Team, TeamId, TournamentConfig, TournamentEngine,
    TournamentId,
};
use tokio::runtime::Runtime;

/// Helper to build a tournament with `n_teams` that has played `rounds`
/// Swiss rounds with seeded random scores
async fn setup_played_tournament(
    n_teams: usize,
    rounds: u32,
) -> (TournamentEngine, TournamentId) {
    let engine = TournamentEngine::new(Arc::new(MemoryTournamentRepository::new()));
    let tournament = engine
        .create_tournament(
            "Bench Open",
            TournamentConfig::standard()
                .with_swiss_rounds(rounds)
                .manual(),
        )
        .await
        .unwrap();
    for i in 0..n_teams {
        engine
            .register_team(tournament, &format!("team{}", i))
            .await
            .unwrap();
    }

    let mut rng = StdRng::seed_from_u64(42);
    for round in 1..=rounds {
        let ids = engine.generate_swiss_round(tournament, round).await.unwrap();
        for id in ids {
            let m = engine
                .repository()
                .get_match(id)
                .await
                .unwrap()
                .unwrap();
            if m.status == MatchStatus::Pending {
                let (a, b) = (rng.random_range(0..22), rng.random_range(0..22));
                engine.apply_match_result(id, a, b).await.unwrap();
            }
        }
    }
    (engine, tournament)
}

/// Benchmark full standings recomputation after a cache invalidation
fn bench_standings(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("standings_uncached");

    for n_teams in [16, 64, 150] {
        let rounds = swiss_bracket::calculate_swiss_rounds(n_teams);
        let (engine, tournament) = rt.block_on(setup_played_tournament(n_teams, rounds));

        group.bench_with_input(BenchmarkId::from_parameter(n_teams), &n_teams, |b, _| {
            b.to_async(&rt).iter(|| async {
                engine.invalidate_cache(tournament);
                engine.get_standings(tournament).await.unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark pairing strategies on a field that has already played rounds
fn bench_pairing(c: &mut Criterion) {
    let mut group = c.benchmark_group("pairing");

    for n_teams in [16usize, 64, 150] {
        let ranked: Vec<TeamId> = (1..=n_teams as TeamId).collect();
        let mut history = PairingHistory::default();
        // Previous rounds paired neighbours and then teams two apart
        for pair in ranked.chunks_exact(2) {
            history.record_pair(pair[0], pair[1]);
        }
        for quad in ranked.chunks_exact(4) {
            history.record_pair(quad[0], quad[2]);
            history.record_pair(quad[1], quad[3]);
        }

        group.bench_with_input(BenchmarkId::new("greedy", n_teams), &ranked, |b, ranked| {
            b.iter(|| pair_greedy(ranked, &history));
        });
        group.bench_with_input(
            BenchmarkId::new("backtracking", n_teams),
            &ranked,
            |b, ranked| {
                b.iter(|| pair_backtracking(ranked, &history, 100_000));
            },
        );
    }

    group.finish();
}

/// Benchmark bracket planning for a large qualifier field
fn bench_plan_bracket(c: &mut Criterion) {
    let qualified: Vec<Team> = (1..=100)
        .map(|seed| Team {
            id: seed,
            tournament_id: 1,
            name: format!("seed{}", seed),
            seed: Some(seed as u32),
            record: SwissRecord::default(),
            qualified_for_elimination: true,
            eliminated: false,
        })
        .collect();

    c.bench_function("plan_bracket_100", |b| {
        b.iter(|| plan_bracket(1, &qualified).unwrap());
    });
}

/// Benchmark a complete tournament through the in-memory repository
fn bench_full_tournament(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("full_tournament_32_teams", |b| {
        b.to_async(&rt).iter(|| async {
            let engine = TournamentEngine::new(Arc::new(MemoryTournamentRepository::new()));
            let tournament = engine
                .create_tournament("Bench", TournamentConfig::standard())
                .await
                .unwrap();
            for i in 0..32 {
                engine
                    .register_team(tournament, &format!("team{}", i))
                    .await
                    .unwrap();
            }
            engine.generate_swiss_round(tournament, 1).await.unwrap();
            loop {
                let open: Vec<_> = engine
                    .list_matches(tournament, None)
                    .await
                    .unwrap()
                    .into_iter()
                    .filter(|m| m.status == MatchStatus::Pending)
                    .filter(|m| m.team1_id.is_some() && m.team2_id.is_some())
                    .collect();
                if open.is_empty() {
                    break;
                }
                for m in open {
                    match m.phase {
                        Phase::Swiss => {
                            engine.report_swiss_result(m.id, 7, 3).await.unwrap();
                        }
                        Phase::Elimination => {
                            engine.report_elimination_result(m.id, 7, 3).await.unwrap();
                        }
                    }
                }
            }
            engine.champion(tournament).await.unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_standings,
    bench_pairing,
    bench_plan_bracket,
    bench_full_tournament
);
criterion_main!(benches);
