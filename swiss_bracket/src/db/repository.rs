//! Repository trait for tournament storage.
//!
//! The engine only talks to storage through [`TournamentRepository`], so the
//! PostgreSQL implementation here and the in-memory one in
//! [`super::memory`] are interchangeable.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_default_timeout, with_timeout};
use crate::tournament::{
    Match, MatchId, MatchStatus, NewMatch, Phase, SwissRecord, Team, TeamId, Tournament,
    TournamentConfig, TournamentId, TournamentResult, WriteBatch,
};

/// Storage operations the engine needs
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Create a tournament
    async fn create_tournament(
        &self,
        name: &str,
        config: &TournamentConfig,
    ) -> TournamentResult<TournamentId>;

    /// Find tournament by ID
    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>>;

    /// Register a team with an empty Swiss record
    async fn create_team(&self, tournament_id: TournamentId, name: &str)
    -> TournamentResult<TeamId>;

    /// Find team by ID
    async fn get_team(&self, id: TeamId) -> TournamentResult<Option<Team>>;

    /// All teams of a tournament, ordered by id
    async fn list_teams(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Team>>;

    /// Find match by ID
    async fn get_match(&self, id: MatchId) -> TournamentResult<Option<Match>>;

    /// Matches of a tournament ordered by round, match number and id
    async fn list_matches(
        &self,
        tournament_id: TournamentId,
        phase: Option<Phase>,
    ) -> TournamentResult<Vec<Match>>;

    /// Insert a batch of matches, returning their ids in input order
    async fn insert_matches(&self, matches: Vec<NewMatch>) -> TournamentResult<Vec<MatchId>> {
        self.commit(WriteBatch {
            new_matches: matches,
            ..Default::default()
        })
        .await
    }

    /// Replace a match row
    async fn update_match(&self, updated: &Match) -> TournamentResult<()> {
        self.commit(WriteBatch::new().update_match(updated.clone()))
            .await
            .map(|_| ())
    }

    /// Replace a team row
    async fn update_team(&self, updated: &Team) -> TournamentResult<()> {
        self.commit(WriteBatch::new().update_team(updated.clone()))
            .await
            .map(|_| ())
    }

    /// Apply every write of the batch atomically, returning the ids of the
    /// inserted matches in input order
    async fn commit(&self, batch: WriteBatch) -> TournamentResult<Vec<MatchId>>;
}

/// Default PostgreSQL implementation of `TournamentRepository`
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: PgPool,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TEAM_COLUMNS: &str = "id, tournament_id, name, seed, swiss_points, swiss_wins, swiss_draws,
    swiss_losses, swiss_cups_for, swiss_cups_against, qualified_for_elimination, eliminated";

const MATCH_COLUMNS: &str = "id, tournament_id, round_number, match_number, phase, team1_id,
    team2_id, team1_score, team2_score, winner_id, status, bracket_position, next_match_id,
    completed_at";

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn team_from_row(r: &PgRow) -> Team {
    Team {
        id: r.get("id"),
        tournament_id: r.get("tournament_id"),
        name: r.get("name"),
        seed: r.get::<Option<i32>, _>("seed").map(|s| s as u32),
        record: SwissRecord {
            points: r.get("swiss_points"),
            wins: r.get("swiss_wins"),
            draws: r.get("swiss_draws"),
            losses: r.get("swiss_losses"),
            cups_for: r.get("swiss_cups_for"),
            cups_against: r.get("swiss_cups_against"),
        },
        qualified_for_elimination: r.get("qualified_for_elimination"),
        eliminated: r.get("eliminated"),
    }
}

fn match_from_row(r: &PgRow) -> Result<Match, sqlx::Error> {
    let phase: String = r.get("phase");
    let status: String = r.get("status");
    Ok(Match {
        id: r.get("id"),
        tournament_id: r.get("tournament_id"),
        round_number: r.get::<i32, _>("round_number") as u32,
        match_number: r.get::<i32, _>("match_number") as u32,
        phase: Phase::from_db(&phase)
            .ok_or_else(|| decode_error(format!("unknown match phase '{}'", phase)))?,
        team1_id: r.get("team1_id"),
        team2_id: r.get("team2_id"),
        team1_score: r.get("team1_score"),
        team2_score: r.get("team2_score"),
        winner_id: r.get("winner_id"),
        status: MatchStatus::from_db(&status)
            .ok_or_else(|| decode_error(format!("unknown match status '{}'", status)))?,
        bracket_position: r.get("bracket_position"),
        next_match_id: r.get("next_match_id"),
        completed_at: r
            .get::<Option<chrono::NaiveDateTime>, _>("completed_at")
            .map(|dt| dt.and_utc()),
    })
}

async fn write_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch: WriteBatch,
) -> Result<Vec<MatchId>, sqlx::Error> {
    let mut ids = Vec::with_capacity(batch.new_matches.len());
    for m in &batch.new_matches {
        let row = sqlx::query(
            r#"
            INSERT INTO matches (tournament_id, round_number, match_number, phase, team1_id,
                                 team2_id, team1_score, team2_score, winner_id, status,
                                 bracket_position, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    CASE WHEN $10 = 'completed' THEN NOW() ELSE NULL END)
            RETURNING id
            "#,
        )
        .bind(m.tournament_id)
        .bind(m.round_number as i32)
        .bind(m.match_number as i32)
        .bind(m.phase.as_str())
        .bind(m.team1_id)
        .bind(m.team2_id)
        .bind(m.team1_score)
        .bind(m.team2_score)
        .bind(m.winner_id)
        .bind(m.status.as_str())
        .bind(&m.bracket_position)
        .fetch_one(&mut **tx)
        .await?;
        ids.push(row.get::<i64, _>("id"));
    }

    for (m, &id) in batch.new_matches.iter().zip(&ids) {
        let Some(next) = m.next else { continue };
        let next_id = *ids.get(next).ok_or_else(|| {
            sqlx::Error::Protocol(format!("next match index {} out of range", next))
        })?;
        sqlx::query("UPDATE matches SET next_match_id = $1 WHERE id = $2")
            .bind(next_id)
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }

    for m in &batch.match_updates {
        let result = sqlx::query(
            r#"
            UPDATE matches
            SET team1_id = $1, team2_id = $2, team1_score = $3, team2_score = $4,
                winner_id = $5, status = $6, next_match_id = $7, completed_at = $8
            WHERE id = $9
            "#,
        )
        .bind(m.team1_id)
        .bind(m.team2_id)
        .bind(m.team1_score)
        .bind(m.team2_score)
        .bind(m.winner_id)
        .bind(m.status.as_str())
        .bind(m.next_match_id)
        .bind(m.completed_at.map(|dt| dt.naive_utc()))
        .bind(m.id)
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
    }

    for t in &batch.team_updates {
        let result = sqlx::query(
            r#"
            UPDATE teams
            SET seed = $1, swiss_points = $2, swiss_wins = $3, swiss_draws = $4,
                swiss_losses = $5, swiss_cups_for = $6, swiss_cups_against = $7,
                qualified_for_elimination = $8, eliminated = $9
            WHERE id = $10
            "#,
        )
        .bind(t.seed.map(|s| s as i32))
        .bind(t.record.points)
        .bind(t.record.wins)
        .bind(t.record.draws)
        .bind(t.record.losses)
        .bind(t.record.cups_for)
        .bind(t.record.cups_against)
        .bind(t.qualified_for_elimination)
        .bind(t.eliminated)
        .bind(t.id)
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
    }

    Ok(ids)
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn create_tournament(
        &self,
        name: &str,
        config: &TournamentConfig,
    ) -> TournamentResult<TournamentId> {
        let config_json = serde_json::to_value(config)?;
        let row = with_default_timeout(
            sqlx::query("INSERT INTO tournaments (name, config) VALUES ($1, $2) RETURNING id")
                .bind(name)
                .bind(config_json)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(row.get("id"))
    }

    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let row = with_default_timeout(
            sqlx::query("SELECT id, name, config, created_at FROM tournaments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;

        let Some(r) = row else { return Ok(None) };
        Ok(Some(Tournament {
            id: r.get("id"),
            name: r.get("name"),
            config: serde_json::from_value(r.get("config"))?,
            created_at: r.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        }))
    }

    async fn create_team(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> TournamentResult<TeamId> {
        let row = with_default_timeout(
            sqlx::query("INSERT INTO teams (tournament_id, name) VALUES ($1, $2) RETURNING id")
                .bind(tournament_id)
                .bind(name)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(row.get("id"))
    }

    async fn get_team(&self, id: TeamId) -> TournamentResult<Option<Team>> {
        let query = format!("SELECT {} FROM teams WHERE id = $1", TEAM_COLUMNS);
        let row = with_default_timeout(sqlx::query(&query).bind(id).fetch_optional(&self.pool))
            .await?;

        Ok(row.as_ref().map(team_from_row))
    }

    async fn list_teams(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Team>> {
        let query = format!(
            "SELECT {} FROM teams WHERE tournament_id = $1 ORDER BY id",
            TEAM_COLUMNS
        );
        let rows = with_default_timeout(
            sqlx::query(&query)
                .bind(tournament_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(team_from_row).collect())
    }

    async fn get_match(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        let query = format!("SELECT {} FROM matches WHERE id = $1", MATCH_COLUMNS);
        let row = with_default_timeout(sqlx::query(&query).bind(id).fetch_optional(&self.pool))
            .await?;

        match row {
            Some(r) => Ok(Some(match_from_row(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_matches(
        &self,
        tournament_id: TournamentId,
        phase: Option<Phase>,
    ) -> TournamentResult<Vec<Match>> {
        let query = format!(
            r#"
            SELECT {}
            FROM matches
            WHERE tournament_id = $1 AND ($2::TEXT IS NULL OR phase = $2)
            ORDER BY round_number, match_number, id
            "#,
            MATCH_COLUMNS
        );
        let rows = with_default_timeout(
            sqlx::query(&query)
                .bind(tournament_id)
                .bind(phase.map(|p| p.as_str()))
                .fetch_all(&self.pool),
        )
        .await?;

        let matches = rows
            .iter()
            .map(match_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(matches)
    }

    async fn commit(&self, batch: WriteBatch) -> TournamentResult<Vec<MatchId>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let ids = with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;
            let ids = write_batch(&mut tx, batch).await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(ids)
        })
        .await?;

        Ok(ids)
    }
}
