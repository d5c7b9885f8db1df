//! Repository trait definitions for the engine's persistence collaborators.
//!
//! The engine only talks to these traits; [`PgArenaRepository`] is the
//! PostgreSQL implementation and [`super::MemoryArenaRepository`] the
//! in-process one.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, types::Json};
use std::collections::BTreeSet;

use super::timeouts::{TimeoutConfig, with_timeout};
use crate::{
    errors::{ArenaError, ArenaResult},
    models::{
        GameResult, Player, PlayerId, PlayerInscription, PrizeId, Score, SquadEntity, SquadId,
        SquadMemberEntity, SquadRole, SquadsPairing, SquadsRound, TournamentId,
    },
    prizes::Prize,
};

/// Trait for tournament data the engine reads and writes
#[async_trait]
pub trait ArenaRepository: Send + Sync {
    /// Whether the tournament exists
    async fn tournament_exists(&self, tournament_id: TournamentId) -> ArenaResult<bool>;

    /// Squads of a tournament with their stored rosters, ordered by name then id
    async fn get_squads(&self, tournament_id: TournamentId) -> ArenaResult<Vec<SquadEntity>>;

    /// Squads that faced `squad_id` in any round before `before_round`
    async fn get_past_opponents(
        &self,
        tournament_id: TournamentId,
        squad_id: SquadId,
        before_round: u32,
    ) -> ArenaResult<BTreeSet<SquadId>>;

    /// Game results of a player for rounds `1..=up_to_round`
    async fn get_results(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        up_to_round: u32,
    ) -> ArenaResult<Vec<GameResult>>;

    /// Number of game results recorded in exactly `round`
    async fn count_results(&self, tournament_id: TournamentId, round: u32) -> ArenaResult<u64>;

    /// A player's persisted score in one prize's standings
    async fn get_player_score(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize_id: PrizeId,
        player_id: PlayerId,
    ) -> ArenaResult<Option<Score>>;

    /// Replace the standings of one (round, prize) with `scores`, in rank order
    async fn set_standings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize: &Prize,
        scores: &[Score],
    ) -> ArenaResult<()>;

    /// Persisted standings of one (round, prize), best first; empty if never computed
    async fn get_standings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize_id: PrizeId,
    ) -> ArenaResult<Vec<Score>>;

    /// Highest round number created so far
    async fn last_round(&self, tournament_id: TournamentId) -> ArenaResult<Option<u32>>;

    /// Create `round` together with its pairings as one atomic unit
    ///
    /// # Errors
    ///
    /// * `ArenaError::InvalidRoundSequence` - the round already exists or does
    ///   not directly follow the last one
    async fn create_round(
        &self,
        tournament_id: TournamentId,
        round: &SquadsRound,
    ) -> ArenaResult<u32>;

    /// A created round with its pairings
    async fn get_round(
        &self,
        tournament_id: TournamentId,
        round: u32,
    ) -> ArenaResult<Option<SquadsRound>>;

    /// Replace the pairings of an existing round
    ///
    /// # Errors
    ///
    /// * `ArenaError::InvalidRoundSequence` - the round does not exist
    async fn replace_pairings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        pairings: &[SquadsPairing],
    ) -> ArenaResult<()>;
}

/// Trait for the player/identity directory
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    /// Look up a player
    ///
    /// # Errors
    ///
    /// * `ArenaError::NotFound` - unknown player
    async fn get_player(&self, player_id: PlayerId) -> ArenaResult<Player>;
}

/// PostgreSQL implementation of `ArenaRepository` and `PlayerDirectory`
#[derive(Clone)]
pub struct PgArenaRepository {
    pool: PgPool,
    timeouts: TimeoutConfig,
}

impl PgArenaRepository {
    pub fn new(pool: PgPool, timeouts: TimeoutConfig) -> Self {
        Self { pool, timeouts }
    }

    async fn insert_pairings(
        tx: &mut Transaction<'_, Postgres>,
        tournament_id: TournamentId,
        round: u32,
        pairings: &[SquadsPairing],
    ) -> ArenaResult<()> {
        for pairing in pairings {
            sqlx::query(
                r#"
                INSERT INTO ca_pairings (tournament_id, round, table_number, home_squad_id, away_squad_id, payload)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(tournament_id)
            .bind(round as i32)
            .bind(pairing.table as i32)
            .bind(pairing.home.id)
            .bind(pairing.away.as_ref().map(|squad| squad.id))
            .bind(Json(pairing))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

fn score_from_row(row: &sqlx::postgres::PgRow) -> Score {
    Score {
        competitor_id: row.get("competitor_id"),
        points: row.get("points"),
        tiebreak: row.get("tiebreak"),
    }
}

#[async_trait]
impl ArenaRepository for PgArenaRepository {
    async fn tournament_exists(&self, tournament_id: TournamentId) -> ArenaResult<bool> {
        let row = with_timeout(
            self.timeouts.query,
            sqlx::query("SELECT 1 FROM ca_tournaments WHERE id = $1")
                .bind(tournament_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.is_some())
    }

    async fn get_squads(&self, tournament_id: TournamentId) -> ArenaResult<Vec<SquadEntity>> {
        let rows = with_timeout(
            self.timeouts.query,
            sqlx::query(
                r#"
                SELECT
                    s.id,
                    s.name,
                    sm.player_id,
                    sm.role,
                    pi.team_name,
                    pi.team_race,
                    pi.naf_score,
                    pi.substitute
                FROM ca_squads s
                LEFT OUTER JOIN ca_squads_members sm ON s.id = sm.squad_id
                LEFT OUTER JOIN ca_tournaments_inscriptions pi
                    ON sm.player_id = pi.player_id AND pi.tournament_id = s.tournament_id
                WHERE s.tournament_id = $1
                ORDER BY s.name ASC, s.id ASC, sm.created ASC
                "#,
            )
            .bind(tournament_id)
            .fetch_all(&self.pool),
        )
        .await?;

        // Rows of one squad are contiguous thanks to the ORDER BY
        let mut squads: Vec<SquadEntity> = Vec::new();
        for row in rows {
            let squad_id: SquadId = row.get("id");
            if squads.last().map(|s| s.id) != Some(squad_id) {
                squads.push(SquadEntity {
                    id: squad_id,
                    name: row.get("name"),
                    members: Vec::new(),
                });
            }

            let Some(player_id) = row.get::<Option<PlayerId>, _>("player_id") else {
                continue;
            };
            let role: String = row.get("role");
            let role = role
                .parse::<SquadRole>()
                .map_err(ArenaError::DataUnavailable)?;

            if let Some(squad) = squads.last_mut() {
                squad.members.push(SquadMemberEntity {
                    inscription: PlayerInscription {
                        player_id,
                        team_name: row
                            .get::<Option<String>, _>("team_name")
                            .unwrap_or_default(),
                        team_race: row
                            .get::<Option<String>, _>("team_race")
                            .unwrap_or_default(),
                        naf_score: row
                            .get::<Option<String>, _>("naf_score")
                            .unwrap_or_default(),
                        substitute: row
                            .get::<Option<bool>, _>("substitute")
                            .unwrap_or(false),
                    },
                    role,
                });
            }
        }

        Ok(squads)
    }

    async fn get_past_opponents(
        &self,
        tournament_id: TournamentId,
        squad_id: SquadId,
        before_round: u32,
    ) -> ArenaResult<BTreeSet<SquadId>> {
        let rows = with_timeout(
            self.timeouts.query,
            sqlx::query(
                r#"
                SELECT away_squad_id AS opponent FROM ca_pairings
                WHERE tournament_id = $1 AND round < $3 AND home_squad_id = $2 AND away_squad_id IS NOT NULL
                UNION
                SELECT home_squad_id AS opponent FROM ca_pairings
                WHERE tournament_id = $1 AND round < $3 AND away_squad_id = $2
                "#,
            )
            .bind(tournament_id)
            .bind(squad_id)
            .bind(before_round as i32)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(|row| row.get("opponent")).collect())
    }

    async fn get_results(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        up_to_round: u32,
    ) -> ArenaResult<Vec<GameResult>> {
        let rows = with_timeout(
            self.timeouts.query,
            sqlx::query(
                r#"
                SELECT round, player_id, opponent_id, touchdowns_for, touchdowns_against,
                       casualties_for, casualties_against
                FROM ca_results
                WHERE tournament_id = $1 AND player_id = $2 AND round <= $3
                ORDER BY round ASC
                "#,
            )
            .bind(tournament_id)
            .bind(player_id)
            .bind(up_to_round as i32)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| GameResult {
                round: row.get::<i32, _>("round") as u32,
                player_id: row.get("player_id"),
                opponent_id: row.get("opponent_id"),
                touchdowns_for: row.get("touchdowns_for"),
                touchdowns_against: row.get("touchdowns_against"),
                casualties_for: row.get("casualties_for"),
                casualties_against: row.get("casualties_against"),
            })
            .collect())
    }

    async fn count_results(&self, tournament_id: TournamentId, round: u32) -> ArenaResult<u64> {
        let count = with_timeout(
            self.timeouts.query,
            sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*) FROM ca_results
                WHERE tournament_id = $1 AND round = $2
                "#,
            )
            .bind(tournament_id)
            .bind(round as i32)
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn get_player_score(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize_id: PrizeId,
        player_id: PlayerId,
    ) -> ArenaResult<Option<Score>> {
        let row = with_timeout(
            self.timeouts.query,
            sqlx::query(
                r#"
                SELECT competitor_id, points, tiebreak
                FROM ca_standings
                WHERE tournament_id = $1 AND round = $2 AND prize_id = $3 AND competitor_id = $4
                "#,
            )
            .bind(tournament_id)
            .bind(round as i32)
            .bind(prize_id)
            .bind(player_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(score_from_row))
    }

    async fn set_standings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize: &Prize,
        scores: &[Score],
    ) -> ArenaResult<()> {
        with_timeout(self.timeouts.transaction, async {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                "DELETE FROM ca_standings WHERE tournament_id = $1 AND round = $2 AND prize_id = $3",
            )
            .bind(tournament_id)
            .bind(round as i32)
            .bind(prize.id)
            .execute(&mut *tx)
            .await?;

            for (position, score) in scores.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO ca_standings (tournament_id, round, prize_id, prize_name, position, competitor_id, points, tiebreak)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    "#,
                )
                .bind(tournament_id)
                .bind(round as i32)
                .bind(prize.id)
                .bind(&prize.name)
                .bind(position as i32 + 1)
                .bind(score.competitor_id)
                .bind(score.points)
                .bind(&score.tiebreak)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok::<(), ArenaError>(())
        })
        .await
    }

    async fn get_standings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize_id: PrizeId,
    ) -> ArenaResult<Vec<Score>> {
        let rows = with_timeout(
            self.timeouts.query,
            sqlx::query(
                r#"
                SELECT competitor_id, points, tiebreak
                FROM ca_standings
                WHERE tournament_id = $1 AND round = $2 AND prize_id = $3
                ORDER BY position ASC
                "#,
            )
            .bind(tournament_id)
            .bind(round as i32)
            .bind(prize_id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(score_from_row).collect())
    }

    async fn last_round(&self, tournament_id: TournamentId) -> ArenaResult<Option<u32>> {
        let last = with_timeout(
            self.timeouts.query,
            sqlx::query_scalar::<_, Option<i32>>(
                "SELECT MAX(round) FROM ca_rounds WHERE tournament_id = $1",
            )
            .bind(tournament_id)
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(last.map(|round| round as u32))
    }

    async fn create_round(
        &self,
        tournament_id: TournamentId,
        round: &SquadsRound,
    ) -> ArenaResult<u32> {
        with_timeout(self.timeouts.transaction, async {
            let mut tx = self.pool.begin().await?;

            let last = sqlx::query_scalar::<_, Option<i32>>(
                "SELECT MAX(round) FROM ca_rounds WHERE tournament_id = $1",
            )
            .bind(tournament_id)
            .fetch_one(&mut *tx)
            .await?
            .unwrap_or(0) as u32;

            if round.number != last + 1 {
                return Err(ArenaError::InvalidRoundSequence(format!(
                    "round {} requested but the next round is {}",
                    round.number,
                    last + 1
                )));
            }

            // The primary key on (tournament_id, round) rejects a concurrent
            // creator that read the same MAX(round)
            sqlx::query("INSERT INTO ca_rounds (tournament_id, round) VALUES ($1, $2)")
                .bind(tournament_id)
                .bind(round.number as i32)
                .execute(&mut *tx)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(db) if db.is_unique_violation() => {
                        ArenaError::InvalidRoundSequence(format!(
                            "round {} already exists",
                            round.number
                        ))
                    }
                    other => ArenaError::Database(other),
                })?;

            Self::insert_pairings(&mut tx, tournament_id, round.number, &round.squads_pairings)
                .await?;

            tx.commit().await?;
            Ok::<u32, ArenaError>(round.number)
        })
        .await
    }

    async fn get_round(
        &self,
        tournament_id: TournamentId,
        round: u32,
    ) -> ArenaResult<Option<SquadsRound>> {
        let exists = with_timeout(
            self.timeouts.query,
            sqlx::query("SELECT 1 FROM ca_rounds WHERE tournament_id = $1 AND round = $2")
                .bind(tournament_id)
                .bind(round as i32)
                .fetch_optional(&self.pool),
        )
        .await?;

        if exists.is_none() {
            return Ok(None);
        }

        let rows = with_timeout(
            self.timeouts.query,
            sqlx::query(
                r#"
                SELECT payload FROM ca_pairings
                WHERE tournament_id = $1 AND round = $2
                ORDER BY table_number ASC
                "#,
            )
            .bind(tournament_id)
            .bind(round as i32)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(Some(SquadsRound {
            number: round,
            squads_pairings: rows
                .iter()
                .map(|row| row.get::<Json<SquadsPairing>, _>("payload").0)
                .collect(),
        }))
    }

    async fn replace_pairings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        pairings: &[SquadsPairing],
    ) -> ArenaResult<()> {
        with_timeout(self.timeouts.transaction, async {
            let mut tx = self.pool.begin().await?;

            let exists = sqlx::query(
                "SELECT 1 FROM ca_rounds WHERE tournament_id = $1 AND round = $2 FOR UPDATE",
            )
            .bind(tournament_id)
            .bind(round as i32)
            .fetch_optional(&mut *tx)
            .await?;

            if exists.is_none() {
                return Err(ArenaError::InvalidRoundSequence(format!(
                    "round {} does not exist",
                    round
                )));
            }

            sqlx::query("DELETE FROM ca_pairings WHERE tournament_id = $1 AND round = $2")
                .bind(tournament_id)
                .bind(round as i32)
                .execute(&mut *tx)
                .await?;

            Self::insert_pairings(&mut tx, tournament_id, round, pairings).await?;

            sqlx::query("UPDATE ca_rounds SET updated = NOW() WHERE tournament_id = $1 AND round = $2")
                .bind(tournament_id)
                .bind(round as i32)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<(), ArenaError>(())
        })
        .await
    }
}

#[async_trait]
impl PlayerDirectory for PgArenaRepository {
    async fn get_player(&self, player_id: PlayerId) -> ArenaResult<Player> {
        let row = with_timeout(
            self.timeouts.query,
            sqlx::query("SELECT id, name, naf_number FROM ca_players WHERE id = $1")
                .bind(player_id)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or_else(|| ArenaError::NotFound(format!("player {}", player_id)))?;

        Ok(Player {
            id: row.get("id"),
            name: row.get("name"),
            naf_number: row.get("naf_number"),
        })
    }
}
