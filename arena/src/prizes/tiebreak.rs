//! Tiebreak vectors per prize.
//!
//! Every variant has a fixed width so vectors of one standings table compare
//! lexicographically key for key.

use super::record::{GameRecord, ScoringRules, ensure_round_results};
use crate::{
    db::ArenaRepository,
    errors::ArenaResult,
    models::{Competitor, TournamentId},
};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

/// Builds the secondary keys compared when point totals tie
#[enum_dispatch]
pub trait TiebreakStrategy {
    /// Number of keys every vector of this variant carries
    fn width(&self) -> usize;

    /// Keys, most significant first
    fn keys(&self, points: i32, record: &GameRecord) -> Vec<i32>;
}

/// Touchdown difference, then casualty difference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RookieScoreTiebreak {}

impl TiebreakStrategy for RookieScoreTiebreak {
    fn width(&self) -> usize {
        2
    }

    fn keys(&self, _points: i32, record: &GameRecord) -> Vec<i32> {
        vec![record.touchdown_difference(), record.casualty_difference()]
    }
}

/// Outcome points, then touchdown difference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTiebreak {
    #[serde(default)]
    pub rules: ScoringRules,
}

impl TiebreakStrategy for ScoreTiebreak {
    fn width(&self) -> usize {
        2
    }

    fn keys(&self, _points: i32, record: &GameRecord) -> Vec<i32> {
        vec![
            record.outcome_points(&self.rules),
            record.touchdown_difference(),
        ]
    }
}

/// Tiebreak bound to a prize when the catalog is built
#[enum_dispatch(TiebreakStrategy)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tiebreak {
    RookieScoreTiebreak,
    ScoreTiebreak,
}

impl Tiebreak {
    /// Tiebreak vector of `competitor` after `round`, given its `points`
    pub async fn calculate(
        &self,
        repository: &dyn ArenaRepository,
        tournament_id: TournamentId,
        competitor: &Competitor,
        round: u32,
        points: i32,
    ) -> ArenaResult<Vec<i32>> {
        ensure_round_results(repository, tournament_id, round).await?;
        let record = GameRecord::load(repository, tournament_id, competitor, round).await?;
        Ok(self.keys(points, &record))
    }
}
