//! Point totals per prize.

use super::record::{GameRecord, ScoringRules, ensure_round_results};
use crate::{
    db::ArenaRepository,
    errors::ArenaResult,
    models::{Competitor, TournamentId},
};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

/// Turns an accumulated record into a point total
#[enum_dispatch]
pub trait ScoringStrategy {
    fn points(&self, record: &GameRecord) -> i32;
}

/// Outcome points: win/draw/loss values from the rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScoring {
    #[serde(default)]
    pub rules: ScoringRules,
}

impl ScoringStrategy for TeamScoring {
    fn points(&self, record: &GameRecord) -> i32 {
        record.outcome_points(&self.rules)
    }
}

/// Touchdowns scored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TdScoring {}

impl ScoringStrategy for TdScoring {
    fn points(&self, record: &GameRecord) -> i32 {
        record.touchdowns_for
    }
}

/// Scoring bound to a prize when the catalog is built
#[enum_dispatch(ScoringStrategy)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scoring {
    TeamScoring,
    TdScoring,
}

impl Scoring {
    /// Points of `competitor` after `round`
    ///
    /// # Errors
    ///
    /// * `ArenaError::DataUnavailable` - round 0, no result recorded for the
    ///   round, or results could not be read
    pub async fn calculate(
        &self,
        repository: &dyn ArenaRepository,
        tournament_id: TournamentId,
        competitor: &Competitor,
        round: u32,
    ) -> ArenaResult<i32> {
        ensure_round_results(repository, tournament_id, round).await?;
        let record = GameRecord::load(repository, tournament_id, competitor, round).await?;
        Ok(self.points(&record))
    }
}
