//! Accumulated game record of a competitor, the input of every strategy.

use crate::{
    db::ArenaRepository,
    errors::{ArenaError, ArenaResult},
    models::{Competitor, GameResult, Outcome, TournamentId},
};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

/// Points awarded per game outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub win: i32,
    pub draw: i32,
    pub loss: i32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            win: 3,
            draw: 1,
            loss: 0,
        }
    }
}

/// Totals of every game a competitor played up to a round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameRecord {
    pub games: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub touchdowns_for: i32,
    pub touchdowns_against: i32,
    pub casualties_for: i32,
    pub casualties_against: i32,
}

/// Fails unless at least one game result was recorded in `round`
///
/// A competitor without results of its own (a bye) still scores 0; only a
/// round nobody has reported yet is unavailable.
pub async fn ensure_round_results(
    repository: &dyn ArenaRepository,
    tournament_id: TournamentId,
    round: u32,
) -> ArenaResult<()> {
    if round == 0 {
        return Err(ArenaError::DataUnavailable(
            "no results exist before round 1".to_string(),
        ));
    }

    if repository.count_results(tournament_id, round).await? == 0 {
        return Err(ArenaError::DataUnavailable(format!(
            "no results recorded for round {}",
            round
        )));
    }

    Ok(())
}

impl GameRecord {
    /// Pool the results of every player of `competitor` for rounds `1..=round`.
    ///
    /// Round 0 has no results; callers skip standings for it.
    pub async fn load(
        repository: &dyn ArenaRepository,
        tournament_id: TournamentId,
        competitor: &Competitor,
        round: u32,
    ) -> ArenaResult<Self> {
        if round == 0 {
            return Err(ArenaError::DataUnavailable(
                "no results exist before round 1".to_string(),
            ));
        }

        let per_player = try_join_all(
            competitor
                .players
                .iter()
                .map(|player_id| repository.get_results(tournament_id, *player_id, round)),
        )
        .await?;

        Ok(per_player
            .iter()
            .flatten()
            .filter(|result| result.round >= 1 && result.round <= round)
            .fold(Self::default(), |record, result| record.with(result)))
    }

    /// Record with one more game added
    pub fn with(mut self, result: &GameResult) -> Self {
        self.games += 1;
        match result.outcome() {
            Outcome::Win => self.wins += 1,
            Outcome::Draw => self.draws += 1,
            Outcome::Loss => self.losses += 1,
        }
        self.touchdowns_for = self.touchdowns_for.saturating_add(result.touchdowns_for);
        self.touchdowns_against = self.touchdowns_against.saturating_add(result.touchdowns_against);
        self.casualties_for = self.casualties_for.saturating_add(result.casualties_for);
        self.casualties_against = self.casualties_against.saturating_add(result.casualties_against);
        self
    }

    /// Outcome points under `rules`, clamped to the `i32` range
    pub fn outcome_points(&self, rules: &ScoringRules) -> i32 {
        [
            (self.wins, rules.win),
            (self.draws, rules.draw),
            (self.losses, rules.loss),
        ]
        .into_iter()
        .map(|(games, points)| i32::try_from(games).unwrap_or(i32::MAX).saturating_mul(points))
        .fold(0i32, i32::saturating_add)
    }

    pub fn touchdown_difference(&self) -> i32 {
        self.touchdowns_for.saturating_sub(self.touchdowns_against)
    }

    pub fn casualty_difference(&self) -> i32 {
        self.casualties_for.saturating_sub(self.casualties_against)
    }
}
