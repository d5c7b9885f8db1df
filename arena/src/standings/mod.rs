//! Standings: ranked score tables per (tournament, round, prize).
//!
//! Competitors of one prize are scored concurrently; the sort and the write
//! happen once every score of that prize is in. A prize whose scoring fails
//! for any competitor is not written at all.

use crate::{
    db::ArenaRepository,
    errors::{ArenaError, ArenaResult},
    models::{Competitor, PrizeId, Score, SquadEntity, TournamentId},
    prizes::{
        GameRecord, Prize, PrizeCatalog, ScoringStrategy, TiebreakStrategy, ensure_round_results,
    },
};
use futures_util::future::join_all;
use log::{debug, error};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Sort scores into standings order (see [`Score::rank_cmp`])
pub fn sort_standings(scores: &mut [Score]) {
    scores.sort_by(Score::rank_cmp);
}

/// Every tiebreak vector of a table must have the width of the prize's variant
pub fn check_tiebreak_shape(prize: &Prize, scores: &[Score]) -> ArenaResult<()> {
    let expected = prize.tiebreak.width();
    match scores.iter().find(|s| s.tiebreak.len() != expected) {
        Some(score) => {
            error!(
                "Tiebreak for prize '{}' produced {} keys for {}, expected {}",
                prize.name,
                score.tiebreak.len(),
                score.competitor_id,
                expected
            );
            Err(ArenaError::InconsistentTiebreakShape {
                prize: prize.name.clone(),
                expected,
                found: score.tiebreak.len(),
            })
        }
        None => Ok(()),
    }
}

/// Every rostered player once, in squad then roster order
pub fn player_competitors(squads: &[SquadEntity]) -> Vec<Competitor> {
    let mut seen = BTreeSet::new();
    squads
        .iter()
        .flat_map(|squad| squad.members.iter())
        .map(|member| member.inscription.player_id)
        .filter(|player_id| seen.insert(*player_id))
        .map(Competitor::player)
        .collect()
}

/// Computes and persists standings for every configured prize
#[derive(Clone)]
pub struct StandingsCalculator {
    repository: Arc<dyn ArenaRepository>,
    prizes: Arc<dyn PrizeCatalog>,
}

impl StandingsCalculator {
    pub fn new(repository: Arc<dyn ArenaRepository>, prizes: Arc<dyn PrizeCatalog>) -> Self {
        Self {
            repository,
            prizes,
        }
    }

    /// Rank every squad prize and every player prize for a completed round
    ///
    /// # Errors
    ///
    /// * `ArenaError::DataUnavailable` - round 0, or no result recorded for the round
    /// * `ArenaError::Standings` - at least one competitor of a prize failed
    /// * `ArenaError::InconsistentTiebreakShape` - engine defect in a tiebreak
    pub async fn calculate_standings(
        &self,
        tournament_id: TournamentId,
        round: u32,
    ) -> ArenaResult<()> {
        ensure_round_results(self.repository.as_ref(), tournament_id, round).await?;

        let squads = self.repository.get_squads(tournament_id).await?;
        let squad_competitors: Vec<Competitor> =
            squads.iter().map(SquadEntity::competitor).collect();
        let players = player_competitors(&squads);

        for prize in self.prizes.squad_prizes(tournament_id).await? {
            self.rank_prize(round, &prize, &squad_competitors).await?;
        }
        for prize in self.prizes.player_prizes(tournament_id).await? {
            self.rank_prize(round, &prize, &players).await?;
        }

        Ok(())
    }

    /// Score, sort and persist one prize; returns the stored table
    pub async fn rank_prize(
        &self,
        round: u32,
        prize: &Prize,
        competitors: &[Competitor],
    ) -> ArenaResult<Vec<Score>> {
        let outcomes = join_all(
            competitors
                .iter()
                .map(|competitor| self.score(round, prize, competitor)),
        )
        .await;

        let mut scores = Vec::with_capacity(outcomes.len());
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(score) => scores.push(score),
                Err(e) => errors.push(e),
            }
        }

        if !errors.is_empty() {
            return Err(ArenaError::Standings {
                prize: prize.name.clone(),
                errors,
            });
        }

        check_tiebreak_shape(prize, &scores)?;
        sort_standings(&mut scores);

        self.repository
            .set_standings(prize.tournament_id, round, prize, &scores)
            .await?;

        debug!(
            "Standings for '{}' after round {} stored ({} competitors)",
            prize.name,
            round,
            scores.len()
        );

        Ok(scores)
    }

    /// Persisted standings of one prize
    pub async fn get_standings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize_id: PrizeId,
    ) -> ArenaResult<Vec<Score>> {
        self.repository
            .get_standings(tournament_id, round, prize_id)
            .await
    }

    // One record read feeds both the scoring and the tiebreak
    async fn score(&self, round: u32, prize: &Prize, competitor: &Competitor) -> ArenaResult<Score> {
        let record =
            GameRecord::load(self.repository.as_ref(), prize.tournament_id, competitor, round)
                .await?;
        let points = prize.scoring.points(&record);
        let tiebreak = prize.tiebreak.keys(points, &record);

        Ok(Score::new(competitor.id, points, tiebreak))
    }
}
