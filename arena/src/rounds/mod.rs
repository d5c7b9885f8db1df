//! Round lifecycle: the advance state machine of a tournament.
//!
//! Advancing is serialized per tournament. The round and its pairings reach
//! the repository in a single `create_round` call, after standings and
//! pairings are computed, so an advance that fails or is cancelled leaves no
//! round behind.

use crate::{
    db::{ArenaRepository, PlayerDirectory, TimeoutConfig},
    errors::{ArenaError, ArenaResult},
    models::{PlayersRound, PrizeId, Score, SquadsPairing, SquadsRound, TournamentId},
    pairing::PairingEngine,
    prizes::PrizeCatalog,
    standings::StandingsCalculator,
};
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where a tournament stands in its sequence of rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    NoRounds,
    Round(u32),
}

impl RoundState {
    pub fn from_last_round(last: Option<u32>) -> Self {
        match last {
            Some(round) if round > 0 => RoundState::Round(round),
            _ => RoundState::NoRounds,
        }
    }

    /// Number of the round an advance creates
    pub fn next_round(&self) -> u32 {
        match self {
            RoundState::NoRounds => 1,
            RoundState::Round(round) => round + 1,
        }
    }
}

/// Drives round creation, standings and pairing substitution
pub struct RoundManager {
    repository: Arc<dyn ArenaRepository>,
    standings: StandingsCalculator,
    pairing: PairingEngine,
    locks: Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>,
}

impl RoundManager {
    /// Create a new round manager
    ///
    /// # Arguments
    ///
    /// * `repository` - Tournament persistence
    /// * `directory` - Player directory used to enrich pairings
    /// * `prizes` - Prize catalog; the first prize of each list drives pairing
    /// * `timeouts` - Deadlines for directory lookups
    pub fn new(
        repository: Arc<dyn ArenaRepository>,
        directory: Arc<dyn PlayerDirectory>,
        prizes: Arc<dyn PrizeCatalog>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            standings: StandingsCalculator::new(repository.clone(), prizes.clone()),
            pairing: PairingEngine::new(repository.clone(), directory, prizes, timeouts),
            repository,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn tournament_lock(&self, tournament_id: TournamentId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(tournament_id)
            .or_default()
            .clone()
    }

    /// Drop the tournament's entry once nobody else holds or waits on it
    async fn release_lock(&self, tournament_id: TournamentId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // the map and `lock` are the only owners left
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&tournament_id);
        }
    }

    async fn ensure_tournament(&self, tournament_id: TournamentId) -> ArenaResult<()> {
        if self.repository.tournament_exists(tournament_id).await? {
            Ok(())
        } else {
            Err(ArenaError::NotFound(format!("tournament {}", tournament_id)))
        }
    }

    /// Current round state of a tournament
    pub async fn state(&self, tournament_id: TournamentId) -> ArenaResult<RoundState> {
        self.ensure_tournament(tournament_id).await?;
        let last = self.repository.last_round(tournament_id).await?;
        Ok(RoundState::from_last_round(last))
    }

    /// Advance a tournament to its next round
    ///
    /// Ranks the round just completed, pairs the new round and stores both
    /// the round and its pairings.
    ///
    /// # Errors
    ///
    /// * `ArenaError::NotFound` - unknown tournament or no squads entered
    /// * `ArenaError::InvalidRoundSequence` - the round was created concurrently
    /// * `ArenaError::DataUnavailable` - no result was recorded for the previous round
    /// * `ArenaError::Standings` - previous round could not be ranked
    pub async fn prepare_next_round(&self, tournament_id: TournamentId) -> ArenaResult<SquadsRound> {
        let lock = self.tournament_lock(tournament_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.advance(tournament_id).await
        };
        self.release_lock(tournament_id, lock).await;
        result
    }

    async fn advance(&self, tournament_id: TournamentId) -> ArenaResult<SquadsRound> {
        let next = self.state(tournament_id).await?.next_round();
        if next > 1 {
            self.standings
                .calculate_standings(tournament_id, next - 1)
                .await?;
        }

        let round = self.pairing.calculate_pairings(tournament_id, next).await?;
        self.repository.create_round(tournament_id, &round).await?;

        info!(
            "Tournament {} advanced to round {} ({} tables, {} forced rematches)",
            tournament_id,
            round.number,
            round.squads_pairings.len(),
            round
                .squads_pairings
                .iter()
                .filter(|p| p.is_forced_rematch())
                .count()
        );

        Ok(round)
    }

    /// Replace the pairings of an existing round
    ///
    /// Standings are not recomputed and rematches are not checked.
    ///
    /// # Errors
    ///
    /// * `ArenaError::NotFound` - unknown tournament
    /// * `ArenaError::InvalidRoundSequence` - the round does not exist
    pub async fn substitute_round(
        &self,
        tournament_id: TournamentId,
        round: u32,
        pairings: Vec<SquadsPairing>,
    ) -> ArenaResult<SquadsRound> {
        let lock = self.tournament_lock(tournament_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.substitute(tournament_id, round, pairings).await
        };
        self.release_lock(tournament_id, lock).await;
        result
    }

    async fn substitute(
        &self,
        tournament_id: TournamentId,
        round: u32,
        pairings: Vec<SquadsPairing>,
    ) -> ArenaResult<SquadsRound> {
        self.ensure_tournament(tournament_id).await?;
        self.repository
            .replace_pairings(tournament_id, round, &pairings)
            .await?;

        info!(
            "Round {} of tournament {} substituted ({} tables)",
            round,
            tournament_id,
            pairings.len()
        );

        Ok(SquadsRound {
            number: round,
            squads_pairings: pairings,
        })
    }

    /// Recompute standings of a round for every prize
    pub async fn calculate_standings(
        &self,
        tournament_id: TournamentId,
        round: u32,
    ) -> ArenaResult<()> {
        self.ensure_tournament(tournament_id).await?;
        self.standings
            .calculate_standings(tournament_id, round)
            .await
    }

    /// Stored standings of one prize
    pub async fn get_standings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize_id: PrizeId,
    ) -> ArenaResult<Vec<Score>> {
        self.standings
            .get_standings(tournament_id, round, prize_id)
            .await
    }

    /// A created round with its squad pairings
    pub async fn get_round(&self, tournament_id: TournamentId, round: u32) -> ArenaResult<SquadsRound> {
        self.repository
            .get_round(tournament_id, round)
            .await?
            .ok_or_else(|| {
                ArenaError::NotFound(format!("round {} of tournament {}", round, tournament_id))
            })
    }

    /// A created round flattened to its individual games
    pub async fn players_round(
        &self,
        tournament_id: TournamentId,
        round: u32,
    ) -> ArenaResult<PlayersRound> {
        let round = self.get_round(tournament_id, round).await?;
        Ok(PlayersRound::from(&round))
    }
}
