//! In-process repository and player directory.
//!
//! Same invariants as the PostgreSQL implementation: round numbers are
//! contiguous per tournament, a round is stored together with its pairings,
//! standings replace the previous table of the same (round, prize).

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use super::repository::{ArenaRepository, PlayerDirectory};
use crate::{
    errors::{ArenaError, ArenaResult},
    models::{
        GameResult, Player, PlayerId, PrizeId, Score, SquadEntity, SquadId, SquadsPairing,
        SquadsRound, TournamentId,
    },
    prizes::Prize,
};

#[derive(Debug, Clone)]
struct StoredStandings {
    prize_name: String,
    scores: Vec<Score>,
}

#[derive(Debug, Default)]
struct MemoryState {
    tournaments: BTreeSet<TournamentId>,
    squads: BTreeMap<TournamentId, Vec<SquadEntity>>,
    results: BTreeMap<(TournamentId, PlayerId), Vec<GameResult>>,
    standings: BTreeMap<(TournamentId, u32, PrizeId), StoredStandings>,
    rounds: BTreeMap<TournamentId, BTreeMap<u32, Vec<SquadsPairing>>>,
}

/// Repository kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryArenaRepository {
    state: RwLock<MemoryState>,
}

impl MemoryArenaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_tournament(&self, tournament_id: TournamentId) {
        self.state.write().await.tournaments.insert(tournament_id);
    }

    /// Enter a squad; squads are kept ordered by name then id
    pub async fn add_squad(&self, tournament_id: TournamentId, squad: SquadEntity) {
        let mut state = self.state.write().await;
        let squads = state.squads.entry(tournament_id).or_default();
        squads.retain(|s| s.id != squad.id);
        squads.push(squad);
        squads.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    }

    /// Store a game result, replacing an earlier one for the same round
    pub async fn record_result(&self, tournament_id: TournamentId, result: GameResult) {
        let mut state = self.state.write().await;
        let results = state
            .results
            .entry((tournament_id, result.player_id))
            .or_default();
        results.retain(|r| r.round != result.round);
        results.push(result);
        results.sort_by_key(|r| r.round);
    }

    /// Created round numbers in ascending order
    pub async fn round_numbers(&self, tournament_id: TournamentId) -> Vec<u32> {
        self.state
            .read()
            .await
            .rounds
            .get(&tournament_id)
            .map(|rounds| rounds.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Name under which a standings table was stored
    pub async fn standings_name(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize_id: PrizeId,
    ) -> Option<String> {
        self.state
            .read()
            .await
            .standings
            .get(&(tournament_id, round, prize_id))
            .map(|s| s.prize_name.clone())
    }
}

#[async_trait]
impl ArenaRepository for MemoryArenaRepository {
    async fn tournament_exists(&self, tournament_id: TournamentId) -> ArenaResult<bool> {
        Ok(self.state.read().await.tournaments.contains(&tournament_id))
    }

    async fn get_squads(&self, tournament_id: TournamentId) -> ArenaResult<Vec<SquadEntity>> {
        Ok(self
            .state
            .read()
            .await
            .squads
            .get(&tournament_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_past_opponents(
        &self,
        tournament_id: TournamentId,
        squad_id: SquadId,
        before_round: u32,
    ) -> ArenaResult<BTreeSet<SquadId>> {
        let state = self.state.read().await;
        let Some(rounds) = state.rounds.get(&tournament_id) else {
            return Ok(BTreeSet::new());
        };

        Ok(rounds
            .range(..before_round)
            .flat_map(|(_, pairings)| pairings)
            .filter_map(|pairing| {
                let away = pairing.away.as_ref()?;
                if pairing.home.id == squad_id {
                    Some(away.id)
                } else if away.id == squad_id {
                    Some(pairing.home.id)
                } else {
                    None
                }
            })
            .collect())
    }

    async fn get_results(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        up_to_round: u32,
    ) -> ArenaResult<Vec<GameResult>> {
        Ok(self
            .state
            .read()
            .await
            .results
            .get(&(tournament_id, player_id))
            .map(|results| {
                results
                    .iter()
                    .filter(|r| r.round <= up_to_round)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count_results(&self, tournament_id: TournamentId, round: u32) -> ArenaResult<u64> {
        Ok(self
            .state
            .read()
            .await
            .results
            .iter()
            .filter(|((tournament, _), _)| *tournament == tournament_id)
            .flat_map(|(_, results)| results)
            .filter(|r| r.round == round)
            .count() as u64)
    }

    async fn get_player_score(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize_id: PrizeId,
        player_id: PlayerId,
    ) -> ArenaResult<Option<Score>> {
        Ok(self
            .state
            .read()
            .await
            .standings
            .get(&(tournament_id, round, prize_id))
            .and_then(|s| s.scores.iter().find(|score| score.competitor_id == player_id))
            .cloned())
    }

    async fn set_standings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize: &Prize,
        scores: &[Score],
    ) -> ArenaResult<()> {
        self.state.write().await.standings.insert(
            (tournament_id, round, prize.id),
            StoredStandings {
                prize_name: prize.name.clone(),
                scores: scores.to_vec(),
            },
        );
        Ok(())
    }

    async fn get_standings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize_id: PrizeId,
    ) -> ArenaResult<Vec<Score>> {
        Ok(self
            .state
            .read()
            .await
            .standings
            .get(&(tournament_id, round, prize_id))
            .map(|s| s.scores.clone())
            .unwrap_or_default())
    }

    async fn last_round(&self, tournament_id: TournamentId) -> ArenaResult<Option<u32>> {
        Ok(self
            .state
            .read()
            .await
            .rounds
            .get(&tournament_id)
            .and_then(|rounds| rounds.keys().next_back().copied()))
    }

    async fn create_round(
        &self,
        tournament_id: TournamentId,
        round: &SquadsRound,
    ) -> ArenaResult<u32> {
        let mut state = self.state.write().await;
        if !state.tournaments.contains(&tournament_id) {
            return Err(ArenaError::NotFound(format!("tournament {}", tournament_id)));
        }

        let rounds = state.rounds.entry(tournament_id).or_default();
        let next = rounds.keys().next_back().map_or(1, |last| last + 1);
        if round.number != next {
            return Err(ArenaError::InvalidRoundSequence(format!(
                "round {} requested but the next round is {}",
                round.number, next
            )));
        }

        rounds.insert(round.number, round.squads_pairings.clone());
        Ok(round.number)
    }

    async fn get_round(
        &self,
        tournament_id: TournamentId,
        round: u32,
    ) -> ArenaResult<Option<SquadsRound>> {
        Ok(self
            .state
            .read()
            .await
            .rounds
            .get(&tournament_id)
            .and_then(|rounds| rounds.get(&round))
            .map(|pairings| SquadsRound {
                number: round,
                squads_pairings: pairings.clone(),
            }))
    }

    async fn replace_pairings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        pairings: &[SquadsPairing],
    ) -> ArenaResult<()> {
        let mut state = self.state.write().await;
        let stored = state
            .rounds
            .get_mut(&tournament_id)
            .and_then(|rounds| rounds.get_mut(&round))
            .ok_or_else(|| {
                ArenaError::InvalidRoundSequence(format!("round {} does not exist", round))
            })?;

        *stored = pairings.to_vec();
        Ok(())
    }
}

/// Player directory kept in memory
#[derive(Debug, Default)]
pub struct MemoryPlayerDirectory {
    players: RwLock<BTreeMap<PlayerId, Player>>,
}

impl MemoryPlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_player(&self, player: Player) {
        self.players.write().await.insert(player.id, player);
    }
}

#[async_trait]
impl PlayerDirectory for MemoryPlayerDirectory {
    async fn get_player(&self, player_id: PlayerId) -> ArenaResult<Player> {
        self.players
            .read()
            .await
            .get(&player_id)
            .cloned()
            .ok_or_else(|| ArenaError::NotFound(format!("player {}", player_id)))
    }
}
