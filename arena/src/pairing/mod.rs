//! Pairing engine: turns the previous round's standings and the opponent
//! history into the table assignments of the next round.

pub mod members;
pub mod swiss;

pub use members::{MemberScores, pair_members, rank_members};
pub use swiss::{Draw, OpponentHistory, have_met, pair_ranked};

use crate::{
    db::{ArenaRepository, PlayerDirectory, TimeoutConfig},
    errors::{ArenaError, ArenaResult},
    models::{PairingWarning, Squad, SquadId, SquadsPairing, SquadsRound, TournamentId},
    prizes::PrizeCatalog,
    roster::load_squads,
};
use futures_util::future::try_join_all;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Builds the pairings of a round
#[derive(Clone)]
pub struct PairingEngine {
    repository: Arc<dyn ArenaRepository>,
    directory: Arc<dyn PlayerDirectory>,
    prizes: Arc<dyn PrizeCatalog>,
    timeouts: TimeoutConfig,
}

impl PairingEngine {
    pub fn new(
        repository: Arc<dyn ArenaRepository>,
        directory: Arc<dyn PlayerDirectory>,
        prizes: Arc<dyn PrizeCatalog>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            repository,
            directory,
            prizes,
            timeouts,
        }
    }

    /// Calculate the pairings of `round`
    ///
    /// Reads standings of `round - 1`; they must already be computed.
    /// Nothing is persisted.
    ///
    /// # Errors
    ///
    /// * `ArenaError::InvalidRoundSequence` - round 0
    /// * `ArenaError::NotFound` - no squads entered, or no squad prize configured
    /// * `ArenaError::DataUnavailable` - standings of the previous round are missing
    pub async fn calculate_pairings(
        &self,
        tournament_id: TournamentId,
        round: u32,
    ) -> ArenaResult<SquadsRound> {
        if round == 0 {
            return Err(ArenaError::InvalidRoundSequence(
                "rounds are numbered from 1".to_string(),
            ));
        }

        let squads = load_squads(
            self.repository.as_ref(),
            self.directory.as_ref(),
            tournament_id,
            self.timeouts.directory,
        )
        .await?;
        if squads.is_empty() {
            return Err(ArenaError::NotFound(format!(
                "squads of tournament {}",
                tournament_id
            )));
        }

        let ranked = self.ranked_squads(tournament_id, round, &squads).await?;
        let history = self.opponent_history(tournament_id, round, &ranked).await?;
        let member_scores = self.member_scores(tournament_id, round, &squads).await?;

        let draws = pair_ranked(&ranked, &history);
        let squads_pairings = build_pairings(&draws, &squads, &member_scores)?;

        debug!(
            "Paired round {} of {}: {} tables",
            round,
            tournament_id,
            squads_pairings.len()
        );

        Ok(SquadsRound {
            number: round,
            squads_pairings,
        })
    }

    /// Squad ids best first: roster order for round 1, primary squad prize
    /// standings of the previous round afterwards
    async fn ranked_squads(
        &self,
        tournament_id: TournamentId,
        round: u32,
        squads: &[Squad],
    ) -> ArenaResult<Vec<SquadId>> {
        let roster: Vec<SquadId> = squads.iter().map(|s| s.id).collect();
        if round == 1 {
            return Ok(roster);
        }

        let primary = self
            .prizes
            .squad_prizes(tournament_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ArenaError::NotFound("squad prize".to_string()))?;

        let standings = self
            .repository
            .get_standings(tournament_id, round - 1, primary.id)
            .await?;
        if standings.is_empty() {
            return Err(ArenaError::DataUnavailable(format!(
                "'{}' standings for round {}",
                primary.name,
                round - 1
            )));
        }

        let entered: BTreeSet<SquadId> = roster.iter().copied().collect();
        let mut ranked: Vec<SquadId> = standings
            .iter()
            .map(|score| score.competitor_id)
            .filter(|id| entered.contains(id))
            .collect();
        let ranked_set: BTreeSet<SquadId> = ranked.iter().copied().collect();
        ranked.extend(roster.into_iter().filter(|id| !ranked_set.contains(id)));

        Ok(ranked)
    }

    async fn opponent_history(
        &self,
        tournament_id: TournamentId,
        round: u32,
        ranked: &[SquadId],
    ) -> ArenaResult<OpponentHistory> {
        let opponents = try_join_all(ranked.iter().map(|squad_id| {
            self.repository
                .get_past_opponents(tournament_id, *squad_id, round)
        }))
        .await?;

        Ok(ranked.iter().copied().zip(opponents).collect())
    }

    /// Primary player prize scores of the previous round; empty for round 1
    async fn member_scores(
        &self,
        tournament_id: TournamentId,
        round: u32,
        squads: &[Squad],
    ) -> ArenaResult<MemberScores> {
        if round == 1 {
            return Ok(MemberScores::new());
        }
        let Some(primary) = self
            .prizes
            .player_prizes(tournament_id)
            .await?
            .into_iter()
            .next()
        else {
            return Ok(MemberScores::new());
        };

        let players: BTreeSet<_> = squads
            .iter()
            .flat_map(|s| s.members.iter().map(|m| m.member.player.id))
            .collect();
        let scores = try_join_all(players.iter().map(|player_id| {
            self.repository
                .get_player_score(tournament_id, round - 1, primary.id, *player_id)
        }))
        .await?;

        Ok(scores
            .into_iter()
            .flatten()
            .map(|score| (score.competitor_id, score))
            .collect())
    }
}

/// Turn a draw into numbered table pairings; matches first, then byes
fn build_pairings(
    draws: &[Draw],
    squads: &[Squad],
    scores: &MemberScores,
) -> ArenaResult<Vec<SquadsPairing>> {
    let by_id: BTreeMap<SquadId, &Squad> = squads.iter().map(|s| (s.id, s)).collect();
    let squad = |id: &SquadId| {
        by_id
            .get(id)
            .copied()
            .ok_or_else(|| ArenaError::NotFound(format!("squad {}", id)))
    };

    draws
        .iter()
        .zip(1u32..)
        .map(|(draw, table)| match draw {
            Draw::Match {
                home,
                away,
                forced_rematch,
            } => {
                let (home, away) = (squad(home)?, squad(away)?);
                let (players_pairings, mut warnings) = pair_members(table, home, away, scores);
                if *forced_rematch {
                    warn!(
                        "Table {}: '{}' and '{}' meet again, no other opponent left",
                        table, home.name, away.name
                    );
                    warnings.insert(0, PairingWarning::ForcedRematch);
                }
                Ok(SquadsPairing {
                    table,
                    home: home.clone(),
                    away: Some(away.clone()),
                    players_pairings,
                    warnings,
                })
            }
            Draw::Bye(home) => Ok(SquadsPairing {
                table,
                home: squad(home)?.clone(),
                away: None,
                players_pairings: Vec::new(),
                warnings: Vec::new(),
            }),
        })
        .collect()
}
