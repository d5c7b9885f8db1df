//! Prizes: independently ranked categories, each bound to one scoring and one
//! tiebreak variant.
//!
//! The first prize of each list is the primary one: squad pairings follow the
//! primary squad prize, member sub-pairings follow the primary player prize.
//!
//! ## Example
//!
//! ```
//! use arena::prizes::{PrizeCatalog, ScoringRules, StaticPrizeCatalog};
//!
//! # #[tokio::main]
//! # async fn main() -> arena::ArenaResult<()> {
//! let catalog = StaticPrizeCatalog::standard(ScoringRules::default());
//! let prizes = catalog.squad_prizes(uuid::Uuid::new_v4()).await?;
//! assert_eq!(prizes[0].name, "Team Score");
//! # Ok(())
//! # }
//! ```

pub mod record;
pub mod scoring;
pub mod tiebreak;

pub use record::{GameRecord, ScoringRules, ensure_round_results};
pub use scoring::{Scoring, ScoringStrategy, TdScoring, TeamScoring};
pub use tiebreak::{RookieScoreTiebreak, ScoreTiebreak, Tiebreak, TiebreakStrategy};

use crate::{
    errors::ArenaResult,
    models::{PrizeId, TournamentId},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A prize of one tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    pub id: PrizeId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub scoring: Scoring,
    pub tiebreak: Tiebreak,
}

/// Source of the prizes evaluated for a tournament
#[async_trait]
pub trait PrizeCatalog: Send + Sync {
    /// Prizes ranking squads, primary first
    async fn squad_prizes(&self, tournament_id: TournamentId) -> ArenaResult<Vec<Prize>>;

    /// Prizes ranking individual players, primary first
    async fn player_prizes(&self, tournament_id: TournamentId) -> ArenaResult<Vec<Prize>>;
}

/// Prize definition independent of any tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeDefinition {
    pub id: PrizeId,
    pub name: String,
    pub scoring: Scoring,
    pub tiebreak: Tiebreak,
}

impl PrizeDefinition {
    fn for_tournament(&self, tournament_id: TournamentId) -> Prize {
        Prize {
            id: self.id,
            tournament_id,
            name: self.name.clone(),
            scoring: self.scoring,
            tiebreak: self.tiebreak,
        }
    }
}

/// The same prize lists for every tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticPrizeCatalog {
    pub squad: Vec<PrizeDefinition>,
    pub player: Vec<PrizeDefinition>,
}

const TEAM_SCORE_ID: Uuid = Uuid::from_u128(0x9fd84e03_648a_4061_a41b_25b316e78b61);
const SQUAD_MOST_TD_ID: Uuid = Uuid::from_u128(0x5025d3dd_c021_4727_8a3a_aed94b643728);
const PLAYER_SCORE_ID: Uuid = Uuid::from_u128(0x0df7298d_9224_4995_a051_8b09c4841bda);
const PLAYER_MOST_TD_ID: Uuid = Uuid::from_u128(0xbb03757a_e62e_460f_8320_5142dc07c21d);

impl StaticPrizeCatalog {
    /// Team Score and Most TD, for squads and for players
    pub fn standard(rules: ScoringRules) -> Self {
        let score = |id, name: &str| PrizeDefinition {
            id,
            name: name.to_string(),
            scoring: TeamScoring { rules }.into(),
            tiebreak: RookieScoreTiebreak {}.into(),
        };
        let touchdowns = |id| PrizeDefinition {
            id,
            name: "Most TD".to_string(),
            scoring: TdScoring {}.into(),
            tiebreak: ScoreTiebreak { rules }.into(),
        };

        Self {
            squad: vec![score(TEAM_SCORE_ID, "Team Score"), touchdowns(SQUAD_MOST_TD_ID)],
            player: vec![
                score(PLAYER_SCORE_ID, "Player Score"),
                touchdowns(PLAYER_MOST_TD_ID),
            ],
        }
    }

    /// Load a catalog from its JSON form
    pub fn from_json(json: &str) -> ArenaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for StaticPrizeCatalog {
    fn default() -> Self {
        Self::standard(ScoringRules::default())
    }
}

#[async_trait]
impl PrizeCatalog for StaticPrizeCatalog {
    async fn squad_prizes(&self, tournament_id: TournamentId) -> ArenaResult<Vec<Prize>> {
        Ok(self
            .squad
            .iter()
            .map(|d| d.for_tournament(tournament_id))
            .collect())
    }

    async fn player_prizes(&self, tournament_id: TournamentId) -> ArenaResult<Vec<Prize>> {
        Ok(self
            .player
            .iter()
            .map(|d| d.for_tournament(tournament_id))
            .collect())
    }
}
