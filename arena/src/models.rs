//! Tournament data models shared by standings, pairing and the round lifecycle.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Tournament ID type
pub type TournamentId = Uuid;

/// Squad ID type
pub type SquadId = Uuid;

/// Player ID type
pub type PlayerId = Uuid;

/// Prize ID type
pub type PrizeId = Uuid;

/// Role of a player inside a squad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SquadRole {
    Captain,
    Member,
}

impl SquadRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SquadRole::Captain => "captain",
            SquadRole::Member => "member",
        }
    }
}

impl std::str::FromStr for SquadRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "captain" => Ok(SquadRole::Captain),
            "member" => Ok(SquadRole::Member),
            other => Err(format!("unknown squad role '{}'", other)),
        }
    }
}

/// Directory record of a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub naf_number: String,
}

/// A player's entry in a tournament as stored by persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInscription {
    pub player_id: PlayerId,
    pub team_name: String,
    pub team_race: String,
    #[serde(default)]
    pub naf_score: String,
    #[serde(default)]
    pub substitute: bool,
}

/// Stored roster row of a squad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadMemberEntity {
    pub inscription: PlayerInscription,
    pub role: SquadRole,
}

/// Squad as returned by persistence, before directory enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadEntity {
    pub id: SquadId,
    pub name: String,
    /// Members in roster order
    pub members: Vec<SquadMemberEntity>,
}

impl SquadEntity {
    /// The squad as a scoring competitor (results of every member are pooled)
    pub fn competitor(&self) -> Competitor {
        Competitor {
            id: self.id,
            players: self
                .members
                .iter()
                .map(|m| m.inscription.player_id)
                .collect(),
        }
    }
}

/// A player taking part in a tournament, enriched with directory data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentPlayer {
    pub player: Player,
    pub team_name: String,
    pub team_race: String,
    pub naf_score: String,
    #[serde(default)]
    pub substitute: bool,
}

/// Squad member with its role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadPlayer {
    pub member: TournamentPlayer,
    pub role: SquadRole,
}

/// Squad ready for output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squad {
    pub id: SquadId,
    pub name: String,
    pub members: Vec<SquadPlayer>,
}

/// Anything that can be ranked: a squad or a single player.
///
/// `players` lists whose game results make up the competitor's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Competitor {
    pub id: Uuid,
    pub players: Vec<PlayerId>,
}

impl Competitor {
    pub fn player(player_id: PlayerId) -> Self {
        Self {
            id: player_id,
            players: vec![player_id],
        }
    }
}

/// Result of one game played by one player in one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub round: u32,
    pub player_id: PlayerId,
    pub opponent_id: Option<PlayerId>,
    pub touchdowns_for: i32,
    pub touchdowns_against: i32,
    pub casualties_for: i32,
    pub casualties_against: i32,
}

/// Outcome of a single game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl GameResult {
    pub fn outcome(&self) -> Outcome {
        match self.touchdowns_for.cmp(&self.touchdowns_against) {
            Ordering::Greater => Outcome::Win,
            Ordering::Equal => Outcome::Draw,
            Ordering::Less => Outcome::Loss,
        }
    }
}

/// Score of one competitor for one (round, prize).
///
/// Equality is structural: competitor, points and the full tiebreak vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub competitor_id: Uuid,
    pub points: i32,
    /// Most significant key first
    pub tiebreak: Vec<i32>,
}

impl Score {
    pub fn new(competitor_id: Uuid, points: i32, tiebreak: Vec<i32>) -> Self {
        Self {
            competitor_id,
            points,
            tiebreak,
        }
    }

    /// Standings order: `Less` means `self` ranks above `other`.
    ///
    /// Points descending, then tiebreak vector lexicographically descending,
    /// then competitor id ascending so the order is total.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .points
            .cmp(&self.points)
            .then_with(|| other.tiebreak.cmp(&self.tiebreak))
            .then_with(|| self.competitor_id.cmp(&other.competitor_id))
    }
}

/// Non-fatal conditions attached to a produced pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PairingWarning {
    /// Home and away have already met and no other opponent was available
    ForcedRematch,
    /// Members of the larger squad left without an opponent at this table
    UnpairedMembers {
        squad_id: SquadId,
        player_ids: Vec<PlayerId>,
    },
}

/// Two players facing each other at a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayersPairing {
    pub table: u32,
    pub home: TournamentPlayer,
    pub away: TournamentPlayer,
}

/// Two squads facing each other at a table. `away` is `None` for a bye.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadsPairing {
    pub table: u32,
    pub home: Squad,
    pub away: Option<Squad>,
    pub players_pairings: Vec<PlayersPairing>,
    #[serde(default)]
    pub warnings: Vec<PairingWarning>,
}

impl SquadsPairing {
    pub fn is_bye(&self) -> bool {
        self.away.is_none()
    }

    pub fn is_forced_rematch(&self) -> bool {
        self.warnings.contains(&PairingWarning::ForcedRematch)
    }
}

/// Pairings of one round at squad level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadsRound {
    pub number: u32,
    pub squads_pairings: Vec<SquadsPairing>,
}

/// Pairings of one round flattened to player level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayersRound {
    pub number: u32,
    pub players_pairings: Vec<PlayersPairing>,
}

impl From<&SquadsRound> for PlayersRound {
    fn from(round: &SquadsRound) -> Self {
        Self {
            number: round.number,
            players_pairings: round
                .squads_pairings
                .iter()
                .flat_map(|p| p.players_pairings.iter().cloned())
                .collect(),
        }
    }
}
