//! Member sub-pairing within a squad pairing.

use crate::models::{PairingWarning, PlayerId, PlayersPairing, Score, Squad, TournamentPlayer};
use log::warn;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Individual scores keyed by player, from the primary player prize
pub type MemberScores = BTreeMap<PlayerId, Score>;

fn by_score(a: Option<&Score>, b: Option<&Score>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b
            .points
            .cmp(&a.points)
            .then_with(|| b.tiebreak.cmp(&a.tiebreak)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Members of a squad, best individual score first.
///
/// Members without a score go last; equal scores keep roster order.
pub fn rank_members<'a>(squad: &'a Squad, scores: &MemberScores) -> Vec<&'a TournamentPlayer> {
    let mut members: Vec<&TournamentPlayer> = squad.members.iter().map(|m| &m.member).collect();
    members.sort_by(|a, b| by_score(scores.get(&a.player.id), scores.get(&b.player.id)));
    members
}

/// Pair members position for position. Members beyond the smaller squad's
/// size play nobody at this table and are reported as warnings.
pub fn pair_members(
    table: u32,
    home: &Squad,
    away: &Squad,
    scores: &MemberScores,
) -> (Vec<PlayersPairing>, Vec<PairingWarning>) {
    let home_ranked = rank_members(home, scores);
    let away_ranked = rank_members(away, scores);

    let pairings = home_ranked
        .iter()
        .zip(away_ranked.iter())
        .map(|(h, a)| PlayersPairing {
            table,
            home: (*h).clone(),
            away: (*a).clone(),
        })
        .collect();

    let paired = home_ranked.len().min(away_ranked.len());
    let warnings = [(home, &home_ranked), (away, &away_ranked)]
        .into_iter()
        .filter(|(_, ranked)| ranked.len() > paired)
        .map(|(squad, ranked)| {
            let player_ids: Vec<PlayerId> = ranked[paired..].iter().map(|m| m.player.id).collect();
            warn!(
                "Table {}: {} member(s) of '{}' left unpaired",
                table,
                player_ids.len(),
                squad.name
            );
            PairingWarning::UnpairedMembers {
                squad_id: squad.id,
                player_ids,
            }
        })
        .collect();

    (pairings, warnings)
}
