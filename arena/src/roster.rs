//! Squad rosters enriched with player directory data.

use crate::{
    db::{ArenaRepository, PlayerDirectory, timeouts::with_timeout},
    errors::ArenaResult,
    models::{Squad, SquadEntity, SquadMemberEntity, SquadPlayer, TournamentId, TournamentPlayer},
};
use futures_util::future::try_join_all;
use std::time::Duration;

/// Load every squad of a tournament and resolve its members through the
/// directory. Squads come back ordered by name then id, members in roster order.
pub async fn load_squads(
    repository: &dyn ArenaRepository,
    directory: &dyn PlayerDirectory,
    tournament_id: TournamentId,
    directory_timeout: Duration,
) -> ArenaResult<Vec<Squad>> {
    let mut entities = repository.get_squads(tournament_id).await?;
    entities.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    try_join_all(
        entities
            .iter()
            .map(|entity| enrich_squad(directory, entity, directory_timeout)),
    )
    .await
}

async fn enrich_squad(
    directory: &dyn PlayerDirectory,
    entity: &SquadEntity,
    directory_timeout: Duration,
) -> ArenaResult<Squad> {
    let members = try_join_all(
        entity
            .members
            .iter()
            .map(|member| enrich_member(directory, member, directory_timeout)),
    )
    .await?;

    Ok(Squad {
        id: entity.id,
        name: entity.name.clone(),
        members,
    })
}

async fn enrich_member(
    directory: &dyn PlayerDirectory,
    member: &SquadMemberEntity,
    directory_timeout: Duration,
) -> ArenaResult<SquadPlayer> {
    let inscription = &member.inscription;
    let player = with_timeout(
        directory_timeout,
        directory.get_player(inscription.player_id),
    )
    .await?;

    Ok(SquadPlayer {
        member: TournamentPlayer {
            player,
            team_name: inscription.team_name.clone(),
            team_race: inscription.team_race.clone(),
            naf_score: inscription.naf_score.clone(),
            substitute: inscription.substitute,
        },
        role: member.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{MemoryArenaRepository, MemoryPlayerDirectory},
        errors::ArenaError,
        models::{Player, PlayerInscription, SquadRole},
    };
    use uuid::Uuid;

    fn member(player: u128, role: SquadRole) -> SquadMemberEntity {
        SquadMemberEntity {
            inscription: PlayerInscription {
                player_id: Uuid::from_u128(player),
                team_name: format!("Team {}", player),
                team_race: "Orc".to_string(),
                naf_score: String::new(),
                substitute: false,
            },
            role,
        }
    }

    #[tokio::test]
    async fn test_members_are_resolved_in_roster_order() {
        let repo = MemoryArenaRepository::new();
        let directory = MemoryPlayerDirectory::new();
        let tournament = Uuid::from_u128(1);

        for n in [11, 12] {
            directory
                .add_player(Player {
                    id: Uuid::from_u128(n),
                    name: format!("Coach {}", n),
                    naf_number: n.to_string(),
                })
                .await;
        }
        repo.add_squad(
            tournament,
            SquadEntity {
                id: Uuid::from_u128(100),
                name: "Da Boyz".to_string(),
                members: vec![member(12, SquadRole::Captain), member(11, SquadRole::Member)],
            },
        )
        .await;

        let squads = load_squads(&repo, &directory, tournament, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(squads.len(), 1);
        assert_eq!(squads[0].members[0].member.player.name, "Coach 12");
        assert_eq!(squads[0].members[0].role, SquadRole::Captain);
        assert_eq!(squads[0].members[1].member.team_name, "Team 11");
    }

    #[tokio::test]
    async fn test_unknown_player_fails_enrichment() {
        let repo = MemoryArenaRepository::new();
        let directory = MemoryPlayerDirectory::new();
        let tournament = Uuid::from_u128(1);
        repo.add_squad(
            tournament,
            SquadEntity {
                id: Uuid::from_u128(100),
                name: "Lonely".to_string(),
                members: vec![member(13, SquadRole::Captain)],
            },
        )
        .await;

        let err = load_squads(&repo, &directory, tournament, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ArenaError::NotFound(_)));
    }
}
