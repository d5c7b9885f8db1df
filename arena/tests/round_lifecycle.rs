//! Integration tests for the round lifecycle
//!
//! These tests drive the public engine API against the in-memory
//! collaborators: advancing rounds, ranking, substitution and failure paths.

use arena::{
    ArenaError, ArenaResult, PrizeCatalog, RoundManager, StaticPrizeCatalog,
    db::{ArenaRepository, MemoryArenaRepository, MemoryPlayerDirectory, TimeoutConfig},
    models::{
        GameResult, Player, PlayerId, PlayerInscription, PrizeId, Score, SquadEntity, SquadId,
        SquadMemberEntity, SquadRole, SquadsPairing, SquadsRound, TournamentId,
    },
    prizes::Prize,
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

const TOURNAMENT: u128 = 77;

/// Tournament with `count` squads of two coaches each; squad n has players
/// n*10+1 and n*10+2
async fn setup(count: u128) -> (Arc<MemoryArenaRepository>, Arc<MemoryPlayerDirectory>) {
    let repo = Arc::new(MemoryArenaRepository::new());
    let directory = Arc::new(MemoryPlayerDirectory::new());
    repo.add_tournament(id(TOURNAMENT)).await;

    for n in 1..=count {
        let mut members = Vec::new();
        for (slot, role) in [(1, SquadRole::Captain), (2, SquadRole::Member)] {
            let player_id = id(n * 10 + slot);
            directory
                .add_player(Player {
                    id: player_id,
                    name: format!("Coach {}-{}", n, slot),
                    naf_number: format!("{}", 20_000 + n * 10 + slot),
                })
                .await;
            members.push(SquadMemberEntity {
                inscription: PlayerInscription {
                    player_id,
                    team_name: format!("Team {}-{}", n, slot),
                    team_race: "Human".to_string(),
                    naf_score: String::new(),
                    substitute: false,
                },
                role,
            });
        }
        repo.add_squad(
            id(TOURNAMENT),
            SquadEntity {
                id: id(n),
                name: format!("Squad {:02}", n),
                members,
            },
        )
        .await;
    }

    (repo, directory)
}

fn manager(repo: Arc<dyn ArenaRepository>, directory: Arc<MemoryPlayerDirectory>) -> RoundManager {
    RoundManager::new(
        repo,
        directory,
        Arc::new(StaticPrizeCatalog::default()),
        TimeoutConfig::default(),
    )
}

/// Record a drawn game for every player of `round`
async fn record_draws(repo: &MemoryArenaRepository, round: &SquadsRound) {
    for table in &round.squads_pairings {
        for pairing in &table.players_pairings {
            for (player, opponent) in [
                (pairing.home.player.id, pairing.away.player.id),
                (pairing.away.player.id, pairing.home.player.id),
            ] {
                repo.record_result(
                    id(TOURNAMENT),
                    GameResult {
                        round: round.number,
                        player_id: player,
                        opponent_id: Some(opponent),
                        touchdowns_for: 1,
                        touchdowns_against: 1,
                        casualties_for: 0,
                        casualties_against: 0,
                    },
                )
                .await;
            }
        }
    }
}

fn squad_pairs(round: &SquadsRound) -> Vec<BTreeSet<SquadId>> {
    round
        .squads_pairings
        .iter()
        .filter_map(|p| p.away.as_ref().map(|a| BTreeSet::from([p.home.id, a.id])))
        .collect()
}

#[tokio::test]
async fn test_rounds_are_numbered_contiguously() {
    let (repo, directory) = setup(6).await;
    let manager = manager(repo.clone(), directory);

    for expected in 1..=3 {
        let round = manager.prepare_next_round(id(TOURNAMENT)).await.unwrap();
        assert_eq!(round.number, expected);
        record_draws(&repo, &round).await;
    }

    assert_eq!(repo.round_numbers(id(TOURNAMENT)).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_no_rematch_while_fresh_opponents_remain() {
    let (repo, directory) = setup(8).await;
    let manager = manager(repo.clone(), directory);

    let mut seen: Vec<BTreeSet<SquadId>> = Vec::new();
    for _ in 0..3 {
        let round = manager.prepare_next_round(id(TOURNAMENT)).await.unwrap();
        assert_eq!(round.squads_pairings.len(), 4);
        assert!(round.squads_pairings.iter().all(|p| !p.is_forced_rematch()));

        for pair in squad_pairs(&round) {
            assert!(!seen.contains(&pair), "rematch {:?}", pair);
            seen.push(pair);
        }
        record_draws(&repo, &round).await;
    }
}

#[tokio::test]
async fn test_tables_are_numbered_in_order() {
    let (repo, directory) = setup(5).await;
    let manager = manager(repo, directory);

    let round = manager.prepare_next_round(id(TOURNAMENT)).await.unwrap();
    let tables: Vec<u32> = round.squads_pairings.iter().map(|p| p.table).collect();
    assert_eq!(tables, vec![1, 2, 3]);
    assert!(round.squads_pairings[2].is_bye());

    for pairing in &round.squads_pairings[..2] {
        assert_eq!(pairing.players_pairings.len(), 2);
        assert!(pairing.players_pairings.iter().all(|p| p.table == pairing.table));
    }
}

#[tokio::test]
async fn test_concurrent_advances_create_the_round_once() {
    let (repo, directory) = setup(4).await;
    let manager = Arc::new(manager(repo.clone(), directory));

    let round = manager.prepare_next_round(id(TOURNAMENT)).await.unwrap();
    record_draws(&repo, &round).await;

    let (a, b) = tokio::join!(
        manager.prepare_next_round(id(TOURNAMENT)),
        manager.prepare_next_round(id(TOURNAMENT)),
    );

    // The later advance finds round 2 created but not yet played
    let (created, rejected): (Vec<_>, Vec<_>) = [a, b].into_iter().partition(|r| r.is_ok());
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].as_ref().unwrap().number, 2);
    assert!(matches!(
        rejected[0].as_ref().unwrap_err(),
        ArenaError::DataUnavailable(_)
    ));
    assert_eq!(repo.round_numbers(id(TOURNAMENT)).await, vec![1, 2]);
}

#[tokio::test]
async fn test_unreported_round_blocks_the_next_advance() {
    let (repo, directory) = setup(4).await;
    let manager = manager(repo.clone(), directory);

    manager.prepare_next_round(id(TOURNAMENT)).await.unwrap();

    let err = manager.prepare_next_round(id(TOURNAMENT)).await.unwrap_err();
    assert!(matches!(err, ArenaError::DataUnavailable(ref msg) if msg.contains("round 1")));
    assert!(err.is_retryable());
    assert_eq!(repo.round_numbers(id(TOURNAMENT)).await, vec![1]);

    let team_score = StaticPrizeCatalog::default()
        .squad_prizes(id(TOURNAMENT))
        .await
        .unwrap()[0]
        .id;
    assert!(
        manager
            .get_standings(id(TOURNAMENT), 1, team_score)
            .await
            .unwrap()
            .is_empty()
    );

    // Once the round is reported the advance goes through
    let round = manager.get_round(id(TOURNAMENT), 1).await.unwrap();
    record_draws(&repo, &round).await;
    let second = manager.prepare_next_round(id(TOURNAMENT)).await.unwrap();
    assert_eq!(second.number, 2);
    assert_eq!(repo.round_numbers(id(TOURNAMENT)).await, vec![1, 2]);
}

#[tokio::test]
async fn test_standings_are_recomputed_not_accumulated() {
    let (repo, directory) = setup(2).await;
    let manager = manager(repo.clone(), directory);
    let round = manager.prepare_next_round(id(TOURNAMENT)).await.unwrap();
    record_draws(&repo, &round).await;

    let team_score = StaticPrizeCatalog::default()
        .squad_prizes(id(TOURNAMENT))
        .await
        .unwrap()[0]
        .id;

    manager.calculate_standings(id(TOURNAMENT), 1).await.unwrap();
    let first = manager
        .get_standings(id(TOURNAMENT), 1, team_score)
        .await
        .unwrap();
    manager.calculate_standings(id(TOURNAMENT), 1).await.unwrap();
    let second = manager
        .get_standings(id(TOURNAMENT), 1, team_score)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    // two drawn games per squad
    assert!(first.iter().all(|s| s.points == 2));
}

#[tokio::test]
async fn test_substituted_round_keeps_its_number() {
    let (repo, directory) = setup(4).await;
    let manager = manager(repo.clone(), directory);
    let round = manager.prepare_next_round(id(TOURNAMENT)).await.unwrap();

    let mut pairings = round.squads_pairings.clone();
    pairings.reverse();
    for (table, pairing) in pairings.iter_mut().enumerate() {
        pairing.table = table as u32 + 1;
    }

    let substituted = manager
        .substitute_round(id(TOURNAMENT), 1, pairings.clone())
        .await
        .unwrap();
    assert_eq!(substituted.number, 1);
    assert_eq!(repo.round_numbers(id(TOURNAMENT)).await, vec![1]);
    assert_eq!(
        manager.get_round(id(TOURNAMENT), 1).await.unwrap().squads_pairings,
        pairings
    );

    let err = manager
        .substitute_round(id(TOURNAMENT), 2, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ArenaError::InvalidRoundSequence(_)));
}

#[tokio::test]
async fn test_advance_without_squads_is_rejected() {
    let (repo, directory) = setup(0).await;
    let manager = manager(repo.clone(), directory);

    let err = manager.prepare_next_round(id(TOURNAMENT)).await.unwrap_err();
    assert!(matches!(err, ArenaError::NotFound(_)));
    assert!(repo.round_numbers(id(TOURNAMENT)).await.is_empty());
}

/// Repository whose result reads fail for chosen players
struct FlakyResults {
    inner: Arc<MemoryArenaRepository>,
    failing: BTreeSet<PlayerId>,
}

#[async_trait]
impl ArenaRepository for FlakyResults {
    async fn tournament_exists(&self, tournament_id: TournamentId) -> ArenaResult<bool> {
        self.inner.tournament_exists(tournament_id).await
    }

    async fn get_squads(&self, tournament_id: TournamentId) -> ArenaResult<Vec<SquadEntity>> {
        self.inner.get_squads(tournament_id).await
    }

    async fn get_past_opponents(
        &self,
        tournament_id: TournamentId,
        squad_id: SquadId,
        before_round: u32,
    ) -> ArenaResult<BTreeSet<SquadId>> {
        self.inner
            .get_past_opponents(tournament_id, squad_id, before_round)
            .await
    }

    async fn get_results(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        up_to_round: u32,
    ) -> ArenaResult<Vec<GameResult>> {
        if self.failing.contains(&player_id) {
            return Err(ArenaError::DataUnavailable(format!(
                "results of {}",
                player_id
            )));
        }
        self.inner
            .get_results(tournament_id, player_id, up_to_round)
            .await
    }

    async fn count_results(&self, tournament_id: TournamentId, round: u32) -> ArenaResult<u64> {
        self.inner.count_results(tournament_id, round).await
    }

    async fn get_player_score(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize_id: PrizeId,
        player_id: PlayerId,
    ) -> ArenaResult<Option<Score>> {
        self.inner
            .get_player_score(tournament_id, round, prize_id, player_id)
            .await
    }

    async fn set_standings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize: &Prize,
        scores: &[Score],
    ) -> ArenaResult<()> {
        self.inner
            .set_standings(tournament_id, round, prize, scores)
            .await
    }

    async fn get_standings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        prize_id: PrizeId,
    ) -> ArenaResult<Vec<Score>> {
        self.inner
            .get_standings(tournament_id, round, prize_id)
            .await
    }

    async fn last_round(&self, tournament_id: TournamentId) -> ArenaResult<Option<u32>> {
        self.inner.last_round(tournament_id).await
    }

    async fn create_round(
        &self,
        tournament_id: TournamentId,
        round: &SquadsRound,
    ) -> ArenaResult<u32> {
        self.inner.create_round(tournament_id, round).await
    }

    async fn get_round(
        &self,
        tournament_id: TournamentId,
        round: u32,
    ) -> ArenaResult<Option<SquadsRound>> {
        self.inner.get_round(tournament_id, round).await
    }

    async fn replace_pairings(
        &self,
        tournament_id: TournamentId,
        round: u32,
        pairings: &[SquadsPairing],
    ) -> ArenaResult<()> {
        self.inner
            .replace_pairings(tournament_id, round, pairings)
            .await
    }
}

#[tokio::test]
async fn test_failed_standings_aggregate_errors_and_leave_no_round() {
    let (repo, directory) = setup(4).await;
    let healthy = manager(repo.clone(), directory.clone());
    let round = healthy.prepare_next_round(id(TOURNAMENT)).await.unwrap();
    record_draws(&repo, &round).await;

    let flaky = Arc::new(FlakyResults {
        inner: repo.clone(),
        failing: BTreeSet::from([id(11), id(31)]),
    });
    let manager = manager(flaky, directory);

    let err = manager.prepare_next_round(id(TOURNAMENT)).await.unwrap_err();
    match &err {
        ArenaError::Standings { prize, errors } => {
            assert_eq!(prize, "Team Score");
            assert_eq!(errors.len(), 2);
            assert!(errors.iter().all(|e| matches!(e, ArenaError::DataUnavailable(_))));
        }
        other => panic!("expected aggregated standings error, got {:?}", other),
    }
    assert!(err.is_retryable());
    assert_eq!(repo.round_numbers(id(TOURNAMENT)).await, vec![1]);
}
