//! Adjacent-rank Swiss pairing with rematch avoidance.
//!
//! For each squad still unpaired, in rank order, the opponent is:
//!
//! 1. the nearest unpaired squad below it that it has not met,
//! 2. otherwise the nearest unpaired squad above it that it has not met,
//! 3. otherwise the nearest unpaired squad at all (below first), flagged as a
//!    forced rematch.
//!
//! A squad left with nobody to play gets a bye. Byes come after all matches.

use crate::models::SquadId;
use std::collections::{BTreeMap, BTreeSet};

/// Squads each squad has already faced
pub type OpponentHistory = BTreeMap<SquadId, BTreeSet<SquadId>>;

/// One entry of a round draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Draw {
    /// `home` is always the higher-ranked squad
    Match {
        home: SquadId,
        away: SquadId,
        forced_rematch: bool,
    },
    Bye(SquadId),
}

impl Draw {
    pub fn squads(&self) -> Vec<SquadId> {
        match self {
            Draw::Match { home, away, .. } => vec![*home, *away],
            Draw::Bye(home) => vec![*home],
        }
    }
}

/// Whether two squads met before, in either direction of the history
pub fn have_met(history: &OpponentHistory, a: SquadId, b: SquadId) -> bool {
    let faced = |x: SquadId, y: SquadId| history.get(&x).is_some_and(|set| set.contains(&y));
    faced(a, b) || faced(b, a)
}

#[derive(Debug, Default)]
struct Fold {
    paired: BTreeSet<SquadId>,
    matches: Vec<Draw>,
    byes: Vec<Draw>,
}

impl Fold {
    fn step(mut self, ranked: &[SquadId], history: &OpponentHistory, position: usize) -> Self {
        let squad = ranked[position];
        if self.paired.contains(&squad) {
            return self;
        }

        self.paired.insert(squad);
        match find_opponent(ranked, history, position, &self.paired) {
            Some(Opponent {
                position: other,
                forced_rematch,
            }) => {
                let opponent = ranked[other];
                self.paired.insert(opponent);
                let (home, away) = if other > position {
                    (squad, opponent)
                } else {
                    (opponent, squad)
                };
                self.matches.push(Draw::Match {
                    home,
                    away,
                    forced_rematch,
                });
            }
            None => self.byes.push(Draw::Bye(squad)),
        }
        self
    }

    fn finish(self) -> Vec<Draw> {
        let mut draws = self.matches;
        draws.extend(self.byes);
        draws
    }
}

struct Opponent {
    position: usize,
    forced_rematch: bool,
}

fn find_opponent(
    ranked: &[SquadId],
    history: &OpponentHistory,
    position: usize,
    paired: &BTreeSet<SquadId>,
) -> Option<Opponent> {
    let squad = ranked[position];
    let unpaired = |(_, candidate): &(usize, &SquadId)| !paired.contains(*candidate);
    let below = || {
        ranked
            .iter()
            .enumerate()
            .skip(position + 1)
            .filter(unpaired)
    };
    let above = || ranked[..position].iter().enumerate().rev().filter(unpaired);
    let fresh = |(_, candidate): &(usize, &SquadId)| !have_met(history, squad, **candidate);

    below()
        .find(fresh)
        .or_else(|| above().find(fresh))
        .map(|(position, _)| Opponent {
            position,
            forced_rematch: false,
        })
        .or_else(|| {
            below().chain(above()).next().map(|(position, _)| Opponent {
                position,
                forced_rematch: true,
            })
        })
}

/// Pair a ranked list of squads, index 0 being the best ranked.
///
/// Deterministic: the same ranking and history always produce the same draw.
/// A squad listed twice is only paired once.
pub fn pair_ranked(ranked: &[SquadId], history: &OpponentHistory) -> Vec<Draw> {
    (0..ranked.len())
        .fold(Fold::default(), |fold, position| {
            fold.step(ranked, history, position)
        })
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn squads(n: u128) -> Vec<SquadId> {
        (1..=n).map(Uuid::from_u128).collect()
    }

    fn met(history: &mut OpponentHistory, a: SquadId, b: SquadId) {
        history.entry(a).or_default().insert(b);
        history.entry(b).or_default().insert(a);
    }

    fn matched(home: SquadId, away: SquadId) -> Draw {
        Draw::Match {
            home,
            away,
            forced_rematch: false,
        }
    }

    #[test]
    fn test_adjacent_ranks_are_paired() {
        let ranked = squads(4);
        let draws = pair_ranked(&ranked, &OpponentHistory::new());

        assert_eq!(
            draws,
            vec![matched(ranked[0], ranked[1]), matched(ranked[2], ranked[3])]
        );
    }

    #[test]
    fn test_rematch_is_avoided_when_possible() {
        let ranked = squads(4);
        let mut history = OpponentHistory::new();
        met(&mut history, ranked[0], ranked[1]);

        let draws = pair_ranked(&ranked, &history);

        assert_eq!(
            draws,
            vec![matched(ranked[0], ranked[2]), matched(ranked[1], ranked[3])]
        );
    }

    #[test]
    fn test_history_is_read_in_both_directions() {
        let ranked = squads(4);
        let mut history = OpponentHistory::new();
        history.entry(ranked[1]).or_default().insert(ranked[0]);

        assert!(have_met(&history, ranked[0], ranked[1]));
        let draws = pair_ranked(&ranked, &history);
        assert_eq!(draws[0], matched(ranked[0], ranked[2]));
    }

    #[test]
    fn test_exhausted_history_forces_rematch_and_bye() {
        let ranked = squads(3);
        let mut history = OpponentHistory::new();
        met(&mut history, ranked[0], ranked[1]);
        met(&mut history, ranked[0], ranked[2]);
        met(&mut history, ranked[1], ranked[2]);

        let draws = pair_ranked(&ranked, &history);

        assert_eq!(
            draws,
            vec![
                Draw::Match {
                    home: ranked[0],
                    away: ranked[1],
                    forced_rematch: true,
                },
                Draw::Bye(ranked[2]),
            ]
        );
    }

    #[test]
    fn test_odd_count_gives_last_squad_a_bye() {
        let ranked = squads(5);
        let draws = pair_ranked(&ranked, &OpponentHistory::new());

        assert_eq!(draws.len(), 3);
        assert_eq!(draws[2], Draw::Bye(ranked[4]));
        assert!(draws.iter().all(|d| !matches!(
            d,
            Draw::Match {
                forced_rematch: true,
                ..
            }
        )));
    }

    #[test]
    fn test_two_rematches_avoided_together() {
        let ranked = squads(4);
        let mut history = OpponentHistory::new();
        met(&mut history, ranked[0], ranked[1]);
        met(&mut history, ranked[2], ranked[3]);

        let draws = pair_ranked(&ranked, &history);
        assert_eq!(
            draws,
            vec![matched(ranked[0], ranked[2]), matched(ranked[1], ranked[3])]
        );
    }

    #[test]
    fn test_duplicate_entries_are_paired_once() {
        let ranked = squads(2);
        let with_duplicate = vec![ranked[0], ranked[1], ranked[0]];
        let draws = pair_ranked(&with_duplicate, &OpponentHistory::new());
        assert_eq!(draws, vec![matched(ranked[0], ranked[1])]);
    }

    #[test]
    fn test_empty_ranking() {
        assert!(pair_ranked(&[], &OpponentHistory::new()).is_empty());
    }
}
