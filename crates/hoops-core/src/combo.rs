//! Team chemistry: win/loss records for every duo or trio that has shared a
//! side.
//!
//! Purely derived from the game log; nothing here is persisted.

use std::collections::HashMap;

use itertools::Itertools as _;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  game::{Game, Team},
  player::PlayerId,
};

/// Combos with fewer games than this are left out of the report.
pub const MIN_COMBO_GAMES: u32 = 5;

// ─── ComboSize ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComboSize {
  Duo,
  Trio,
}

impl ComboSize {
  /// Number of players in a combo of this size.
  pub fn k(self) -> usize {
    match self {
      Self::Duo => 2,
      Self::Trio => 3,
    }
  }
}

impl TryFrom<usize> for ComboSize {
  type Error = Error;

  fn try_from(k: usize) -> Result<Self> {
    match k {
      2 => Ok(Self::Duo),
      3 => Ok(Self::Trio),
      other => Err(Error::InvalidComboSize(other)),
    }
  }
}

// ─── Stats ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboStats {
  /// Members in ascending id order.
  pub player_ids:     Vec<PlayerId>,
  pub wins:           u32,
  pub losses:         u32,
  pub games_played:   u32,
  pub win_percentage: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
  wins:   u32,
  losses: u32,
}

/// Combo records with the default floor of [`MIN_COMBO_GAMES`], best win
/// percentage first.
pub fn compute_combo_stats(games: &[Game], size: ComboSize) -> Vec<ComboStats> {
  compute_combo_stats_with_min(games, size, MIN_COMBO_GAMES)
}

/// As [`compute_combo_stats`], with a caller-chosen minimum sample size.
///
/// Ties in win percentage are broken by games played (more first), then by
/// member ids, so the output order is fully determined by the log.
pub fn compute_combo_stats_with_min(
  games: &[Game],
  size: ComboSize,
  min_games: u32,
) -> Vec<ComboStats> {
  let mut tallies: HashMap<Vec<PlayerId>, Tally> = HashMap::new();
  for game in games {
    let winner = game.winner();
    for team in [Team::A, Team::B] {
      // Sorted members give every subset one canonical key.
      let members = game.roster.team(team).iter().sorted();
      for combo in members.cloned().combinations(size.k()) {
        let tally = tallies.entry(combo).or_default();
        if team == winner {
          tally.wins += 1;
        } else {
          tally.losses += 1;
        }
      }
    }
  }

  let mut stats: Vec<ComboStats> = tallies
    .into_iter()
    .filter_map(|(player_ids, t)| {
      let games_played = t.wins + t.losses;
      (games_played >= min_games && games_played > 0).then(|| ComboStats {
        player_ids,
        wins: t.wins,
        losses: t.losses,
        games_played,
        win_percentage: f64::from(t.wins) / f64::from(games_played),
      })
    })
    .collect();

  stats.sort_by(|a, b| {
    b.win_percentage
      .total_cmp(&a.win_percentage)
      .then_with(|| b.games_played.cmp(&a.games_played))
      .then_with(|| a.player_ids.cmp(&b.player_ids))
  });
  stats
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::game::{NewGame, Roster};

  fn ids(names: &[&str]) -> Vec<PlayerId> { names.iter().map(|n| PlayerId::from(*n)).collect() }

  fn game(a: &[&str], b: &[&str], sa: u32, sb: u32) -> Game {
    NewGame {
      played_on:    NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
      roster:       Roster::new(ids(a), ids(b)),
      team_a_score: sa,
      team_b_score: sb,
    }
    .into_game(Uuid::new_v4(), Utc::now())
  }

  fn find<'a>(stats: &'a [ComboStats], members: &[&str]) -> Option<&'a ComboStats> {
    let key = ids(members);
    stats.iter().find(|s| s.player_ids == key)
  }

  #[test]
  fn full_side_yields_every_duo_and_trio() {
    let log = vec![game(&["e", "d", "c", "b", "a"], &["x"], 21, 10)];
    let duos = compute_combo_stats_with_min(&log, ComboSize::Duo, 1);
    let trios = compute_combo_stats_with_min(&log, ComboSize::Trio, 1);
    assert_eq!(duos.len(), 10);
    assert_eq!(trios.len(), 10);
    assert!(duos.iter().all(|s| s.player_ids.windows(2).all(|w| w[0] < w[1])));
    assert_eq!(trios[0].player_ids, ids(&["a", "b", "c"]));
  }

  #[test]
  fn side_smaller_than_combo_contributes_nothing() {
    let log = vec![game(&["a", "b"], &["c"], 21, 10)];
    assert!(compute_combo_stats_with_min(&log, ComboSize::Trio, 1).is_empty());
    let duos = compute_combo_stats_with_min(&log, ComboSize::Duo, 1);
    assert_eq!(duos.len(), 1);
    assert_eq!(duos[0].player_ids, ids(&["a", "b"]));
  }

  #[test]
  fn combo_size_from_usize() {
    assert_eq!(ComboSize::try_from(2), Ok(ComboSize::Duo));
    assert_eq!(ComboSize::try_from(3), Ok(ComboSize::Trio));
    assert_eq!(ComboSize::try_from(4), Err(Error::InvalidComboSize(4)));
  }

  #[test]
  fn five_straight_wins_hit_the_floor_at_one_hundred_percent() {
    let log: Vec<Game> = (0..5)
      .map(|i| {
        let opponent = format!("y{i}");
        game(&["p1", "p2"], &["x", opponent.as_str()], 21, 10)
      })
      .collect();

    let stats = compute_combo_stats(&log, ComboSize::Duo);
    let duo = find(&stats, &["p1", "p2"]).expect("duo should be reported");
    assert_eq!(duo.games_played, 5);
    assert_eq!(duo.wins, 5);
    assert_eq!(duo.losses, 0);
    assert_eq!(duo.win_percentage, 1.0);
  }

  #[test]
  fn four_games_fall_below_the_floor() {
    let log: Vec<Game> = (0..4).map(|_| game(&["p1", "p2"], &["x", "y"], 21, 10)).collect();
    let stats = compute_combo_stats(&log, ComboSize::Duo);
    assert!(find(&stats, &["p1", "p2"]).is_none());
    assert!(stats.is_empty());
  }

  #[test]
  fn roster_order_does_not_split_a_combo() {
    let log = vec![
      game(&["p2", "p1"], &["x", "y"], 21, 10),
      game(&["p1", "p2"], &["x", "y"], 21, 10),
      game(&["x", "y"], &["p2", "p1"], 21, 10),
      game(&["x", "y"], &["p1", "p2"], 10, 21),
      game(&["p1", "p2"], &["y", "x"], 10, 21),
    ];

    let stats = compute_combo_stats(&log, ComboSize::Duo);
    let duo_entries: Vec<_> = stats
      .iter()
      .filter(|s| s.player_ids.contains(&"p1".into()))
      .collect();
    assert_eq!(duo_entries.len(), 1);
    assert_eq!(duo_entries[0].player_ids, ids(&["p1", "p2"]));
    assert_eq!((duo_entries[0].wins, duo_entries[0].losses), (3, 2));

    let opp = find(&stats, &["x", "y"]).unwrap();
    assert_eq!((opp.wins, opp.losses), (2, 3));
  }

  #[test]
  fn trios_need_three_on_a_side() {
    let log: Vec<Game> = (0..5)
      .map(|_| game(&["a", "b", "c"], &["d", "e"], 21, 19))
      .collect();

    let trios = compute_combo_stats(&log, ComboSize::Trio);
    assert_eq!(trios.len(), 1);
    assert_eq!(trios[0].player_ids, ids(&["a", "b", "c"]));

    let duos = compute_combo_stats(&log, ComboSize::Duo);
    // ab, ac, bc on the winning side plus de on the losing side.
    assert_eq!(duos.len(), 4);
    assert_eq!(duos.last().unwrap().player_ids, ids(&["d", "e"]));
  }

  #[test]
  fn results_are_sorted_by_win_percentage() {
    let mut log = Vec::new();
    for i in 0..6 {
      // a+b win four of six, c+d win the other two.
      let (sa, sb) = if i < 4 { (21, 15) } else { (15, 21) };
      log.push(game(&["a", "b"], &["c", "d"], sa, sb));
    }
    let stats = compute_combo_stats(&log, ComboSize::Duo);
    let order: Vec<_> = stats.iter().map(|s| s.player_ids.clone()).collect();
    assert_eq!(order, vec![ids(&["a", "b"]), ids(&["c", "d"])]);
    assert!((stats[0].win_percentage - 4.0 / 6.0).abs() < 1e-12);
  }

  #[test]
  fn custom_floor_admits_smaller_samples() {
    let log = vec![game(&["a", "b"], &["c", "d"], 21, 15)];
    let stats = compute_combo_stats_with_min(&log, ComboSize::Duo, 1);
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].player_ids, ids(&["a", "b"]));
  }
}
