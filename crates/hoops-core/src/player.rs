//! Players and the league ranking table.
//!
//! A player's identifier is a slug derived from their name at creation and
//! never changes afterwards. The rating is owned by the rating engine; nothing
//! else writes it.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, history::Record, rating::INITIAL_RATING};

// ─── PlayerId ────────────────────────────────────────────────────────────────

/// Stable player identifier, e.g. `jordan-wells`.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  /// Derive the slug for a first/last name pair.
  ///
  /// Lowercases both parts, joins them with `-`, collapses every run of
  /// characters outside `[a-z0-9]` into a single `-` and trims leading and
  /// trailing dashes.
  pub fn from_name(first_name: &str, last_name: &str) -> Result<Self> {
    let raw = format!("{}-{}", first_name.trim(), last_name.trim()).to_lowercase();

    let mut slug = String::with_capacity(raw.len());
    for c in raw.chars() {
      if c.is_ascii_lowercase() || c.is_ascii_digit() {
        slug.push(c);
      } else if !slug.ends_with('-') {
        slug.push('-');
      }
    }
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
      return Err(Error::InvalidPlayerName(format!("{first_name} {last_name}")));
    }
    Ok(Self(slug.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PlayerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for PlayerId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

// ─── Player ──────────────────────────────────────────────────────────────────

/// A rostered league member with their current rating state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
  pub player_id:    PlayerId,
  pub first_name:   String,
  pub last_name:    String,
  pub rating:       i64,
  /// Derived from the participation rows; only used for placement.
  pub games_played: u32,
  pub last_played:  Option<NaiveDate>,
  pub created_at:   DateTime<Utc>,
}

impl Player {
  pub fn display_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }
}

/// Input to [`crate::store::LeagueStore::add_player`].
#[derive(Debug, Clone)]
pub struct NewPlayer {
  pub first_name: String,
  pub last_name:  String,
}

impl NewPlayer {
  pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
    Self { first_name: first_name.into(), last_name: last_name.into() }
  }

  pub fn player_id(&self) -> Result<PlayerId> {
    PlayerId::from_name(&self.first_name, &self.last_name)
  }

  /// The player as they exist before their first game.
  pub fn into_player(self, created_at: DateTime<Utc>) -> Result<Player> {
    let player_id = self.player_id()?;
    Ok(Player {
      player_id,
      first_name: self.first_name.trim().to_owned(),
      last_name: self.last_name.trim().to_owned(),
      rating: INITIAL_RATING,
      games_played: 0,
      last_played: None,
      created_at,
    })
  }
}

// ─── Rankings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RankedPlayer {
  /// 1-based position in the ranking table.
  pub rank:           usize,
  pub player:         Player,
  pub wins:           u32,
  pub losses:         u32,
  pub win_percentage: f64,
  /// Positive for consecutive wins, negative for consecutive losses.
  pub current_streak: i32,
}

/// Order players by rating, highest first. Equal ratings fall back to id
/// order so the table is stable between calls.
///
/// Players missing from `records` are shown with an empty record.
pub fn rankings(
  players: impl IntoIterator<Item = Player>,
  records: &HashMap<PlayerId, Record>,
) -> Vec<RankedPlayer> {
  let mut players: Vec<Player> = players.into_iter().collect();
  players.sort_by(|a, b| {
    b.rating
      .cmp(&a.rating)
      .then_with(|| a.player_id.cmp(&b.player_id))
  });
  players
    .into_iter()
    .enumerate()
    .map(|(i, player)| {
      let record = records.get(&player.player_id).copied().unwrap_or_default();
      RankedPlayer {
        rank: i + 1,
        player,
        wins: record.wins,
        losses: record.losses,
        win_percentage: record.win_percentage(),
        current_streak: record.current_streak,
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::history::GameResult;

  #[test]
  fn slug_from_name() {
    let id = PlayerId::from_name("Jordan", "Wells").unwrap();
    assert_eq!(id.as_str(), "jordan-wells");
  }

  #[test]
  fn slug_collapses_punctuation_and_whitespace() {
    let id = PlayerId::from_name("  Mary Ann ", "O'Neil-Smith").unwrap();
    assert_eq!(id.as_str(), "mary-ann-o-neil-smith");
  }

  #[test]
  fn slug_rejects_names_without_alphanumerics() {
    assert!(matches!(
      PlayerId::from_name("!!", "  "),
      Err(Error::InvalidPlayerName(_))
    ));
  }

  #[test]
  fn new_player_starts_at_initial_rating() {
    let p = NewPlayer::new("Sarah", "Chen").into_player(Utc::now()).unwrap();
    assert_eq!(p.player_id.as_str(), "sarah-chen");
    assert_eq!(p.rating, INITIAL_RATING);
    assert_eq!(p.games_played, 0);
    assert!(p.last_played.is_none());
  }

  fn player(id: &str, rating: i64) -> Player {
    Player {
      player_id:    id.into(),
      first_name:   id.into(),
      last_name:    String::new(),
      rating,
      games_played: 0,
      last_played:  None,
      created_at:   Utc::now(),
    }
  }

  #[test]
  fn rankings_sort_by_rating_then_id() {
    let ranked = rankings(
      vec![player("cat", 990), player("bob", 1040), player("amy", 1040)],
      &HashMap::new(),
    );
    let order: Vec<_> = ranked
      .iter()
      .map(|r| (r.rank, r.player.player_id.as_str()))
      .collect();
    assert_eq!(order, vec![(1, "amy"), (2, "bob"), (3, "cat")]);
    assert!(ranked.iter().all(|r| r.wins == 0 && r.losses == 0 && r.current_streak == 0));
    assert!(ranked.iter().all(|r| r.win_percentage == 0.0));
  }

  #[test]
  fn rankings_carry_each_players_record() {
    let mut amy = Record::default();
    for result in [GameResult::Loss, GameResult::Win, GameResult::Win] {
      amy.push(result);
    }
    let records = HashMap::from([(PlayerId::from("amy"), amy)]);

    let ranked = rankings(vec![player("amy", 1010), player("bob", 1000)], &records);
    assert_eq!((ranked[0].wins, ranked[0].losses), (2, 1));
    assert!((ranked[0].win_percentage - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(ranked[0].current_streak, 2);
    assert_eq!((ranked[1].wins, ranked[1].losses), (0, 0));
  }
}
