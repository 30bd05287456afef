//! Game records, rosters, and participation rows.
//!
//! The game log is the source of truth. Participation rows carry the rating
//! each player held immediately after the game; they are a cache of the
//! replay computation and can always be rebuilt from the log.

use std::{cmp::Ordering, collections::HashSet, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, player::PlayerId};

/// Largest roster a single team may field.
pub const MAX_TEAM_SIZE: usize = 5;

// ─── Team ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
  A,
  B,
}

impl Team {
  pub fn other(self) -> Self {
    match self {
      Self::A => Self::B,
      Self::B => Self::A,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::A => "A",
      Self::B => "B",
    }
  }
}

impl fmt::Display for Team {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Roster ──────────────────────────────────────────────────────────────────

/// The two sides of a game, each in the order they were entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
  pub team_a: Vec<PlayerId>,
  pub team_b: Vec<PlayerId>,
}

impl Roster {
  pub fn new(team_a: Vec<PlayerId>, team_b: Vec<PlayerId>) -> Self {
    Self { team_a, team_b }
  }

  pub fn team(&self, team: Team) -> &[PlayerId] {
    match team {
      Team::A => &self.team_a,
      Team::B => &self.team_b,
    }
  }

  pub fn team_mut(&mut self, team: Team) -> &mut Vec<PlayerId> {
    match team {
      Team::A => &mut self.team_a,
      Team::B => &mut self.team_b,
    }
  }

  /// Which side `player` was on, if they played.
  pub fn team_of(&self, player: &PlayerId) -> Option<Team> {
    if self.team_a.contains(player) {
      Some(Team::A)
    } else if self.team_b.contains(player) {
      Some(Team::B)
    } else {
      None
    }
  }

  /// Every participant paired with their side, Team A first.
  pub fn players(&self) -> impl Iterator<Item = (Team, &PlayerId)> {
    self
      .team_a
      .iter()
      .map(|p| (Team::A, p))
      .chain(self.team_b.iter().map(|p| (Team::B, p)))
  }

  /// Both sides have at least one player.
  pub fn is_playable(&self) -> bool {
    !self.team_a.is_empty() && !self.team_b.is_empty()
  }

  /// Check team sizes, duplicates within a side, and overlap between sides.
  pub fn validate(&self) -> Result<()> {
    for team in [Team::A, Team::B] {
      let members = self.team(team);
      if members.is_empty() {
        return Err(Error::EmptyTeam(team));
      }
      if members.len() > MAX_TEAM_SIZE {
        return Err(Error::OversizedTeam {
          team,
          size: members.len(),
          max: MAX_TEAM_SIZE,
        });
      }
      let mut seen = HashSet::with_capacity(members.len());
      for p in members {
        if !seen.insert(p) {
          return Err(Error::DuplicatePlayer(p.clone(), team));
        }
      }
    }

    if let Some(p) = self.team_a.iter().find(|p| self.team_b.contains(p)) {
      return Err(Error::PlayerOnBothTeams(p.clone()));
    }
    Ok(())
  }
}

// ─── Game ────────────────────────────────────────────────────────────────────

/// A completed game together with its roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
  pub game_id:      Uuid,
  /// Calendar day the game was played. Several games may share a day.
  pub played_on:    NaiveDate,
  /// Server-assigned; breaks ties between games on the same day.
  pub created_at:   DateTime<Utc>,
  pub team_a_score: u32,
  pub team_b_score: u32,
  pub roster:       Roster,
}

impl Game {
  /// The side with the higher score. Scores are never equal for a validated
  /// game; if they are, Team B is reported.
  pub fn winner(&self) -> Team {
    if self.team_a_score > self.team_b_score { Team::A } else { Team::B }
  }

  pub fn score(&self, team: Team) -> u32 {
    match team {
      Team::A => self.team_a_score,
      Team::B => self.team_b_score,
    }
  }

  /// Replay order: day, then creation time, then id.
  pub fn chronological_cmp(&self, other: &Self) -> Ordering {
    self
      .played_on
      .cmp(&other.played_on)
      .then_with(|| self.created_at.cmp(&other.created_at))
      .then_with(|| self.game_id.cmp(&other.game_id))
  }
}

/// Sort a game log into replay order in place.
pub fn sort_chronologically(games: &mut [Game]) { games.sort_by(Game::chronological_cmp); }

// ─── NewGame ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::LeagueStore::record_game`] and
/// [`crate::store::LeagueStore::update_game`]. The id and `created_at` are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGame {
  pub played_on:    NaiveDate,
  pub roster:       Roster,
  pub team_a_score: u32,
  pub team_b_score: u32,
}

impl NewGame {
  /// Reject tied scores and malformed rosters. The rating engine assumes
  /// every game it sees has passed this check.
  pub fn validate(&self) -> Result<()> {
    if self.team_a_score == self.team_b_score {
      return Err(Error::TiedScore(self.team_a_score));
    }
    self.roster.validate()
  }

  pub fn into_game(self, game_id: Uuid, created_at: DateTime<Utc>) -> Game {
    Game {
      game_id,
      played_on: self.played_on,
      created_at,
      team_a_score: self.team_a_score,
      team_b_score: self.team_b_score,
      roster: self.roster,
    }
  }
}

// ─── Participation ───────────────────────────────────────────────────────────

/// One player's appearance in one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
  pub game_id:   Uuid,
  pub player_id: PlayerId,
  pub team:      Team,
  /// Rating immediately after this game was applied.
  pub elo_after: i64,
}
