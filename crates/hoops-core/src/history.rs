//! Per-player game history and career summaries.
//!
//! Rating changes are read from the stored `elo_after` sequence, which is the
//! replay-derived trajectory. The change for a player's first game is
//! measured from [`INITIAL_RATING`].

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
  game::{Game, Participation, Team},
  player::PlayerId,
  rating::INITIAL_RATING,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
  #[serde(rename = "W")]
  Win,
  #[serde(rename = "L")]
  Loss,
}

/// One game from a single player's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerGame {
  pub game_id:        Uuid,
  pub played_on:      NaiveDate,
  pub team:           Team,
  pub result:         GameResult,
  pub team_score:     u32,
  pub opponent_score: u32,
  pub teammates:      Vec<PlayerId>,
  pub opponents:      Vec<PlayerId>,
  pub elo_after:      i64,
  pub elo_change:     i64,
}

/// Build `player`'s history from the game log and their participation rows.
///
/// The result is newest first. A game with no matching participation row is
/// shown with an unchanged rating.
pub fn player_history(
  player: &PlayerId,
  games: &[Game],
  participations: &[Participation],
) -> Vec<PlayerGame> {
  let elo_after: HashMap<Uuid, i64> = participations
    .iter()
    .filter(|p| &p.player_id == player)
    .map(|p| (p.game_id, p.elo_after))
    .collect();

  let mut played: Vec<&Game> = games
    .iter()
    .filter(|g| g.roster.team_of(player).is_some())
    .collect();
  played.sort_by(|a, b| a.chronological_cmp(b));

  let mut previous = INITIAL_RATING;
  let mut history = Vec::with_capacity(played.len());
  for game in played {
    let Some(team) = game.roster.team_of(player) else { continue };

    let after = match elo_after.get(&game.game_id) {
      Some(&r) => r,
      None => {
        warn!(%player, game_id = %game.game_id, "no rating recorded for game");
        previous
      }
    };

    history.push(PlayerGame {
      game_id:        game.game_id,
      played_on:      game.played_on,
      team,
      result:         if game.winner() == team { GameResult::Win } else { GameResult::Loss },
      team_score:     game.score(team),
      opponent_score: game.score(team.other()),
      teammates:      game
        .roster
        .team(team)
        .iter()
        .filter(|p| *p != player)
        .cloned()
        .collect(),
      opponents:      game.roster.team(team.other()).to_vec(),
      elo_after:      after,
      elo_change:     after - previous,
    });
    previous = after;
  }

  history.reverse();
  history
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Running win/loss tally with streaks, fed one result at a time in
/// chronological order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
  pub wins:                u32,
  pub losses:              u32,
  /// Positive for a run of wins ending at the latest game, negative for
  /// losses, zero with no games.
  pub current_streak:      i32,
  pub longest_win_streak:  u32,
  pub longest_loss_streak: u32,
}

impl Record {
  pub fn push(&mut self, result: GameResult) {
    match result {
      GameResult::Win => {
        self.wins += 1;
        self.current_streak = self.current_streak.max(0) + 1;
        self.longest_win_streak = self.longest_win_streak.max(self.current_streak.unsigned_abs());
      }
      GameResult::Loss => {
        self.losses += 1;
        self.current_streak = self.current_streak.min(0) - 1;
        self.longest_loss_streak =
          self.longest_loss_streak.max(self.current_streak.unsigned_abs());
      }
    }
  }

  pub fn games_played(&self) -> u32 { self.wins + self.losses }

  pub fn win_percentage(&self) -> f64 {
    match self.games_played() {
      0 => 0.0,
      n => f64::from(self.wins) / f64::from(n),
    }
  }
}

/// Win/loss records for every player in the log.
pub fn records(games: &[Game]) -> HashMap<PlayerId, Record> {
  let mut ordered: Vec<&Game> = games.iter().collect();
  ordered.sort_by(|a, b| a.chronological_cmp(b));

  let mut records: HashMap<PlayerId, Record> = HashMap::new();
  for game in ordered {
    let winner = game.winner();
    for (team, id) in game.roster.players() {
      let result = if team == winner { GameResult::Win } else { GameResult::Loss };
      records.entry(id.clone()).or_default().push(result);
    }
  }
  records
}

// ─── Career ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CareerSummary {
  pub games_played:        u32,
  pub wins:                u32,
  pub losses:              u32,
  pub win_percentage:      f64,
  pub current_streak:      i32,
  pub longest_win_streak:  u32,
  pub longest_loss_streak: u32,
  pub peak_rating:         i64,
}

/// Summarise a history produced by [`player_history`].
pub fn career_summary(history: &[PlayerGame]) -> CareerSummary {
  let mut record = Record::default();
  let mut peak = INITIAL_RATING;

  // History is newest first.
  for game in history.iter().rev() {
    peak = peak.max(game.elo_after);
    record.push(game.result);
  }

  CareerSummary {
    games_played:        record.games_played(),
    wins:                record.wins,
    losses:              record.losses,
    win_percentage:      record.win_percentage(),
    current_streak:      record.current_streak,
    longest_win_streak:  record.longest_win_streak,
    longest_loss_streak: record.longest_loss_streak,
    peak_rating:         peak,
  }
}
