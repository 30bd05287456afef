//! The rating engine: team-averaged Elo with margin-of-victory scaling and a
//! placement period.
//!
//! Two entry points share one update rule:
//!
//! - [`apply_game`] rates a single game from explicit prior ratings and prior
//!   games-played counts.
//! - [`replay_all`] rebuilds every rating from [`INITIAL_RATING`] by applying
//!   the whole game log in chronological order.
//!
//! Both are pure. State lives in [`RatingState`], which callers own and pass
//! around; nothing here is global.
//!
//! Ratings are integers. Each per-player delta is rounded (half away from
//! zero) before it is added, so a replay reproduces stored values exactly.
//!
//! Games are expected to have passed [`crate::game::NewGame::validate`].
//! Overlapping rosters or duplicate players are a precondition violation:
//! the output for such a game is whatever the last write for that player was
//! and carries no meaning.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  game::{Game, Roster, Team},
  player::PlayerId,
};

// ─── Policy ──────────────────────────────────────────────────────────────────

pub const INITIAL_RATING: i64 = 1000;
pub const K_BASE: f64 = 20.0;
pub const K_PLACEMENT: f64 = 40.0;
/// Number of games a player spends in placement.
pub const PLACEMENT_GAMES: u32 = 5;
/// Games where the larger side has at most this many players get
/// [`SMALL_TEAM_MULTIPLIER`].
pub const SMALL_TEAM_MAX: usize = 4;
pub const SMALL_TEAM_MULTIPLIER: f64 = 1.1;

// ─── Formula pieces ──────────────────────────────────────────────────────────

/// Mean pre-game rating of a side. Players missing from `rating_of` count as
/// [`INITIAL_RATING`].
pub fn team_rating(team: &[PlayerId], rating_of: impl Fn(&PlayerId) -> Option<i64>) -> f64 {
  if team.is_empty() {
    return INITIAL_RATING as f64;
  }
  let sum: i64 = team
    .iter()
    .map(|p| rating_of(p).unwrap_or(INITIAL_RATING))
    .sum();
  sum as f64 / team.len() as f64
}

/// Logistic Elo expectation of a side rated `rating` against `opponent`.
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
  1.0 / (1.0 + 10f64.powf((opponent - rating) / 400.0))
}

/// `ln(|a - b| + 1)`; a one-point game yields `ln 2`.
pub fn mov_multiplier(team_a_score: u32, team_b_score: u32) -> f64 {
  (team_a_score.abs_diff(team_b_score) as f64 + 1.0).ln()
}

/// Keys off the larger of the two sides.
pub fn team_size_multiplier(team_a_len: usize, team_b_len: usize) -> f64 {
  if team_a_len.max(team_b_len) <= SMALL_TEAM_MAX {
    SMALL_TEAM_MULTIPLIER
  } else {
    1.0
  }
}

/// K-factor from the number of games completed *before* this one.
pub fn k_factor(prior_games: u32) -> f64 {
  if prior_games < PLACEMENT_GAMES { K_PLACEMENT } else { K_BASE }
}

/// Rounded rating change for one player. The product is evaluated left to
/// right in this exact order; reordering it can move a result across a
/// rounding boundary.
pub fn rating_delta(k: f64, mov: f64, team_size: f64, actual: f64, expected: f64) -> i64 {
  (k * mov * team_size * (actual - expected)).round() as i64
}

// ─── Single game ─────────────────────────────────────────────────────────────

/// The outcome of one game for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingUpdate {
  pub team:         Team,
  pub prior_rating: i64,
  pub new_rating:   i64,
  pub delta:        i64,
}

/// Multipliers shared by every participant of one game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameFactors {
  pub expected_a: f64,
  pub expected_b: f64,
  pub mov:        f64,
  pub team_size:  f64,
  pub winner:     Team,
}

impl GameFactors {
  pub fn compute(
    roster: &Roster,
    team_a_score: u32,
    team_b_score: u32,
    rating_of: impl Fn(&PlayerId) -> Option<i64>,
  ) -> Self {
    let team_a = team_rating(&roster.team_a, &rating_of);
    let team_b = team_rating(&roster.team_b, &rating_of);
    let expected_a = expected_score(team_a, team_b);

    Self {
      expected_a,
      expected_b: 1.0 - expected_a,
      mov: mov_multiplier(team_a_score, team_b_score),
      team_size: team_size_multiplier(roster.team_a.len(), roster.team_b.len()),
      winner: if team_a_score > team_b_score { Team::A } else { Team::B },
    }
  }

  pub fn expected(&self, team: Team) -> f64 {
    match team {
      Team::A => self.expected_a,
      Team::B => self.expected_b,
    }
  }

  pub fn actual(&self, team: Team) -> f64 {
    if team == self.winner { 1.0 } else { 0.0 }
  }

  pub fn delta(&self, team: Team, prior_games: u32) -> i64 {
    rating_delta(
      k_factor(prior_games),
      self.mov,
      self.team_size,
      self.actual(team),
      self.expected(team),
    )
  }
}

fn rate_game(
  roster: &Roster,
  team_a_score: u32,
  team_b_score: u32,
  prior: impl Fn(&PlayerId) -> (Option<i64>, u32),
) -> BTreeMap<PlayerId, RatingUpdate> {
  let factors =
    GameFactors::compute(roster, team_a_score, team_b_score, |p| prior(p).0);

  roster
    .players()
    .map(|(team, id)| {
      let (rating, games) = prior(id);
      let prior_rating = rating.unwrap_or(INITIAL_RATING);
      let delta = factors.delta(team, games);
      (id.clone(), RatingUpdate {
        team,
        prior_rating,
        new_rating: prior_rating + delta,
        delta,
      })
    })
    .collect()
}

/// Rate one game. Players absent from either map start at
/// [`INITIAL_RATING`] with no prior games.
pub fn apply_game(
  roster: &Roster,
  team_a_score: u32,
  team_b_score: u32,
  prior_ratings: &HashMap<PlayerId, i64>,
  prior_games_played: &HashMap<PlayerId, u32>,
) -> BTreeMap<PlayerId, RatingUpdate> {
  rate_game(roster, team_a_score, team_b_score, |p| {
    (
      prior_ratings.get(p).copied(),
      prior_games_played.get(p).copied().unwrap_or(0),
    )
  })
}

// ─── Rating state ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRating {
  pub rating:       i64,
  pub games_played: u32,
  pub last_played:  Option<NaiveDate>,
}

impl Default for PlayerRating {
  fn default() -> Self {
    Self { rating: INITIAL_RATING, games_played: 0, last_played: None }
  }
}

/// In-memory rating state for every player seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingState {
  players: BTreeMap<PlayerId, PlayerRating>,
}

impl RatingState {
  /// Fresh state with every known player at the initial rating.
  pub fn new(known_players: impl IntoIterator<Item = PlayerId>) -> Self {
    Self {
      players: known_players
        .into_iter()
        .map(|p| (p, PlayerRating::default()))
        .collect(),
    }
  }

  pub fn get(&self, player: &PlayerId) -> PlayerRating {
    self.players.get(player).copied().unwrap_or_default()
  }

  /// Apply one game and advance every participant. Returns `None`, leaving
  /// the state untouched, when either side is empty.
  pub fn apply(&mut self, game: &Game) -> Option<BTreeMap<PlayerId, RatingUpdate>> {
    if !game.roster.is_playable() {
      return None;
    }

    let updates = rate_game(&game.roster, game.team_a_score, game.team_b_score, |p| {
      let s = self.get(p);
      (Some(s.rating), s.games_played)
    });

    for (id, update) in &updates {
      let entry = self.players.entry(id.clone()).or_default();
      entry.rating = update.new_rating;
      entry.games_played += 1;
      entry.last_played = Some(
        entry
          .last_played
          .map_or(game.played_on, |d| d.max(game.played_on)),
      );
    }

    Some(updates)
  }

  pub fn players(&self) -> &BTreeMap<PlayerId, PlayerRating> { &self.players }

  pub fn into_players(self) -> BTreeMap<PlayerId, PlayerRating> { self.players }
}

// ─── Replay ──────────────────────────────────────────────────────────────────

/// The complete result of replaying a game log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replay {
  /// Per game, per participant: the rating right after that game.
  pub elo_after: BTreeMap<Uuid, BTreeMap<PlayerId, i64>>,
  /// Final state for every known player and every participant.
  pub players:   BTreeMap<PlayerId, PlayerRating>,
  /// Games skipped because one side was empty.
  pub skipped:   Vec<Uuid>,
}

impl Replay {
  pub fn summary(&self) -> ReplaySummary {
    ReplaySummary {
      games_replayed:  self
        .elo_after
        .keys()
        .filter(|id| !self.skipped.contains(id))
        .count(),
      games_skipped:   self.skipped.len(),
      players_updated: self.players.len(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
  pub games_replayed:  usize,
  pub games_skipped:   usize,
  pub players_updated: usize,
}

/// Rebuild every rating from scratch.
///
/// The log is sorted by (day, creation time, id) before replay, so input
/// order does not matter. A skipped game still records each participant's
/// unchanged rating in [`Replay::elo_after`] so its cached rows stay in
/// sequence.
pub fn replay_all<'a>(
  games: impl IntoIterator<Item = &'a Game>,
  known_players: impl IntoIterator<Item = PlayerId>,
) -> Replay {
  let mut ordered: Vec<&Game> = games.into_iter().collect();
  ordered.sort_by(|a, b| a.chronological_cmp(b));

  let mut state = RatingState::new(known_players);
  let mut replay = Replay::default();

  for game in ordered {
    let after = match state.apply(game) {
      Some(updates) => {
        debug!(game_id = %game.game_id, players = updates.len(), "replayed game");
        updates
          .into_iter()
          .map(|(id, u)| (id, u.new_rating))
          .collect()
      }
      None => {
        warn!(game_id = %game.game_id, "skipping game with an empty team");
        replay.skipped.push(game.game_id);
        game
          .roster
          .players()
          .map(|(_, id)| (id.clone(), state.get(id).rating))
          .collect()
      }
    };
    replay.elo_after.insert(game.game_id, after);
  }

  replay.players = state.into_players();
  info!(
    games = replay.elo_after.len(),
    skipped = replay.skipped.len(),
    players = replay.players.len(),
    "replay complete"
  );
  replay
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, Duration, Utc};

  use super::*;
  use crate::game::NewGame;

  fn ids(names: &[&str]) -> Vec<PlayerId> { names.iter().map(|n| PlayerId::from(*n)).collect() }

  fn roster(a: &[&str], b: &[&str]) -> Roster { Roster::new(ids(a), ids(b)) }

  fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T12:00:00Z")
      .unwrap()
      .with_timezone(&Utc)
  }

  /// Game `n` of a log: day `n`, created `n` seconds after the base time.
  fn game(n: u32, a: &[&str], b: &[&str], sa: u32, sb: u32) -> Game {
    NewGame {
      played_on:    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + Duration::days(n as i64),
      roster:       roster(a, b),
      team_a_score: sa,
      team_b_score: sb,
    }
    .into_game(
      Uuid::from_u128(n as u128 + 1),
      base_time() + Duration::seconds(n as i64),
    )
  }

  // ── Formula ─────────────────────────────────────────────────────────────

  #[test]
  fn expectations_sum_to_one() {
    for (a, b) in [(1000.0, 1000.0), (1200.0, 950.5), (800.0, 1400.0)] {
      let ea = expected_score(a, b);
      let eb = expected_score(b, a);
      assert!((ea + eb - 1.0).abs() < 1e-12, "{a} vs {b}: {ea} + {eb}");
    }
    let f = GameFactors::compute(&roster(&["a"], &["b"]), 21, 3, |p| {
      Some(if p.as_str() == "a" { 1100 } else { 900 })
    });
    assert!((f.expected_a + f.expected_b - 1.0).abs() < 1e-12);
  }

  #[test]
  fn equal_teams_expect_half() {
    assert_eq!(expected_score(1000.0, 1000.0), 0.5);
  }

  #[test]
  fn margin_of_victory_is_log_scaled() {
    assert!((mov_multiplier(21, 20) - 2f64.ln()).abs() < 1e-12);
    assert!((mov_multiplier(0, 21) - 3.091_042_453_358_316).abs() < 1e-12);
  }

  #[test]
  fn team_size_multiplier_keys_off_larger_team() {
    assert_eq!(team_size_multiplier(4, 4), 1.1);
    assert_eq!(team_size_multiplier(5, 5), 1.0);
    assert_eq!(team_size_multiplier(4, 5), 1.0);
    assert_eq!(team_size_multiplier(1, 1), 1.1);
  }

  #[test]
  fn placement_boundary() {
    assert_eq!(k_factor(0), K_PLACEMENT);
    assert_eq!(k_factor(4), K_PLACEMENT);
    assert_eq!(k_factor(5), K_BASE);
    assert_eq!(k_factor(40), K_BASE);
  }

  #[test]
  fn rounding_is_half_away_from_zero() {
    assert_eq!(rating_delta(1.0, 1.0, 1.0, 2.5, 0.0), 3);
    assert_eq!(rating_delta(1.0, 1.0, 1.0, 0.0, 2.5), -3);
  }

  // ── Single game ─────────────────────────────────────────────────────────

  #[test]
  fn one_on_one_blowout_golden_value() {
    // round(40 * ln(22) * 1.1 * 0.5) = round(68.0029) = 68
    let updates = apply_game(
      &roster(&["a"], &["b"]),
      21,
      0,
      &HashMap::new(),
      &HashMap::new(),
    );
    let a = updates[&PlayerId::from("a")];
    let b = updates[&PlayerId::from("b")];
    assert_eq!(a.delta, 68);
    assert_eq!(a.new_rating, 1068);
    assert_eq!(a.team, Team::A);
    assert_eq!(b.delta, -68);
    assert_eq!(b.new_rating, 932);
    assert_eq!(b.team, Team::B);
  }

  #[test]
  fn k_factor_is_per_player_not_per_team() {
    let r = roster(&["rookie", "vet"], &["c", "d"]);
    let games: HashMap<_, _> = [(PlayerId::from("vet"), 12)].into();
    let updates = apply_game(&r, 21, 11, &HashMap::new(), &games);

    let rookie = updates[&PlayerId::from("rookie")];
    let vet = updates[&PlayerId::from("vet")];
    // round(40 * ln 11 * 1.1 * 0.5) = 53, round(20 * ln 11 * 1.1 * 0.5) = 26
    assert_eq!(rookie.delta, 53);
    assert_eq!(vet.delta, 26);
  }

  #[test]
  fn fifth_game_is_placement_sixth_is_not() {
    let r = roster(&["p"], &["q"]);
    let fifth: HashMap<_, _> = [(PlayerId::from("p"), 4)].into();
    let sixth: HashMap<_, _> = [(PlayerId::from("p"), 5)].into();
    let with_fifth = apply_game(&r, 21, 0, &HashMap::new(), &fifth);
    let with_sixth = apply_game(&r, 21, 0, &HashMap::new(), &sixth);
    assert_eq!(with_fifth[&PlayerId::from("p")].delta, 68);
    // round(20 * ln 22 * 1.1 * 0.5) = round(34.0015) = 34
    assert_eq!(with_sixth[&PlayerId::from("p")].delta, 34);
  }

  #[test]
  fn team_rating_is_the_mean_and_defaults_missing_players() {
    let ratings: HashMap<_, _> = [(PlayerId::from("a"), 1100)].into();
    let avg = team_rating(&ids(&["a", "new"]), |p| ratings.get(p).copied());
    assert_eq!(avg, 1050.0);
  }

  #[test]
  fn underdog_gains_more_than_favourite() {
    let ratings: HashMap<_, _> =
      [(PlayerId::from("fav"), 1200), (PlayerId::from("dog"), 1000)].into();
    let games: HashMap<_, _> =
      [(PlayerId::from("fav"), 10), (PlayerId::from("dog"), 10)].into();
    let r = roster(&["fav"], &["dog"]);

    let fav_wins = apply_game(&r, 21, 20, &ratings, &games);
    let dog_wins = apply_game(&r, 20, 21, &ratings, &games);
    assert!(
      dog_wins[&PlayerId::from("dog")].delta > fav_wins[&PlayerId::from("fav")].delta
    );
  }

  // ── Replay ──────────────────────────────────────────────────────────────

  fn sample_log() -> Vec<Game> {
    vec![
      game(0, &["a", "b"], &["c", "d"], 21, 15),
      game(1, &["a", "c"], &["b", "d"], 18, 21),
      game(2, &["a", "d"], &["b", "c"], 21, 2),
      game(3, &["a", "b", "c"], &["d", "e"], 11, 9),
      game(4, &["a", "e"], &["b", "c", "d"], 21, 19),
      game(5, &["a", "b"], &["c", "e"], 7, 21),
      game(6, &["a", "c", "e"], &["b", "d"], 21, 20),
    ]
  }

  #[test]
  fn replay_matches_incremental_application() {
    let log = sample_log();

    let mut ratings: HashMap<PlayerId, i64> = HashMap::new();
    let mut games: HashMap<PlayerId, u32> = HashMap::new();
    let mut expected: BTreeMap<Uuid, BTreeMap<PlayerId, i64>> = BTreeMap::new();
    for g in &log {
      let updates = apply_game(&g.roster, g.team_a_score, g.team_b_score, &ratings, &games);
      let mut after = BTreeMap::new();
      for (id, u) in updates {
        ratings.insert(id.clone(), u.new_rating);
        *games.entry(id.clone()).or_default() += 1;
        after.insert(id, u.new_rating);
      }
      expected.insert(g.game_id, after);
    }

    let replay = replay_all(&log, ids(&["a", "b", "c", "d", "e"]));
    assert_eq!(replay.elo_after, expected);
    for (id, rating) in ratings {
      assert_eq!(replay.players[&id].rating, rating);
    }
    assert_eq!(replay.players[&PlayerId::from("a")].games_played, 7);
  }

  #[test]
  fn replay_is_idempotent() {
    let log = sample_log();
    let first = replay_all(&log, ids(&["a", "b", "c", "d", "e"]));
    let second = replay_all(&log, ids(&["a", "b", "c", "d", "e"]));
    assert_eq!(first, second);
  }

  #[test]
  fn replay_sorts_instead_of_trusting_input_order() {
    let log = sample_log();
    let mut shuffled = log.clone();
    shuffled.reverse();
    shuffled.swap(1, 4);

    let known = ids(&["a", "b", "c", "d", "e"]);
    assert_eq!(replay_all(&log, known.clone()), replay_all(&shuffled, known));
  }

  #[test]
  fn same_day_games_order_by_creation_time() {
    let mut first = game(0, &["a"], &["b"], 21, 0);
    let mut second = game(1, &["b"], &["a"], 21, 0);
    second.played_on = first.played_on;
    // Created later but listed first.
    first.created_at = base_time();
    second.created_at = base_time() + Duration::minutes(1);

    let replay = replay_all([&second, &first], Vec::new());
    // a wins first (+68), then b wins from 932 against 1068.
    assert_eq!(replay.elo_after[&first.game_id][&PlayerId::from("a")], 1068);
    assert!(replay.elo_after[&second.game_id][&PlayerId::from("b")] > 932);
  }

  #[test]
  fn empty_team_game_is_skipped() {
    let good = game(0, &["a"], &["b"], 21, 0);
    let broken = game(1, &["a"], &[], 21, 0);
    let replay = replay_all([&good, &broken], ids(&["a", "b"]));

    assert_eq!(replay.skipped, vec![broken.game_id]);
    assert_eq!(replay.elo_after[&broken.game_id][&PlayerId::from("a")], 1068);
    assert_eq!(replay.players[&PlayerId::from("a")].games_played, 1);
    assert_eq!(replay.summary().games_replayed, 1);
  }

  #[test]
  fn repeated_skipped_game_does_not_break_the_summary() {
    let broken = game(0, &["a"], &[], 21, 0);
    let summary = replay_all([&broken, &broken], Vec::new()).summary();
    assert_eq!(summary.games_replayed, 0);
    assert_eq!(summary.games_skipped, 2);
  }

  #[test]
  fn idle_players_stay_at_initial_rating() {
    let replay = replay_all(&[game(0, &["a"], &["b"], 21, 0)], ids(&["a", "b", "idle"]));
    assert_eq!(replay.players[&PlayerId::from("idle")], PlayerRating::default());
  }

  #[test]
  fn last_played_tracks_latest_game_day() {
    let log = sample_log();
    let replay = replay_all(&log, Vec::new());
    assert_eq!(
      replay.players[&PlayerId::from("e")].last_played,
      Some(log[6].played_on)
    );
    assert_eq!(
      replay.players[&PlayerId::from("d")].last_played,
      Some(log[6].played_on)
    );
  }
}
