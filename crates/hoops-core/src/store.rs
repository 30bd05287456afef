//! The `LeagueStore` trait.
//!
//! Implemented by storage backends (e.g. `hoops-store-sqlite`). The CLI and
//! any other front end depend on this abstraction, not on a concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  game::{Game, NewGame, Participation},
  player::{NewPlayer, Player, PlayerId},
  rating::ReplaySummary,
};

/// Abstraction over a league store backend.
///
/// The game log is the source of truth; player ratings and participation
/// `elo_after` values are a cache of the rating engine's output. Every write
/// that touches the log must leave that cache exactly as
/// [`crate::rating::replay_all`] would produce it, and must do so atomically:
/// either the game and all derived rows change together or nothing does.
///
/// Implementations must serialize replays against each other and against
/// game writes.
pub trait LeagueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Players ─────────────────────────────────────────────────────────────

  /// Create a player at the initial rating. Fails if the derived id is
  /// already taken.
  fn add_player(
    &self,
    input: NewPlayer,
  ) -> impl Future<Output = Result<Player, Self::Error>> + Send + '_;

  /// Retrieve a player by id. Returns `None` if not found.
  fn get_player(
    &self,
    id: PlayerId,
  ) -> impl Future<Output = Result<Option<Player>, Self::Error>> + Send + '_;

  fn list_players(&self) -> impl Future<Output = Result<Vec<Player>, Self::Error>> + Send + '_;

  // ── Games ───────────────────────────────────────────────────────────────

  /// Validate and record a new game, rating it in the same write.
  fn record_game(
    &self,
    input: NewGame,
  ) -> impl Future<Output = Result<Game, Self::Error>> + Send + '_;

  /// Replace the details of an existing game and replay every rating.
  fn update_game(
    &self,
    game_id: Uuid,
    input: NewGame,
  ) -> impl Future<Output = Result<Game, Self::Error>> + Send + '_;

  /// Remove a game and replay every rating.
  fn delete_game(&self, game_id: Uuid) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_game(
    &self,
    game_id: Uuid,
  ) -> impl Future<Output = Result<Option<Game>, Self::Error>> + Send + '_;

  /// The full game log in chronological order.
  fn list_games(&self) -> impl Future<Output = Result<Vec<Game>, Self::Error>> + Send + '_;

  /// All of a player's participation rows in chronological order.
  fn participations(
    &self,
    player_id: PlayerId,
  ) -> impl Future<Output = Result<Vec<Participation>, Self::Error>> + Send + '_;

  // ── Ratings ─────────────────────────────────────────────────────────────

  /// Recompute every rating from the game log and persist the result.
  fn replay(&self) -> impl Future<Output = Result<ReplaySummary, Self::Error>> + Send + '_;
}
