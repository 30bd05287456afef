//! Error types for `hoops-core`.

use thiserror::Error;

use crate::{game::Team, player::PlayerId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("game cannot end in a tie ({0}-{0})")]
  TiedScore(u32),

  #[error("team {0} has no players")]
  EmptyTeam(Team),

  #[error("team {team} has {size} players; at most {max} are allowed")]
  OversizedTeam { team: Team, size: usize, max: usize },

  #[error("player {0} cannot be on both teams")]
  PlayerOnBothTeams(PlayerId),

  #[error("player {0} is listed more than once on team {1}")]
  DuplicatePlayer(PlayerId, Team),

  #[error("combo size must be 2 or 3, got {0}")]
  InvalidComboSize(usize),

  #[error("cannot derive a player id from name {0:?}")]
  InvalidPlayerName(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
