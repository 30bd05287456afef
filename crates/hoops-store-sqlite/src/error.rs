//! Error type for `hoops-store-sqlite`.

use hoops_core::player::PlayerId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] hoops_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("corrupt row: {0}")]
  Corrupt(String),

  #[error("player already exists: {0}")]
  PlayerExists(PlayerId),

  #[error("unknown players: {}", join_ids(.0))]
  UnknownPlayers(Vec<PlayerId>),

  #[error("game not found: {0}")]
  GameNotFound(uuid::Uuid),
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { Self::Database(e.into()) }
}

fn join_ids(ids: &[PlayerId]) -> String {
  ids.iter().map(PlayerId::as_str).collect::<Vec<_>>().join(", ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
