//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Calendar days are stored as `YYYY-MM-DD`, timestamps as RFC 3339 strings,
//! UUIDs as hyphenated lowercase strings, and sides as `A` / `B`.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use hoops_core::{
  game::{Game, Participation, Roster, Team},
  player::{Player, PlayerId},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Dates ───────────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

/// Fixed-width UTC form, so text order matches time order.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Team ────────────────────────────────────────────────────────────────────

pub fn encode_team(t: Team) -> &'static str { t.as_str() }

pub fn decode_team(s: &str) -> Result<Team> {
  match s {
    "A" => Ok(Team::A),
    "B" => Ok(Team::B),
    other => Err(Error::Corrupt(format!("unknown team: {other:?}"))),
  }
}

// ─── Scores ──────────────────────────────────────────────────────────────────

pub fn decode_score(v: i64) -> Result<u32> {
  u32::try_from(v).map_err(|_| Error::Corrupt(format!("score out of range: {v}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `players` row plus its participation count.
pub struct RawPlayer {
  pub player_id:    String,
  pub first_name:   String,
  pub last_name:    String,
  pub rating:       i64,
  pub games_played: i64,
  pub last_played:  Option<String>,
  pub created_at:   String,
}

impl RawPlayer {
  /// Column list matching [`RawPlayer::from_row`].
  pub const COLUMNS: &'static str = "p.player_id, p.first_name, p.last_name, p.rating,
     (SELECT COUNT(*) FROM game_players gp WHERE gp.player_id = p.player_id),
     p.last_played, p.created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      player_id:    row.get(0)?,
      first_name:   row.get(1)?,
      last_name:    row.get(2)?,
      rating:       row.get(3)?,
      games_played: row.get(4)?,
      last_played:  row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_player(self) -> Result<Player> {
    Ok(Player {
      player_id:    PlayerId::new(self.player_id),
      first_name:   self.first_name,
      last_name:    self.last_name,
      rating:       self.rating,
      games_played: u32::try_from(self.games_played)
        .map_err(|_| Error::Corrupt(format!("games played: {}", self.games_played)))?,
      last_played:  self.last_played.as_deref().map(decode_date).transpose()?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from a `games` row; the roster is attached separately.
pub struct RawGame {
  pub game_id:      String,
  pub played_on:    String,
  pub created_at:   String,
  pub team_a_score: i64,
  pub team_b_score: i64,
}

impl RawGame {
  pub const COLUMNS: &'static str = "game_id, played_on, created_at, team_a_score, team_b_score";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      game_id:      row.get(0)?,
      played_on:    row.get(1)?,
      created_at:   row.get(2)?,
      team_a_score: row.get(3)?,
      team_b_score: row.get(4)?,
    })
  }

  pub fn into_game(self, roster: Roster) -> Result<Game> {
    Ok(Game {
      game_id:      decode_uuid(&self.game_id)?,
      played_on:    decode_date(&self.played_on)?,
      created_at:   decode_dt(&self.created_at)?,
      team_a_score: decode_score(self.team_a_score)?,
      team_b_score: decode_score(self.team_b_score)?,
      roster,
    })
  }
}

/// Raw values read from a `game_players` row.
pub struct RawParticipation {
  pub game_id:   String,
  pub player_id: String,
  pub team:      String,
  pub elo_after: i64,
}

impl RawParticipation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      game_id:   row.get(0)?,
      player_id: row.get(1)?,
      team:      row.get(2)?,
      elo_after: row.get(3)?,
    })
  }

  pub fn into_participation(self) -> Result<Participation> {
    Ok(Participation {
      game_id:   decode_uuid(&self.game_id)?,
      player_id: PlayerId::new(self.player_id),
      team:      decode_team(&self.team)?,
      elo_after: self.elo_after,
    })
  }
}
