//! [`SqliteStore`], the SQLite implementation of [`LeagueStore`].

use std::{
  collections::{BTreeMap, HashMap},
  path::Path,
};

use chrono::{NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use hoops_core::{
  game::{Game, NewGame, Participation, Roster, sort_chronologically},
  player::{NewPlayer, Player, PlayerId},
  rating::{self, INITIAL_RATING, ReplaySummary},
  store::LeagueStore,
};

use crate::{
  encode::{
    RawGame, RawParticipation, RawPlayer, decode_team, encode_date, encode_dt, encode_team,
    encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A league store backed by a single SQLite file.
///
/// Clones share the inner connection. All clones
/// share one worker thread, so their writes never interleave.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a fresh in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` against a consistent read snapshot.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          Ok(f(&tx))
        })
        .await??,
    )
  }

  /// Run `f` inside one `BEGIN IMMEDIATE` transaction. Commits only if `f`
  /// succeeds; any error rolls back every statement `f` issued.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
          let out = match f(&tx) {
            Ok(out) => out,
            Err(e) => return Ok(Err(e)),
          };
          tx.commit()?;
          Ok(Ok(out))
        })
        .await??,
    )
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

fn load_player(conn: &rusqlite::Connection, id: &str) -> Result<Option<Player>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM players p WHERE p.player_id = ?1", RawPlayer::COLUMNS),
      rusqlite::params![id],
      RawPlayer::from_row,
    )
    .optional()?;
  raw.map(RawPlayer::into_player).transpose()
}

fn load_players(conn: &rusqlite::Connection) -> Result<Vec<Player>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM players p ORDER BY p.player_id",
    RawPlayer::COLUMNS
  ))?;
  let raws = stmt
    .query_map([], RawPlayer::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawPlayer::into_player).collect()
}

fn load_player_ids(conn: &rusqlite::Connection) -> Result<Vec<PlayerId>> {
  let mut stmt = conn.prepare("SELECT player_id FROM players")?;
  let ids = stmt
    .query_map([], |row| row.get::<_, String>(0))?
    .map(|r| r.map(PlayerId::new))
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(ids)
}

/// Every roster participant that has no `players` row.
fn missing_players(conn: &rusqlite::Connection, roster: &Roster) -> Result<Vec<PlayerId>> {
  let mut stmt = conn.prepare_cached("SELECT 1 FROM players WHERE player_id = ?1")?;
  let mut missing = Vec::new();
  for (_, id) in roster.players() {
    if !stmt.exists(rusqlite::params![id.as_str()])? {
      missing.push(id.clone());
    }
  }
  Ok(missing)
}

fn ensure_players_exist(conn: &rusqlite::Connection, roster: &Roster) -> Result<()> {
  let missing = missing_players(conn, roster)?;
  if missing.is_empty() { Ok(()) } else { Err(Error::UnknownPlayers(missing)) }
}

/// Rosters keyed by encoded game id, optionally restricted to one game.
fn load_rosters(
  conn: &rusqlite::Connection,
  game_id: Option<&str>,
) -> Result<HashMap<String, Roster>> {
  let rows: Vec<(String, String, String)> = if let Some(id) = game_id {
    let mut stmt = conn.prepare(
      "SELECT game_id, player_id, team FROM game_players
       WHERE game_id = ?1 ORDER BY team, position",
    )?;
    stmt
      .query_map(rusqlite::params![id], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
      .collect::<rusqlite::Result<Vec<_>>>()?
  } else {
    let mut stmt = conn.prepare(
      "SELECT game_id, player_id, team FROM game_players
       ORDER BY game_id, team, position",
    )?;
    stmt
      .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  let mut rosters: HashMap<String, Roster> = HashMap::new();
  for (game_id, player_id, team) in rows {
    let team = decode_team(&team)?;
    rosters
      .entry(game_id)
      .or_default()
      .team_mut(team)
      .push(PlayerId::new(player_id));
  }
  Ok(rosters)
}

fn load_game(conn: &rusqlite::Connection, game_id: Uuid) -> Result<Option<Game>> {
  let id_str = encode_uuid(game_id);
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM games WHERE game_id = ?1", RawGame::COLUMNS),
      rusqlite::params![id_str],
      RawGame::from_row,
    )
    .optional()?;
  let Some(raw) = raw else { return Ok(None) };

  let roster = load_rosters(conn, Some(&id_str))?
    .remove(&id_str)
    .unwrap_or_default();
  raw.into_game(roster).map(Some)
}

/// The whole game log with rosters, in replay order.
fn load_games(conn: &rusqlite::Connection) -> Result<Vec<Game>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM games ORDER BY played_on, created_at, game_id",
    RawGame::COLUMNS
  ))?;
  let raws = stmt
    .query_map([], RawGame::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut rosters = load_rosters(conn, None)?;
  let mut games = raws
    .into_iter()
    .map(|raw| {
      let roster = rosters.remove(&raw.game_id).unwrap_or_default();
      raw.into_game(roster)
    })
    .collect::<Result<Vec<_>>>()?;
  sort_chronologically(&mut games);
  Ok(games)
}

fn latest_played_on(conn: &rusqlite::Connection) -> Result<Option<NaiveDate>> {
  let latest: Option<String> =
    conn.query_row("SELECT MAX(played_on) FROM games", [], |r| r.get(0))?;
  latest.as_deref().map(crate::encode::decode_date).transpose()
}

/// Current rating and completed-game count for every participant.
fn prior_state(
  conn: &rusqlite::Connection,
  roster: &Roster,
) -> Result<(HashMap<PlayerId, i64>, HashMap<PlayerId, u32>)> {
  let mut stmt = conn.prepare_cached(
    "SELECT p.rating, (SELECT COUNT(*) FROM game_players gp WHERE gp.player_id = p.player_id)
     FROM players p WHERE p.player_id = ?1",
  )?;

  let mut ratings = HashMap::new();
  let mut games_played = HashMap::new();
  for (_, id) in roster.players() {
    let row: Option<(i64, u32)> = stmt
      .query_row(rusqlite::params![id.as_str()], |r| Ok((r.get(0)?, r.get(1)?)))
      .optional()?;
    if let Some((rating, games)) = row {
      ratings.insert(id.clone(), rating);
      games_played.insert(id.clone(), games);
    }
  }
  Ok((ratings, games_played))
}

// ─── Writes ──────────────────────────────────────────────────────────────────

fn insert_game_row(conn: &rusqlite::Connection, game: &Game) -> Result<()> {
  conn.execute(
    "INSERT INTO games (game_id, played_on, created_at, team_a_score, team_b_score, winner)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      encode_uuid(game.game_id),
      encode_date(game.played_on),
      encode_dt(game.created_at),
      game.team_a_score,
      game.team_b_score,
      encode_team(game.winner()),
    ],
  )?;
  Ok(())
}

fn insert_roster(
  conn: &rusqlite::Connection,
  game: &Game,
  elo_after: impl Fn(&PlayerId) -> i64,
) -> Result<()> {
  let mut stmt = conn.prepare_cached(
    "INSERT INTO game_players (game_id, player_id, team, position, elo_after)
     VALUES (?1, ?2, ?3, ?4, ?5)",
  )?;
  let game_id = encode_uuid(game.game_id);
  for team in [hoops_core::game::Team::A, hoops_core::game::Team::B] {
    for (position, id) in game.roster.team(team).iter().enumerate() {
      stmt.execute(rusqlite::params![
        game_id,
        id.as_str(),
        encode_team(team),
        position as i64,
        elo_after(id),
      ])?;
    }
  }
  Ok(())
}

/// Recompute every rating from the log and overwrite the cached values.
///
/// Runs inside the caller's transaction, so the whole trajectory is written
/// as one batch or not at all.
fn replay_in(conn: &rusqlite::Connection) -> Result<ReplaySummary> {
  let games = load_games(conn)?;
  let known = load_player_ids(conn)?;
  let replay = rating::replay_all(&games, known);

  {
    let mut stmt = conn.prepare_cached(
      "UPDATE game_players SET elo_after = ?1 WHERE game_id = ?2 AND player_id = ?3",
    )?;
    for (game_id, after) in &replay.elo_after {
      let game_id = encode_uuid(*game_id);
      for (player_id, rating) in after {
        stmt.execute(rusqlite::params![rating, game_id, player_id.as_str()])?;
      }
    }
  }

  {
    let mut stmt = conn.prepare_cached(
      "UPDATE players SET rating = ?1, last_played = ?2 WHERE player_id = ?3",
    )?;
    for (player_id, state) in &replay.players {
      stmt.execute(rusqlite::params![
        state.rating,
        state.last_played.map(encode_date),
        player_id.as_str(),
      ])?;
    }
  }

  Ok(replay.summary())
}

/// Rate `game` from the current player rows and store it. Only valid when
/// `game` sorts after every game already in the log.
fn append_game(conn: &rusqlite::Connection, game: &Game) -> Result<()> {
  let (ratings, games_played) = prior_state(conn, &game.roster)?;
  let updates = rating::apply_game(
    &game.roster,
    game.team_a_score,
    game.team_b_score,
    &ratings,
    &games_played,
  );
  let new_ratings: BTreeMap<&PlayerId, i64> =
    updates.iter().map(|(id, u)| (id, u.new_rating)).collect();

  insert_game_row(conn, game)?;
  insert_roster(conn, game, |id| {
    new_ratings.get(id).copied().unwrap_or(INITIAL_RATING)
  })?;

  let mut stmt = conn.prepare_cached(
    "UPDATE players SET rating = ?1, last_played = ?2 WHERE player_id = ?3",
  )?;
  let played_on = encode_date(game.played_on);
  for (id, update) in &updates {
    debug!(player = %id, delta = update.delta, rating = update.new_rating, "applied game");
    stmt.execute(rusqlite::params![update.new_rating, played_on, id.as_str()])?;
  }
  Ok(())
}

// ─── LeagueStore impl ────────────────────────────────────────────────────────

impl LeagueStore for SqliteStore {
  type Error = Error;

  // ── Players ─────────────────────────────────────────────────────────────

  async fn add_player(&self, input: NewPlayer) -> Result<Player> {
    let player = input.into_player(Utc::now())?;
    let row = player.clone();

    self
      .write(move |conn| {
        let taken = conn
          .prepare_cached("SELECT 1 FROM players WHERE player_id = ?1")?
          .exists(rusqlite::params![row.player_id.as_str()])?;
        if taken {
          return Err(Error::PlayerExists(row.player_id));
        }
        conn.execute(
          "INSERT INTO players (player_id, first_name, last_name, rating, last_played, created_at)
           VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
          rusqlite::params![
            row.player_id.as_str(),
            row.first_name,
            row.last_name,
            row.rating,
            encode_dt(row.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    info!(player = %player.player_id, "added player");
    Ok(player)
  }

  async fn get_player(&self, id: PlayerId) -> Result<Option<Player>> {
    self.read(move |conn| load_player(conn, id.as_str())).await
  }

  async fn list_players(&self) -> Result<Vec<Player>> { self.read(load_players).await }

  // ── Games ───────────────────────────────────────────────────────────────

  async fn record_game(&self, input: NewGame) -> Result<Game> {
    input.validate()?;
    let game = input.into_game(Uuid::new_v4(), Utc::now());
    let row = game.clone();

    let replayed = self
      .write(move |conn| {
        ensure_players_exist(conn, &row.roster)?;

        let in_order = latest_played_on(conn)?.is_none_or(|latest| row.played_on >= latest);
        if in_order {
          append_game(conn, &row)?;
          Ok(None)
        } else {
          // Backdated: every later game needs re-rating.
          insert_game_row(conn, &row)?;
          insert_roster(conn, &row, |_| INITIAL_RATING)?;
          replay_in(conn).map(Some)
        }
      })
      .await?;

    match replayed {
      Some(summary) => info!(
        game_id = %game.game_id,
        games = summary.games_replayed,
        "recorded backdated game; replayed ratings"
      ),
      None => info!(game_id = %game.game_id, "recorded game"),
    }
    Ok(game)
  }

  async fn update_game(&self, game_id: Uuid, input: NewGame) -> Result<Game> {
    input.validate()?;

    let (game, summary) = self
      .write(move |conn| {
        let id_str = encode_uuid(game_id);
        let created_at: Option<String> = conn
          .query_row(
            "SELECT created_at FROM games WHERE game_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(created_at) = created_at else {
          return Err(Error::GameNotFound(game_id));
        };
        ensure_players_exist(conn, &input.roster)?;

        let game = input.into_game(game_id, crate::encode::decode_dt(&created_at)?);
        conn.execute(
          "UPDATE games SET played_on = ?1, team_a_score = ?2, team_b_score = ?3, winner = ?4
           WHERE game_id = ?5",
          rusqlite::params![
            encode_date(game.played_on),
            game.team_a_score,
            game.team_b_score,
            encode_team(game.winner()),
            id_str,
          ],
        )?;
        conn.execute(
          "DELETE FROM game_players WHERE game_id = ?1",
          rusqlite::params![id_str],
        )?;
        insert_roster(conn, &game, |_| INITIAL_RATING)?;

        let summary = replay_in(conn)?;
        Ok((game, summary))
      })
      .await?;

    info!(%game_id, games = summary.games_replayed, "updated game; replayed ratings");
    Ok(game)
  }

  async fn delete_game(&self, game_id: Uuid) -> Result<()> {
    let summary = self
      .write(move |conn| {
        let id_str = encode_uuid(game_id);
        conn.execute(
          "DELETE FROM game_players WHERE game_id = ?1",
          rusqlite::params![id_str],
        )?;
        let deleted = conn.execute(
          "DELETE FROM games WHERE game_id = ?1",
          rusqlite::params![id_str],
        )?;
        if deleted == 0 {
          return Err(Error::GameNotFound(game_id));
        }
        replay_in(conn)
      })
      .await?;

    info!(%game_id, games = summary.games_replayed, "deleted game; replayed ratings");
    Ok(())
  }

  async fn get_game(&self, game_id: Uuid) -> Result<Option<Game>> {
    self.read(move |conn| load_game(conn, game_id)).await
  }

  async fn list_games(&self) -> Result<Vec<Game>> { self.read(load_games).await }

  async fn participations(&self, player_id: PlayerId) -> Result<Vec<Participation>> {
    let raws: Vec<RawParticipation> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT gp.game_id, gp.player_id, gp.team, gp.elo_after
           FROM game_players gp
           JOIN games g ON g.game_id = gp.game_id
           WHERE gp.player_id = ?1
           ORDER BY g.played_on, g.created_at, g.game_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![player_id.as_str()], RawParticipation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawParticipation::into_participation)
      .collect()
  }

  // ── Ratings ─────────────────────────────────────────────────────────────

  async fn replay(&self) -> Result<ReplaySummary> {
    let summary = self.write(replay_in).await?;
    info!(
      games = summary.games_replayed,
      skipped = summary.games_skipped,
      players = summary.players_updated,
      "replayed all ratings"
    );
    Ok(summary)
  }
}
