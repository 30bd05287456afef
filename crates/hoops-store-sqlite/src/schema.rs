//! SQL schema for the hoops SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- rating and last_played are written only by the rating engine.
CREATE TABLE IF NOT EXISTS players (
    player_id   TEXT PRIMARY KEY,   -- slug of first-last name; immutable
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    rating      INTEGER NOT NULL DEFAULT 1000,
    last_played TEXT,               -- YYYY-MM-DD or NULL
    created_at  TEXT NOT NULL       -- RFC 3339 UTC
);

-- The game log: source of truth for every rating.
CREATE TABLE IF NOT EXISTS games (
    game_id      TEXT PRIMARY KEY,
    played_on    TEXT NOT NULL,      -- YYYY-MM-DD
    created_at   TEXT NOT NULL,      -- RFC 3339 UTC; same-day tiebreak
    team_a_score INTEGER NOT NULL CHECK (team_a_score >= 0),
    team_b_score INTEGER NOT NULL CHECK (team_b_score >= 0),
    winner       TEXT NOT NULL CHECK (winner IN ('A', 'B')),
    CHECK (team_a_score != team_b_score)
);

-- One row per (game, player). elo_after is a cache of the replay.
CREATE TABLE IF NOT EXISTS game_players (
    game_id   TEXT NOT NULL REFERENCES games(game_id) ON DELETE CASCADE,
    player_id TEXT NOT NULL REFERENCES players(player_id),
    team      TEXT NOT NULL CHECK (team IN ('A', 'B')),
    position  INTEGER NOT NULL,     -- roster entry order within the team
    elo_after INTEGER NOT NULL,
    PRIMARY KEY (game_id, player_id)
);

CREATE INDEX IF NOT EXISTS games_chrono_idx        ON games(played_on, created_at);
CREATE INDEX IF NOT EXISTS game_players_player_idx ON game_players(player_id);

PRAGMA user_version = 1;
";
