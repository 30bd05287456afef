//! `hoops`: command-line front end for a pickup-basketball league.
//!
//! # Usage
//!
//! ```
//! hoops player add Ann Lee
//! hoops game add --date 2026-04-01 --team-a ann-lee,bo-diaz --team-b cy-park,di-wu \
//!   --score-a 21 --score-b 17
//! hoops player list
//! hoops combos --size 3
//! hoops --config ~/.config/hoops/hoops.toml replay
//! ```

mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use hoops_core::{
  combo::{self, ComboSize, MIN_COMBO_GAMES},
  game::{NewGame, Roster},
  history,
  player::{self, NewPlayer, PlayerId},
  store::LeagueStore,
};
use hoops_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "hoops", version, about = "Ratings and team chemistry for a pickup league")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "hoops.toml")]
  config: PathBuf,

  /// Print JSON instead of tables.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Add, list, and inspect players.
  #[command(subcommand)]
  Player(PlayerCommand),

  /// Record, edit, delete, and list games.
  #[command(subcommand)]
  Game(GameCommand),

  /// Rebuild every rating from the game log.
  Replay,

  /// Win/loss records for players who shared a side.
  Combos {
    /// Players per combo: 2 or 3.
    #[arg(long, default_value_t = 2)]
    size: usize,

    /// Override the configured minimum number of games.
    #[arg(long)]
    min_games: Option<u32>,
  },
}

#[derive(Subcommand, Debug)]
enum PlayerCommand {
  Add {
    first_name: String,
    last_name:  String,
  },
  /// Rankings, highest rating first.
  List,
  /// Career summary and game history.
  Show { player_id: String },
}

#[derive(Subcommand, Debug)]
enum GameCommand {
  Add(GameArgs),
  /// Replace a game's details and replay ratings.
  Edit {
    game_id: Uuid,
    #[command(flatten)]
    game:    GameArgs,
  },
  /// Delete a game and replay ratings.
  Delete { game_id: Uuid },
  List,
}

#[derive(Args, Debug)]
struct GameArgs {
  /// Day the game was played (YYYY-MM-DD). Defaults to today.
  #[arg(long)]
  date: Option<NaiveDate>,

  /// Comma-separated player ids.
  #[arg(long, value_delimiter = ',', required = true)]
  team_a: Vec<String>,

  #[arg(long, value_delimiter = ',', required = true)]
  team_b: Vec<String>,

  #[arg(long)]
  score_a: u32,

  #[arg(long)]
  score_b: u32,
}

impl GameArgs {
  fn into_new_game(self) -> NewGame {
    let ids = |names: Vec<String>| -> Vec<PlayerId> {
      names
        .into_iter()
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
        .map(PlayerId::new)
        .collect()
    };
    NewGame {
      played_on:    self.date.unwrap_or_else(|| Local::now().date_naive()),
      roster:       Roster::new(ids(self.team_a), ids(self.team_b)),
      team_a_score: self.score_a,
      team_b_score: self.score_b,
    }
  }
}

// ─── Config ───────────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `hoops.toml` and `HOOPS_*`
/// environment variables.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
struct CliConfig {
  store_path:      PathBuf,
  combo_min_games: u32,
}

impl Default for CliConfig {
  fn default() -> Self {
    Self {
      store_path:      PathBuf::from("hoops.db"),
      combo_min_games: MIN_COMBO_GAMES,
    }
  }
}

fn load_config(path: &Path) -> Result<CliConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("HOOPS"))
    .build()
    .context("failed to read config file")?;

  let mut cfg: CliConfig = settings
    .try_deserialize()
    .context("failed to deserialise CliConfig")?;
  cfg.store_path = expand_tilde(&cfg.store_path);
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = load_config(&cli.config)?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  run(&store, &cfg, cli.command, cli.json).await
}

async fn run<S: LeagueStore>(store: &S, cfg: &CliConfig, command: Command, json: bool) -> Result<()> {
  match command {
    Command::Player(cmd) => run_player(store, cmd, json).await,
    Command::Game(cmd) => run_game(store, cmd, json).await,

    Command::Replay => {
      let summary = store.replay().await.context("replay failed")?;
      output::emit(json, &summary, output::replay_summary)
    }

    Command::Combos { size, min_games } => {
      let size = ComboSize::try_from(size)?;
      let games = store.list_games().await.context("failed to load games")?;
      let stats = combo::compute_combo_stats_with_min(
        &games,
        size,
        min_games.unwrap_or(cfg.combo_min_games),
      );
      output::emit(json, &stats, |s| output::combos(s))
    }
  }
}

async fn run_player<S: LeagueStore>(store: &S, cmd: PlayerCommand, json: bool) -> Result<()> {
  match cmd {
    PlayerCommand::Add { first_name, last_name } => {
      let player = store
        .add_player(NewPlayer::new(first_name, last_name))
        .await
        .context("failed to add player")?;
      output::emit(json, &player, output::player_added)
    }

    PlayerCommand::List => {
      let players = store.list_players().await.context("failed to load players")?;
      let games = store.list_games().await.context("failed to load games")?;
      let ranked = player::rankings(players, &history::records(&games));
      output::emit(json, &ranked, |r| output::rankings(r))
    }

    PlayerCommand::Show { player_id } => {
      let id = PlayerId::new(player_id);
      let Some(player) = store.get_player(id.clone()).await? else {
        anyhow::bail!("no player with id {id}");
      };
      let games = store.list_games().await.context("failed to load games")?;
      let participations = store
        .participations(id.clone())
        .await
        .context("failed to load participations")?;

      let games = history::player_history(&id, &games, &participations);
      let report = output::PlayerReport {
        career: history::career_summary(&games),
        player,
        games,
      };
      output::emit(json, &report, output::player_report)
    }
  }
}

async fn run_game<S: LeagueStore>(store: &S, cmd: GameCommand, json: bool) -> Result<()> {
  match cmd {
    GameCommand::Add(args) => {
      let game = store
        .record_game(args.into_new_game())
        .await
        .context("failed to record game")?;
      output::emit(json, &game, output::game_recorded)
    }

    GameCommand::Edit { game_id, game } => {
      let game = store
        .update_game(game_id, game.into_new_game())
        .await
        .with_context(|| format!("failed to update game {game_id}"))?;
      output::emit(json, &game, output::game_recorded)
    }

    GameCommand::Delete { game_id } => {
      store
        .delete_game(game_id)
        .await
        .with_context(|| format!("failed to delete game {game_id}"))?;
      output::emit(json, &serde_json::json!({ "deleted": game_id }), |_| {
        format!("Deleted game {game_id}\n")
      })
    }

    GameCommand::List => {
      let games = store.list_games().await.context("failed to load games")?;
      output::emit(json, &games, |g| output::games(g))
    }
  }
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory as _;

  use super::*;

  fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("hoops").chain(args.iter().copied()))
      .expect("arguments should parse")
  }

  #[test]
  fn command_definition_is_valid() { Cli::command().debug_assert(); }

  #[test]
  fn config_flag_defaults_to_hoops_toml() {
    let cli = parse(&["replay"]);
    assert_eq!(cli.config, PathBuf::from("hoops.toml"));
    assert!(!cli.json);
    assert!(matches!(cli.command, Command::Replay));
  }

  #[test]
  fn game_add_splits_team_lists() {
    let cli = parse(&[
      "game", "add", "--date", "2026-04-01", "--team-a", "ann-lee, bo-diaz", "--team-b",
      "cy-park", "--score-a", "21", "--score-b", "17",
    ]);
    let Command::Game(GameCommand::Add(args)) = cli.command else {
      panic!("expected game add");
    };
    let game = args.into_new_game();
    assert_eq!(game.played_on, NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
    assert_eq!(game.roster.team_a, vec![PlayerId::from("ann-lee"), PlayerId::from("bo-diaz")]);
    assert_eq!(game.roster.team_b, vec![PlayerId::from("cy-park")]);
    assert_eq!((game.team_a_score, game.team_b_score), (21, 17));
  }

  #[test]
  fn game_edit_takes_an_id_and_details() {
    let id = Uuid::new_v4().to_string();
    let cli = parse(&[
      "--json", "game", "edit", &id, "--team-a", "a", "--team-b", "b", "--score-a", "3",
      "--score-b", "21",
    ]);
    assert!(cli.json);
    let Command::Game(GameCommand::Edit { game_id, game }) = cli.command else {
      panic!("expected game edit");
    };
    assert_eq!(game_id.to_string(), id);
    assert!(game.date.is_none());
  }

  #[test]
  fn missing_team_is_a_parse_error() {
    let result = Cli::try_parse_from([
      "hoops", "game", "add", "--team-a", "a", "--score-a", "21", "--score-b", "3",
    ]);
    assert!(result.is_err());
  }

  #[test]
  fn bad_date_is_a_parse_error() {
    let result = Cli::try_parse_from([
      "hoops", "game", "add", "--date", "04/01/2026", "--team-a", "a", "--team-b", "b",
      "--score-a", "21", "--score-b", "3",
    ]);
    assert!(result.is_err());
  }

  #[test]
  fn combos_defaults_to_duos() {
    let cli = parse(&["combos"]);
    assert!(matches!(cli.command, Command::Combos { size: 2, min_games: None }));
    let cli = parse(&["combos", "--size", "3", "--min-games", "1"]);
    assert!(matches!(cli.command, Command::Combos { size: 3, min_games: Some(1) }));
  }

  #[test]
  fn missing_config_file_uses_defaults() {
    let cfg = load_config(Path::new("/nonexistent/hoops.toml")).unwrap();
    assert_eq!(cfg.combo_min_games, MIN_COMBO_GAMES);
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/hoops.db")), PathBuf::from(home).join("hoops.db"));
    assert_eq!(expand_tilde(Path::new("/tmp/hoops.db")), PathBuf::from("/tmp/hoops.db"));
  }
}
