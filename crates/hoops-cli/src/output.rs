//! Plain-text tables and JSON output for the `hoops` commands.

use anyhow::Result;
use hoops_core::{
  combo::ComboStats,
  game::{Game, Team},
  history::{CareerSummary, GameResult, PlayerGame},
  player::{Player, PlayerId, RankedPlayer},
  rating::ReplaySummary,
};
use serde::Serialize;

/// Everything `player show` prints.
#[derive(Debug, Serialize)]
pub struct PlayerReport {
  pub player: Player,
  pub career: CareerSummary,
  /// Newest first.
  pub games:  Vec<PlayerGame>,
}

/// Print `value` as pretty JSON, or as the text `render` produces.
pub fn emit<T: Serialize + ?Sized>(
  json: bool,
  value: &T,
  render: impl FnOnce(&T) -> String,
) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(value)?);
  } else {
    print!("{}", render(value));
  }
  Ok(())
}

fn join(ids: &[PlayerId]) -> String {
  ids.iter().map(PlayerId::as_str).collect::<Vec<_>>().join(", ")
}

fn percent(p: f64) -> String { format!("{:.1}%", p * 100.0) }

// ─── Players ──────────────────────────────────────────────────────────────────

pub fn player_added(p: &Player) -> String {
  format!("Added {} ({}) at {}\n", p.display_name(), p.player_id, p.rating)
}

fn streak(n: i32) -> String {
  match n {
    0 => "-".to_owned(),
    n if n > 0 => format!("W{n}"),
    n => format!("L{}", n.unsigned_abs()),
  }
}

pub fn rankings(ranked: &[RankedPlayer]) -> String {
  if ranked.is_empty() {
    return "No players yet.\n".to_owned();
  }

  let mut out = format!(
    "{:>4}  {:<24} {:<20} {:>6} {:>4} {:>4} {:>4} {:>7} {:>5}  {}\n",
    "RANK", "NAME", "ID", "RATING", "GP", "W", "L", "WIN%", "STRK", "LAST PLAYED"
  );
  for r in ranked {
    let p = &r.player;
    let last = p
      .last_played
      .map(|d| d.to_string())
      .unwrap_or_else(|| "-".to_owned());
    out.push_str(&format!(
      "{:>4}  {:<24} {:<20} {:>6} {:>4} {:>4} {:>4} {:>7} {:>5}  {}\n",
      r.rank,
      p.display_name(),
      p.player_id,
      p.rating,
      p.games_played,
      r.wins,
      r.losses,
      percent(r.win_percentage),
      streak(r.current_streak),
      last
    ));
  }
  out
}

pub fn player_report(report: &PlayerReport) -> String {
  let p = &report.player;
  let c = &report.career;

  let mut out = format!("{} ({})\n", p.display_name(), p.player_id);
  out.push_str(&format!("  rating   {} (peak {})\n", p.rating, c.peak_rating));
  out.push_str(&format!(
    "  record   {}-{} in {} games ({})\n",
    c.wins,
    c.losses,
    c.games_played,
    percent(c.win_percentage)
  ));
  out.push_str(&format!(
    "  streak   {} (best W{}, worst L{})\n",
    streak(c.current_streak),
    c.longest_win_streak,
    c.longest_loss_streak
  ));

  if report.games.is_empty() {
    return out;
  }

  out.push('\n');
  for g in &report.games {
    let result = match g.result {
      GameResult::Win => "W",
      GameResult::Loss => "L",
    };
    let with = if g.teammates.is_empty() {
      String::new()
    } else {
      format!(" with {}", join(&g.teammates))
    };
    let change = format!("{:+}", g.elo_change);
    out.push_str(&format!(
      "  {}  {} {:>2}-{:<2} {:>5} -> {:<5}{} vs {}\n",
      g.played_on,
      result,
      g.team_score,
      g.opponent_score,
      change,
      g.elo_after,
      with,
      join(&g.opponents)
    ));
  }
  out
}

// ─── Games ────────────────────────────────────────────────────────────────────

fn game_line(g: &Game) -> String {
  let marker = |team: Team| if g.winner() == team { "*" } else { " " };
  format!(
    "{}  {}  {}[{}] {:>2} - {:<2} [{}]{}",
    g.played_on,
    g.game_id,
    marker(Team::A),
    join(&g.roster.team_a),
    g.team_a_score,
    g.team_b_score,
    join(&g.roster.team_b),
    marker(Team::B),
  )
}

pub fn game_recorded(g: &Game) -> String { format!("Saved {}\n", game_line(g)) }

pub fn games(games: &[Game]) -> String {
  if games.is_empty() {
    return "No games yet.\n".to_owned();
  }
  let mut out = String::new();
  for g in games {
    out.push_str(&game_line(g));
    out.push('\n');
  }
  out
}

// ─── Reports ──────────────────────────────────────────────────────────────────

pub fn combos(stats: &[ComboStats]) -> String {
  if stats.is_empty() {
    return "No combos have played enough games together.\n".to_owned();
  }

  let mut out = format!("{:<48} {:>4} {:>4} {:>5} {:>7}\n", "PLAYERS", "W", "L", "GP", "WIN%");
  for s in stats {
    out.push_str(&format!(
      "{:<48} {:>4} {:>4} {:>5} {:>7}\n",
      join(&s.player_ids),
      s.wins,
      s.losses,
      s.games_played,
      percent(s.win_percentage)
    ));
  }
  out
}

pub fn replay_summary(s: &ReplaySummary) -> String {
  let mut out = format!(
    "Replayed {} games; {} players updated.\n",
    s.games_replayed, s.players_updated
  );
  if s.games_skipped > 0 {
    out.push_str(&format!("Skipped {} games with an empty team.\n", s.games_skipped));
  }
  out
}
