// Boxscore command-line driver.
//
// Startup sequence:
// 1. Initialize tracing (stderr, so stdout stays clean JSON)
// 2. Resolve the base directory and load config/engine.toml
// 3. Load the requested table and the linear-weights constants
// 4. Derive metrics, filter the population, rank percentiles
// 5. Print the result as JSON on stdout

use boxscore_baseball::config::{self, EngineConfig};
use boxscore_baseball::loaders;
use boxscore_baseball::metrics::{
    cumulative_run_differential, derive_batting_metrics, derive_pitching_metrics,
    rank_percentiles, win_stats,
};
use boxscore_baseball::model::Metric;
use boxscore_baseball::population::PopulationFilter;

use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use tracing::info;

const USAGE: &str = "usage: boxscore <batting|pitching|games> <table.csv> \
[--season YEAR] [--school NAME]... [--position POS]... [--class-year YR]... [--base DIR]";

fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let args = Args::parse(std::env::args().skip(1).collect())?;

    let base_dir = resolve_base_dir(args.base.as_deref())?;
    config::ensure_config_files(&base_dir).context("failed to write default configuration")?;
    let config = config::load_config_from(&base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded from {}: {} buckets, {} inverted metrics",
        base_dir.display(),
        config.percentiles.buckets,
        config.percentiles.inverted.len()
    );

    let output = match args.command {
        Command::Batting => run_batting(&args, &config, &base_dir)?,
        Command::Pitching => run_pitching(&args, &config, &base_dir)?,
        Command::Games => run_games(&args)?,
    };

    let json = serde_json::to_string_pretty(&output).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_batting(
    args: &Args,
    config: &EngineConfig,
    base_dir: &Path,
) -> anyhow::Result<serde_json::Value> {
    let lines = loaders::load_batting_lines(&args.table)
        .with_context(|| format!("failed to load batting table {}", args.table.display()))?;
    let lines: Vec<_> = lines
        .into_iter()
        .filter(|l| args.season.map_or(true, |s| l.identity.season == s))
        .collect();
    let constants = config
        .constants_table(base_dir)
        .context("failed to load linear weights")?;

    let rows = derive_batting_metrics(&lines, &constants);
    let population = args.filter(config).batting(&rows);
    let percentiles =
        rank_percentiles(&population, &Metric::BATTING_PERCENTILES, &config.percentiles);
    info!(
        "Ranked {} of {} batting rows",
        population.len(),
        rows.len()
    );

    Ok(serde_json::json!({
        "rows": rows,
        "percentiles": percentiles,
    }))
}

fn run_pitching(
    args: &Args,
    config: &EngineConfig,
    base_dir: &Path,
) -> anyhow::Result<serde_json::Value> {
    let lines = loaders::load_pitching_lines(&args.table)
        .with_context(|| format!("failed to load pitching table {}", args.table.display()))?;
    let lines: Vec<_> = lines
        .into_iter()
        .filter(|l| args.season.map_or(true, |s| l.identity.season == s))
        .collect();
    let constants = config
        .constants_table(base_dir)
        .context("failed to load linear weights")?;

    let rows = derive_pitching_metrics(&lines, &constants);
    let population = args.filter(config).pitching(&rows);
    let percentiles =
        rank_percentiles(&population, &Metric::PITCHING_PERCENTILES, &config.percentiles);
    info!(
        "Ranked {} of {} pitching rows",
        population.len(),
        rows.len()
    );

    Ok(serde_json::json!({
        "rows": rows,
        "percentiles": percentiles,
    }))
}

fn run_games(args: &Args) -> anyhow::Result<serde_json::Value> {
    let games = loaders::load_game_results(&args.table)
        .with_context(|| format!("failed to load game results {}", args.table.display()))?;
    let games: Vec<_> = games
        .into_iter()
        .filter(|g| args.season.map_or(true, |s| g.season == s))
        .collect();

    Ok(serde_json::json!({
        "record": win_stats(&games),
        "run_differential": cumulative_run_differential(&games),
    }))
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Batting,
    Pitching,
    Games,
}

#[derive(Debug)]
struct Args {
    command: Command,
    table: PathBuf,
    season: Option<u16>,
    schools: Vec<String>,
    positions: Vec<String>,
    class_years: Vec<String>,
    base: Option<PathBuf>,
}

impl Args {
    fn parse(args: Vec<String>) -> anyhow::Result<Self> {
        let mut iter = args.into_iter();
        let command = match iter.next().as_deref() {
            Some("batting") => Command::Batting,
            Some("pitching") => Command::Pitching,
            Some("games") => Command::Games,
            Some(other) => bail!("unknown command `{other}`\n{USAGE}"),
            None => bail!("{USAGE}"),
        };

        let mut table = None;
        let mut season = None;
        let mut schools = Vec::new();
        let mut positions = Vec::new();
        let mut class_years = Vec::new();
        let mut base = None;

        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| {
                iter.next()
                    .filter(|v| !v.trim().is_empty())
                    .with_context(|| format!("{flag} needs a value\n{USAGE}"))
            };
            match arg.as_str() {
                "--season" => {
                    let raw = value("--season")?;
                    season = Some(
                        raw.parse::<u16>()
                            .with_context(|| format!("invalid season `{raw}`"))?,
                    );
                }
                "--school" => schools.push(value("--school")?),
                "--position" => positions.push(value("--position")?),
                "--class-year" => class_years.push(value("--class-year")?),
                "--base" => base = Some(PathBuf::from(value("--base")?)),
                flag if flag.starts_with("--") => bail!("unknown flag `{flag}`\n{USAGE}"),
                _ if table.is_none() => table = Some(PathBuf::from(&arg)),
                _ => bail!("unexpected argument `{arg}`\n{USAGE}"),
            }
        }

        Ok(Self {
            command,
            table: table.with_context(|| format!("missing table path\n{USAGE}"))?,
            season,
            schools,
            positions,
            class_years,
            base,
        })
    }

    fn filter(&self, config: &EngineConfig) -> PopulationFilter {
        PopulationFilter {
            schools: self.schools.clone(),
            positions: self.positions.clone(),
            class_years: self.class_years.clone(),
            ..config.population_filter()
        }
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// `--base` wins; otherwise the working directory if it already holds a
/// config/, else the per-user data directory.
fn resolve_base_dir(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    if cwd.join("config").exists() {
        return Ok(cwd);
    }
    match directories::ProjectDirs::from("", "", "boxscore") {
        Some(dirs) => Ok(dirs.data_dir().to_path_buf()),
        None => Ok(cwd),
    }
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("boxscore=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_command_table_and_flags() {
        let parsed = Args::parse(args(&[
            "pitching",
            "data/pitching.csv",
            "--season",
            "2022",
            "--school",
            "Yale",
            "--school",
            "Penn",
            "--class-year",
            "other",
        ]))
        .unwrap();
        assert_eq!(parsed.command, Command::Pitching);
        assert_eq!(parsed.table, PathBuf::from("data/pitching.csv"));
        assert_eq!(parsed.season, Some(2022));
        assert_eq!(parsed.schools, vec!["Yale", "Penn"]);
        assert_eq!(parsed.class_years, vec!["other"]);
    }

    #[test]
    fn rejects_unknown_command_and_missing_table() {
        assert!(Args::parse(args(&["fielding", "x.csv"])).is_err());
        assert!(Args::parse(args(&["batting"])).is_err());
        assert!(Args::parse(args(&[])).is_err());
    }

    #[test]
    fn rejects_bad_season() {
        assert!(Args::parse(args(&["games", "g.csv", "--season", "twenty"])).is_err());
        assert!(Args::parse(args(&["games", "g.csv", "--season"])).is_err());
    }

    #[test]
    fn filter_keeps_config_thresholds() {
        let parsed = Args::parse(args(&["batting", "b.csv", "--position", "C"])).unwrap();
        let mut config = EngineConfig::default();
        config.population.min_pa = 25;
        let filter = parsed.filter(&config);
        assert_eq!(filter.min_pa, 25);
        assert_eq!(filter.positions, vec!["C"]);
    }
}
