// Table loading: reads provider CSV exports into the engine's raw row types.
//
// Column names follow the stats.ncaa.org exports (`2B`, `HR-A`, `Yr`, ...).
// NCAA exports leave zero counts blank, so a blank counting column reads as
// 0. Extra columns are ignored.

use crate::model::{BattingLine, GameResult, Identity, PitchingLine};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawBattingRow {
    #[serde(alias = "stats_player_seq", alias = "player_id")]
    id: String,
    name: String,
    #[serde(default)]
    school: String,
    #[serde(default, alias = "class_year")]
    Yr: Option<String>,
    #[serde(default, alias = "pos")]
    position: Option<String>,
    season: u16,
    #[serde(default)]
    GP: Option<f64>,
    #[serde(default)]
    PA: Option<f64>,
    #[serde(default)]
    AB: Option<f64>,
    #[serde(default)]
    H: Option<f64>,
    #[serde(default, rename = "2B")]
    doubles: Option<f64>,
    #[serde(default, rename = "3B")]
    triples: Option<f64>,
    #[serde(default)]
    HR: Option<f64>,
    #[serde(default)]
    BB: Option<f64>,
    #[serde(default)]
    IBB: Option<f64>,
    #[serde(default)]
    HBP: Option<f64>,
    #[serde(default)]
    SF: Option<f64>,
    #[serde(default)]
    SH: Option<f64>,
    #[serde(default, alias = "SO")]
    K: Option<f64>,
    #[serde(default)]
    RBI: Option<f64>,
    #[serde(default)]
    R: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawPitchingRow {
    #[serde(alias = "stats_player_seq", alias = "player_id")]
    id: String,
    name: String,
    #[serde(default)]
    school: String,
    #[serde(default, alias = "class_year")]
    Yr: Option<String>,
    #[serde(default, alias = "pos")]
    position: Option<String>,
    season: u16,
    #[serde(default)]
    IP: Option<f64>,
    #[serde(default)]
    BF: Option<f64>,
    #[serde(default)]
    H: Option<f64>,
    #[serde(default)]
    SO: Option<f64>,
    #[serde(default)]
    BB: Option<f64>,
    #[serde(default)]
    ER: Option<f64>,
    #[serde(default)]
    R: Option<f64>,
    #[serde(default, rename = "HR-A")]
    hr_a: Option<f64>,
    #[serde(default)]
    HB: Option<f64>,
    #[serde(default, rename = "2B-A")]
    doubles_a: Option<f64>,
    #[serde(default, rename = "3B-A")]
    triples_a: Option<f64>,
    #[serde(default)]
    GO: Option<f64>,
    #[serde(default)]
    FO: Option<f64>,
    #[serde(default)]
    W: Option<f64>,
    #[serde(default)]
    L: Option<f64>,
    #[serde(default)]
    SV: Option<f64>,
    #[serde(default)]
    App: Option<f64>,
    #[serde(default)]
    Pitches: Option<f64>,
    #[serde(default)]
    SFA: Option<f64>,
    #[serde(default)]
    SHA: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawGameRow {
    season: u16,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    opponent: Option<String>,
    runs_scored: f64,
    runs_allowed: f64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Blank → 0. Negative, fractional or non-finite values are rejected.
fn count(value: Option<f64>, column: &str) -> Result<u32, String> {
    let v = value.unwrap_or(0.0);
    if !v.is_finite() || v < 0.0 || v > f64::from(u32::MAX) {
        return Err(format!("invalid {column} value {v}"));
    }
    if v.fract() != 0.0 {
        return Err(format!("non-integer {column} value {v}"));
    }
    Ok(v as u32)
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "N/A" && s != "-")
}

fn identity(
    id: String,
    name: String,
    school: String,
    class_year: Option<String>,
    position: Option<String>,
    season: u16,
) -> Identity {
    Identity {
        id: id.trim().to_string(),
        name: name.trim().to_string(),
        school: school.trim().to_string(),
        class_year: optional_text(class_year),
        position: optional_text(position),
        season,
    }
}

fn batting_line(raw: RawBattingRow) -> Result<BattingLine, String> {
    Ok(BattingLine {
        gp: count(raw.GP, "GP")?,
        pa: count(raw.PA, "PA")?,
        ab: count(raw.AB, "AB")?,
        h: count(raw.H, "H")?,
        doubles: count(raw.doubles, "2B")?,
        triples: count(raw.triples, "3B")?,
        hr: count(raw.HR, "HR")?,
        bb: count(raw.BB, "BB")?,
        ibb: count(raw.IBB, "IBB")?,
        hbp: count(raw.HBP, "HBP")?,
        sf: count(raw.SF, "SF")?,
        sh: count(raw.SH, "SH")?,
        k: count(raw.K, "K")?,
        rbi: count(raw.RBI, "RBI")?,
        r: count(raw.R, "R")?,
        identity: identity(raw.id, raw.name, raw.school, raw.Yr, raw.position, raw.season),
    })
}

fn pitching_line(raw: RawPitchingRow) -> Result<PitchingLine, String> {
    let pitches = raw
        .Pitches
        .map(|p| count(Some(p), "Pitches"))
        .transpose()?;
    Ok(PitchingLine {
        // IP stays raw; thirds-notation validity is the deriver's call.
        ip: raw.IP.unwrap_or(0.0),
        bf: count(raw.BF, "BF")?,
        h: count(raw.H, "H")?,
        so: count(raw.SO, "SO")?,
        bb: count(raw.BB, "BB")?,
        er: count(raw.ER, "ER")?,
        r: count(raw.R, "R")?,
        hr_a: count(raw.hr_a, "HR-A")?,
        hb: count(raw.HB, "HB")?,
        doubles_a: count(raw.doubles_a, "2B-A")?,
        triples_a: count(raw.triples_a, "3B-A")?,
        go: count(raw.GO, "GO")?,
        fo: count(raw.FO, "FO")?,
        w: count(raw.W, "W")?,
        l: count(raw.L, "L")?,
        sv: count(raw.SV, "SV")?,
        app: count(raw.App, "App")?,
        pitches,
        sfa: count(raw.SFA, "SFA")?,
        sha: count(raw.SHA, "SHA")?,
        identity: identity(raw.id, raw.name, raw.school, raw.Yr, raw.position, raw.season),
    })
}

fn game_result(raw: RawGameRow) -> Result<GameResult, String> {
    Ok(GameResult {
        season: raw.season,
        date: raw.date,
        opponent: optional_text(raw.opponent),
        runs_scored: count(Some(raw.runs_scored), "runs_scored")?,
        runs_allowed: count(Some(raw.runs_allowed), "runs_allowed")?,
    })
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn rows_from_reader<R, Raw, Row>(
    rdr: R,
    kind: &str,
    convert: fn(Raw) -> Result<Row, String>,
) -> Result<Vec<Row>, csv::Error>
where
    R: Read,
    Raw: DeserializeOwned,
{
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<Raw>() {
        match result {
            Ok(raw) => match convert(raw) {
                Ok(row) => rows.push(row),
                Err(e) => warn!("skipping {} row: {}", kind, e),
            },
            Err(e) => {
                warn!("skipping malformed {} row: {}", kind, e);
            }
        }
    }
    Ok(rows)
}

fn batting_from_reader<R: Read>(rdr: R) -> Result<Vec<BattingLine>, csv::Error> {
    rows_from_reader::<R, RawBattingRow, _>(rdr, "batting", batting_line)
}

fn pitching_from_reader<R: Read>(rdr: R) -> Result<Vec<PitchingLine>, csv::Error> {
    rows_from_reader::<R, RawPitchingRow, _>(rdr, "pitching", pitching_line)
}

fn games_from_reader<R: Read>(rdr: R) -> Result<Vec<GameResult>, csv::Error> {
    rows_from_reader::<R, RawGameRow, _>(rdr, "game", game_result)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

pub(crate) fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn load_rows<Row>(
    path: &Path,
    kind: &str,
    parse: fn(std::fs::File) -> Result<Vec<Row>, csv::Error>,
) -> Result<Vec<Row>, LoadError> {
    let file = open(path)?;
    let rows = parse(file).map_err(|e| LoadError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    if rows.is_empty() {
        return Err(LoadError::Validation(format!(
            "{kind} CSV {} produced zero valid rows",
            path.display()
        )));
    }
    info!("loaded {} {} rows from {}", rows.len(), kind, path.display());
    Ok(rows)
}

/// Load a batting table (one row per player-season).
pub fn load_batting_lines(path: &Path) -> Result<Vec<BattingLine>, LoadError> {
    load_rows(path, "batting", batting_from_reader)
}

/// Load a pitching table (one row per player-season).
pub fn load_pitching_lines(path: &Path) -> Result<Vec<PitchingLine>, LoadError> {
    load_rows(path, "pitching", pitching_from_reader)
}

/// Load one team's game-by-game results.
pub fn load_game_results(path: &Path) -> Result<Vec<GameResult>, LoadError> {
    load_rows(path, "game", games_from_reader)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
