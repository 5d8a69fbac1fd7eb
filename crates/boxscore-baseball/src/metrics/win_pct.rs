// Team record, PythagenPat expected winning percentage, and running run
// differential.

use crate::metrics::ratio::{finite, ratio};
use crate::model::{GameResult, Outcome};
use serde::{Deserialize, Serialize};

/// Exponent applied to runs-per-game to get the Pythagorean exponent.
pub const PYTHAGENPAT_EXPONENT: f64 = 0.287;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinStats {
    /// wins / (wins + losses); ties are excluded from the denominator.
    pub actual_pct: Option<f64>,
    pub wins: u32,
    pub ties: u32,
    pub losses: u32,
    pub expected_pct: Option<f64>,
    pub run_differential: i64,
}

/// PythagenPat: exponent `x = RPG^0.287`, then `RS^x / (RS^x + RA^x)`.
pub fn pythagenpat(runs_scored: f64, runs_allowed: f64, games: usize) -> Option<f64> {
    let rpg = ratio(runs_scored + runs_allowed, games as f64)?;
    if rpg <= 0.0 {
        return None;
    }
    let x = rpg.powf(PYTHAGENPAT_EXPONENT);
    if runs_scored <= 0.0 {
        return Some(0.0);
    }
    // 1 / (1 + (RA/RS)^x) stays finite where RS^x alone would overflow.
    let odds_against = (runs_allowed / runs_scored).powf(x);
    finite(1.0 / (1.0 + odds_against))
}

/// Summarise a list of games. Callers pick the season (or any other slice);
/// the estimator looks at whatever it is given.
pub fn win_stats(games: &[GameResult]) -> WinStats {
    let mut wins = 0u32;
    let mut losses = 0u32;
    let mut ties = 0u32;
    let mut runs_scored = 0u64;
    let mut runs_allowed = 0u64;

    for game in games {
        match game.outcome() {
            Outcome::Win => wins += 1,
            Outcome::Loss => losses += 1,
            Outcome::Tie => ties += 1,
        }
        runs_scored += u64::from(game.runs_scored);
        runs_allowed += u64::from(game.runs_allowed);
    }

    WinStats {
        actual_pct: ratio(f64::from(wins), f64::from(wins + losses)),
        wins,
        ties,
        losses,
        expected_pct: pythagenpat(runs_scored as f64, runs_allowed as f64, games.len()),
        run_differential: runs_scored as i64 - runs_allowed as i64,
    }
}

/// One point on a season's running run-differential chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDifferentialPoint {
    pub season: u16,
    /// 0-based index of the game within its season.
    pub game_number: u32,
    pub cumulative: i64,
}

/// Running run differential per season. Seasons appear in order of first
/// appearance and games keep their input order within a season.
pub fn cumulative_run_differential(games: &[GameResult]) -> Vec<RunDifferentialPoint> {
    let mut seasons: Vec<u16> = Vec::new();
    for game in games {
        if !seasons.contains(&game.season) {
            seasons.push(game.season);
        }
    }

    let mut points = Vec::with_capacity(games.len());
    for season in seasons {
        let mut cumulative = 0i64;
        let in_season = games.iter().filter(|g| g.season == season);
        for (game_number, game) in (0u32..).zip(in_season) {
            cumulative += game.run_differential();
            points.push(RunDifferentialPoint {
                season,
                game_number,
                cumulative,
            });
        }
    }
    points
}
