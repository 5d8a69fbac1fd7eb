// Metrics engine: batting/pitching derivation, percentile ranking, win %.

pub mod batting;
pub mod innings;
pub mod percentile;
pub mod pitching;
pub mod ratio;
pub mod win_pct;

pub use batting::{derive_batting_metrics, BattingMetrics, BattingRow};
pub use innings::{normalize_innings, Innings, MalformedInnings};
pub use percentile::{rank_percentiles, PercentileConfig, PercentileRow};
pub use pitching::{derive_pitching_metrics, PitchingMetrics, PitchingRow};
pub use win_pct::{cumulative_run_differential, win_stats, RunDifferentialPoint, WinStats};
