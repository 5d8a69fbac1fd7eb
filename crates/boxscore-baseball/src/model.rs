// Raw table rows handed to the engine by the data provider, plus the
// metric vocabulary shared by the derivers and the percentile ranker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Who a row describes. Shared by batting, pitching, and percentile rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Provider's player (or team) id.
    pub id: String,
    pub name: String,
    pub school: String,
    /// `Fr`, `So`, `Jr`, `Sr`; `None` when the source leaves it blank.
    pub class_year: Option<String>,
    pub position: Option<String>,
    pub season: u16,
}

impl Identity {
    /// Class year as displayed by the dashboard (`N/A` when missing).
    pub fn class_year_label(&self) -> &str {
        self.class_year.as_deref().unwrap_or("N/A")
    }
}

// ---------------------------------------------------------------------------
// Raw stat lines
// ---------------------------------------------------------------------------

/// One player-season (or team-season) of batting counting stats.
///
/// `pa` is taken as reported; the provider's data does not always satisfy
/// `PA = AB + BB + IBB + HBP + SF + SH` and the engine never asserts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattingLine {
    pub identity: Identity,
    pub gp: u32,
    pub pa: u32,
    pub ab: u32,
    pub h: u32,
    pub doubles: u32,
    pub triples: u32,
    pub hr: u32,
    pub bb: u32,
    pub ibb: u32,
    pub hbp: u32,
    pub sf: u32,
    pub sh: u32,
    pub k: u32,
    pub rbi: u32,
    pub r: u32,
}

/// One player-season (or team-season) of pitching counting stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchingLine {
    pub identity: Identity,
    /// Innings pitched in thirds notation: `5.2` means five and two-thirds.
    pub ip: f64,
    pub bf: u32,
    pub h: u32,
    pub so: u32,
    pub bb: u32,
    pub er: u32,
    pub r: u32,
    pub hr_a: u32,
    pub hb: u32,
    pub doubles_a: u32,
    pub triples_a: u32,
    pub go: u32,
    pub fo: u32,
    pub w: u32,
    pub l: u32,
    pub sv: u32,
    pub app: u32,
    /// Total pitches thrown; not every season reports it.
    #[serde(default)]
    pub pitches: Option<u32>,
    /// Sacrifice flies allowed.
    #[serde(default)]
    pub sfa: u32,
    /// Sacrifice hits allowed.
    #[serde(default)]
    pub sha: u32,
}

// ---------------------------------------------------------------------------
// Game results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

/// A single game from one team's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub season: u16,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub opponent: Option<String>,
    pub runs_scored: u32,
    pub runs_allowed: u32,
}

impl GameResult {
    pub fn run_differential(&self) -> i64 {
        i64::from(self.runs_scored) - i64::from(self.runs_allowed)
    }

    pub fn outcome(&self) -> Outcome {
        match self.run_differential() {
            d if d > 0 => Outcome::Win,
            d if d < 0 => Outcome::Loss,
            _ => Outcome::Tie,
        }
    }
}

// ---------------------------------------------------------------------------
// Metric vocabulary
// ---------------------------------------------------------------------------

/// A rankable column. Names match the dashboard's column headers exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "PA")]
    Pa,
    #[serde(rename = "BA")]
    Ba,
    #[serde(rename = "OBP")]
    Obp,
    #[serde(rename = "SLG")]
    Slg,
    #[serde(rename = "OPS")]
    Ops,
    #[serde(rename = "ISO")]
    Iso,
    #[serde(rename = "BABIP")]
    Babip,
    #[serde(rename = "K%")]
    KPct,
    #[serde(rename = "BB%")]
    BbPct,
    #[serde(rename = "HR%")]
    HrPct,
    #[serde(rename = "wOBA")]
    Woba,
    #[serde(rename = "wRAA")]
    Wraa,
    #[serde(rename = "wRC")]
    Wrc,
    #[serde(rename = "IP")]
    Ip,
    #[serde(rename = "BF")]
    Bf,
    #[serde(rename = "ERA")]
    Era,
    #[serde(rename = "FIP")]
    Fip,
    #[serde(rename = "WHIP")]
    Whip,
    #[serde(rename = "BA-against")]
    BaAgainst,
    #[serde(rename = "OBP-against")]
    ObpAgainst,
    #[serde(rename = "SLG-against")]
    SlgAgainst,
    #[serde(rename = "OPS-against")]
    OpsAgainst,
    #[serde(rename = "BABIP-against")]
    BabipAgainst,
    #[serde(rename = "wOBA-against")]
    WobaAgainst,
    #[serde(rename = "K/PA")]
    KPerPa,
    #[serde(rename = "BB/PA")]
    BbPerPa,
    #[serde(rename = "HR-A/PA")]
    HrAPerPa,
    #[serde(rename = "K/9")]
    KPer9,
    #[serde(rename = "BB/9")]
    BbPer9,
    #[serde(rename = "Pitches/PA")]
    PitchesPerPa,
    #[serde(rename = "IP/App")]
    IpPerApp,
}

impl Metric {
    pub const ALL: [Metric; 31] = [
        Metric::Pa,
        Metric::Ba,
        Metric::Obp,
        Metric::Slg,
        Metric::Ops,
        Metric::Iso,
        Metric::Babip,
        Metric::KPct,
        Metric::BbPct,
        Metric::HrPct,
        Metric::Woba,
        Metric::Wraa,
        Metric::Wrc,
        Metric::Ip,
        Metric::Bf,
        Metric::Era,
        Metric::Fip,
        Metric::Whip,
        Metric::BaAgainst,
        Metric::ObpAgainst,
        Metric::SlgAgainst,
        Metric::OpsAgainst,
        Metric::BabipAgainst,
        Metric::WobaAgainst,
        Metric::KPerPa,
        Metric::BbPerPa,
        Metric::HrAPerPa,
        Metric::KPer9,
        Metric::BbPer9,
        Metric::PitchesPerPa,
        Metric::IpPerApp,
    ];

    /// Batting columns the season leaderboards rank.
    pub const BATTING_PERCENTILES: [Metric; 12] = [
        Metric::Obp,
        Metric::Ba,
        Metric::Slg,
        Metric::Ops,
        Metric::Iso,
        Metric::HrPct,
        Metric::KPct,
        Metric::BbPct,
        Metric::Babip,
        Metric::Woba,
        Metric::Wraa,
        Metric::Wrc,
    ];

    /// Pitching columns the season leaderboards rank.
    pub const PITCHING_PERCENTILES: [Metric; 14] = [
        Metric::Era,
        Metric::Ip,
        Metric::Bf,
        Metric::ObpAgainst,
        Metric::BaAgainst,
        Metric::SlgAgainst,
        Metric::OpsAgainst,
        Metric::KPerPa,
        Metric::KPer9,
        Metric::BbPerPa,
        Metric::BbPer9,
        Metric::Fip,
        Metric::Whip,
        Metric::HrAPerPa,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Pa => "PA",
            Metric::Ba => "BA",
            Metric::Obp => "OBP",
            Metric::Slg => "SLG",
            Metric::Ops => "OPS",
            Metric::Iso => "ISO",
            Metric::Babip => "BABIP",
            Metric::KPct => "K%",
            Metric::BbPct => "BB%",
            Metric::HrPct => "HR%",
            Metric::Woba => "wOBA",
            Metric::Wraa => "wRAA",
            Metric::Wrc => "wRC",
            Metric::Ip => "IP",
            Metric::Bf => "BF",
            Metric::Era => "ERA",
            Metric::Fip => "FIP",
            Metric::Whip => "WHIP",
            Metric::BaAgainst => "BA-against",
            Metric::ObpAgainst => "OBP-against",
            Metric::SlgAgainst => "SLG-against",
            Metric::OpsAgainst => "OPS-against",
            Metric::BabipAgainst => "BABIP-against",
            Metric::WobaAgainst => "wOBA-against",
            Metric::KPerPa => "K/PA",
            Metric::BbPerPa => "BB/PA",
            Metric::HrAPerPa => "HR-A/PA",
            Metric::KPer9 => "K/9",
            Metric::BbPer9 => "BB/9",
            Metric::PitchesPerPa => "Pitches/PA",
            Metric::IpPerApp => "IP/App",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric column `{0}`")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| UnknownMetric(wanted.to_string()))
    }
}

/// A derived row the percentile ranker can read metrics from.
pub trait MetricRow {
    fn identity(&self) -> &Identity;

    /// Value of `metric` for this row; `None` when undefined or when the
    /// metric does not apply to this kind of row.
    fn metric(&self, metric: Metric) -> Option<f64>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
