// Pitching rate stats and opponent slash lines.

use crate::constants::{ConstantsProvider, ConstantsSource, ResolvedConstants};
use crate::metrics::innings::normalize_innings;
use crate::metrics::ratio::{finite, per_nine, ratio, sum};
use crate::model::{Identity, Metric, MetricRow, PitchingLine};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// FIP weights on home runs, free passes, and strikeouts.
const FIP_HR_WEIGHT: f64 = 13.0;
const FIP_FREE_PASS_WEIGHT: f64 = 3.0;
const FIP_K_WEIGHT: f64 = 2.0;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchingMetrics {
    /// Innings converted from thirds notation; `None` when malformed.
    #[serde(rename = "IP_frac")]
    pub innings: Option<f64>,
    /// Set when the raw IP was not valid thirds notation. IP-denominated
    /// columns are then null while BF-denominated ones are still computed.
    pub ip_malformed: bool,
    #[serde(rename = "ERA")]
    pub era: Option<f64>,
    #[serde(rename = "WHIP")]
    pub whip: Option<f64>,
    #[serde(rename = "FIP")]
    pub fip: Option<f64>,
    #[serde(rename = "BA-against")]
    pub ba_against: Option<f64>,
    #[serde(rename = "OBP-against")]
    pub obp_against: Option<f64>,
    #[serde(rename = "SLG-against")]
    pub slg_against: Option<f64>,
    #[serde(rename = "OPS-against")]
    pub ops_against: Option<f64>,
    #[serde(rename = "BABIP-against")]
    pub babip_against: Option<f64>,
    #[serde(rename = "wOBA-against")]
    pub woba_against: Option<f64>,
    #[serde(rename = "K/PA")]
    pub k_per_pa: Option<f64>,
    #[serde(rename = "BB/PA")]
    pub bb_per_pa: Option<f64>,
    #[serde(rename = "HR-A/PA")]
    pub hr_a_per_pa: Option<f64>,
    #[serde(rename = "K/9")]
    pub k_per_9: Option<f64>,
    #[serde(rename = "BB/9")]
    pub bb_per_9: Option<f64>,
    #[serde(rename = "Pitches/PA")]
    pub pitches_per_pa: Option<f64>,
    #[serde(rename = "IP/App")]
    pub ip_per_app: Option<f64>,
    pub constants: Option<ConstantsSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchingRow {
    pub line: PitchingLine,
    pub metrics: PitchingMetrics,
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// Opponent at-bats rebuilt from batters faced. May be zero or negative on
/// inconsistent source data, in which case every AB-denominated rate is null.
fn at_bats_against(line: &PitchingLine) -> f64 {
    let ab = i64::from(line.bf)
        - i64::from(line.bb)
        - i64::from(line.hb)
        - i64::from(line.sfa)
        - i64::from(line.sha);
    ab as f64
}

fn singles_against(line: &PitchingLine) -> f64 {
    let singles = i64::from(line.h)
        - i64::from(line.doubles_a)
        - i64::from(line.triples_a)
        - i64::from(line.hr_a);
    singles as f64
}

/// Derive every pitching column for a single line.
pub fn pitching_metrics(line: &PitchingLine, constants: Option<&ResolvedConstants>) -> PitchingMetrics {
    let (innings, ip_malformed) = match normalize_innings(line.ip) {
        Ok(ip) => (Some(ip), false),
        Err(err) => {
            warn!(
                "{} ({}, {}): {}",
                line.identity.name, line.identity.school, line.identity.season, err
            );
            (None, true)
        }
    };

    let bf = f64::from(line.bf);
    let h = f64::from(line.h);
    let bb = f64::from(line.bb);
    let hb = f64::from(line.hb);
    let so = f64::from(line.so);
    let hr_a = f64::from(line.hr_a);
    let sfa = f64::from(line.sfa);
    let ab_a = at_bats_against(line);
    let singles_a = singles_against(line);
    let doubles_a = f64::from(line.doubles_a);
    let triples_a = f64::from(line.triples_a);

    let by_innings = |num: f64| innings.and_then(|ip| ratio(num, ip));

    let era = by_innings(9.0 * f64::from(line.er));
    let whip = by_innings(bb + h);
    let fip = constants.and_then(|c| {
        let raw = FIP_HR_WEIGHT * hr_a + FIP_FREE_PASS_WEIGHT * (bb + hb) - FIP_K_WEIGHT * so;
        by_innings(raw).and_then(|v| finite(v + c.values.fip_constant))
    });

    let ba_against = ratio(h, ab_a);
    let obp_against = ratio(h + bb + hb, ab_a + bb + hb + sfa);
    let slg_against = ratio(
        singles_a + 2.0 * doubles_a + 3.0 * triples_a + 4.0 * hr_a,
        ab_a,
    );
    let babip_against = if ab_a <= 0.0 {
        None
    } else {
        ratio(h - hr_a, ab_a - so - hr_a + sfa)
    };

    let woba_against = constants.and_then(|c| {
        let w = &c.values;
        let weighted = w.w_bb * bb
            + w.w_hbp * hb
            + w.w_1b * singles_a
            + w.w_2b * doubles_a
            + w.w_3b * triples_a
            + w.w_hr * hr_a;
        ratio(weighted, bf)
    });

    PitchingMetrics {
        innings,
        ip_malformed,
        era,
        whip,
        fip,
        ba_against,
        obp_against,
        slg_against,
        ops_against: sum(obp_against, slg_against),
        babip_against,
        woba_against,
        k_per_pa: ratio(so, bf),
        bb_per_pa: ratio(bb, bf),
        hr_a_per_pa: ratio(hr_a, bf),
        k_per_9: per_nine(so, innings),
        bb_per_9: per_nine(bb, innings),
        pitches_per_pa: line.pitches.and_then(|p| ratio(f64::from(p), bf)),
        ip_per_app: innings.and_then(|ip| ratio(ip, f64::from(line.app))),
        constants: constants.map(|c| c.source.clone()),
    }
}

/// Derive pitching metrics for a whole table, preserving input order.
pub fn derive_pitching_metrics<P>(rows: &[PitchingLine], constants: &P) -> Vec<PitchingRow>
where
    P: ConstantsProvider + ?Sized,
{
    let mut by_season: HashMap<u16, Option<ResolvedConstants>> = HashMap::new();
    let out: Vec<PitchingRow> = rows
        .iter()
        .map(|line| {
            let season = line.identity.season;
            let resolved = by_season
                .entry(season)
                .or_insert_with(|| constants.resolve(season));
            PitchingRow {
                line: line.clone(),
                metrics: pitching_metrics(line, resolved.as_ref()),
            }
        })
        .collect();
    let malformed = out.iter().filter(|r| r.metrics.ip_malformed).count();
    debug!(
        "derived pitching metrics for {} rows ({} with malformed IP)",
        out.len(),
        malformed
    );
    out
}

impl MetricRow for PitchingRow {
    fn identity(&self) -> &Identity {
        &self.line.identity
    }

    fn metric(&self, metric: Metric) -> Option<f64> {
        let m = &self.metrics;
        match metric {
            Metric::Ip => m.innings,
            Metric::Bf => Some(f64::from(self.line.bf)),
            Metric::Era => m.era,
            Metric::Fip => m.fip,
            Metric::Whip => m.whip,
            Metric::BaAgainst => m.ba_against,
            Metric::ObpAgainst => m.obp_against,
            Metric::SlgAgainst => m.slg_against,
            Metric::OpsAgainst => m.ops_against,
            Metric::BabipAgainst => m.babip_against,
            Metric::WobaAgainst => m.woba_against,
            Metric::KPerPa => m.k_per_pa,
            Metric::BbPerPa => m.bb_per_pa,
            Metric::HrAPerPa => m.hr_a_per_pa,
            Metric::KPer9 => m.k_per_9,
            Metric::BbPer9 => m.bb_per_9,
            Metric::PitchesPerPa => m.pitches_per_pa,
            Metric::IpPerApp => m.ip_per_app,
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
