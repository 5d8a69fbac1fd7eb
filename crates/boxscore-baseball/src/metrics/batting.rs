// Batting rate stats derived from counting stats.

use crate::constants::{ConstantsProvider, ConstantsSource, ResolvedConstants, SeasonConstants};
use crate::metrics::ratio::{difference, finite, ratio, sum};
use crate::model::{BattingLine, Identity, Metric, MetricRow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Computed batting columns. `None` means the rate is undefined for this row
/// (zero denominator, or no constants for wOBA and friends).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattingMetrics {
    /// H - 2B - 3B - HR. Negative only when the source data is inconsistent.
    #[serde(rename = "1B")]
    pub singles: i64,
    #[serde(rename = "BA")]
    pub ba: Option<f64>,
    #[serde(rename = "OBP")]
    pub obp: Option<f64>,
    #[serde(rename = "SLG")]
    pub slg: Option<f64>,
    #[serde(rename = "OPS")]
    pub ops: Option<f64>,
    #[serde(rename = "ISO")]
    pub iso: Option<f64>,
    #[serde(rename = "BABIP")]
    pub babip: Option<f64>,
    #[serde(rename = "K%")]
    pub k_pct: Option<f64>,
    #[serde(rename = "BB%")]
    pub bb_pct: Option<f64>,
    #[serde(rename = "HR%")]
    pub hr_pct: Option<f64>,
    #[serde(rename = "wOBA")]
    pub woba: Option<f64>,
    #[serde(rename = "wRAA")]
    pub wraa: Option<f64>,
    #[serde(rename = "wRC")]
    pub wrc: Option<f64>,
    /// Which season's constants fed wOBA/wRAA/wRC; `None` if none were found.
    pub constants: Option<ConstantsSource>,
}

/// A batting line with its derived columns appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattingRow {
    pub line: BattingLine,
    pub metrics: BattingMetrics,
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

fn singles(line: &BattingLine) -> i64 {
    i64::from(line.h) - i64::from(line.doubles) - i64::from(line.triples) - i64::from(line.hr)
}

fn total_bases(line: &BattingLine, singles: i64) -> f64 {
    singles as f64
        + 2.0 * f64::from(line.doubles)
        + 3.0 * f64::from(line.triples)
        + 4.0 * f64::from(line.hr)
}

/// (BB·wBB + HBP·wHBP + 1B·w1B + 2B·w2B + 3B·w3B + HR·wHR) / PA
fn woba(line: &BattingLine, singles: i64, c: &SeasonConstants) -> Option<f64> {
    let weighted = c.w_bb * f64::from(line.bb)
        + c.w_hbp * f64::from(line.hbp)
        + c.w_1b * singles as f64
        + c.w_2b * f64::from(line.doubles)
        + c.w_3b * f64::from(line.triples)
        + c.w_hr * f64::from(line.hr);
    ratio(weighted, f64::from(line.pa))
}

/// Runs above average per PA: (wOBA - lg_wOBA) / wOBA scale.
fn runs_above_average_rate(woba: Option<f64>, c: &SeasonConstants) -> Option<f64> {
    woba.and_then(|w| ratio(w - c.league_woba, c.woba_scale))
}

/// Derive every batting column for a single line.
pub fn batting_metrics(line: &BattingLine, constants: Option<&ResolvedConstants>) -> BattingMetrics {
    let singles = singles(line);
    let ab = f64::from(line.ab);
    let pa = f64::from(line.pa);
    let h = f64::from(line.h);
    let hr = f64::from(line.hr);
    let bb = f64::from(line.bb);
    let hbp = f64::from(line.hbp);
    let sf = f64::from(line.sf);
    let k = f64::from(line.k);

    let ba = ratio(h, ab);
    let obp = ratio(h + bb + hbp, ab + bb + hbp + sf);
    let slg = ratio(total_bases(line, singles), ab);
    let ops = sum(obp, slg);
    let iso = difference(slg, ba);
    // Sacrifice flies alone never make BABIP defined.
    let babip = if line.ab == 0 {
        None
    } else {
        ratio(h - hr, ab - k - hr + sf)
    };

    let (woba, wraa, wrc) = match constants {
        Some(resolved) => {
            let c = &resolved.values;
            let woba = woba(line, singles, c);
            let raa_rate = runs_above_average_rate(woba, c);
            let wraa = raa_rate.and_then(|r| finite(r * pa));
            let wrc = raa_rate.and_then(|r| finite((r + c.league_r_per_pa) * pa));
            (woba, wraa, wrc)
        }
        None => (None, None, None),
    };

    BattingMetrics {
        singles,
        ba,
        obp,
        slg,
        ops,
        iso,
        babip,
        k_pct: ratio(k, pa),
        bb_pct: ratio(bb, pa),
        hr_pct: ratio(hr, pa),
        woba,
        wraa,
        wrc,
        constants: constants.map(|c| c.source.clone()),
    }
}

/// Derive batting metrics for a whole table. Output order matches input
/// order and each row depends only on its own line and season.
pub fn derive_batting_metrics<P>(rows: &[BattingLine], constants: &P) -> Vec<BattingRow>
where
    P: ConstantsProvider + ?Sized,
{
    let mut by_season: HashMap<u16, Option<ResolvedConstants>> = HashMap::new();
    let out: Vec<BattingRow> = rows
        .iter()
        .map(|line| {
            let season = line.identity.season;
            let resolved = by_season
                .entry(season)
                .or_insert_with(|| constants.resolve(season));
            BattingRow {
                line: line.clone(),
                metrics: batting_metrics(line, resolved.as_ref()),
            }
        })
        .collect();
    debug!("derived batting metrics for {} rows", out.len());
    out
}

impl MetricRow for BattingRow {
    fn identity(&self) -> &Identity {
        &self.line.identity
    }

    fn metric(&self, metric: Metric) -> Option<f64> {
        let m = &self.metrics;
        match metric {
            Metric::Pa => Some(f64::from(self.line.pa)),
            Metric::Ba => m.ba,
            Metric::Obp => m.obp,
            Metric::Slg => m.slg,
            Metric::Ops => m.ops,
            Metric::Iso => m.iso,
            Metric::Babip => m.babip,
            Metric::KPct => m.k_pct,
            Metric::BbPct => m.bb_pct,
            Metric::HrPct => m.hr_pct,
            Metric::Woba => m.woba,
            Metric::Wraa => m.wraa,
            Metric::Wrc => m.wrc,
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::LinearWeightsTable;
    use std::collections::BTreeMap;

    const EPS: f64 = 1e-9;

    fn identity(season: u16) -> Identity {
        Identity {
            id: "1".into(),
            name: "Test Hitter".into(),
            school: "Cornell".into(),
            class_year: Some("Jr".into()),
            position: Some("OF".into()),
            season,
        }
    }

    /// 200 PA: 170 AB, 50 H (10 2B, 2 3B, 8 HR), 20 BB, 5 HBP, 3 SF, 2 SH, 40 K.
    fn line() -> BattingLine {
        BattingLine {
            identity: identity(2021),
            gp: 50,
            pa: 200,
            ab: 170,
            h: 50,
            doubles: 10,
            triples: 2,
            hr: 8,
            bb: 20,
            ibb: 0,
            hbp: 5,
            sf: 3,
            sh: 2,
            k: 40,
            rbi: 30,
            r: 35,
        }
    }

    fn unit_constants() -> SeasonConstants {
        SeasonConstants {
            w_bb: 0.7,
            w_hbp: 0.7,
            w_1b: 0.9,
            w_2b: 1.25,
            w_3b: 1.6,
            w_hr: 2.0,
            league_woba: 0.35,
            woba_scale: 1.2,
            league_r_per_pa: 0.14,
            fip_constant: 4.8,
        }
    }

    fn provider() -> BTreeMap<u16, SeasonConstants> {
        let mut m = BTreeMap::new();
        m.insert(2021, unit_constants());
        m
    }

    #[test]
    fn slash_line_formulas() {
        let m = batting_metrics(&line(), None);
        assert_eq!(m.singles, 30);
        assert!((m.ba.unwrap() - 50.0 / 170.0).abs() < EPS);
        assert!((m.obp.unwrap() - 75.0 / 198.0).abs() < EPS);
        // TB = 30 + 20 + 6 + 32 = 88
        assert!((m.slg.unwrap() - 88.0 / 170.0).abs() < EPS);
        // BABIP = (50 - 8) / (170 - 40 - 8 + 3)
        assert!((m.babip.unwrap() - 42.0 / 125.0).abs() < EPS);
        assert!((m.k_pct.unwrap() - 0.2).abs() < EPS);
        assert!((m.bb_pct.unwrap() - 0.1).abs() < EPS);
        assert!((m.hr_pct.unwrap() - 0.04).abs() < EPS);
    }

    #[test]
    fn iso_is_exactly_slg_minus_ba() {
        let m = batting_metrics(&line(), None);
        assert_eq!(m.iso.unwrap(), m.slg.unwrap() - m.ba.unwrap());
    }

    #[test]
    fn ops_is_obp_plus_slg() {
        let m = batting_metrics(&line(), None);
        assert_eq!(m.ops.unwrap(), m.obp.unwrap() + m.slg.unwrap());
    }

    #[test]
    fn zero_at_bats_leaves_ab_rates_undefined() {
        let mut l = line();
        l.ab = 0;
        l.h = 0;
        l.doubles = 0;
        l.triples = 0;
        l.hr = 0;
        l.k = 0;
        l.sf = 0;
        l.pa = 3;
        l.bb = 3;
        l.hbp = 0;
        let m = batting_metrics(&l, None);
        assert_eq!(m.ba, None);
        assert_eq!(m.slg, None);
        assert_eq!(m.babip, None);
        assert_eq!(m.iso, None);
        assert_eq!(m.ops, None);
        // OBP still defined from the walks.
        assert_eq!(m.obp, Some(1.0));
    }

    #[test]
    fn hitless_line_gives_real_zero_not_null() {
        let mut l = line();
        l.h = 0;
        l.doubles = 0;
        l.triples = 0;
        l.hr = 0;
        let m = batting_metrics(&l, None);
        assert_eq!(m.ba, Some(0.0));
        assert_eq!(m.slg, Some(0.0));
    }

    #[test]
    fn zero_pa_leaves_event_rates_undefined() {
        let mut l = line();
        l.pa = 0;
        let m = batting_metrics(&l, Some(&provider().resolve(2021).unwrap()));
        assert_eq!(m.k_pct, None);
        assert_eq!(m.bb_pct, None);
        assert_eq!(m.hr_pct, None);
        assert_eq!(m.woba, None);
        assert_eq!(m.wraa, None);
        assert_eq!(m.wrc, None);
    }

    #[test]
    fn sacrifice_fly_without_at_bats_leaves_babip_undefined() {
        let mut l = line();
        l.pa = 2;
        l.ab = 0;
        l.h = 0;
        l.doubles = 0;
        l.triples = 0;
        l.hr = 0;
        l.k = 0;
        l.bb = 1;
        l.hbp = 0;
        l.sf = 1;
        let m = batting_metrics(&l, None);
        assert_eq!(m.ba, None);
        assert_eq!(m.slg, None);
        assert_eq!(m.babip, None);
        assert_eq!(m.obp, Some(0.5));
    }

    #[test]
    fn babip_undefined_when_no_balls_in_play() {
        let mut l = line();
        l.ab = 10;
        l.k = 8;
        l.h = 2;
        l.doubles = 0;
        l.triples = 0;
        l.hr = 2;
        l.sf = 0;
        let m = batting_metrics(&l, None);
        assert_eq!(m.babip, None);
    }

    #[test]
    fn woba_family_uses_season_constants() {
        let p = provider();
        let m = batting_metrics(&line(), p.resolve(2021).as_ref());
        let c = unit_constants();
        let expected_woba =
            (0.7 * 20.0 + 0.7 * 5.0 + 0.9 * 30.0 + 1.25 * 10.0 + 1.6 * 2.0 + 2.0 * 8.0) / 200.0;
        assert!((m.woba.unwrap() - expected_woba).abs() < EPS);
        let raa_rate = (expected_woba - c.league_woba) / c.woba_scale;
        assert!((m.wraa.unwrap() - raa_rate * 200.0).abs() < EPS);
        assert!((m.wrc.unwrap() - (raa_rate + c.league_r_per_pa) * 200.0).abs() < EPS);
        assert_eq!(m.constants, Some(ConstantsSource::Exact { season: 2021 }));
    }

    #[test]
    fn missing_constants_null_only_the_woba_family() {
        let mut l = line();
        l.identity.season = 1999;
        let rows = derive_batting_metrics(&[l], &provider());
        let m = &rows[0].metrics;
        assert_eq!(m.woba, None);
        assert_eq!(m.wraa, None);
        assert_eq!(m.wrc, None);
        assert_eq!(m.constants, None);
        assert!(m.ba.is_some());
    }

    #[test]
    fn fallback_constants_are_recorded_on_the_row() {
        let table = LinearWeightsTable::from_seasons([(2021, unit_constants())], 5);
        let mut l = line();
        l.identity.season = 2022;
        let rows = derive_batting_metrics(&[l], &table);
        assert!(rows[0].metrics.constants.as_ref().unwrap().is_fallback());
        assert!(rows[0].metrics.woba.is_some());
    }

    #[test]
    fn raw_columns_carried_through_unchanged() {
        let rows = derive_batting_metrics(&[line()], &provider());
        assert_eq!(rows[0].line, line());
    }

    #[test]
    fn inconsistent_hits_do_not_panic() {
        let mut l = line();
        l.h = 5;
        l.doubles = 4;
        l.hr = 4;
        let m = batting_metrics(&l, None);
        assert_eq!(m.singles, -5);
        assert!(m.slg.is_some());
    }

    #[test]
    fn metric_lookup_ignores_pitching_columns() {
        let rows = derive_batting_metrics(&[line()], &provider());
        assert_eq!(rows[0].metric(Metric::Era), None);
        assert_eq!(rows[0].metric(Metric::Pa), Some(200.0));
        assert_eq!(rows[0].metric(Metric::Woba), rows[0].metrics.woba);
    }
}
