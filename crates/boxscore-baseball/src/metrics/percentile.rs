// Quantile-bucket percentiles over a population of derived rows.
//
// Buckets are equal-frequency: edges are the population's own quantiles,
// duplicate edges collapse, and each value lands in the right-closed
// interval containing it. Lower-is-better metrics are negated before
// bucketing so the top bucket always means "best".

use crate::model::{Identity, Metric, MetricRow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const DEFAULT_BUCKETS: usize = 100;

/// Largest bucket count; percentiles are reported as `u8`.
pub const MAX_BUCKETS: usize = 100;

/// Metrics where a lower raw value is better.
pub const DEFAULT_INVERTED: [Metric; 13] = [
    Metric::Era,
    Metric::Fip,
    Metric::Whip,
    Metric::BaAgainst,
    Metric::ObpAgainst,
    Metric::SlgAgainst,
    Metric::OpsAgainst,
    Metric::BabipAgainst,
    Metric::WobaAgainst,
    Metric::BbPerPa,
    Metric::BbPer9,
    Metric::HrAPerPa,
    Metric::KPct,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentileConfig {
    /// Number of quantile buckets; percentiles run `0..buckets`. Counts
    /// above `MAX_BUCKETS` are ranked as `MAX_BUCKETS`.
    pub buckets: usize,
    pub inverted: BTreeSet<Metric>,
}

impl Default for PercentileConfig {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_BUCKETS,
            inverted: DEFAULT_INVERTED.into_iter().collect(),
        }
    }
}

impl PercentileConfig {
    pub fn is_inverted(&self, metric: Metric) -> bool {
        self.inverted.contains(&metric)
    }
}

/// Percentile bucket per requested metric for one row. `None` means the
/// row's value was null or the population had no spread for that metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileRow {
    pub identity: Identity,
    pub percentiles: BTreeMap<Metric, Option<u8>>,
}

impl PercentileRow {
    pub fn get(&self, metric: Metric) -> Option<u8> {
        self.percentiles.get(&metric).copied().flatten()
    }
}

// ---------------------------------------------------------------------------
// Quantile edges
// ---------------------------------------------------------------------------

/// Linear-interpolated quantile of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// `buckets + 1` quantile edges with duplicates removed.
fn bucket_edges(values: &[f64], buckets: usize) -> Vec<f64> {
    if values.is_empty() || buckets == 0 {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut edges: Vec<f64> = Vec::with_capacity(buckets + 1);
    for i in 0..=buckets {
        let edge = quantile(&sorted, i as f64 / buckets as f64);
        if edges.last().map_or(true, |last| *last < edge) {
            edges.push(edge);
        }
    }
    edges
}

/// Index of the interval `(edges[i], edges[i + 1]]` holding `value`; the
/// first interval is closed on the left too.
fn bucket_of(edges: &[f64], value: f64) -> usize {
    let above = edges.partition_point(|e| *e < value);
    above.saturating_sub(1).min(edges.len() - 2)
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

fn signed(value: f64, inverted: bool) -> f64 {
    if inverted {
        -value
    } else {
        value
    }
}

/// Bucket each row's value for one metric. Output is aligned with `values`.
fn rank_metric(values: &[Option<f64>], buckets: usize, inverted: bool) -> Vec<Option<u8>> {
    let buckets = buckets.min(MAX_BUCKETS);
    let present: Vec<f64> = values
        .iter()
        .flatten()
        .filter(|v| v.is_finite())
        .map(|v| signed(*v, inverted))
        .collect();
    let edges = bucket_edges(&present, buckets);
    if edges.len() < 2 {
        return vec![None; values.len()];
    }
    values
        .iter()
        .map(|v| {
            v.filter(|v| v.is_finite())
                .and_then(|v| u8::try_from(bucket_of(&edges, signed(v, inverted))).ok())
        })
        .collect()
}

/// Rank `population` on each of `metrics`, one output row per input row in
/// the same order. Metrics are ranked independently of each other.
pub fn rank_percentiles<R: MetricRow>(
    population: &[R],
    metrics: &[Metric],
    config: &PercentileConfig,
) -> Vec<PercentileRow> {
    let mut out: Vec<PercentileRow> = population
        .iter()
        .map(|row| PercentileRow {
            identity: row.identity().clone(),
            percentiles: BTreeMap::new(),
        })
        .collect();

    for &metric in metrics {
        let values: Vec<Option<f64>> = population.iter().map(|row| row.metric(metric)).collect();
        let ranked = rank_metric(&values, config.buckets, config.is_inverted(metric));
        if ranked.iter().all(Option::is_none) {
            debug!("no percentile spread for {} over {} rows", metric, population.len());
        }
        for (row, pct) in out.iter_mut().zip(ranked) {
            row.percentiles.insert(metric, pct);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        identity: Identity,
        value: Option<f64>,
    }

    impl MetricRow for Row {
        fn identity(&self) -> &Identity {
            &self.identity
        }

        fn metric(&self, metric: Metric) -> Option<f64> {
            match metric {
                Metric::Ba | Metric::Era => self.value,
                _ => None,
            }
        }
    }

    fn rows(values: &[Option<f64>]) -> Vec<Row> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Row {
                identity: Identity {
                    id: i.to_string(),
                    name: format!("Player {i}"),
                    school: "Brown".into(),
                    class_year: None,
                    position: None,
                    season: 2021,
                },
                value: *v,
            })
            .collect()
    }

    fn one_to_hundred() -> Vec<Row> {
        let values: Vec<Option<f64>> = (1..=100).map(|v| Some(f64::from(v))).collect();
        rows(&values)
    }

    #[test]
    fn extremes_land_in_end_buckets() {
        let ranked = rank_percentiles(&one_to_hundred(), &[Metric::Ba], &PercentileConfig::default());
        assert_eq!(ranked[99].get(Metric::Ba), Some(99));
        assert_eq!(ranked[0].get(Metric::Ba), Some(0));
    }

    #[test]
    fn each_value_gets_its_own_bucket_on_uniform_data() {
        let ranked = rank_percentiles(&one_to_hundred(), &[Metric::Ba], &PercentileConfig::default());
        for (i, row) in ranked.iter().enumerate() {
            assert_eq!(row.get(Metric::Ba), Some(i as u8));
        }
    }

    #[test]
    fn inverted_metric_ranks_lowest_value_best() {
        let ranked = rank_percentiles(&one_to_hundred(), &[Metric::Era], &PercentileConfig::default());
        assert_eq!(ranked[0].get(Metric::Era), Some(99));
        assert_eq!(ranked[99].get(Metric::Era), Some(0));
    }

    #[test]
    fn ranking_is_idempotent() {
        let population = one_to_hundred();
        let config = PercentileConfig::default();
        let first = rank_percentiles(&population, &[Metric::Ba, Metric::Era], &config);
        let second = rank_percentiles(&population, &[Metric::Ba, Metric::Era], &config);
        assert_eq!(first, second);
    }

    #[test]
    fn single_distinct_value_gives_null() {
        let ranked = rank_percentiles(
            &rows(&[Some(0.3), Some(0.3), Some(0.3)]),
            &[Metric::Ba],
            &PercentileConfig::default(),
        );
        assert!(ranked.iter().all(|r| r.get(Metric::Ba).is_none()));
    }

    #[test]
    fn empty_population_gives_no_rows() {
        let ranked = rank_percentiles(&rows(&[]), &[Metric::Ba], &PercentileConfig::default());
        assert!(ranked.is_empty());
    }

    #[test]
    fn null_values_stay_null_and_do_not_shift_others() {
        let ranked = rank_percentiles(
            &rows(&[Some(0.1), None, Some(0.3), Some(f64::NAN)]),
            &[Metric::Ba],
            &PercentileConfig::default(),
        );
        assert_eq!(ranked[0].get(Metric::Ba), Some(0));
        assert_eq!(ranked[1].get(Metric::Ba), None);
        assert_eq!(ranked[2].get(Metric::Ba), Some(99));
        assert_eq!(ranked[3].get(Metric::Ba), None);
    }

    #[test]
    fn ties_share_a_bucket() {
        let ranked = rank_percentiles(
            &rows(&[Some(1.0), Some(1.0), Some(1.0), Some(2.0)]),
            &[Metric::Ba],
            &PercentileConfig::default(),
        );
        let low = ranked[0].get(Metric::Ba);
        assert!(ranked[..3].iter().all(|r| r.get(Metric::Ba) == low));
        assert!(ranked[3].get(Metric::Ba) > low);
    }

    #[test]
    fn permuting_rows_permutes_output() {
        let forward = rows(&[Some(0.2), Some(0.4), Some(0.1), Some(0.3)]);
        let backward = rows(&[Some(0.3), Some(0.1), Some(0.4), Some(0.2)]);
        let config = PercentileConfig::default();
        let a: Vec<_> = rank_percentiles(&forward, &[Metric::Ba], &config)
            .iter()
            .map(|r| r.get(Metric::Ba))
            .collect();
        let b: Vec<_> = rank_percentiles(&backward, &[Metric::Ba], &config)
            .iter()
            .map(|r| r.get(Metric::Ba))
            .rev()
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn fewer_buckets_compress_the_scale() {
        let config = PercentileConfig {
            buckets: 4,
            ..PercentileConfig::default()
        };
        let ranked = rank_percentiles(&one_to_hundred(), &[Metric::Ba], &config);
        assert_eq!(ranked[0].get(Metric::Ba), Some(0));
        assert_eq!(ranked[99].get(Metric::Ba), Some(3));
        assert_eq!(ranked[49].get(Metric::Ba), Some(1));
    }

    #[test]
    fn oversized_bucket_count_is_capped() {
        let config = PercentileConfig {
            buckets: 300,
            ..PercentileConfig::default()
        };
        let ranked = rank_percentiles(&one_to_hundred(), &[Metric::Ba], &config);
        assert_eq!(ranked[0].get(Metric::Ba), Some(0));
        assert_eq!(ranked[99].get(Metric::Ba), Some(99));
        let default =
            rank_percentiles(&one_to_hundred(), &[Metric::Ba], &PercentileConfig::default());
        assert_eq!(ranked, default);
    }

    #[test]
    fn unrequested_metrics_are_absent() {
        let ranked = rank_percentiles(&one_to_hundred(), &[Metric::Ba], &PercentileConfig::default());
        assert!(!ranked[0].percentiles.contains_key(&Metric::Obp));
    }
}
