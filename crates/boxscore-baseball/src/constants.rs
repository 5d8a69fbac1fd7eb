// Season constants: linear weights and league run environment.
//
// wOBA, wRAA, wRC, wOBA-against, and FIP all need per-season constants. The
// engine reads them through `ConstantsProvider` so callers (and tests) can
// inject any table. `LinearWeightsTable` is the stock implementation: exact
// seasons come straight from the table, other seasons average the nearest
// known ones.

use crate::loaders::{open, LoadError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Number of neighbouring seasons averaged for a season the table lacks.
pub const DEFAULT_FALLBACK_WINDOW: usize = 5;

const BUNDLED_LINEAR_WEIGHTS: &str = include_str!("../defaults/linear_weights.csv");

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Linear weights and league constants for one season.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonConstants {
    pub w_bb: f64,
    pub w_hbp: f64,
    pub w_1b: f64,
    pub w_2b: f64,
    pub w_3b: f64,
    pub w_hr: f64,
    pub league_woba: f64,
    pub woba_scale: f64,
    pub league_r_per_pa: f64,
    pub fip_constant: f64,
}

impl SeasonConstants {
    fn fields(&self) -> [f64; 10] {
        [
            self.w_bb,
            self.w_hbp,
            self.w_1b,
            self.w_2b,
            self.w_3b,
            self.w_hr,
            self.league_woba,
            self.woba_scale,
            self.league_r_per_pa,
            self.fip_constant,
        ]
    }

    fn from_fields(f: [f64; 10]) -> Self {
        Self {
            w_bb: f[0],
            w_hbp: f[1],
            w_1b: f[2],
            w_2b: f[3],
            w_3b: f[4],
            w_hr: f[5],
            league_woba: f[6],
            woba_scale: f[7],
            league_r_per_pa: f[8],
            fip_constant: f[9],
        }
    }

    /// Field-wise mean. Returns `None` for an empty slice.
    pub fn mean(items: &[SeasonConstants]) -> Option<SeasonConstants> {
        if items.is_empty() {
            return None;
        }
        let n = items.len() as f64;
        let mut acc = [0.0_f64; 10];
        for item in items {
            for (slot, v) in acc.iter_mut().zip(item.fields()) {
                *slot += v;
            }
        }
        Some(Self::from_fields(acc.map(|v| v / n)))
    }
}

/// Where a row's constants came from. Carried on derived rows so a fallback
/// season is visible to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstantsSource {
    /// The table had the requested season.
    Exact { season: u16 },
    /// The requested season was missing; these seasons were averaged.
    Fallback { requested: u16, seasons: Vec<u16> },
}

impl ConstantsSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ConstantsSource::Fallback { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConstants {
    pub values: SeasonConstants,
    pub source: ConstantsSource,
}

/// Season-keyed constants lookup.
pub trait ConstantsProvider {
    /// Constants for `season`, or `None` when nothing usable exists.
    fn resolve(&self, season: u16) -> Option<ResolvedConstants>;
}

/// A plain map resolves exact seasons only.
impl ConstantsProvider for BTreeMap<u16, SeasonConstants> {
    fn resolve(&self, season: u16) -> Option<ResolvedConstants> {
        self.get(&season).map(|values| ResolvedConstants {
            values: *values,
            source: ConstantsSource::Exact { season },
        })
    }
}

// ---------------------------------------------------------------------------
// LinearWeightsTable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct LinearWeightsTable {
    seasons: BTreeMap<u16, SeasonConstants>,
    fallback_window: usize,
}

impl LinearWeightsTable {
    pub fn new(fallback_window: usize) -> Self {
        Self {
            seasons: BTreeMap::new(),
            fallback_window: fallback_window.max(1),
        }
    }

    pub fn from_seasons(
        seasons: impl IntoIterator<Item = (u16, SeasonConstants)>,
        fallback_window: usize,
    ) -> Self {
        let mut table = Self::new(fallback_window);
        table.seasons.extend(seasons);
        table
    }

    /// The table shipped with the crate (2013-2021).
    pub fn bundled(fallback_window: usize) -> Result<Self, LoadError> {
        Self::from_reader(BUNDLED_LINEAR_WEIGHTS.as_bytes(), fallback_window).map_err(|e| {
            LoadError::Csv {
                path: "<bundled linear_weights.csv>".into(),
                source: e,
            }
        })
    }

    pub fn insert(&mut self, season: u16, constants: SeasonConstants) {
        self.seasons.insert(season, constants);
    }

    pub fn len(&self) -> usize {
        self.seasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }

    pub fn fallback_window(&self) -> usize {
        self.fallback_window
    }

    pub fn seasons(&self) -> impl Iterator<Item = u16> + '_ {
        self.seasons.keys().copied()
    }

    /// The `fallback_window` known seasons closest to `season`, ties going to
    /// the earlier season, returned in ascending order.
    pub fn nearest_seasons(&self, season: u16) -> Vec<u16> {
        let mut known: Vec<u16> = self.seasons.keys().copied().collect();
        known.sort_by_key(|s| (s.abs_diff(season), *s));
        known.truncate(self.fallback_window);
        known.sort_unstable();
        known
    }

    fn from_reader<R: Read>(rdr: R, fallback_window: usize) -> Result<Self, csv::Error> {
        let mut reader = csv::Reader::from_reader(rdr);
        let mut table = Self::new(fallback_window);
        for result in reader.deserialize::<RawLinearWeights>() {
            match result {
                Ok(raw) => {
                    let values = raw.constants();
                    if !values.fields().iter().all(|v| v.is_finite()) {
                        warn!("skipping linear weights for {}: non-finite value", raw.season);
                        continue;
                    }
                    if values.woba_scale <= 0.0 {
                        warn!("skipping linear weights for {}: wOBA scale must be > 0", raw.season);
                        continue;
                    }
                    if table.seasons.insert(raw.season, values).is_some() {
                        warn!("duplicate linear weights for {}, using latest row", raw.season);
                    }
                }
                Err(e) => {
                    warn!("skipping malformed linear weights row: {}", e);
                }
            }
        }
        Ok(table)
    }
}

impl ConstantsProvider for LinearWeightsTable {
    fn resolve(&self, season: u16) -> Option<ResolvedConstants> {
        if let Some(values) = self.seasons.get(&season) {
            return Some(ResolvedConstants {
                values: *values,
                source: ConstantsSource::Exact { season },
            });
        }
        let seasons = self.nearest_seasons(season);
        let picked: Vec<SeasonConstants> = seasons
            .iter()
            .filter_map(|s| self.seasons.get(s).copied())
            .collect();
        let values = SeasonConstants::mean(&picked)?;
        debug!(
            "no linear weights for {}; averaging seasons {:?}",
            season, seasons
        );
        Some(ResolvedConstants {
            values,
            source: ConstantsSource::Fallback {
                requested: season,
                seasons,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawLinearWeights {
    season: u16,
    wBB: f64,
    wHBP: f64,
    w1B: f64,
    w2B: f64,
    w3B: f64,
    wHR: f64,
    lg_wOBA: f64,
    wOBA_scale: f64,
    R_PA: f64,
    cFIP: f64,
}

impl RawLinearWeights {
    fn constants(&self) -> SeasonConstants {
        SeasonConstants {
            w_bb: self.wBB,
            w_hbp: self.wHBP,
            w_1b: self.w1B,
            w_2b: self.w2B,
            w_3b: self.w3B,
            w_hr: self.wHR,
            league_woba: self.lg_wOBA,
            woba_scale: self.wOBA_scale,
            league_r_per_pa: self.R_PA,
            fip_constant: self.cFIP,
        }
    }
}

/// Load a linear-weights CSV
/// (`season,wBB,wHBP,w1B,w2B,w3B,wHR,lg_wOBA,wOBA_scale,R_PA,cFIP`).
pub fn load_linear_weights(
    path: &Path,
    fallback_window: usize,
) -> Result<LinearWeightsTable, LoadError> {
    let file = open(path)?;
    let table = LinearWeightsTable::from_reader(file, fallback_window).map_err(|e| {
        LoadError::Csv {
            path: path.display().to_string(),
            source: e,
        }
    })?;
    if table.is_empty() {
        return Err(LoadError::Validation(format!(
            "linear weights CSV {} produced zero valid seasons",
            path.display()
        )));
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
