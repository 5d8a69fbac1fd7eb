// Population selection applied to derived rows before percentile ranking.

use crate::metrics::{BattingRow, PitchingRow};
use crate::model::Identity;
use serde::{Deserialize, Serialize};

/// Class-year filter value that selects rows with no recorded class year.
pub const OTHER_CLASS_YEAR: &str = "other";

/// Which rows make up the ranking population.
///
/// Empty lists mean "no restriction". Text matching ignores ASCII case.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationFilter {
    pub schools: Vec<String>,
    pub positions: Vec<String>,
    /// `Fr`, `So`, `Jr`, `Sr`, or `other` for rows without a class year.
    pub class_years: Vec<String>,
    /// Minimum plate appearances for batting rows.
    pub min_pa: u32,
    /// Minimum innings (true fraction, not thirds notation) for pitching rows.
    pub min_ip: f64,
}

fn listed(allowed: &[String], value: Option<&str>) -> bool {
    allowed.is_empty()
        || value.is_some_and(|v| allowed.iter().any(|a| a.eq_ignore_ascii_case(v)))
}

impl PopulationFilter {
    pub fn matches_identity(&self, identity: &Identity) -> bool {
        let class_year_ok = self.class_years.is_empty()
            || self.class_years.iter().any(|wanted| match &identity.class_year {
                Some(cy) => wanted.eq_ignore_ascii_case(cy),
                None => wanted.eq_ignore_ascii_case(OTHER_CLASS_YEAR),
            });
        listed(&self.schools, Some(identity.school.as_str()))
            && listed(&self.positions, identity.position.as_deref())
            && class_year_ok
    }

    pub fn admits_batter(&self, row: &BattingRow) -> bool {
        row.line.pa >= self.min_pa && self.matches_identity(&row.line.identity)
    }

    /// A positive `min_ip` is never met by a row whose IP could not be read.
    pub fn admits_pitcher(&self, row: &PitchingRow) -> bool {
        let innings_ok = self.min_ip <= 0.0
            || row.metrics.innings.is_some_and(|ip| ip >= self.min_ip);
        innings_ok && self.matches_identity(&row.line.identity)
    }

    pub fn batting(&self, rows: &[BattingRow]) -> Vec<BattingRow> {
        rows.iter().filter(|r| self.admits_batter(r)).cloned().collect()
    }

    pub fn pitching(&self, rows: &[PitchingRow]) -> Vec<PitchingRow> {
        rows.iter().filter(|r| self.admits_pitcher(r)).cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::batting::batting_metrics;
    use crate::metrics::pitching::pitching_metrics;
    use crate::model::{BattingLine, PitchingLine};

    fn identity(school: &str, class_year: Option<&str>, position: Option<&str>) -> Identity {
        Identity {
            id: format!("{school}-{class_year:?}"),
            name: "Someone".into(),
            school: school.into(),
            class_year: class_year.map(String::from),
            position: position.map(String::from),
            season: 2022,
        }
    }

    fn batter(identity: Identity, pa: u32) -> BattingRow {
        let line = BattingLine {
            identity,
            gp: 10,
            pa,
            ab: pa,
            h: pa / 4,
            doubles: 0,
            triples: 0,
            hr: 0,
            bb: 0,
            ibb: 0,
            hbp: 0,
            sf: 0,
            sh: 0,
            k: 0,
            rbi: 0,
            r: 0,
        };
        let metrics = batting_metrics(&line, None);
        BattingRow { line, metrics }
    }

    fn pitcher(ip: f64) -> PitchingRow {
        let line = PitchingLine {
            identity: identity("Penn", Some("So"), Some("P")),
            ip,
            bf: 40,
            h: 8,
            so: 10,
            bb: 3,
            er: 4,
            r: 5,
            hr_a: 1,
            hb: 0,
            doubles_a: 2,
            triples_a: 0,
            go: 10,
            fo: 8,
            w: 1,
            l: 0,
            sv: 0,
            app: 3,
            pitches: None,
            sfa: 0,
            sha: 0,
        };
        let metrics = pitching_metrics(&line, None);
        PitchingRow { line, metrics }
    }

    #[test]
    fn empty_filter_admits_everything() {
        let filter = PopulationFilter::default();
        let rows = vec![
            batter(identity("Yale", None, None), 0),
            batter(identity("Penn", Some("Sr"), Some("C")), 100),
        ];
        assert_eq!(filter.batting(&rows).len(), 2);
    }

    #[test]
    fn school_and_position_lists_restrict() {
        let filter = PopulationFilter {
            schools: vec!["yale".into()],
            positions: vec!["OF".into()],
            ..Default::default()
        };
        assert!(filter.matches_identity(&identity("Yale", Some("Jr"), Some("OF"))));
        assert!(!filter.matches_identity(&identity("Penn", Some("Jr"), Some("OF"))));
        assert!(!filter.matches_identity(&identity("Yale", Some("Jr"), None)));
    }

    #[test]
    fn other_class_year_matches_missing() {
        let filter = PopulationFilter {
            class_years: vec!["Fr".into(), OTHER_CLASS_YEAR.into()],
            ..Default::default()
        };
        assert!(filter.matches_identity(&identity("Yale", None, None)));
        assert!(filter.matches_identity(&identity("Yale", Some("Fr"), None)));
        assert!(!filter.matches_identity(&identity("Yale", Some("Sr"), None)));
    }

    #[test]
    fn min_pa_threshold() {
        let filter = PopulationFilter {
            min_pa: 50,
            ..Default::default()
        };
        let rows = vec![
            batter(identity("Yale", None, None), 49),
            batter(identity("Yale", None, None), 50),
        ];
        let kept = filter.batting(&rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].line.pa, 50);
    }

    #[test]
    fn min_ip_uses_true_innings_and_rejects_malformed() {
        let filter = PopulationFilter {
            min_ip: 10.5,
            ..Default::default()
        };
        // 10.1 is 10 1/3, short of 10.5; 10.2 is 10 2/3.
        assert!(!filter.admits_pitcher(&pitcher(10.1)));
        assert!(filter.admits_pitcher(&pitcher(10.2)));
        assert!(!filter.admits_pitcher(&pitcher(12.3)));
    }

    #[test]
    fn zero_min_ip_keeps_malformed_rows() {
        let filter = PopulationFilter::default();
        assert!(filter.admits_pitcher(&pitcher(12.3)));
    }
}
