use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A usage counter that records can be ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Clicks,
    Dist,
    Scrow,
    Keys,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Clicks, Metric::Dist, Metric::Scrow, Metric::Keys];

    /// Route segment, e.g. `clicks` in `/rank-clicks`.
    pub fn slug(self) -> &'static str {
        match self {
            Metric::Clicks => "clicks",
            Metric::Dist => "dist",
            Metric::Scrow => "scrow",
            Metric::Keys => "keys",
        }
    }

    /// Record field name, e.g. `quant_clicks`.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Clicks => "quant_clicks",
            Metric::Dist => "quant_dist",
            Metric::Scrow => "quant_scrow",
            Metric::Keys => "quant_keys",
        }
    }

    pub fn value_of(self, record: &MetricRecord) -> f64 {
        match self {
            Metric::Clicks => record.quant_clicks,
            Metric::Dist => record.quant_dist,
            Metric::Scrow => record.quant_scrow,
            Metric::Keys => record.quant_keys,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Metric {
    type Err = String;

    /// Accepts either the slug (`clicks`) or the column name (`quant_clicks`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.slug() == s || m.column() == s)
            .ok_or_else(|| format!("Unknown metric '{}'", s))
    }
}

/// Cumulative usage counters for one email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub user_github: String,
    pub email: String,
    pub quant_clicks: f64,
    pub quant_dist: f64,
    pub quant_scrow: f64,
    pub quant_keys: f64,
}

impl MetricRecord {
    /// Adds every counter of `delta` onto this record.
    ///
    /// Identity fields are left untouched: the first submission for an email
    /// owns its `user_github`. Counters saturate at `f64::MAX` so a record
    /// never holds a value JSON cannot represent.
    pub fn accumulate(&mut self, delta: &MetricRecord) {
        self.quant_clicks = saturating_sum(self.quant_clicks, delta.quant_clicks);
        self.quant_dist = saturating_sum(self.quant_dist, delta.quant_dist);
        self.quant_scrow = saturating_sum(self.quant_scrow, delta.quant_scrow);
        self.quant_keys = saturating_sum(self.quant_keys, delta.quant_keys);
    }
}

fn saturating_sum(total: f64, delta: f64) -> f64 {
    (total + delta).min(f64::MAX)
}

/// A validated `POST /metrics` body.
///
/// Optional counters that were not submitted are zero, which leaves the stored
/// value unchanged when accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSubmission {
    pub user_github: String,
    pub email: String,
    pub quant_clicks: f64,
    pub quant_dist: f64,
    pub quant_scrow: f64,
    pub quant_keys: f64,
}

impl MetricSubmission {
    pub fn to_record(&self) -> MetricRecord {
        MetricRecord {
            user_github: self.user_github.clone(),
            email: self.email.clone(),
            quant_clicks: self.quant_clicks,
            quant_dist: self.quant_dist,
            quant_scrow: self.quant_scrow,
            quant_keys: self.quant_keys,
        }
    }
}

/// Result of an insert-or-increment.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub record: MetricRecord,
    /// True when no record existed for the email before this write.
    pub created: bool,
}

/// One row of a `/rank-<metric>` leaderboard.
///
/// Serializes as `{"user_github": .., "<column>": value}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RankEntry {
    pub user_github: String,
    pub metric: Metric,
    pub value: f64,
}

impl Serialize for RankEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("user_github", &self.user_github)?;
        map.serialize_entry(self.metric.column(), &self.value)?;
        map.end()
    }
}

/// A user's position on one metric's leaderboard.
///
/// Serializes as `{"user_github": .., "rank": n, "<column>": value}`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRank {
    pub user_github: String,
    pub metric: Metric,
    /// 1-based competition rank; tied values share a rank.
    pub rank: u64,
    pub value: f64,
}

impl Serialize for UserRank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("user_github", &self.user_github)?;
        map.serialize_entry("rank", &self.rank)?;
        map.serialize_entry(self.metric.column(), &self.value)?;
        map.end()
    }
}

/// Row of the combined clicks/distance ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRankEntry {
    pub user_github: String,
    pub quant_clicks: f64,
    pub quant_dist: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(clicks: f64, dist: f64) -> MetricRecord {
        MetricRecord {
            user_github: "octocat".into(),
            email: "octo@github.com".into(),
            quant_clicks: clicks,
            quant_dist: dist,
            quant_scrow: 0.0,
            quant_keys: 0.0,
        }
    }

    #[test]
    fn metric_parses_slug_and_column() {
        assert_eq!("keys".parse::<Metric>().unwrap(), Metric::Keys);
        assert_eq!("quant_dist".parse::<Metric>().unwrap(), Metric::Dist);
        assert!("distance".parse::<Metric>().is_err());
    }

    #[test]
    fn accumulate_sums_counters_and_keeps_identity() {
        let mut base = record(5.0, 2.0);
        let mut delta = record(3.0, 1.0);
        delta.user_github = "someone-else".into();
        delta.quant_keys = 4.0;

        base.accumulate(&delta);

        assert_eq!(base.quant_clicks, 8.0);
        assert_eq!(base.quant_dist, 3.0);
        assert_eq!(base.quant_keys, 4.0);
        assert_eq!(base.user_github, "octocat");
    }

    #[test]
    fn accumulate_saturates_instead_of_overflowing() {
        let mut base = record(1.7e308, 1.0);
        base.accumulate(&record(1.7e308, 1.0));

        assert!(base.quant_clicks.is_finite());
        assert_eq!(base.quant_clicks, f64::MAX);
        assert_eq!(base.quant_dist, 2.0);
    }

    #[test]
    fn rank_entry_uses_metric_column_as_key() {
        let entry = RankEntry {
            user_github: "octocat".into(),
            metric: Metric::Scrow,
            value: 12.5,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"user_github": "octocat", "quant_scrow": 12.5}));
    }

    #[test]
    fn user_rank_serializes_rank_and_value() {
        let rank = UserRank {
            user_github: "octocat".into(),
            metric: Metric::Clicks,
            rank: 3,
            value: 40.0,
        };
        let json = serde_json::to_value(&rank).unwrap();
        assert_eq!(json["rank"], 3);
        assert_eq!(json["quant_clicks"], 40.0);
    }
}
