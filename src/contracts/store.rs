use crate::contracts::error::StorageError;
use crate::contracts::{
    CombinedRankEntry, Metric, MetricRecord, MetricSubmission, RankEntry, UpsertOutcome, UserRank,
};
use crate::ranking;

/// Persistent store of metric records, keyed by email.
///
/// # Invariants
/// - At most one record per email
/// - `upsert` is atomic: concurrent submissions for the same email are all
///   reflected in the stored counters, and never produce duplicate records
/// - Records are never deleted
pub trait MetricsStore: Send + Sync {
    /// Returns every record, ordered by email.
    fn list_records(&self) -> Result<Vec<MetricRecord>, StorageError>;

    /// Looks up the record for an exact email match.
    fn find_by_email(&self, email: &str) -> Result<Option<MetricRecord>, StorageError>;

    /// Inserts a record for a new email, or adds the submitted counters onto
    /// the existing one.
    ///
    /// Returns the record as it stands after the write. A failure before the
    /// write is issued leaves the store untouched.
    fn upsert(&self, submission: &MetricSubmission) -> Result<UpsertOutcome, StorageError>;

    /// Returns the top `limit` users for a metric.
    fn top_by(&self, metric: Metric, limit: usize) -> Result<Vec<RankEntry>, StorageError> {
        let records = self.list_records()?;
        Ok(ranking::top_n(&records, metric, limit))
    }

    /// Returns the rank of each record owned by `user_github`.
    fn user_rank(&self, metric: Metric, user_github: &str) -> Result<Vec<UserRank>, StorageError> {
        let records = self.list_records()?;
        Ok(ranking::user_rank(&records, metric, user_github))
    }

    /// Returns all records ranked by clicks, then distance.
    fn combined_ranking(&self) -> Result<Vec<CombinedRankEntry>, StorageError> {
        let records = self.list_records()?;
        Ok(ranking::combined(&records))
    }
}
