use std::path::Path;

use rocksdb::{MergeOperands, Options, DB};

use crate::contracts::{
    MetricRecord, MetricSubmission, MetricsStore, StorageError, UpsertOutcome,
};

/// Key prefix for metric records
const RECORD_PREFIX: &str = "metric";
/// Name the accumulate operator is registered under. Changing it makes
/// existing databases unreadable.
const MERGE_OPERATOR_NAME: &str = "inputrank.accumulate";

/// RocksDB-backed metrics store.
///
/// Every submission is written as a merge operand; RocksDB folds operands
/// into the stored record with [`accumulate_merge`], which makes the
/// insert-or-increment a single atomic write.
pub struct RocksDbMetricsStore {
    db: DB,
}

impl RocksDbMetricsStore {
    /// Opens or creates a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_merge_operator_associative(MERGE_OPERATOR_NAME, accumulate_merge);

        let db = DB::open(&opts, path).map_err(|e| StorageError::RocksDb(e.to_string()))?;
        tracing::debug!(path = %path.display(), "Opened metrics store");

        Ok(Self { db })
    }

    /// Format: metric:{email}
    fn record_key(email: &str) -> String {
        format!("{}:{}", RECORD_PREFIX, email)
    }

    fn serialize_record(record: &MetricRecord) -> Result<Vec<u8>, StorageError> {
        bincode::serialize(record).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn deserialize_record(bytes: &[u8]) -> Result<MetricRecord, StorageError> {
        bincode::deserialize(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Folds merge operands onto the stored record.
///
/// With no stored record the first operand becomes the record, so its
/// `user_github` wins. Returning `None` on undecodable input makes RocksDB
/// report corruption on read instead of silently dropping counters.
fn accumulate_merge(
    _key: &[u8],
    existing: Option<&[u8]>,
    operands: &MergeOperands,
) -> Option<Vec<u8>> {
    let mut acc: Option<MetricRecord> = match existing {
        Some(bytes) => Some(bincode::deserialize(bytes).ok()?),
        None => None,
    };

    for operand in operands {
        let delta: MetricRecord = bincode::deserialize(operand).ok()?;
        acc = Some(match acc.take() {
            Some(mut record) => {
                record.accumulate(&delta);
                record
            }
            None => delta,
        });
    }

    acc.and_then(|record| bincode::serialize(&record).ok())
}

impl MetricsStore for RocksDbMetricsStore {
    fn list_records(&self) -> Result<Vec<MetricRecord>, StorageError> {
        let prefix = format!("{}:", RECORD_PREFIX);
        let prefix_bytes = prefix.as_bytes();

        let iter = self.db.iterator(rocksdb::IteratorMode::From(
            prefix_bytes,
            rocksdb::Direction::Forward,
        ));

        let mut records = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StorageError::RocksDb(e.to_string()))?;
            if !key.starts_with(prefix_bytes) {
                break;
            }
            records.push(Self::deserialize_record(&value)?);
        }

        Ok(records)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<MetricRecord>, StorageError> {
        let key = Self::record_key(email);
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| StorageError::RocksDb(e.to_string()))?
        {
            Some(bytes) => Ok(Some(Self::deserialize_record(&bytes)?)),
            None => Ok(None),
        }
    }

    fn upsert(&self, submission: &MetricSubmission) -> Result<UpsertOutcome, StorageError> {
        let key = Self::record_key(&submission.email);

        // Lookup only decides the `created` flag; the merge below is what
        // keeps concurrent writers from losing each other's counters. A
        // record that fails to read or decode aborts before any merge.
        let created = self.find_by_email(&submission.email)?.is_none();

        let operand = Self::serialize_record(&submission.to_record())?;
        self.db
            .merge(key.as_bytes(), operand)
            .map_err(|e| StorageError::RocksDb(e.to_string()))?;

        let record = self.find_by_email(&submission.email)?.ok_or_else(|| {
            StorageError::Unavailable(format!(
                "record for {} missing after write",
                submission.email
            ))
        })?;

        Ok(UpsertOutcome { record, created })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksDbMetricsStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksDbMetricsStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn submission(user: &str, email: &str, clicks: f64, dist: f64) -> MetricSubmission {
        MetricSubmission {
            user_github: user.into(),
            email: email.into(),
            quant_clicks: clicks,
            quant_dist: dist,
            quant_scrow: 0.0,
            quant_keys: 0.0,
        }
    }

    #[test]
    fn first_upsert_creates_record() {
        let (store, _dir) = create_test_store();

        let outcome = store.upsert(&submission("a", "a@x.com", 5.0, 2.0)).unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.record.quant_clicks, 5.0);
        assert_eq!(outcome.record.quant_dist, 2.0);
        assert_eq!(store.list_records().unwrap().len(), 1);
    }

    #[test]
    fn second_upsert_sums_counters() {
        let (store, _dir) = create_test_store();

        store.upsert(&submission("a", "a@x.com", 5.0, 2.0)).unwrap();
        let outcome = store.upsert(&submission("a", "a@x.com", 3.0, 1.0)).unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.record.quant_clicks, 8.0);
        assert_eq!(outcome.record.quant_dist, 3.0);
        assert_eq!(store.list_records().unwrap().len(), 1);
    }

    #[test]
    fn upsert_keeps_original_user_github() {
        let (store, _dir) = create_test_store();

        store.upsert(&submission("first", "a@x.com", 1.0, 1.0)).unwrap();
        let outcome = store.upsert(&submission("second", "a@x.com", 1.0, 1.0)).unwrap();

        assert_eq!(outcome.record.user_github, "first");
    }

    #[test]
    fn optional_counters_accumulate_independently() {
        let (store, _dir) = create_test_store();

        let mut with_keys = submission("a", "a@x.com", 1.0, 0.0);
        with_keys.quant_keys = 7.0;
        store.upsert(&with_keys).unwrap();
        let outcome = store.upsert(&submission("a", "a@x.com", 1.0, 0.0)).unwrap();

        assert_eq!(outcome.record.quant_keys, 7.0);
        assert_eq!(outcome.record.quant_scrow, 0.0);
        assert_eq!(outcome.record.quant_clicks, 2.0);
    }

    #[test]
    fn failed_lookup_aborts_before_merge() {
        let (store, _dir) = create_test_store();
        let key = RocksDbMetricsStore::record_key("a@x.com");
        store.db.put(key.as_bytes(), b"\xff\xff").unwrap();

        let result = store.upsert(&submission("a", "a@x.com", 5.0, 2.0));

        assert!(matches!(result, Err(StorageError::Serialization(_))));
        // A merge would have been folded onto the bytes on read
        let raw = store.db.get(key.as_bytes()).unwrap();
        assert_eq!(raw.as_deref(), Some(&b"\xff\xff"[..]));
    }

    #[test]
    fn find_by_email_is_exact() {
        let (store, _dir) = create_test_store();
        store.upsert(&submission("a", "a@x.com", 1.0, 1.0)).unwrap();

        assert!(store.find_by_email("a@x.com").unwrap().is_some());
        assert!(store.find_by_email("A@x.com").unwrap().is_none());
        assert!(store.find_by_email("a@x.co").unwrap().is_none());
    }

    #[test]
    fn list_records_is_ordered_by_email() {
        let (store, _dir) = create_test_store();
        store.upsert(&submission("c", "c@x.com", 1.0, 1.0)).unwrap();
        store.upsert(&submission("a", "a@x.com", 1.0, 1.0)).unwrap();
        store.upsert(&submission("b", "b@x.com", 1.0, 1.0)).unwrap();

        let emails: Vec<String> = store
            .list_records()
            .unwrap()
            .into_iter()
            .map(|r| r.email)
            .collect();
        assert_eq!(emails, vec!["a@x.com", "b@x.com", "c@x.com"]);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = RocksDbMetricsStore::open(dir.path()).unwrap();
            store.upsert(&submission("a", "a@x.com", 5.0, 2.0)).unwrap();
        }

        let store = RocksDbMetricsStore::open(dir.path()).unwrap();
        let outcome = store.upsert(&submission("a", "a@x.com", 1.0, 1.0)).unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.record.quant_clicks, 6.0);
    }

    #[test]
    fn default_top_by_reads_through_store() {
        let (store, _dir) = create_test_store();
        for i in 0..15 {
            store
                .upsert(&submission(
                    &format!("user-{i:02}"),
                    &format!("u{i}@x.com"),
                    i as f64,
                    0.0,
                ))
                .unwrap();
        }

        let top = store.top_by(crate::contracts::Metric::Clicks, 10).unwrap();
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].user_github, "user-14");
        assert_eq!(top[9].user_github, "user-05");
    }
}
