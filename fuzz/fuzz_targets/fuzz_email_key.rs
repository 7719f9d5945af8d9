#![no_main]

use inputrank::contracts::{MetricSubmission, MetricsStore};
use inputrank::storage::RocksDbMetricsStore;
use libfuzzer_sys::fuzz_target;
use tempfile::TempDir;

fuzz_target!(|data: &[u8]| {
    // Emails are used verbatim as key suffixes; unicode, separators and
    // prefix-like strings must round-trip to exactly one record.
    let dir = TempDir::new().unwrap();
    let store = RocksDbMetricsStore::open(dir.path()).unwrap();

    let email = String::from_utf8_lossy(data).into_owned();
    let submission = MetricSubmission {
        user_github: "fuzz".into(),
        email: email.clone(),
        quant_clicks: 1.0,
        quant_dist: 1.0,
        quant_scrow: 0.0,
        quant_keys: 0.0,
    };

    store.upsert(&submission).unwrap();
    store.upsert(&submission).unwrap();

    let record = store.find_by_email(&email).unwrap().unwrap();
    assert_eq!(record.quant_clicks, 2.0);
    assert_eq!(store.list_records().unwrap().len(), 1);
});
