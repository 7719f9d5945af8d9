#![no_main]

use inputrank::api::validation::parse_submission;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary request bodies must be rejected or accepted, never panic.
    if let Ok(submission) = parse_submission(data) {
        assert!(submission.quant_clicks >= 0.0);
        assert!(submission.quant_dist >= 0.0);
        assert!(submission.quant_scrow >= 0.0);
        assert!(submission.quant_keys >= 0.0);
        assert!(!submission.user_github.trim().is_empty());
    }
});
