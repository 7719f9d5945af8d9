pub mod error;
pub mod record;
pub mod store;

pub use error::{InputrankError, StorageError, ValidationError};
pub use record::{
    CombinedRankEntry, Metric, MetricRecord, MetricSubmission, RankEntry, UpsertOutcome, UserRank,
};
pub use store::MetricsStore;
