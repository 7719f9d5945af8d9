mod config;
mod rocksdb;

pub use self::rocksdb::RocksDbMetricsStore;
pub use config::StoreConfig;
