use std::path::PathBuf;

use crate::contracts::InputrankError;
use crate::storage::RocksDbMetricsStore;

/// Where the metrics store lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StoreConfig {
    /// Reads `INPUTRANK_DATA_DIR` (default: ./data).
    pub fn from_env() -> Self {
        std::env::var("INPUTRANK_DATA_DIR")
            .map(|dir| Self {
                data_dir: PathBuf::from(dir),
            })
            .unwrap_or_default()
    }

    /// Creates the data directory if needed and opens the store.
    pub fn open(&self) -> Result<RocksDbMetricsStore, InputrankError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(InputrankError::Config("data directory must not be empty".into()));
        }
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(RocksDbMetricsStore::open(&self.data_dir)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::MetricsStore;
    use tempfile::TempDir;

    #[test]
    fn open_creates_nested_data_dir() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            data_dir: dir.path().join("nested").join("db"),
        };

        let store = config.open().unwrap();

        assert!(config.data_dir.is_dir());
        assert!(store.list_records().unwrap().is_empty());
    }

    #[test]
    fn empty_data_dir_is_a_config_error() {
        let config = StoreConfig {
            data_dir: PathBuf::new(),
        };
        assert!(matches!(config.open(), Err(InputrankError::Config(_))));
    }
}
