//! Diagnostic counters: which region rank produced each identity.
//!
//! Counters are kept in memory for the whole run and written back once at
//! normal exit. They never influence extraction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StatisticsError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankStatistics {
    path: Option<PathBuf>,
    counts: BTreeMap<String, BTreeMap<i32, u64>>,
}

impl RankStatistics {
    /// In-memory statistics that are never persisted.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads counters from `path` (if it exists) and makes sure every
    /// document type has an entry.
    pub fn load<'a, P, I>(path: P, doc_types: I) -> Result<Self, StatisticsError>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = &'a str>,
    {
        let path = path.as_ref();
        let mut counts: BTreeMap<String, BTreeMap<i32, u64>> = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| StatisticsError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_yaml::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        for doc_type in doc_types {
            counts.entry(doc_type.to_string()).or_default();
        }

        debug!("Loaded rank statistics from {}", path.display());
        Ok(Self {
            path: Some(path.to_path_buf()),
            counts,
        })
    }

    pub fn record(&mut self, doc_type: &str, rank: i32) {
        *self
            .counts
            .entry(doc_type.to_string())
            .or_default()
            .entry(rank)
            .or_insert(0) += 1;
    }

    pub fn count(&self, doc_type: &str, rank: i32) -> u64 {
        self.counts
            .get(doc_type)
            .and_then(|ranks| ranks.get(&rank))
            .copied()
            .unwrap_or(0)
    }

    pub fn counts(&self) -> &BTreeMap<String, BTreeMap<i32, u64>> {
        &self.counts
    }

    /// Writes the counters back to the file they were loaded from.
    pub fn save(&self) -> Result<(), StatisticsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StatisticsError::Write {
                path: path.clone(),
                source: e,
            })?;
        }

        let yaml = serde_yaml::to_string(&self.counts)?;
        std::fs::write(path, yaml).map_err(|e| StatisticsError::Write {
            path: path.clone(),
            source: e,
        })?;

        info!("Saved rank statistics to {}", path.display());
        Ok(())
    }
}
