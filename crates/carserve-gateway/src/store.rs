//! Sealed archive mapping store
//!
//! Maps a content identifier to the CAR file an upstream sealing
//! pipeline produced for it. The orchestrator consumes the
//! [`MappingStore`] trait only; the shipped backend is a JSON file
//! loaded once at startup and indexed in memory. Records are
//! immutable for the lifetime of the process, so lookups need no
//! synchronisation beyond the shared `Arc`.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// One sealed archive association.
///
/// Produced by the sealing pipeline before any request arrives and
/// never mutated here; `car_path` must reference an existing,
/// readable, immutable file for the record's lifetime.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SealedArchiveRecord {
    /// Record identifier assigned by the sealing pipeline
    pub id: i64,

    /// Root content identifier of the sealed object
    pub root_cid: String,

    /// Path of the sealed CAR file
    pub car_path: PathBuf,
}

impl SealedArchiveRecord {
    /// Validate the record's fields.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidField` if any field is invalid.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.root_cid.trim().is_empty() {
            return Err(StoreError::InvalidField {
                field: "root_cid".to_string(),
                record_id: self.id,
                reason: "identifier cannot be empty".to_string(),
            });
        }

        if self.car_path.as_os_str().is_empty() {
            return Err(StoreError::InvalidField {
                field: "car_path".to_string(),
                record_id: self.id,
                reason: "archive path cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Keyed lookup interface the orchestrator consumes.
///
/// `Ok(None)` means no record exists for the identifier; `Err` means
/// the store itself failed to answer.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Look up the sealed archive record for a content identifier.
    async fn lookup(&self, identifier: &str) -> Result<Option<SealedArchiveRecord>, StoreError>;
}

/// In-memory mapping store loaded from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonMappingStore {
    /// Records indexed by root content identifier
    records: HashMap<String, SealedArchiveRecord>,
}

impl JsonMappingStore {
    /// Load the mapping store from a JSON file.
    ///
    /// The file holds a JSON array of [`SealedArchiveRecord`]
    /// objects, one per identifier.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if:
    /// - The file cannot be read
    /// - The JSON is malformed
    /// - The store is empty
    /// - Any record fails validation or duplicates an identifier
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|source| StoreError::LoadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let reader = BufReader::new(file);
        let loaded: Vec<SealedArchiveRecord> = serde_json::from_reader(reader)?;

        if loaded.is_empty() {
            return Err(StoreError::EmptyStore);
        }

        let mut records = HashMap::with_capacity(loaded.len());
        for record in loaded {
            record.validate()?;
            let id = record.id;
            if let Some(previous) = records.insert(record.root_cid.clone(), record) {
                return Err(StoreError::InvalidField {
                    field: "root_cid".to_string(),
                    record_id: id,
                    reason: format!(
                        "duplicate identifier '{}' (already mapped by record {})",
                        previous.root_cid, previous.id
                    ),
                });
            }
        }

        Ok(Self { records })
    }

    /// Number of sealed archive mappings loaded.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no mappings. Never true after a
    /// successful [`from_file`](Self::from_file).
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MappingStore for JsonMappingStore {
    async fn lookup(&self, identifier: &str) -> Result<Option<SealedArchiveRecord>, StoreError> {
        Ok(self.records.get(identifier).cloned())
    }
}
