//! JSON file license store

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::license::{LicenseRecord, LicenseRepository};
use crate::domain::DomainError;

/// License store backed by a single JSON array file
///
/// Writes go to a sibling `.tmp` file which is then renamed over the store,
/// so a crash mid-write leaves the previous collection intact.
#[derive(Debug, Clone)]
pub struct FileLicenseRepository {
    path: PathBuf,
}

impl FileLicenseRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("licenses"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl LicenseRepository for FileLicenseRepository {
    async fn load(&self) -> Result<Vec<LicenseRecord>, DomainError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "License store absent, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(DomainError::storage(format!(
                    "Failed to read license store {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            DomainError::storage(format!(
                "License store {} is not a valid JSON array of licenses: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn save(&self, records: &[LicenseRecord]) -> Result<(), DomainError> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| DomainError::internal(format!("Failed to encode licenses: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::storage(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = self.temp_path();

        tokio::fs::write(&temp_path, &json).await.map_err(|e| {
            DomainError::storage(format!("Failed to write {}: {}", temp_path.display(), e))
        })?;

        tokio::fs::rename(&temp_path, &self.path).await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to replace license store {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), count = records.len(), "License store saved");

        Ok(())
    }
}
