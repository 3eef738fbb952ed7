//! License store trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::LicenseRecord;
use crate::domain::DomainError;

/// Whole-collection access to the persisted licenses
///
/// Implementations carry no business rules. Every read returns the full
/// collection and every write replaces it.
#[async_trait]
pub trait LicenseRepository: Send + Sync + Debug {
    /// Read every record; an absent store yields an empty collection
    async fn load(&self) -> Result<Vec<LicenseRecord>, DomainError>;

    /// Replace the persisted collection
    async fn save(&self, records: &[LicenseRecord]) -> Result<(), DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    /// Mock license repository for testing
    #[derive(Debug, Default)]
    pub struct MockLicenseRepository {
        records: Arc<RwLock<Vec<LicenseRecord>>>,
        saves: AtomicUsize,
        should_fail: AtomicBool,
    }

    impl MockLicenseRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_records(records: Vec<LicenseRecord>) -> Self {
            Self {
                records: Arc::new(RwLock::new(records)),
                ..Self::default()
            }
        }

        /// Number of completed `save` calls
        pub fn save_count(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }

        pub async fn snapshot(&self) -> Vec<LicenseRecord> {
            self.records.read().await.clone()
        }

        pub fn set_should_fail(&self, fail: bool) {
            self.should_fail.store(fail, Ordering::SeqCst);
        }

        fn check_should_fail(&self) -> Result<(), DomainError> {
            if self.should_fail.load(Ordering::SeqCst) {
                return Err(DomainError::storage("Mock repository configured to fail"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LicenseRepository for MockLicenseRepository {
        async fn load(&self) -> Result<Vec<LicenseRecord>, DomainError> {
            self.check_should_fail()?;
            Ok(self.records.read().await.clone())
        }

        async fn save(&self, records: &[LicenseRecord]) -> Result<(), DomainError> {
            self.check_should_fail()?;
            *self.records.write().await = records.to_vec();
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
