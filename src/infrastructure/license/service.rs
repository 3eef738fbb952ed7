//! License lifecycle service
//!
//! Owns the single path to the license store. Every operation is one
//! load → mutate → save unit executed under `lock`, so concurrent requests
//! and the replenishment ticker never interleave and a key can only be
//! redeemed once.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::{AdminConfig, LicenseConfig, RetentionPolicy};
use crate::domain::license::{
    CategoryError, LicenseCategory, LicenseRecord, LicenseReport, LicenseRepository,
    MaintenanceSummary, Verification,
};
use crate::domain::DomainError;

use super::generator::LicenseKeyGenerator;
use super::passphrase::AdminPassphrase;

/// Default number of consumable licenses kept per category
pub const DEFAULT_MIN_PER_CATEGORY: usize = 5;

/// License lifecycle service
#[derive(Debug)]
pub struct LicenseService {
    repository: Arc<dyn LicenseRepository>,
    categories: Vec<LicenseCategory>,
    min_per_category: usize,
    retention: RetentionPolicy,
    generator: LicenseKeyGenerator,
    passphrase: AdminPassphrase,
    lock: Mutex<()>,
}

impl LicenseService {
    /// Create a service with default minimum, retention and generator and
    /// admin access disabled
    pub fn new(repository: Arc<dyn LicenseRepository>, categories: Vec<LicenseCategory>) -> Self {
        Self {
            repository,
            categories,
            min_per_category: DEFAULT_MIN_PER_CATEGORY,
            retention: RetentionPolicy::default(),
            generator: LicenseKeyGenerator::new(),
            passphrase: AdminPassphrase::new(""),
            lock: Mutex::new(()),
        }
    }

    /// Build from the `licenses` and `admin` configuration sections
    pub fn from_config(
        repository: Arc<dyn LicenseRepository>,
        licenses: &LicenseConfig,
        admin: &AdminConfig,
    ) -> Result<Self, CategoryError> {
        let generator = if licenses.accented_keys {
            LicenseKeyGenerator::accented()
        } else {
            LicenseKeyGenerator::new()
        };

        Ok(Self::new(repository, licenses.categories()?)
            .with_min_per_category(licenses.min_per_category)
            .with_retention(licenses.retention)
            .with_generator(generator)
            .with_admin_password(&admin.password))
    }

    pub fn with_min_per_category(mut self, min: usize) -> Self {
        self.min_per_category = min;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_generator(mut self, generator: LicenseKeyGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_admin_password(mut self, password: &str) -> Self {
        self.passphrase = AdminPassphrase::new(password);
        self
    }

    pub fn categories(&self) -> &[LicenseCategory] {
        &self.categories
    }

    pub fn min_per_category(&self) -> usize {
        self.min_per_category
    }

    /// Prune and top up every category, persisting only when something changed
    #[instrument(skip(self))]
    pub async fn maintain(&self) -> Result<MaintenanceSummary, DomainError> {
        let _guard = self.lock.lock().await;
        let (_, summary) = self.maintain_locked().await?;
        Ok(summary)
    }

    /// Redeem a key if it exists, is unused and is unexpired
    #[instrument(skip(self, key))]
    pub async fn verify(&self, key: &str) -> Result<Verification, DomainError> {
        let key = key.trim();

        if key.is_empty() {
            return Err(DomainError::validation("License key is required"));
        }

        let _guard = self.lock.lock().await;
        let mut records = self.repository.load().await?;
        let now = Utc::now();

        let outcome = match records.iter_mut().find(|r| r.key() == key) {
            None => Verification::NotFound,
            Some(record) if record.is_used() => Verification::AlreadyUsed,
            Some(record) if record.is_expired(now) => Verification::Expired,
            Some(record) => {
                record.mark_used();
                Verification::Valid {
                    remaining: record.remaining(now),
                }
            }
        };

        if outcome.is_valid() {
            self.repository.save(&records).await?;
        }

        counter!("license_verifications_total", "outcome" => outcome.label()).increment(1);
        info!(outcome = outcome.label(), "License verification");

        Ok(outcome)
    }

    /// Time left on a redeemed key whose window is still open
    pub async fn remaining(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let key = key.trim();
        let _guard = self.lock.lock().await;
        let records = self.repository.load().await?;
        let now = Utc::now();

        Ok(records
            .iter()
            .find(|r| r.key() == key)
            .filter(|r| r.is_active_redemption(now))
            .map(|r| r.remaining(now)))
    }

    /// Authenticate, replenish, then snapshot every category
    ///
    /// A wrong passphrase returns `Forbidden` before the store is touched.
    #[instrument(skip(self, password))]
    pub async fn report(&self, password: &str) -> Result<LicenseReport, DomainError> {
        if !self.passphrase.verify(password) {
            warn!("Rejected admin report request");
            return Err(DomainError::forbidden("Invalid admin password"));
        }

        self.status_report().await
    }

    /// Replenish, then snapshot every category (no authentication)
    pub async fn status_report(&self) -> Result<LicenseReport, DomainError> {
        let _guard = self.lock.lock().await;
        let (records, _) = self.maintain_locked().await?;

        Ok(LicenseReport::build(&self.categories, &records, Utc::now()))
    }

    /// Whether the store can currently be read
    pub async fn check_store(&self) -> Result<usize, DomainError> {
        let _guard = self.lock.lock().await;
        Ok(self.repository.load().await?.len())
    }

    async fn maintain_locked(&self) -> Result<(Vec<LicenseRecord>, MaintenanceSummary), DomainError> {
        let records = self.repository.load().await?;
        let now = Utc::now();
        let (records, summary) = self.replenish(records, now);

        if summary.changed() {
            self.repository.save(&records).await?;
            info!(
                retained = summary.retained,
                pruned = summary.pruned,
                created = summary.created,
                "License store replenished"
            );
        } else {
            debug!(retained = summary.retained, "License store already at minimum");
        }

        counter!("licenses_pruned_total").increment(summary.pruned as u64);
        self.record_availability(&records, now);

        Ok((records, summary))
    }

    /// Drop what the retention policy discards, then generate licenses until
    /// every configured category holds `min_per_category` consumable ones.
    ///
    /// Output order: each configured category in turn (kept records first,
    /// then new ones), then records of categories no longer configured.
    fn replenish(
        &self,
        records: Vec<LicenseRecord>,
        now: DateTime<Utc>,
    ) -> (Vec<LicenseRecord>, MaintenanceSummary) {
        let total = records.len();
        let mut kept: Vec<LicenseRecord> = records
            .into_iter()
            .filter(|r| self.retains(r, now))
            .collect();

        let mut summary = MaintenanceSummary {
            retained: kept.len(),
            pruned: total - kept.len(),
            created: 0,
        };

        let mut keys: HashSet<String> = kept.iter().map(|r| r.key().to_string()).collect();
        let mut result = Vec::with_capacity(kept.len() + self.categories.len() * self.min_per_category);

        for category in &self.categories {
            let (mine, rest): (Vec<_>, Vec<_>) = kept
                .into_iter()
                .partition(|r| r.category() == category.name());
            kept = rest;

            let mut available = mine.iter().filter(|r| r.is_consumable(now)).count();
            result.extend(mine);

            while available < self.min_per_category {
                let key = self.generator.generate_unique(now, &keys);
                keys.insert(key.clone());
                result.push(LicenseRecord::new(key, category, now));

                available += 1;
                summary.created += 1;
                counter!("licenses_created_total", "category" => category.name().to_string())
                    .increment(1);
            }
        }

        if !kept.is_empty() {
            warn!(
                count = kept.len(),
                "Keeping licenses of unconfigured categories until they are used or expire"
            );
            result.extend(kept);
        }

        (result, summary)
    }

    fn retains(&self, record: &LicenseRecord, now: DateTime<Utc>) -> bool {
        match self.retention {
            RetentionPolicy::Purge => record.is_consumable(now),
            RetentionPolicy::KeepActive => !record.is_expired(now),
        }
    }

    fn record_availability(&self, records: &[LicenseRecord], now: DateTime<Utc>) {
        for category in &self.categories {
            let available = records
                .iter()
                .filter(|r| r.category() == category.name() && r.is_consumable(now))
                .count();

            gauge!("licenses_available", "category" => category.name().to_string())
                .set(available as f64);
        }
    }
}
