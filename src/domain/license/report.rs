//! Admin status snapshot of the license store

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};

use super::category::LicenseCategory;
use super::entity::{LicenseRecord, LicenseStatus};

/// One key as shown to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseReportEntry {
    pub key: String,
    /// Validity window in minutes
    pub duration: u32,
    /// `HH:MM:SS` until the cutoff
    pub remaining: String,
    pub status: LicenseStatus,
}

impl LicenseReportEntry {
    pub fn from_record(record: &LicenseRecord, now: DateTime<Utc>) -> Self {
        Self {
            key: record.key().to_string(),
            duration: record.duration_minutes(),
            remaining: format_hms(record.remaining(now)),
            status: record.status(now),
        }
    }
}

/// All keys of one category, in store order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    pub category: String,
    pub licenses: Vec<LicenseReportEntry>,
}

/// Per-category snapshot
///
/// Serializes as a JSON object keyed by category name, in configured order.
/// Records of categories that are no longer configured follow the configured
/// ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseReport {
    pub categories: Vec<CategoryReport>,
}

impl LicenseReport {
    pub fn build(
        categories: &[LicenseCategory],
        records: &[LicenseRecord],
        now: DateTime<Utc>,
    ) -> Self {
        let mut report: Vec<CategoryReport> = categories
            .iter()
            .map(|c| CategoryReport {
                category: c.name().to_string(),
                licenses: Vec::new(),
            })
            .collect();

        for record in records {
            let entry = LicenseReportEntry::from_record(record, now);

            match report.iter_mut().find(|c| c.category == record.category()) {
                Some(group) => group.licenses.push(entry),
                None => report.push(CategoryReport {
                    category: record.category().to_string(),
                    licenses: vec![entry],
                }),
            }
        }

        Self { categories: report }
    }

    pub fn count_with_status(&self, status: LicenseStatus) -> usize {
        self.categories
            .iter()
            .flat_map(|c| &c.licenses)
            .filter(|e| e.status == status)
            .count()
    }
}

impl Serialize for LicenseReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.categories
                .iter()
                .map(|c| (c.category.as_str(), &c.licenses)),
        )
    }
}

/// Format a duration as `HH:MM:SS`; hours are not wrapped and negatives clamp to zero
pub fn format_hms(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
