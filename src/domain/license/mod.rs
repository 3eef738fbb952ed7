//! License domain
//!
//! Time-limited, single-use license keys grouped into duration categories.

mod category;
mod entity;
mod outcome;
mod report;
mod repository;

pub use category::{parse_categories, CategoryError, LicenseCategory};
pub use entity::{LicenseRecord, LicenseStatus};
pub use outcome::{MaintenanceSummary, Verification};
pub use report::{format_hms, CategoryReport, LicenseReport, LicenseReportEntry};
pub use repository::LicenseRepository;

#[cfg(test)]
pub use repository::mock::MockLicenseRepository;
