//! License store, key generation and lifecycle

mod file_repository;
mod generator;
mod passphrase;
mod replenisher;
mod service;

pub use file_repository::FileLicenseRepository;
pub use generator::LicenseKeyGenerator;
pub use passphrase::AdminPassphrase;
pub use replenisher::Replenisher;
pub use service::{LicenseService, DEFAULT_MIN_PER_CATEGORY};
