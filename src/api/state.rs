//! Application state for shared services

use std::sync::Arc;

use chrono::Duration;

use crate::domain::{DomainError, LicenseReport, Verification};
use crate::infrastructure::license::LicenseService;
use crate::infrastructure::services::{GenerationService, TextStream};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub license_service: Arc<dyn LicenseServiceTrait>,
    /// Absent when no upstream credential is configured
    pub generation_service: Option<Arc<dyn GenerationServiceTrait>>,
}

impl AppState {
    pub fn new(license_service: Arc<dyn LicenseServiceTrait>) -> Self {
        Self {
            license_service,
            generation_service: None,
        }
    }

    pub fn with_generation(mut self, service: Arc<dyn GenerationServiceTrait>) -> Self {
        self.generation_service = Some(service);
        self
    }

    /// The generation service, or `NotConfigured`
    pub fn generation(&self) -> Result<&Arc<dyn GenerationServiceTrait>, DomainError> {
        self.generation_service
            .as_ref()
            .ok_or_else(|| DomainError::not_configured("Text generation is not configured"))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("generation_enabled", &self.generation_service.is_some())
            .finish_non_exhaustive()
    }
}

/// Trait for license lifecycle operations
#[async_trait::async_trait]
pub trait LicenseServiceTrait: Send + Sync {
    async fn verify(&self, key: &str) -> Result<Verification, DomainError>;
    async fn remaining(&self, key: &str) -> Result<Option<Duration>, DomainError>;
    async fn report(&self, password: &str) -> Result<LicenseReport, DomainError>;
    /// Number of stored records; fails when the store is unreadable
    async fn check_store(&self) -> Result<usize, DomainError>;
}

/// Trait for text generation
#[async_trait::async_trait]
pub trait GenerationServiceTrait: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, DomainError>;
    async fn generate_stream(&self, prompt: &str) -> Result<TextStream, DomainError>;
}

// Implement traits for the actual services

#[async_trait::async_trait]
impl LicenseServiceTrait for LicenseService {
    async fn verify(&self, key: &str) -> Result<Verification, DomainError> {
        LicenseService::verify(self, key).await
    }

    async fn remaining(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        LicenseService::remaining(self, key).await
    }

    async fn report(&self, password: &str) -> Result<LicenseReport, DomainError> {
        LicenseService::report(self, password).await
    }

    async fn check_store(&self) -> Result<usize, DomainError> {
        LicenseService::check_store(self).await
    }
}

#[async_trait::async_trait]
impl GenerationServiceTrait for GenerationService {
    async fn generate(&self, prompt: &str) -> Result<String, DomainError> {
        GenerationService::generate(self, prompt).await
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TextStream, DomainError> {
        GenerationService::generate_stream(self, prompt).await
    }
}
