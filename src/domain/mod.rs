//! Domain layer - Core business logic and entities

pub mod error;
pub mod license;
pub mod llm;

pub use error::DomainError;
pub use license::{
    LicenseCategory, LicenseRecord, LicenseReport, LicenseRepository, LicenseStatus,
    MaintenanceSummary, Verification,
};
pub use llm::{
    FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, LlmStream, Message,
    MessageRole, StreamChunk, Usage,
};
