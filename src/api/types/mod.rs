//! Request and response bodies

pub mod error;
pub mod generate;
pub mod json;
pub mod license;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use generate::{GenerateRequest, GenerateResponse};
pub use json::Json;
pub use license::{AdminReportRequest, RemainingResponse, VerifyRequest, VerifyResponse};
