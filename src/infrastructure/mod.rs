//! Infrastructure layer - External service implementations

pub mod license;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod services;
