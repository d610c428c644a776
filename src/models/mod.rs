//! Response models for the cache HTTP surface
//!
//! This module defines the DTOs (Data Transfer Objects) serialized into
//! HTTP response bodies. The stats body is [`crate::cache::CacheStats`] itself.

pub mod responses;

// Re-export commonly used types
pub use responses::{ClearResponse, ErrorResponse, HealthResponse, InvalidateResponse};
