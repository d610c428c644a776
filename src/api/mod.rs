//! API Module
//!
//! HTTP handlers and routing for the cache monitoring and admin surface.
//!
//! # Endpoints
//! - `GET /api/cache/stats` - Cache statistics
//! - `POST /api/cache/clear` - Clear both tiers
//! - `DELETE /api/cache/prefix/:prefix` - Invalidate a base key
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
