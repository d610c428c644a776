//! Finboard Cache - Two-tier caching layer for financial dashboard data
//!
//! Redis first, bounded in-process fallback second, with memoization helpers and
//! a small HTTP surface for stats and invalidation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheParams, CacheService, DataClass, Memoizer};
pub use config::Config;
pub use tasks::spawn_sweep_task;
