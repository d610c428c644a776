//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the service is up.
//!
//! # Tasks
//! - Fallback sweep: removes expired entries from the local fallback store

mod sweep;

pub use sweep::spawn_sweep_task;
