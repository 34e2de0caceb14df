//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the caches.
//!
//! # Tasks
//! - Sweep: Expires stale memory-cache entries and trims over-capacity ones

mod sweep;

pub use sweep::{spawn_sweep_task, SweepTask};
