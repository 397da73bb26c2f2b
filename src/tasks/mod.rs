//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Sweeps expired cache entries at the configured interval

mod cleanup;

pub use cleanup::{spawn_cleanup_task, MIN_SWEEP_INTERVAL};
