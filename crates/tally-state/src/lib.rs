//! Tally State Engine - Optimistic state reconciliation
//!
//! This crate implements the optimistic reconciler:
//! - Pending move queue with local sequence numbers
//! - Optimistic application through a caller-supplied reducer
//! - Acceptance and rejection by value or by move id
//! - Version policy for stale acknowledgements
//! - Full resync and reset
//! - Lock-guarded shared handle for multi-task hosts

pub mod config;
pub mod pending;
pub mod reconcile;
pub mod shared;

pub use config::*;
pub use pending::*;
pub use reconcile::*;
pub use shared::*;
