//! Tally Core - Fundamental types for optimistic state reconciliation
//!
//! This crate defines the types shared by the reconciler and its drivers:
//! - Identifiers (MoveId, Version)
//! - The reducer seam (Reducer)
//! - Error types

pub mod id;
pub mod reducer;
pub mod error;

pub use id::*;
pub use reducer::*;
pub use error::*;
