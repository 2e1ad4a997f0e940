//! Tally Test Harness - Simulation and validation for optimistic reconciliation
//!
//! This crate provides:
//! - A reference counter game (state, moves, reducer)
//! - An in-process authority that validates moves
//! - A chaos link with latency, jitter, reordering and loss
//! - A seeded session simulator checking the fold invariant and convergence

pub mod counter;
pub mod authority;
pub mod link;
pub mod simulator;

pub use counter::*;
pub use authority::*;
pub use link::*;
pub use simulator::*;
