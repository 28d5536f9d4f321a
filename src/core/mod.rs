//! Core deterministic primitives.
//!
//! All types in this module are designed for perfect cross-platform
//! determinism, so that a match can be replayed from its seed alone.

pub mod rng;

// Re-export core types
pub use rng::{DeterministicRng, derive_match_seed};
