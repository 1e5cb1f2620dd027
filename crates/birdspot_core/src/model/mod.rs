//! Domain model for nearby bird observations.
//!
//! # Responsibility
//! - Define the value types shared by provider, notification and settings code.
//! - Keep the static rarity table as the single source of rarity metadata.
//!
//! # Invariants
//! - Observations are immutable after normalization and replaced on every fetch.
//! - Rarity ids are totally ordered; higher means rarer.

pub mod coordinates;
pub mod observation;
pub mod rarity;
