//! Shared type definitions used across CasaHub crates.

pub mod generation;
pub mod id;

pub use generation::Generation;
pub use id::{PropertyId, UserId};
