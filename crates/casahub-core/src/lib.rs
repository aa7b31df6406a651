//! # casahub-core
//!
//! Core crate for CasaHub. Contains configuration schemas, typed
//! identifiers, the generation marker used to discard superseded
//! asynchronous results, and the unified error system.
//!
//! This crate has **no** internal dependencies on other CasaHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod telemetry;
pub mod types;

pub use error::{AppError, AuthError};
pub use result::AppResult;
