//! # casahub-property
//!
//! The scoped-resource context for CasaHub: [`PropertyContext`] owns the
//! set of properties belonging to the signed-in identity and the single
//! active selection, coalescing concurrent loads by owner id and
//! discarding results from superseded loads. The [`guard`] module holds
//! the per-consumer cancellation and generation helpers.
//!
//! [`PropertyContext`]: context::PropertyContext

pub mod context;
pub mod guard;
pub mod repository;

pub use context::{PropertyContext, PropertySnapshot};
pub use guard::{MountGuard, OperationSlot};
pub use repository::PropertyRepository;
