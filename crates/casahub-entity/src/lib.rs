//! # casahub-entity
//!
//! Domain entity models for CasaHub. Every struct in this crate is a
//! value object owned by one of the synchronization stores. All entities
//! derive `Debug`, `Clone`, `PartialEq`, `Serialize`, and `Deserialize`.

pub mod level;
pub mod property;
pub mod session;
pub mod user;

pub use level::PermissionLevel;
pub use property::{NewProperty, Property};
pub use session::Session;
pub use user::{Identity, Profile, ProfileChanges};
