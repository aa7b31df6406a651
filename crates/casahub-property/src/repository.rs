//! Property persistence seam.

use async_trait::async_trait;

use casahub_core::result::AppResult;
use casahub_core::types::{PropertyId, UserId};
use casahub_entity::property::{NewProperty, Property};

/// Interface to the backend's property table.
///
/// Implemented by the out-of-scope storage provider. Mutations return
/// the stored record, but the context never patches its in-memory list
/// from them: every mutation is followed by a full reload so the list
/// stays authoritative.
#[async_trait]
pub trait PropertyRepository: Send + Sync + 'static {
    /// List the properties owned by an identity, newest-first.
    async fn list_by_owner(&self, owner_id: UserId) -> AppResult<Vec<Property>>;

    /// Insert a new property and return the stored record.
    async fn insert(&self, property: &NewProperty) -> AppResult<Property>;

    /// Update an existing property and return the stored record.
    async fn update(&self, property: &Property) -> AppResult<Property>;

    /// Delete a property by id.
    async fn delete(&self, id: PropertyId) -> AppResult<()>;
}
