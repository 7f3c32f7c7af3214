pub mod sqlite;

use crate::model::Entity;
use crate::services::{Page, Pageable};
use anyhow::Result;

/// Relational repository: the source of truth for one entity type
#[async_trait::async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Insert when the entity has no id, otherwise overwrite the row with
    /// that id. Returns the persisted record with its id set.
    async fn save(&self, entity: E) -> Result<E>;

    /// Get an entity by ID
    async fn find_by_id(&self, id: i64) -> Result<Option<E>>;

    /// List one page of entities with the total count
    async fn find_all(&self, pageable: &Pageable) -> Result<Page<E>>;

    /// Delete an entity; deleting a missing id is not an error
    async fn delete_by_id(&self, id: i64) -> Result<()>;
}
