use super::types::{Page, Pageable};
use super::ServiceError;
use crate::db::Repository;
use crate::model::Entity;
use crate::search::SearchRepository;
use anyhow::Context;
use std::sync::Arc;

/// Outcome of an update request
#[derive(Debug, Clone)]
pub enum Saved<E> {
    /// The request carried no id and was handled as a create
    Created(E),
    Updated(E),
}

/// Service for entity CRUD operations.
///
/// The relational repository is the source of truth. Every successful write
/// is then mirrored into the search index on a best-effort basis: a failed
/// mirror write is logged and never rolls back or fails the request.
pub struct EntityService<E: Entity> {
    repository: Arc<dyn Repository<E>>,
    search: Arc<dyn SearchRepository<E>>,
}

impl<E: Entity> EntityService<E> {
    /// Create a new entity service
    pub fn new(repository: Arc<dyn Repository<E>>, search: Arc<dyn SearchRepository<E>>) -> Self {
        Self { repository, search }
    }

    /// Create a new entity. Fails if the entity already carries an id.
    pub async fn create(&self, entity: E) -> Result<E, ServiceError> {
        if entity.id().is_some() {
            return Err(ServiceError::IdExists { entity: E::NAME });
        }

        let saved = self
            .repository
            .save(entity)
            .await
            .with_context(|| format!("Failed to save {}", E::NAME))?;
        self.mirror(&saved).await;
        Ok(saved)
    }

    /// Overwrite an existing entity, or create it when it has no id
    pub async fn update(&self, entity: E) -> Result<Saved<E>, ServiceError> {
        if entity.id().is_none() {
            return self.create(entity).await.map(Saved::Created);
        }

        let saved = self
            .repository
            .save(entity)
            .await
            .with_context(|| format!("Failed to update {}", E::NAME))?;
        self.mirror(&saved).await;
        Ok(Saved::Updated(saved))
    }

    /// Get entity by ID
    pub async fn get(&self, id: i64) -> Result<Option<E>, ServiceError> {
        let entity = self
            .repository
            .find_by_id(id)
            .await
            .with_context(|| format!("Failed to get {}", E::NAME))?;
        Ok(entity)
    }

    /// List one page of entities
    pub async fn list(&self, pageable: &Pageable) -> Result<Page<E>, ServiceError> {
        if let Some(sort) = &pageable.sort {
            if !E::is_sortable(&sort.property) {
                return Err(ServiceError::InvalidSort {
                    entity: E::NAME,
                    property: sort.property.clone(),
                });
            }
        }

        let page = self
            .repository
            .find_all(pageable)
            .await
            .with_context(|| format!("Failed to list {}", E::COLLECTION))?;
        Ok(page)
    }

    /// Delete from the store, then from the search index
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.repository
            .delete_by_id(id)
            .await
            .with_context(|| format!("Failed to delete {}", E::NAME))?;

        if let Err(e) = self.search.delete_by_id(id).await {
            tracing::warn!("Failed to remove {} {} from search index: {:#}", E::NAME, id, e);
        }
        Ok(())
    }

    /// Free-text search over the index
    pub async fn search(&self, query: &str, pageable: &Pageable) -> Result<Page<E>, ServiceError> {
        let page = self
            .search
            .search(query, pageable)
            .await
            .with_context(|| format!("Failed to search {}", E::COLLECTION))?;
        Ok(page)
    }

    async fn mirror(&self, entity: &E) {
        if let Err(e) = self.search.save(entity).await {
            tracing::warn!(
                "Failed to mirror {} {:?} into search index: {:#}",
                E::NAME,
                entity.id(),
                e
            );
        }
    }
}
