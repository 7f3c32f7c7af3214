use anyhow::Result;
use axum::extract::FromRef;
use greatbig::db::sqlite::{open_pool, SqlitePool, SqliteRepository};
use greatbig::db::Repository;
use greatbig::model::{Entity, Note, Talk};
use greatbig::search::lance::LanceSearchIndex;
use greatbig::search::SearchRepository;
use greatbig::services::{AppConfig, EntityService, PaginationConfig};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub notes: Arc<EntityService<Note>>,
    pub talks: Arc<EntityService<Talk>>,
}

impl AppState {
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let pool = open_pool(&config.storage.path, config.storage.max_connections).await?;

        let notes = Arc::new(entity_service::<Note>(&pool, &config.search.uri).await?);
        let talks = Arc::new(entity_service::<Talk>(&pool, &config.search.uri).await?);

        Ok(Self {
            config,
            notes,
            talks,
        })
    }

    /// State backed by in-memory stores, for router tests
    #[cfg(test)]
    pub fn in_memory(config: AppConfig) -> Self {
        use greatbig::testing::{InMemoryRepository, InMemorySearchIndex};

        fn service<E: Entity>() -> Arc<EntityService<E>> {
            Arc::new(EntityService::new(
                Arc::new(InMemoryRepository::<E>::new()),
                Arc::new(InMemorySearchIndex::<E>::new()),
            ))
        }

        Self {
            config,
            notes: service(),
            talks: service(),
        }
    }
}

async fn entity_service<E: Entity>(pool: &SqlitePool, search_uri: &str) -> Result<EntityService<E>> {
    let repository = SqliteRepository::<E>::new(pool.clone());
    repository.init().await?;

    let index = LanceSearchIndex::<E>::new(search_uri).await?;
    index.init().await?;

    let repository: Arc<dyn Repository<E>> = Arc::new(repository);
    let index: Arc<dyn SearchRepository<E>> = Arc::new(index);
    Ok(EntityService::new(repository, index))
}

impl FromRef<AppState> for Arc<EntityService<Note>> {
    fn from_ref(state: &AppState) -> Self {
        state.notes.clone()
    }
}

impl FromRef<AppState> for Arc<EntityService<Talk>> {
    fn from_ref(state: &AppState) -> Self {
        state.talks.clone()
    }
}

impl FromRef<AppState> for PaginationConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.pagination.clone()
    }
}
