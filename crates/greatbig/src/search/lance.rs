use super::{build_filter, query_terms, schema, SearchRepository};
use crate::model::Entity;
use crate::services::{Page, Pageable};
use anyhow::{Context, Result};
use arrow_array::RecordBatchIterator;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::marker::PhantomData;
use std::path::Path;
use tokio::sync::RwLock;

/// LanceDB search index, one table per entity type.
///
/// Supports local paths and S3 URIs.
pub struct LanceSearchIndex<E> {
    uri: String,
    connection: RwLock<Option<lancedb::Connection>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> LanceSearchIndex<E> {
    /// Create a new index handle from a URI (local path or s3://...)
    pub async fn new(uri: &str) -> Result<Self> {
        if !uri.starts_with("s3://") {
            tokio::fs::create_dir_all(Path::new(uri))
                .await
                .context("Failed to create search index directory")?;
        }

        Ok(Self {
            uri: uri.to_string(),
            connection: RwLock::new(None),
            _entity: PhantomData,
        })
    }

    /// Connect and create the entity table if it doesn't exist
    pub async fn init(&self) -> Result<()> {
        let db = lancedb::connect(&self.uri)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        let table_names = db.table_names().execute().await?;
        if !table_names.iter().any(|name| name == E::NAME) {
            db.create_empty_table(E::NAME, schema::create_schema::<E>())
                .execute()
                .await
                .with_context(|| format!("Failed to create {} search table", E::NAME))?;
        }

        *self.connection.write().await = Some(db);
        Ok(())
    }

    /// Get or create a connection
    async fn get_connection(&self) -> Result<lancedb::Connection> {
        let conn = self.connection.read().await;
        if let Some(ref db) = *conn {
            return Ok(db.clone());
        }
        drop(conn);

        let db = lancedb::connect(&self.uri)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        *self.connection.write().await = Some(db.clone());
        Ok(db)
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        let db = self.get_connection().await?;
        db.open_table(E::NAME)
            .execute()
            .await
            .with_context(|| format!("Failed to open {} search table", E::NAME))
    }
}

#[async_trait::async_trait]
impl<E: Entity> SearchRepository<E> for LanceSearchIndex<E> {
    async fn save(&self, entity: &E) -> Result<()> {
        let id = entity
            .id()
            .with_context(|| format!("Cannot index a {} without an id", E::NAME))?;
        let table = self.open_table().await?;

        // Delete existing and re-insert (LanceDB doesn't have native update)
        table
            .delete(&format!("id = {}", id))
            .await
            .context("Failed to delete old search document")?;

        let batch = schema::entities_to_batch(std::slice::from_ref(entity))?;
        let schema = batch.schema();

        table
            .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .context("Failed to insert search document")?;

        tracing::debug!("Indexed {} {}", E::NAME, id);
        Ok(())
    }

    async fn search(&self, query: &str, pageable: &Pageable) -> Result<Page<E>> {
        let table = self.open_table().await?;
        let filter = build_filter(&query_terms(query));

        let total = table
            .count_rows(filter.clone())
            .await
            .context("Failed to count search matches")?;

        if pageable.size == 0 || pageable.offset() >= total as u64 {
            return Ok(Page::new(Vec::new(), pageable, total as u64));
        }

        let mut lance_query = table
            .query()
            .offset(pageable.offset() as usize)
            .limit(pageable.size as usize);

        if let Some(filter) = filter {
            lance_query = lance_query.only_if(filter);
        }

        let mut stream = lance_query.execute().await?;
        let mut content = Vec::new();

        while let Some(batch) = stream.try_next().await? {
            content.extend(schema::batch_to_entities::<E>(&batch)?);
        }

        Ok(Page::new(content, pageable, total as u64))
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        let table = self.open_table().await?;
        table
            .delete(&format!("id = {}", id))
            .await
            .context("Failed to delete search document")?;

        tracing::debug!("Removed {} {} from search index", E::NAME, id);
        Ok(())
    }
}
