//! Test utilities for the greatbig crate
//!
//! In-memory implementations of `Repository` and `SearchRepository` for unit
//! and integration testing.

use crate::db::Repository;
use crate::model::Entity;
use crate::search::{document_text, matches_terms, query_terms, SearchRepository};
use crate::services::{Direction, Page, Pageable};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-memory relational repository.
///
/// Ids are assigned from a counter that never goes backwards, like the
/// SQLite `AUTOINCREMENT` sequence.
pub struct InMemoryRepository<E> {
    rows: Mutex<BTreeMap<i64, E>>,
    last_id: Mutex<i64>,
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            last_id: Mutex::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    async fn save(&self, mut entity: E) -> Result<E> {
        let mut last_id = self.last_id.lock().unwrap();
        let id = match entity.id() {
            Some(id) => id,
            None => *last_id + 1,
        };
        *last_id = (*last_id).max(id);
        entity.set_id(Some(id));
        self.rows.lock().unwrap().insert(id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<E>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_all(&self, pageable: &Pageable) -> Result<Page<E>> {
        let mut all: Vec<E> = self.rows.lock().unwrap().values().cloned().collect();

        if let Some(sort) = &pageable.sort {
            if sort.property != "id" {
                let index = E::FIELDS
                    .iter()
                    .position(|f| f.name == sort.property)
                    .with_context(|| format!("Unknown sort property {}", sort.property))?;
                all.sort_by(|a, b| {
                    a.values()[index]
                        .partial_cmp(&b.values()[index])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            if sort.direction == Direction::Desc {
                all.reverse();
            }
        }

        let total = all.len() as u64;
        let content = all
            .into_iter()
            .skip(pageable.offset() as usize)
            .take(pageable.size as usize)
            .collect();
        Ok(Page::new(content, pageable, total))
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        self.rows.lock().unwrap().remove(&id);
        Ok(())
    }
}

/// In-memory search index using the same term matching as the LanceDB index
pub struct InMemorySearchIndex<E> {
    documents: Mutex<BTreeMap<i64, E>>,
}

impl<E: Entity> InMemorySearchIndex<E> {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Entity> Default for InMemorySearchIndex<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<E: Entity> SearchRepository<E> for InMemorySearchIndex<E> {
    async fn save(&self, entity: &E) -> Result<()> {
        let id = entity
            .id()
            .with_context(|| format!("Cannot index a {} without an id", E::NAME))?;
        self.documents.lock().unwrap().insert(id, entity.clone());
        Ok(())
    }

    async fn search(&self, query: &str, pageable: &Pageable) -> Result<Page<E>> {
        let terms = query_terms(query);
        let matches: Vec<E> = self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|e| matches_terms(&document_text(*e), &terms))
            .cloned()
            .collect();

        let total = matches.len() as u64;
        let content = matches
            .into_iter()
            .skip(pageable.offset() as usize)
            .take(pageable.size as usize)
            .collect();
        Ok(Page::new(content, pageable, total))
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        self.documents.lock().unwrap().remove(&id);
        Ok(())
    }
}
