//! Search index mirroring the relational store.
//!
//! Each entity is stored as a denormalized document keyed by its id. The
//! document keeps every scalar field plus a lowercased `search_text` column
//! that free-text queries match against. The index is a derived view: it has
//! no authority over data validity and is never read back into the store.

pub mod lance;
pub mod schema;

use crate::model::Entity;
use crate::services::{Page, Pageable};
use anyhow::Result;

/// Name of the denormalized column holding the searchable text
pub const SEARCH_TEXT_COLUMN: &str = "search_text";

/// Secondary index over one entity type
#[async_trait::async_trait]
pub trait SearchRepository<E: Entity>: Send + Sync {
    /// Upsert the document for a persisted entity
    async fn save(&self, entity: &E) -> Result<()>;

    /// Free-text search returning one page of matches and the total count
    async fn search(&self, query: &str, pageable: &Pageable) -> Result<Page<E>>;

    /// Remove a document; removing a missing id is not an error
    async fn delete_by_id(&self, id: i64) -> Result<()>;
}

/// Split a query into lowercased terms. A blank query or `*` yields no terms,
/// which matches every document.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|term| *term != "*")
        .map(str::to_lowercase)
        .collect()
}

/// Searchable text of an entity: its non-null field values, lowercased, one
/// per line
pub fn document_text<E: Entity>(entity: &E) -> String {
    entity
        .values()
        .iter()
        .filter_map(|v| v.as_search_text())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether a document matches every term
pub fn matches_terms(document_text: &str, terms: &[String]) -> bool {
    terms.iter().all(|term| document_text.contains(term.as_str()))
}

/// Build a LanceDB filter for the given terms, `None` when every document
/// matches
pub fn build_filter(terms: &[String]) -> Option<String> {
    if terms.is_empty() {
        return None;
    }
    Some(
        terms
            .iter()
            .map(|term| format!("{} LIKE '%{}%'", SEARCH_TEXT_COLUMN, escape_like(term)))
            .collect::<Vec<_>>()
            .join(" AND "),
    )
}

/// Escape a term for use inside a quoted LIKE pattern
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
        .replace('\'', "''")
}
