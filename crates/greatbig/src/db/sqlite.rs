use super::Repository;
use crate::model::{Entity, FieldKind, FieldReader, FieldValue};
use crate::services::{Direction, Page, Pageable};
use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Row, Sqlite};
use std::marker::PhantomData;
use std::path::Path;
use std::time::Duration;

pub use sqlx::SqlitePool;

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Open a connection pool on a SQLite file, creating it and its parent
/// directory when missing
pub async fn open_pool(path: &Path, max_connections: u32) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database at {}", path.display()))
}

/// SQLite repository for one entity type, one table per entity
pub struct SqliteRepository<E> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqliteRepository<E> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    /// Create the entity table if it does not exist
    pub async fn init(&self) -> Result<()> {
        sqlx::query(&create_table_sql::<E>())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create {} table", E::NAME))?;
        Ok(())
    }

    fn select_columns() -> String {
        std::iter::once("id")
            .chain(E::FIELDS.iter().map(|f| f.column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn order_by(pageable: &Pageable) -> String {
        let Some(sort) = &pageable.sort else {
            return "id ASC".to_string();
        };
        // Unknown properties were rejected by the service; fall back to id
        let column = E::field(&sort.property).map_or("id", |f| f.column);
        let direction = match sort.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        if column == "id" {
            format!("id {}", direction)
        } else {
            format!("{} {}, id ASC", column, direction)
        }
    }

    fn row_to_entity(row: &SqliteRow) -> Result<E> {
        let id: i64 = row.try_get("id")?;
        let mut values = Vec::with_capacity(E::FIELDS.len());
        for field in E::FIELDS {
            let value = match field.kind {
                FieldKind::Text => FieldValue::Text(row.try_get(field.column)?),
                FieldKind::Integer => FieldValue::Integer(row.try_get(field.column)?),
            };
            values.push(value);
        }
        E::from_values(id, &mut FieldReader::new(values))
    }

    async fn insert(&self, mut entity: E) -> Result<E> {
        let columns: Vec<&str> = E::FIELDS.iter().map(|f| f.column).collect();
        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", E::NAME)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                E::NAME,
                columns.join(", "),
                placeholders(columns.len())
            )
        };

        let mut query = sqlx::query(&sql);
        for value in entity.values() {
            query = bind_value(query, value);
        }
        let result = query
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert {}", E::NAME))?;

        let id = result.last_insert_rowid();
        entity.set_id(Some(id));
        tracing::debug!("Inserted {} {}", E::NAME, id);
        Ok(entity)
    }

    async fn upsert(&self, id: i64, entity: E) -> Result<E> {
        let columns: Vec<&str> = E::FIELDS.iter().map(|f| f.column).collect();
        let assignments = columns
            .iter()
            .map(|c| format!("{c} = excluded.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let conflict = if assignments.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", assignments)
        };
        let sql = format!(
            "INSERT INTO {} (id{}{}) VALUES (?{}{}) ON CONFLICT(id) {}",
            E::NAME,
            if columns.is_empty() { "" } else { ", " },
            columns.join(", "),
            if columns.is_empty() { "" } else { ", " },
            placeholders(columns.len()),
            conflict
        );

        let mut query = sqlx::query(&sql).bind(id);
        for value in entity.values() {
            query = bind_value(query, value);
        }
        query
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to update {} {}", E::NAME, id))?;

        tracing::debug!("Updated {} {}", E::NAME, id);
        Ok(entity)
    }
}

#[async_trait::async_trait]
impl<E: Entity> Repository<E> for SqliteRepository<E> {
    async fn save(&self, entity: E) -> Result<E> {
        match entity.id() {
            Some(id) => self.upsert(id, entity).await,
            None => self.insert(entity).await,
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<E>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?",
            Self::select_columns(),
            E::NAME
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to get {} {}", E::NAME, id))?;

        row.as_ref().map(Self::row_to_entity).transpose()
    }

    async fn find_all(&self, pageable: &Pageable) -> Result<Page<E>> {
        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", E::NAME))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count {} rows", E::NAME))?;

        let sql = format!(
            "SELECT {} FROM {} ORDER BY {} LIMIT ? OFFSET ?",
            Self::select_columns(),
            E::NAME,
            Self::order_by(pageable)
        );
        let rows = sqlx::query(&sql)
            .bind(i64::try_from(pageable.size).unwrap_or(i64::MAX))
            .bind(i64::try_from(pageable.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {} rows", E::NAME))?;

        let content = rows
            .iter()
            .map(Self::row_to_entity)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(content, pageable, total.max(0) as u64))
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", E::NAME))
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {} {}", E::NAME, id))?;

        if result.rows_affected() > 0 {
            tracing::debug!("Deleted {} {}", E::NAME, id);
        }
        Ok(())
    }
}

fn create_table_sql<E: Entity>() -> String {
    let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    columns.extend(E::FIELDS.iter().map(|f| {
        let ty = match f.kind {
            FieldKind::Text => "TEXT",
            FieldKind::Integer => "INTEGER",
        };
        format!("{} {}", f.column, ty)
    }));
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        E::NAME,
        columns.join(", ")
    )
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn bind_value(query: SqliteQuery<'_>, value: FieldValue) -> SqliteQuery<'_> {
    match value {
        FieldValue::Text(v) => query.bind(v),
        FieldValue::Integer(v) => query.bind(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Note, Talk};
    use crate::services::Sort;
    use tempfile::TempDir;

    async fn note_repo(temp_dir: &TempDir) -> SqliteRepository<Note> {
        let pool = open_pool(&temp_dir.path().join("db").join("test.db"), 1)
            .await
            .unwrap();
        let repo = SqliteRepository::<Note>::new(pool);
        repo.init().await.unwrap();
        repo
    }

    #[test]
    fn create_table_sql_lists_every_column() {
        let sql = create_table_sql::<Note>();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS note (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             text TEXT, colour TEXT, left_pos INTEGER, top_pos INTEGER)"
        );
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let repo = note_repo(&temp_dir).await;
        repo.init().await.unwrap();
    }

    #[tokio::test]
    async fn save_without_id_assigns_increasing_ids() {
        let temp_dir = TempDir::new().unwrap();
        let repo = note_repo(&temp_dir).await;

        let first = repo.save(Note::new().with_text("one")).await.unwrap();
        let second = repo.save(Note::new().with_text("two")).await.unwrap();

        let (a, b) = (first.id.unwrap(), second.id.unwrap());
        assert!(b > a, "ids should increase: {} then {}", a, b);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let temp_dir = TempDir::new().unwrap();
        let repo = note_repo(&temp_dir).await;

        let first = repo.save(Note::new()).await.unwrap();
        repo.delete_by_id(first.id.unwrap()).await.unwrap();
        let second = repo.save(Note::new()).await.unwrap();

        assert!(second.id.unwrap() > first.id.unwrap());
    }

    #[tokio::test]
    async fn find_by_id_returns_saved_fields() {
        let temp_dir = TempDir::new().unwrap();
        let repo = note_repo(&temp_dir).await;

        let saved = repo
            .save(
                Note::new()
                    .with_text("hello")
                    .with_colour("pink")
                    .with_left(12)
                    .with_top(30),
            )
            .await
            .unwrap();

        let found = repo.find_by_id(saved.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(found, saved);
        assert_eq!(found.text.as_deref(), Some("hello"));
        assert_eq!(found.colour.as_deref(), Some("pink"));
        assert_eq!(found.left, Some(12));
        assert_eq!(found.top, Some(30));
    }

    #[tokio::test]
    async fn null_fields_survive_storage() {
        let temp_dir = TempDir::new().unwrap();
        let repo = note_repo(&temp_dir).await;

        let saved = repo.save(Note::new()).await.unwrap();
        let found = repo.find_by_id(saved.id.unwrap()).await.unwrap().unwrap();

        assert_eq!(found.text, None);
        assert_eq!(found.left, None);
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let repo = note_repo(&temp_dir).await;

        assert!(repo.find_by_id(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_with_id_overwrites_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let repo = note_repo(&temp_dir).await;

        let mut note = repo.save(Note::new().with_text("draft")).await.unwrap();
        note.text = Some("final".to_string());
        note.colour = None;
        repo.save(note.clone()).await.unwrap();

        let found = repo.find_by_id(note.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(found.text.as_deref(), Some("final"));

        let page = repo.find_all(&Pageable::new(0, 10)).await.unwrap();
        assert_eq!(page.total_elements, 1);
    }

    #[tokio::test]
    async fn save_with_unknown_id_inserts_that_id() {
        let temp_dir = TempDir::new().unwrap();
        let repo = note_repo(&temp_dir).await;

        let mut note = Note::new().with_text("imported");
        note.id = Some(50);
        repo.save(note).await.unwrap();
        assert!(repo.find_by_id(50).await.unwrap().is_some());

        let next = repo.save(Note::new()).await.unwrap();
        assert!(next.id.unwrap() > 50);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let repo = note_repo(&temp_dir).await;

        let saved = repo.save(Note::new().with_text("bye")).await.unwrap();
        let id = saved.id.unwrap();

        repo.delete_by_id(id).await.unwrap();
        repo.delete_by_id(id).await.unwrap();
        assert!(repo.find_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_all_pages_in_id_order() {
        let temp_dir = TempDir::new().unwrap();
        let repo = note_repo(&temp_dir).await;

        for i in 0..7 {
            repo.save(Note::new().with_text(format!("note {}", i)))
                .await
                .unwrap();
        }

        let first = repo.find_all(&Pageable::new(0, 3)).await.unwrap();
        let last = repo.find_all(&Pageable::new(2, 3)).await.unwrap();
        let beyond = repo.find_all(&Pageable::new(5, 3)).await.unwrap();

        assert_eq!(first.total_elements, 7);
        assert_eq!(first.total_pages(), 3);
        assert_eq!(first.content.len(), 3);
        assert_eq!(first.content[0].text.as_deref(), Some("note 0"));
        assert_eq!(last.content.len(), 1);
        assert_eq!(last.content[0].text.as_deref(), Some("note 6"));
        assert!(beyond.content.is_empty());
        assert_eq!(beyond.total_elements, 7);
    }

    #[tokio::test]
    async fn find_all_applies_sort() {
        let temp_dir = TempDir::new().unwrap();
        let repo = note_repo(&temp_dir).await;

        for left in [5, 1, 9] {
            repo.save(Note::new().with_left(left)).await.unwrap();
        }

        let pageable = Pageable::new(0, 10).with_sort(Sort::desc("left"));
        let page = repo.find_all(&pageable).await.unwrap();
        let lefts: Vec<_> = page.content.iter().map(|n| n.left.unwrap()).collect();
        assert_eq!(lefts, vec![9, 5, 1]);

        let pageable = Pageable::new(0, 10).with_sort(Sort::desc("id"));
        let page = repo.find_all(&pageable).await.unwrap();
        assert_eq!(page.content[0].left, Some(9));
    }

    #[tokio::test]
    async fn entities_use_separate_tables() {
        let temp_dir = TempDir::new().unwrap();
        let notes = note_repo(&temp_dir).await;
        let pool = open_pool(&temp_dir.path().join("db").join("test.db"), 1)
            .await
            .unwrap();
        let talks = SqliteRepository::<Talk>::new(pool);
        talks.init().await.unwrap();

        notes.save(Note::new().with_text("note")).await.unwrap();
        let talk = talks
            .save(Talk::new().with_title("Intro").with_text("demo"))
            .await
            .unwrap();

        let found = talks.find_by_id(talk.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(found.title.as_deref(), Some("Intro"));
        assert_eq!(
            talks.find_all(&Pageable::new(0, 10)).await.unwrap().total_elements,
            1
        );
    }
}
