use greatbig::db::sqlite::{open_pool, SqliteRepository};
use greatbig::db::Repository;
use greatbig::model::{Note, Talk};
use greatbig::search::lance::LanceSearchIndex;
use greatbig::search::SearchRepository;
use greatbig::services::{EntityService, Pageable, Saved, ServiceError};
use greatbig::testing::InMemorySearchIndex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;

// -- Helpers --

async fn talk_service(temp_dir: &TempDir) -> EntityService<Talk> {
    let pool = open_pool(&temp_dir.path().join("greatbig.db"), 2)
        .await
        .unwrap();
    let repo = SqliteRepository::<Talk>::new(pool);
    repo.init().await.unwrap();

    let uri = temp_dir.path().join("search.lance");
    let index = LanceSearchIndex::<Talk>::new(uri.to_str().unwrap())
        .await
        .unwrap();
    index.init().await.unwrap();

    let repo: Arc<dyn Repository<Talk>> = Arc::new(repo);
    let index: Arc<dyn SearchRepository<Talk>> = Arc::new(index);
    EntityService::new(repo, index)
}

// -- Tests --

#[tokio::test]
async fn talk_lifecycle_against_real_stores() {
    let temp_dir = TempDir::new().unwrap();
    let service = talk_service(&temp_dir).await;

    let created = service.create(Talk::new().with_text("demo")).await.unwrap();
    let id = created.id.expect("store assigns an id");

    let fetched = service.get(id).await.unwrap().unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.text.as_deref(), Some("demo"));

    let hits = service.search("demo", &Pageable::new(0, 20)).await.unwrap();
    assert_eq!(hits.content, vec![created.clone()]);

    service.delete(id).await.unwrap();
    service.delete(id).await.unwrap();
    assert!(service.get(id).await.unwrap().is_none());

    let hits = service.search("demo", &Pageable::new(0, 20)).await.unwrap();
    assert!(hits.content.is_empty());
}

#[tokio::test]
async fn update_is_visible_in_store_and_index() {
    let temp_dir = TempDir::new().unwrap();
    let service = talk_service(&temp_dir).await;

    let mut talk = service
        .create(Talk::new().with_title("Draft title"))
        .await
        .unwrap();
    talk.title = Some("Final title".to_string());
    talk.speaker = Some("Ada".to_string());

    let saved = service.update(talk.clone()).await.unwrap();
    assert!(matches!(saved, Saved::Updated(_)));

    let fetched = service.get(talk.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(fetched.title.as_deref(), Some("Final title"));

    let hits = service.search("ada", &Pageable::new(0, 20)).await.unwrap();
    assert_eq!(hits.total_elements, 1);
    let stale = service.search("draft", &Pageable::new(0, 20)).await.unwrap();
    assert_eq!(stale.total_elements, 0);
}

#[tokio::test]
async fn ids_are_unique_and_pages_cover_all_records() {
    let temp_dir = TempDir::new().unwrap();
    let service = talk_service(&temp_dir).await;

    let mut ids = Vec::new();
    for i in 0..11 {
        let talk = service
            .create(Talk::new().with_title(format!("talk {}", i)))
            .await
            .unwrap();
        ids.push(talk.id.unwrap());
    }
    let unique: BTreeSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 11);

    let size = 4;
    let first = service.list(&Pageable::new(0, size)).await.unwrap();
    assert_eq!(first.total_elements, 11);
    assert_eq!(first.total_pages(), 3);

    let mut seen = Vec::new();
    for page in 0..first.total_pages() {
        let page = service.list(&Pageable::new(page, size)).await.unwrap();
        seen.extend(page.content.into_iter().map(|t| t.id.unwrap()));
    }
    assert_eq!(seen, ids);
}

#[tokio::test]
async fn preset_id_is_rejected_and_nothing_is_stored() {
    let temp_dir = TempDir::new().unwrap();
    let service = talk_service(&temp_dir).await;

    let mut talk = Talk::new().with_text("demo");
    talk.id = Some(1);

    let err = service.create(talk).await.unwrap_err();
    assert!(matches!(err, ServiceError::IdExists { entity: "talk" }));

    let page = service.list(&Pageable::new(0, 20)).await.unwrap();
    assert_eq!(page.total_elements, 0);
}

#[tokio::test]
async fn sqlite_store_works_with_in_memory_index() {
    let temp_dir = TempDir::new().unwrap();
    let pool = open_pool(&temp_dir.path().join("notes.db"), 1)
        .await
        .unwrap();
    let repo = SqliteRepository::<Note>::new(pool);
    repo.init().await.unwrap();
    let index = Arc::new(InMemorySearchIndex::<Note>::new());

    let service = EntityService::new(Arc::new(repo), index.clone());
    let saved = service
        .update(Note::new().with_text("sticky").with_left(3).with_top(4))
        .await
        .unwrap();

    let Saved::Created(note) = saved else {
        panic!("update without id should create");
    };
    assert_eq!(index.len(), 1);
    assert_eq!(
        service.get(note.id.unwrap()).await.unwrap().unwrap().left,
        Some(3)
    );
}
