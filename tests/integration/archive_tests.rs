use crate::{create_test_backend, mount_crate, mount_listing};
use crates_harvester::archive::Archive;
use crates_harvester::client::ArchiveMode;
use crates_harvester::dates::DEFAULT_DATETIME;
use crates_harvester::item::{Category, Item};
use crates_harvester::{ArchiveError, HarvestError};
use serde_json::json;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn collect_items(backend: &crates_harvester::CratesBackend) -> Vec<Item> {
    let mut items = backend
        .fetch(Category::Crate, DEFAULT_DATETIME)
        .expect("Failed to start fetch");
    let mut out = Vec::new();
    while let Some(item) = items.next_raw().await.expect("Fetch failed") {
        out.push(item);
    }
    out
}

#[tokio::test]
async fn test_record_then_replay_without_network() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let archive_path = dir.path().join("crates.sqlite3");

    // Record
    let live = MockServer::start().await;
    mount_listing(
        &live,
        1,
        json!([
            {"id": "alpha", "updated_at": "2022-03-01T10:00:00+00:00"},
            {"id": "beta", "updated_at": "2022-04-01T10:00:00+00:00"}
        ]),
        2,
    )
    .await;
    mount_crate(&live, "alpha", "2022-03-01T10:00:00+00:00").await;
    mount_crate(&live, "beta", "2022-04-01T10:00:00+00:00").await;

    let recorder = create_test_backend(
        &live,
        ArchiveMode::Record(Archive::create(&archive_path).expect("Failed to create archive")),
    );
    let archive = recorder.client().transport().archive().unwrap();
    archive
        .init_metadata(&recorder.archive_metadata(Category::Crate, DEFAULT_DATETIME))
        .unwrap();

    let recorded = collect_items(&recorder).await;
    assert_eq!(recorded.len(), 2);
    // One listing page plus five requests per crate
    assert_eq!(archive.len().unwrap(), 11);
    drop(recorder);

    // Replay against a server that must not be contacted, at the same API root
    let replay_archive = Archive::open(&archive_path).expect("Failed to open archive");
    assert_eq!(replay_archive.metadata().unwrap().category, "crates");

    let replayer = create_test_backend(&live, ArchiveMode::Replay(replay_archive));
    live.reset().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&live)
        .await;

    let replayed = collect_items(&replayer).await;
    assert_eq!(replayed, recorded);
}

#[tokio::test]
async fn test_replay_of_unrecorded_request_fails() {
    let server = MockServer::start().await;
    let backend = create_test_backend(&server, ArchiveMode::Replay(Archive::in_memory().unwrap()));

    let mut items = backend.fetch(Category::Summary, DEFAULT_DATETIME).unwrap();
    let err = items.next_item().await.unwrap_err();

    assert!(matches!(
        err,
        HarvestError::Archive(ArchiveError::ResponseNotFound { .. })
    ));
}
