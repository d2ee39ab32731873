use crate::{create_test_backend, mount_crate, mount_listing, mount_summary, ORIGIN};
use chrono::{TimeZone, Utc};
use crates_harvester::backend::item_uuid;
use crates_harvester::client::ArchiveMode;
use crates_harvester::dates::DEFAULT_DATETIME;
use crates_harvester::item::{Category, Item};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_full_fetch_of_crates() {
    let server = MockServer::start().await;

    mount_listing(
        &server,
        1,
        json!([
            {"id": "alpha", "updated_at": "2022-03-01T10:00:00.000000+00:00"},
            {"id": "beta", "updated_at": "2019-03-01T10:00:00.000000+00:00"}
        ]),
        3,
    )
    .await;
    mount_listing(
        &server,
        2,
        json!([{"id": "gamma", "updated_at": "2023-03-01T10:00:00.000000+00:00"}]),
        3,
    )
    .await;
    mount_crate(&server, "alpha", "2022-03-01T10:00:00.000000+00:00").await;
    mount_crate(&server, "gamma", "2023-03-01T10:00:00.000000+00:00").await;

    let backend = create_test_backend(&server, ArchiveMode::Off);
    let from_date = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let mut items = backend
        .fetch(Category::Crate, from_date)
        .expect("Failed to start fetch");

    let mut envelopes = Vec::new();
    while let Some(envelope) = items.next_item().await.expect("Fetch failed") {
        envelopes.push(envelope);
    }

    assert_eq!(items.fetched(), 2);
    let ids: Vec<_> = envelopes
        .iter()
        .map(|e| e.search_fields.item_id.as_str())
        .collect();
    assert_eq!(ids, ["alpha", "gamma"]);

    let first = &envelopes[0];
    assert_eq!(first.category, "crates");
    assert_eq!(first.origin, ORIGIN);
    assert_eq!(first.tag, ORIGIN);
    assert_eq!(first.uuid, item_uuid(ORIGIN, "alpha"));

    let data = serde_json::to_value(&first.data).unwrap();
    assert_eq!(data["name"], json!("alpha"));
    assert_eq!(data["downloads"], json!(1000));
    assert_eq!(data["owner_user_data"]["users"][0]["login"], json!("someone"));
    assert_eq!(data["versions_data"]["versions"][0]["num"], json!("1.0.0"));
    assert!(data.get("owner_team_data").is_some());
    assert!(data.get("version_downloads_data").is_some());

    // Every emitted crate respects the watermark
    for envelope in &envelopes {
        assert!(envelope.updated_on >= 1577836800.0);
    }
}

#[tokio::test]
async fn test_fetch_summary_item() {
    let server = MockServer::start().await;
    mount_summary(&server).await;

    let backend = create_test_backend(&server, ArchiveMode::Off).with_tag("registry");
    let mut items = backend
        .fetch(Category::Summary, DEFAULT_DATETIME)
        .expect("Failed to start fetch");

    let envelope = items
        .next_item()
        .await
        .expect("Fetch failed")
        .expect("Expected a summary");
    assert!(items.next_item().await.expect("Fetch failed").is_none());

    assert_eq!(envelope.category, "summary");
    assert_eq!(envelope.tag, "registry");
    assert_eq!(envelope.updated_on, envelope.search_fields.item_id.parse::<f64>().unwrap());

    match &envelope.data {
        Item::Summary(summary) => {
            assert_eq!(summary.fields["num_downloads"], json!(5));
            assert!(summary.fields.contains_key("fetched_on"));
        }
        other => panic!("Expected a summary, got {:?}", other),
    }
}

#[tokio::test]
async fn test_emitted_items_classify_back() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        1,
        json!([{"id": "alpha", "updated_at": "2022-03-01T10:00:00+00:00"}]),
        1,
    )
    .await;
    mount_crate(&server, "alpha", "2022-03-01T10:00:00+00:00").await;
    mount_summary(&server).await;

    let backend = create_test_backend(&server, ArchiveMode::Off);

    for category in Category::ALL {
        let mut items = backend.fetch(category, DEFAULT_DATETIME).unwrap();
        while let Some(envelope) = items.next_item().await.unwrap() {
            let emitted = serde_json::to_value(&envelope.data).unwrap();
            let item = Item::classify(emitted).unwrap();
            assert_eq!(item.category(), category);
            assert_eq!(item.identifier(), envelope.search_fields.item_id);
        }
    }
}

#[tokio::test]
async fn test_sub_fetch_failure_stops_fetch() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        1,
        json!([{"id": "alpha", "updated_at": "2022-03-01T10:00:00+00:00"}]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/crates/alpha/versions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_crate(&server, "alpha", "2022-03-01T10:00:00+00:00").await;

    let backend = create_test_backend(&server, ArchiveMode::Off);
    let mut items = backend.fetch(Category::Crate, DEFAULT_DATETIME).unwrap();

    let err = items.next_item().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(items.fetched(), 0);
    assert!(items.next_item().await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_registry() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, json!([]), 0).await;

    let backend = create_test_backend(&server, ArchiveMode::Off);
    let mut items = backend.fetch(Category::Crate, DEFAULT_DATETIME).unwrap();

    assert!(items.next_item().await.unwrap().is_none());
    assert_eq!(items.fetched(), 0);
}
