//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the crates.io API and drive
//! complete fetches through the public backend interface.

mod archive_tests;
mod harvest_tests;

use crates_harvester::backend::CratesBackend;
use crates_harvester::client::{ArchiveMode, CratesClient, Transport};
use crates_harvester::config::ClientConfig;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ORIGIN: &str = "https://crates.io/";

/// Creates a backend pointed at the mock server
pub fn create_test_backend(server: &MockServer, archive: ArchiveMode) -> CratesBackend {
    let config = ClientConfig {
        api_root: format!("{}/api/v1/", server.uri()),
        max_retries: 2,
        ..ClientConfig::default()
    };
    let transport = Transport::new(&config)
        .expect("Failed to build transport")
        .with_sleep_time(Duration::from_millis(1))
        .with_archive(archive);
    let api_root = Url::parse(&config.api_root).expect("Failed to parse API root");

    CratesBackend::new(CratesClient::with_transport(api_root, transport), ORIGIN)
}

/// Mounts a JSON response for one path
pub async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts one listing page
pub async fn mount_listing(server: &MockServer, page: u32, entries: Value, total: u64) {
    Mock::given(method("GET"))
        .and(path("/api/v1/crates"))
        .and(query_param("sort", "alphabetical"))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"crates": entries, "meta": {"total": total}})),
        )
        .mount(server)
        .await;
}

/// Mounts detail and sub-resources for one crate
pub async fn mount_crate(server: &MockServer, id: &str, updated_at: &str) {
    mount_json(
        server,
        &format!("/api/v1/crates/{}", id),
        json!({
            "crate": {
                "id": id,
                "name": id,
                "updated_at": updated_at,
                "downloads": 1000
            },
            "versions": [],
            "keywords": []
        }),
    )
    .await;
    mount_json(
        server,
        &format!("/api/v1/crates/{}/owner_team", id),
        json!({"teams": []}),
    )
    .await;
    mount_json(
        server,
        &format!("/api/v1/crates/{}/owner_user", id),
        json!({"users": [{"id": 1, "login": "someone"}]}),
    )
    .await;
    mount_json(
        server,
        &format!("/api/v1/crates/{}/downloads", id),
        json!({"version_downloads": [], "meta": {"extra_downloads": []}}),
    )
    .await;
    mount_json(
        server,
        &format!("/api/v1/crates/{}/versions", id),
        json!({"versions": [{"num": "1.0.0"}]}),
    )
    .await;
}

/// Mounts the registry summary
pub async fn mount_summary(server: &MockServer) {
    mount_json(
        server,
        "/api/v1/summary",
        json!({
            "num_downloads": 5,
            "num_crates": 2,
            "most_downloaded": [{"id": "alpha"}],
            "just_updated": []
        }),
    )
    .await;
}
