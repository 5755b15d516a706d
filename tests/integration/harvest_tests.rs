//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the listing endpoint and run
//! complete harvests against a store in a temporary directory.

use scratchpad_harvest::config::Config;
use scratchpad_harvest::harvester::Harvester;
use scratchpad_harvest::listing::{HttpListing, SortOrder};
use scratchpad_harvest::store::StoreError;
use scratchpad_harvest::{harvest, HarvestError, StopReason};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/api/internal/scratchpads/top";

/// Creates a test configuration pointing at the mock listing
fn create_test_config(server: &MockServer, output: &Path, page_size: u32) -> Config {
    let mut config = Config::default();
    config.listing.url = format!("{}{}", server.uri(), LISTING_PATH);
    config.listing.timeout_secs = 5;
    config.paging.page_size = page_size;
    config.output.path = output.display().to_string();
    config.retry.max_retries = 1;
    config.retry.backoff_base_ms = 1;
    config.retry.drain_timeout_secs = 5;
    config
}

/// A raw listing item shaped like the real endpoint's
fn scratchpad(id: u64) -> Value {
    json!({
        "title": format!("Program {}", id),
        "url": format!("https://www.khanacademy.org/computer-programming/program-{}/{}", id, id),
        "thumb": format!("/computer-programming/program-{}/{}/{}.png", id, id, id + 1000),
        "created": "2015-03-01T12:00:00Z",
        "authorKaid": format!("kaid_{}", id),
        "authorNickname": "Someone",
        "votes": id,
        "spinoffCount": 0,
        "key": "ag5zfmtoYW4tYWNhZGVteQ",
        "translatedTitle": format!("Program {}", id),
        "flaggedByUser": false
    })
}

fn page(ids: std::ops::Range<u64>, cursor: Option<&str>) -> ResponseTemplate {
    let scratchpads: Vec<Value> = ids.map(scratchpad).collect();
    let body = match cursor {
        Some(cursor) => json!({ "scratchpads": scratchpads, "cursor": cursor }),
        None => json!({ "scratchpads": scratchpads }),
    };
    ResponseTemplate::new(200).set_body_json(body)
}

/// Mounts the page fetched with `cursor`
async fn mount_page(server: &MockServer, cursor: &str, response: ResponseTemplate, hits: u64) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("cursor", cursor))
        .respond_with(response)
        .expect(hits)
        .mount(server)
        .await;
}

/// Mounts the first page; must be mounted after every cursor page
async fn mount_first_page(server: &MockServer, response: ResponseTemplate, hits: u64) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("sort", "5"))
        .and(query_param("topic_id", "xffde7c31"))
        .respond_with(response)
        .expect(hits)
        .mount(server)
        .await;
}

fn read_store(path: &Path) -> Vec<Value> {
    let content = std::fs::read_to_string(path).expect("Failed to read store");
    serde_json::from_str(&content).expect("Store is not a JSON array")
}

#[tokio::test]
async fn test_full_harvest_stops_at_budget() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = temp_dir.path().join("programs.json");

    mount_page(&mock_server, "B", page(4..6, Some("C")), 0).await;
    mount_page(&mock_server, "A", page(2..4, Some("B")), 1).await;
    mount_first_page(&mock_server, page(0..2, Some("A")), 1).await;

    let mut config = create_test_config(&mock_server, &output, 2);
    config.paging.max_items = Some(4);

    let summary = harvest(config).await.expect("Harvest failed");

    assert_eq!(summary.stop_reason, StopReason::BudgetReached);
    assert_eq!(summary.produced, 4);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.total_records, 4);
    assert_eq!(summary.final_token.as_deref(), Some("B"));

    let entries = read_store(&output);
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[4], json!({"cursor": "B"}));

    let first = &entries[0];
    assert_eq!(first["title"], "Program 0");
    assert_eq!(first["url"], "0");
    assert_eq!(first["thumb"], "1000");
    assert_eq!(first["created"], "2015-03-01T12:00:00.000Z");
    assert_eq!(first["authorKaid"], "0");
    assert_eq!(first["authorNickname"], "Someone");

    for entry in &entries[..4] {
        assert!(entry.get("key").is_none());
        assert!(entry.get("translatedTitle").is_none());
        assert!(entry.get("flaggedByUser").is_none());
    }

    let titles: Vec<&str> = entries[..4]
        .iter()
        .map(|entry| entry["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Program 0", "Program 1", "Program 2", "Program 3"]);
}

#[tokio::test]
async fn test_resume_from_stored_checkpoint() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = temp_dir.path().join("programs.json");

    std::fs::write(
        &output,
        r#"[{"title":"Program 0"},{"title":"Program 1"},{"cursor":"A"}]"#,
    )
    .unwrap();

    mount_page(&mock_server, "B", page(4..6, None), 1).await;
    mount_page(&mock_server, "A", page(2..4, Some("B")), 1).await;
    mount_first_page(&mock_server, page(0..2, Some("A")), 0).await;

    let config = create_test_config(&mock_server, &output, 2);
    let summary = harvest(config).await.expect("Harvest failed");

    assert_eq!(summary.stop_reason, StopReason::ListingExhausted);
    assert_eq!(summary.resumed_records, 2);
    assert_eq!(summary.produced, 4);
    assert_eq!(summary.total_records, 6);
    // The last page carried no cursor, so the checkpoint stays at the one that fetched it
    assert_eq!(summary.final_token.as_deref(), Some("B"));

    let entries = read_store(&output);
    let titles: Vec<&str> = entries[..6]
        .iter()
        .map(|entry| entry["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec!["Program 0", "Program 1", "Program 2", "Program 3", "Program 4", "Program 5"]
    );
    assert_eq!(entries[6], json!({"cursor": "B"}));
}

#[tokio::test]
async fn test_rerun_after_exhaustion_adds_no_duplicates() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = temp_dir.path().join("programs.json");

    // The tail page is fetched once by each run
    mount_page(&mock_server, "A", page(2..4, None), 2).await;
    mount_first_page(&mock_server, page(0..2, Some("A")), 1).await;

    let first = harvest(create_test_config(&mock_server, &output, 2))
        .await
        .expect("First harvest failed");
    assert_eq!(first.stop_reason, StopReason::ListingExhausted);
    assert_eq!(first.produced, 4);
    assert_eq!(first.final_token.as_deref(), Some("A"));

    let second = harvest(create_test_config(&mock_server, &output, 2))
        .await
        .expect("Second harvest failed");
    assert_eq!(second.stop_reason, StopReason::ListingExhausted);
    assert_eq!(second.resumed_records, 4);
    assert_eq!(second.produced, 0);
    assert_eq!(second.total_records, 4);
    assert_eq!(second.final_token.as_deref(), Some("A"));

    let entries = read_store(&output);
    let titles: Vec<&str> = entries[..4]
        .iter()
        .map(|entry| entry["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Program 0", "Program 1", "Program 2", "Program 3"]);
    assert_eq!(entries[4], json!({"cursor": "A"}));
}

#[tokio::test]
async fn test_resume_keeps_new_items_on_replayed_page() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = temp_dir.path().join("programs.json");

    // Program 3 was stored by a run that ended on a page holding only it
    std::fs::write(
        &output,
        r#"[{"title":"Program 2","url":"2"},{"title":"Program 3","url":"3"},{"cursor":"A"}]"#,
    )
    .unwrap();

    // The listing has since grown: the replayed page now also holds Program 4
    mount_page(&mock_server, "A", page(3..5, None), 1).await;

    let summary = harvest(create_test_config(&mock_server, &output, 2))
        .await
        .expect("Harvest failed");

    assert_eq!(summary.produced, 1);
    assert_eq!(summary.total_records, 3);

    let entries = read_store(&output);
    let titles: Vec<&str> = entries[..3]
        .iter()
        .map(|entry| entry["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Program 2", "Program 3", "Program 4"]);
}

#[tokio::test]
async fn test_explicit_cursor_overrides_checkpoint() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = temp_dir.path().join("programs.json");

    std::fs::write(&output, r#"[{"title":"Program 0"},{"cursor":"A"}]"#).unwrap();

    mount_page(&mock_server, "Z", page(10..12, None), 1).await;
    mount_page(&mock_server, "A", page(2..4, None), 0).await;

    let mut config = create_test_config(&mock_server, &output, 2);
    config.paging.cursor = Some("Z".to_string());

    let summary = harvest(config).await.expect("Harvest failed");

    assert_eq!(summary.produced, 2);
    assert_eq!(summary.total_records, 3);
}

#[tokio::test]
async fn test_store_without_checkpoint_is_refused() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = temp_dir.path().join("programs.json");

    let original = r#"[{"title":"Program 0"},{"title":"Program 1"}]"#;
    std::fs::write(&output, original).unwrap();

    Mock::given(method("GET"))
        .respond_with(page(0..2, None))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server, &output, 2);
    let result = harvest(config).await;

    match result {
        Err(HarvestError::Store(e)) => {
            assert!(matches!(e, StoreError::ResumeIntegrity { .. }));
            assert!(e.is_integrity_error());
        }
        other => panic!("Expected a resume integrity error, got {:?}", other),
    }

    // The refused store is left untouched
    assert_eq!(std::fs::read_to_string(&output).unwrap(), original);
}

#[tokio::test]
async fn test_overwrite_discards_prior_store() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = temp_dir.path().join("programs.json");

    std::fs::write(&output, r#"[{"title":"stale"}]"#).unwrap();
    mount_first_page(&mock_server, page(0..2, None), 1).await;

    let mut config = create_test_config(&mock_server, &output, 2);
    config.output.overwrite = true;

    let summary = harvest(config).await.expect("Harvest failed");

    assert_eq!(summary.stop_reason, StopReason::ListingExhausted);
    assert_eq!(summary.resumed_records, 0);
    assert_eq!(summary.final_token, None);

    let entries = read_store(&output);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["title"], "Program 0");
    assert_eq!(entries[2], json!({"cursor": ""}));
}

#[tokio::test]
async fn test_server_error_ends_run_resumably() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = temp_dir.path().join("programs.json");

    // One attempt plus one retry
    mount_page(&mock_server, "A", ResponseTemplate::new(503), 2).await;
    mount_first_page(&mock_server, page(0..2, Some("A")), 1).await;

    let config = create_test_config(&mock_server, &output, 2);
    let summary = harvest(config).await.expect("Harvest failed");

    assert_eq!(summary.stop_reason, StopReason::TransportFailed);
    assert!(!summary.stop_reason.is_success());
    assert_eq!(summary.produced, 2);

    let entries = read_store(&output);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2], json!({"cursor": "A"}));
}

#[tokio::test]
async fn test_cancel_before_run_keeps_checkpoint() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = temp_dir.path().join("programs.json");

    std::fs::write(&output, r#"[{"title":"Program 0"},{"cursor":"A"}]"#).unwrap();

    Mock::given(method("GET"))
        .respond_with(page(0..2, None))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server, &output, 2);
    config.listing.sort = SortOrder::Recent;
    let source = HttpListing::from_config(&config.listing, &config.user_agent, 2)
        .expect("Failed to build listing");

    let harvester = Harvester::new(&config, Arc::new(source)).expect("Failed to open store");
    assert!(harvester.coordinator().on_cancel_signal());

    let summary = harvester.run().await.expect("Harvest failed");

    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(summary.produced, 0);
    assert_eq!(
        read_store(&output),
        vec![json!({"title": "Program 0"}), json!({"cursor": "A"})]
    );
}
