//! Tests for the HTTP bulk import client
//! Uses wiremock to mock HTTP responses

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use tempfile::NamedTempFile;
use wiremock::matchers::{body_bytes, body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bulk_import::client::{BulkImportApi, CreateOptions, HttpClient};
use bulk_import::config::{Config, ConfigOptions};
use bulk_import::BulkImportError;

fn create_test_client(server: &MockServer) -> HttpClient {
    let config = Config::new(
        server.uri(),
        "1/test-key".to_string(),
        ConfigOptions {
            request_timeout_secs: Some(30),
            ..Default::default()
        },
    )
    .unwrap();
    HttpClient::new(&config).unwrap()
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_list_bulk_imports() {
    let mock_server = MockServer::start().await;

    let response_body = json!({
        "bulk_imports": [
            {
                "name": "session_a",
                "database": "db",
                "table": "events",
                "status": "uploading",
                "upload_frozen": false,
                "job_id": null,
                "valid_records": null,
                "error_records": null,
                "valid_parts": null,
                "error_parts": null
            },
            {
                "name": "session_b",
                "database": "db",
                "table": "users",
                "status": "ready",
                "upload_frozen": true,
                "job_id": 12345,
                "valid_records": 100,
                "error_records": 2,
                "valid_parts": 3,
                "error_parts": 0
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/v3/bulk_import/list"))
        .and(header("authorization", "TD1 1/test-key"))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let sessions = client.list_bulk_imports().await.unwrap();

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].name, "session_a");
    assert_eq!(sessions[0].job_id, None);
    assert_eq!(sessions[1].job_id.as_deref(), Some("12345"));
    assert!(sessions[1].upload_frozen);
    assert_eq!(sessions[1].valid_records, Some(100));
}

#[tokio::test]
async fn test_show_finds_session_by_name() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/bulk_import/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bulk_imports": [{"name": "present", "database": "db", "table": "t", "status": "uploading"}]
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    assert_eq!(client.show_bulk_import("present").await.unwrap().table, "t");

    let err = client.show_bulk_import("missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.to_string(),
        "Bulk import session 'missing' does not exist"
    );
}

#[tokio::test]
async fn test_create_with_organization() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/create/sess/db/tbl"))
        .and(body_string_contains("organization=acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "sess"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let options = CreateOptions {
        organization: Some("acme".to_string()),
    };
    client
        .create_bulk_import("sess", "db", "tbl", &options)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_missing_session_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/delete/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client.delete_bulk_import("gone").await.unwrap_err();

    assert!(matches!(err, BulkImportError::NotFound(_)));
    assert!(err.to_string().contains("'gone'"));
}

#[tokio::test]
async fn test_perform_accepts_numeric_job_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/perform/sess"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "sess", "job_id": 987})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/commit/sess"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "sess", "job_id": "988"})),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    assert_eq!(client.perform_bulk_import("sess").await.unwrap().job_id, "987");
    assert_eq!(client.commit_bulk_import("sess").await.unwrap().job_id, "988");
}

#[tokio::test]
async fn test_api_error_uses_message_field() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/freeze/sess"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "already frozen"})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/unfreeze/sess"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);

    match client.freeze_bulk_import("sess").await.unwrap_err() {
        BulkImportError::Api { status, message } => {
            assert_eq!(status, 409);
            assert!(message.ends_with("already frozen"));
        }
        other => panic!("unexpected error: {}", other),
    }

    match client.unfreeze_bulk_import("sess").await.unwrap_err() {
        BulkImportError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("internal failure"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

// ============================================================================
// Parts
// ============================================================================

#[tokio::test]
async fn test_upload_part_sends_file_body() {
    let mock_server = MockServer::start().await;
    let content = b"part payload bytes".to_vec();

    Mock::given(method("PUT"))
        .and(path("/v3/bulk_import/upload_part/sess/logs_0"))
        .and(header("authorization", "TD1 1/test-key"))
        .and(header("content-type", "application/octet-stream"))
        .and(body_bytes(content.clone()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&content).unwrap();
    file.flush().unwrap();

    let body = tokio::fs::File::open(file.path()).await.unwrap();
    let client = create_test_client(&mock_server);
    client
        .upload_part("sess", "logs_0", body, content.len() as u64)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_and_delete_parts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/bulk_import/list_parts/sess"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "sess", "parts": ["a_0", "a_1"]})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/delete_part/sess/a_1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    assert_eq!(
        client.list_bulk_import_parts("sess").await.unwrap(),
        vec!["a_0".to_string(), "a_1".to_string()]
    );
    client.delete_part("sess", "a_1").await.unwrap();
}

#[tokio::test]
async fn test_error_records_are_decoded() {
    let mock_server = MockServer::start().await;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for i in 0..3 {
        let record = json!({"time": 1_700_000_000 + i, "reason": format!("bad {}", i)});
        encoder
            .write_all(&rmp_serde::to_vec(&record).unwrap())
            .unwrap();
    }
    let payload = encoder.finish().unwrap();

    Mock::given(method("GET"))
        .and(path("/v3/bulk_import/error_records/sess"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let records: Vec<_> = client
        .error_records("sess")
        .await
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[2].get("reason"), Some(&json!("bad 2")));
    assert_eq!(records[0].time(), Some(1_700_000_000));
}
