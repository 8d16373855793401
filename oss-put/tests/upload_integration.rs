use std::time::Duration;

use oss_put::upload::{OssClient, OssSettings};
use oss_put_core::contract::ObjectStore;
use oss_put_core::{synchronise, SyncConfig};
use tempfile::tempdir;
use wiremock::matchers::{body_bytes, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> OssSettings {
    OssSettings {
        region: "cn-hangzhou".to_string(),
        access_key_id: "test-id".to_string(),
        access_key_secret: "test-secret".to_string(),
        bucket: "site".to_string(),
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_put_sends_signed_request_with_guessed_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/www/index.html"))
        .and(header("content-type", "text/html"))
        .and(header_exists("date"))
        .and(header_exists("authorization"))
        .and(body_bytes(b"<h1>hi</h1>".to_vec()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let file = dir.path().join("index.html");
    std::fs::write(&file, b"<h1>hi</h1>").unwrap();

    let client = OssClient::with_endpoint(&server.uri(), settings()).expect("client should build");
    let result = client.put("www/index.html", &file).await;
    assert!(
        result.is_ok(),
        "Expected put to succeed, got: {:?}",
        result.as_ref().err()
    );

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0]
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(auth.starts_with("OSS test-id:"), "unexpected authorization header: {auth}");
}

#[tokio::test]
async fn test_put_surfaces_error_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<Code>SignatureDoesNotMatch</Code>"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let file = dir.path().join("data.bin");
    std::fs::write(&file, b"\x00\x01").unwrap();

    let client = OssClient::with_endpoint(&server.uri(), settings()).unwrap();
    let err = client
        .put("data.bin", &file)
        .await
        .expect_err("403 must be an error");
    let msg = err.to_string();
    assert!(msg.contains("403"), "status expected in error, got: {msg}");
    assert!(msg.contains("SignatureDoesNotMatch"), "body expected in error, got: {msg}");
}

#[tokio::test]
async fn test_put_fails_for_missing_local_file() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    let client = OssClient::with_endpoint(&server.uri(), settings()).unwrap();
    let result = client.put("nope.txt", &dir.path().join("nope.txt")).await;

    assert!(result.is_err());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_synchronise_publishes_tree_through_oss_client() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("index.html"), b"<html/>").unwrap();
    std::fs::write(dir.path().join("robots.txt"), b"User-agent: *").unwrap();
    std::fs::write(dir.path().join("assets/app.css"), b"a{}").unwrap();

    let client = OssClient::with_endpoint(&server.uri(), settings()).unwrap();
    // One upload at a time so the server sees requests in issue order.
    let config = SyncConfig {
        concurrency: 1,
        ..SyncConfig::default()
    };
    let report = synchronise(&client, dir.path(), "release", &config)
        .await
        .expect("Synchronise should succeed");

    assert_eq!(report.folder_count, 2);
    assert_eq!(report.file_count, 3);
    assert!(report.failed_files.is_empty());

    let paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(
        paths,
        vec![
            "/release/assets/app.css",
            "/release/robots.txt",
            "/release/index.html",
        ]
    );
}
