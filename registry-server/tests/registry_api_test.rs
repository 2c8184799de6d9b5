//! Integration tests for the registry HTTP API
//!
//! Drives the full router through axum-test: publishing, sparse index
//! queries, downloads, authentication and error responses.

use axum::http::{header, HeaderValue, StatusCode};
use bytes::Bytes;
use serde_json::Value;
use std::future::IntoFuture;

mod common;
use common::{build_crate, create_test_setup, publish_body};
use registry_server::sha256_hash;

const DEPENDENCIES: &str = r#"
[dependencies]
x = { version = "*" }
serde = { version = "1.0", features = ["derive"], optional = true }

[target.'cfg(unix)'.dependencies]
libc = "0.2"

[features]
default = ["serde"]
"#;

fn index_lines(text: &str) -> Vec<Value> {
    text.lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_publish_index_and_download() {
    let setup = create_test_setup(None).await.unwrap();
    let archive = build_crate("sample", "1.1.0", DEPENDENCIES);

    let response = setup
        .server
        .put("/api/v1/crates/new")
        .bytes(Bytes::from(publish_body("sample", "1.1.0", &archive)))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), serde_json::json!({}));
    assert!(setup.package_dir().join("sample-1.1.0.crate").is_file());

    let response = setup.server.get("/sparse/sa/mp/sample").await;
    response.assert_status_ok();
    let records = index_lines(&response.text());
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record["name"], "sample");
    assert_eq!(record["vers"], "1.1.0");
    assert_eq!(record["v"], 2);
    assert_eq!(record["yanked"], false);
    assert_eq!(record["cksum"], sha256_hash(&archive));
    assert_eq!(record["features2"]["default"], serde_json::json!(["serde"]));

    let deps = record["deps"].as_array().unwrap();
    let names: Vec<&str> = deps.iter().map(|d| d["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["x", "serde", "libc"]);
    assert_eq!(
        deps[0],
        serde_json::json!({
            "name": "x",
            "req": "*",
            "features": [],
            "optional": false,
            "default_features": false,
            "target": null,
            "kind": "normal"
        })
    );
    assert_eq!(deps[1]["optional"], true);
    assert_eq!(deps[2]["req"], "0.2");
    assert!(deps[2]["target"].is_null());

    let response = setup.server.get("/crates/sample/1.1.0/download").await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), archive.as_slice());

    setup.shutdown().await;
}

#[tokio::test]
async fn test_multiple_versions_in_one_index_file() {
    let setup = create_test_setup(None).await.unwrap();

    for version in ["0.1.0", "0.2.0"] {
        let archive = build_crate("ab", version, "");
        setup
            .server
            .put("/api/v1/crates/new")
            .bytes(Bytes::from(publish_body("ab", version, &archive)))
            .await
            .assert_status_ok();
    }

    let response = setup.server.get("/sparse/2/ab").await;
    response.assert_status_ok();
    let versions: Vec<String> = index_lines(&response.text())
        .iter()
        .map(|record| record["vers"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(versions.len(), 2);
    assert!(versions.contains(&"0.1.0".to_string()));
    assert!(versions.contains(&"0.2.0".to_string()));

    setup.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_version_conflicts() {
    let setup = create_test_setup(None).await.unwrap();
    let archive = build_crate("sample", "1.1.0", "");
    let body = Bytes::from(publish_body("sample", "1.1.0", &archive));

    setup
        .server
        .put("/api/v1/crates/new")
        .bytes(body.clone())
        .await
        .assert_status_ok();

    let response = setup.server.put("/api/v1/crates/new").bytes(body).await;
    response.assert_status(StatusCode::CONFLICT);
    let error: Value = response.json();
    assert_eq!(error["code"], "conflict");
    assert!(error["errors"][0]["detail"]
        .as_str()
        .unwrap()
        .contains("already exists"));

    setup.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_uploads_succeed_or_conflict() {
    let setup = create_test_setup(None).await.unwrap();
    let archives: Vec<Vec<u8>> = (0..4)
        .map(|i| build_crate("race", "1.0.0", &format!("[package.metadata]\nwriter = {i}\n")))
        .collect();
    let upload = |archive: &Vec<u8>| {
        setup
            .server
            .put("/api/v1/crates/new")
            .bytes(Bytes::from(publish_body("race", "1.0.0", archive)))
            .into_future()
    };

    let (a, b, c, d) = tokio::join!(
        upload(&archives[0]),
        upload(&archives[1]),
        upload(&archives[2]),
        upload(&archives[3]),
    );
    for response in [a, b, c, d] {
        let status = response.status_code();
        assert!(
            status == StatusCode::OK || status == StatusCode::CONFLICT,
            "unexpected status {status}"
        );
    }

    let response = setup.server.get("/crates/race/1.0.0/download").await;
    response.assert_status_ok();
    assert!(archives.iter().any(|archive| archive.as_slice() == response.as_bytes().as_ref()));

    setup.shutdown().await;
}

#[tokio::test]
async fn test_upload_requires_token_when_configured() {
    let setup = create_test_setup(Some("s3cret")).await.unwrap();
    let archive = build_crate("sample", "1.1.0", "");
    let body = Bytes::from(publish_body("sample", "1.1.0", &archive));

    let response = setup
        .server
        .put("/api/v1/crates/new")
        .bytes(body.clone())
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = setup
        .server
        .put("/api/v1/crates/new")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("wrong"))
        .bytes(body.clone())
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert!(!setup.package_dir().join("sample-1.1.0.crate").exists());

    let response = setup
        .server
        .put("/api/v1/crates/new")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("s3cret"))
        .bytes(body)
        .await;
    response.assert_status_ok();

    // Reads stay open
    setup
        .server
        .get("/sparse/sa/mp/sample")
        .await
        .assert_status_ok();

    setup.shutdown().await;
}

#[tokio::test]
async fn test_malformed_upload_frames_rejected() {
    let setup = create_test_setup(None).await.unwrap();
    let archive = build_crate("sample", "1.1.0", "");

    // Declared archive length one byte larger than what was sent
    let mut body = publish_body("sample", "1.1.0", &archive);
    body.pop();
    let response = setup
        .server
        .put("/api/v1/crates/new")
        .bytes(Bytes::from(body))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "protocol_error");

    let response = setup
        .server
        .put("/api/v1/crates/new")
        .bytes(Bytes::from_static(&[0xff, 0xff]))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = setup
        .server
        .put("/api/v1/crates/new")
        .bytes(Bytes::from(publish_body("../escape", "1.0.0", &archive)))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read_dir(setup.package_dir()).unwrap().count(), 0);

    setup.shutdown().await;
}

#[tokio::test]
async fn test_sparse_config() {
    let setup = create_test_setup(None).await.unwrap();

    let response = setup.server.get("/sparse/config.json").await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        serde_json::json!({
            "dl": "http://localhost:8080/crates",
            "api": "http://localhost:8080"
        })
    );

    setup.shutdown().await;
}

#[tokio::test]
async fn test_unknown_and_mismatched_index_paths() {
    let setup = create_test_setup(None).await.unwrap();
    let archive = build_crate("sample", "1.1.0", "");
    setup
        .server
        .put("/api/v1/crates/new")
        .bytes(Bytes::from(publish_body("sample", "1.1.0", &archive)))
        .await
        .assert_status_ok();

    setup
        .server
        .get("/sparse/mi/ss/missing")
        .await
        .assert_status_not_found();
    setup
        .server
        .get("/sparse/xx/yy/sample")
        .await
        .assert_status_not_found();
    setup
        .server
        .get("/crates/sample/9.9.9/download")
        .await
        .assert_status_not_found();

    // Cargo lowercases the path; the prefix comparison is case-insensitive
    setup
        .server
        .get("/sparse/SA/MP/sample")
        .await
        .assert_status_ok();

    setup.shutdown().await;
}

#[tokio::test]
async fn test_mixed_case_crate_found_by_lowercase_path() {
    let setup = create_test_setup(None).await.unwrap();
    let archive = build_crate("MixedCase", "1.0.0", "");
    setup
        .server
        .put("/api/v1/crates/new")
        .bytes(Bytes::from(publish_body("MixedCase", "1.0.0", &archive)))
        .await
        .assert_status_ok();

    let response = setup.server.get("/sparse/mi/xe/mixedcase").await;
    response.assert_status_ok();
    assert_eq!(index_lines(&response.text())[0]["name"], "MixedCase");

    setup.shutdown().await;
}

#[tokio::test]
async fn test_landing_page_and_health() {
    let setup = create_test_setup(None).await.unwrap();
    let archive = build_crate("colorchoice", "1.0.4", "");
    setup
        .server
        .put("/api/v1/crates/new")
        .bytes(Bytes::from(publish_body("colorchoice", "1.0.4", &archive)))
        .await
        .assert_status_ok();

    let response = setup.server.get("/").await;
    response.assert_status_ok();
    assert!(response.text().contains("colorchoice"));

    let response = setup.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");

    setup.shutdown().await;
}
