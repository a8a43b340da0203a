//! End-to-end CLI tests for the resume-downloader binary.

#![allow(deprecated)]

mod support;

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use support::pdf_body;
use support::socket_guard::start_mock_server_or_skip;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONFIG_ENV: [&str; 10] = [
    "DOWNLOAD_FOLDER",
    "DOWNLOAD_MAX_CONCURRENT",
    "DOWNLOAD_TIMEOUT_SECONDS",
    "DOWNLOAD_MAX_RETRIES",
    "EXTRACTION_MAX_PAGES",
    "EXTRACTION_DELAY_SECONDS",
    "BROWSER_TIMEOUT_SECONDS",
    "SESSION_COOKIES_FILE",
    "SESSION_CHECK_URL",
    "RUST_LOG",
];

/// The binary with configuration variables from the outer environment removed.
fn binary() -> Command {
    let mut cmd = Command::cargo_bin("resume-downloader").unwrap();
    for name in CONFIG_ENV {
        cmd.env_remove(name);
    }
    cmd
}

fn write_listing(dir: &Path, server: &MockServer, entries: &[(&str, &str, &str)]) -> std::path::PathBuf {
    let records: Vec<serde_json::Value> = entries
        .iter()
        .map(|(id, name, route)| {
            serde_json::json!({ "id": id, "name": name, "url": format!("{}{route}", server.uri()) })
        })
        .collect();
    let listing = dir.join("candidates.json");
    std::fs::write(&listing, serde_json::to_vec(&records).unwrap()).unwrap();
    listing
}

async fn serve_pdf(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_body(2048)))
        .mount(server)
        .await;
}

async fn serve_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[test]
fn test_binary_help_displays_usage() {
    binary()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bulk download candidate resume PDFs"));
}

#[test]
fn test_binary_version_displays_version() {
    binary()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("resume-downloader"));
}

#[test]
fn test_binary_requires_listing() {
    binary()
        .assert()
        .failure()
        .stderr(predicate::str::contains("<LISTING>"));
}

#[test]
fn test_binary_missing_listing_file_fails() {
    let dir = TempDir::new().unwrap();
    binary()
        .arg(dir.path().join("absent.json"))
        .arg("-q")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read candidate listing"));
}

#[test]
fn test_binary_invalid_env_value_names_variable() {
    let dir = TempDir::new().unwrap();
    let listing = dir.path().join("candidates.json");
    std::fs::write(&listing, "[]").unwrap();

    binary()
        .arg(&listing)
        .env("DOWNLOAD_MAX_CONCURRENT", "many")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DOWNLOAD_MAX_CONCURRENT"));
}

#[test]
fn test_binary_empty_listing_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    let listing = dir.path().join("candidates.json");
    std::fs::write(&listing, "[]").unwrap();
    let out = dir.path().join("out");

    binary()
        .arg(&listing)
        .arg("-o")
        .arg(&out)
        .arg("--no-progress")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No resumes downloaded"));
    assert!(out.join("download_report.json").exists());
}

#[tokio::test]
async fn test_binary_all_downloads_succeed_exit_zero() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    serve_pdf(&server, "/files/a.pdf").await;
    serve_pdf(&server, "/files/b.pdf").await;

    let dir = TempDir::new().unwrap();
    let listing = write_listing(
        dir.path(),
        &server,
        &[("a", "Jane X", "/files/a.pdf"), ("b", "John Doe", "/files/b.pdf")],
    );
    let out = dir.path().join("resumes");

    binary()
        .arg(&listing)
        .arg("--output-dir")
        .arg(&out)
        .arg("-q")
        .assert()
        .code(0);

    assert!(out.join("Jane_X.pdf").exists());
    assert!(out.join("John_Doe.pdf").exists());
    let report: serde_json::Value =
        serde_json::from_slice(&std::fs::read(out.join("download_report.json")).unwrap()).unwrap();
    assert_eq!(report["statistics"]["succeeded"], 2);
}

#[tokio::test]
async fn test_binary_partial_success_exit_two() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    serve_pdf(&server, "/files/ok.pdf").await;
    serve_status(&server, "/files/missing.pdf", 404).await;

    let dir = TempDir::new().unwrap();
    let listing = write_listing(
        dir.path(),
        &server,
        &[("ok", "Jane X", "/files/ok.pdf"), ("gone", "Bob", "/files/missing.pdf")],
    );
    let report = dir.path().join("run.json");

    binary()
        .arg(&listing)
        .arg("-o")
        .arg(dir.path().join("out"))
        .arg("--report")
        .arg(&report)
        .arg("-r")
        .arg("0")
        .arg("-q")
        .assert()
        .code(2);

    let report: serde_json::Value = serde_json::from_slice(&std::fs::read(&report).unwrap()).unwrap();
    let statuses: Vec<_> = report["outcomes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, ["SUCCEEDED", "FAILED"]);
}

#[tokio::test]
async fn test_binary_all_failed_exit_one() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    serve_status(&server, "/files/x.pdf", 404).await;

    let dir = TempDir::new().unwrap();
    let listing = write_listing(dir.path(), &server, &[("x", "Bob", "/files/x.pdf")]);

    binary()
        .arg(&listing)
        .arg("-o")
        .arg(dir.path().join("out"))
        .arg("-r")
        .arg("0")
        .arg("-q")
        .assert()
        .code(1);
}

#[tokio::test]
async fn test_binary_rejected_session_stops_before_downloads() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    serve_status(&server, "/home", 401).await;
    Mock::given(method("GET"))
        .and(path("/files/a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_body(2048)))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let listing = write_listing(dir.path(), &server, &[("a", "Jane X", "/files/a.pdf")]);
    let out = dir.path().join("out");

    binary()
        .arg(&listing)
        .arg("-o")
        .arg(&out)
        .env("SESSION_CHECK_URL", format!("{}/home", server.uri()))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("session rejected"));
    assert!(!out.join("Jane_X.pdf").exists());
}

#[tokio::test]
async fn test_binary_env_output_folder_used_when_flag_absent() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    serve_pdf(&server, "/files/a.pdf").await;

    let dir = TempDir::new().unwrap();
    let listing = write_listing(dir.path(), &server, &[("a", "Jane X", "/files/a.pdf")]);
    let folder = dir.path().join("from-env");

    binary()
        .arg(&listing)
        .arg("-q")
        .env("DOWNLOAD_FOLDER", &folder)
        .assert()
        .code(0);
    assert!(folder.join("Jane_X.pdf").exists());
}
