//! The `selfsync` binary against a local sync endpoint

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use rstest::rstest;
use selfsync_sync::{pack_archive, ArchiveEntry};
use std::path::Path;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::process::Command;

async fn sync_handler(_body: Bytes) -> impl IntoResponse {
    let body = pack_archive(&[ArchiveEntry::new("testing/c.png", vec![0x89, 0x50])]).unwrap();
    (StatusCode::OK, [("Deleted-Files", "")], body)
}

async fn serve() -> String {
    let app = Router::new().route("/api/sync", post(sync_handler));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/sync", addr)
}

fn write_config(dir: &Path, url: &str, vault: &Path) -> std::path::PathBuf {
    let path = dir.join("selfsync.yaml");
    let yaml = format!(
        "server:\n  url: '{}'\n  api_key: 'XYZ-123-ABC'\nvault:\n  root: '{}'\nlogging:\n  level: info\n",
        url,
        vault.display()
    );
    std::fs::write(&path, yaml).unwrap();
    path
}

#[rstest]
#[case::default_level(&[])]
#[case::verbose(&["--verbose"])]
#[case::debug(&["--debug"])]
#[tokio::test]
async fn test_sync_json_writes_only_json_to_stdout(#[case] flags: &[&str]) {
    let url = serve().await;
    let temp_dir = TempDir::new().unwrap();
    let vault = temp_dir.path().join("testing");
    std::fs::create_dir(&vault).unwrap();
    std::fs::write(vault.join("a.md"), "# a").unwrap();
    let config = write_config(temp_dir.path(), &url, &vault);

    let output = Command::new(env!("CARGO_BIN_EXE_selfsync"))
        .args(flags)
        .arg("--config")
        .arg(&config)
        .args(["sync", "--json"])
        .env_remove("RUST_LOG")
        .current_dir(temp_dir.path())
        .output()
        .await
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "selfsync failed: {}", stderr);

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["uploaded"], serde_json::json!(["a.md"]));
    assert_eq!(report["written"], serde_json::json!(["c.png"]));
    assert_eq!(report["metadata"]["vault"], "testing");
    assert!(vault.join("c.png").exists());

    if !flags.is_empty() {
        assert!(stderr.contains("SelfSync v"), "logs missing from stderr: {}", stderr);
    }
}
