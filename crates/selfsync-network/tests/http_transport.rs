//! HttpTransport against a local axum endpoint

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use selfsync_network::{ClientConfig, HttpTransport};
use selfsync_sync::{pack_archive, parse_response, ArchiveEntry};
use selfsync_types::{ErrorKind, SyncRequest, SyncTransport, UploadBlob};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Default)]
struct Received {
    authorization: Option<String>,
    files: Vec<(String, Vec<u8>)>,
    all_paths: Vec<String>,
    deleted_paths: Vec<String>,
    timestamp: Option<String>,
}

type Shared = Arc<Mutex<Received>>;

async fn sync_handler(
    State(received): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut seen = Received {
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string),
        ..Received::default()
    };

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(ToString::to_string);
        let data: bytes::Bytes = field.bytes().await.unwrap();
        let text = String::from_utf8_lossy(&data).into_owned();
        match name.as_str() {
            "modified_and_new_client_files" => {
                seen.files.push((file_name.unwrap_or_default(), data.to_vec()));
            }
            "all_client_paths" => seen.all_paths.push(text),
            "deleted_client_paths" => seen.deleted_paths.push(text),
            "last_sync_timestamp" => seen.timestamp = Some(text),
            _ => {}
        }
    }
    *received.lock().unwrap() = seen;

    let body = pack_archive(&[ArchiveEntry::new("testing/c.png", vec![1, 2, 3])]).unwrap();
    (
        StatusCode::OK,
        [("Deleted-Files", "a.md, old/b.pdf")],
        body,
    )
}

async fn failing_handler() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn serve() -> (String, Shared) {
    let received = Shared::default();
    let app = Router::new()
        .route("/api/sync", post(sync_handler))
        .route("/api/broken", post(failing_handler))
        .with_state(received.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), received)
}

fn request() -> SyncRequest {
    SyncRequest {
        files_to_upload: vec![
            UploadBlob::new("notes/a.md", b"# hello".to_vec()),
            UploadBlob::new("b.jpg", vec![0xff, 0xd8]),
        ],
        all_client_paths: BTreeSet::from(["notes/a.md".to_string(), "b.jpg".to_string()]),
        deleted_client_paths: BTreeSet::from(["gone.md".to_string()]),
        last_sync_timestamp: 1_712_345_678.5,
    }
}

#[tokio::test]
async fn test_exchange_sends_form_and_captures_reply() {
    let (base, received) = serve().await;
    let transport =
        HttpTransport::new(ClientConfig::new(format!("{}/api/sync", base), "XYZ-123-ABC")).unwrap();

    let reply = transport.exchange(&request()).await.unwrap();

    {
        let seen = received.lock().unwrap();
        assert_eq!(seen.authorization.as_deref(), Some("Bearer XYZ-123-ABC"));
        assert_eq!(
            seen.files,
            vec![
                ("notes/a.md".to_string(), b"# hello".to_vec()),
                ("b.jpg".to_string(), vec![0xff, 0xd8]),
            ]
        );
        assert_eq!(seen.all_paths, vec!["b.jpg", "notes/a.md"]);
        assert_eq!(seen.deleted_paths, vec!["gone.md"]);
        assert_eq!(seen.timestamp.as_deref(), Some("1712345678.5"));
    }

    assert_eq!(reply.deleted_files_header.as_deref(), Some("a.md, old/b.pdf"));
    let response = parse_response(&reply.body, reply.deleted_files_header.as_deref()).unwrap();
    assert_eq!(response.files_to_write[0].archive_path, "testing/c.png");
    assert!(response.deleted_server_paths.contains("old/b.pdf"));
}

#[tokio::test]
async fn test_placeholder_upload() {
    let (base, received) = serve().await;
    let transport =
        HttpTransport::new(ClientConfig::new(format!("{}/api/sync", base), "key")).unwrap();

    let mut request = request();
    request.files_to_upload = vec![UploadBlob::placeholder()];
    request.last_sync_timestamp = 0.0;
    transport.exchange(&request).await.unwrap();

    let seen = received.lock().unwrap();
    assert_eq!(seen.files, vec![("empty".to_string(), Vec::new())]);
    assert_eq!(seen.timestamp.as_deref(), Some("0"));
}

#[tokio::test]
async fn test_non_success_status_is_transport_error() {
    let (base, _received) = serve().await;
    let transport =
        HttpTransport::new(ClientConfig::new(format!("{}/api/broken", base), "key")).unwrap();

    let err = transport.exchange(&request()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport =
        HttpTransport::new(ClientConfig::new(format!("http://{}/api/sync", addr), "key")).unwrap();
    let err = transport.exchange(&request()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}
