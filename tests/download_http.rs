use std::time::Duration;

use file_converter::contract::Fetcher;
use file_converter::download::HttpFetcher;
use file_converter::error::DownloadError;
use tempfile::tempdir;

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(10)).expect("client builds")
}

#[tokio::test]
async fn writes_body_to_destination() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/file.txt")
        .with_status(200)
        .with_body("some bytes")
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let dest = dir.path().join("file.txt");
    let written = fetcher()
        .fetch(&format!("{}/file.txt", server.url()), &dest, 1024)
        .await
        .expect("download succeeds");

    assert_eq!(written, 10);
    assert_eq!(std::fs::read(&dest).unwrap(), b"some bytes");
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_carries_code_and_reason() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/private")
        .with_status(403)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let err = fetcher()
        .fetch(&format!("{}/private", server.url()), &dir.path().join("x"), 1024)
        .await
        .unwrap_err();

    match err {
        DownloadError::Status { code, reason } => {
            assert_eq!(code, 403);
            assert_eq!(reason, "Forbidden");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dir.path().join("x").exists(), "nothing written on failure");
}

#[tokio::test]
async fn body_over_limit_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/big")
        .with_status(200)
        .with_body(vec![0u8; 4096])
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let err = fetcher()
        .fetch(&format!("{}/big", server.url()), &dir.path().join("big"), 1000)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::TooLarge { limit: 1000 }));
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let dir = tempdir().unwrap();
    // Port 9 (discard) on loopback is not expected to be listening.
    let err = fetcher()
        .fetch("http://127.0.0.1:9/file", &dir.path().join("f"), 1024)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DownloadError::Transport(_) | DownloadError::Timeout { .. }
    ));
}
