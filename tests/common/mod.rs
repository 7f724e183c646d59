//! Shared test fixtures for integration tests, per the `MockSseServer`
//! fixture named in the crate's test-fixtures documentation: binds
//! `127.0.0.1:0` and serves a scripted sequence of raw HTTP responses.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one scripted response body per accepted connection, in order.
/// The `n`th request gets `responses[n.min(responses.len() - 1)]`, so a
/// server with one script entry repeats it for every request.
pub async fn spawn_scripted_server(responses: Vec<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut served = 0usize;
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            let body = responses[served.min(responses.len() - 1)];
            served += 1;
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}/v1/chat/completions")
}

/// Point the process's config-dir resolution at a fresh temp directory for
/// the duration of the calling test. Not safe to use across threads running
/// other tests concurrently against the real state dir — callers should
/// serialize via `#[serial_test::serial]`-style discipline or, as here,
/// accept that tests using this run single-threaded relative to each other.
pub fn isolate_state_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("XDG_CONFIG_HOME", dir.path());
    dir
}
