//! Shared test helpers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Spin up a mock HTTP server that returns the given body for any request.
/// Accepts connections until the test ends; returns the bound address and a
/// counter of requests served.
pub async fn mock_http_server(
    response_body: &'static str,
    status: u16,
) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();
    let status_line = match status {
        200 => "200 OK",
        201 => "201 Created",
        400 => "400 Bad Request",
        401 => "401 Unauthorized",
        404 => "404 Not Found",
        _ => "500 Internal Server Error",
    };
    tokio::spawn(async move {
        loop {
            if let Ok((mut stream, _)) = listener.accept().await {
                hits_clone.fetch_add(1, Ordering::SeqCst);
                let resp = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    response_body.len(),
                    response_body
                );
                let mut buf = [0u8; 16384];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(resp.as_bytes()).await;
            }
        }
    });
    (addr, hits)
}

/// Mock server variant that captures the first request's raw bytes so tests
/// can assert on headers and body.
pub async fn capturing_http_server(
    response_body: &'static str,
    status: u16,
) -> (SocketAddr, Arc<std::sync::Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(std::sync::Mutex::new(Vec::new()));
    let requests_clone = requests.clone();
    let status_line = match status {
        200 => "200 OK",
        201 => "201 Created",
        _ => "500 Internal Server Error",
    };
    tokio::spawn(async move {
        loop {
            if let Ok((mut stream, _)) = listener.accept().await {
                let resp = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    response_body.len(),
                    response_body
                );
                let data = read_full_request(&mut stream).await;
                requests_clone
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&data).to_string());
                let _ = stream.write_all(resp.as_bytes()).await;
            }
        }
    });
    (addr, requests)
}

/// Read an HTTP/1.1 request until the content-length is satisfied, so body
/// assertions do not race segment boundaries.
async fn read_full_request(stream: &mut tokio::net::TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buf = [0u8; 16384];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                data.extend_from_slice(&buf[..n]);
                let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let headers = String::from_utf8_lossy(&data[..pos]).to_lowercase();
                let body_len = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if data.len() >= pos + 4 + body_len {
                    break;
                }
            }
        }
    }
    data
}

/// A listener that never responds but records whether anything connected.
/// Used to prove a code path performs no network call.
pub async fn tripwire_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();
    tokio::spawn(async move {
        loop {
            if let Ok((_stream, _)) = listener.accept().await {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }
        }
    });
    (addr, hits)
}
