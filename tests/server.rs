//! End-to-end over a real socket: hyper in front, the API behind.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{Value, json};
use sluice::api::{self, AppState};
use sluice::middleware::RateLimiter;
use sluice::{Error, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), Error>>,
}

async fn start() -> Running {
    let state = Arc::new(AppState::open(":memory:", b"server-test").unwrap());
    let dispatcher = api::dispatcher(&state, Arc::new(RateLimiter::per_minute(100)), "https://app.example");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(Server::serve_with_shutdown(listener, dispatcher, async move {
        let _ = stopped.await;
    }));
    Running { addr, stop, task }
}

/// Sends one HTTP/1.1 request and reads until the server closes.
async fn send(addr: SocketAddr, method: &str, path: &str, headers: &[(&str, &str)], body: &str) -> (u16, String, Option<Value>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (name, value) in headers {
        req.push_str(&format!("{name}: {value}\r\n"));
    }
    req.push_str(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();

    let (head, payload) = raw.split_once("\r\n\r\n").unwrap();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
    let json = if payload.is_empty() { None } else { Some(serde_json::from_str(payload).unwrap()) };
    (status, head.to_ascii_lowercase(), json)
}

#[tokio::test]
async fn serves_health_with_cors_headers() {
    let server = start().await;

    let (status, head, body) = send(server.addr, "GET", "/health", &[], "").await;
    assert_eq!(status, 200);
    assert_eq!(body, Some(json!({ "status": "ok" })));
    assert!(head.contains("content-type: application/json"));
    assert!(head.contains("access-control-allow-origin: https://app.example"));

    let (status, _, body) = send(server.addr, "OPTIONS", "/todos", &[], "").await;
    assert_eq!(status, 204);
    assert_eq!(body, None);

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn register_then_use_the_token() {
    let server = start().await;
    let creds = json!({ "email": "wire@x.io", "password": "pw" }).to_string();

    let (status, _, body) = send(server.addr, "POST", "/auth/register", &[("Content-Type", "application/json")], &creds).await;
    assert_eq!(status, 200);
    let token = format!("Bearer {}", body.unwrap()["token"].as_str().unwrap());

    let todo = json!({ "title": "over the wire" }).to_string();
    let (status, _, body) = send(server.addr, "POST", "/todos", &[("Authorization", token.as_str())], &todo).await;
    assert_eq!(status, 201);
    assert_eq!(body.unwrap()["title"], "over the wire");

    let (status, _, body) = send(server.addr, "GET", "/todos?limit=5", &[("Authorization", token.as_str())], "").await;
    assert_eq!(status, 200);
    let body = body.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["limit"], 5);

    let (status, _, _) = send(server.addr, "GET", "/me", &[], "").await;
    assert_eq!(status, 401);

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let server = start().await;
    let addr = server.addr;

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();

    assert!(TcpStream::connect(addr).await.is_err());
}
