//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use statenv_gateway::config::{ApiConfig, AppConfig, GatewayConfig, UpstreamMethod};
use statenv_gateway::http::HttpServer;
use statenv_gateway::security::secrets::StaticSecretStore;

/// Build a config with one app ("myblog") exposing one GET API
/// ("weather") pointed at `upstream_url`. Tests tweak the result.
pub fn base_config(bind: &str, upstream_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = bind.to_string();

    let mut app = AppConfig {
        name: "myblog".into(),
        origins: vec![
            "https://myblog.com".into(),
            "http://localhost:3000".into(),
        ],
        apis: HashMap::new(),
    };
    app.apis.insert(
        "weather".into(),
        ApiConfig {
            url: upstream_url.to_string(),
            secret_ref: "WEATHER_API_KEY".into(),
            method: UpstreamMethod::Get,
            allowed_params: vec!["q".into(), "units".into()],
            allowed_body_fields: vec![],
            cache_ttl_secs: 0,
        },
    );
    config.apps.push(app);
    config
}

/// Secret store holding the key `base_config` references.
pub fn test_secrets() -> StaticSecretStore {
    StaticSecretStore::from([("WEATHER_API_KEY", "s3cret")])
}

/// Spawn a gateway for `config` and wait for it to accept connections.
pub async fn start_gateway(config: GatewayConfig, secrets: StaticSecretStore) {
    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let server = HttpServer::new(config, Arc::new(secrets));
    tokio::spawn(async move {
        server.run(listener).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Start a mock upstream that counts calls and returns a fixed JSON
/// body. Returns the shared call counter.
#[allow(dead_code)]
pub async fn start_counting_backend(addr: SocketAddr, body: &'static str) -> Arc<AtomicU32> {
    let counter = Arc::new(AtomicU32::new(0));
    let calls = counter.clone();
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 16384];
                let _ = read_request(&mut socket, &mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    counter
}

/// Start a mock upstream that captures each raw request (request line,
/// headers, body) into the channel and returns a fixed JSON body.
#[allow(dead_code)]
pub async fn start_capturing_backend(
    addr: SocketAddr,
    body: &'static str,
) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 65536];
                if let Some(raw) = read_request(&mut socket, &mut buf).await {
                    let _ = tx.send(raw);
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    rx
}

/// Start a mock upstream that stalls for `delay` before answering.
#[allow(dead_code)]
pub async fn start_slow_backend(addr: SocketAddr, delay: Duration) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = vec![0u8; 16384];
                let _ = read_request(&mut socket, &mut buf).await;
                tokio::time::sleep(delay).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Read one HTTP/1.1 request (headers plus content-length body) off
/// the socket and return it as text.
async fn read_request(
    socket: &mut tokio::net::TcpStream,
    buf: &mut [u8],
) -> Option<String> {
    let mut total = 0;
    loop {
        let n = socket.read(&mut buf[total..]).await.ok()?;
        if n == 0 {
            break;
        }
        total += n;

        let text = String::from_utf8_lossy(&buf[..total]).into_owned();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if total >= header_end + 4 + content_length {
                return Some(text);
            }
        }
        if total == buf.len() {
            break;
        }
    }
    (total > 0).then(|| String::from_utf8_lossy(&buf[..total]).into_owned())
}
