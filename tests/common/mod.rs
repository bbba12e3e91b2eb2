//! Shared utilities for integration tests: a programmable origin and a
//! running mirror bound to ephemeral ports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use mirror_proxy::config::MirrorConfig;
use mirror_proxy::http::HttpServer;
use mirror_proxy::lifecycle::{startup, Shutdown};

type Headers = HashMap<String, String>;

/// What the origin saw: hit counts and the latest headers, by request path.
#[derive(Default)]
struct Seen {
    hits: HashMap<String, u32>,
    headers: HashMap<String, Headers>,
}

/// A fake origin that records every request it sees.
pub struct MockOrigin {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Seen>>,
}

impl MockOrigin {
    /// Requests received for `path` (with leading slash).
    pub fn hits(&self, path: &str) -> u32 {
        self.seen.lock().unwrap().hits.get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> u32 {
        self.seen.lock().unwrap().hits.values().sum()
    }

    /// Headers of the latest request for `path`, names lowercased.
    pub fn headers(&self, path: &str) -> Option<Headers> {
        self.seen.lock().unwrap().headers.get(path).cloned()
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Raw 200 response with a correct Content-Length.
pub fn ok(body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

/// Raw response with the given status and a short text body.
pub fn status(code: u16) -> Vec<u8> {
    let text = match code {
        404 => "404 Not Found",
        403 => "403 Forbidden",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "500 Internal Server Error",
    };
    format!(
        "HTTP/1.1 {}\r\nContent-Length: 5\r\nConnection: close\r\n\r\noops!",
        text
    )
    .into_bytes()
}

/// 200 that promises `declared` bytes and hangs up after `body`.
pub fn truncated(declared: usize, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        declared
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

/// Start an origin whose reply is computed from the request path.
pub async fn start_origin<F, Fut>(f: F) -> MockOrigin
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Vec<u8>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Seen::default()));
    let recorder = Arc::clone(&seen);
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = Arc::clone(&f);
            let recorder = Arc::clone(&recorder);
            tokio::spawn(async move {
                let Some((path, headers)) = read_request_head(&mut socket).await else {
                    return;
                };
                {
                    let mut seen = recorder.lock().unwrap();
                    *seen.hits.entry(path.clone()).or_insert(0) += 1;
                    seen.headers.insert(path.clone(), headers);
                }

                let response = f(path).await;
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    MockOrigin { addr, seen }
}

/// Start an origin that serves fixed bodies by path and 404s everything else.
pub async fn start_static_origin(files: &[(&str, &'static [u8])]) -> MockOrigin {
    let files: HashMap<String, &'static [u8]> =
        files.iter().map(|(p, b)| (p.to_string(), *b)).collect();
    let files = Arc::new(files);
    start_origin(move |path| {
        let files = Arc::clone(&files);
        async move {
            match files.get(&path) {
                Some(body) => ok(body),
                None => status(404),
            }
        }
    })
    .await
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) -> Option<(String, Headers)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 2048];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    let mut lines = head.lines();
    let path = lines.next()?.split_whitespace().nth(1)?.to_string();
    let headers = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    Some((path, headers))
}

/// A mirror server running in the background.
pub struct RunningMirror {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl RunningMirror {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningMirror {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a mirror of `origin` rooted at `root`.
pub async fn start_mirror(origin: &str, root: &Path) -> RunningMirror {
    let mut config = MirrorConfig::default();
    config.upstream.origin = origin.to_string();
    config.mirror.root = root.to_string_lossy().into_owned();
    config.listener.bind_address = "127.0.0.1:0".into();

    let engine = startup::build_engine(&config).await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, engine);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningMirror { addr, shutdown }
}

/// Client that does not follow redirects, so 307s can be asserted on.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
