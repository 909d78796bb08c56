#![allow(dead_code)]

use std::net::SocketAddr;

use gallery::{build_router, AppState, Config};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const BOUNDARY: &str = "gallery-test-boundary";

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _dir: TempDir,
}

pub async fn spawn_server() -> TestServer {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        db_path: dir.path().join("gallery.db"),
        upload_dir: dir.path().join("uploads"),
        secret_key: "integration-test-secret".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        pool_size: 4,
        ..Config::default()
    };
    let state = tokio::task::spawn_blocking(move || AppState::open(config))
        .await
        .expect("startup task")
        .expect("open state");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = build_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    TestServer {
        addr,
        state,
        _dir: dir,
    }
}

pub struct RawResponse {
    pub status: u16,
    pub head: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    /// `name=value` of the session cookie set by this response.
    pub fn session_cookie(&self) -> Option<String> {
        let set = self.header("set-cookie")?;
        let pair = set.split(';').next()?.trim();
        pair.starts_with("gallery_session=").then(|| pair.to_string())
    }
}

pub async fn send(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<(&str, &[u8])>,
) -> RawResponse {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    match body {
        Some((content_type, payload)) => {
            req.push_str(&format!("Content-Type: {content_type}\r\n"));
            req.push_str(&format!("Content-Length: {}\r\n", payload.len()));
        }
        None if method != "GET" => req.push_str("Content-Length: 0\r\n"),
        None => {}
    }
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    req.push_str("\r\n");

    let mut bytes = req.into_bytes();
    if let Some((_, payload)) = body {
        bytes.extend_from_slice(payload);
    }
    stream.write_all(&bytes).await.expect("write request");

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .expect("read response");
    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("http response must have separator");
    let head = String::from_utf8_lossy(&response[..split]).into_owned();
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    RawResponse {
        status,
        head,
        body: response[split + 4..].to_vec(),
    }
}

pub async fn get(addr: SocketAddr, path: &str, headers: &[(&str, &str)]) -> RawResponse {
    send(addr, "GET", path, headers, None).await
}

pub async fn post_json(addr: SocketAddr, path: &str, body: &serde_json::Value) -> RawResponse {
    let payload = body.to_string();
    send(
        addr,
        "POST",
        path,
        &[],
        Some(("application/json", payload.as_bytes())),
    )
    .await
}

pub async fn post_form(
    addr: SocketAddr,
    path: &str,
    cookie: Option<&str>,
    form: &str,
) -> RawResponse {
    let headers: Vec<(&str, &str)> = cookie.map(|c| ("Cookie", c)).into_iter().collect();
    send(
        addr,
        "POST",
        path,
        &headers,
        Some(("application/x-www-form-urlencoded", form.as_bytes())),
    )
    .await
}

/// Log in as a seeded admin and return the `Cookie` header value.
pub async fn login(addr: SocketAddr) -> String {
    let res = post_form(addr, "/login", None, "username=admin1&password=123456").await;
    assert_eq!(res.status, 303);
    assert_eq!(res.header("location"), Some("/admin"));
    res.session_cookie().expect("session cookie")
}

pub struct FilePart<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

pub fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.filename, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn upload(addr: SocketAddr, cookie: &str, body: &[u8]) -> RawResponse {
    let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
    send(
        addr,
        "POST",
        "/upload",
        &[("Cookie", cookie)],
        Some((&content_type, body)),
    )
    .await
}

pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9];
