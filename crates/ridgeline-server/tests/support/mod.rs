#![allow(dead_code)]

use chrono::Utc;
use ridgeline_model::{Activity, ActivityTranslation, Difficulty, Locale, Slug};
use ridgeline_server::media::LocalDiskUploader;
use ridgeline_server::{build_router, AppState, MediaUploader, SiteConfig, UploadBackendConfig};
use ridgeline_store::{DocumentDb, DualWriteStore, FileMirror, StorageMode};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const ADMIN_TOKEN: &str = "admin-token-for-tests";
pub const REVALIDATE_SECRET: &str = "revalidate-secret-for-tests";

pub struct TestSite {
    pub addr: SocketAddr,
    pub state: AppState,
    pub dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> SiteConfig {
    let public_root = dir.path().join("public");
    SiteConfig {
        content_root: dir.path().join("content"),
        db_path: dir.path().join("data/ridgeline.sqlite"),
        public_root: public_root.clone(),
        admin_tokens: vec![ADMIN_TOKEN.to_string()],
        session_secret: "0123456789abcdef0123456789".to_string(),
        revalidate_secret: Some(REVALIDATE_SECRET.to_string()),
        enable_debug_dashboard: true,
        upload: UploadBackendConfig::Local { public_root },
        ..SiteConfig::default()
    }
}

pub fn local_state(config: SiteConfig) -> AppState {
    let db = DocumentDb::open(&config.db_path).expect("open db");
    let files = FileMirror::new(config.content_root.clone());
    let store = Arc::new(DualWriteStore::new(
        Arc::new(db),
        Arc::new(files),
        StorageMode::Dual,
    ));
    let media: Arc<dyn MediaUploader> = Arc::new(LocalDiskUploader::new(
        config.public_root.clone(),
        config.max_upload_bytes,
    ));
    AppState::new(config, store, media)
}

pub async fn serve(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("serve");
    });
    addr
}

pub async fn start_with(customize: impl FnOnce(&mut SiteConfig)) -> TestSite {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(&dir);
    customize(&mut config);
    let state = local_state(config);
    let addr = serve(state.clone()).await;
    TestSite { addr, state, dir }
}

pub async fn start() -> TestSite {
    start_with(|_| {}).await
}

pub async fn send(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &[u8],
) -> (u16, String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    req.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
    let mut bytes = req.into_bytes();
    bytes.extend_from_slice(body);
    stream.write_all(&bytes).await.expect("write request");
    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .expect("read response");
    let response = String::from_utf8_lossy(&response).to_string();
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    (status, head.to_string(), body.to_string())
}

pub async fn get(addr: SocketAddr, path: &str, headers: &[(&str, &str)]) -> (u16, String, String) {
    send(addr, "GET", path, headers, b"").await
}

pub fn header_value<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().skip(1).find_map(|line| {
        let (k, v) = line.split_once(':')?;
        k.trim().eq_ignore_ascii_case(name).then(|| v.trim())
    })
}

pub fn locale(raw: &str) -> Locale {
    Locale::parse(raw).expect("locale")
}

pub fn activity(slug: &str, title_es: &str, title_en: &str, published: bool) -> Activity {
    let mut translations = BTreeMap::new();
    translations.insert(
        locale("es"),
        ActivityTranslation {
            title: title_es.to_string(),
            summary: format!("{title_es} resumen"),
            body: "Un **gran** día.".to_string(),
            ..ActivityTranslation::default()
        },
    );
    translations.insert(
        locale("en"),
        ActivityTranslation {
            title: title_en.to_string(),
            summary: format!("{title_en} summary"),
            body: "A **great** day.".to_string(),
            ..ActivityTranslation::default()
        },
    );
    Activity {
        slug: Slug::parse(slug).expect("slug"),
        category: "water".to_string(),
        difficulty: Difficulty::Moderate,
        duration_minutes: 240,
        price: None,
        min_age: Some(12),
        max_group_size: Some(10),
        cover_image: "images/rafting.jpg".to_string(),
        gallery: Vec::new(),
        featured: true,
        published,
        sort_order: 0,
        translations,
        updated_at: Utc::now(),
    }
}

pub fn bearer() -> String {
    format!("Bearer {ADMIN_TOKEN}")
}
