mod support;

use ridgeline_server::media::CloudinaryUploader;
use ridgeline_server::{AppState, MediaUploader};
use ridgeline_store::{DocumentDb, DualWriteStore, FileMirror, StorageMode};
use serde_json::Value;
use std::io::Read;
use std::sync::{Arc, Mutex};
use support::{bearer, get, header_value, send, start, start_with, test_config};

const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89,
];
const BOUNDARY: &str = "ridgeline-test-boundary";

fn multipart(file_name: &str, content_type: &str, bytes: &[u8], folder: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(folder) = folder {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\n{folder}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn upload(addr: std::net::SocketAddr, body: &[u8]) -> (u16, Value) {
    let auth = bearer();
    let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
    let (status, _, text) = send(
        addr,
        "POST",
        "/api/admin/upload",
        &[("Authorization", &auth), ("Content-Type", &content_type)],
        body,
    )
    .await;
    (status, serde_json::from_str(&text).expect("json"))
}

#[tokio::test]
async fn local_uploads_are_served_and_deletable() {
    let site = start().await;
    let body = multipart("Rafting Day.png", "image/png", PNG, Some("Tours"));
    let (status, stored) = upload(site.addr, &body).await;
    assert_eq!(status, 201);
    assert_eq!(stored["backend"], "local");
    assert_eq!(stored["content_type"], "image/png");
    let url = stored["url"].as_str().expect("url").to_string();
    assert!(url.starts_with("/uploads/tours/rafting-day-"), "{url}");
    assert!(url.ends_with(".png"));

    let (status, head, _) = get(site.addr, &url, &[]).await;
    assert_eq!(status, 200);
    assert_eq!(header_value(&head, "content-type"), Some("image/png"));

    let auth = bearer();
    let delete_path = format!("/api/admin/upload?path={url}");
    let (status, _, _) = send(site.addr, "DELETE", &delete_path, &[("Authorization", &auth)], b"").await;
    assert_eq!(status, 200);
    let (status, _, _) = send(site.addr, "DELETE", &delete_path, &[("Authorization", &auth)], b"").await;
    assert_eq!(status, 404);

    let (status, _, _) = send(
        site.addr,
        "DELETE",
        "/api/admin/upload?path=/uploads/../secrets.txt",
        &[("Authorization", &auth)],
        b"",
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn uploads_reject_non_images_and_oversized_files() {
    let site = start_with(|cfg| cfg.max_upload_bytes = 16).await;

    let (status, err) = upload(site.addr, &multipart("notes.txt", "text/plain", b"hello there", None)).await;
    assert_eq!(status, 415);
    assert_eq!(err["error"]["code"], "UnsupportedMediaType");

    let (status, err) = upload(site.addr, &multipart("big.png", "image/png", PNG, None)).await;
    assert_eq!(status, 413);
    assert_eq!(err["error"]["code"], "PayloadTooLarge");

    let no_file = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\ntours\r\n--{BOUNDARY}--\r\n"
    );
    let (status, err) = upload(site.addr, no_file.as_bytes()).await;
    assert_eq!(status, 422);
    assert_eq!(err["error"]["code"], "ValidationFailed");
}

#[tokio::test]
async fn mismatched_declared_type_is_rejected() {
    let site = start().await;
    let (status, err) = upload(site.addr, &multipart("photo.jpg", "image/jpeg", PNG, None)).await;
    assert_eq!(status, 415);
    assert!(err["error"]["message"]
        .as_str()
        .is_some_and(|m| m.contains("does not match")));
}

struct FakeCloudinary {
    base_url: String,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

/// Records every request and answers like Cloudinary's upload/destroy API,
/// or with an error body when `fail` is set.
fn fake_cloudinary(fail: bool) -> FakeCloudinary {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("fake cloudinary");
    let addr = server.server_addr().to_ip().expect("ip addr");
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();
    std::thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let mut body = Vec::new();
            let _ = request.as_reader().read_to_end(&mut body);
            let url = request.url().to_string();
            seen.lock()
                .expect("lock")
                .push((url.clone(), String::from_utf8_lossy(&body).to_string()));
            let (status, reply) = if fail {
                (400, r#"{"error":{"message":"Invalid Signature"}}"#.to_string())
            } else if url.ends_with("/destroy") {
                (200, r#"{"result":"ok"}"#.to_string())
            } else {
                (
                    200,
                    r#"{"secure_url":"https://res.cloudinary.com/demo/image/upload/v1/ridgeline/tours/rafting-day.png","public_id":"ridgeline/tours/rafting-day","bytes":33}"#
                        .to_string(),
                )
            };
            let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("header");
            let _ = request.respond(
                tiny_http::Response::from_string(reply)
                    .with_status_code(status)
                    .with_header(header),
            );
        }
    });
    FakeCloudinary {
        base_url: format!("http://{addr}"),
        requests,
    }
}

async fn cloudinary_site(fake: &FakeCloudinary) -> (std::net::SocketAddr, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&dir);
    let store = Arc::new(DualWriteStore::new(
        Arc::new(DocumentDb::open(&config.db_path).expect("db")),
        Arc::new(FileMirror::new(config.content_root.clone())),
        StorageMode::Dual,
    ));
    let media: Arc<dyn MediaUploader> = Arc::new(
        CloudinaryUploader::new(
            "demo",
            "key-123",
            "secret-456",
            &fake.base_url,
            "ridgeline",
            config.max_upload_bytes,
        )
        .expect("uploader"),
    );
    let addr = support::serve(AppState::new(config, store, media)).await;
    (addr, dir)
}

#[tokio::test]
async fn cloudinary_uploads_are_signed_and_return_handles() {
    let fake = fake_cloudinary(false);
    let (addr, _dir) = cloudinary_site(&fake).await;

    let (status, stored) = upload(addr, &multipart("Rafting Day.png", "image/png", PNG, Some("tours"))).await;
    assert_eq!(status, 201);
    assert_eq!(stored["backend"], "cloudinary");
    assert_eq!(stored["path"], "cloudinary:ridgeline/tours/rafting-day");
    assert!(stored["url"]
        .as_str()
        .is_some_and(|u| u.starts_with("https://res.cloudinary.com/demo/")));

    let auth = bearer();
    let (status, _, _) = send(
        addr,
        "DELETE",
        "/api/admin/upload?path=cloudinary:ridgeline/tours/rafting-day",
        &[("Authorization", &auth)],
        b"",
    )
    .await;
    assert_eq!(status, 200);

    let requests = fake.requests.lock().expect("lock").clone();
    assert_eq!(requests.len(), 2);
    let (upload_url, upload_body) = &requests[0];
    assert_eq!(upload_url, "/v1_1/demo/image/upload");
    for field in ["api_key", "timestamp", "public_id", "signature", "signature_algorithm", "folder"] {
        assert!(upload_body.contains(&format!("name=\"{field}\"")), "{field}");
    }
    assert!(upload_body.contains("ridgeline/tours"));
    assert!(!upload_body.contains("secret-456"));
    let (destroy_url, destroy_body) = &requests[1];
    assert_eq!(destroy_url, "/v1_1/demo/image/destroy");
    assert!(destroy_body.contains("public_id=ridgeline%2Ftours%2Frafting-day"));
}

#[tokio::test]
async fn cloudinary_errors_surface_as_upload_failures() {
    let fake = fake_cloudinary(true);
    let (addr, _dir) = cloudinary_site(&fake).await;
    let (status, err) = upload(addr, &multipart("a.png", "image/png", PNG, None)).await;
    assert_eq!(status, 502);
    assert_eq!(err["error"]["code"], "UploadFailed");
    assert!(err["error"]["message"]
        .as_str()
        .is_some_and(|m| m.contains("Invalid Signature")));
}
