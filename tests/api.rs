//! HTTP API tests: drive the full router in-process with `axum-test`.
//!
//! Only raster uploads are rendered, so no pdfium library is needed.

use axum::http::{header, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use bytes::Bytes;
use hekwerk::engine::RendererStatus;
use hekwerk::server::{router, AppState};
use hekwerk::{CalculatorConfig, EngineConfig, ServerConfig};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use std::io::Cursor;

fn not_probed() -> RendererStatus {
    RendererStatus {
        available: false,
        library: None,
        reason: Some("not probed in tests".into()),
    }
}

fn server_with(config: CalculatorConfig) -> TestServer {
    let state = AppState::new(config, &ServerConfig::default(), not_probed());
    TestServer::new(router(state.shared())).unwrap()
}

fn server() -> TestServer {
    server_with(CalculatorConfig::default())
}

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([255, 255, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn form(field: &str, filename: &str, data: &[u8]) -> MultipartForm {
    let part = Part::bytes(data.to_vec())
        .file_name(filename)
        .mime_type("application/octet-stream");
    MultipartForm::new().add_part(field.to_string(), part)
}

async fn upload(server: &TestServer, field: &str, filename: &str, data: &[u8]) -> (StatusCode, Value) {
    let response = server
        .post("/api/documents")
        .multipart(form(field, filename, data))
        .await;
    (response.status_code(), response.json::<Value>())
}

async fn upload_png(server: &TestServer) -> String {
    let (status, body) = upload(server, "file", "tekening.png", &png(400, 300)).await;
    assert_eq!(status, StatusCode::CREATED, "upload failed: {body}");
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn index_and_health() {
    let server = server();

    let response = server.get("/").await;
    response.assert_status_ok();
    assert!(response
        .header(header::CONTENT_TYPE)
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(response.text().contains("Hekwerk-oppervlakte-calculator"));

    let response = server.get("/healthz").await;
    response.assert_status_ok();
    let health = response.json::<Value>();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["pdf_renderer"]["available"], false);
    assert_eq!(health["documents"], 0);
}

#[tokio::test]
async fn upload_calibrate_measure_export() {
    let server = server();
    let id = upload_png(&server).await;

    // Page image
    let response = server.get(&format!("/api/documents/{id}/pages/1")).await;
    response.assert_status_ok();
    assert_eq!(response.header(header::CONTENT_TYPE), "image/png");
    assert!(response.as_bytes().starts_with(b"\x89PNG"));

    // Calibrate: 100 px = 1000 mm
    let response = server
        .post(&format!("/api/documents/{id}/pages/1/scale"))
        .json(&json!({
            "objects": [{ "type": "line", "x1": 10, "y1": 10, "x2": 110, "y2": 10 }],
            "real_length_mm": 1000
        }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["px_per_mm"], 0.1);

    // Measure with the stored scale
    let response = server
        .post(&format!("/api/documents/{id}/pages/1/measure"))
        .json(&json!({
            "panels": [{ "type": "rect", "left": 0, "top": 0, "width": 200, "height": 100, "scaleX": 1, "scaleY": 1 }],
            "posts": [{ "type": "line", "x1": 0, "y1": 0, "x2": 0, "y2": 300 }]
        }))
        .await;
    response.assert_status_ok();
    let report = response.json::<Value>();
    assert_eq!(report["page"], 1);
    assert_eq!(report["rows"][0]["id"], "p1-panel-1");
    assert_eq!(report["rows"][0]["area_m2"], 4.0);
    assert_eq!(report["rows"][1]["id"], "p1-post-1");
    assert_eq!(report["rows"][1]["area_m2"], 0.5655);
    assert_eq!(report["totals"]["total_m2"], 4.5655);

    // Export
    let response = server.get(&format!("/api/documents/{id}/export.csv")).await;
    response.assert_status_ok();
    assert!(response
        .header(header::CONTENT_DISPOSITION)
        .to_str()
        .unwrap()
        .contains("hekwerk_oppervlakte_resultaten.csv"));
    let csv = response.text();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Pagina,Type,ID,Breedte (mm),Hoogte (mm),Dubbelzijdig,Diameter (mm),Lengte (m),Oppervlakte (m²)"
    );
    assert_eq!(lines.next().unwrap(), "p1,Paneel,p1-panel-1,2000.0,1000.0,True,,,4.0");
    assert_eq!(lines.next().unwrap(), "p1,Paal/Buis,p1-post-1,,,,60.0,3.0,0.5655");

    // Delete
    let response = server.delete(&format!("/api/documents/{id}")).await;
    response.assert_status(StatusCode::NO_CONTENT);
    let response = server.get(&format!("/api/documents/{id}/pages/1")).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn measure_options_and_inline_scale() {
    let server = server();
    let id = upload_png(&server).await;

    let response = server
        .post(&format!("/api/documents/{id}/pages/1/measure"))
        .json(&json!({
            "scale": {
                "objects": [{ "type": "line", "x1": 0, "y1": 0, "x2": 100, "y2": 0 }],
                "real_length_mm": 1000
            },
            "panels": [
                { "type": "line", "x1": 0, "y1": 0, "x2": 5, "y2": 5 },
                { "type": "rect", "left": 0, "top": 0, "width": 200, "height": 100 }
            ],
            "posts": [{ "type": "line", "x1": 0, "y1": 0, "x2": 0, "y2": 300 }],
            "coat_both_sides": false,
            "diameter_overrides": { "p1-post-1": 100 }
        }))
        .await;
    response.assert_status_ok();
    let report = response.json::<Value>();
    assert_eq!(report["rows"][0]["id"], "p1-panel-2");
    assert_eq!(report["rows"][0]["area_m2"], 2.0);
    assert_eq!(report["rows"][0]["double_sided"], false);
    assert_eq!(report["rows"][1]["diameter_mm"], 100.0);
    assert_eq!(report["skipped"][0]["layer"], "panels");
    assert_eq!(report["skipped"][0]["position"], 1);
}

#[tokio::test]
async fn uncalibrated_page_has_no_rows() {
    let server = server();
    let id = upload_png(&server).await;

    let response = server
        .post(&format!("/api/documents/{id}/pages/1/measure"))
        .json(&json!({ "panels": [{ "type": "rect", "width": 10, "height": 10 }] }))
        .await;
    response.assert_status_ok();
    let report = response.json::<Value>();
    assert!(report["px_per_mm"].is_null());
    assert_eq!(report["rows"].as_array().unwrap().len(), 0);

    let response = server.get(&format!("/api/documents/{id}/export.csv")).await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["status"], 409);
}

#[tokio::test]
async fn rejects_bad_uploads() {
    let server = server();

    let (status, body) = upload(&server, "file", "notes.txt", b"hello").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].as_str().unwrap().contains("notes.txt"));

    let (status, _) = upload(&server, "file", "fake.pdf", b"<html></html>").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, _) = upload(&server, "file", "empty.png", b"").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = upload(&server, "other", "tekening.png", &png(4, 4)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = upload(&server, "file", "broken.png", b"\x89PNG\r\n\x1a\nxx").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn pdf_without_renderer_is_unavailable_but_images_work() {
    let cache = tempfile::tempdir().unwrap();
    let mut config = CalculatorConfig::default();
    config.engine = EngineConfig {
        library_path: Some(cache.path().join("missing").join("libpdfium.so")),
        cache_dir: Some(cache.path().to_path_buf()),
        auto_download: false,
    };
    let server = server_with(config);

    let (status, body) = upload(
        &server,
        "file",
        "tekening.pdf",
        b"%PDF-1.4\n1 0 obj << >> endobj\ntrailer << >>\n%%EOF\n",
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{body}");
    assert_eq!(body["status"], 503);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("PDF rendering is not available"));

    upload_png(&server).await;
}

#[tokio::test]
async fn unknown_documents_and_pages() {
    let server = server();

    let response = server
        .get("/api/documents/00000000-0000-4000-8000-000000000000/pages/1")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["status"], 404);

    let response = server.get("/api/documents/not-a-uuid/export.csv").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let id = upload_png(&server).await;
    let response = server.get(&format!("/api/documents/{id}/pages/2")).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(response.json::<Value>()["error"]
        .as_str()
        .unwrap()
        .contains("out of range"));
}

#[tokio::test]
async fn non_numeric_page_is_a_json_error() {
    let server = server();
    let id = upload_png(&server).await;

    let response = server.get(&format!("/api/documents/{id}/pages/abc")).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["status"], 400);
    assert!(body["error"].is_string());

    let response = server
        .post(&format!("/api/documents/{id}/pages/-1/measure"))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["status"], 400);
}

#[tokio::test]
async fn scale_errors() {
    let server = server();
    let id = upload_png(&server).await;
    let uri = format!("/api/documents/{id}/pages/1/scale");

    let response = server
        .post(&uri)
        .json(&json!({ "objects": [], "real_length_mm": 1000 }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = server
        .post(&uri)
        .json(&json!({
            "objects": [{ "type": "line", "x2": 50 }],
            "real_length_mm": 0
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = server
        .post(&uri)
        .bytes(Bytes::from_static(b"{ not json"))
        .content_type("application/json")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["status"], 400);
}

#[tokio::test]
async fn zero_length_recalibration_keeps_page_scale() {
    let server = server();
    let id = upload_png(&server).await;
    let uri = format!("/api/documents/{id}/pages/1/scale");

    server
        .post(&uri)
        .json(&json!({
            "objects": [{ "type": "line", "x1": 0, "y1": 0, "x2": 200, "y2": 0 }],
            "real_length_mm": 1000
        }))
        .await
        .assert_status_ok();

    let response = server
        .post(&uri)
        .json(&json!({
            "objects": [{ "type": "line", "x1": 0, "y1": 0, "x2": 50, "y2": 0 }],
            "real_length_mm": 0
        }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["px_per_mm"], 0.2);
}
