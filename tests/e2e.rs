//! End-to-end tests against real PDF drawings in `./test_cases/`.
//!
//! They need a working pdfium library (downloaded on first use or taken from
//! `PDFIUM_LIB_PATH`) and are gated behind `E2E_ENABLED` so they do not run
//! in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use hekwerk::engine::{self, RendererStatus};
use hekwerk::server::{router, AppState};
use hekwerk::{
    inspect, load_drawing_from_path, measure_page, CalculatorConfig, CanvasObject, Line,
    MeasureOptions, Rect, ResultsTable, Scale, ServerConfig, SourceKind,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = test_cases_dir().join("output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test if E2E_ENABLED is not set *or* no drawing at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            println!("       Put a fence drawing at test_cases/hekwerk.pdf");
            return;
        }
        p
    }};
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_renderer_probe() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let config = CalculatorConfig::default();
    let status: RendererStatus =
        tokio::task::spawn_blocking(move || engine::probe(&config.engine))
            .await
            .unwrap();
    println!("renderer: {status:?}");
    assert!(status.available, "pdfium not available: {:?}", status.reason);
}

#[tokio::test]
async fn test_inspect_pdf() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("hekwerk.pdf"));
    let info = inspect(&path, &CalculatorConfig::default()).await.unwrap();

    println!("{info:#?}");
    assert_eq!(info.kind, SourceKind::Pdf);
    assert!(info.page_count >= 1);
    assert_eq!(info.pages.len(), info.page_count);
    assert!(info.pages.iter().all(|p| p.width > 0.0 && p.height > 0.0));
}

#[tokio::test]
async fn test_render_at_configured_dpi() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("hekwerk.pdf"));
    let config = CalculatorConfig::default();
    let info = inspect(&path, &config).await.unwrap();
    let drawing = load_drawing_from_path(&path, &config).await.unwrap();

    assert_eq!(drawing.page_count(), info.page_count);
    for (page, size) in drawing.pages.iter().zip(&info.pages) {
        let expected = size.width * config.render_scale();
        let tolerance = 2.0_f32.max(expected * 0.01);
        if expected <= config.max_rendered_pixels as f32 {
            assert!(
                (page.width as f32 - expected).abs() <= tolerance,
                "page {}: rendered {} px wide, expected ~{expected}",
                page.number,
                page.width
            );
        }
        assert!(page.png.starts_with(b"\x89PNG"));
    }
}

#[tokio::test]
async fn test_measure_and_export_pdf() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("hekwerk.pdf"));
    let config = CalculatorConfig::default();
    let drawing = load_drawing_from_path(&path, &config).await.unwrap();
    let page = drawing.page(1).unwrap();

    // Treat the full page width as one metre.
    let scale = Scale::new(page.width as f64 / 1000.0).unwrap();
    let w = page.width as f64;
    let h = page.height as f64;
    let panels = [CanvasObject::Rect(Rect::new(0.0, 0.0, w / 2.0, h / 2.0))];
    let posts = [CanvasObject::Line(Line::new(0.0, 0.0, w, 0.0))];
    let report = measure_page(0, Some(scale), &panels, &posts, &MeasureOptions::default());

    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[1].length_m, Some(1.0));

    let out = output_dir().join("hekwerk_oppervlakte_resultaten.csv");
    ResultsTable::from_reports([&report]).write_csv(&out).unwrap();
    let csv = std::fs::read_to_string(&out).unwrap();
    assert!(csv.starts_with("Pagina,Type,ID"));
    println!("{csv}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_renders_share_one_library() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("hekwerk.pdf"));
    let config = CalculatorConfig::default();

    let (a, b, c) = tokio::join!(
        load_drawing_from_path(&path, &config),
        load_drawing_from_path(&path, &config),
        inspect(&path, &config),
    );
    let (a, b, info) = (a.unwrap(), b.unwrap(), c.unwrap());
    assert_eq!(a.page_count(), info.page_count);
    for (pa, pb) in a.pages.iter().zip(&b.pages) {
        assert_eq!(pa.png, pb.png, "page {} differs between renders", pa.number);
    }

    let engine_config = config.engine.clone();
    let same = tokio::task::spawn_blocking(move || {
        let first = engine::pdfium(&engine_config).unwrap();
        let second = engine::pdfium(&engine_config).unwrap();
        std::ptr::eq(first, second)
    })
    .await
    .unwrap();
    assert!(same);

    // The library must still work after the earlier renders finished.
    let again = load_drawing_from_path(&path, &config).await.unwrap();
    assert_eq!(again.pages[0].png, a.pages[0].png);
}

#[tokio::test]
async fn test_upload_pdf_over_http() {
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;

    let path = e2e_skip_unless_ready!(test_cases_dir().join("hekwerk.pdf"));
    let data = std::fs::read(&path).unwrap();

    let config = CalculatorConfig::default();
    let engine_config = config.engine.clone();
    let renderer = tokio::task::spawn_blocking(move || engine::probe(&engine_config))
        .await
        .unwrap();
    let server = TestServer::new(router(
        AppState::new(config, &ServerConfig::default(), renderer).shared(),
    ))
    .unwrap();

    let part = Part::bytes(data)
        .file_name("hekwerk.pdf")
        .mime_type("application/pdf");
    let response = server
        .post("/api/documents")
        .multipart(MultipartForm::new().add_part("file", part))
        .await;
    response.assert_status(StatusCode::CREATED);

    let summary = response.json::<serde_json::Value>();
    assert_eq!(summary["kind"], "pdf");
    assert!(!summary["pages"].as_array().unwrap().is_empty());
}
