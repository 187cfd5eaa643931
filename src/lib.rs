//! # hekwerk
//!
//! Estimate the coatable surface of a fence from its technical drawing.
//!
//! A drawing (PDF or raster image) is rasterised once. On each page the user
//! traces one line of known length to fix the scale, draws rectangles over
//! the panels and lines along the posts. Panels count as flat sheets, posts
//! as cylinder mantles.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (PDF / PNG / JPEG / BMP / TIFF)
//!  │
//!  ├─ 1. Input    classify by extension, fall back to magic bytes
//!  ├─ 2. Render   PDF pages via pdfium at dpi/72 (spawn_blocking)
//!  │   or Decode  single raster image → RGB
//!  ├─ 3. Encode   PNG per page, served to the browser
//!  ├─ 4. Scale    longest calibration line / real length → px per mm
//!  ├─ 5. Measure  panels (w·h, ×2 if coated both sides), posts (π·Ø·L)
//!  └─ 6. Report   results table, totals, CSV export
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hekwerk::{load_drawing_from_path, measure_page, CalculatorConfig, CanvasObject, Line, Rect, Scale, MeasureOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CalculatorConfig::default();
//!     let drawing = load_drawing_from_path("hekwerk.pdf", &config).await?;
//!     println!("{} pages", drawing.page_count());
//!
//!     let scale = Scale::new(0.1)?;
//!     let panels = [CanvasObject::Rect(Rect::new(0.0, 0.0, 200.0, 100.0))];
//!     let posts = [CanvasObject::Line(Line::new(0.0, 0.0, 0.0, 300.0))];
//!     let report = measure_page(0, Some(scale), &panels, &posts, &MeasureOptions::default());
//!     println!("total: {} m²", report.totals.total_m2);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `hekwerk` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! hekwerk = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod drawing;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod load;
pub mod measure;
pub mod pipeline;
pub mod report;
pub mod scale;
pub mod server;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{measure_shapes, ShapeFile};
pub use config::{CalculatorConfig, CalculatorConfigBuilder, EngineConfig, ServerConfig};
pub use drawing::{Drawing, DrawingInfo, RenderedPage, SourceKind};
pub use error::{HekwerkError, Layer, ShapeIssue};
pub use geometry::{CanvasObject, Line, Rect};
pub use load::{inspect, load_drawing, load_drawing_from_path};
pub use measure::{measure_page, ElementKind, MeasureOptions, MeasurementRow, PageReport, Totals};
pub use report::{ResultsTable, CSV_FILE_NAME};
pub use scale::{calibrate, PageScales, Scale};
pub use session::DocumentStore;
