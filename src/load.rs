//! Loading entry points: bytes or a path in, a rasterised [`Drawing`] out.
//!
//! Every page is rendered and PNG-encoded once, up front. The browser then
//! fetches page images by number and all measuring works on coordinates
//! only, so no page is ever rendered twice.

use crate::config::CalculatorConfig;
use crate::drawing::{Drawing, DrawingInfo, SourceKind};
use crate::error::HekwerkError;
use crate::pipeline::{decode, encode, input, render};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Load an uploaded drawing from memory.
///
/// # Errors
/// - empty, oversized or unsupported uploads
/// - undecodable images, corrupt or encrypted PDFs
/// - [`HekwerkError::RendererUnavailable`] for PDFs when pdfium cannot be bound
pub async fn load_drawing(
    bytes: Vec<u8>,
    filename: &str,
    config: &CalculatorConfig,
) -> Result<Drawing, HekwerkError> {
    let start = Instant::now();
    input::check_size(filename, &bytes, config.max_upload_bytes)?;
    let kind = input::classify(filename, &bytes)?;

    let (source, pages) = match kind {
        input::InputKind::Pdf => (
            SourceKind::Pdf,
            render::render_pdf(bytes, filename, config).await?,
        ),
        input::InputKind::Image => {
            let image = decode::decode_image(bytes, filename).await?;
            let page = tokio::task::spawn_blocking(move || encode::encode_page(1, &image))
                .await
                .map_err(|e| HekwerkError::Internal(format!("Encode task panicked: {}", e)))??;
            (SourceKind::Image, vec![page])
        }
    };

    info!(
        "Loaded '{}' ({:?}, {} pages) in {}ms",
        filename,
        source,
        pages.len(),
        start.elapsed().as_millis()
    );

    Ok(Drawing {
        filename: filename.to_string(),
        kind: source,
        pages,
    })
}

/// Load a drawing from a local file.
pub async fn load_drawing_from_path(
    path: impl AsRef<Path>,
    config: &CalculatorConfig,
) -> Result<Drawing, HekwerkError> {
    let path = path.as_ref();
    let bytes = input::read_local(path).await?;
    load_drawing(bytes, &input::display_name(path), config).await
}

/// Report page count and page sizes without rasterising.
///
/// Raster images need no renderer; PDFs need pdfium.
pub async fn inspect(
    path: impl AsRef<Path>,
    config: &CalculatorConfig,
) -> Result<DrawingInfo, HekwerkError> {
    let path = path.as_ref();
    let bytes = input::read_local(path).await?;
    let filename = input::display_name(path);
    input::check_size(&filename, &bytes, config.max_upload_bytes)?;

    match input::classify(&filename, &bytes)? {
        input::InputKind::Pdf => render::inspect_pdf(bytes, &filename, config).await,
        input::InputKind::Image => decode::inspect_image(&bytes, &filename),
    }
}
