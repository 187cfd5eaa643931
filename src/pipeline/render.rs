//! PDF rasterisation: render every page via pdfium and PNG-encode it.
//!
//! pdfium is not async-safe, so all work runs inside
//! `tokio::task::spawn_blocking`. The render scale is `dpi / 72`, capped so
//! that neither edge exceeds `max_rendered_pixels`. Each bitmap is encoded
//! and dropped before the next page is rendered, so only one raw page is
//! held in memory at a time.

use crate::config::CalculatorConfig;
use crate::drawing::{DrawingInfo, PageSize, RenderedPage, SourceKind};
use crate::engine;
use crate::error::HekwerkError;
use crate::pipeline::encode;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Rasterise all pages of a PDF held in memory.
pub async fn render_pdf(
    bytes: Vec<u8>,
    filename: &str,
    config: &CalculatorConfig,
) -> Result<Vec<RenderedPage>, HekwerkError> {
    let filename = filename.to_string();
    let config = config.clone();

    tokio::task::spawn_blocking(move || render_pdf_blocking(bytes, &filename, &config))
        .await
        .map_err(|e| HekwerkError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_pdf_blocking(
    bytes: Vec<u8>,
    filename: &str,
    config: &CalculatorConfig,
) -> Result<Vec<RenderedPage>, HekwerkError> {
    let pdfium = shared_pdfium(config)?;
    let password = config.password.as_deref();
    let document = pdfium
        .load_pdf_from_byte_vec(bytes, password)
        .map_err(|e| load_error(e, filename, password.is_some()))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(HekwerkError::EmptyDocument {
            filename: filename.to_string(),
        });
    }
    info!("PDF '{}' loaded: {} pages", filename, total_pages);

    let max_px = config.max_rendered_pixels as i32;
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(config.render_scale())
        .set_maximum_width(max_px)
        .set_maximum_height(max_px);

    let mut rendered = Vec::with_capacity(total_pages);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            HekwerkError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8());
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        rendered.push(encode::encode_page(idx + 1, &image)?);
    }

    Ok(rendered)
}

/// Read page count, page sizes and document metadata without rendering.
pub async fn inspect_pdf(
    bytes: Vec<u8>,
    filename: &str,
    config: &CalculatorConfig,
) -> Result<DrawingInfo, HekwerkError> {
    let filename = filename.to_string();
    let config = config.clone();

    tokio::task::spawn_blocking(move || inspect_pdf_blocking(bytes, &filename, &config))
        .await
        .map_err(|e| HekwerkError::Internal(format!("Inspect task panicked: {}", e)))?
}

fn inspect_pdf_blocking(
    bytes: Vec<u8>,
    filename: &str,
    config: &CalculatorConfig,
) -> Result<DrawingInfo, HekwerkError> {
    let pdfium = shared_pdfium(config)?;
    let password = config.password.as_deref();
    let document = pdfium
        .load_pdf_from_byte_vec(bytes, password)
        .map_err(|e| load_error(e, filename, password.is_some()))?;

    let pages: Vec<PageSize> = document
        .pages()
        .iter()
        .enumerate()
        .map(|(idx, page)| PageSize {
            number: idx + 1,
            width: page.width().value,
            height: page.height().value,
            unit: "pt",
        })
        .collect();

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(DrawingInfo {
        filename: filename.to_string(),
        kind: SourceKind::Pdf,
        page_count: pages.len(),
        pages,
        pdf_version: Some(format!("{:?}", document.version())),
        title: get_meta(PdfDocumentMetadataTagType::Title),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
    })
}

fn shared_pdfium(config: &CalculatorConfig) -> Result<&'static Pdfium, HekwerkError> {
    engine::pdfium(&config.engine).map_err(|e| HekwerkError::RendererUnavailable(e.to_string()))
}

/// pdfium reports password problems only through its error text.
fn load_error(err: PdfiumError, filename: &str, had_password: bool) -> HekwerkError {
    let detail = format!("{:?}", err);
    if detail.to_ascii_lowercase().contains("password") {
        if had_password {
            HekwerkError::WrongPassword {
                filename: filename.to_string(),
            }
        } else {
            HekwerkError::PasswordRequired {
                filename: filename.to_string(),
            }
        }
    } else {
        HekwerkError::CorruptPdf {
            filename: filename.to_string(),
            detail,
        }
    }
}
