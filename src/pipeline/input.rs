//! Input classification: decide how an uploaded or local file is rasterised.
//!
//! The extension decides first, matching what the upload form offers. When
//! it is missing or unknown the leading bytes decide. A `.pdf` that does not
//! start with `%PDF` is rejected here so pdfium never sees it.

use crate::error::HekwerkError;
use std::path::Path;
use tracing::debug;

/// Extensions accepted as raster drawings.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// How a file will be turned into page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Image,
}

/// Classify a file by extension, falling back to magic bytes.
pub fn classify(filename: &str, data: &[u8]) -> Result<InputKind, HekwerkError> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let kind = match ext.as_deref() {
        Some("pdf") => {
            if !is_pdf(data) {
                return Err(HekwerkError::NotAPdf {
                    filename: filename.to_string(),
                    magic: data.iter().take(4).copied().collect(),
                });
            }
            InputKind::Pdf
        }
        Some(e) if IMAGE_EXTENSIONS.contains(&e) => InputKind::Image,
        _ => sniff(data).ok_or_else(|| HekwerkError::UnsupportedFileType {
            filename: filename.to_string(),
        })?,
    };

    debug!("Classified '{}' as {:?}", filename, kind);
    Ok(kind)
}

/// Reject empty and oversized inputs before any decoding work.
pub fn check_size(filename: &str, data: &[u8], limit: usize) -> Result<(), HekwerkError> {
    if data.is_empty() {
        return Err(HekwerkError::EmptyUpload {
            filename: filename.to_string(),
        });
    }
    if data.len() > limit {
        return Err(HekwerkError::UploadTooLarge {
            size: data.len(),
            limit,
        });
    }
    Ok(())
}

/// Read a local drawing, mapping I/O failures to typed errors.
pub async fn read_local(path: &Path) -> Result<Vec<u8>, HekwerkError> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(HekwerkError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(HekwerkError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// The file name part of `path`, for messages and the drawing record.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_pdf(data: &[u8]) -> bool {
    data.starts_with(b"%PDF")
}

fn sniff(data: &[u8]) -> Option<InputKind> {
    if is_pdf(data) {
        return Some(InputKind::Pdf);
    }
    match image::guess_format(data).ok()? {
        image::ImageFormat::Png
        | image::ImageFormat::Jpeg
        | image::ImageFormat::Bmp
        | image::ImageFormat::Tiff => Some(InputKind::Image),
        _ => None,
    }
}
