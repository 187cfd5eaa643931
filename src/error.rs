//! Error types for the hekwerk library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`HekwerkError`] is **fatal**: the request cannot be served at all
//!   (unsupported upload, corrupt PDF, renderer missing, unknown document).
//!   Returned as `Err(HekwerkError)` from the loading and session functions.
//!
//! * [`ShapeIssue`] is **non-fatal**: one drawn object could not be used
//!   (a rectangle in the post layer, a line in the panel layer). Stored
//!   inside [`crate::measure::PageReport`] so the remaining shapes still
//!   produce a result.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the hekwerk library.
#[derive(Debug, Error)]
pub enum HekwerkError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The upload contained no bytes.
    #[error("Upload '{filename}' is empty")]
    EmptyUpload { filename: String },

    /// The upload exceeds the configured size limit.
    #[error("Upload of {size} bytes exceeds the limit of {limit} bytes")]
    UploadTooLarge { size: usize, limit: usize },

    /// Neither the extension nor the content identifies a supported format.
    #[error("Unsupported file type for '{filename}'. Upload a PDF, PNG, JPEG, BMP or TIFF drawing.")]
    UnsupportedFileType { filename: String },

    /// The file is named `.pdf` but does not start with the PDF magic bytes.
    #[error("File '{filename}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { filename: String, magic: Vec<u8> },

    /// Local input file was not found.
    #[error("Drawing not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Local input file could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Decoding errors ───────────────────────────────────────────────────
    /// The raster image could not be decoded.
    #[error("Failed to decode image '{filename}': {detail}")]
    ImageDecode { filename: String, detail: String },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{filename}' is corrupt: {detail}")]
    CorruptPdf { filename: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{filename}' is encrypted and requires a password.")]
    PasswordRequired { filename: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{filename}'")]
    WrongPassword { filename: String },

    /// The document parsed but contains no pages.
    #[error("Document '{filename}' has no pages")]
    EmptyDocument { filename: String },

    /// A 1-based page number outside the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not encode a rendered page for the browser.
    #[error("Failed to encode page {page} as PNG: {detail}")]
    EncodeFailed { page: usize, detail: String },

    // ── Renderer errors ───────────────────────────────────────────────────
    /// pdfium could not be located or bound; raster uploads still work.
    #[error(
        "PDF rendering is not available: {0}\n\n\
Upload a PNG/JPEG/BMP/TIFF drawing instead, or make pdfium available:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Run `hekwerk fetch-engine` to download it into the cache.\n"
    )]
    RendererUnavailable(String),

    // ── Measurement errors ────────────────────────────────────────────────
    /// The real-world calibration length is not usable.
    #[error("Invalid scale: {0}")]
    InvalidScale(String),

    /// The table to export has no rows.
    #[error("Nothing to export: no measured elements yet")]
    NothingToExport,

    // ── Session errors ────────────────────────────────────────────────────
    /// No live document with this id (never uploaded or expired).
    #[error("Document '{id}' not found or expired")]
    DocumentNotFound { id: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// CSV serialisation failed.
    #[error("Failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Server errors ─────────────────────────────────────────────────────
    /// Binding the listener or serving connections failed.
    #[error("Server error on {addr}: {source}")]
    Server {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Which drawing layer a shape was submitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Scale,
    Panels,
    Posts,
}

/// A non-fatal problem with one drawn object.
///
/// The object is left out of the result; every other object is still
/// measured.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeIssue {
    /// The object type does not belong in this layer.
    #[error("{layer:?} object {position}: expected a {expected}, got '{found}'")]
    WrongType {
        layer: Layer,
        position: usize,
        expected: String,
        found: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_out_of_range_display() {
        let e = HekwerkError::PageOutOfRange { page: 4, total: 3 };
        let msg = e.to_string();
        assert!(msg.contains("Page 4"), "got: {msg}");
        assert!(msg.contains("3 pages"), "got: {msg}");
    }

    #[test]
    fn renderer_unavailable_mentions_fallback() {
        let e = HekwerkError::RendererUnavailable("library not found".into());
        let msg = e.to_string();
        assert!(msg.contains("library not found"));
        assert!(msg.contains("PDFIUM_LIB_PATH"));
    }

    #[test]
    fn upload_too_large_display() {
        let e = HekwerkError::UploadTooLarge {
            size: 2048,
            limit: 1024,
        };
        assert!(e.to_string().contains("2048"));
        assert!(e.to_string().contains("1024"));
    }

    #[test]
    fn shape_issue_serialises_with_kind_tag() {
        let issue = ShapeIssue::WrongType {
            layer: Layer::Posts,
            position: 2,
            expected: "line".into(),
            found: "rect".into(),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "wrong_type");
        assert_eq!(json["layer"], "posts");
        assert_eq!(json["position"], 2);
        assert!(issue.to_string().contains("expected a line"));
    }
}
