//! Pipeline stages for turning an upload into page images.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render (pdf) ──▶ encode, page by page
//!       └─▶ decode (image) ──▶ encode
//! ```
//!
//! 1. [`input`]  classify the file (extension, then magic bytes) and
//!    enforce the size limit
//! 2. [`render`] rasterise PDF pages with the shared pdfium instance inside
//!    `spawn_blocking`, encoding each page before rendering the next
//! 3. [`decode`] decode a raster image as a single page
//! 4. [`encode`] PNG-encode each page for the browser canvas

pub mod decode;
pub mod encode;
pub mod input;
pub mod render;
