//! Image encoding: `DynamicImage` → PNG bytes served to the drawing canvas.
//!
//! PNG is lossless, so thin dimension lines and hatching stay crisp when the
//! user zooms in to place a calibration line.

use crate::drawing::RenderedPage;
use crate::error::HekwerkError;
use bytes::Bytes;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a page image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Encode page `number` (1-based) for the browser, keeping its pixel size.
pub fn encode_page(number: usize, img: &DynamicImage) -> Result<RenderedPage, HekwerkError> {
    let png = encode_png(img).map_err(|e| HekwerkError::EncodeFailed {
        page: number,
        detail: e.to_string(),
    })?;
    Ok(RenderedPage {
        number,
        width: img.width(),
        height: img.height(),
        png: Bytes::from(png),
    })
}
