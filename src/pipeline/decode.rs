//! Raster drawings: decode PNG/JPEG/BMP/TIFF uploads into one RGB page.
//!
//! The format is taken from the content, not the extension, so a JPEG saved
//! as `.png` still loads.

use crate::drawing::{DrawingInfo, PageSize, SourceKind};
use crate::error::HekwerkError;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Decode a raster image off the async executor.
pub async fn decode_image(bytes: Vec<u8>, filename: &str) -> Result<DynamicImage, HekwerkError> {
    let filename = filename.to_string();
    tokio::task::spawn_blocking(move || decode_image_blocking(&bytes, &filename))
        .await
        .map_err(|e| HekwerkError::Internal(format!("Decode task panicked: {}", e)))?
}

fn decode_image_blocking(bytes: &[u8], filename: &str) -> Result<DynamicImage, HekwerkError> {
    let image = image::load_from_memory(bytes).map_err(|e| HekwerkError::ImageDecode {
        filename: filename.to_string(),
        detail: e.to_string(),
    })?;
    debug!(
        "Decoded '{}' → {}x{} px",
        filename,
        image.width(),
        image.height()
    );
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// Read the pixel size of a raster image from its header.
pub fn inspect_image(bytes: &[u8], filename: &str) -> Result<DrawingInfo, HekwerkError> {
    let decode_err = |detail: String| HekwerkError::ImageDecode {
        filename: filename.to_string(),
        detail,
    };
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?
        .into_dimensions()
        .map_err(|e| decode_err(e.to_string()))?;

    Ok(DrawingInfo {
        filename: filename.to_string(),
        kind: SourceKind::Image,
        page_count: 1,
        pages: vec![PageSize {
            number: 1,
            width: width as f32,
            height: height as f32,
            unit: "px",
        }],
        pdf_version: None,
        title: None,
        creator: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::encode_png;
    use image::{Rgba, RgbaImage};

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([0, 128, 0, 200])));
        encode_png(&img).unwrap()
    }

    #[tokio::test]
    async fn decodes_to_rgb() {
        let img = decode_image(png(12, 7), "hek.png").await.unwrap();
        assert_eq!((img.width(), img.height()), (12, 7));
        assert!(matches!(img, DynamicImage::ImageRgb8(_)));
    }

    #[tokio::test]
    async fn garbage_is_a_decode_error() {
        let err = decode_image(b"\x89PNG but not really".to_vec(), "kapot.png")
            .await
            .unwrap_err();
        match err {
            HekwerkError::ImageDecode { filename, .. } => assert_eq!(filename, "kapot.png"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn inspect_reads_dimensions() {
        let info = inspect_image(&png(30, 40), "hek.png").unwrap();
        assert_eq!(info.page_count, 1);
        assert_eq!(info.pages[0].width, 30.0);
        assert_eq!(info.pages[0].height, 40.0);
        assert_eq!(info.pages[0].unit, "px");
    }
}
