//! Offline measuring from a JSON shape file.
//!
//! The file holds the same objects the browser would send, grouped per page,
//! with coordinates in rendered-image pixels at the configured DPI:
//!
//! ```json
//! {
//!   "coat_both_sides": true,
//!   "default_post_diameter_mm": 60,
//!   "diameter_overrides": { "p1-post-2": 48.3 },
//!   "pages": [
//!     {
//!       "page": 1,
//!       "real_length_mm": 1000,
//!       "scale":  [{ "type": "line", "x1": 0, "y1": 0, "x2": 400, "y2": 0 }],
//!       "panels": [{ "type": "rect", "left": 10, "top": 10, "width": 200, "height": 100 }],
//!       "posts":  [{ "type": "line", "x1": 5, "y1": 0, "x2": 5, "y2": 300 }]
//!     }
//!   ]
//! }
//! ```
//!
//! A page may give `px_per_mm` directly instead of a calibration line.

use crate::error::HekwerkError;
use crate::geometry::CanvasObject;
use crate::measure::{measure_page, MeasureOptions, PageReport};
use crate::scale::{ignored_objects, PageScales, Scale};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Shapes for a whole drawing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShapeFile {
    pub coat_both_sides: Option<bool>,
    pub default_post_diameter_mm: Option<f64>,
    #[serde(default)]
    pub diameter_overrides: HashMap<String, f64>,
    #[serde(default)]
    pub pages: Vec<PageShapes>,
}

/// Shapes drawn on one page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageShapes {
    /// 1-based page number.
    pub page: usize,
    pub real_length_mm: Option<f64>,
    pub px_per_mm: Option<f64>,
    #[serde(default)]
    pub scale: Vec<CanvasObject>,
    #[serde(default)]
    pub panels: Vec<CanvasObject>,
    #[serde(default)]
    pub posts: Vec<CanvasObject>,
}

impl ShapeFile {
    pub fn from_json(text: &str) -> Result<Self, HekwerkError> {
        serde_json::from_str(text)
            .map_err(|e| HekwerkError::InvalidConfig(format!("invalid shape file: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, HekwerkError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => HekwerkError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => HekwerkError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        Self::from_json(&text)
    }

    /// Options for this file, falling back to `defaults`.
    ///
    /// # Errors
    /// [`HekwerkError::InvalidConfig`] when the file sets a post diameter
    /// that is not a positive number.
    pub fn options(&self, defaults: &MeasureOptions) -> Result<MeasureOptions, HekwerkError> {
        let default_post_diameter_mm = match self.default_post_diameter_mm {
            Some(d) if d.is_finite() && d > 0.0 => d,
            Some(d) => {
                return Err(HekwerkError::InvalidConfig(format!(
                    "default_post_diameter_mm must be > 0 mm, got {d}"
                )))
            }
            None => defaults.default_post_diameter_mm,
        };
        Ok(MeasureOptions {
            coat_both_sides: self.coat_both_sides.unwrap_or(defaults.coat_both_sides),
            default_post_diameter_mm,
            diameter_overrides: defaults
                .diameter_overrides
                .iter()
                .chain(&self.diameter_overrides)
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        })
    }
}

/// Measure every page in the file against a drawing of `page_count` pages.
///
/// Pages are measured in file order, so a page listed twice reuses the scale
/// of its earlier entry when the later one has no calibration line.
pub fn measure_shapes(
    file: &ShapeFile,
    page_count: usize,
    default_scale_length_mm: f64,
    options: &MeasureOptions,
) -> Result<Vec<PageReport>, HekwerkError> {
    let mut scales = PageScales::new();
    let mut reports = Vec::with_capacity(file.pages.len());

    for shapes in &file.pages {
        if shapes.page == 0 || shapes.page > page_count {
            return Err(HekwerkError::PageOutOfRange {
                page: shapes.page,
                total: page_count,
            });
        }
        let idx = shapes.page - 1;

        if let Some(px_per_mm) = shapes.px_per_mm {
            scales.set(idx, Scale::new(px_per_mm)?);
        }
        let real_len = shapes.real_length_mm.unwrap_or(default_scale_length_mm);
        let scale = scales.resolve(idx, &shapes.scale, real_len);
        if scale.is_none() {
            warn!("Page {} has no scale; its shapes are not measured", shapes.page);
        }

        let mut report = measure_page(idx, scale, &shapes.panels, &shapes.posts, options);
        report.skipped.extend(ignored_objects(&shapes.scale));
        reports.push(report);
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ResultsTable;

    const SHAPES: &str = r#"{
        "coat_both_sides": false,
        "diameter_overrides": { "p2-post-1": 100 },
        "pages": [
            {
                "page": 2,
                "px_per_mm": 0.1,
                "posts": [{ "type": "line", "x1": 0, "y1": 0, "x2": 0, "y2": 300 }]
            },
            {
                "page": 1,
                "real_length_mm": 1000,
                "scale": [
                    { "type": "line", "x1": 0, "y1": 0, "x2": 100, "y2": 0 },
                    { "type": "circle", "left": 3 }
                ],
                "panels": [{ "type": "rect", "left": 0, "top": 0, "width": 200, "height": 100 }]
            }
        ]
    }"#;

    #[test]
    fn measures_each_listed_page() {
        let file = ShapeFile::from_json(SHAPES).unwrap();
        let options = file.options(&MeasureOptions::default()).unwrap();
        assert!(!options.coat_both_sides);

        let reports = measure_shapes(&file, 2, 1000.0, &options).unwrap();
        assert_eq!(reports.len(), 2);

        let post = &reports[0].rows[0];
        assert_eq!(post.id, "p2-post-1");
        assert_eq!(post.diameter_mm, Some(100.0));

        let panel = &reports[1].rows[0];
        assert_eq!(panel.area_m2, 2.0);
        assert_eq!(reports[1].skipped.len(), 1);

        let table = ResultsTable::from_reports(&reports);
        assert_eq!(table.rows[0].page_label, "p1");
    }

    #[test]
    fn non_positive_post_diameter_is_rejected() {
        for bad in ["-60", "0"] {
            let file = ShapeFile::from_json(&format!(
                r#"{{"default_post_diameter_mm": {bad},
                    "pages":[{{"page":1,"px_per_mm":0.1,
                      "posts":[{{"type":"line","x1":0,"y1":0,"x2":0,"y2":300}}]}}]}}"#
            ))
            .unwrap();
            let err = file.options(&MeasureOptions::default()).unwrap_err();
            assert!(matches!(err, HekwerkError::InvalidConfig(_)), "{bad}: {err}");
        }

        let file = ShapeFile::from_json(r#"{"default_post_diameter_mm": 48.3}"#).unwrap();
        let options = file.options(&MeasureOptions::default()).unwrap();
        assert_eq!(options.default_post_diameter_mm, 48.3);
    }

    #[test]
    fn page_outside_drawing_is_rejected() {
        let file = ShapeFile::from_json(SHAPES).unwrap();
        let err = measure_shapes(&file, 1, 1000.0, &MeasureOptions::default()).unwrap_err();
        assert!(matches!(err, HekwerkError::PageOutOfRange { page: 2, total: 1 }));
    }

    #[test]
    fn page_without_scale_has_no_rows() {
        let file = ShapeFile::from_json(
            r#"{"pages":[{"page":1,"panels":[{"type":"rect","width":10,"height":10}]}]}"#,
        )
        .unwrap();
        let reports = measure_shapes(&file, 1, 1000.0, &MeasureOptions::default()).unwrap();
        assert!(!reports[0].is_calibrated());
        assert!(reports[0].rows.is_empty());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            ShapeFile::from_json("{ pages: "),
            Err(HekwerkError::InvalidConfig(_))
        ));
    }
}
