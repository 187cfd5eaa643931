//! Surface-area computation for panels and posts.
//!
//! ```text
//! panel  (rect)  area = w_mm · h_mm / 1e6          [×2 when coated both sides]
//! post   (line)  area = π · Ø_mm · length_mm / 1e6  (cylinder mantle)
//! ```
//!
//! Element ids carry the 1-based position of the object in its layer,
//! counting skipped objects too, so an id stays stable while the user adds
//! or removes shapes after it.

use crate::error::{Layer, ShapeIssue};
use crate::geometry::CanvasObject;
use crate::scale::Scale;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;

const MM2_PER_M2: f64 = 1_000_000.0;
const MM_PER_M: f64 = 1000.0;

/// Per-request measuring options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureOptions {
    /// Count both faces of every panel.
    pub coat_both_sides: bool,
    /// Diameter for posts without an override.
    pub default_post_diameter_mm: f64,
    /// Diameter per post id, e.g. `"p1-post-2" → 48.3`.
    #[serde(default)]
    pub diameter_overrides: HashMap<String, f64>,
}

impl Default for MeasureOptions {
    fn default() -> Self {
        Self {
            coat_both_sides: true,
            default_post_diameter_mm: 60.0,
            diameter_overrides: HashMap::new(),
        }
    }
}

impl MeasureOptions {
    fn diameter_for(&self, id: &str) -> f64 {
        self.diameter_overrides
            .get(id)
            .copied()
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(self.default_post_diameter_mm)
    }
}

/// The two kinds of coatable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    #[serde(rename = "Paneel")]
    Panel,
    #[serde(rename = "Paal/Buis")]
    Post,
}

impl ElementKind {
    /// Label shown in the table and the CSV export.
    pub fn label(&self) -> &'static str {
        match self {
            ElementKind::Panel => "Paneel",
            ElementKind::Post => "Paal/Buis",
        }
    }
}

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRow {
    /// `p{n}` with `n` the 1-based page number.
    pub page_label: String,
    pub kind: ElementKind,
    pub id: String,
    /// Panels only, rounded to 0.1 mm.
    pub width_mm: Option<f64>,
    /// Panels only, rounded to 0.1 mm.
    pub height_mm: Option<f64>,
    /// Panels only.
    pub double_sided: Option<bool>,
    /// Posts only.
    pub diameter_mm: Option<f64>,
    /// Posts only, rounded to 1 mm.
    pub length_m: Option<f64>,
    /// Rounded to 0.0001 m².
    pub area_m2: f64,
}

/// Area sums per element kind.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub panels_m2: f64,
    pub posts_m2: f64,
    pub total_m2: f64,
}

impl Totals {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a MeasurementRow>) -> Self {
        let mut t = Totals::default();
        for row in rows {
            match row.kind {
                ElementKind::Panel => t.panels_m2 += row.area_m2,
                ElementKind::Post => t.posts_m2 += row.area_m2,
            }
        }
        t.panels_m2 = round_to(t.panels_m2, 4);
        t.posts_m2 = round_to(t.posts_m2, 4);
        t.total_m2 = round_to(t.panels_m2 + t.posts_m2, 4);
        t
    }
}

/// Result of measuring one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-based page number.
    pub page: usize,
    /// Scale the rows were computed with; `None` leaves the page unmeasured.
    pub px_per_mm: Option<f64>,
    pub rows: Vec<MeasurementRow>,
    /// Objects left out because they do not belong in their layer.
    pub skipped: Vec<ShapeIssue>,
    pub totals: Totals,
}

impl PageReport {
    pub fn is_calibrated(&self) -> bool {
        self.px_per_mm.is_some()
    }
}

/// Measure every panel and post drawn on one page.
///
/// `page_idx` is 0-based. Without a scale no rows are produced; the
/// shapes are kept by the caller until the page is calibrated.
pub fn measure_page(
    page_idx: usize,
    scale: Option<Scale>,
    panels: &[CanvasObject],
    posts: &[CanvasObject],
    options: &MeasureOptions,
) -> PageReport {
    let label = format!("p{}", page_idx + 1);
    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    if let Some(scale) = scale {
        for (i, obj) in panels.iter().enumerate() {
            let position = i + 1;
            match obj.as_rect() {
                Some(rect) => {
                    let w_mm = scale.px_to_mm(rect.width_px());
                    let h_mm = scale.px_to_mm(rect.height_px());
                    let mut area = w_mm * h_mm / MM2_PER_M2;
                    if options.coat_both_sides {
                        area *= 2.0;
                    }
                    rows.push(MeasurementRow {
                        page_label: label.clone(),
                        kind: ElementKind::Panel,
                        id: format!("{label}-panel-{position}"),
                        width_mm: Some(round_to(w_mm, 1)),
                        height_mm: Some(round_to(h_mm, 1)),
                        double_sided: Some(options.coat_both_sides),
                        diameter_mm: None,
                        length_m: None,
                        area_m2: round_to(area, 4),
                    });
                }
                None => skipped.push(wrong_type(Layer::Panels, position, "rect", obj)),
            }
        }

        for (i, obj) in posts.iter().enumerate() {
            let position = i + 1;
            match obj.as_line() {
                Some(line) => {
                    let id = format!("{label}-post-{position}");
                    let length_mm = scale.px_to_mm(line.length_px());
                    let diameter = options.diameter_for(&id);
                    let area = PI * diameter * length_mm / MM2_PER_M2;
                    rows.push(MeasurementRow {
                        page_label: label.clone(),
                        kind: ElementKind::Post,
                        id,
                        width_mm: None,
                        height_mm: None,
                        double_sided: None,
                        diameter_mm: Some(diameter),
                        length_m: Some(round_to(length_mm / MM_PER_M, 3)),
                        area_m2: round_to(area, 4),
                    });
                }
                None => skipped.push(wrong_type(Layer::Posts, position, "line", obj)),
            }
        }
    }

    let totals = Totals::from_rows(&rows);
    PageReport {
        page: page_idx + 1,
        px_per_mm: scale.map(|s| s.px_per_mm),
        rows,
        skipped,
        totals,
    }
}

fn wrong_type(layer: Layer, position: usize, expected: &str, obj: &CanvasObject) -> ShapeIssue {
    ShapeIssue::WrongType {
        layer,
        position,
        expected: expected.to_string(),
        found: obj.type_name().to_string(),
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
