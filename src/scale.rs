//! Drawing scale calibration.
//!
//! The user traces a dimension line of known length. The longest line in
//! the calibration layer wins, so a stray click does not replace a
//! deliberate stroke.

use crate::error::{HekwerkError, Layer, ShapeIssue};
use crate::geometry::CanvasObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Pixels per real millimetre on one page image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub px_per_mm: f64,
}

impl Scale {
    /// A scale from a known ratio. Rejects zero, negative and non-finite values.
    pub fn new(px_per_mm: f64) -> Result<Self, HekwerkError> {
        if px_per_mm.is_finite() && px_per_mm > 0.0 {
            Ok(Self { px_per_mm })
        } else {
            Err(HekwerkError::InvalidScale(format!(
                "px/mm must be a positive number, got {px_per_mm}"
            )))
        }
    }

    pub fn px_to_mm(&self, px: f64) -> f64 {
        px / self.px_per_mm
    }
}

/// Derive a scale from the longest line and its real length in mm.
///
/// Returns `None` when there is no line, the longest line has zero length,
/// or `real_length_mm` is not positive.
pub fn calibrate(objects: &[CanvasObject], real_length_mm: f64) -> Option<Scale> {
    let longest = objects
        .iter()
        .filter_map(CanvasObject::as_line)
        .map(|l| l.length_px())
        .fold(0.0_f64, f64::max);

    if longest > 0.0 && real_length_mm.is_finite() && real_length_mm > 0.0 {
        Some(Scale {
            px_per_mm: longest / real_length_mm,
        })
    } else {
        None
    }
}

/// Calibration-layer objects that are not lines and were ignored.
pub fn ignored_objects(objects: &[CanvasObject]) -> Vec<ShapeIssue> {
    objects
        .iter()
        .enumerate()
        .filter(|(_, o)| o.as_line().is_none())
        .map(|(i, o)| ShapeIssue::WrongType {
            layer: Layer::Scale,
            position: i + 1,
            expected: "line".into(),
            found: o.type_name().into(),
        })
        .collect()
}

/// Per-page scales, keyed by 0-based page index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageScales {
    scales: BTreeMap<usize, Scale>,
}

impl PageScales {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, page_idx: usize) -> Option<Scale> {
        self.scales.get(&page_idx).copied()
    }

    pub fn set(&mut self, page_idx: usize, scale: Scale) {
        self.scales.insert(page_idx, scale);
    }

    /// Calibrate `page_idx` from freshly drawn lines, remembering the result.
    /// Without a usable line the previously stored scale is returned.
    pub fn resolve(
        &mut self,
        page_idx: usize,
        objects: &[CanvasObject],
        real_length_mm: f64,
    ) -> Option<Scale> {
        match calibrate(objects, real_length_mm) {
            Some(scale) => {
                debug!(
                    "Page {} calibrated: {:.5} px/mm",
                    page_idx + 1,
                    scale.px_per_mm
                );
                self.set(page_idx, scale);
                Some(scale)
            }
            None => self.get(page_idx),
        }
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}
