//! Output types of the loading pipeline.

use crate::error::HekwerkError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// What kind of file a drawing was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Image,
}

/// One rasterised page, PNG-encoded for the browser.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPage {
    /// 1-based page number.
    pub number: usize,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub png: Bytes,
}

/// A loaded drawing: every page rasterised once at upload time.
#[derive(Debug, Clone, Serialize)]
pub struct Drawing {
    pub filename: String,
    pub kind: SourceKind,
    pub pages: Vec<RenderedPage>,
}

impl Drawing {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Look up a page by its 1-based number.
    pub fn page(&self, number: usize) -> Result<&RenderedPage, HekwerkError> {
        number
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
            .ok_or(HekwerkError::PageOutOfRange {
                page: number,
                total: self.pages.len(),
            })
    }
}

/// Size of one page as stored in the file, before rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSize {
    pub number: usize,
    pub width: f32,
    pub height: f32,
    /// `pt` for PDF pages, `px` for images.
    pub unit: &'static str,
}

/// Drawing metadata gathered without rasterising.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawingInfo {
    pub filename: String,
    pub kind: SourceKind,
    pub page_count: usize,
    pub pages: Vec<PageSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
}
