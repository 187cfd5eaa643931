//! Results table: CSV export and plain-text rendering.
//!
//! Column headers follow the Dutch labels of the calculator UI so an export
//! opens in a spreadsheet exactly as the table looks on screen.

use crate::error::HekwerkError;
use crate::measure::{MeasurementRow, PageReport, Totals};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Default name for a downloaded export.
pub const CSV_FILE_NAME: &str = "hekwerk_oppervlakte_resultaten.csv";

/// CSV column headers, in order.
pub const CSV_HEADERS: [&str; 9] = [
    "Pagina",
    "Type",
    "ID",
    "Breedte (mm)",
    "Hoogte (mm)",
    "Dubbelzijdig",
    "Diameter (mm)",
    "Lengte (m)",
    "Oppervlakte (m²)",
];

/// Rows of one or more measured pages, in page order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultsTable {
    pub rows: Vec<MeasurementRow>,
    pub totals: Totals,
}

impl ResultsTable {
    /// Concatenate page reports. Reports are sorted by page number first.
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a PageReport>) -> Self {
        let mut reports: Vec<&PageReport> = reports.into_iter().collect();
        reports.sort_by_key(|r| r.page);
        let rows: Vec<MeasurementRow> = reports
            .iter()
            .flat_map(|r| r.rows.iter().cloned())
            .collect();
        let totals = Totals::from_rows(&rows);
        Self { rows, totals }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Encode the table as UTF-8 CSV with a header row.
    pub fn to_csv(&self) -> Result<Vec<u8>, HekwerkError> {
        if self.is_empty() {
            return Err(HekwerkError::NothingToExport);
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(CSV_HEADERS)?;
        for row in &self.rows {
            writer.serialize(CsvRecord::from(row))?;
        }
        writer
            .into_inner()
            .map_err(|e| HekwerkError::Internal(format!("CSV flush failed: {e}")))
    }

    /// Write the CSV export to `path` (temp file + rename).
    pub fn write_csv(&self, path: &Path) -> Result<(), HekwerkError> {
        let bytes = self.to_csv()?;
        let tmp_path = path.with_extension("csv.tmp");
        std::fs::write(&tmp_path, &bytes).map_err(|e| HekwerkError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, path).map_err(|e| HekwerkError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    /// Render a fixed-width text table for terminal output.
    pub fn to_text(&self) -> String {
        let cells: Vec<[String; 9]> = self.rows.iter().map(text_cells).collect();
        let mut widths = CSV_HEADERS.map(|h| h.chars().count());
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row.iter()) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        push_line(&mut out, &CSV_HEADERS.map(String::from), &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("  "));
        out.push('\n');
        for row in &cells {
            push_line(&mut out, row, &widths);
        }
        out.push_str(&format!(
            "\nPanelen: {:.4} m²  Palen/Buizen: {:.4} m²  Totaal: {:.4} m²\n",
            self.totals.panels_m2, self.totals.posts_m2, self.totals.total_m2
        ));
        out
    }
}

#[derive(Serialize)]
struct CsvRecord<'a> {
    page: &'a str,
    kind: &'static str,
    id: &'a str,
    width_mm: Option<f64>,
    height_mm: Option<f64>,
    /// `True`/`False`, as earlier spreadsheet exports spelled it.
    double_sided: Option<&'static str>,
    diameter_mm: Option<f64>,
    length_m: Option<f64>,
    area_m2: f64,
}

impl<'a> From<&'a MeasurementRow> for CsvRecord<'a> {
    fn from(row: &'a MeasurementRow) -> Self {
        Self {
            page: &row.page_label,
            kind: row.kind.label(),
            id: &row.id,
            width_mm: row.width_mm,
            height_mm: row.height_mm,
            double_sided: row
                .double_sided
                .map(|b| if b { "True" } else { "False" }),
            diameter_mm: row.diameter_mm,
            length_m: row.length_m,
            area_m2: row.area_m2,
        }
    }
}

fn text_cells(row: &MeasurementRow) -> [String; 9] {
    let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    [
        row.page_label.clone(),
        row.kind.label().to_string(),
        row.id.clone(),
        opt(row.width_mm),
        opt(row.height_mm),
        row.double_sided
            .map(|b| if b { "ja" } else { "nee" }.to_string())
            .unwrap_or_default(),
        opt(row.diameter_mm),
        opt(row.length_m),
        format!("{:.4}", row.area_m2),
    ]
}

fn push_line(out: &mut String, cells: &[String; 9], widths: &[usize; 9]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .map(|(c, w)| format!("{c:<w$}"))
        .collect();
    out.push_str(padded.join("  ").trim_end());
    out.push('\n');
}
