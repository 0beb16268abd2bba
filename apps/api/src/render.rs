//! # Document Rendering
//!
//! Turns a depreciation report into the bytes of a downloadable document.
//!
//! ```text
//! (template, DepreciationReport) ──► DocumentRenderer ──► RenderedDocument
//!                                          │
//!                                          └─ CsvRenderer (bundled)
//! ```

use async_trait::async_trait;
use mercantil_core::report::DepreciationReport;

/// A rendered document and how to serve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Error types for rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Failed to write document: {0}")]
    Write(String),
}

impl From<csv::Error> for RenderError {
    fn from(err: csv::Error) -> Self {
        RenderError::Write(err.to_string())
    }
}

/// Renders named templates.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, template: &str, report: &DepreciationReport) -> Result<RenderedDocument, RenderError>;
}

/// Writes the report as CSV: a header block, one line per asset, a totals line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRenderer;

const TEMPLATES: &[&str] = &["depreciation_annual", "depreciation_monthly"];

#[async_trait]
impl DocumentRenderer for CsvRenderer {
    async fn render(&self, template: &str, report: &DepreciationReport) -> Result<RenderedDocument, RenderError> {
        if !TEMPLATES.contains(&template) {
            return Err(RenderError::UnknownTemplate(template.to_string()));
        }

        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());

        writer.write_record([report.company_name.as_str()])?;
        writer.write_record(["Generated on".to_string(), report.generated_on.to_string()])?;
        writer.write_record([
            "Asset",
            "Name",
            "Acquired on",
            "Price",
            "Depreciation",
            "Accumulated depreciation",
            "Book value",
        ])?;

        for row in &report.rows {
            writer.write_record([
                row.asset_id.clone(),
                row.name.clone(),
                row.acquired_on.to_string(),
                row.price.to_decimal_string(),
                row.depreciation.to_decimal_string(),
                row.accumulated.to_decimal_string(),
                row.book_value.to_decimal_string(),
            ])?;
        }

        let totals = &report.totals;
        writer.write_record([
            "Total".to_string(),
            format!("{} assets", totals.rows),
            String::new(),
            totals.price.to_decimal_string(),
            totals.depreciation.to_decimal_string(),
            totals.accumulated.to_decimal_string(),
            totals.book_value.to_decimal_string(),
        ])?;

        let bytes = writer
            .into_inner()
            .map_err(|e| RenderError::Write(e.to_string()))?;

        Ok(RenderedDocument {
            filename: format!("{}_{}.csv", template, report.generated_on.format("%Y%m%d")),
            content_type: "text/csv",
            bytes,
        })
    }
}
