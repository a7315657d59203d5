//! HTML report adapter implementing ReportPort.
//!
//! Renders a report page of named tables through the `tear_sheet.html`
//! Askama template.

use std::fs;
use std::path::Path;

use crate::domain::error::TearsheetError;
use crate::domain::report_table::{ReportPage, ReportTable};
use crate::ports::report_port::ReportPort;

use askama::Template;

#[derive(Template)]
#[template(path = "tear_sheet.html")]
struct TearSheetTemplate<'a> {
    title: &'a str,
    tables: &'a [ReportTable],
}

pub struct HtmlReportAdapter;

impl HtmlReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, page: &ReportPage) -> Result<String, TearsheetError> {
        let template = TearSheetTemplate {
            title: &page.title,
            tables: &page.tables,
        };
        template.render().map_err(|e| TearsheetError::Render {
            reason: e.to_string(),
        })
    }
}

impl Default for HtmlReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for HtmlReportAdapter {
    fn write(&self, page: &ReportPage, output_path: &str) -> Result<(), TearsheetError> {
        let html = self.render(page)?;

        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, html)?;

        tracing::info!(path = %path.display(), tables = page.tables.len(), "report written");
        Ok(())
    }
}
