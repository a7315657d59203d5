//! Report generation port trait.

use crate::domain::error::TearsheetError;
use crate::domain::report_table::{ReportPage, ReportTable};

/// Port for writing rendered reports.
pub trait ReportPort {
    fn write(&self, page: &ReportPage, output_path: &str) -> Result<(), TearsheetError>;

    /// Default implementation: a page holding just `table`, titled by its name.
    fn write_table(&self, table: &ReportTable, output_path: &str) -> Result<(), TearsheetError> {
        let page = ReportPage {
            title: table.name.clone(),
            tables: vec![table.clone()],
        };
        self.write(&page, output_path)
    }
}
