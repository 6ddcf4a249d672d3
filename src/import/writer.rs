use std::path::Path;
use umya_spreadsheet::{new_file, writer, Worksheet};

use super::error::ImportError;
use super::types::{ColumnDescriptor, DuplicateSet, PreviewRow, RowStatus, ValidationReport};

const SHEET_NAME: &str = "Sheet1";
pub const STATUS_HEADER: &str = "Status";
pub const ISSUES_HEADER: &str = "Issues";

/// Write an empty workbook whose header row holds the column labels
pub fn write_template(path: impl AsRef<Path>, descriptors: &[ColumnDescriptor]) -> Result<(), ImportError> {
    let headers: Vec<String> = descriptors.iter().map(|d| d.label.clone()).collect();
    write_xlsx(path.as_ref(), &headers, &[])
}

/// Export the preview rows with their status and issues, for offline fixing
pub fn export_rows_xlsx(
    path: impl AsRef<Path>,
    descriptors: &[ColumnDescriptor],
    rows: &[PreviewRow],
    report: &ValidationReport,
    duplicates: &DuplicateSet,
) -> Result<(), ImportError> {
    let (headers, grid) = export_grid(descriptors, rows, report, duplicates);
    write_xlsx(path.as_ref(), &headers, &grid)
}

/// Same content as `export_rows_xlsx`, as CSV
pub fn export_rows_csv(
    path: impl AsRef<Path>,
    descriptors: &[ColumnDescriptor],
    rows: &[PreviewRow],
    report: &ValidationReport,
    duplicates: &DuplicateSet,
) -> Result<(), ImportError> {
    let path = path.as_ref();
    let (headers, grid) = export_grid(descriptors, rows, report, duplicates);

    let mut out = csv::Writer::from_path(path).map_err(|e| write_error(path, e))?;
    out.write_record(&headers).map_err(|e| write_error(path, e))?;
    for record in &grid {
        out.write_record(record).map_err(|e| write_error(path, e))?;
    }
    out.flush().map_err(|e| write_error(path, e))?;

    tracing::info!("import export: wrote {} rows to {}", grid.len(), path.display());
    Ok(())
}

/// Header row plus one string record per preview row
fn export_grid(
    descriptors: &[ColumnDescriptor],
    rows: &[PreviewRow],
    report: &ValidationReport,
    duplicates: &DuplicateSet,
) -> (Vec<String>, Vec<Vec<String>>) {
    let mut headers: Vec<String> = descriptors.iter().map(|d| d.label.clone()).collect();
    headers.push(STATUS_HEADER.to_string());
    headers.push(ISSUES_HEADER.to_string());

    let grid = rows
        .iter()
        .map(|row| {
            let status = RowStatus {
                has_errors: report.is_blocking(row.id),
                has_warnings: !report.warnings_for(row.id).is_empty(),
                is_duplicate: duplicates.contains(&row.id),
            };

            let mut issues: Vec<String> = report
                .errors_for(row.id)
                .iter()
                .chain(report.warnings_for(row.id))
                .cloned()
                .collect();
            if status.is_duplicate {
                issues.push("Duplicate".to_string());
            }

            let mut record: Vec<String> = descriptors
                .iter()
                .map(|d| row.get(&d.key).to_string())
                .collect();
            record.push(status.label().to_string());
            record.push(issues.join("; "));
            record
        })
        .collect();

    (headers, grid)
}

fn write_xlsx(path: &Path, headers: &[String], grid: &[Vec<String>]) -> Result<(), ImportError> {
    let mut book = new_file();

    let sheet = book
        .get_sheet_by_name_mut(SHEET_NAME)
        .ok_or_else(|| ImportError::parse(format!("Sheet '{}' missing from new workbook", SHEET_NAME)))?;

    write_header_row(sheet, headers);

    for (row_idx, record) in grid.iter().enumerate() {
        let row_num = (row_idx + 2) as u32;
        for (col_idx, value) in record.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let col_num = (col_idx + 1) as u32;
            sheet.get_cell_mut((col_num, row_num)).set_value(value);
        }
    }

    writer::xlsx::write(&book, path).map_err(|e| write_error(path, e))?;

    tracing::info!("import export: wrote {} rows to {}", grid.len(), path.display());
    Ok(())
}

fn write_header_row(sheet: &mut Worksheet, headers: &[String]) {
    for (col_idx, header) in headers.iter().enumerate() {
        let col_num = (col_idx + 1) as u32;
        let cell = sheet.get_cell_mut((col_num, 1));
        cell.set_value(header);
        cell.get_style_mut().get_font_mut().set_bold(true);
    }
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> ImportError {
    tracing::debug!("import export: failed to write {}: {}", path.display(), e);
    ImportError::parse(format!("Failed to write {}", path.display()))
}
