use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::Path;

use super::error::ImportError;
use super::types::{RawSheet, SourceInfo};
use crate::config::ImportConfig;

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Workbook,
}

impl SheetFormat {
    /// Pick a format from the file extension
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())?;

        match extension.as_str() {
            "csv" => Some(SheetFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SheetFormat::Workbook),
            _ => None,
        }
    }
}

/// Reject files above the configured ceiling before any parsing
pub fn check_file_size(size_bytes: u64, config: &ImportConfig) -> Result<(), ImportError> {
    if size_bytes > config.max_file_size_bytes {
        tracing::warn!(
            "import upload rejected: {} bytes exceeds {} byte limit",
            size_bytes,
            config.max_file_size_bytes
        );
        return Err(ImportError::FileTooLarge {
            size_bytes,
            limit_bytes: config.max_file_size_bytes,
        });
    }
    Ok(())
}

/// Read a spreadsheet from disk
pub fn read_file(path: impl AsRef<Path>, config: &ImportConfig) -> Result<RawSheet, ImportError> {
    let path = path.as_ref();

    let metadata = std::fs::metadata(path).map_err(|e| {
        tracing::debug!("import read: cannot stat {}: {}", path.display(), e);
        ImportError::invalid_format()
    })?;
    check_file_size(metadata.len(), config)?;

    let bytes = std::fs::read(path).map_err(|e| {
        tracing::debug!("import read: cannot read {}: {}", path.display(), e);
        ImportError::invalid_format()
    })?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    read_bytes(&file_name, bytes, config)
}

/// Read an uploaded spreadsheet from memory
pub fn read_bytes(
    file_name: &str,
    bytes: Vec<u8>,
    config: &ImportConfig,
) -> Result<RawSheet, ImportError> {
    let size_bytes = bytes.len() as u64;
    check_file_size(size_bytes, config)?;

    let format = SheetFormat::from_file_name(file_name)
        .ok_or_else(|| ImportError::parse(format!("Unsupported file type: {}", file_name)))?;

    let checksum = compute_checksum(&bytes);

    let grid = match format {
        SheetFormat::Csv => read_csv_grid(&bytes),
        SheetFormat::Workbook => read_workbook_grid(bytes),
    }
    .map_err(|e| {
        // Raw parser errors stay in the log
        tracing::debug!("import read: failed to parse {}: {}", file_name, e);
        ImportError::invalid_format()
    })?;

    let mut rows = grid.into_iter();
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.into_iter().map(|h| h.trim().to_string()).collect())
        .unwrap_or_default();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(ImportError::no_data());
    }

    let sheet = RawSheet {
        source: SourceInfo {
            file_name: file_name.to_string(),
            size_bytes,
            checksum,
        },
        headers,
        rows: rows.collect(),
    };

    tracing::debug!(
        "import read: {} ({} bytes) -> {} columns, {} data rows",
        file_name,
        size_bytes,
        sheet.headers.len(),
        sheet.rows.len()
    );

    Ok(sheet)
}

fn read_csv_grid(bytes: &[u8]) -> Result<Vec<Vec<String>>, String> {
    // Spreadsheet exports often carry a UTF-8 BOM
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        grid.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(grid)
}

fn read_workbook_grid(bytes: Vec<u8>) -> Result<Vec<Vec<String>>, String> {
    let mut workbook: Sheets<_> =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| e.to_string())?;

    // Only the first sheet is imported
    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "workbook has no sheets".to_string())?;

    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| format!("failed to read sheet '{}': {}", first_sheet, e))?;

    Ok(range_to_grid(&range))
}

fn range_to_grid(range: &Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect()
}

/// Render a calamine cell as the string the pipeline works with
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format_excel_datetime(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

/// Integral floats print without a fraction so ISBNs and register numbers survive
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Format an Excel datetime (days since 1899-12-30) as ISO 8601
fn format_excel_datetime(value: f64) -> String {
    let days = value.floor() as i64;
    let time_fraction = value.fract();

    // Out-of-range serials keep their raw number
    let Some(date) = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)
        .zip(chrono::Duration::try_days(days))
        .and_then(|(epoch, offset)| epoch.checked_add_signed(offset))
    else {
        return format_number(value);
    };

    if time_fraction == 0.0 {
        return date.format("%Y-%m-%d").to_string();
    }

    let total_seconds = (time_fraction * 86400.0).round() as u32;
    let time = chrono::NaiveTime::from_hms_opt(
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60,
    )
    .unwrap_or_default();

    chrono::NaiveDateTime::new(date, time)
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

/// SHA-256 checksum of uploaded bytes
pub fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
