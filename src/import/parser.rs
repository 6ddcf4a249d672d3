use super::error::ImportError;
use super::hooks::RowTransformer;
use super::normalize::{normalize_cell, normalize_date};
use super::types::{ColumnDescriptor, ColumnMapping, PreviewRow, RawSheet, RowValues};
use crate::config::ImportConfig;

/// Turn raw sheet rows into preview rows keyed by column key.
///
/// Row ids are the zero-based data row index, assigned before blank rows
/// are dropped, so they stay stable for the life of the session.
pub fn parse_sheet(
    sheet: &RawSheet,
    descriptors: &[ColumnDescriptor],
    mapping: &ColumnMapping,
    transformer: Option<&dyn RowTransformer>,
    config: &ImportConfig,
) -> Result<Vec<PreviewRow>, ImportError> {
    let mut rows = Vec::with_capacity(sheet.rows.len());
    let mut skipped_blank = 0usize;

    for (row_idx, raw_row) in sheet.rows.iter().enumerate() {
        // Trailing blank spreadsheet rows would otherwise pick up defaults
        if raw_row.iter().all(|cell| cell.trim().is_empty()) {
            skipped_blank += 1;
            continue;
        }

        let mut values = assemble_record(raw_row, descriptors, mapping);

        if let Some(transformer) = transformer {
            values = transformer.transform(values);
        }

        for descriptor in descriptors.iter().filter(|d| d.column_type.is_date()) {
            if let Some(value) = values.get_mut(&descriptor.key) {
                *value = normalize_date(value, config);
            }
        }

        let row = PreviewRow::new(row_idx, values);
        if row.is_blank() {
            skipped_blank += 1;
            continue;
        }
        rows.push(row);
    }

    tracing::debug!(
        "import parse: {} rows kept, {} blank rows dropped",
        rows.len(),
        skipped_blank
    );

    if rows.is_empty() {
        return Err(ImportError::no_data());
    }

    if rows.len() > config.soft_row_limit {
        tracing::warn!(
            "import parse: {} rows exceeds the recommended {} row limit",
            rows.len(),
            config.soft_row_limit
        );
    }

    Ok(rows)
}

/// Read each descriptor's mapped cell, trimmed and defaulted
fn assemble_record(
    raw_row: &[String],
    descriptors: &[ColumnDescriptor],
    mapping: &ColumnMapping,
) -> RowValues {
    descriptors
        .iter()
        .map(|descriptor| {
            let raw = mapping
                .get(&descriptor.key)
                .and_then(|idx| raw_row.get(idx))
                .map(String::as_str)
                .unwrap_or("");
            let value = normalize_cell(raw, descriptor.default_value.as_deref());
            (descriptor.key.clone(), value)
        })
        .collect()
}
