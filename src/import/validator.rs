use regex::Regex;
use std::sync::OnceLock;

use super::hooks::RowValidator;
use super::normalize::is_canonical_date;
use super::types::{ColumnDescriptor, ColumnType, PreviewRow, ValidationReport};

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"))
}

/// Validate every row from scratch.
///
/// Errors block import; warnings are advisory. Rows without findings are
/// absent from the report.
pub fn validate_all(
    rows: &[PreviewRow],
    descriptors: &[ColumnDescriptor],
    custom: Option<&dyn RowValidator>,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for row in rows {
        let (errors, warnings) = validate_row(row, descriptors, custom);
        if !errors.is_empty() {
            report.errors.insert(row.id, errors);
        }
        if !warnings.is_empty() {
            report.warnings.insert(row.id, warnings);
        }
    }

    tracing::debug!(
        "import validate: {} rows, {} errors, {} warnings",
        rows.len(),
        report.error_count(),
        report.warning_count()
    );

    report
}

/// Errors and warnings for a single row
pub fn validate_row(
    row: &PreviewRow,
    descriptors: &[ColumnDescriptor],
    custom: Option<&dyn RowValidator>,
) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for descriptor in descriptors {
        let value = row.get(&descriptor.key).trim();

        if value.is_empty() {
            if descriptor.required {
                errors.push(format!("{} required", descriptor.label));
            }
            // Nothing else to check on an empty cell
            continue;
        }

        match descriptor.column_type {
            ColumnType::Number => {
                if !is_numeric(value) {
                    errors.push(format!("{} must be a number", descriptor.label));
                }
            }
            ColumnType::Email => {
                if !email_pattern().is_match(value) {
                    warnings.push(format!("{} looks invalid", descriptor.label));
                }
            }
            ColumnType::Select => {
                if !descriptor.options.is_empty()
                    && !descriptor
                        .options
                        .iter()
                        .any(|option| option.eq_ignore_ascii_case(value))
                {
                    warnings.push(format!(
                        "{} '{}' is not one of: {}",
                        descriptor.label,
                        value,
                        descriptor.options.join(", ")
                    ));
                }
            }
            ColumnType::Date | ColumnType::DateText => {
                if !is_canonical_date(value) {
                    warnings.push(format!("{} is not a recognised date", descriptor.label));
                }
            }
            ColumnType::Text => {}
        }
    }

    if let Some(custom) = custom {
        errors.extend(custom.validate(row));
    }

    (errors, warnings)
}

/// Numeric coercion: plain decimal numbers, optionally signed, with thousands separators
pub fn is_numeric(value: &str) -> bool {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    !cleaned.is_empty()
        && cleaned.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::types::RowValues;

    fn row(id: usize, pairs: &[(&str, &str)]) -> PreviewRow {
        let values: RowValues = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PreviewRow::new(id, values)
    }

    fn descriptors() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("isbn", "ISBN").required(),
            ColumnDescriptor::new("title", "Title").required(),
            ColumnDescriptor::new("copies", "Copies").with_type(ColumnType::Number),
            ColumnDescriptor::new("email", "Email").with_type(ColumnType::Email),
        ]
    }

    #[test]
    fn test_required_fields() {
        let rows = vec![row(0, &[("isbn", "1"), ("title", "")])];
        let report = validate_all(&rows, &descriptors(), None);
        assert_eq!(report.errors_for(0), &["Title required".to_string()]);
        assert!(report.is_blocking(0));
    }

    #[test]
    fn test_number_and_email_rules() {
        let rows = vec![
            row(0, &[("isbn", "1"), ("title", "A"), ("copies", "three"), ("email", "nope")]),
            row(1, &[("isbn", "2"), ("title", "B"), ("copies", "1,200"), ("email", "a@b.co")]),
        ];
        let report = validate_all(&rows, &descriptors(), None);

        assert_eq!(report.errors_for(0), &["Copies must be a number".to_string()]);
        assert_eq!(report.warnings_for(0), &["Email looks invalid".to_string()]);
        assert!(report.errors_for(1).is_empty());
        assert!(report.warnings_for(1).is_empty());
    }

    #[test]
    fn test_email_warning_never_blocks() {
        let rows = vec![row(0, &[("isbn", "1"), ("title", "A"), ("email", "bad@")])];
        let report = validate_all(&rows, &descriptors(), None);
        assert!(!report.is_blocking(0));
        assert!(!report.has_errors());
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_custom_validator_errors() {
        let rows = vec![
            row(0, &[("isbn", "123"), ("title", "Foo")]),
            row(1, &[("isbn", "456"), ("title", "Bar")]),
        ];
        let existing = |row: &PreviewRow| {
            if row.get("isbn") == "123" {
                vec!["ISBN exists in DB".to_string()]
            } else {
                Vec::new()
            }
        };
        let report = validate_all(&rows, &descriptors(), Some(&existing));
        assert_eq!(report.errors_for(0), &["ISBN exists in DB".to_string()]);
        assert_eq!(report.blocking_rows(), vec![0]);
    }

    #[test]
    fn test_select_and_date_warnings() {
        let descriptors = vec![
            ColumnDescriptor::new("dept", "Department")
                .with_type(ColumnType::Select)
                .with_options(["CSE", "ECE"]),
            ColumnDescriptor::new("dob", "Date of Birth").with_type(ColumnType::DateText),
        ];
        let rows = vec![
            row(0, &[("dept", "cse"), ("dob", "05-01-2004")]),
            row(1, &[("dept", "Mech"), ("dob", "sometime")]),
        ];
        let report = validate_all(&rows, &descriptors, None);
        assert!(report.warnings_for(0).is_empty());
        assert_eq!(report.warnings_for(1).len(), 2);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_adding_required_descriptor_never_reduces_errors() {
        let rows = vec![
            row(0, &[("isbn", "1"), ("title", "A")]),
            row(1, &[("isbn", "2"), ("title", "B"), ("author", "C")]),
        ];
        let base = validate_all(&rows, &descriptors(), None).error_count();

        let mut extended = descriptors();
        extended.push(ColumnDescriptor::new("author", "Author").required());
        let after = validate_all(&rows, &extended, None).error_count();

        assert!(after >= base);
        assert_eq!(after, base + 1);
    }

    #[test]
    fn test_is_numeric() {
        assert!(is_numeric("42"));
        assert!(is_numeric("-3.5"));
        assert!(is_numeric("1,000"));
        assert!(!is_numeric("12abc"));
        assert!(!is_numeric("NaN"));
        assert!(!is_numeric(","));
    }
}
