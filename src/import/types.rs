use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Process-assigned row identifier, unique within one import session
pub type RowId = usize;

/// Field values of one row, keyed by column key
pub type RowValues = BTreeMap<String, String>;

// ==================== Column Descriptors ====================

/// Kind of value a column holds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Email,
    Select,
    Date,
    DateText,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Email => "email",
            ColumnType::Select => "select",
            ColumnType::Date => "date",
            ColumnType::DateText => "date-text",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "number" => ColumnType::Number,
            "email" => ColumnType::Email,
            "select" => ColumnType::Select,
            "date" => ColumnType::Date,
            "date-text" => ColumnType::DateText,
            _ => ColumnType::Text,
        }
    }

    /// Whether values of this type go through date normalization
    pub fn is_date(&self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::DateText)
    }
}

/// One logical field the caller wants imported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        ColumnDescriptor {
            key: key.into(),
            label: label.into(),
            required: false,
            column_type: ColumnType::Text,
            options: Vec::new(),
            aliases: Vec::new(),
            default_value: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = column_type;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

// ==================== Sheet Data ====================

/// Where a raw sheet came from
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceInfo {
    pub file_name: String,
    pub size_bytes: u64,
    pub checksum: String, // SHA-256 hex of the uploaded bytes
}

/// Parsed spreadsheet: header row plus data rows, all cells as strings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawSheet {
    pub source: SourceInfo,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        RawSheet {
            source: SourceInfo::default(),
            headers,
            rows,
        }
    }
}

/// Column key -> zero-based header index; unmatched keys are absent
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ColumnMapping {
    pub indices: BTreeMap<String, usize>,
}

impl ColumnMapping {
    pub fn get(&self, key: &str) -> Option<usize> {
        self.indices.get(key).copied()
    }

    pub fn insert(&mut self, key: impl Into<String>, index: usize) {
        self.indices.insert(key.into(), index);
    }

    pub fn is_mapped(&self, key: &str) -> bool {
        self.indices.contains_key(key)
    }

    /// Keys of the given descriptors that found no header
    pub fn unmatched<'a>(&self, descriptors: &'a [ColumnDescriptor]) -> Vec<&'a str> {
        descriptors
            .iter()
            .filter(|d| !self.is_mapped(&d.key))
            .map(|d| d.key.as_str())
            .collect()
    }
}

// ==================== Preview Rows ====================

/// Editable candidate record awaiting import confirmation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreviewRow {
    pub id: RowId,
    pub values: RowValues,
}

impl PreviewRow {
    pub fn new(id: RowId, values: RowValues) -> Self {
        PreviewRow { id, values }
    }

    /// Value of a column, empty when absent
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn is_blank(&self) -> bool {
        self.values.values().all(|v| v.trim().is_empty())
    }

    /// Strip the session id for hand-off to the caller
    pub fn to_record(&self) -> ImportRecord {
        self.values.clone()
    }
}

/// Row as submitted to the host, without the session id
pub type ImportRecord = RowValues;

// ==================== Validation ====================

/// Per-row errors and warnings for the current row set
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: BTreeMap<RowId, Vec<String>>,
    pub warnings: BTreeMap<RowId, Vec<String>>,
}

impl ValidationReport {
    pub fn errors_for(&self, id: RowId) -> &[String] {
        self.errors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn warnings_for(&self, id: RowId) -> &[String] {
        self.warnings.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A row blocks import iff it carries at least one error
    pub fn is_blocking(&self, id: RowId) -> bool {
        !self.errors_for(id).is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.errors.values().any(|e| !e.is_empty())
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.values().map(Vec::len).sum()
    }

    /// Ids of rows that block import
    pub fn blocking_rows(&self) -> Vec<RowId> {
        self.errors
            .iter()
            .filter(|(_, e)| !e.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn remove(&mut self, id: RowId) {
        self.errors.remove(&id);
        self.warnings.remove(&id);
    }
}

/// Ids of rows sharing a normalized duplicate key
pub type DuplicateSet = BTreeSet<RowId>;

// ==================== Row Status ====================

/// Status filter for the preview table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RowFilter {
    #[default]
    All,
    Valid,
    Warning,
    Error,
    Duplicate,
}

impl RowFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowFilter::All => "all",
            RowFilter::Valid => "valid",
            RowFilter::Warning => "warning",
            RowFilter::Error => "error",
            RowFilter::Duplicate => "duplicate",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "valid" => RowFilter::Valid,
            "warning" => RowFilter::Warning,
            "error" => RowFilter::Error,
            "duplicate" => RowFilter::Duplicate,
            _ => RowFilter::All,
        }
    }
}

/// Derived status of a single row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowStatus {
    pub has_errors: bool,
    pub has_warnings: bool,
    pub is_duplicate: bool,
}

impl RowStatus {
    pub fn is_valid(&self) -> bool {
        !self.has_errors && !self.has_warnings && !self.is_duplicate
    }

    pub fn matches(&self, filter: RowFilter) -> bool {
        match filter {
            RowFilter::All => true,
            RowFilter::Valid => self.is_valid(),
            RowFilter::Warning => self.has_warnings && !self.has_errors,
            RowFilter::Error => self.has_errors,
            RowFilter::Duplicate => self.is_duplicate,
        }
    }

    /// Short label used in exports
    pub fn label(&self) -> &'static str {
        if self.has_errors {
            "error"
        } else if self.is_duplicate {
            "duplicate"
        } else if self.has_warnings {
            "warning"
        } else {
            "valid"
        }
    }
}

// ==================== Batch Editing ====================

/// Whole-column string transform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    Uppercase,
    Lowercase,
    Titlecase,
    Trim,
}

impl TransformMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformMode::Uppercase => "uppercase",
            TransformMode::Lowercase => "lowercase",
            TransformMode::Titlecase => "titlecase",
            TransformMode::Trim => "trim",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "uppercase" => Some(TransformMode::Uppercase),
            "lowercase" => Some(TransformMode::Lowercase),
            "titlecase" => Some(TransformMode::Titlecase),
            "trim" => Some(TransformMode::Trim),
            _ => None,
        }
    }
}

// ==================== Submission ====================

/// What the host reports back after a successful submission
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImportReceipt {
    pub submitted: usize,
    pub succeeded: Option<usize>,
    pub failed: Option<usize>,
    pub message: Option<String>,
}

impl ImportReceipt {
    pub fn submitted(count: usize) -> Self {
        ImportReceipt {
            submitted: count,
            ..Default::default()
        }
    }
}
