//! Column sets and domain hooks for the catalog and member import pages.

use std::collections::{HashMap, HashSet};

use crate::import::duplicates::normalize_key;
use crate::import::{ColumnDescriptor, ColumnType, PreviewRow, RowTransformer, RowValidator, RowValues};

/// Department codes accepted on the member page
pub const DEPARTMENTS: &[&str] = &["CSE", "ECE", "EEE", "MECH", "CIVIL", "IT"];

// ==================== Column Sets ====================

/// Catalog page columns; `isbn` is the duplicate key
pub fn book_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("isbn", "ISBN")
            .required()
            .with_aliases(["isbn number", "isbn no"]),
        ColumnDescriptor::new("title", "Title")
            .required()
            .with_aliases(["name", "book"]),
        ColumnDescriptor::new("author", "Author").with_aliases(["writer", "authors"]),
        ColumnDescriptor::new("publisher", "Publisher"),
        ColumnDescriptor::new("edition", "Edition"),
        ColumnDescriptor::new("category", "Category")
            .with_aliases(["genre", "subject"])
            .with_default("General"),
        ColumnDescriptor::new("copies", "Copies")
            .with_type(ColumnType::Number)
            .with_aliases(["quantity", "qty", "count"])
            .with_default("1"),
        ColumnDescriptor::new("published_date", "Published Date")
            .with_type(ColumnType::Date)
            .with_aliases(["publication date", "published"]),
        ColumnDescriptor::new("rack", "Rack").with_aliases(["shelf", "location"]),
    ]
}

/// Member page columns; `register_no` is the duplicate key
pub fn student_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("register_no", "Register No")
            .required()
            .with_aliases(["reg no", "registration number", "roll no"]),
        ColumnDescriptor::new("name", "Name")
            .required()
            .with_aliases(["student name", "full name"]),
        ColumnDescriptor::new("email", "Email")
            .with_type(ColumnType::Email)
            .with_aliases(["mail", "email id"]),
        ColumnDescriptor::new("phone", "Phone").with_aliases(["mobile", "contact"]),
        ColumnDescriptor::new("department", "Department")
            .required()
            .with_type(ColumnType::Select)
            .with_options(DEPARTMENTS.iter().copied())
            .with_aliases(["dept", "branch"]),
        ColumnDescriptor::new("year", "Year")
            .with_type(ColumnType::Number)
            .with_aliases(["current year"]),
        ColumnDescriptor::new("section", "Section").with_aliases(["sec"]),
        ColumnDescriptor::new("date_of_birth", "Date of Birth")
            .with_type(ColumnType::DateText)
            .with_aliases(["dob", "birth date"]),
    ]
}

// ==================== Validators ====================

/// Flags rows whose key value is already stored by the host
#[derive(Debug, Clone)]
pub struct ExistingValueValidator {
    key: String,
    message: String,
    existing: HashSet<String>,
}

impl ExistingValueValidator {
    pub fn new<I, S>(key: impl Into<String>, message: impl Into<String>, existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            key: key.into(),
            message: message.into(),
            existing: existing.into_iter().map(|v| normalize_key(v.as_ref())).collect(),
        }
    }

    /// "ISBN exists in DB" against the catalog's current ISBNs
    pub fn isbn<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new("isbn", "ISBN exists in DB", existing)
    }
}

impl RowValidator for ExistingValueValidator {
    fn validate(&self, row: &PreviewRow) -> Vec<String> {
        let value = normalize_key(row.get(&self.key));
        if !value.is_empty() && self.existing.contains(&value) {
            vec![self.message.clone()]
        } else {
            Vec::new()
        }
    }
}

/// Rejects values outside a fixed set; empty values pass
#[derive(Debug, Clone)]
pub struct AllowedValuesValidator {
    key: String,
    message: String,
    allowed: HashSet<String>,
}

impl AllowedValuesValidator {
    pub fn new<I, S>(key: impl Into<String>, message: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            key: key.into(),
            message: message.into(),
            allowed: allowed.into_iter().map(|v| normalize_key(v.as_ref())).collect(),
        }
    }

    pub fn departments() -> Self {
        Self::new("department", "Unknown department", DEPARTMENTS.iter().copied())
    }
}

impl RowValidator for AllowedValuesValidator {
    fn validate(&self, row: &PreviewRow) -> Vec<String> {
        let value = normalize_key(row.get(&self.key));
        if value.is_empty() || self.allowed.contains(&value) {
            Vec::new()
        } else {
            vec![self.message.clone()]
        }
    }
}

// ==================== Transformers ====================

/// Rewrites department names and abbreviations to their canonical code
#[derive(Debug, Clone)]
pub struct DepartmentNormalizer {
    key: String,
    aliases: HashMap<String, String>,
}

impl DepartmentNormalizer {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            aliases: HashMap::new(),
        }
    }

    pub fn with_alias(mut self, alias: &str, code: impl Into<String>) -> Self {
        self.aliases.insert(normalize_key(alias), code.into());
        self
    }

    /// Common spellings seen in member registers
    pub fn standard() -> Self {
        let mut normalizer = Self::new("department");
        for code in DEPARTMENTS {
            normalizer = normalizer.with_alias(code, *code);
        }
        normalizer
            .with_alias("computer science", "CSE")
            .with_alias("computer science and engineering", "CSE")
            .with_alias("cs", "CSE")
            .with_alias("electronics and communication", "ECE")
            .with_alias("electronics and communication engineering", "ECE")
            .with_alias("electrical and electronics", "EEE")
            .with_alias("electrical and electronics engineering", "EEE")
            .with_alias("mechanical", "MECH")
            .with_alias("mechanical engineering", "MECH")
            .with_alias("civil engineering", "CIVIL")
            .with_alias("information technology", "IT")
    }

    pub fn canonical(&self, value: &str) -> Option<&str> {
        self.aliases.get(&normalize_key(value)).map(String::as_str)
    }
}

impl RowTransformer for DepartmentNormalizer {
    fn transform(&self, mut values: RowValues) -> RowValues {
        if let Some(value) = values.get_mut(&self.key) {
            if let Some(code) = self.aliases.get(&normalize_key(value)) {
                *value = code.clone();
            }
        }
        values
    }
}
