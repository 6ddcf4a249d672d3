use std::collections::HashSet;

use super::duplicates::normalize_key;
use super::types::{PreviewRow, RowId, TransformMode};

// Every operation returns the number of rows it changed or removed.
// Callers re-run validation and duplicate detection afterwards.

/// Replace every occurrence of `find` within one column
pub fn find_replace(rows: &mut [PreviewRow], column_key: &str, find: &str, replace: &str) -> usize {
    if find.is_empty() {
        return 0;
    }

    let mut changed = 0;
    for row in rows.iter_mut() {
        let current = row.get(column_key);
        if current.contains(find) {
            let updated = current.replace(find, replace);
            row.set(column_key, updated);
            changed += 1;
        }
    }
    changed
}

/// Fill a column on every row where it is empty
pub fn apply_to_empty(rows: &mut [PreviewRow], column_key: &str, value: &str) -> usize {
    let mut changed = 0;
    for row in rows.iter_mut() {
        if row.get(column_key).trim().is_empty() && !value.is_empty() {
            row.set(column_key, value);
            changed += 1;
        }
    }
    changed
}

/// Apply a string transform to one column of every row
pub fn transform_column(rows: &mut [PreviewRow], column_key: &str, mode: TransformMode) -> usize {
    let mut changed = 0;
    for row in rows.iter_mut() {
        let current = row.get(column_key);
        let updated = apply_transform(current, mode);
        if updated != current {
            row.set(column_key, updated);
            changed += 1;
        }
    }
    changed
}

pub fn apply_transform(value: &str, mode: TransformMode) -> String {
    match mode {
        TransformMode::Uppercase => value.to_uppercase(),
        TransformMode::Lowercase => value.to_lowercase(),
        TransformMode::Titlecase => title_case(value),
        TransformMode::Trim => value.trim().to_string(),
    }
}

/// Capitalize the first letter of each whitespace-separated word, lower the rest
fn title_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut at_word_start = true;

    for c in value.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            result.push(c);
        } else if at_word_start {
            result.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            result.extend(c.to_lowercase());
        }
    }
    result
}

/// Keep the first row per normalized key; rows with an empty key are kept
pub fn remove_duplicates(rows: &mut Vec<PreviewRow>, duplicate_key: &str) -> usize {
    let before = rows.len();
    let mut seen = HashSet::new();

    rows.retain(|row| {
        let key = normalize_key(row.get(duplicate_key));
        key.is_empty() || seen.insert(key)
    });

    before - rows.len()
}

/// Remove one row by id; returns whether it existed
pub fn delete_row(rows: &mut Vec<PreviewRow>, id: RowId) -> bool {
    let before = rows.len();
    rows.retain(|row| row.id != id);
    rows.len() != before
}

/// Set a single cell; returns whether the row exists
pub fn update_cell(rows: &mut [PreviewRow], id: RowId, column_key: &str, value: &str) -> bool {
    match rows.iter_mut().find(|row| row.id == id) {
        Some(row) => {
            row.set(column_key, value);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::types::RowValues;

    fn rows(values: &[&str]) -> Vec<PreviewRow> {
        values
            .iter()
            .enumerate()
            .map(|(id, v)| {
                let mut values = RowValues::new();
                values.insert("name".to_string(), v.to_string());
                PreviewRow::new(id, values)
            })
            .collect()
    }

    fn names(rows: &[PreviewRow]) -> Vec<&str> {
        rows.iter().map(|r| r.get("name")).collect()
    }

    #[test]
    fn test_find_replace() {
        let mut data = rows(&["Dept of CS", "CS-CS", "Maths"]);
        assert_eq!(find_replace(&mut data, "name", "CS", "CSE"), 2);
        assert_eq!(names(&data), vec!["Dept of CSE", "CSE-CSE", "Maths"]);
        assert_eq!(find_replace(&mut data, "name", "", "x"), 0);
    }

    #[test]
    fn test_apply_to_empty() {
        let mut data = rows(&["", "set", "  "]);
        assert_eq!(apply_to_empty(&mut data, "name", "General"), 2);
        assert_eq!(names(&data), vec!["General", "set", "General"]);
        assert_eq!(apply_to_empty(&mut data, "name", "General"), 0);
    }

    #[test]
    fn test_transforms() {
        assert_eq!(apply_transform("the rust BOOK", TransformMode::Titlecase), "The Rust Book");
        assert_eq!(apply_transform(" a ", TransformMode::Trim), "a");
        assert_eq!(apply_transform("MiXed", TransformMode::Lowercase), "mixed");
        assert_eq!(apply_transform("MiXed", TransformMode::Uppercase), "MIXED");
    }

    #[test]
    fn test_trim_is_idempotent() {
        let mut once = rows(&["  a ", "b", " c"]);
        transform_column(&mut once, "name", TransformMode::Trim);
        let mut twice = once.clone();
        assert_eq!(transform_column(&mut twice, "name", TransformMode::Trim), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_titlecase_is_idempotent() {
        let mut data = rows(&["war and peace"]);
        transform_column(&mut data, "name", TransformMode::Titlecase);
        let snapshot = data.clone();
        transform_column(&mut data, "name", TransformMode::Titlecase);
        assert_eq!(data, snapshot);
    }

    #[test]
    fn test_remove_duplicates_keeps_first() {
        let mut data = rows(&["cs001", "CS001", "", "cs002", " cs001", ""]);
        assert_eq!(remove_duplicates(&mut data, "name"), 2);
        assert_eq!(data.iter().map(|r| r.id).collect::<Vec<_>>(), vec![0, 2, 3, 5]);
        assert_eq!(remove_duplicates(&mut data, "name"), 0);
    }

    #[test]
    fn test_delete_and_update() {
        let mut data = rows(&["a", "b"]);
        assert!(update_cell(&mut data, 1, "name", "z"));
        assert!(!update_cell(&mut data, 9, "name", "z"));
        assert!(delete_row(&mut data, 0));
        assert!(!delete_row(&mut data, 0));
        assert_eq!(names(&data), vec!["z"]);
    }
}
