use std::collections::HashMap;

use super::types::{DuplicateSet, PreviewRow, RowId};

/// Case-insensitive, trimmed form of a duplicate key value
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Ids of every row whose key value collides with another row's.
///
/// Rows with an empty key are never flagged. Once a second occurrence
/// appears both it and the first occurrence join the set.
pub fn detect_duplicates(rows: &[PreviewRow], duplicate_key: &str) -> DuplicateSet {
    let mut first_seen: HashMap<String, RowId> = HashMap::new();
    let mut duplicates = DuplicateSet::new();

    for row in rows {
        let key = normalize_key(row.get(duplicate_key));
        if key.is_empty() {
            continue;
        }

        match first_seen.get(&key) {
            Some(&first_id) => {
                duplicates.insert(first_id);
                duplicates.insert(row.id);
            }
            None => {
                first_seen.insert(key, row.id);
            }
        }
    }

    if !duplicates.is_empty() {
        tracing::debug!(
            "import duplicates: {} rows share a '{}' value",
            duplicates.len(),
            duplicate_key
        );
    }

    duplicates
}

/// Group duplicate rows by normalized key, in first-seen order
pub fn duplicate_groups(rows: &[PreviewRow], duplicate_key: &str) -> Vec<(String, Vec<RowId>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<RowId>> = HashMap::new();

    for row in rows {
        let key = normalize_key(row.get(duplicate_key));
        if key.is_empty() {
            continue;
        }
        let entry = groups.entry(key.clone()).or_default();
        if entry.is_empty() {
            order.push(key);
        }
        entry.push(row.id);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let ids = groups.remove(&key)?;
            (ids.len() > 1).then_some((key, ids))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::types::RowValues;

    fn row(id: usize, register_no: &str) -> PreviewRow {
        let mut values = RowValues::new();
        values.insert("register_no".to_string(), register_no.to_string());
        PreviewRow::new(id, values)
    }

    #[test]
    fn test_case_insensitive_pair_both_flagged() {
        let rows = vec![row(0, "cs001"), row(1, "CS001 "), row(2, "cs002")];
        let duplicates = detect_duplicates(&rows, "register_no");
        assert!(duplicates.contains(&0));
        assert!(duplicates.contains(&1));
        assert!(!duplicates.contains(&2));
    }

    #[test]
    fn test_single_occurrence_not_flagged() {
        let rows = vec![row(0, "a"), row(1, "b")];
        assert!(detect_duplicates(&rows, "register_no").is_empty());
    }

    #[test]
    fn test_empty_keys_exempt() {
        let rows = vec![row(0, ""), row(1, "  "), row(2, "")];
        assert!(detect_duplicates(&rows, "register_no").is_empty());
    }

    #[test]
    fn test_whole_group_flagged_symmetrically() {
        let rows = vec![row(4, "x"), row(7, "y"), row(9, "X"), row(12, "x")];
        let duplicates = detect_duplicates(&rows, "register_no");
        assert_eq!(duplicates.into_iter().collect::<Vec<_>>(), vec![4, 9, 12]);

        // Any two rows with equal keys are both in or both out
        let duplicates = detect_duplicates(&rows, "register_no");
        for a in &rows {
            for b in &rows {
                if a.id != b.id && normalize_key(a.get("register_no")) == normalize_key(b.get("register_no")) {
                    assert_eq!(duplicates.contains(&a.id), duplicates.contains(&b.id));
                }
            }
        }
    }

    #[test]
    fn test_missing_key_column() {
        let rows = vec![row(0, "a"), row(1, "a")];
        assert!(detect_duplicates(&rows, "isbn").is_empty());
    }

    #[test]
    fn test_duplicate_groups() {
        let rows = vec![row(0, "b"), row(1, "a"), row(2, "B"), row(3, "c"), row(4, "A")];
        let groups = duplicate_groups(&rows, "register_no");
        assert_eq!(
            groups,
            vec![("b".to_string(), vec![0, 2]), ("a".to_string(), vec![1, 4])]
        );
    }
}
