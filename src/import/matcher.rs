use std::collections::{BTreeSet, HashSet};

use super::types::{ColumnDescriptor, ColumnMapping};
use crate::config::{ImportConfig, MatchStrategy};

pub const EXACT_MATCH_SCORE: u32 = 100;
pub const CONTAINS_MATCH_SCORE: u32 = 80;

/// Similarity between a header and a search term, 0-100.
///
/// Exact (case-insensitive) match scores 100, containment either way 80,
/// otherwise the Jaccard overlap of the two character sets.
pub fn similarity(a: &str, b: &str) -> u32 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return EXACT_MATCH_SCORE;
    }
    if a.contains(&b) || b.contains(&a) {
        return CONTAINS_MATCH_SCORE;
    }

    let set_a: HashSet<char> = a.chars().collect();
    let set_b: HashSet<char> = b.chars().collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();

    if union == 0 {
        return 0;
    }
    ((intersection as f64 / union as f64) * 100.0).round() as u32
}

/// Lower-cased key, label and aliases of a descriptor, de-duplicated in order
fn search_terms(descriptor: &ColumnDescriptor) -> Vec<String> {
    let mut seen = BTreeSet::new();
    std::iter::once(&descriptor.key)
        .chain(std::iter::once(&descriptor.label))
        .chain(descriptor.aliases.iter())
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty() && seen.insert(term.clone()))
        .collect()
}

/// Best score of a header against all of a descriptor's search terms
pub fn header_score(header: &str, descriptor: &ColumnDescriptor) -> u32 {
    search_terms(descriptor)
        .iter()
        .map(|term| similarity(header, term))
        .max()
        .unwrap_or(0)
}

/// Map spreadsheet headers to descriptor keys by fuzzy similarity
pub fn match_columns(
    headers: &[String],
    descriptors: &[ColumnDescriptor],
    config: &ImportConfig,
) -> ColumnMapping {
    let mapping = match config.match_strategy {
        MatchStrategy::Greedy => match_greedy(headers, descriptors, config.min_match_score),
        MatchStrategy::Exclusive => match_exclusive(headers, descriptors, config.min_match_score),
    };

    tracing::debug!(
        "header match: {} of {} columns mapped ({:?})",
        mapping.indices.len(),
        descriptors.len(),
        config.match_strategy
    );
    mapping
}

/// Each descriptor independently takes its best header; ties go to the leftmost
fn match_greedy(
    headers: &[String],
    descriptors: &[ColumnDescriptor],
    min_score: u32,
) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();

    for descriptor in descriptors {
        let mut best: Option<(usize, u32)> = None;

        for (index, header) in headers.iter().enumerate() {
            let score = header_score(header, descriptor);
            // Strictly greater keeps the first header on ties
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }

        if let Some((index, score)) = best {
            if score >= min_score {
                mapping.insert(descriptor.key.clone(), index);
            }
        }
    }

    mapping
}

/// One-to-one assignment: claim (descriptor, header) pairs by descending score
fn match_exclusive(
    headers: &[String],
    descriptors: &[ColumnDescriptor],
    min_score: u32,
) -> ColumnMapping {
    let mut candidates: Vec<(u32, usize, usize)> = Vec::new();
    for (d_idx, descriptor) in descriptors.iter().enumerate() {
        for (h_idx, header) in headers.iter().enumerate() {
            let score = header_score(header, descriptor);
            if score >= min_score {
                candidates.push((score, d_idx, h_idx));
            }
        }
    }

    // Highest score first, then descriptor order, then header order
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut mapping = ColumnMapping::default();
    let mut used_headers = HashSet::new();
    for (_, d_idx, h_idx) in candidates {
        let key = &descriptors[d_idx].key;
        if mapping.is_mapped(key) || used_headers.contains(&h_idx) {
            continue;
        }
        mapping.insert(key.clone(), h_idx);
        used_headers.insert(h_idx);
    }

    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn book_descriptors() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("isbn", "ISBN"),
            ColumnDescriptor::new("title", "Title").with_aliases(["name", "book"]),
            ColumnDescriptor::new("author", "Author").with_aliases(["writer"]),
        ]
    }

    #[test]
    fn test_similarity_scores() {
        assert_eq!(similarity("ISBN", "isbn"), 100);
        assert_eq!(similarity("Book Title", "title"), 80);
        assert_eq!(similarity("title", "Book Title"), 80);
        // {w,r,i,t,e} vs {t,i,l,e}: 3 shared of 6
        assert_eq!(similarity("writer", "title"), 50);
        assert_eq!(similarity("", "title"), 0);
    }

    #[test]
    fn test_book_headers_match() {
        let mapping = match_columns(
            &headers(&["ISBN", "Book Title", "Writer"]),
            &book_descriptors(),
            &ImportConfig::default(),
        );
        assert_eq!(mapping.get("isbn"), Some(0));
        assert_eq!(mapping.get("title"), Some(1));
        assert_eq!(mapping.get("author"), Some(2));
        assert_eq!(header_score("Book Title", &book_descriptors()[1]), 80);
        assert_eq!(header_score("Writer", &book_descriptors()[2]), 100);
    }

    #[test]
    fn test_low_scores_are_unmatched() {
        let descriptors = vec![ColumnDescriptor::new("publisher", "Publisher")];
        let mapping = match_columns(
            &headers(&["Qty", "Zone"]),
            &descriptors,
            &ImportConfig::default(),
        );
        assert!(mapping.get("publisher").is_none());
        assert_eq!(mapping.unmatched(&descriptors), vec!["publisher"]);
    }

    #[test]
    fn test_ties_go_to_first_header() {
        let descriptors = vec![ColumnDescriptor::new("email", "Email")];
        let mapping = match_columns(
            &headers(&["Email Address", "Email Backup"]),
            &descriptors,
            &ImportConfig::default(),
        );
        assert_eq!(mapping.get("email"), Some(0));
    }

    #[test]
    fn test_greedy_allows_shared_header() {
        let descriptors = vec![
            ColumnDescriptor::new("name", "Name"),
            ColumnDescriptor::new("full_name", "Full Name"),
        ];
        let mapping = match_columns(
            &headers(&["Full Name"]),
            &descriptors,
            &ImportConfig::default(),
        );
        assert_eq!(mapping.get("name"), Some(0));
        assert_eq!(mapping.get("full_name"), Some(0));
    }

    #[test]
    fn test_exclusive_assigns_each_header_once() {
        let descriptors = vec![
            ColumnDescriptor::new("name", "Name"),
            ColumnDescriptor::new("full_name", "Full Name"),
        ];
        let config = ImportConfig {
            match_strategy: MatchStrategy::Exclusive,
            ..ImportConfig::default()
        };
        let mapping = match_columns(&headers(&["Full Name", "Name"]), &descriptors, &config);
        assert_eq!(mapping.get("full_name"), Some(0));
        assert_eq!(mapping.get("name"), Some(1));

        let mapping = match_columns(&headers(&["Full Name"]), &descriptors, &config);
        assert_eq!(mapping.get("full_name"), Some(0));
        assert!(mapping.get("name").is_none());
    }

    #[test]
    fn test_matching_is_deterministic() {
        let h = headers(&["ISBN", "Book Title", "Writer"]);
        let config = ImportConfig::default();
        let first = match_columns(&h, &book_descriptors(), &config);
        let second = match_columns(&h, &book_descriptors(), &config);
        assert_eq!(first, second);
    }
}
