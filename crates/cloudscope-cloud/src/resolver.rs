//! Selection of inventory items by position, id or name

use crate::error::{CloudError, Result};
use crate::item::Item;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info};

/// Token that did not select anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveMiss {
    IndexOutOfRange { index: i64, len: usize },
    NotFound(String),
}

impl std::fmt::Display for ResolveMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveMiss::IndexOutOfRange { index, len } => {
                write!(f, "Index {} out of range (1-{})", index, len)
            }
            ResolveMiss::NotFound(token) => {
                write!(f, "No item found with ID or name: {}", token)
            }
        }
    }
}

/// Selected items in identifier order, plus the tokens that missed
#[derive(Debug, Default)]
pub struct Resolution {
    pub items: Vec<Item>,
    pub misses: Vec<ResolveMiss>,
}

/// Resolve a comma-separated selection against `candidates`.
///
/// Each token is tried as a 1-based index, then as an exact `id`, then as
/// an exact `name`. Output follows token order and keeps duplicates.
pub fn resolve_identifiers(candidates: &[Item], expression: &str) -> Resolution {
    let mut by_id: HashMap<&str, &Item> = HashMap::new();
    let mut by_name: HashMap<&str, &Item> = HashMap::new();
    for item in candidates {
        if !item.id.is_empty() {
            by_id.insert(item.id.as_str(), item);
        }
        if !item.name.is_empty() {
            by_name.insert(item.name.as_str(), item);
        }
    }

    let mut resolution = Resolution::default();

    for token in expression.split(',').map(str::trim) {
        let found = match token.parse::<i64>() {
            Ok(index) => usize::try_from(index)
                .ok()
                .filter(|i| (1..=candidates.len()).contains(i))
                .map(|i| &candidates[i - 1])
                .ok_or(ResolveMiss::IndexOutOfRange {
                    index,
                    len: candidates.len(),
                }),
            Err(_) => by_id
                .get(token)
                .or_else(|| by_name.get(token))
                .copied()
                .ok_or_else(|| ResolveMiss::NotFound(token.to_string())),
        };

        match found {
            Ok(item) => resolution.items.push(item.clone()),
            Err(miss) => {
                error!("{}", miss);
                resolution.misses.push(miss);
            }
        }
    }

    resolution
}

/// Expand `@path` input into a comma-separated identifier list.
///
/// The file holds one identifier per line (as pasted from a spreadsheet);
/// blank lines are ignored. Any other input is returned unchanged.
pub fn expand_identifier_input(raw: &str) -> Result<String> {
    let Some(path) = raw.strip_prefix('@') else {
        return Ok(raw.to_string());
    };

    let path = path.trim();
    if path.is_empty() {
        return Err(CloudError::InvalidIdentifiers(
            "No file path specified after @".to_string(),
        ));
    }

    let path = expand_home(path);
    if !path.exists() {
        return Err(CloudError::InvalidIdentifiers(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        CloudError::InvalidIdentifiers(format!("Error reading file {}: {}", path.display(), e))
    })?;

    let identifiers: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if identifiers.is_empty() {
        return Err(CloudError::InvalidIdentifiers(format!(
            "No identifiers found in file: {}",
            path.display()
        )));
    }

    info!(
        "Loaded {} identifier(s) from {}",
        identifiers.len(),
        path.display()
    );
    Ok(identifiers.join(","))
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn candidates() -> Vec<Item> {
        vec![
            Item::new("aws", "a", "alpha"),
            Item::new("azure", "b", "bravo"),
            Item::new("gcp", "c", "charlie"),
        ]
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_output_follows_identifier_order() {
        let resolution = resolve_identifiers(&candidates(), "3,a");
        assert_eq!(ids(&resolution.items), vec!["c", "a"]);
        assert!(resolution.misses.is_empty());
    }

    #[test]
    fn test_misses_are_reported_not_raised() {
        let resolution = resolve_identifiers(&candidates(), "99,zz");
        assert!(resolution.items.is_empty());
        assert_eq!(
            resolution.misses,
            vec![
                ResolveMiss::IndexOutOfRange { index: 99, len: 3 },
                ResolveMiss::NotFound("zz".to_string()),
            ]
        );
    }

    #[test]
    fn test_lookup_priority_and_whitespace() {
        let resolution = resolve_identifiers(&candidates(), " 2 , charlie,b ");
        assert_eq!(ids(&resolution.items), vec!["b", "c", "b"]);
    }

    #[test]
    fn test_id_wins_over_name() {
        let items = vec![
            Item::new("aws", "i-1", "shared"),
            Item::new("aws", "shared", "other"),
        ];
        let resolution = resolve_identifiers(&items, "shared");
        assert_eq!(ids(&resolution.items), vec!["shared"]);
    }

    #[test]
    fn test_non_positive_index_is_out_of_range() {
        let resolution = resolve_identifiers(&candidates(), "0,-1");
        assert!(resolution.items.is_empty());
        assert_eq!(resolution.misses.len(), 2);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let resolution = resolve_identifiers(&candidates(), "1,1,alpha");
        assert_eq!(ids(&resolution.items), vec!["a", "a", "a"]);
    }

    #[test]
    fn test_expand_plain_input_unchanged() {
        assert_eq!(expand_identifier_input("1,2,web").unwrap(), "1,2,web");
    }

    #[test]
    fn test_expand_file_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.txt");
        fs::write(&path, "i-0abc\n\n  web-1  \n3\n").unwrap();

        let expanded = expand_identifier_input(&format!("@{}", path.display())).unwrap();
        assert_eq!(expanded, "i-0abc,web-1,3");
    }

    #[test]
    fn test_expand_file_errors() {
        assert!(matches!(
            expand_identifier_input("@"),
            Err(CloudError::InvalidIdentifiers(_))
        ));
        assert!(matches!(
            expand_identifier_input("@/definitely/not/here.txt"),
            Err(CloudError::InvalidIdentifiers(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "\n  \n").unwrap();
        assert!(matches!(
            expand_identifier_input(&format!("@{}", path.display())),
            Err(CloudError::InvalidIdentifiers(_))
        ));
    }
}
