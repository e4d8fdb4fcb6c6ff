//! Prefixes for store-generated entity ids.
//!
//! Ids are `"{prefix}-{hex}"`, e.g. `dst-3fa1b2c4d5e6f708`. The hex part is
//! produced by libSQL's `randomblob`.

pub const PREFIX_PROJECT: &str = "prj";
pub const PREFIX_DATASET: &str = "dst";
pub const PREFIX_TABLE: &str = "tbl";
pub const PREFIX_COLUMN: &str = "col";
pub const PREFIX_SYNC_RUN: &str = "syn";
pub const PREFIX_CHANGELOG: &str = "chg";

/// Every prefix in use, for uniqueness checks.
pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_PROJECT,
    PREFIX_DATASET,
    PREFIX_TABLE,
    PREFIX_COLUMN,
    PREFIX_SYNC_RUN,
    PREFIX_CHANGELOG,
];

/// Return the prefix portion of an id, if it has one.
#[must_use]
pub fn prefix_of(id: &str) -> Option<&str> {
    id.split_once('-').map(|(prefix, _)| prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn prefixes_are_unique() {
        let set: HashSet<_> = ALL_PREFIXES.iter().collect();
        assert_eq!(set.len(), ALL_PREFIXES.len());
    }

    #[test]
    fn prefixes_are_three_lowercase_chars() {
        for prefix in ALL_PREFIXES {
            assert_eq!(prefix.len(), 3, "{prefix}");
            assert!(prefix.chars().all(|c| c.is_ascii_lowercase()), "{prefix}");
        }
    }

    #[test]
    fn prefix_of_splits_on_first_dash() {
        assert_eq!(prefix_of("dst-00ff"), Some("dst"));
        assert_eq!(prefix_of("noprefix"), None);
    }
}
