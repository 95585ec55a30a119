//! Status → category mapping.
//!
//! A status may belong to zero, one, or several categories at once. Status
//! names are matched case-insensitively after trimming, because trackers
//! are inconsistent about capitalisation across projects.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

static NO_CATEGORIES: BTreeSet<String> = BTreeSet::new();

/// Many-to-many mapping from status name to category names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct CategorySet {
    by_status: BTreeMap<String, BTreeSet<String>>,
}

impl CategorySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `status` to `category`. Repeated assignments are idempotent.
    pub fn assign(&mut self, status: &str, category: &str) {
        self.by_status
            .entry(status_key(status))
            .or_default()
            .insert(category.trim().to_string());
    }

    /// Builder form of [`assign`](Self::assign) for several categories.
    #[must_use]
    pub fn with(mut self, status: &str, categories: &[&str]) -> Self {
        for category in categories {
            self.assign(status, category);
        }
        self
    }

    /// Categories of `status`; empty for unknown statuses.
    #[must_use]
    pub fn categories_of(&self, status: &str) -> &BTreeSet<String> {
        self.by_status
            .get(&status_key(status))
            .unwrap_or(&NO_CATEGORIES)
    }

    #[must_use]
    pub fn is_known(&self, status: &str) -> bool {
        self.by_status.contains_key(&status_key(status))
    }

    #[must_use]
    pub fn has_category(&self, status: &str, category: &str) -> bool {
        self.categories_of(status).contains(category)
    }

    /// Merge another mapping into this one (set union per status).
    pub fn extend_from(&mut self, other: &Self) {
        for (status, categories) in &other.by_status {
            self.by_status
                .entry(status.clone())
                .or_default()
                .extend(categories.iter().cloned());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_status.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_status.is_empty()
    }
}

fn status_key(status: &str) -> String {
    status.trim().to_lowercase()
}

impl From<BTreeMap<String, Vec<String>>> for CategorySet {
    fn from(raw: BTreeMap<String, Vec<String>>) -> Self {
        let mut set = Self::new();
        for (status, categories) in raw {
            // Keep statuses listed with no categories so they count as known.
            set.by_status.entry(status_key(&status)).or_default();
            for category in &categories {
                set.assign(&status, category);
            }
        }
        set
    }
}

impl From<CategorySet> for BTreeMap<String, Vec<String>> {
    fn from(set: CategorySet) -> Self {
        set.by_status
            .into_iter()
            .map(|(status, categories)| (status, categories.into_iter().collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let set = CategorySet::new().with("In Progress", &["work"]);
        assert!(set.has_category("in progress", "work"));
        assert!(set.has_category("  IN PROGRESS ", "work"));
        assert!(!set.has_category("in progress", "done"));
    }

    #[test]
    fn status_can_belong_to_several_categories() {
        let set = CategorySet::new().with("Code Review", &["review", "work"]);
        let cats: Vec<&str> = set
            .categories_of("Code Review")
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(cats, ["review", "work"]);
    }

    #[test]
    fn unknown_status_has_no_categories() {
        let set = CategorySet::new().with("Done", &["done"]);
        assert!(set.categories_of("Triage").is_empty());
        assert!(!set.is_known("Triage"));
    }

    #[test]
    fn deserializes_from_toml_table() {
        let raw = r#"
"To Do" = ["wait"]
"Code Review" = ["review", "work"]
"Parked" = []
"#;
        let set: CategorySet = toml::from_str(raw).expect("parse categories");
        assert_eq!(set.len(), 3);
        assert!(set.has_category("to do", "wait"));
        assert!(set.has_category("code review", "work"));
        assert!(set.is_known("parked"));
        assert!(set.categories_of("parked").is_empty());
    }

    #[test]
    fn extend_unions_categories() {
        let mut a = CategorySet::new().with("Review", &["review"]);
        let b = CategorySet::new().with("review", &["work"]).with("Done", &["done"]);
        a.extend_from(&b);
        assert_eq!(a.len(), 2);
        assert!(a.has_category("Review", "review"));
        assert!(a.has_category("Review", "work"));
    }
}
