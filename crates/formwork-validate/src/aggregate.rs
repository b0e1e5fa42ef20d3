//! Error and warning aggregation.
//!
//! Flattens the live validation state of a form tree into one per-path map
//! for presentation layers. Rebuilt on demand rather than cached: the walk
//! reads error state straight off the tree, so the result is consistent by
//! construction with whatever the orchestrator last applied.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use formwork_core::{ControlId, FormTree};
use formwork_model::{FieldPath, ROOT_KEY};

/// Flat per-path error and warning maps.
///
/// Whole-form (cross-field) issues are stored under [`ROOT_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedIssues {
    pub errors: BTreeMap<String, Vec<String>>,
    pub warnings: BTreeMap<String, Vec<String>>,
}

impl AggregatedIssues {
    /// Total error messages across all paths.
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Total warning messages across all paths.
    pub fn warning_count(&self) -> usize {
        self.warnings.values().map(Vec::len).sum()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Collect every error and warning in the tree in a single depth-first
/// walk.
///
/// Root-level cross-field issues are recorded under [`ROOT_KEY`] before
/// descending, so they are always present regardless of field-level state.
/// Disabled controls are skipped along with their subtrees: a disabled
/// field is not currently subject to validation. Purely a read.
pub fn collect(tree: &FormTree) -> AggregatedIssues {
    let mut issues = AggregatedIssues::default();
    let root = tree.root();
    record(&mut issues, ROOT_KEY, tree.errors(root), tree.warnings(root));

    if !tree.is_disabled(root) {
        for (segment, child) in tree.children(root) {
            walk(tree, child, FieldPath::root().child(segment), &mut issues);
        }
    }
    issues
}

fn walk(tree: &FormTree, id: ControlId, path: FieldPath, issues: &mut AggregatedIssues) {
    if tree.is_disabled(id) {
        return;
    }
    for (segment, child) in tree.children(id) {
        walk(tree, child, path.child(segment), issues);
    }
    record(issues, &path.to_string(), tree.errors(id), tree.warnings(id));
}

fn record(issues: &mut AggregatedIssues, path: &str, errors: &[String], warnings: &[String]) {
    if !errors.is_empty() {
        issues.errors.insert(path.to_string(), errors.to_vec());
    }
    if !warnings.is_empty() {
        issues.warnings.insert(path.to_string(), warnings.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tree() -> FormTree {
        FormTree::from_model(&json!({
            "password": "",
            "profile": {"email": "ada@example.com"},
            "addresses": [{"street": ""}, {"street": "Main"}]
        }))
    }

    fn id(tree: &FormTree, path: &str) -> ControlId {
        tree.resolve(&FieldPath::parse(path)).expect(path)
    }

    #[test]
    fn leaf_errors_land_under_their_path() {
        let mut tree = sample_tree();
        let password = id(&tree, "password");
        tree.set_errors(password, vec!["Required".into()]);

        let issues = collect(&tree);
        assert_eq!(issues.errors["password"], vec!["Required".to_string()]);
        assert_eq!(issues.error_count(), 1);
    }

    #[test]
    fn list_children_use_numeric_segments() {
        let mut tree = sample_tree();
        let street = id(&tree, "addresses[0].street");
        tree.set_errors(street, vec!["Required".into()]);

        let issues = collect(&tree);
        assert!(issues.errors.contains_key("addresses[0].street"));
    }

    #[test]
    fn root_issues_use_the_sentinel_key() {
        let mut tree = sample_tree();
        let root = tree.root();
        tree.set_errors(root, vec!["Dates out of order".into()]);

        let issues = collect(&tree);
        assert_eq!(
            issues.errors[ROOT_KEY],
            vec!["Dates out of order".to_string()]
        );
    }

    #[test]
    fn group_errors_are_recorded_on_the_group() {
        let mut tree = sample_tree();
        let profile = id(&tree, "profile");
        tree.set_errors(profile, vec!["Incomplete".into()]);

        let issues = collect(&tree);
        assert_eq!(issues.errors["profile"], vec!["Incomplete".to_string()]);
    }

    #[test]
    fn disabled_subtrees_are_skipped() {
        let mut tree = sample_tree();
        let street = id(&tree, "addresses[0].street");
        tree.set_errors(street, vec!["Required".into()]);
        let addresses = id(&tree, "addresses");
        tree.set_disabled(addresses, true);

        let issues = collect(&tree);
        assert!(issues.is_empty());
    }

    #[test]
    fn warnings_aggregate_separately() {
        let mut tree = sample_tree();
        let email = id(&tree, "profile.email");
        tree.set_warnings(email, vec!["Unusual domain".into()]);

        let issues = collect(&tree);
        assert!(issues.errors.is_empty());
        assert_eq!(
            issues.warnings["profile.email"],
            vec!["Unusual domain".to_string()]
        );
        assert!(!issues.has_errors());
    }
}
