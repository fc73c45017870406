//! Message tree and dot-path codec.
//!
//! A catalog is a recursive tree whose leaves are always strings. Keys are
//! addressed with dot paths (`"Auth.login.title"`). This module is the only
//! place that walks the tree structure; everything else goes through
//! [`get`], [`set`], [`delete`] and [`leaves`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Children of a node, kept in sorted order so serialization is stable.
pub type Branch = BTreeMap<String, Tree>;

/// A node in a message tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tree {
    Leaf(String),
    Node(Branch),
}

impl Tree {
    pub fn node() -> Self {
        Tree::Node(Branch::new())
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Tree::Leaf(value) => Some(value),
            Tree::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Branch> {
        match self {
            Tree::Leaf(_) => None,
            Tree::Node(children) => Some(children),
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Tree::Node(_))
    }

    /// Number of leaves below (or at) this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            Tree::Leaf(_) => 1,
            Tree::Node(children) => children.values().map(Tree::leaf_count).sum(),
        }
    }

    /// Same shape, every leaf replaced with the empty string.
    pub fn empty_mirror(&self) -> Tree {
        match self {
            Tree::Leaf(_) => Tree::Leaf(String::new()),
            Tree::Node(children) => Tree::Node(
                children
                    .iter()
                    .map(|(k, v)| (k.clone(), v.empty_mirror()))
                    .collect(),
            ),
        }
    }
}

/// Split a dot path into segments. Any empty segment makes the whole path
/// malformed.
fn segments(path: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}

/// Returns true when `path` is a well-formed dot path.
pub fn is_valid_path(path: &str) -> bool {
    segments(path).is_some()
}

/// Look up the subtree at `path`.
pub fn get_node<'a>(branch: &'a Branch, path: &str) -> Option<&'a Tree> {
    let parts = segments(path)?;
    let (last, parents) = parts.split_last()?;

    let mut current = branch;
    for part in parents {
        match current.get(*part) {
            Some(Tree::Node(children)) => current = children,
            _ => return None,
        }
    }
    current.get(*last)
}

/// Look up the string value at `path`. Intermediate nodes yield `None`.
pub fn get<'a>(branch: &'a Branch, path: &str) -> Option<&'a str> {
    get_node(branch, path).and_then(Tree::as_leaf)
}

/// Store `value` at `path`, creating intermediate nodes as needed.
///
/// An intermediate segment that currently holds a leaf is replaced by a node.
/// Returns the previous subtree at `path`, if any. Malformed paths are a no-op.
pub fn set(branch: &mut Branch, path: &str, value: impl Into<String>) -> Option<Tree> {
    let parts = segments(path)?;
    let (last, parents) = parts.split_last()?;

    let mut current = branch;
    for part in parents {
        let slot = current.entry((*part).to_string()).or_insert_with(Tree::node);
        if !slot.is_node() {
            *slot = Tree::node();
        }
        current = match slot {
            Tree::Node(children) => children,
            Tree::Leaf(_) => return None,
        };
    }
    current.insert((*last).to_string(), Tree::Leaf(value.into()))
}

/// Remove whatever sits at `path`. Parents are left in place even when they
/// become empty.
pub fn delete(branch: &mut Branch, path: &str) -> Option<Tree> {
    let parts = segments(path)?;
    let (last, parents) = parts.split_last()?;

    let mut current = branch;
    for part in parents {
        match current.get_mut(*part) {
            Some(Tree::Node(children)) => current = children,
            _ => return None,
        }
    }
    current.remove(*last)
}

/// Enumerate every leaf as `(dot path, value)`, in sorted path order.
pub fn leaves(branch: &Branch) -> Vec<(String, String)> {
    let mut out = Vec::new();
    collect_leaves(branch, "", &mut out);
    out
}

fn collect_leaves(branch: &Branch, prefix: &str, out: &mut Vec<(String, String)>) {
    for (key, child) in branch {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match child {
            Tree::Leaf(value) => out.push((path, value.clone())),
            Tree::Node(children) => collect_leaves(children, &path, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Branch {
        serde_json::from_str(
            r#"{
                "title": "Welcome",
                "auth": {
                    "login": {"button": "Sign in", "hint": ""},
                    "logout": "Sign out"
                }
            }"#,
        )
        .expect("valid sample")
    }

    #[test]
    fn test_get_nested_leaf() {
        let tree = sample();
        assert_eq!(get(&tree, "auth.login.button"), Some("Sign in"));
        assert_eq!(get(&tree, "title"), Some("Welcome"));
    }

    #[test]
    fn test_get_empty_value_is_present() {
        let tree = sample();
        assert_eq!(get(&tree, "auth.login.hint"), Some(""));
        assert_eq!(get(&tree, "auth.login.missing"), None);
    }

    #[test]
    fn test_get_intermediate_node_is_not_a_leaf() {
        let tree = sample();
        assert_eq!(get(&tree, "auth.login"), None);
        assert!(get_node(&tree, "auth.login").is_some_and(Tree::is_node));
    }

    #[test]
    fn test_get_through_leaf_returns_none() {
        let tree = sample();
        assert_eq!(get(&tree, "title.deeper"), None);
    }

    #[test]
    fn test_malformed_paths_are_noops() {
        let mut tree = sample();
        let before = tree.clone();
        assert_eq!(get(&tree, "auth..login"), None);
        assert_eq!(get(&tree, ""), None);
        assert!(set(&mut tree, "auth.", "x").is_none());
        assert!(set(&mut tree, ".auth", "x").is_none());
        assert!(delete(&mut tree, "a..b").is_none());
        assert_eq!(tree, before);
        assert!(!is_valid_path("a..b"));
        assert!(is_valid_path("a.b"));
    }

    #[test]
    fn test_set_creates_intermediate_nodes() {
        let mut tree = Branch::new();
        set(&mut tree, "a.b.c", "deep");
        assert_eq!(get(&tree, "a.b.c"), Some("deep"));
        assert_eq!(leaves(&tree).len(), 1);
    }

    #[test]
    fn test_set_returns_previous_value() {
        let mut tree = sample();
        let previous = set(&mut tree, "auth.logout", "Log out");
        assert_eq!(previous, Some(Tree::Leaf("Sign out".to_string())));
        assert_eq!(get(&tree, "auth.logout"), Some("Log out"));
    }

    #[test]
    fn test_set_replaces_leaf_on_the_way() {
        let mut tree = sample();
        set(&mut tree, "title.main", "Hello");
        assert_eq!(get(&tree, "title.main"), Some("Hello"));
        assert_eq!(get(&tree, "title"), None);
    }

    #[test]
    fn test_delete_leaf_keeps_parent() {
        let mut tree = sample();
        let removed = delete(&mut tree, "auth.logout");
        assert_eq!(removed, Some(Tree::Leaf("Sign out".to_string())));
        assert!(get_node(&tree, "auth").is_some());
        assert_eq!(delete(&mut tree, "auth.logout"), None);
    }

    #[test]
    fn test_leaves_are_sorted_dot_paths() {
        let tree = sample();
        let paths: Vec<String> = leaves(&tree).into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            vec![
                "auth.login.button",
                "auth.login.hint",
                "auth.logout",
                "title"
            ]
        );
    }

    #[test]
    fn test_leaf_count_and_empty_mirror() {
        let tree = Tree::Node(sample());
        assert_eq!(tree.leaf_count(), 4);

        let mirror = tree.empty_mirror();
        let branch = mirror.as_node().expect("node");
        assert_eq!(mirror.leaf_count(), 4);
        assert!(leaves(branch).iter().all(|(_, v)| v.is_empty()));
    }

    #[test]
    fn test_serialization_is_stable() {
        let mut a = Branch::new();
        set(&mut a, "z", "last");
        set(&mut a, "a", "first");
        let json = serde_json::to_string(&a).expect("serialize");
        assert_eq!(json, r#"{"a":"first","z":"last"}"#);
    }

    #[test]
    fn test_non_string_leaf_is_rejected() {
        let parsed: Result<Branch, _> = serde_json::from_str(r#"{"count": 3}"#);
        assert!(parsed.is_err());
    }

    fn arb_branch() -> impl Strategy<Value = Branch> {
        let leaf = ".{0,12}".prop_map(Tree::Leaf);
        let tree = leaf.prop_recursive(3, 24, 4, |inner| {
            prop::collection::btree_map("[a-z]{1,4}", inner, 1..4).prop_map(Tree::Node)
        });
        prop::collection::btree_map("[a-z]{1,4}", tree, 0..5)
    }

    proptest! {
        #[test]
        fn prop_set_of_get_is_identity(tree in arb_branch()) {
            for (path, value) in leaves(&tree) {
                let mut copy = tree.clone();
                set(&mut copy, &path, value.clone());
                prop_assert_eq!(&copy, &tree);
                prop_assert_eq!(get(&tree, &path), Some(value.as_str()));
            }
        }

        #[test]
        fn prop_delete_removes_exactly_one_leaf(tree in arb_branch()) {
            let total = leaves(&tree).len();
            if let Some((path, _)) = leaves(&tree).into_iter().next() {
                let mut copy = tree.clone();
                delete(&mut copy, &path);
                prop_assert_eq!(leaves(&copy).len(), total - 1);
                prop_assert_eq!(get(&copy, &path), None);
            }
        }
    }
}
