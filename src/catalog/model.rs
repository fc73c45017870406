use super::tree::{self, Branch, Tree};
use serde::{Deserialize, Serialize};

/// One leaf of a catalog, addressed by namespace and dot-path key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafEntry {
    pub namespace: String,
    pub key: String,
    pub value: String,
}

/// One locale's full message tree: namespace -> nested keys -> string.
///
/// Namespaces are the top-level entries of the tree; the key inside a
/// namespace may itself be a dot path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    root: Branch,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_branch(root: Branch) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Branch {
        &self.root
    }

    /// Names of every top-level group that holds keys.
    pub fn namespaces(&self) -> Vec<&str> {
        self.root
            .iter()
            .filter(|(_, v)| v.is_node())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.root.get(namespace).is_some_and(Tree::is_node)
    }

    /// Ensure `namespace` exists as a node. Returns true if it was created.
    pub fn ensure_namespace(&mut self, namespace: &str) -> bool {
        if self.has_namespace(namespace) {
            return false;
        }
        self.root.insert(namespace.to_string(), Tree::node());
        true
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<&str> {
        self.namespace_branch(namespace)
            .and_then(|branch| tree::get(branch, key))
    }

    /// True when something (leaf or group) already lives at `namespace.key`.
    pub fn contains(&self, namespace: &str, key: &str) -> bool {
        self.namespace_branch(namespace)
            .and_then(|branch| tree::get_node(branch, key))
            .is_some()
    }

    /// Set a value, creating the namespace if needed. Returns the previous
    /// leaf value.
    pub fn set(&mut self, namespace: &str, key: &str, value: impl Into<String>) -> Option<String> {
        self.ensure_namespace(namespace);
        match self.root.get_mut(namespace) {
            Some(Tree::Node(branch)) => match tree::set(branch, key, value) {
                Some(Tree::Leaf(old)) => Some(old),
                _ => None,
            },
            _ => None,
        }
    }

    /// Remove a leaf. Returns its value if it existed.
    pub fn remove(&mut self, namespace: &str, key: &str) -> Option<String> {
        match self.root.get_mut(namespace) {
            Some(Tree::Node(branch)) => {
                if tree::get(branch, key).is_none() {
                    return None;
                }
                match tree::delete(branch, key) {
                    Some(Tree::Leaf(old)) => Some(old),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Every leaf under a namespace as `(key, value)`.
    pub fn namespace_leaves(&self, namespace: &str) -> Vec<(String, String)> {
        self.namespace_branch(namespace)
            .map(tree::leaves)
            .unwrap_or_default()
    }

    /// Every leaf in the catalog, grouped by namespace, in sorted order.
    pub fn entries(&self) -> Vec<LeafEntry> {
        let mut out = Vec::new();
        for (namespace, child) in &self.root {
            if let Tree::Node(branch) = child {
                for (key, value) in tree::leaves(branch) {
                    out.push(LeafEntry {
                        namespace: namespace.clone(),
                        key,
                        value,
                    });
                }
            }
        }
        out
    }

    pub fn leaf_count(&self) -> usize {
        self.root
            .values()
            .filter(|v| v.is_node())
            .map(Tree::leaf_count)
            .sum()
    }

    /// Same structure with every value blanked.
    pub fn empty_mirror(&self) -> Catalog {
        Catalog {
            root: self
                .root
                .iter()
                .filter(|(_, v)| v.is_node())
                .map(|(k, v)| (k.clone(), v.empty_mirror()))
                .collect(),
        }
    }

    fn namespace_branch(&self, namespace: &str) -> Option<&Branch> {
        self.root.get(namespace).and_then(Tree::as_node)
    }
}
