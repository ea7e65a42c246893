//! Traversal paths
//!
//! Two parallel dotted paths are tracked from the root: `raw` extends on
//! every visited key (including operators and array indices), `attribute`
//! only on keys that resolved to a real schema attribute. Allow/deny field
//! matching works on the attribute path so query operators never break it.

/// Accumulated position of a node relative to the traversal root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalPath {
    /// Every key visited, dotted; `None` at the root
    pub raw: Option<String>,
    /// Only keys that resolved to schema attributes
    pub attribute: Option<String>,
}

impl TraversalPath {
    /// Extend both variants for a visited key
    pub fn descend(&self, key: &str, is_attribute: bool) -> Self {
        TraversalPath {
            raw: Some(join(self.raw.as_deref(), key)),
            attribute: if is_attribute {
                Some(join(self.attribute.as_deref(), key))
            } else {
                self.attribute.clone()
            },
        }
    }

    /// Extend the raw path with an array index
    pub fn index(&self, index: usize) -> Self {
        TraversalPath {
            raw: Some(join(self.raw.as_deref(), &index.to_string())),
            attribute: self.attribute.clone(),
        }
    }

    /// Raw path for diagnostics, empty at the root
    pub fn display(&self) -> &str {
        self.raw.as_deref().unwrap_or("")
    }
}

fn join(base: Option<&str>, segment: &str) -> String {
    match base {
        Some(base) => format!("{base}.{segment}"),
        None => segment.to_string(),
    }
}
