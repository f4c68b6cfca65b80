//! Test data builders for creating trees

use user_props::tree::ValidationRules;
use user_props::{PropNode, PropTree};

/// Builder for property trees used across integration tests
#[derive(Default)]
pub struct TreeBuilder {
    tree: PropTree,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number(mut self, path: &str, value: f64) -> Self {
        self.tree.set(path, PropNode::number(value)).unwrap();
        self
    }

    pub fn string(mut self, path: &str, value: &str) -> Self {
        self.tree.set(path, PropNode::string(value)).unwrap();
        self
    }

    /// Number node computed by `source`
    pub fn expression(mut self, path: &str, source: &str) -> Self {
        self.tree
            .set(path, PropNode::number(0.0).with_expression(source))
            .unwrap();
        self
    }

    pub fn watched(mut self, path: &str, value: f64, script: &str) -> Self {
        self.tree
            .set(path, PropNode::number(value).with_watcher(script))
            .unwrap();
        self
    }

    pub fn validated(mut self, path: &str, value: &str, rules: ValidationRules) -> Self {
        self.tree
            .set(path, PropNode::string(value).with_validation(rules))
            .unwrap();
        self
    }

    pub fn build(self) -> PropTree {
        self.tree
    }
}

/// `a = 2`, `b = 3`, `sum = get('a') + get('b')`
pub fn sum_tree() -> PropTree {
    TreeBuilder::new()
        .number("a", 2.0)
        .number("b", 3.0)
        .expression("sum", "get('a') + get('b')")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_builder() {
        let tree = TreeBuilder::new()
            .number("x", 1.0)
            .string("nested.label", "hi")
            .build();

        assert!(tree.get("x").is_some());
        assert!(tree.get("nested").is_some());
        assert_eq!(tree.value("nested.label"), Some("hi".into()));
    }
}
