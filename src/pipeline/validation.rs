//! Validation engine.
//!
//! Checks the rule set of every primitive node and returns the failures as
//! an ordered `path -> message` map. Rules run in the order `required`,
//! `min`, `max`, `pattern`, `custom` and stop at the first failure. The tree
//! is never mutated.

use crate::scripting::{dynamic_to_prop, ScriptBindings, ScriptEngine};
use crate::tree::{PropNode, PropTree, ValidationRules};
use crate::types::{format_number, PropValue};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashMap;

/// Failures keyed by node path, in traversal order
pub type ValidationErrors = IndexMap<String, String>;

/// Validator with a cache of compiled patterns
#[derive(Debug, Default)]
pub struct Validator {
    patterns: HashMap<String, Result<Regex, String>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate every primitive node of `tree`
    pub fn validate_tree(&mut self, engine: &ScriptEngine, tree: &PropTree) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        engine.load_tree(tree);

        for (path, node) in tree.primitives() {
            let Some(rules) = &node.meta.validation else {
                continue;
            };
            if let Some(message) = self.validate_node(engine, &path, node, rules) {
                tracing::trace!("Validation failed at '{}': {}", path, message);
                errors.insert(path, message);
            }
        }

        engine.unload_tree();
        tracing::debug!("Validation finished with {} errors", errors.len());
        errors
    }

    /// First failing rule of `node`, if any
    pub fn validate_node(
        &mut self,
        engine: &ScriptEngine,
        path: &str,
        node: &PropNode,
        rules: &ValidationRules,
    ) -> Option<String> {
        let value = node.value()?;
        let custom_message = |default: String| rules.message.clone().unwrap_or(default);

        if rules.required && is_missing(&value) {
            return Some(custom_message("This field is required".to_string()));
        }

        if let PropValue::Number(n) = value {
            if let Some(min) = rules.min {
                if n < min {
                    return Some(custom_message(format!("Must be at least {}", format_number(min))));
                }
            }
            if let Some(max) = rules.max {
                if n > max {
                    return Some(custom_message(format!("Must be at most {}", format_number(max))));
                }
            }
        }

        if let (Some(pattern), PropValue::String(text)) = (&rules.pattern, &value) {
            match self.pattern(pattern) {
                Ok(re) => {
                    if !re.is_match(text) {
                        return Some(custom_message(format!("Does not match pattern {}", pattern)));
                    }
                }
                Err(message) => return Some(message.clone()),
            }
        }

        if let Some(script) = &rules.custom {
            return run_custom_rule(engine, path, &value, script);
        }

        None
    }

    fn pattern(&mut self, pattern: &str) -> &Result<Regex, String> {
        self.patterns
            .entry(pattern.to_string())
            .or_insert_with(|| {
                Regex::new(pattern).map_err(|e| {
                    tracing::warn!("Invalid validation pattern '{}': {}", pattern, e);
                    format!("Invalid pattern '{}': {}", pattern, e)
                })
            })
    }

    pub fn cached_patterns(&self) -> usize {
        self.patterns.len()
    }
}

/// Blank strings and `NaN` fail `required`; booleans always pass
fn is_missing(value: &PropValue) -> bool {
    match value {
        PropValue::String(s) => s.trim().is_empty(),
        PropValue::Number(n) => n.is_nan(),
        PropValue::Boolean(_) => false,
    }
}

fn run_custom_rule(engine: &ScriptEngine, path: &str, value: &PropValue, script: &str) -> Option<String> {
    let bindings = ScriptBindings::new()
        .with_value("value", Some(value))
        .with_path(path);

    match engine.eval(script, &bindings) {
        Ok(result) => match dynamic_to_prop(&result) {
            Some(PropValue::Boolean(false)) => Some("Custom validation failed".to_string()),
            Some(PropValue::String(message)) if !message.is_empty() => Some(message),
            _ => None,
        },
        Err(e) => {
            tracing::warn!("Custom validation at '{}' failed to run: {}", path, e);
            Some(format!("Custom validation error: {}", e))
        }
    }
}

/// Validate `tree` with a throwaway pattern cache
pub fn validate_tree(engine: &ScriptEngine, tree: &PropTree) -> ValidationErrors {
    Validator::new().validate_tree(engine, tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ValidationRules {
        ValidationRules::default()
    }

    fn check(node: PropNode) -> Option<String> {
        let engine = ScriptEngine::new();
        let mut tree = PropTree::new();
        tree.set("field", node).unwrap();
        validate_tree(&engine, &tree).get("field").cloned()
    }

    #[test]
    fn test_required() {
        let required = ValidationRules {
            required: true,
            ..rules()
        };
        assert_eq!(
            check(PropNode::string("  ").with_validation(required.clone())),
            Some("This field is required".to_string())
        );
        assert!(check(PropNode::string("x").with_validation(required.clone())).is_none());
        assert!(check(PropNode::number(f64::NAN).with_validation(required.clone())).is_some());
        assert!(check(PropNode::number(0.0).with_validation(required.clone())).is_none());
        assert!(check(PropNode::boolean(false).with_validation(required)).is_none());
    }

    #[test]
    fn test_min_max() {
        let range = ValidationRules {
            min: Some(1.0),
            max: Some(10.5),
            ..rules()
        };
        assert_eq!(
            check(PropNode::number(0.0).with_validation(range.clone())),
            Some("Must be at least 1".to_string())
        );
        assert_eq!(
            check(PropNode::number(11.0).with_validation(range.clone())),
            Some("Must be at most 10.5".to_string())
        );
        assert!(check(PropNode::number(5.0).with_validation(range.clone())).is_none());
        // number rules do not apply to strings
        assert!(check(PropNode::string("0").with_validation(range)).is_none());
    }

    #[test]
    fn test_pattern() {
        let digits = ValidationRules {
            required: true,
            pattern: Some(r"^\d+$".into()),
            ..rules()
        };
        assert!(check(PropNode::string("123").with_validation(digits.clone())).is_none());
        let message = check(PropNode::string("abc").with_validation(digits)).unwrap();
        assert!(!message.is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let broken = ValidationRules {
            pattern: Some("([".into()),
            ..rules()
        };
        let message = check(PropNode::string("x").with_validation(broken)).unwrap();
        assert!(message.starts_with("Invalid pattern '(['"));
    }

    #[test]
    fn test_custom_message_override() {
        let rules = ValidationRules {
            required: true,
            message: Some("Give it a name".into()),
            ..rules()
        };
        assert_eq!(
            check(PropNode::string("").with_validation(rules)),
            Some("Give it a name".to_string())
        );
    }

    #[test]
    fn test_custom_rule() {
        let custom = |script: &str| ValidationRules {
            custom: Some(script.into()),
            ..rules()
        };
        assert_eq!(
            check(PropNode::number(3.0).with_validation(custom("value > 5"))),
            Some("Custom validation failed".to_string())
        );
        assert!(check(PropNode::number(8.0).with_validation(custom("value > 5"))).is_none());
        assert_eq!(
            check(PropNode::string("ab").with_validation(custom(
                "if value.len() < 3 { 'Too short' } else { true }"
            ))),
            Some("Too short".to_string())
        );
        let err = check(PropNode::number(1.0).with_validation(custom("nope("))).unwrap();
        assert!(err.starts_with("Custom validation error:"));
    }

    #[test]
    fn test_first_failure_wins() {
        let rules = ValidationRules {
            min: Some(10.0),
            custom: Some("false".into()),
            ..rules()
        };
        assert_eq!(
            check(PropNode::number(1.0).with_validation(rules)),
            Some("Must be at least 10".to_string())
        );
    }

    #[test]
    fn test_custom_rule_reads_tree() {
        let engine = ScriptEngine::new();
        let mut tree = PropTree::new();
        tree.set("min", PropNode::number(4.0)).unwrap();
        tree.set(
            "value",
            PropNode::number(2.0).with_validation(ValidationRules {
                custom: Some("value >= get('min')".into()),
                ..rules()
            }),
        )
        .unwrap();
        let errors = validate_tree(&engine, &tree);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_pattern_cache_and_tree_untouched() {
        let engine = ScriptEngine::new();
        let mut tree = PropTree::new();
        let rules = ValidationRules {
            pattern: Some("^a".into()),
            ..rules()
        };
        tree.set("x", PropNode::string("abc").with_validation(rules.clone()))
            .unwrap();
        tree.set("y", PropNode::string("bcd").with_validation(rules))
            .unwrap();
        let before = tree.clone();

        let mut validator = Validator::new();
        let errors = validator.validate_tree(&engine, &tree);
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["y"]);
        assert_eq!(validator.cached_patterns(), 1);
        assert_eq!(tree, before);
    }
}
