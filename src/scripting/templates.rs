//! Snippet templates for editor pickers.
//!
//! Each template is a body with `{{name}}` placeholders. The builders
//! substitute parameters verbatim: values are not quoted or escaped, and a
//! parameter that is not supplied leaves its placeholder in place.

/// A parameterized snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetTemplate {
    /// Lookup key
    pub key: &'static str,
    /// Label shown in pickers
    pub label: &'static str,
    /// Placeholder names used by `body`
    pub params: &'static [&'static str],
    pub body: &'static str,
}

impl SnippetTemplate {
    /// Substitute `params` into the body
    pub fn render(&self, params: &[(&str, &str)]) -> String {
        params.iter().fold(self.body.to_string(), |body, (name, value)| {
            body.replace(&format!("{{{{{}}}}}", name), value)
        })
    }
}

// ===== Computed expressions =====

/// Sum of two properties
pub const SUM: SnippetTemplate = SnippetTemplate {
    key: "sum",
    label: "Sum",
    params: &["a", "b"],
    body: "get('{{a}}') + get('{{b}}')",
};

/// Difference of two properties
pub const DIFFERENCE: SnippetTemplate = SnippetTemplate {
    key: "difference",
    label: "Difference",
    params: &["a", "b"],
    body: "get('{{a}}') - get('{{b}}')",
};

/// Product of two properties
pub const PRODUCT: SnippetTemplate = SnippetTemplate {
    key: "product",
    label: "Product",
    params: &["a", "b"],
    body: "get('{{a}}') * get('{{b}}')",
};

/// Ratio, zero when the divisor is zero
pub const RATIO: SnippetTemplate = SnippetTemplate {
    key: "ratio",
    label: "Ratio",
    params: &["a", "b"],
    body: "if number(get('{{b}}')) == 0.0 { 0.0 } else { number(get('{{a}}')) / number(get('{{b}}')) }",
};

/// Text concatenation with a separator
pub const CONCAT: SnippetTemplate = SnippetTemplate {
    key: "concat",
    label: "Join Text",
    params: &["a", "b", "separator"],
    body: "text(get('{{a}}')) + '{{separator}}' + text(get('{{b}}'))",
};

/// Pick one of two values on a condition property
pub const CONDITIONAL: SnippetTemplate = SnippetTemplate {
    key: "conditional",
    label: "If / Else",
    params: &["condition", "then", "otherwise"],
    body: "if get('{{condition}}') { {{then}} } else { {{otherwise}} }",
};

/// Share of a part in a total, in percent
pub const PERCENTAGE: SnippetTemplate = SnippetTemplate {
    key: "percentage",
    label: "Percentage",
    params: &["part", "total"],
    body: "if number(get('{{total}}')) == 0.0 { 0.0 } else { number(get('{{part}}')) * 100.0 / number(get('{{total}}')) }",
};

/// Property limited to a range
pub const CLAMP: SnippetTemplate = SnippetTemplate {
    key: "clamp",
    label: "Clamp",
    params: &["source", "min", "max"],
    body: "clamp(get('{{source}}'), {{min}}, {{max}})",
};

// ===== Watchers =====

/// Log every change
pub const LOG_CHANGE: SnippetTemplate = SnippetTemplate {
    key: "log_change",
    label: "Log Change",
    params: &[],
    body: "log(`${path}: ${previous} -> ${value}`)",
};

/// Log when the value crosses a threshold
pub const LOG_THRESHOLD: SnippetTemplate = SnippetTemplate {
    key: "log_threshold",
    label: "Log Above Threshold",
    params: &["threshold"],
    body: "if number(value) > {{threshold}} { log(`${path} is above {{threshold}}: ${value}`) }",
};

/// Print a fixed message
pub const NOTIFY: SnippetTemplate = SnippetTemplate {
    key: "notify",
    label: "Notify",
    params: &["message"],
    body: "print('{{message}}')",
};

// ===== Custom validation rules =====

/// Value must be within a range
pub const IN_RANGE: SnippetTemplate = SnippetTemplate {
    key: "in_range",
    label: "In Range",
    params: &["min", "max"],
    body: "if number(value) < {{min}} || number(value) > {{max}} { 'Must be between {{min}} and {{max}}' } else { true }",
};

/// Text must not exceed a length
pub const MAX_LENGTH: SnippetTemplate = SnippetTemplate {
    key: "max_length",
    label: "Max Length",
    params: &["length"],
    body: "if text(value).len() > {{length}} { 'At most {{length}} characters' } else { true }",
};

/// Value must be a multiple of a step
pub const MULTIPLE_OF: SnippetTemplate = SnippetTemplate {
    key: "multiple_of",
    label: "Multiple Of",
    params: &["step"],
    body: "number(value) % {{step}} == 0.0",
};

/// Value must differ from another property
pub const DIFFERS_FROM: SnippetTemplate = SnippetTemplate {
    key: "differs_from",
    label: "Differs From",
    params: &["other"],
    body: "if value == get('{{other}}') { 'Must differ from {{other}}' } else { true }",
};

/// Expression templates
pub fn expressions() -> &'static [SnippetTemplate] {
    &[SUM, DIFFERENCE, PRODUCT, RATIO, CONCAT, CONDITIONAL, PERCENTAGE, CLAMP]
}

/// Watcher templates
pub fn watchers() -> &'static [SnippetTemplate] {
    &[LOG_CHANGE, LOG_THRESHOLD, NOTIFY]
}

/// Custom validation templates
pub fn validations() -> &'static [SnippetTemplate] {
    &[IN_RANGE, MAX_LENGTH, MULTIPLE_OF, DIFFERS_FROM]
}

fn build(catalogue: &[SnippetTemplate], key: &str, params: &[(&str, &str)]) -> Option<String> {
    catalogue
        .iter()
        .find(|t| t.key == key)
        .map(|t| t.render(params))
}

/// Render an expression template; `None` for an unknown key
pub fn build_expression_template(key: &str, params: &[(&str, &str)]) -> Option<String> {
    build(expressions(), key, params)
}

/// Render a watcher template; `None` for an unknown key
pub fn build_watcher_template(key: &str, params: &[(&str, &str)]) -> Option<String> {
    build(watchers(), key, params)
}

/// Render a custom validation template; `None` for an unknown key
pub fn build_validation_template(key: &str, params: &[(&str, &str)]) -> Option<String> {
    build(validations(), key, params)
}
