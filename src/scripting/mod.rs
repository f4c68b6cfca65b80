//! Rhai Scripting Engine for expressions, validation rules and watchers
//!
//! Every user-authored snippet (a computed expression, a `custom`
//! validation rule, a watcher script) runs through the [`ScriptEngine`]
//! defined here. Snippets are small Rhai programs; a single expression is
//! its own value, a multi-statement snippet yields its last expression or an
//! explicit `return`.
//!
//! ## Bindings
//!
//! - `get(path)` - Current value of another node (`()` when missing; maps and
//!   arrays for containers)
//! - `path` - Path of the node the snippet belongs to
//! - `root` - The whole tree as a read-only map (only bound when mentioned)
//! - `value` / `previous` - Node value and previous value (validation rules
//!   and watchers)
//!
//! ## Helper Functions
//!
//! - `abs`, `sqrt`, `pow`, `floor`, `ceil`, `round`, `round_to(x, digits)`
//! - `min`, `max`, `clamp`, `lerp`, `map_range`, `sign`, `pi()`
//! - `number(x)` / `text(x)` - Explicit conversions
//! - `is_empty(x)` / `coalesce(a, b)` - Blank handling
//! - `log(msg)`, `print(msg)`, `debug(msg)` - Structured log output
//!
//! ## Source Compatibility
//!
//! Snippets are normalized before compilation: single-quoted strings become
//! double-quoted and `===` / `!==` become `==` / `!=`, so
//! `get('a') === 'x'` compiles. Identifiers that reach outside the sandbox
//! (`eval`, `import`, `constructor`, `globalThis`, ...) are rejected before
//! compilation.
//!
//! ## Example Snippets
//!
//! Computed total:
//! ```rhai
//! get('price') * get('qty')
//! ```
//!
//! Multi-statement expression:
//! ```rhai
//! let net = get('gross') - get('discount');
//! if net < 0 { 0 } else { net }
//! ```
//!
//! Watcher:
//! ```rhai
//! log(`${path} changed from ${previous} to ${value}`)
//! ```

mod engine;
pub mod templates;

pub use engine::{
    dynamic_to_prop, prop_to_dynamic, ScriptBindings, ScriptContext, ScriptEngine,
    SharedScriptContext,
};

use rhai::{Engine, AST};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Failures of a single snippet run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// The source does not parse
    #[error("syntax error: {0}")]
    Compile(String),

    /// The script failed while running (unknown function, type mismatch, ...)
    #[error("{0}")]
    Runtime(String),

    /// The wall-clock deadline passed
    #[error("script timed out after {ms} ms")]
    Timeout { ms: u64 },

    /// The operation budget ran out
    #[error("script exceeded {ops} operations")]
    Runaway { ops: u64 },

    /// The source names something the sandbox does not expose
    #[error("disallowed token '{0}'")]
    DisallowedToken(String),
}

/// Identifiers rejected before compilation
pub const DISALLOWED_TOKENS: &[&str] = &[
    "eval",
    "import",
    "export",
    "Function",
    "constructor",
    "__proto__",
    "prototype",
    "globalThis",
    "window",
    "document",
    "process",
    "require",
    "fetch",
    "XMLHttpRequest",
    "Deno",
    "spawn",
];

/// Source text after normalization
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSource {
    pub text: String,
    /// The snippet mentions the `root` binding
    pub reads_root: bool,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Rewrite JS-flavored snippet source into Rhai and reject disallowed identifiers.
///
/// Double-quoted strings, backtick strings and comments are copied verbatim.
pub fn normalize_source(source: &str) -> Result<NormalizedSource, ScriptError> {
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len();
    let mut out = String::with_capacity(source.len() + 2);
    let mut ident = String::new();
    let mut reads_root = false;
    let mut i = 0;

    let mut flush = |ident: &mut String| -> Result<(), ScriptError> {
        if ident.is_empty() {
            return Ok(());
        }
        let word = std::mem::take(ident);
        if word.starts_with(|c: char| c.is_ascii_digit()) {
            return Ok(());
        }
        if DISALLOWED_TOKENS.contains(&word.as_str()) {
            return Err(ScriptError::DisallowedToken(word));
        }
        reads_root |= word == "root";
        Ok(())
    };

    while i < len {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if is_ident_char(c) {
            ident.push(c);
            out.push(c);
            i += 1;
            continue;
        }
        flush(&mut ident)?;

        match c {
            '\'' => {
                out.push('"');
                i += 1;
                while i < len && chars[i] != '\'' {
                    match chars[i] {
                        '\\' if i + 1 < len => {
                            if chars[i + 1] != '\'' {
                                out.push('\\');
                            }
                            out.push(chars[i + 1]);
                            i += 2;
                            continue;
                        }
                        '"' => out.push_str("\\\""),
                        ch => out.push(ch),
                    }
                    i += 1;
                }
                // unterminated literals are left open so compilation reports them
                if i < len {
                    out.push('"');
                    i += 1;
                }
            }
            '"' | '`' => {
                out.push(c);
                i += 1;
                while i < len && chars[i] != c {
                    if chars[i] == '\\' && i + 1 < len {
                        out.push(chars[i]);
                        i += 1;
                    }
                    out.push(chars[i]);
                    i += 1;
                }
                if i < len {
                    out.push(c);
                    i += 1;
                }
            }
            '/' if next == Some('/') => {
                while i < len && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                out.push_str("/*");
                i += 2;
                while i < len && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    out.push(chars[i]);
                    i += 1;
                }
                if i < len {
                    out.push_str("*/");
                    i += 2;
                }
            }
            '=' | '!' if next == Some('=') && chars.get(i + 2) == Some(&'=') => {
                out.push(c);
                out.push('=');
                i += 3;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    flush(&mut ident)?;

    Ok(NormalizedSource {
        text: out,
        reads_root,
    })
}

/// A compiled snippet that can be executed repeatedly
#[derive(Clone)]
pub struct CompiledSnippet {
    /// The compiled AST
    ast: Arc<AST>,
    /// The source as written by the user
    source: String,
    reads_root: bool,
}

impl CompiledSnippet {
    /// Get the source code of this snippet
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn reads_root(&self) -> bool {
        self.reads_root
    }

    pub(crate) fn ast(&self) -> &AST {
        &self.ast
    }
}

impl std::fmt::Debug for CompiledSnippet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSnippet")
            .field("source", &self.source)
            .field("reads_root", &self.reads_root)
            .finish()
    }
}

/// Cache for compiled snippets to avoid recompilation
#[derive(Default)]
pub struct ScriptCache {
    /// Map from snippet source to compiled snippet
    cache: HashMap<String, CompiledSnippet>,
}

impl ScriptCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Get a cached snippet or normalize, compile and cache it
    pub fn get_or_compile(&mut self, engine: &Engine, source: &str) -> Result<CompiledSnippet, ScriptError> {
        if let Some(snippet) = self.cache.get(source) {
            return Ok(snippet.clone());
        }

        let normalized = normalize_source(source)?;
        let ast = engine
            .compile(&normalized.text)
            .map_err(|e| ScriptError::Compile(e.to_string()))?;

        let snippet = CompiledSnippet {
            ast: Arc::new(ast),
            source: source.to_string(),
            reads_root: normalized.reads_root,
        };

        self.cache.insert(source.to_string(), snippet.clone());
        Ok(snippet)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Remove a specific snippet from the cache
    pub fn invalidate(&mut self, source: &str) {
        self.cache.remove(source);
    }
}

/// Thread-safe script cache wrapper
pub type SharedScriptCache = Arc<RwLock<ScriptCache>>;

/// Create a new shared script cache
pub fn create_shared_cache() -> SharedScriptCache {
    Arc::new(RwLock::new(ScriptCache::new()))
}
