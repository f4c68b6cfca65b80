//! Rhai Script Engine Implementation
//!
//! This module provides the sandboxed engine that runs every snippet.
//!
//! ## Tree Access
//!
//! `get(path)` reads from a copy of the tree held in the shared
//! [`ScriptContext`]. The evaluator loads the tree before a phase, pushes
//! every value it writes with [`ScriptEngine::update_value`], and unloads it
//! afterwards.
//!
//! ## Resource Guard
//!
//! Each run is bounded by the operation budget (`max_operations`) and by a
//! wall-clock deadline (`timeout_ms`) checked from the progress callback.
//! Either limit aborts the run with [`ScriptError::Runaway`] or
//! [`ScriptError::Timeout`].

use crate::config::ScriptLimits;
use crate::scripting::{CompiledSnippet, ScriptError, SharedScriptCache};
use crate::tree::{PropNode, PropTree};
use crate::types::PropValue;
use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, Position, Scope, FLOAT, INT};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Progress callback interval, in operations
const DEADLINE_CHECK_INTERVAL: u64 = 64;

/// Log target for script output
const SCRIPT_LOG_TARGET: &str = "user_props::script";

/// Shared state read by registered functions while a snippet runs
#[derive(Debug, Clone, Default)]
pub struct ScriptContext {
    /// Tree visible through `get()` and `root`
    tree: Option<PropTree>,
    /// Deadline of the run in progress
    deadline: Option<Instant>,
}

impl ScriptContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, tree: &PropTree) {
        self.tree = Some(tree.clone());
    }

    pub fn unload(&mut self) {
        self.tree = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.tree.is_some()
    }

    /// Mirror a value written to the real tree
    pub fn update_value(&mut self, path: &str, value: PropValue) {
        if let Some(tree) = &mut self.tree {
            let _ = tree.set_primitive(path, value);
        }
    }

    /// Value of `path` as seen by `get()`
    pub fn lookup(&self, path: &str) -> Dynamic {
        self.tree
            .as_ref()
            .and_then(|tree| tree.get(path))
            .map(node_to_dynamic)
            .unwrap_or(Dynamic::UNIT)
    }

    /// The whole tree as a map
    pub fn root(&self) -> Dynamic {
        self.tree
            .as_ref()
            .map(|tree| node_to_dynamic(tree.root()))
            .unwrap_or(Dynamic::UNIT)
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Thread-safe shared script context
pub type SharedScriptContext = Arc<RwLock<ScriptContext>>;

/// Variables bound into the scope of one run
#[derive(Debug, Clone, Default)]
pub struct ScriptBindings {
    vars: Vec<(String, Dynamic)>,
}

impl ScriptBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a raw Rhai value
    pub fn with(mut self, name: &str, value: Dynamic) -> Self {
        self.vars.push((name.to_string(), value));
        self
    }

    /// Bind `name` to a property value, or `()` when absent
    pub fn with_value(self, name: &str, value: Option<&PropValue>) -> Self {
        let value = value.map(prop_to_dynamic).unwrap_or(Dynamic::UNIT);
        self.with(name, value)
    }

    /// Bind the owning node's `path`
    pub fn with_path(self, path: &str) -> Self {
        self.with("path", Dynamic::from(path.to_string()))
    }
}

/// Convert a property value into a Rhai value
pub fn prop_to_dynamic(value: &PropValue) -> Dynamic {
    match value {
        PropValue::String(s) => Dynamic::from(s.clone()),
        PropValue::Number(n) => Dynamic::from_float(*n),
        PropValue::Boolean(b) => Dynamic::from_bool(*b),
    }
}

fn node_to_dynamic(node: &PropNode) -> Dynamic {
    match node.value() {
        Some(value) => prop_to_dynamic(&value),
        None => rhai::serde::to_dynamic(node.to_json()).unwrap_or(Dynamic::UNIT),
    }
}

/// Convert a script result into a property value.
///
/// Numbers and booleans keep their type, maps and arrays become JSON text,
/// everything else its string form. `()` yields `None`.
pub fn dynamic_to_prop(value: &Dynamic) -> Option<PropValue> {
    if value.is_unit() {
        return None;
    }
    if let Ok(f) = value.as_float() {
        return Some(PropValue::Number(f));
    }
    if let Ok(i) = value.as_int() {
        return Some(PropValue::Number(i as f64));
    }
    if let Ok(b) = value.as_bool() {
        return Some(PropValue::Boolean(b));
    }
    if value.is_map() || value.is_array() {
        if let Ok(json) = rhai::serde::from_dynamic::<serde_json::Value>(value) {
            return Some(PropValue::String(json.to_string()));
        }
    }
    Some(PropValue::String(value.to_string()))
}

/// Numeric view of a Rhai value for the lenient helper overloads
fn num(value: &Dynamic) -> FLOAT {
    if let Ok(f) = value.as_float() {
        f
    } else if let Ok(i) = value.as_int() {
        i as FLOAT
    } else if let Ok(b) = value.as_bool() {
        if b {
            1.0
        } else {
            0.0
        }
    } else if value.is_string() {
        crate::types::parse_number(&value.to_string()).unwrap_or(FLOAT::NAN)
    } else {
        FLOAT::NAN
    }
}

/// Checked INT result, or the FLOAT fallback on overflow
fn widen(checked: Option<INT>, fallback: impl FnOnce() -> FLOAT) -> Dynamic {
    match checked {
        Some(i) => Dynamic::from_int(i),
        None => Dynamic::from_float(fallback()),
    }
}

fn is_blank(value: &Dynamic) -> bool {
    if value.is_unit() {
        return true;
    }
    if value.is_string() {
        return value.to_string().trim().is_empty();
    }
    if let Ok(f) = value.as_float() {
        return f.is_nan();
    }
    if let Some(array) = value.read_lock::<rhai::Array>() {
        return array.is_empty();
    }
    if let Some(map) = value.read_lock::<rhai::Map>() {
        return map.is_empty();
    }
    false
}

/// The sandboxed engine shared by expressions, validation rules and watchers
pub struct ScriptEngine {
    /// The Rhai engine instance
    engine: Engine,
    /// Cache of compiled snippets
    cache: SharedScriptCache,
    /// Shared context for tree access and the deadline
    context: SharedScriptContext,
    limits: ScriptLimits,
}

impl ScriptEngine {
    /// Create a new script engine with default limits
    pub fn new() -> Self {
        Self::with_limits(ScriptLimits::default())
    }

    /// Create a new script engine with the given limits
    pub fn with_limits(limits: ScriptLimits) -> Self {
        Self::with_cache(limits, crate::scripting::create_shared_cache())
    }

    /// Create a new script engine with a shared cache
    pub fn with_cache(limits: ScriptLimits, cache: SharedScriptCache) -> Self {
        let context = Arc::new(RwLock::new(ScriptContext::new()));
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine, context.clone(), &limits);

        Self {
            engine,
            cache,
            context,
            limits,
        }
    }

    /// Configure the Rhai engine with built-in functions and safety limits
    fn configure_engine(engine: &mut Engine, context: SharedScriptContext, limits: &ScriptLimits) {
        // Set safety limits
        engine.set_max_expr_depths(limits.max_expr_depth, limits.max_expr_depth);
        engine.set_max_call_levels(limits.max_call_levels);
        engine.set_max_operations(limits.max_operations);
        engine.set_max_string_size(limits.max_string_size);
        engine.set_max_array_size(limits.max_array_size);
        engine.set_max_map_size(limits.max_map_size);
        engine.disable_symbol("eval");

        // Built-in INT operators must be overridable for the number model below
        engine.set_fast_operators(false);

        {
            let ctx = context.clone();
            engine.on_progress(move |ops| {
                if ops % DEADLINE_CHECK_INTERVAL != 0 {
                    return None;
                }
                let expired = ctx.read().map(|c| c.expired()).unwrap_or(false);
                expired.then(|| Dynamic::from("deadline".to_string()))
            });
        }

        // Script output goes to the structured log
        engine.on_print(|text| info!(target: SCRIPT_LOG_TARGET, "{}", text));
        engine.on_debug(|text, source, pos: Position| {
            debug!(target: SCRIPT_LOG_TARGET, source = source.unwrap_or(""), %pos, "{}", text)
        });
        engine.register_fn("log", |msg: Dynamic| {
            info!(target: SCRIPT_LOG_TARGET, "{}", msg);
        });

        // ===== Tree Access =====

        {
            let ctx = context.clone();
            engine.register_fn("get", move |path: ImmutableString| -> Dynamic {
                ctx.read()
                    .map(|c| c.lookup(path.as_str()))
                    .unwrap_or(Dynamic::UNIT)
            });
        }

        // ===== Integer Arithmetic =====
        // Property numbers are doubles: integer division yields a fraction and
        // overflow widens to FLOAT instead of raising an error.

        engine.register_fn("/", |a: INT, b: INT| a as FLOAT / b as FLOAT);
        engine.register_fn("%", |a: INT, b: INT| -> Dynamic {
            match a.checked_rem(b) {
                Some(r) => Dynamic::from_int(r),
                None => Dynamic::from_float(a as FLOAT % b as FLOAT),
            }
        });
        engine.register_fn("+", |a: INT, b: INT| widen(a.checked_add(b), || a as FLOAT + b as FLOAT));
        engine.register_fn("-", |a: INT, b: INT| widen(a.checked_sub(b), || a as FLOAT - b as FLOAT));
        engine.register_fn("*", |a: INT, b: INT| widen(a.checked_mul(b), || a as FLOAT * b as FLOAT));

        // ===== Mathematical Functions =====
        // FLOAT variants first, then Dynamic fallbacks so integers and
        // numeric strings are accepted as well.

        engine.register_fn("abs", |x: FLOAT| x.abs());
        engine.register_fn("abs", |x: Dynamic| num(&x).abs());
        engine.register_fn("sqrt", |x: Dynamic| num(&x).sqrt());
        engine.register_fn("pow", |x: Dynamic, y: Dynamic| num(&x).powf(num(&y)));
        engine.register_fn("floor", |x: Dynamic| num(&x).floor());
        engine.register_fn("ceil", |x: Dynamic| num(&x).ceil());
        engine.register_fn("round", |x: Dynamic| num(&x).round());
        engine.register_fn("round_to", |x: Dynamic, digits: INT| {
            let factor = 10f64.powi(digits.clamp(0, 15) as i32);
            (num(&x) * factor).round() / factor
        });

        // Clamping and limiting
        engine.register_fn("clamp", |x: Dynamic, min: Dynamic, max: Dynamic| {
            let (lo, hi) = (num(&min), num(&max));
            num(&x).max(lo).min(hi)
        });
        engine.register_fn("min", |a: Dynamic, b: Dynamic| num(&a).min(num(&b)));
        engine.register_fn("max", |a: Dynamic, b: Dynamic| num(&a).max(num(&b)));

        engine.register_fn("pi", || std::f64::consts::PI);
        engine.register_fn("sign", |x: Dynamic| {
            let x = num(&x);
            if x > 0.0 {
                1.0
            } else if x < 0.0 {
                -1.0
            } else {
                0.0
            }
        });

        // Linear interpolation
        engine.register_fn("lerp", |a: Dynamic, b: Dynamic, t: Dynamic| {
            let (a, b) = (num(&a), num(&b));
            a + (b - a) * num(&t)
        });

        // Map value from one range to another
        engine.register_fn(
            "map_range",
            |x: Dynamic, in_min: Dynamic, in_max: Dynamic, out_min: Dynamic, out_max: Dynamic| {
                let (in_min, in_max) = (num(&in_min), num(&in_max));
                let (out_min, out_max) = (num(&out_min), num(&out_max));
                (num(&x) - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
            },
        );

        // ===== Conversions =====

        engine.register_fn("number", |x: Dynamic| num(&x));
        engine.register_fn("text", |x: Dynamic| -> String {
            match dynamic_to_prop(&x) {
                Some(value) => value.to_string(),
                None => String::new(),
            }
        });
        engine.register_fn("is_empty", |x: Dynamic| is_blank(&x));
        engine.register_fn("coalesce", |a: Dynamic, b: Dynamic| if is_blank(&a) { b } else { a });
    }

    /// Compile a snippet and cache it
    pub fn compile(&self, source: &str) -> Result<CompiledSnippet, ScriptError> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| ScriptError::Runtime(format!("Failed to acquire cache lock: {}", e)))?;

        cache.get_or_compile(&self.engine, source)
    }

    /// Run a compiled snippet with the given bindings
    pub fn execute(&self, snippet: &CompiledSnippet, bindings: &ScriptBindings) -> Result<Dynamic, ScriptError> {
        let mut scope = Scope::new();
        for (name, value) in &bindings.vars {
            scope.push_dynamic(name.as_str(), value.clone());
        }
        if snippet.reads_root() {
            let root = self.context.read().map(|c| c.root()).unwrap_or(Dynamic::UNIT);
            scope.push_dynamic("root", root);
        }

        self.set_deadline(Some(Instant::now() + Duration::from_millis(self.limits.timeout_ms)));
        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, snippet.ast());
        self.set_deadline(None);

        result.map_err(|e| self.classify(*e))
    }

    /// Compile and run a snippet in one step
    pub fn eval(&self, source: &str, bindings: &ScriptBindings) -> Result<Dynamic, ScriptError> {
        let snippet = self.compile(source)?;
        self.execute(&snippet, bindings)
    }

    /// Validate a snippet without executing it
    pub fn validate(&self, source: &str) -> Result<(), ScriptError> {
        self.compile(source).map(|_| ())
    }

    fn set_deadline(&self, deadline: Option<Instant>) {
        if let Ok(mut ctx) = self.context.write() {
            ctx.deadline = deadline;
        }
    }

    fn classify(&self, err: EvalAltResult) -> ScriptError {
        match err {
            EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => self.classify(*inner),
            EvalAltResult::ErrorTooManyOperations(_) => ScriptError::Runaway {
                ops: self.limits.max_operations,
            },
            EvalAltResult::ErrorTerminated(_, _) => ScriptError::Timeout {
                ms: self.limits.timeout_ms,
            },
            EvalAltResult::ErrorParsing(e, _) => ScriptError::Compile(e.to_string()),
            other => ScriptError::Runtime(other.to_string()),
        }
    }

    /// Make `tree` visible to `get()` and `root`
    pub fn load_tree(&self, tree: &PropTree) {
        if let Ok(mut ctx) = self.context.write() {
            ctx.load(tree);
        }
    }

    /// Mirror a value written to the loaded tree
    pub fn update_value(&self, path: &str, value: PropValue) {
        if let Ok(mut ctx) = self.context.write() {
            ctx.update_value(path, value);
        }
    }

    /// Drop the loaded tree
    pub fn unload_tree(&self) {
        if let Ok(mut ctx) = self.context.write() {
            ctx.unload();
        }
    }

    /// Clear the script cache
    pub fn clear_cache(&self) -> Result<(), ScriptError> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| ScriptError::Runtime(format!("Failed to acquire cache lock: {}", e)))?;
        cache.clear();
        Ok(())
    }

    /// Get a reference to the underlying Rhai engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutable access for hosts registering extra functions
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Get a reference to the shared cache
    pub fn cache(&self) -> &SharedScriptCache {
        &self.cache
    }

    pub fn limits(&self) -> &ScriptLimits {
        &self.limits
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("cache_size", &self.cache.read().map(|c| c.len()).ok())
            .field("limits", &self.limits)
            .finish()
    }
}
