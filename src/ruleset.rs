//! Declarative rulesets.
//!
//! A ruleset document describes macros, reusable fragments and per-field
//! rule chains in JSON. Loading parses every step up front; composing runs
//! the steps against fresh builders and flattens them.
//!
//! ```json
//! {
//!   "macros": {
//!     "money": ["numeric", { "min": ["$0"] }]
//!   },
//!   "fragments": {
//!     "contact": ["required", "email"]
//!   },
//!   "fields": {
//!     "email": [{ "with": "contact" }, { "max": 255 }],
//!     "price": [{ "money": [0] }, { "when": { "if": true, "then": "required", "else": "nullable" } }]
//!   }
//! }
//! ```
//!
//! # Steps
//!
//! | Step | Effect |
//! |------|--------|
//! | `"max:10"` | Append a literal |
//! | `{ "rule": ... }` | A literal, a list of literals, or `{ "schema": {...} }` |
//! | `{ "when": { "if", "then", "else" } }` | Conditional; branches are a literal, a list, or `{ "steps": [...] }` |
//! | `{ "unless": ... }` | Same shape as `when`, inverted |
//! | `{ "with": "name" }` / `{ "with": { "invoke": [...] } }` | Apply a fragment |
//! | `{ "<method>": [args] }` | Call a built-in or macro |
//!
//! Inside a macro body (and in fragments it applies), a call argument written
//! as `"$0"`, `"$1"`, ... is replaced by the macro's positional argument,
//! including inside nested arrays. Placeholders without a matching argument
//! are dropped. Write `"$$0"` for a literal `"$0"`. Field steps are never
//! substituted.
//!
//! A macro may not reach itself through other macros or fragments; such a
//! document is rejected with `RulesetError::MacroCycle`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::branch::Branch;
use crate::builder::RuleBuilder;
use crate::directive::json_type_name;
use crate::error::{RuleError, RulesetError};
use crate::flatten::FlatRule;
use crate::fragment::{fragment_shape, Fragment, FragmentShape, Invoke};
use crate::loader::{load_document, load_document_str};
use crate::registry::MacroRegistry;
use crate::validator::{Rule, SchemaRule};
use crate::vocabulary::Builtin;

/// Top-level sections of a ruleset document.
pub const SECTIONS: &[&str] = &["macros", "fragments", "fields"];

/// A parsed ruleset, ready to compose.
#[derive(Debug)]
pub struct Ruleset {
    registry: Arc<MacroRegistry>,
    fields: Vec<(String, Vec<Step>)>,
}

/// The flattened rules for one field.
#[derive(Debug, Clone, Serialize)]
pub struct ComposedField {
    pub field: String,
    pub rules: Vec<FlatRule>,
}

#[derive(Debug)]
enum Step {
    Literal(String),
    Literals(Vec<String>),
    Opaque(Arc<dyn Rule>),
    Call {
        method: String,
        args: Vec<Value>,
    },
    When {
        condition: bool,
        on_true: Option<BranchDef>,
        on_false: Option<BranchDef>,
    },
    WithNamed(Arc<Vec<Step>>),
    WithInvoke(Vec<Step>),
}

#[derive(Debug)]
enum BranchDef {
    Literal(String),
    Literals(Vec<String>),
    Steps(Vec<Step>),
}

type Fragments = HashMap<String, Arc<Vec<Step>>>;

impl Ruleset {
    /// Parse a ruleset document, registering its macros on a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns `RulesetError` if the document is malformed, references an
    /// unknown fragment, or defines a macro with a reserved name or one that
    /// reaches itself.
    pub fn from_value(doc: &Value) -> Result<Self, RulesetError> {
        Self::with_registry(doc, Arc::new(MacroRegistry::new()))
    }

    /// Parse a ruleset document, registering its macros on `registry`.
    ///
    /// Macros already present on `registry` are callable from the document.
    pub fn with_registry(doc: &Value, registry: Arc<MacroRegistry>) -> Result<Self, RulesetError> {
        let root = doc.as_object().ok_or_else(|| {
            RulesetError::invalid_step(
                "",
                format!("expected object, got {}", json_type_name(doc)),
            )
        })?;

        if let Some(key) = root.keys().find(|k| !SECTIONS.contains(&k.as_str())) {
            return Err(RulesetError::invalid_step(
                &format!("/{}", escape_pointer(key)),
                "unknown section: expected macros, fragments, or fields",
            ));
        }

        // Fragments may reference fragments declared before them.
        let mut fragments = Fragments::new();
        for (name, steps) in section(root, "fragments")?.into_iter().flatten() {
            let path = format!("/fragments/{}", escape_pointer(name));
            let parsed = parse_steps(steps, &path, &fragments)?;
            fragments.insert(name.clone(), Arc::new(parsed));
        }

        let mut macros = Vec::new();
        for (name, steps) in section(root, "macros")?.into_iter().flatten() {
            let path = format!("/macros/{}", escape_pointer(name));
            let body = parse_steps(steps, &path, &fragments)?;
            macros.push((name.as_str(), path, Arc::new(body)));
        }

        // Checked before anything is registered, so a rejected document
        // leaves the registry untouched.
        if let Some(chain) = find_macro_cycle(&macros) {
            return Err(RulesetError::MacroCycle {
                path: format!("/macros/{}", escape_pointer(&chain[0])),
                chain,
            });
        }

        for (name, path, body) in macros {
            registry
                .register(name, move |rules: &mut RuleBuilder, args: &[Value]| {
                    apply(&body, rules, Some(args))
                })
                .map_err(|source| RulesetError::Rule { path, source })?;
        }

        let mut fields = Vec::new();
        for (name, steps) in section(root, "fields")?.into_iter().flatten() {
            let path = format!("/fields/{}", escape_pointer(name));
            fields.push((name.clone(), parse_steps(steps, &path, &fragments)?));
        }

        tracing::debug!(
            fields = fields.len(),
            fragments = fragments.len(),
            macros = registry.len(),
            "parsed ruleset"
        );
        Ok(Self { registry, fields })
    }

    /// Parse a ruleset from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, RulesetError> {
        Self::from_value(&load_document_str(content)?)
    }

    /// Load and parse a ruleset file.
    pub fn from_file(path: &Path) -> Result<Self, RulesetError> {
        Self::from_value(&load_document(path)?)
    }

    pub fn registry(&self) -> &Arc<MacroRegistry> {
        &self.registry
    }

    /// Field names in document order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Run one field's steps against a fresh builder.
    ///
    /// # Errors
    ///
    /// Returns `RulesetError::UnknownField` if the field isn't defined, or
    /// `RulesetError::Rule` if a step fails (e.g. calls an unknown method).
    pub fn builder(&self, field: &str) -> Result<RuleBuilder, RulesetError> {
        let steps = self
            .fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, steps)| steps)
            .ok_or_else(|| RulesetError::UnknownField {
                field: field.to_string(),
            })?;

        let mut rules = RuleBuilder::using(Arc::clone(&self.registry));
        apply(steps, &mut rules, None).map_err(|source| RulesetError::Rule {
            path: format!("/fields/{}", escape_pointer(field)),
            source,
        })?;
        Ok(rules)
    }

    /// Compose and flatten one field.
    pub fn compose_field(&self, field: &str) -> Result<ComposedField, RulesetError> {
        let rules = self.builder(field)?;
        Ok(ComposedField {
            field: field.to_string(),
            rules: rules.flatten(),
        })
    }

    /// Compose and flatten every field, in document order.
    pub fn compose(&self) -> Result<Vec<ComposedField>, RulesetError> {
        self.field_names()
            .map(|field| self.compose_field(field))
            .collect()
    }
}

impl ComposedField {
    /// The rule list as a JSON array; opaque rules use their `describe` form.
    pub fn to_json(&self) -> Value {
        self.rules
            .iter()
            .map(|rule| match rule {
                FlatRule::Text(s) => Value::String(s.clone()),
                FlatRule::Object(rule) => rule.describe(),
            })
            .collect()
    }
}

/// Render composed fields as a JSON object of field name to rule list.
pub fn composed_to_json(composed: &[ComposedField]) -> Value {
    let map: Map<String, Value> = composed
        .iter()
        .map(|c| (c.field.clone(), c.to_json()))
        .collect();
    Value::Object(map)
}

// --- Parsing ---

fn section<'v>(
    root: &'v Map<String, Value>,
    key: &str,
) -> Result<Option<&'v Map<String, Value>>, RulesetError> {
    match root.get(key) {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(RulesetError::invalid_step(
            &format!("/{}", key),
            format!("expected object, got {}", json_type_name(other)),
        )),
    }
}

fn parse_steps(value: &Value, path: &str, fragments: &Fragments) -> Result<Vec<Step>, RulesetError> {
    let Value::Array(items) = value else {
        return Err(RulesetError::invalid_step(
            path,
            format!("expected array of steps, got {}", json_type_name(value)),
        ));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_step(item, &format!("{}/{}", path, i), fragments))
        .collect()
}

fn parse_step(value: &Value, path: &str, fragments: &Fragments) -> Result<Step, RulesetError> {
    let entry = match value {
        Value::String(s) => return Ok(Step::Literal(s.clone())),
        Value::Object(map) if map.len() == 1 => map.iter().next(),
        _ => None,
    };
    let Some((key, arg)) = entry else {
        return Err(RulesetError::invalid_step(
            path,
            format!(
                "expected string or single-key object, got {}",
                json_type_name(value)
            ),
        ));
    };

    let child_path = format!("{}/{}", path, escape_pointer(key));
    match key.as_str() {
        "rule" => parse_rule(arg, &child_path),
        "when" => parse_conditional(arg, &child_path, fragments, false),
        "unless" => parse_conditional(arg, &child_path, fragments, true),
        "with" => parse_with(arg, &child_path, fragments),
        method => {
            let args = match arg {
                Value::Array(items) => items.clone(),
                Value::Null => Vec::new(),
                scalar => vec![scalar.clone()],
            };
            Ok(Step::Call {
                method: method.to_string(),
                args,
            })
        }
    }
}

fn parse_rule(value: &Value, path: &str) -> Result<Step, RulesetError> {
    match value {
        Value::String(s) => Ok(Step::Literal(s.clone())),
        Value::Array(_) => Ok(Step::Literals(parse_literals(value, path)?)),
        Value::Object(map) => {
            let schema = map
                .get("schema")
                .filter(|_| map.len() == 1)
                .ok_or_else(|| RulesetError::invalid_step(path, "expected { \"schema\": ... }"))?;
            let rule = SchemaRule::new(schema.clone()).map_err(|e| RulesetError::InvalidSchema {
                path: format!("{}/schema", path),
                message: e.to_string(),
            })?;
            Ok(Step::Opaque(Arc::new(rule)))
        }
        other => Err(RulesetError::invalid_step(
            path,
            format!(
                "expected string, array, or schema object, got {}",
                json_type_name(other)
            ),
        )),
    }
}

fn parse_literals(value: &Value, path: &str) -> Result<Vec<String>, RulesetError> {
    let Value::Array(items) = value else {
        return Err(RulesetError::invalid_step(path, "expected array of strings"));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str().map(String::from).ok_or_else(|| {
                RulesetError::invalid_step(
                    &format!("{}/{}", path, i),
                    format!("expected string, got {}", json_type_name(item)),
                )
            })
        })
        .collect()
}

fn parse_conditional(
    value: &Value,
    path: &str,
    fragments: &Fragments,
    negate: bool,
) -> Result<Step, RulesetError> {
    let map = value.as_object().ok_or_else(|| {
        RulesetError::invalid_step(
            path,
            format!("expected object, got {}", json_type_name(value)),
        )
    })?;

    if let Some(key) = map.keys().find(|k| !matches!(k.as_str(), "if" | "then" | "else")) {
        return Err(RulesetError::invalid_step(
            path,
            format!("unexpected key '{}': expected if, then, or else", key),
        ));
    }

    let condition = match map.get("if") {
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(RulesetError::invalid_step(
                &format!("{}/if", path),
                format!("expected boolean, got {}", json_type_name(other)),
            ))
        }
        None => return Err(RulesetError::invalid_step(path, "missing 'if' condition")),
    };

    let branch = |key: &str| -> Result<Option<BranchDef>, RulesetError> {
        map.get(key)
            .map(|v| parse_branch(v, &format!("{}/{}", path, key), fragments))
            .transpose()
    };

    Ok(Step::When {
        condition: condition != negate,
        on_true: branch("then")?,
        on_false: branch("else")?,
    })
}

fn parse_branch(value: &Value, path: &str, fragments: &Fragments) -> Result<BranchDef, RulesetError> {
    match value {
        Value::String(s) => Ok(BranchDef::Literal(s.clone())),
        Value::Array(_) => Ok(BranchDef::Literals(parse_literals(value, path)?)),
        Value::Object(map) if map.len() == 1 && map.contains_key("steps") => {
            let steps_path = format!("{}/steps", path);
            Ok(BranchDef::Steps(parse_steps(&map["steps"], &steps_path, fragments)?))
        }
        other => Err(RulesetError::invalid_step(
            path,
            format!(
                "expected string, array, or {{ \"steps\": [...] }}, got {}",
                json_type_name(other)
            ),
        )),
    }
}

fn parse_with(value: &Value, path: &str, fragments: &Fragments) -> Result<Step, RulesetError> {
    let shape = fragment_shape(value).map_err(|source| RulesetError::Rule {
        path: path.to_string(),
        source,
    })?;

    match shape {
        FragmentShape::Named(name) => fragments
            .get(name)
            .map(|steps| Step::WithNamed(Arc::clone(steps)))
            .ok_or_else(|| RulesetError::UnknownFragment {
                path: path.to_string(),
                name: name.to_string(),
            }),
        FragmentShape::Invoke(steps) => Ok(Step::WithInvoke(parse_steps(
            steps,
            &format!("{}/invoke", path),
            fragments,
        )?)),
    }
}

/// Escape a key for use as a JSON Pointer segment (~ becomes ~0, / becomes ~1).
pub(crate) fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

// --- Macro cycles ---

#[derive(Debug, Clone, Copy, PartialEq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Names along the first cycle found, with the first name repeated at the end.
fn find_macro_cycle(macros: &[(&str, String, Arc<Vec<Step>>)]) -> Option<Vec<String>> {
    let index: HashMap<&str, usize> = macros
        .iter()
        .enumerate()
        .map(|(i, (name, ..))| (*name, i))
        .collect();

    // Built-in names always dispatch to the built-in, never to a macro.
    let edges: Vec<Vec<usize>> = macros
        .iter()
        .map(|(_, _, body)| {
            let mut callees = Vec::new();
            collect_calls(body, &mut callees);
            callees
                .into_iter()
                .filter(|callee| Builtin::parse(callee).is_none())
                .filter_map(|callee| index.get(callee).copied())
                .collect()
        })
        .collect();

    let mut state = vec![Visit::New; macros.len()];
    let mut stack = Vec::new();
    (0..macros.len())
        .find_map(|node| visit(node, &edges, &mut state, &mut stack))
        .map(|cycle| cycle.into_iter().map(|i| macros[i].0.to_string()).collect())
}

fn visit(
    node: usize,
    edges: &[Vec<usize>],
    state: &mut [Visit],
    stack: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    match state[node] {
        Visit::Done => return None,
        Visit::Active => {
            let start = stack.iter().position(|&n| n == node)?;
            let mut cycle = stack[start..].to_vec();
            cycle.push(node);
            return Some(cycle);
        }
        Visit::New => {}
    }

    state[node] = Visit::Active;
    stack.push(node);
    for &next in &edges[node] {
        if let Some(cycle) = visit(next, edges, state, stack) {
            return Some(cycle);
        }
    }
    stack.pop();
    state[node] = Visit::Done;
    None
}

/// Methods a step list can call. Conditions are constants, so only the
/// branch that will be taken is followed.
fn collect_calls<'s>(steps: &'s [Step], out: &mut Vec<&'s str>) {
    for step in steps {
        match step {
            Step::Call { method, .. } => out.push(method),
            Step::When {
                condition,
                on_true,
                on_false,
            } => {
                let taken = if *condition { on_true } else { on_false };
                if let Some(BranchDef::Steps(branch)) = taken {
                    collect_calls(branch, out);
                }
            }
            Step::WithNamed(fragment) => collect_calls(fragment, out),
            Step::WithInvoke(inline) => collect_calls(inline, out),
            Step::Literal(_) | Step::Literals(_) | Step::Opaque(_) => {}
        }
    }
}

// --- Execution ---

/// Macro arguments, or `None` outside any macro body.
type Args<'s> = Option<&'s [Value]>;

struct InlineFragment<'s> {
    steps: &'s [Step],
    args: Args<'s>,
}

impl Invoke for InlineFragment<'_> {
    fn invoke(&self, rules: &mut RuleBuilder) -> Result<(), RuleError> {
        apply(self.steps, rules, self.args)
    }
}

fn apply(steps: &[Step], rules: &mut RuleBuilder, args: Args<'_>) -> Result<(), RuleError> {
    for step in steps {
        match step {
            Step::Literal(s) => {
                rules.rule(s.as_str());
            }
            Step::Literals(values) => {
                rules.rule(values.clone());
            }
            Step::Opaque(rule) => {
                rules.rule(Arc::clone(rule));
            }
            Step::Call {
                method,
                args: call_args,
            } => {
                rules.call(method, &substitute(call_args, args))?;
            }
            Step::When {
                condition,
                on_true,
                on_false,
            } => {
                // Only the selected branch is built.
                let (on_true, on_false) = if *condition {
                    (to_branch(on_true.as_ref(), rules, args)?, Branch::Empty)
                } else {
                    (Branch::Empty, to_branch(on_false.as_ref(), rules, args)?)
                };
                rules.when(*condition, on_true, on_false);
            }
            Step::WithNamed(fragment) => {
                rules.with(Fragment::try_unary(|r: &mut RuleBuilder| {
                    apply(fragment, r, args)
                }))?;
            }
            Step::WithInvoke(inline) => {
                rules.with(Fragment::object(InlineFragment {
                    steps: inline,
                    args,
                }))?;
            }
        }
    }
    Ok(())
}

fn to_branch(
    def: Option<&BranchDef>,
    parent: &RuleBuilder,
    args: Args<'_>,
) -> Result<Branch<'static>, RuleError> {
    Ok(match def {
        None => Branch::Empty,
        Some(BranchDef::Literal(s)) => Branch::Literal(s.clone()),
        Some(BranchDef::Literals(values)) => Branch::Literals(values.clone()),
        Some(BranchDef::Steps(steps)) => {
            let mut branch = RuleBuilder::using(Arc::clone(parent.registry()));
            apply(steps, &mut branch, args)?;
            Branch::Builder(branch)
        }
    })
}

fn substitute(call_args: &[Value], args: Args<'_>) -> Vec<Value> {
    match args {
        None => call_args.to_vec(),
        Some(args) => call_args
            .iter()
            .filter_map(|value| substitute_value(value, args))
            .collect(),
    }
}

fn substitute_value(value: &Value, args: &[Value]) -> Option<Value> {
    match value {
        Value::String(s) => {
            let escaped = s
                .strip_prefix('$')
                .filter(|rest| placeholder_index(rest).is_some());
            if let Some(escaped) = escaped {
                Some(Value::String(escaped.to_string()))
            } else if let Some(i) = placeholder_index(s) {
                args.get(i).cloned()
            } else {
                Some(value.clone())
            }
        }
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .filter_map(|item| substitute_value(item, args))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}

/// `"$N"` with N all ASCII digits.
fn placeholder_index(s: &str) -> Option<usize> {
    let digits = s.strip_prefix('$')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compose(doc: Value) -> Value {
        let ruleset = Ruleset::from_value(&doc).unwrap();
        composed_to_json(&ruleset.compose().unwrap())
    }

    #[test]
    fn literals_and_calls() {
        let out = compose(json!({
            "fields": {
                "name": ["required", { "string": null }, { "max": 255 }],
                "age": [{ "between": [18, 99] }, { "rule": ["integer", "nullable"] }]
            }
        }));
        assert_eq!(
            out,
            json!({
                "name": ["required", "string", "max:255"],
                "age": ["between:18,99", "integer", "nullable"]
            })
        );
    }

    #[test]
    fn field_order_is_preserved() {
        let ruleset = Ruleset::from_value(&json!({
            "fields": { "zeta": [], "alpha": [], "mid": [] }
        }))
        .unwrap();
        let names: Vec<&str> = ruleset.field_names().collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn macros_substitute_arguments() {
        let out = compose(json!({
            "macros": {
                "money": ["numeric", { "min": ["$0"] }, { "max": ["$1"] }]
            },
            "fields": {
                "price": [{ "money": [0, 1000] }],
                "tip": [{ "money": [1] }]
            }
        }));
        assert_eq!(
            out,
            json!({
                "price": ["numeric", "min:0", "max:1000"],
                "tip": ["numeric", "min:1", "max"]
            })
        );
    }

    #[test]
    fn placeholders_nest_and_escape() {
        let out = compose(json!({
            "macros": {
                "choice": [{ "in": [["$0", "$1"]] }, { "starts_with": ["$$0"] }]
            },
            "fields": {
                "status": [{ "choice": ["draft", "live"] }]
            }
        }));
        assert_eq!(out, json!({ "status": ["in:draft,live", "starts_with:$0"] }));
    }

    #[test]
    fn field_arguments_are_never_substituted() {
        let out = compose(json!({
            "fields": {
                "price": [{ "starts_with": ["$0"] }, { "ends_with": ["$$1"] }]
            }
        }));
        assert_eq!(out, json!({ "price": ["starts_with:$0", "ends_with:$$1"] }));
    }

    #[test]
    fn self_calling_macro_is_rejected() {
        let err = Ruleset::from_value(&json!({
            "macros": { "loop": [{ "loop": [] }] },
            "fields": { "a": [{ "loop": [] }] }
        }))
        .unwrap_err();
        match err {
            RulesetError::MacroCycle { path, chain } => {
                assert_eq!(path, "/macros/loop");
                assert_eq!(chain, ["loop", "loop"]);
            }
            other => panic!("expected macro cycle, got {other:?}"),
        }
    }

    #[test]
    fn indirect_macro_cycle_through_fragment_is_rejected() {
        let registry = Arc::new(MacroRegistry::new());
        let err = Ruleset::with_registry(
            &json!({
                "fragments": { "shared": [{ "pong": [] }] },
                "macros": {
                    "ping": ["string", { "with": "shared" }],
                    "pong": [{ "when": { "if": true, "then": { "steps": [{ "ping": [] }] } } }]
                }
            }),
            Arc::clone(&registry),
        )
        .unwrap_err();
        assert!(
            matches!(err, RulesetError::MacroCycle { ref chain, .. } if chain == &["ping", "pong", "ping"])
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn untaken_branch_does_not_form_a_cycle() {
        let out = compose(json!({
            "macros": {
                "nested": ["array", { "when": { "if": false, "then": { "steps": [{ "nested": [] }] } } }]
            },
            "fields": { "tree": [{ "nested": [] }] }
        }));
        assert_eq!(out, json!({ "tree": ["array"] }));
    }

    #[test]
    fn macro_named_after_builtin_call_is_not_a_cycle() {
        let err = Ruleset::from_value(&json!({
            "macros": { "required": [{ "required": [] }] }
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            RulesetError::Rule {
                source: RuleError::InvalidMacroName { .. },
                ..
            }
        ));
    }

    #[test]
    fn when_and_unless() {
        let out = compose(json!({
            "fields": {
                "a": [{ "when": { "if": true, "then": "required", "else": "sometimes" } }, "string"],
                "b": [{ "when": { "if": false, "then": "required" } }, "string"],
                "c": [{ "unless": { "if": false, "then": ["nullable", "integer"] } }],
                "d": [{ "when": { "if": false, "else": { "steps": [{ "min": 2 }] } } }]
            }
        }));
        assert_eq!(
            out,
            json!({
                "a": ["required", "string"],
                "b": ["string"],
                "c": ["nullable", "integer"],
                "d": ["min:2"]
            })
        );
    }

    #[test]
    fn untaken_branch_errors_are_never_raised() {
        let out = compose(json!({
            "fields": {
                "a": [{ "when": {
                    "if": true,
                    "then": "required",
                    "else": { "steps": [{ "doesNotExist": [] }] }
                } }]
            }
        }));
        assert_eq!(out, json!({ "a": ["required"] }));
    }

    #[test]
    fn named_and_inline_fragments() {
        let out = compose(json!({
            "fragments": {
                "contact": ["required", "email"],
                "work_contact": [{ "with": "contact" }, { "ends_with": ["@example.com"] }]
            },
            "fields": {
                "email": [{ "with": "work_contact" }],
                "slug": [{ "with": { "invoke": ["alpha_dash", { "max": 40 }] } }]
            }
        }));
        assert_eq!(
            out,
            json!({
                "email": ["required", "email", "ends_with:@example.com"],
                "slug": ["alpha_dash", "max:40"]
            })
        );
    }

    #[test]
    fn schema_rule_step() {
        let out = compose(json!({
            "fields": {
                "meta": ["array", { "rule": { "schema": { "type": "object" } } }]
            }
        }));
        assert_eq!(out, json!({ "meta": ["array", { "schema": { "type": "object" } }] }));
    }

    #[test]
    fn unknown_method_fails_compose() {
        let ruleset = Ruleset::from_value(&json!({
            "fields": { "name": ["required", { "doesNotExist": [] }] }
        }))
        .unwrap();
        let err = ruleset.compose().unwrap_err();
        match err {
            RulesetError::Rule { path, source } => {
                assert_eq!(path, "/fields/name");
                assert!(matches!(source, RuleError::UnknownMethod { method } if method == "doesNotExist"));
            }
            other => panic!("expected rule error, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_fragment_shape() {
        let err = Ruleset::from_value(&json!({
            "fields": { "name": [{ "with": 42 }] }
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            RulesetError::Rule {
                source: RuleError::UnsupportedFragmentShape { .. },
                ..
            }
        ));
    }

    #[test]
    fn unknown_fragment() {
        let err = Ruleset::from_value(&json!({
            "fields": { "name": [{ "with": "missing" }] }
        }))
        .unwrap_err();
        assert!(matches!(err, RulesetError::UnknownFragment { ref name, .. } if name == "missing"));
    }

    #[test]
    fn fragments_must_be_declared_before_use() {
        let err = Ruleset::from_value(&json!({
            "fragments": {
                "outer": [{ "with": "inner" }],
                "inner": ["required"]
            }
        }))
        .unwrap_err();
        assert!(matches!(err, RulesetError::UnknownFragment { .. }));
    }

    #[test]
    fn reserved_macro_name() {
        let err = Ruleset::from_value(&json!({
            "macros": { "required": ["string"] }
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            RulesetError::Rule {
                source: RuleError::InvalidMacroName { .. },
                ..
            }
        ));
    }

    #[test]
    fn invalid_steps() {
        let cases = [
            json!({ "fields": { "a": "required" } }),
            json!({ "fields": { "a": [42] } }),
            json!({ "fields": { "a": [{ "min": 1, "max": 2 }] } }),
            json!({ "fields": { "a": [{ "when": { "if": "yes" } }] } }),
            json!({ "fields": { "a": [{ "when": { "then": "required" } }] } }),
            json!({ "fields": { "a": [{ "rule": ["ok", 1] }] } }),
            json!({ "fields": [] }),
            json!({ "rules": {} }),
        ];
        for doc in cases {
            assert!(
                matches!(Ruleset::from_value(&doc), Err(RulesetError::InvalidStep { .. })),
                "{doc} should be rejected"
            );
        }
    }

    #[test]
    fn invalid_schema_rule() {
        let err = Ruleset::from_value(&json!({
            "fields": { "a": [{ "rule": { "schema": { "type": 5 } } }] }
        }))
        .unwrap_err();
        assert!(matches!(err, RulesetError::InvalidSchema { .. }));
    }

    #[test]
    fn shared_registry_macros_are_callable() {
        let registry = Arc::new(MacroRegistry::new());
        registry
            .register("postcode", |rules: &mut RuleBuilder, _: &[Value]| {
                rules.string().regex("^[0-9]{5}$");
                Ok(())
            })
            .unwrap();

        let ruleset =
            Ruleset::with_registry(&json!({ "fields": { "zip": [{ "postcode": [] }] } }), registry)
                .unwrap();
        let composed = ruleset.compose_field("zip").unwrap();
        assert_eq!(composed.rules, ["string", "regex:^[0-9]{5}$"]);
    }

    #[test]
    fn unknown_field() {
        let ruleset = Ruleset::from_value(&json!({ "fields": {} })).unwrap();
        assert!(matches!(
            ruleset.builder("nope"),
            Err(RulesetError::UnknownField { .. })
        ));
    }

    #[test]
    fn escape_pointer_segments() {
        assert_eq!(escape_pointer("a/b~c"), "a~1b~0c");
    }
}
