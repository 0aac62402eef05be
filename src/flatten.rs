//! Lowering a builder into its final directive list.
//!
//! Flattening is a pure, order-preserving walk. Tags are rendered to their
//! canonical `name:param1,param2` form, literals are passed through verbatim
//! and opaque rules come out as the very same object.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::builder::RuleBuilder;
use crate::directive::{Directive, Tag};
use crate::validator::Rule;

/// One entry of the final directive list handed to a validation executor.
#[derive(Clone)]
pub enum FlatRule {
    Text(String),
    Object(Arc<dyn Rule>),
}

impl FlatRule {
    /// The rendered string, or `None` for an opaque rule.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlatRule::Text(s) => Some(s),
            FlatRule::Object(_) => None,
        }
    }

    /// The opaque rule, or `None` for a string directive.
    pub fn as_rule(&self) -> Option<&Arc<dyn Rule>> {
        match self {
            FlatRule::Text(_) => None,
            FlatRule::Object(rule) => Some(rule),
        }
    }
}

impl fmt::Debug for FlatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlatRule::Text(s) => fmt::Debug::fmt(s, f),
            FlatRule::Object(rule) => f.debug_tuple("Object").field(rule).finish(),
        }
    }
}

impl fmt::Display for FlatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlatRule::Text(s) => f.write_str(s),
            FlatRule::Object(rule) => write!(f, "{}", rule.describe()),
        }
    }
}

impl PartialEq for FlatRule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FlatRule::Text(a), FlatRule::Text(b)) => a == b,
            (FlatRule::Object(a), FlatRule::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq<str> for FlatRule {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for FlatRule {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<String> for FlatRule {
    fn eq(&self, other: &String) -> bool {
        self.as_str() == Some(other.as_str())
    }
}

impl Serialize for FlatRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FlatRule::Text(s) => serializer.serialize_str(s),
            FlatRule::Object(rule) => rule.describe().serialize(serializer),
        }
    }
}

impl RuleBuilder {
    /// Lower the accumulated directives into the final list.
    ///
    /// Reading never mutates, so repeated calls give identical results.
    pub fn flatten(&self) -> Vec<FlatRule> {
        flatten(self)
    }
}

/// Lower `builder`'s directives into the final list, in insertion order.
pub fn flatten(builder: &RuleBuilder) -> Vec<FlatRule> {
    tracing::trace!(directives = builder.len(), "flattening rules");
    builder.directives().iter().map(lower).collect()
}

/// Render a tag as `name` or `name:param1,param2`.
pub fn render_tag(tag: &Tag) -> String {
    let mut params = Vec::new();
    for param in tag.params() {
        render_param(param, &mut params);
    }

    if params.is_empty() {
        tag.name().to_string()
    } else {
        format!("{}:{}", tag.name(), params.join(","))
    }
}

// --- Internal implementation ---

fn lower(directive: &Directive) -> FlatRule {
    match directive {
        Directive::Tag(tag) => FlatRule::Text(render_tag(tag)),
        Directive::Literal(s) => FlatRule::Text(s.clone()),
        Directive::Opaque(rule) => FlatRule::Object(Arc::clone(rule)),
    }
}

fn render_param(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => out.push(String::new()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Number(n) => out.push(n.to_string()),
        Value::String(s) => out.push(s.clone()),
        // Lists expand in place, so `in` with ["a", "b"] renders `in:a,b`
        Value::Array(items) => {
            for item in items {
                render_param(item, out);
            }
        }
        Value::Object(_) => out.push(value.to_string()),
    }
}
