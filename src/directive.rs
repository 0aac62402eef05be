//! Internal representation of a single directive.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::validator::Rule;
use crate::vocabulary::Builtin;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A named directive with ordered parameters, e.g. `between:1,10`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    name: String,
    params: Vec<Value>,
}

impl Tag {
    /// Create a tag with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append one parameter.
    ///
    /// Array parameters expand into several rendered parameters, so
    /// `Tag::new("in").param(vec!["a", "b"])` renders as `in:a,b`.
    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// The built-in this tag corresponds to, if any.
    pub fn builtin(&self) -> Option<Builtin> {
        Builtin::parse(&self.name)
    }
}

impl From<Builtin> for Tag {
    fn from(builtin: Builtin) -> Self {
        Tag::new(builtin.as_str())
    }
}

/// One unit of a builder's accumulated state.
///
/// Only `Tag` is structured by the engine. `Literal` strings and `Opaque`
/// rules are carried through untouched.
#[derive(Clone)]
pub enum Directive {
    Tag(Tag),
    Literal(String),
    Opaque(Arc<dyn Rule>),
}

impl Directive {
    /// Wrap an external rule object.
    pub fn opaque(rule: impl Rule + 'static) -> Self {
        Directive::Opaque(Arc::new(rule))
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Tag(tag) => f.debug_tuple("Tag").field(tag).finish(),
            Directive::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Directive::Opaque(rule) => f.debug_tuple("Opaque").field(rule).finish(),
        }
    }
}

/// Opaque directives compare by identity, never by content.
impl PartialEq for Directive {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Directive::Tag(a), Directive::Tag(b)) => a == b,
            (Directive::Literal(a), Directive::Literal(b)) => a == b,
            (Directive::Opaque(a), Directive::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Tag> for Directive {
    fn from(tag: Tag) -> Self {
        Directive::Tag(tag)
    }
}

impl From<Builtin> for Directive {
    fn from(builtin: Builtin) -> Self {
        Directive::Tag(builtin.into())
    }
}

impl From<&str> for Directive {
    fn from(s: &str) -> Self {
        Directive::Literal(s.to_string())
    }
}

impl From<String> for Directive {
    fn from(s: String) -> Self {
        Directive::Literal(s)
    }
}

impl From<Arc<dyn Rule>> for Directive {
    fn from(rule: Arc<dyn Rule>) -> Self {
        Directive::Opaque(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Violation;
    use serde_json::json;

    #[derive(Debug)]
    struct AlwaysPasses;

    impl Rule for AlwaysPasses {
        fn validate(&self, _attribute: &str, _value: &Value) -> Result<(), Vec<Violation>> {
            Ok(())
        }
    }

    #[test]
    fn tag_collects_params_in_order() {
        let tag = Tag::new("between").param(1).param(10);
        assert_eq!(tag.name(), "between");
        assert_eq!(tag.params(), &[json!(1), json!(10)]);
        assert_eq!(tag.builtin(), Some(Builtin::Between));
    }

    #[test]
    fn custom_tag_has_no_builtin() {
        assert_eq!(Tag::new("postcode").builtin(), None);
    }

    #[test]
    fn opaque_equality_is_identity() {
        let rule: Arc<dyn Rule> = Arc::new(AlwaysPasses);
        let a = Directive::Opaque(rule.clone());
        let b = Directive::Opaque(rule);
        let c = Directive::opaque(AlwaysPasses);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn literal_and_tag_never_equal() {
        assert_ne!(Directive::from("required"), Directive::from(Builtin::Required));
    }

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!({"a": 1})), "object");
    }
}
