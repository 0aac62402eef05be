//! Reusable chaining fragments: `with`.
//!
//! A fragment is one of three shapes: a closure taking no arguments that
//! works on a builder it captured itself, a closure taking the builder, or an
//! object implementing [`Invoke`]. Unlike `when` outcomes, fragments mutate
//! the builder they are given directly.

use serde_json::Value;

use crate::builder::RuleBuilder;
use crate::directive::json_type_name;
use crate::error::RuleError;

/// An object whose `invoke` method applies a fragment to a builder.
pub trait Invoke {
    fn invoke(&self, rules: &mut RuleBuilder) -> Result<(), RuleError>;
}

/// A fragment, tagged by shape.
pub enum Fragment<'a> {
    /// Runs on whatever it captured; the calling builder is not passed in.
    Nullary(Box<dyn FnOnce() + 'a>),
    Unary(Box<dyn FnOnce(&mut RuleBuilder) -> Result<(), RuleError> + 'a>),
    Object(Box<dyn Invoke + 'a>),
}

impl<'a> Fragment<'a> {
    pub fn nullary(f: impl FnOnce() + 'a) -> Self {
        Fragment::Nullary(Box::new(f))
    }

    pub fn unary(f: impl FnOnce(&mut RuleBuilder) + 'a) -> Self {
        Fragment::Unary(Box::new(move |rules: &mut RuleBuilder| {
            f(rules);
            Ok(())
        }))
    }

    /// A builder-taking fragment that may fail, e.g. because it calls a macro.
    pub fn try_unary(f: impl FnOnce(&mut RuleBuilder) -> Result<(), RuleError> + 'a) -> Self {
        Fragment::Unary(Box::new(f))
    }

    pub fn object(invocable: impl Invoke + 'a) -> Self {
        Fragment::Object(Box::new(invocable))
    }
}

impl<'a, F> From<F> for Fragment<'a>
where
    F: FnOnce(&mut RuleBuilder) + 'a,
{
    fn from(f: F) -> Self {
        Fragment::unary(f)
    }
}

/// How a dynamically supplied fragment value should be resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FragmentShape<'v> {
    /// A reference to a named, builder-taking fragment.
    Named(&'v str),
    /// An object carrying its steps under `invoke`.
    Invoke(&'v Value),
}

/// Classify a JSON fragment value.
///
/// # Errors
///
/// Returns `RuleError::UnsupportedFragmentShape` for anything other than a
/// string or an object with an `invoke` member.
pub fn fragment_shape(value: &Value) -> Result<FragmentShape<'_>, RuleError> {
    match value {
        Value::String(name) => Ok(FragmentShape::Named(name)),
        Value::Object(map) => match map.get("invoke") {
            Some(steps) if map.len() == 1 => Ok(FragmentShape::Invoke(steps)),
            _ => Err(RuleError::UnsupportedFragmentShape {
                actual: "object without a single 'invoke' member".to_string(),
            }),
        },
        other => Err(RuleError::UnsupportedFragmentShape {
            actual: json_type_name(other).to_string(),
        }),
    }
}

impl RuleBuilder {
    /// Apply a reusable fragment to this builder.
    ///
    /// If the fragment fails, directives it appended are dropped.
    ///
    /// ```
    /// use rulekit::RuleBuilder;
    ///
    /// let contact = |rules: &mut RuleBuilder| {
    ///     rules.required().email();
    /// };
    /// let rules = RuleBuilder::new().with(contact).unwrap().max(255).flatten();
    /// assert_eq!(rules, ["required", "email", "max:255"]);
    /// ```
    pub fn with<'a>(&mut self, fragment: impl Into<Fragment<'a>>) -> Result<&mut Self, RuleError> {
        let checkpoint = self.len();
        let result = match fragment.into() {
            Fragment::Nullary(f) => {
                f();
                Ok(())
            }
            Fragment::Unary(f) => f(self),
            Fragment::Object(invocable) => invocable.invoke(self),
        };

        if let Err(e) = result {
            self.truncate(checkpoint);
            return Err(e);
        }
        Ok(self)
    }
}
