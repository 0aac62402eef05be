//! Conditional composition: `when` and `unless`.

use std::fmt;

use crate::builder::RuleBuilder;
use crate::directive::Directive;

/// One outcome of a conditional.
///
/// Builders passed as outcomes are independent accumulators; only the taken
/// outcome's directives are copied into the calling builder.
pub enum Branch<'a> {
    /// Contributes nothing.
    Empty,
    Literal(String),
    Literals(Vec<String>),
    Builder(RuleBuilder),
    /// Produced on demand, only if this outcome is taken.
    Lazy(Box<dyn FnOnce() -> Branch<'a> + 'a>),
}

impl<'a> Branch<'a> {
    /// Defer building an outcome until the condition selects it.
    pub fn lazy<F, T>(f: F) -> Self
    where
        F: FnOnce() -> T + 'a,
        T: Into<Branch<'a>>,
    {
        Branch::Lazy(Box::new(move || f().into()))
    }

    fn into_directives(self) -> Vec<Directive> {
        match self {
            Branch::Empty => Vec::new(),
            Branch::Literal(s) => vec![Directive::Literal(s)],
            Branch::Literals(values) => values.into_iter().map(Directive::Literal).collect(),
            Branch::Builder(builder) => builder.directives().to_vec(),
            Branch::Lazy(f) => f().into_directives(),
        }
    }
}

impl RuleBuilder {
    /// Append `on_true` if `condition` holds, otherwise `on_false`.
    ///
    /// The untaken outcome is dropped without being converted or, for
    /// [`Branch::lazy`] outcomes, run. Pass `()` to omit an outcome.
    ///
    /// ```
    /// use rulekit::RuleBuilder;
    ///
    /// let rules = RuleBuilder::new()
    ///     .when(true, "required", "sometimes")
    ///     .string()
    ///     .flatten();
    /// assert_eq!(rules, ["required", "string"]);
    /// ```
    pub fn when<'a>(
        &mut self,
        condition: bool,
        on_true: impl Into<Branch<'a>>,
        on_false: impl Into<Branch<'a>>,
    ) -> &mut Self {
        let branch = if condition {
            on_true.into()
        } else {
            on_false.into()
        };
        tracing::trace!(condition, "resolving conditional");
        self.extend(branch.into_directives())
    }

    /// The inverse of [`when`](Self::when).
    pub fn unless<'a>(
        &mut self,
        condition: bool,
        on_false: impl Into<Branch<'a>>,
        on_true: impl Into<Branch<'a>>,
    ) -> &mut Self {
        self.when(!condition, on_false, on_true)
    }
}

impl fmt::Debug for Branch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Empty => f.write_str("Empty"),
            Branch::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Branch::Literals(values) => f.debug_tuple("Literals").field(values).finish(),
            Branch::Builder(builder) => f.debug_tuple("Builder").field(builder).finish(),
            Branch::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl From<()> for Branch<'_> {
    fn from(_: ()) -> Self {
        Branch::Empty
    }
}

impl From<&str> for Branch<'_> {
    fn from(s: &str) -> Self {
        Branch::Literal(s.to_string())
    }
}

impl From<String> for Branch<'_> {
    fn from(s: String) -> Self {
        Branch::Literal(s)
    }
}

impl From<Vec<String>> for Branch<'_> {
    fn from(values: Vec<String>) -> Self {
        Branch::Literals(values)
    }
}

impl From<Vec<&str>> for Branch<'_> {
    fn from(values: Vec<&str>) -> Self {
        Branch::Literals(values.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Branch<'_> {
    fn from(values: [&str; N]) -> Self {
        Branch::Literals(values.into_iter().map(String::from).collect())
    }
}

impl From<RuleBuilder> for Branch<'_> {
    fn from(builder: RuleBuilder) -> Self {
        Branch::Builder(builder)
    }
}

impl From<&RuleBuilder> for Branch<'_> {
    fn from(builder: &RuleBuilder) -> Self {
        Branch::Builder(builder.clone())
    }
}

impl<'a, T: Into<Branch<'a>>> From<Option<T>> for Branch<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Branch::Empty, Into::into)
    }
}
