//! The rule builder: an ordered accumulator of directives for one field.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::directive::{Directive, Tag};
use crate::error::RuleError;
use crate::registry::MacroRegistry;
use crate::validator::{Rule, SchemaRule};
use crate::vocabulary::Builtin;

/// Accumulates directives in call order.
///
/// Every mutating method returns the same builder so calls can be chained.
/// Nothing is ever reordered or deduplicated.
///
/// ```
/// use rulekit::RuleBuilder;
///
/// let rules = RuleBuilder::new().required().string().max(255).flatten();
/// assert_eq!(rules, ["required", "string", "max:255"]);
/// ```
#[derive(Clone)]
pub struct RuleBuilder {
    directives: Vec<Directive>,
    registry: Arc<MacroRegistry>,
}

/// Anything [`RuleBuilder::append`] accepts.
#[derive(Debug, Clone)]
pub enum Append {
    Tag(Tag),
    Literal(String),
    Literals(Vec<String>),
    /// Another builder, inlined at the append point.
    Builder(RuleBuilder),
}

/// Anything [`RuleBuilder::rule`] accepts.
#[derive(Debug, Clone)]
pub enum RuleValue {
    Literal(String),
    Literals(Vec<String>),
    Opaque(Arc<dyn Rule>),
    Builder(RuleBuilder),
}

impl RuleBuilder {
    /// Create an empty builder backed by the global macro registry.
    pub fn new() -> Self {
        Self::using(MacroRegistry::global())
    }

    /// Create an empty builder backed by `registry`.
    pub fn using(registry: Arc<MacroRegistry>) -> Self {
        Self {
            directives: Vec::new(),
            registry,
        }
    }

    /// The registry macro calls are resolved against.
    pub fn registry(&self) -> &Arc<MacroRegistry> {
        &self.registry
    }

    /// Accumulated directives, in order.
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Append a tag, a literal, several literals, or another builder's
    /// directives. Empty input is a no-op.
    pub fn append(&mut self, item: impl Into<Append>) -> &mut Self {
        let directives = item.into().into_directives();
        self.extend(directives)
    }

    /// Append a literal, several literals, an opaque rule object or another
    /// builder's directives.
    pub fn rule(&mut self, value: impl Into<RuleValue>) -> &mut Self {
        let directives = value.into().into_directives();
        self.extend(directives)
    }

    /// Call a method by name.
    ///
    /// Built-in names append one tag whose parameters are `args`. Any other
    /// name is looked up in the macro registry and the macro runs against
    /// this builder. If the macro fails, whatever it appended is dropped.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::UnknownMethod` if `method` is neither a built-in
    /// nor a registered macro, or whatever error the macro itself returns.
    pub fn call(&mut self, method: &str, args: &[Value]) -> Result<&mut Self, RuleError> {
        if let Some(builtin) = Builtin::parse(method) {
            return Ok(self.push_builtin(builtin, args.iter().cloned()));
        }

        let Some(body) = self.registry.get(method) else {
            return Err(RuleError::UnknownMethod {
                method: method.to_string(),
            });
        };

        tracing::trace!(method, args = args.len(), "dispatching macro");
        let checkpoint = self.directives.len();
        if let Err(e) = body(self, args) {
            self.directives.truncate(checkpoint);
            return Err(e);
        }
        Ok(self)
    }

    pub(crate) fn extend(&mut self, directives: impl IntoIterator<Item = Directive>) -> &mut Self {
        self.directives.extend(directives);
        self
    }

    /// Roll back to an earlier length after a failed composite call.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.directives.truncate(len);
    }

    fn push_builtin(
        &mut self,
        builtin: Builtin,
        params: impl IntoIterator<Item = Value>,
    ) -> &mut Self {
        let tag = params
            .into_iter()
            .fold(Tag::from(builtin), |tag, param| tag.param(param));
        self.directives.push(Directive::Tag(tag));
        self
    }

    fn flag(&mut self, builtin: Builtin) -> &mut Self {
        self.push_builtin(builtin, std::iter::empty())
    }

    fn one(&mut self, builtin: Builtin, value: impl Into<Value>) -> &mut Self {
        self.push_builtin(builtin, [value.into()])
    }

    fn two(&mut self, builtin: Builtin, a: impl Into<Value>, b: impl Into<Value>) -> &mut Self {
        self.push_builtin(builtin, [a.into(), b.into()])
    }

    fn many<V: Into<Value>>(
        &mut self,
        builtin: Builtin,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.push_builtin(builtin, values.into_iter().map(Into::into))
    }

    // --- Presence ---

    pub fn required(&mut self) -> &mut Self {
        self.flag(Builtin::Required)
    }

    pub fn required_if<V: Into<Value>>(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        let params = std::iter::once(Value::from(field)).chain(values.into_iter().map(Into::into));
        self.push_builtin(Builtin::RequiredIf, params)
    }

    pub fn required_unless<V: Into<Value>>(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        let params = std::iter::once(Value::from(field)).chain(values.into_iter().map(Into::into));
        self.push_builtin(Builtin::RequiredUnless, params)
    }

    pub fn required_with<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) -> &mut Self {
        self.many(Builtin::RequiredWith, fields)
    }

    pub fn required_without<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) -> &mut Self {
        self.many(Builtin::RequiredWithout, fields)
    }

    pub fn sometimes(&mut self) -> &mut Self {
        self.flag(Builtin::Sometimes)
    }

    pub fn nullable(&mut self) -> &mut Self {
        self.flag(Builtin::Nullable)
    }

    pub fn filled(&mut self) -> &mut Self {
        self.flag(Builtin::Filled)
    }

    pub fn present(&mut self) -> &mut Self {
        self.flag(Builtin::Present)
    }

    pub fn prohibited(&mut self) -> &mut Self {
        self.flag(Builtin::Prohibited)
    }

    /// Stop running further rules for the field after the first failure.
    pub fn bail(&mut self) -> &mut Self {
        self.flag(Builtin::Bail)
    }

    // --- Types ---

    pub fn string(&mut self) -> &mut Self {
        self.flag(Builtin::String)
    }

    pub fn integer(&mut self) -> &mut Self {
        self.flag(Builtin::Integer)
    }

    pub fn numeric(&mut self) -> &mut Self {
        self.flag(Builtin::Numeric)
    }

    pub fn boolean(&mut self) -> &mut Self {
        self.flag(Builtin::Boolean)
    }

    pub fn array(&mut self) -> &mut Self {
        self.flag(Builtin::Array)
    }

    pub fn json(&mut self) -> &mut Self {
        self.flag(Builtin::Json)
    }

    pub fn date(&mut self) -> &mut Self {
        self.flag(Builtin::Date)
    }

    pub fn date_format(&mut self, format: &str) -> &mut Self {
        self.one(Builtin::DateFormat, format)
    }

    pub fn file(&mut self) -> &mut Self {
        self.flag(Builtin::File)
    }

    pub fn image(&mut self) -> &mut Self {
        self.flag(Builtin::Image)
    }

    pub fn mimes<'a>(&mut self, extensions: impl IntoIterator<Item = &'a str>) -> &mut Self {
        self.many(Builtin::Mimes, extensions)
    }

    // --- Formats ---

    pub fn email(&mut self) -> &mut Self {
        self.flag(Builtin::Email)
    }

    pub fn url(&mut self) -> &mut Self {
        self.flag(Builtin::Url)
    }

    pub fn active_url(&mut self) -> &mut Self {
        self.flag(Builtin::ActiveUrl)
    }

    pub fn uuid(&mut self) -> &mut Self {
        self.flag(Builtin::Uuid)
    }

    pub fn ip(&mut self) -> &mut Self {
        self.flag(Builtin::Ip)
    }

    pub fn ipv4(&mut self) -> &mut Self {
        self.flag(Builtin::Ipv4)
    }

    pub fn ipv6(&mut self) -> &mut Self {
        self.flag(Builtin::Ipv6)
    }

    pub fn timezone(&mut self) -> &mut Self {
        self.flag(Builtin::Timezone)
    }

    pub fn alpha(&mut self) -> &mut Self {
        self.flag(Builtin::Alpha)
    }

    pub fn alpha_dash(&mut self) -> &mut Self {
        self.flag(Builtin::AlphaDash)
    }

    pub fn alpha_num(&mut self) -> &mut Self {
        self.flag(Builtin::AlphaNum)
    }

    pub fn lowercase(&mut self) -> &mut Self {
        self.flag(Builtin::Lowercase)
    }

    pub fn uppercase(&mut self) -> &mut Self {
        self.flag(Builtin::Uppercase)
    }

    pub fn regex(&mut self, pattern: &str) -> &mut Self {
        self.one(Builtin::Regex, pattern)
    }

    pub fn not_regex(&mut self, pattern: &str) -> &mut Self {
        self.one(Builtin::NotRegex, pattern)
    }

    pub fn starts_with<'a>(&mut self, prefixes: impl IntoIterator<Item = &'a str>) -> &mut Self {
        self.many(Builtin::StartsWith, prefixes)
    }

    pub fn ends_with<'a>(&mut self, suffixes: impl IntoIterator<Item = &'a str>) -> &mut Self {
        self.many(Builtin::EndsWith, suffixes)
    }

    // --- Sizes ---

    pub fn min(&mut self, value: impl Into<Value>) -> &mut Self {
        self.one(Builtin::Min, value)
    }

    pub fn max(&mut self, value: impl Into<Value>) -> &mut Self {
        self.one(Builtin::Max, value)
    }

    pub fn size(&mut self, value: impl Into<Value>) -> &mut Self {
        self.one(Builtin::Size, value)
    }

    pub fn between(&mut self, min: impl Into<Value>, max: impl Into<Value>) -> &mut Self {
        self.two(Builtin::Between, min, max)
    }

    pub fn digits(&mut self, count: u32) -> &mut Self {
        self.one(Builtin::Digits, count)
    }

    pub fn digits_between(&mut self, min: u32, max: u32) -> &mut Self {
        self.two(Builtin::DigitsBetween, min, max)
    }

    // --- Comparisons ---

    pub fn gt(&mut self, field: &str) -> &mut Self {
        self.one(Builtin::Gt, field)
    }

    pub fn gte(&mut self, field: &str) -> &mut Self {
        self.one(Builtin::Gte, field)
    }

    pub fn lt(&mut self, field: &str) -> &mut Self {
        self.one(Builtin::Lt, field)
    }

    pub fn lte(&mut self, field: &str) -> &mut Self {
        self.one(Builtin::Lte, field)
    }

    pub fn same(&mut self, field: &str) -> &mut Self {
        self.one(Builtin::Same, field)
    }

    pub fn different(&mut self, field: &str) -> &mut Self {
        self.one(Builtin::Different, field)
    }

    pub fn confirmed(&mut self) -> &mut Self {
        self.flag(Builtin::Confirmed)
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.flag(Builtin::Distinct)
    }

    /// Renders as `in:a,b,c`.
    pub fn in_list<V: Into<Value>>(&mut self, values: impl IntoIterator<Item = V>) -> &mut Self {
        self.many(Builtin::In, values)
    }

    pub fn not_in<V: Into<Value>>(&mut self, values: impl IntoIterator<Item = V>) -> &mut Self {
        self.many(Builtin::NotIn, values)
    }

    pub fn accepted(&mut self) -> &mut Self {
        self.flag(Builtin::Accepted)
    }

    pub fn declined(&mut self) -> &mut Self {
        self.flag(Builtin::Declined)
    }

    // --- Dates ---

    pub fn after(&mut self, date: &str) -> &mut Self {
        self.one(Builtin::After, date)
    }

    pub fn after_or_equal(&mut self, date: &str) -> &mut Self {
        self.one(Builtin::AfterOrEqual, date)
    }

    pub fn before(&mut self, date: &str) -> &mut Self {
        self.one(Builtin::Before, date)
    }

    pub fn before_or_equal(&mut self, date: &str) -> &mut Self {
        self.one(Builtin::BeforeOrEqual, date)
    }

    // --- Database ---

    pub fn exists(&mut self, table: &str, column: &str) -> &mut Self {
        self.two(Builtin::Exists, table, column)
    }

    pub fn unique(&mut self, table: &str, column: &str) -> &mut Self {
        self.two(Builtin::Unique, table, column)
    }
}

impl Default for RuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleBuilder")
            .field("directives", &self.directives)
            .finish_non_exhaustive()
    }
}

// --- Normalization ---

fn literals(values: Vec<String>) -> Vec<Directive> {
    values.into_iter().map(Directive::Literal).collect()
}

impl Append {
    fn into_directives(self) -> Vec<Directive> {
        match self {
            Append::Tag(tag) => vec![Directive::Tag(tag)],
            Append::Literal(s) => vec![Directive::Literal(s)],
            Append::Literals(values) => literals(values),
            Append::Builder(builder) => builder.directives,
        }
    }
}

impl RuleValue {
    /// Wrap an external rule object.
    pub fn opaque(rule: impl Rule + 'static) -> Self {
        RuleValue::Opaque(Arc::new(rule))
    }

    fn into_directives(self) -> Vec<Directive> {
        match self {
            RuleValue::Literal(s) => vec![Directive::Literal(s)],
            RuleValue::Literals(values) => literals(values),
            RuleValue::Opaque(rule) => vec![Directive::Opaque(rule)],
            RuleValue::Builder(builder) => builder.directives,
        }
    }
}

impl From<Tag> for Append {
    fn from(tag: Tag) -> Self {
        Append::Tag(tag)
    }
}

impl From<Builtin> for Append {
    fn from(builtin: Builtin) -> Self {
        Append::Tag(builtin.into())
    }
}

impl From<&str> for Append {
    fn from(s: &str) -> Self {
        Append::Literal(s.to_string())
    }
}

impl From<String> for Append {
    fn from(s: String) -> Self {
        Append::Literal(s)
    }
}

impl From<Vec<String>> for Append {
    fn from(values: Vec<String>) -> Self {
        Append::Literals(values)
    }
}

impl From<Vec<&str>> for Append {
    fn from(values: Vec<&str>) -> Self {
        Append::Literals(values.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Append {
    fn from(values: [&str; N]) -> Self {
        Append::Literals(values.into_iter().map(String::from).collect())
    }
}

impl From<RuleBuilder> for Append {
    fn from(builder: RuleBuilder) -> Self {
        Append::Builder(builder)
    }
}

impl From<&RuleBuilder> for Append {
    fn from(builder: &RuleBuilder) -> Self {
        Append::Builder(builder.clone())
    }
}

impl From<&mut RuleBuilder> for Append {
    fn from(builder: &mut RuleBuilder) -> Self {
        Append::Builder(builder.clone())
    }
}

impl From<&str> for RuleValue {
    fn from(s: &str) -> Self {
        RuleValue::Literal(s.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(s: String) -> Self {
        RuleValue::Literal(s)
    }
}

impl From<Vec<String>> for RuleValue {
    fn from(values: Vec<String>) -> Self {
        RuleValue::Literals(values)
    }
}

impl From<Vec<&str>> for RuleValue {
    fn from(values: Vec<&str>) -> Self {
        RuleValue::Literals(values.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RuleValue {
    fn from(values: [&str; N]) -> Self {
        RuleValue::Literals(values.into_iter().map(String::from).collect())
    }
}

impl From<Arc<dyn Rule>> for RuleValue {
    fn from(rule: Arc<dyn Rule>) -> Self {
        RuleValue::Opaque(rule)
    }
}

impl From<SchemaRule> for RuleValue {
    fn from(rule: SchemaRule) -> Self {
        RuleValue::opaque(rule)
    }
}

impl From<RuleBuilder> for RuleValue {
    fn from(builder: RuleBuilder) -> Self {
        RuleValue::Builder(builder)
    }
}

impl From<&RuleBuilder> for RuleValue {
    fn from(builder: &RuleBuilder) -> Self {
        RuleValue::Builder(builder.clone())
    }
}

impl From<&mut RuleBuilder> for RuleValue {
    fn from(builder: &mut RuleBuilder) -> Self {
        RuleValue::Builder(builder.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn isolated() -> RuleBuilder {
        RuleBuilder::using(Arc::new(MacroRegistry::new()))
    }

    #[test]
    fn builtins_append_in_call_order() {
        let mut rules = isolated();
        rules.required().string().min(3).max(4);
        assert_eq!(rules.flatten(), ["required", "string", "min:3", "max:4"]);
    }

    #[test]
    fn append_accepts_every_shape() {
        let mut nested = isolated();
        nested.email();

        let mut rules = isolated();
        rules
            .append(Tag::new("between").param(1).param(5))
            .append("nullable")
            .append(["alpha", "lowercase"])
            .append(Vec::<String>::new())
            .append(&nested);

        assert_eq!(
            rules.flatten(),
            ["between:1,5", "nullable", "alpha", "lowercase", "email"]
        );
    }

    #[test]
    fn absorbed_builder_is_copied() {
        let mut inner = isolated();
        inner.required().string();

        let mut outer = isolated();
        outer.integer().append(&inner);
        inner.email();

        assert_eq!(outer.flatten(), ["integer", "required", "string"]);
        assert_eq!(inner.flatten(), ["required", "string", "email"]);
    }

    #[test]
    fn rule_accepts_literals_and_builders() {
        let mut nested = isolated();
        nested.uuid();

        let mut rules = isolated();
        rules
            .rule("max:10")
            .rule(vec!["alpha", "alpha_dash"])
            .rule(nested);
        assert_eq!(rules.flatten(), ["max:10", "alpha", "alpha_dash", "uuid"]);
    }

    #[test]
    fn variadic_builtins_render_each_value() {
        let mut rules = isolated();
        rules
            .in_list(["draft", "published"])
            .required_if("status", ["paid", "shipped"])
            .mimes(["png", "jpg"]);
        assert_eq!(
            rules.flatten(),
            [
                "in:draft,published",
                "required_if:status,paid,shipped",
                "mimes:png,jpg"
            ]
        );
    }

    #[test]
    fn call_dispatches_builtins() {
        let mut rules = isolated();
        rules.call("between", &[json!(1), json!(9)]).unwrap();
        rules.call("required", &[]).unwrap();
        assert_eq!(rules.flatten(), ["between:1,9", "required"]);
    }

    #[test]
    fn call_dispatches_macros() {
        let registry = Arc::new(MacroRegistry::new());
        registry
            .register("price", |rules: &mut RuleBuilder, args: &[Value]| {
                rules.numeric().min(args.first().cloned().unwrap_or(json!(0)));
                Ok(())
            })
            .unwrap();

        let mut rules = RuleBuilder::using(registry);
        rules.required().call("price", &[json!(5)]).unwrap();
        assert_eq!(rules.flatten(), ["required", "numeric", "min:5"]);
    }

    #[test]
    fn unknown_method_leaves_builder_unchanged() {
        let mut rules = isolated();
        rules.required();
        let err = rules.call("doesNotExist", &[]).unwrap_err();
        assert_eq!(
            err,
            RuleError::UnknownMethod {
                method: "doesNotExist".into()
            }
        );
        assert_eq!(rules.flatten(), ["required"]);
    }

    #[test]
    fn failing_macro_rolls_back_its_output() {
        let registry = Arc::new(MacroRegistry::new());
        registry
            .register("broken", |rules: &mut RuleBuilder, _: &[Value]| {
                rules.string().call("missing", &[])?;
                Ok(())
            })
            .unwrap();

        let mut rules = RuleBuilder::using(registry);
        rules.required();
        assert!(rules.call("broken", &[]).is_err());
        assert_eq!(rules.flatten(), ["required"]);
    }

    #[test]
    fn macros_can_call_macros() {
        let registry = Arc::new(MacroRegistry::new());
        registry
            .register("name", |rules: &mut RuleBuilder, _: &[Value]| {
                rules.string().max(100);
                Ok(())
            })
            .unwrap();
        registry
            .register("full_name", |rules: &mut RuleBuilder, _: &[Value]| {
                rules.required().call("name", &[])?;
                Ok(())
            })
            .unwrap();

        let mut rules = RuleBuilder::using(registry);
        rules.call("full_name", &[]).unwrap();
        assert_eq!(rules.flatten(), ["required", "string", "max:100"]);
    }

    #[test]
    fn duplicates_are_preserved() {
        let mut rules = isolated();
        rules.required().required();
        assert_eq!(rules.flatten(), ["required", "required"]);
        assert_eq!(rules.len(), 2);
    }
}
