//! Opaque rule objects.
//!
//! The composition engine never looks inside these. It only needs something
//! that can validate a value, so anything implementing [`Rule`] can be handed
//! to [`RuleBuilder::rule`](crate::RuleBuilder::rule) and comes back out of
//! `flatten` as the same object.

use std::fmt;

use serde_json::{json, Value};

use crate::error::Violation;

/// The single validation capability an opaque directive must provide.
pub trait Rule: fmt::Debug + Send + Sync {
    /// Validate `value`, which was submitted under `attribute`.
    fn validate(&self, attribute: &str, value: &Value) -> Result<(), Vec<Violation>>;

    /// JSON form used when flattened output is serialized.
    fn describe(&self) -> Value {
        Value::String(std::any::type_name::<Self>().to_string())
    }
}

/// An opaque rule that checks a value against a JSON Schema.
pub struct SchemaRule {
    schema: Value,
    validator: jsonschema::Validator,
}

impl SchemaRule {
    /// Compile `schema` into a rule.
    ///
    /// # Errors
    ///
    /// Returns the compilation error if `schema` is not a valid JSON Schema.
    pub fn new(schema: Value) -> Result<Self, jsonschema::ValidationError<'static>> {
        let validator = jsonschema::validator_for(&schema)?;
        Ok(Self { schema, validator })
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }
}

impl fmt::Debug for SchemaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRule")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Rule for SchemaRule {
    fn validate(&self, attribute: &str, value: &Value) -> Result<(), Vec<Violation>> {
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(value)
            .map(|e| Violation {
                path: format!("{}{}", attribute, e.instance_path),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn describe(&self) -> Value {
        json!({ "schema": self.schema })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_rule_accepts_matching_value() {
        let rule = SchemaRule::new(json!({ "type": "string", "maxLength": 5 })).unwrap();
        assert!(rule.validate("code", &json!("abc")).is_ok());
    }

    #[test]
    fn schema_rule_reports_violations_with_attribute() {
        let rule = SchemaRule::new(json!({
            "type": "object",
            "properties": { "zip": { "type": "string" } }
        }))
        .unwrap();

        let errors = rule
            .validate("address", &json!({ "zip": 12345 }))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "address/zip");
    }

    #[test]
    fn schema_rule_collects_multiple_violations() {
        let rule = SchemaRule::new(json!({
            "type": "object",
            "required": ["a", "b"]
        }))
        .unwrap();

        let errors = rule.validate("payload", &json!({})).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn invalid_schema_is_rejected() {
        assert!(SchemaRule::new(json!({ "type": 12 })).is_err());
    }

    #[test]
    fn describe_embeds_schema() {
        let rule = SchemaRule::new(json!({ "type": "integer" })).unwrap();
        assert_eq!(rule.describe(), json!({ "schema": { "type": "integer" } }));
    }
}
