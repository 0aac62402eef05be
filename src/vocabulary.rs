//! The fixed set of built-in directive names.
//!
//! Every built-in is a closed enum variant, so dispatch on a method name is an
//! explicit lookup here first and in the macro registry second. Built-in names
//! and the structural builder methods form a reserved namespace that macros
//! can never claim.

use std::fmt;

/// Builder methods that are not directives but still can't be macro names.
pub const STRUCTURAL_METHODS: &[&str] = &["append", "rule", "when", "unless", "with", "call", "flatten"];

/// A built-in directive of the standard validation vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Accepted,
    ActiveUrl,
    After,
    AfterOrEqual,
    Alpha,
    AlphaDash,
    AlphaNum,
    Array,
    Bail,
    Before,
    BeforeOrEqual,
    Between,
    Boolean,
    Confirmed,
    Date,
    DateFormat,
    Declined,
    Different,
    Digits,
    DigitsBetween,
    Distinct,
    Email,
    EndsWith,
    Exists,
    File,
    Filled,
    Gt,
    Gte,
    Image,
    In,
    Integer,
    Ip,
    Ipv4,
    Ipv6,
    Json,
    Lowercase,
    Lt,
    Lte,
    Max,
    Mimes,
    Min,
    NotIn,
    NotRegex,
    Nullable,
    Numeric,
    Present,
    Prohibited,
    Regex,
    Required,
    RequiredIf,
    RequiredUnless,
    RequiredWith,
    RequiredWithout,
    Same,
    Size,
    Sometimes,
    StartsWith,
    String,
    Timezone,
    Unique,
    Uppercase,
    Url,
    Uuid,
}

impl Builtin {
    /// Every built-in, in alphabetical order of its directive name.
    pub const ALL: &'static [Builtin] = &[
        Builtin::Accepted,
        Builtin::ActiveUrl,
        Builtin::After,
        Builtin::AfterOrEqual,
        Builtin::Alpha,
        Builtin::AlphaDash,
        Builtin::AlphaNum,
        Builtin::Array,
        Builtin::Bail,
        Builtin::Before,
        Builtin::BeforeOrEqual,
        Builtin::Between,
        Builtin::Boolean,
        Builtin::Confirmed,
        Builtin::Date,
        Builtin::DateFormat,
        Builtin::Declined,
        Builtin::Different,
        Builtin::Digits,
        Builtin::DigitsBetween,
        Builtin::Distinct,
        Builtin::Email,
        Builtin::EndsWith,
        Builtin::Exists,
        Builtin::File,
        Builtin::Filled,
        Builtin::Gt,
        Builtin::Gte,
        Builtin::Image,
        Builtin::In,
        Builtin::Integer,
        Builtin::Ip,
        Builtin::Ipv4,
        Builtin::Ipv6,
        Builtin::Json,
        Builtin::Lowercase,
        Builtin::Lt,
        Builtin::Lte,
        Builtin::Max,
        Builtin::Mimes,
        Builtin::Min,
        Builtin::NotIn,
        Builtin::NotRegex,
        Builtin::Nullable,
        Builtin::Numeric,
        Builtin::Present,
        Builtin::Prohibited,
        Builtin::Regex,
        Builtin::Required,
        Builtin::RequiredIf,
        Builtin::RequiredUnless,
        Builtin::RequiredWith,
        Builtin::RequiredWithout,
        Builtin::Same,
        Builtin::Size,
        Builtin::Sometimes,
        Builtin::StartsWith,
        Builtin::String,
        Builtin::Timezone,
        Builtin::Unique,
        Builtin::Uppercase,
        Builtin::Url,
        Builtin::Uuid,
    ];

    /// The directive name as it appears in flattened output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Builtin::Accepted => "accepted",
            Builtin::ActiveUrl => "active_url",
            Builtin::After => "after",
            Builtin::AfterOrEqual => "after_or_equal",
            Builtin::Alpha => "alpha",
            Builtin::AlphaDash => "alpha_dash",
            Builtin::AlphaNum => "alpha_num",
            Builtin::Array => "array",
            Builtin::Bail => "bail",
            Builtin::Before => "before",
            Builtin::BeforeOrEqual => "before_or_equal",
            Builtin::Between => "between",
            Builtin::Boolean => "boolean",
            Builtin::Confirmed => "confirmed",
            Builtin::Date => "date",
            Builtin::DateFormat => "date_format",
            Builtin::Declined => "declined",
            Builtin::Different => "different",
            Builtin::Digits => "digits",
            Builtin::DigitsBetween => "digits_between",
            Builtin::Distinct => "distinct",
            Builtin::Email => "email",
            Builtin::EndsWith => "ends_with",
            Builtin::Exists => "exists",
            Builtin::File => "file",
            Builtin::Filled => "filled",
            Builtin::Gt => "gt",
            Builtin::Gte => "gte",
            Builtin::Image => "image",
            Builtin::In => "in",
            Builtin::Integer => "integer",
            Builtin::Ip => "ip",
            Builtin::Ipv4 => "ipv4",
            Builtin::Ipv6 => "ipv6",
            Builtin::Json => "json",
            Builtin::Lowercase => "lowercase",
            Builtin::Lt => "lt",
            Builtin::Lte => "lte",
            Builtin::Max => "max",
            Builtin::Mimes => "mimes",
            Builtin::Min => "min",
            Builtin::NotIn => "not_in",
            Builtin::NotRegex => "not_regex",
            Builtin::Nullable => "nullable",
            Builtin::Numeric => "numeric",
            Builtin::Present => "present",
            Builtin::Prohibited => "prohibited",
            Builtin::Regex => "regex",
            Builtin::Required => "required",
            Builtin::RequiredIf => "required_if",
            Builtin::RequiredUnless => "required_unless",
            Builtin::RequiredWith => "required_with",
            Builtin::RequiredWithout => "required_without",
            Builtin::Same => "same",
            Builtin::Size => "size",
            Builtin::Sometimes => "sometimes",
            Builtin::StartsWith => "starts_with",
            Builtin::String => "string",
            Builtin::Timezone => "timezone",
            Builtin::Unique => "unique",
            Builtin::Uppercase => "uppercase",
            Builtin::Url => "url",
            Builtin::Uuid => "uuid",
        }
    }

    /// Parameter names in the order they are rendered after the colon.
    ///
    /// A trailing `...` marks a variadic parameter.
    pub fn params(&self) -> &'static [&'static str] {
        match self {
            Builtin::After | Builtin::AfterOrEqual | Builtin::Before | Builtin::BeforeOrEqual => {
                &["date"]
            }
            Builtin::Between | Builtin::DigitsBetween => &["min", "max"],
            Builtin::DateFormat => &["format"],
            Builtin::Different | Builtin::Same => &["field"],
            Builtin::Gt | Builtin::Gte | Builtin::Lt | Builtin::Lte => &["field"],
            Builtin::Digits | Builtin::Size => &["value"],
            Builtin::Max | Builtin::Min => &["value"],
            Builtin::EndsWith | Builtin::StartsWith => &["values..."],
            Builtin::In | Builtin::NotIn => &["values..."],
            Builtin::Mimes => &["extensions..."],
            Builtin::Exists | Builtin::Unique => &["table", "column"],
            Builtin::Regex | Builtin::NotRegex => &["pattern"],
            Builtin::RequiredIf | Builtin::RequiredUnless => &["field", "values..."],
            Builtin::RequiredWith | Builtin::RequiredWithout => &["fields..."],
            _ => &[],
        }
    }

    /// Look up a built-in by its directive name (case-sensitive).
    pub fn parse(name: &str) -> Option<Self> {
        Builtin::ALL.iter().copied().find(|b| b.as_str() == name)
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `name` belongs to the reserved method namespace.
pub fn is_reserved(name: &str) -> bool {
    Builtin::parse(name).is_some() || STRUCTURAL_METHODS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_builtin() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::parse(builtin.as_str()), Some(*builtin));
        }
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert_eq!(Builtin::parse("required"), Some(Builtin::Required));
        assert_eq!(Builtin::parse("Required"), None);
        assert_eq!(Builtin::parse(""), None);
    }

    #[test]
    fn names_are_sorted_and_unique() {
        let names: Vec<&str> = Builtin::ALL.iter().map(Builtin::as_str).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn reserved_names() {
        assert!(is_reserved("required"));
        assert!(is_reserved("when"));
        assert!(is_reserved("flatten"));
        assert!(!is_reserved("money"));
    }

    #[test]
    fn params_follow_declared_order() {
        assert_eq!(Builtin::Between.params(), &["min", "max"]);
        assert_eq!(Builtin::Required.params(), &[] as &[&str]);
    }
}
