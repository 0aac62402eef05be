//! rulekit
//!
//! Fluent composition of ordered validation rule lists.
//!
//! A [`RuleBuilder`] accumulates directives for one field through chained
//! calls, conditionals, reusable fragments and user-registered macros, then
//! [`flatten`](RuleBuilder::flatten)s them into the final ordered list a
//! validation executor consumes. The builder never checks anything itself; it
//! only assembles the list.
//!
//! # Example
//!
//! ```
//! use rulekit::{RuleBuilder, MacroRegistry};
//! use serde_json::Value;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(MacroRegistry::new());
//! registry
//!     .register("money", |rules: &mut RuleBuilder, _: &[Value]| {
//!         rules.numeric().min(0);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let is_update = false;
//! let rules = RuleBuilder::using(registry)
//!     .when(is_update, "sometimes", "required")
//!     .call("money", &[])
//!     .unwrap()
//!     .max(1000)
//!     .flatten();
//!
//! assert_eq!(rules, ["required", "numeric", "min:0", "max:1000"]);
//! ```
//!
//! # Output forms
//!
//! | Appended as | Flattened to |
//! |-------------|--------------|
//! | Built-in method, e.g. `.between(1, 5)` | `"between:1,5"` |
//! | Literal string, e.g. `.rule("max:10")` | `"max:10"` (verbatim) |
//! | Opaque [`Rule`] object | The same object |
//! | Another builder | Its directives, inlined in order |
//!
//! Duplicates are kept and order is exactly call order.

mod branch;
mod builder;
mod directive;
mod error;
mod flatten;
mod fragment;
mod linter;
mod loader;
mod registry;
mod ruleset;
mod validator;
mod vocabulary;

pub use branch::Branch;
pub use builder::{Append, RuleBuilder, RuleValue};
pub use directive::{json_type_name, Directive, Tag};
pub use error::{LoadError, RuleError, RulesetError, Violation};
pub use flatten::{flatten, render_tag, FlatRule};
pub use fragment::{fragment_shape, Fragment, FragmentShape, Invoke};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{load_document, load_document_str};
pub use registry::{register_macro, MacroFn, MacroRegistry};
pub use ruleset::{composed_to_json, ComposedField, Ruleset, SECTIONS};
pub use validator::{Rule, SchemaRule};
pub use vocabulary::{is_reserved, Builtin, STRUCTURAL_METHODS};
