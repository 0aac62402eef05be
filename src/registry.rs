//! Macro registry: user-defined builder methods.
//!
//! A registry maps a case-sensitive name to a function that receives the
//! builder it was called on plus the call's positional arguments. Builders use
//! the process-wide [`MacroRegistry::global`] instance unless another one is
//! injected with [`RuleBuilder::using`](crate::RuleBuilder::using).
//!
//! Writes take an exclusive lock and lookups a shared one. Dispatch clones the
//! function out of the map before calling it, so a macro may itself register
//! or call other macros.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use serde_json::Value;

use crate::builder::RuleBuilder;
use crate::error::RuleError;
use crate::vocabulary::{Builtin, STRUCTURAL_METHODS};

/// A registered macro body.
pub type MacroFn = dyn Fn(&mut RuleBuilder, &[Value]) -> Result<(), RuleError> + Send + Sync;

static GLOBAL: LazyLock<Arc<MacroRegistry>> = LazyLock::new(|| Arc::new(MacroRegistry::new()));

/// Table of macro name to macro body.
#[derive(Default)]
pub struct MacroRegistry {
    macros: RwLock<HashMap<String, Arc<MacroFn>>>,
}

impl MacroRegistry {
    /// Create an empty registry, independent of the global one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every builder created with `RuleBuilder::new`.
    pub fn global() -> Arc<MacroRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Register `f` under `name`, replacing any previous macro of that name.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::InvalidMacroName` if `name` is empty or collides
    /// with a built-in directive or builder method.
    pub fn register<F>(&self, name: impl Into<String>, f: F) -> Result<(), RuleError>
    where
        F: Fn(&mut RuleBuilder, &[Value]) -> Result<(), RuleError> + Send + Sync + 'static,
    {
        let name = name.into();
        check_name(&name)?;

        let previous = self
            .macros
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::new(f));

        if previous.is_some() {
            tracing::debug!(name = %name, "macro redefined");
        } else {
            tracing::debug!(name = %name, "macro registered");
        }
        Ok(())
    }

    /// Returns true if a macro is registered under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.macros
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Look up the macro registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<MacroFn>> {
        self.macros
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .macros
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.macros
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MacroRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroRegistry")
            .field("macros", &self.names())
            .finish()
    }
}

/// Register a macro on the global registry.
///
/// # Errors
///
/// See [`MacroRegistry::register`].
pub fn register_macro<F>(name: impl Into<String>, f: F) -> Result<(), RuleError>
where
    F: Fn(&mut RuleBuilder, &[Value]) -> Result<(), RuleError> + Send + Sync + 'static,
{
    GLOBAL.register(name, f)
}

fn check_name(name: &str) -> Result<(), RuleError> {
    let reason = if name.is_empty() {
        "name must not be empty".to_string()
    } else if let Some(builtin) = Builtin::parse(name) {
        format!("'{}' is a built-in directive", builtin)
    } else if STRUCTURAL_METHODS.contains(&name) {
        format!("'{}' is a builder method", name)
    } else {
        return Ok(());
    };

    Err(RuleError::InvalidMacroName {
        name: name.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut RuleBuilder, _: &[Value]) -> Result<(), RuleError> {
        Ok(())
    }

    #[test]
    fn register_and_lookup() {
        let registry = MacroRegistry::new();
        assert!(!registry.has("money"));

        registry.register("money", noop).unwrap();
        assert!(registry.has("money"));
        assert!(registry.get("money").is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn names_are_case_sensitive() {
        let registry = MacroRegistry::new();
        registry.register("money", noop).unwrap();
        assert!(!registry.has("Money"));
    }

    #[test]
    fn builtin_names_are_reserved() {
        let registry = MacroRegistry::new();
        let err = registry.register("required", noop).unwrap_err();
        assert!(matches!(err, RuleError::InvalidMacroName { ref name, .. } if name == "required"));
        assert!(!registry.has("required"));
        assert!(registry.is_empty());
    }

    #[test]
    fn structural_names_are_reserved() {
        let registry = MacroRegistry::new();
        for name in ["when", "with", "rule", "flatten"] {
            assert!(registry.register(name, noop).is_err(), "{name} should be reserved");
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        let registry = MacroRegistry::new();
        assert!(matches!(
            registry.register("", noop),
            Err(RuleError::InvalidMacroName { .. })
        ));
    }

    #[test]
    fn reregistering_overwrites() {
        let registry = MacroRegistry::new();
        registry
            .register("money", |rules: &mut RuleBuilder, _: &[Value]| {
                rules.numeric();
                Ok(())
            })
            .unwrap();
        registry
            .register("money", |rules: &mut RuleBuilder, _: &[Value]| {
                rules.integer();
                Ok(())
            })
            .unwrap();
        assert_eq!(registry.len(), 1);

        let mut rules = RuleBuilder::using(Arc::new(MacroRegistry::new()));
        let f = registry.get("money").unwrap();
        f(&mut rules, &[]).unwrap();
        assert_eq!(rules.flatten(), ["integer"]);
    }

    #[test]
    fn names_sorted() {
        let registry = MacroRegistry::new();
        registry.register("zeta", noop).unwrap();
        registry.register("alpha_code", noop).unwrap();
        assert_eq!(registry.names(), vec!["alpha_code", "zeta"]);
    }

    #[test]
    fn global_is_shared() {
        register_macro("registry_test_shared", noop).unwrap();
        assert!(MacroRegistry::global().has("registry_test_shared"));
    }
}
