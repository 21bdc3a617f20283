//! Named behaviours attached to data tables at runtime.
//!
//! A registry is shared (`Arc`) by every `DataTable` built from the same
//! context, so a macro registered once is callable on all of them.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::domain::error::{AppError, Result};

pub type MacroFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// A bundle of named callables imported in one go with `mixin`.
pub trait Mixin {
    fn methods(&self) -> Vec<(String, MacroFn)>;
}

#[derive(Default)]
pub struct MacroRegistry {
    macros: RwLock<BTreeMap<String, MacroFn>>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) `name`.
    pub fn register<F>(&self, name: &str, callable: F)
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert(name.to_string(), Arc::new(callable));
    }

    /// Imports every method of `mixin`. With `replace == false`, names that
    /// are already registered keep their current callable.
    pub fn mixin(&self, mixin: &dyn Mixin, replace: bool) -> usize {
        let mut macros = self.write();
        let mut imported = 0;
        for (name, callable) in mixin.methods() {
            if !replace && macros.contains_key(&name) {
                continue;
            }
            macros.insert(name, callable);
            imported += 1;
        }
        debug!(imported, "Mixin imported");
        imported
    }

    pub fn has(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        // The lock is released before the callable runs; macros may call
        // back into the registry.
        let callable = self
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::MethodNotFound(name.to_string()))?;
        callable(args)
    }

    pub fn flush(&self) {
        self.write().clear();
    }

    fn insert(&self, name: String, callable: MacroFn) {
        self.write().insert(name, callable);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, MacroFn>> {
        self.macros.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, MacroFn>> {
        self.macros.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Greetings;

    impl Mixin for Greetings {
        fn methods(&self) -> Vec<(String, MacroFn)> {
            vec![
                (
                    "hello".to_string(),
                    Arc::new(|args: &[Value]| -> Result<Value> {
                        let name = args.first().and_then(Value::as_str).unwrap_or("world");
                        Ok(json!(format!("hello {}", name)))
                    }) as MacroFn,
                ),
                (
                    "macroMethod".to_string(),
                    Arc::new(|_: &[Value]| -> Result<Value> { Ok(json!("mixin")) }) as MacroFn,
                ),
            ]
        }
    }

    #[test]
    fn test_register_and_call() {
        let registry = MacroRegistry::new();
        registry.register("macroMethod", |_| Ok(json!("macro")));

        assert!(registry.has("macroMethod"));
        assert_eq!(registry.call("macroMethod", &[]).unwrap(), json!("macro"));
    }

    #[test]
    fn test_unregistered_method() {
        let registry = MacroRegistry::new();
        let err = registry.call("nope", &[]).unwrap_err();
        assert!(matches!(err, AppError::MethodNotFound(name) if name == "nope"));
    }

    #[test]
    fn test_mixin_replace_semantics() {
        let registry = MacroRegistry::new();
        registry.register("macroMethod", |_| Ok(json!("macro")));

        assert_eq!(registry.mixin(&Greetings, false), 1);
        assert_eq!(registry.call("macroMethod", &[]).unwrap(), json!("macro"));
        assert_eq!(
            registry.call("hello", &[json!("grid")]).unwrap(),
            json!("hello grid")
        );

        assert_eq!(registry.mixin(&Greetings, true), 2);
        assert_eq!(registry.call("macroMethod", &[]).unwrap(), json!("mixin"));
        assert_eq!(registry.names(), vec!["hello", "macroMethod"]);
    }

    #[test]
    fn test_macro_can_call_registry() {
        let registry = Arc::new(MacroRegistry::new());
        registry.register("base", |_| Ok(json!(1)));
        let inner = registry.clone();
        registry.register("derived", move |_| {
            let base = inner.call("base", &[])?;
            Ok(json!(base.as_i64().unwrap_or(0) + 1))
        });
        assert_eq!(registry.call("derived", &[]).unwrap(), json!(2));
    }

    #[test]
    fn test_flush() {
        let registry = MacroRegistry::new();
        registry.register("a", |_| Ok(Value::Null));
        registry.flush();
        assert!(!registry.has("a"));
    }
}
