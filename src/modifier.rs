//! Modifiers
//!
//! A modifier is a single-value transformation applied to every extracted element.
//! Schemas reference modifiers either inline (a closure) or by name. Names are resolved
//! at extraction time, in order:
//!
//! 1. an inline callable is simply called
//! 2. a name registered in the [`ModifierRegistry`]
//! 3. an operation the value itself supports, per the [`CapabilityTable`]
//! 4. otherwise strict mode fails with `UnresolvedModifier`, lenient mode passes the
//!    value through unchanged

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::capability::CapabilityTable;
use crate::error::{ExtractError, Result};

/// A callable modifier
pub type ModifierFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Reference to a modifier, as written in a schema
#[derive(Clone)]
pub enum ModifierRef {
    /// Inline closure
    Callable(ModifierFn),
    /// Name looked up in the registry first, then in the value's capabilities
    Named(String),
    /// Name looked up only in the value's capabilities
    Ambient(String),
}

impl fmt::Debug for ModifierRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifierRef::Callable(_) => f.write_str("Callable(..)"),
            ModifierRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            ModifierRef::Ambient(name) => f.debug_tuple("Ambient").field(name).finish(),
        }
    }
}

impl ModifierRef {
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        ModifierRef::Callable(Arc::new(f))
    }

    pub fn named(name: impl Into<String>) -> Self {
        ModifierRef::Named(name.into())
    }

    pub fn ambient(name: impl Into<String>) -> Self {
        ModifierRef::Ambient(name.into())
    }

    /// Parse a modifier entry from schema text. Only names are expressible there.
    pub fn from_json(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(name) if !name.trim().is_empty() => Ok(ModifierRef::Named(name.trim().to_string())),
            other => Err(ExtractError::InvalidModifier {
                key: key.to_string(),
                found: other.to_string(),
            }),
        }
    }

    /// The referenced name, if this is not an inline callable
    pub fn name(&self) -> Option<&str> {
        match self {
            ModifierRef::Callable(_) => None,
            ModifierRef::Named(name) | ModifierRef::Ambient(name) => Some(name),
        }
    }

    /// Reject references that can never resolve
    pub(crate) fn validate(&self, key: &str) -> Result<()> {
        match self.name() {
            Some(name) if name.trim().is_empty() => Err(ExtractError::InvalidModifier {
                key: key.to_string(),
                found: format!("{:?}", self),
            }),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Modifier Registry
// =============================================================================

/// Named modifiers plus the capability table used as fallback.
///
/// The registry is owned by the caller; plans never hold onto it, so it can be
/// extended between extraction runs.
#[derive(Clone)]
pub struct ModifierRegistry {
    modifiers: HashMap<String, ModifierFn>,
    capabilities: CapabilityTable,
}

impl Default for ModifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.modifiers.keys().collect();
        names.sort();
        f.debug_struct("ModifierRegistry")
            .field("modifiers", &names)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl ModifierRegistry {
    /// Empty registry over the built-in capabilities
    pub fn new() -> Self {
        Self::with_capabilities(CapabilityTable::builtin())
    }

    pub fn with_capabilities(capabilities: CapabilityTable) -> Self {
        Self {
            modifiers: HashMap::new(),
            capabilities,
        }
    }

    /// Register (or replace) a named modifier
    pub fn register(&mut self, name: impl Into<String>, modifier: ModifierFn) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ExtractError::InvalidModifier {
                key: "registry".to_string(),
                found: format!("{:?}", name),
            });
        }
        self.modifiers.insert(name, modifier);
        Ok(())
    }

    /// Convenience over `register` for plain closures
    pub fn register_fn<F>(&mut self, name: impl Into<String>, modifier: F) -> Result<()>
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.register(name, Arc::new(modifier))
    }

    pub fn get(&self, name: &str) -> Option<&ModifierFn> {
        self.modifiers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modifiers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    pub fn capabilities_mut(&mut self) -> &mut CapabilityTable {
        &mut self.capabilities
    }

    /// Apply one modifier to one value
    pub fn apply(&self, modifier: &ModifierRef, value: Value, strict: bool) -> Result<Value> {
        let resolved = match modifier {
            ModifierRef::Callable(f) => return Ok(f(&value)),
            ModifierRef::Named(name) => self
                .modifiers
                .get(name)
                .or_else(|| self.capabilities.lookup(name, &value)),
            ModifierRef::Ambient(name) => self.capabilities.lookup(name, &value),
        };

        if let Some(f) = resolved {
            return Ok(f(&value));
        }

        let name = modifier.name().unwrap_or_default();
        if strict {
            return Err(ExtractError::UnresolvedModifier {
                name: name.to_string(),
                value,
            });
        }

        debug!(modifier = name, "modifier not applicable, passing value through");
        Ok(value)
    }

    /// Apply modifiers left to right: `[f, g]` yields `g(f(x))`
    pub fn apply_all(&self, modifiers: &[ModifierRef], value: Value, strict: bool) -> Result<Value> {
        modifiers
            .iter()
            .try_fold(value, |acc, modifier| self.apply(modifier, acc, strict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ValueKind;
    use serde_json::json;

    #[test]
    fn test_callable_is_called_directly() {
        let registry = ModifierRegistry::new();
        let double = ModifierRef::callable(|v| json!(v.as_i64().unwrap_or_default() * 2));
        assert_eq!(registry.apply(&double, json!(21), true).unwrap(), json!(42));
    }

    #[test]
    fn test_registry_wins_over_capability() {
        let mut registry = ModifierRegistry::new();
        registry.register_fn("downcase", |_| json!("registered")).unwrap();

        let result = registry.apply(&ModifierRef::named("downcase"), json!("ABC"), true).unwrap();
        assert_eq!(result, json!("registered"));

        // Ambient references skip the registry
        let result = registry.apply(&ModifierRef::ambient("downcase"), json!("ABC"), true).unwrap();
        assert_eq!(result, json!("abc"));
    }

    #[test]
    fn test_unresolved_strict_and_lenient() {
        let registry = ModifierRegistry::new();
        let modifier = ModifierRef::named("downcase");

        let err = registry.apply(&modifier, json!(8.95), true).unwrap_err();
        match err {
            ExtractError::UnresolvedModifier { name, value } => {
                assert_eq!(name, "downcase");
                assert_eq!(value, json!(8.95));
            }
            other => panic!("Expected UnresolvedModifier, got {:?}", other),
        }

        assert_eq!(registry.apply(&modifier, json!(8.95), false).unwrap(), json!(8.95));
    }

    #[test]
    fn test_apply_all_runs_left_to_right() {
        let mut registry = ModifierRegistry::new();
        registry
            .register_fn("spaces_to_exclams", |v| match v {
                Value::String(s) => json!(s.replace(' ', "!")),
                other => other.clone(),
            })
            .unwrap();

        let modifiers = vec![
            ModifierRef::named("downcase"),
            ModifierRef::named("spaces_to_exclams"),
        ];
        let result = registry.apply_all(&modifiers, json!("Nigel Rees"), true).unwrap();
        assert_eq!(result, json!("nigel!rees"));

        let append = ModifierRef::callable(|v| json!(format!("{}-f", v.as_str().unwrap_or_default())));
        let wrap = ModifierRef::callable(|v| json!(format!("g({})", v.as_str().unwrap_or_default())));
        let result = registry.apply_all(&[append, wrap], json!("x"), true).unwrap();
        assert_eq!(result, json!("g(x-f)"));
    }

    #[test]
    fn test_register_rejects_empty_name() {
        let mut registry = ModifierRegistry::new();
        let err = registry.register_fn("  ", |v| v.clone()).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidModifier { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_from_json_accepts_names_only() {
        let modifier = ModifierRef::from_json("authors", &json!("downcase")).unwrap();
        assert_eq!(modifier.name(), Some("downcase"));

        for bad in [json!(1), json!({"fn": "x"}), json!(""), json!(null)] {
            let err = ModifierRef::from_json("authors", &bad).unwrap_err();
            assert!(matches!(err, ExtractError::InvalidModifier { .. }), "{:?}", bad);
        }
    }

    #[test]
    fn test_custom_capabilities() {
        let mut registry = ModifierRegistry::with_capabilities(CapabilityTable::empty());
        assert!(registry.apply(&ModifierRef::named("upcase"), json!("a"), true).is_err());

        registry
            .capabilities_mut()
            .register_fn(ValueKind::String, "upcase", |v| json!(v.as_str().unwrap_or_default().to_uppercase()));
        assert_eq!(
            registry.apply(&ModifierRef::named("upcase"), json!("a"), true).unwrap(),
            json!("A")
        );
    }
}
