//! Field Rules
//!
//! Parses a single schema rule into a validated [`FieldSpec`]. A rule is either a bare
//! path string or a record:
//!
//! ```json
//! {
//!   "path": "$.store.book[*].author",
//!   "default": "unknown",
//!   "modifiers": ["downcase"],
//!   "maps": [{"nigel rees": "N. Rees"}],
//!   "type": "array",
//!   "schema": { "name": "$.name" }
//! }
//! ```
//!
//! `modifier`/`modifiers` and `map`/`maps` are interchangeable and accept either a single
//! entry or a list.
//!
//! An object map only has string keys. To map numbers, booleans or `null`, write the map
//! as `[key, value]` pairs; a `null` key is the catch-all for values without an entry:
//!
//! ```json
//! { "path": "$.users[*].status", "map": [[1, "Active"], [0, "Inactive"], [null, "Unknown"]] }
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ExtractError, Result};
use crate::modifier::ModifierRef;
use crate::schema::{Rule, Schema};

// =============================================================================
// Default Value
// =============================================================================

/// Producer for fresh default values
pub type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Value used when a path yields nothing (or yields null)
#[derive(Clone)]
pub enum DefaultValue {
    /// Stored value, cloned on every use
    Value(Value),
    /// Called on every use; results are never cached
    Producer(DefaultFn),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl DefaultValue {
    pub fn fetch(&self) -> Value {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Producer(f) => f(),
        }
    }
}

// =============================================================================
// Value Map
// =============================================================================

/// Finite value-to-value substitution table.
///
/// Lookup is a total reclassification: a value with an explicit entry maps to that
/// entry, anything else maps to the `null`-keyed entry when the table has one, and to
/// `null` otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any existing entry for the same key
    pub fn with_entry(mut self, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        self.insert(from, to);
        self
    }

    /// Catch-all for values without an explicit entry
    pub fn with_fallback(self, to: impl Into<Value>) -> Self {
        self.with_entry(Value::Null, to)
    }

    pub fn insert(&mut self, from: impl Into<Value>, to: impl Into<Value>) {
        let (from, to) = (from.into(), to.into());
        match self.entries.iter_mut().find(|(k, _)| *k == from) {
            Some(entry) => entry.1 = to,
            None => self.entries.push((from, to)),
        }
    }

    pub fn lookup(&self, value: &Value) -> Value {
        self.get(value)
            .or_else(|| self.get(&Value::Null))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a table from schema text: an object (string keys) or a list of
    /// `[key, value]` pairs (any key, `null` for the catch-all)
    pub fn from_json(key: &str, value: &Value) -> Result<Self> {
        let invalid = || ExtractError::InvalidMap {
            key: key.to_string(),
            found: value.to_string(),
        };

        match value {
            Value::Object(table) => Ok(table
                .iter()
                .map(|(k, v)| (Value::String(k.clone()), v.clone()))
                .collect()),
            Value::Array(pairs) => {
                let mut map = ValueMap::new();
                for pair in pairs {
                    match pair.as_array().map(Vec::as_slice) {
                        Some([from, to]) => map.insert(from.clone(), to.clone()),
                        _ => return Err(invalid()),
                    }
                }
                Ok(map)
            }
            _ => Err(invalid()),
        }
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (from, to) in iter {
            map.insert(from, to);
        }
        map
    }
}

// =============================================================================
// Rule Record
// =============================================================================

/// Structured rule, before validation
#[derive(Debug, Clone, Default)]
pub struct RuleRecord {
    pub path: Option<String>,
    pub default: Option<DefaultValue>,
    pub modifiers: Vec<ModifierRef>,
    pub maps: Vec<ValueMap>,
    pub array: bool,
    pub schema: Option<Schema>,
}

impl RuleRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn with_default_fn<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }

    pub fn with_modifier(mut self, modifier: ModifierRef) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_map(mut self, map: ValueMap) -> Self {
        self.maps.push(map);
        self
    }

    /// Always produce a sequence
    pub fn as_array(mut self) -> Self {
        self.array = true;
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Parse a record from schema text
    pub fn from_json(key: &str, record: &Map<String, Value>) -> Result<Self> {
        let invalid = |reason: &str| ExtractError::InvalidSchemaDefinition {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if record.is_empty() {
            return Err(invalid("rule must not be empty"));
        }

        let path = match record.get("path") {
            None | Some(Value::Null) => None,
            Some(Value::String(p)) => Some(p.clone()),
            Some(_) => return Err(invalid("`path` must be a string")),
        };

        let default = record.get("default").cloned().map(DefaultValue::Value);

        let modifiers = match non_null(record, &["modifiers", "modifier"]) {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|m| ModifierRef::from_json(key, m))
                .collect::<Result<_>>()?,
            Some(single) => vec![ModifierRef::from_json(key, single)?],
        };

        let maps = match non_null(record, &["maps", "map"]) {
            None => Vec::new(),
            Some(value @ Value::Array(items)) if is_pair_list(items) => vec![ValueMap::from_json(key, value)?],
            Some(Value::Array(items)) => items
                .iter()
                .filter(|m| !m.is_null())
                .map(|m| ValueMap::from_json(key, m))
                .collect::<Result<_>>()?,
            Some(single) => vec![ValueMap::from_json(key, single)?],
        };

        let array = match record.get("type") {
            None | Some(Value::Null) => false,
            Some(Value::String(t)) => t == "array",
            Some(_) => return Err(invalid("`type` must be a string")),
        };

        let schema = match record.get("schema") {
            None | Some(Value::Null) => None,
            Some(nested @ Value::Object(_)) => Some(Schema::from_json_scoped(key, nested)?),
            Some(_) => return Err(invalid("nested `schema` must be a record")),
        };

        Ok(Self {
            path,
            default,
            modifiers,
            maps,
            array,
            schema,
        })
    }
}

/// First present, non-null value among the alias keys
fn non_null<'a>(record: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| record.get(*alias))
        .find(|v| !v.is_null())
}

/// `[[k, v], ...]` is one map in pair form rather than a list of maps
fn is_pair_list(items: &[Value]) -> bool {
    !items.is_empty()
        && items.iter().all(|item| match item.as_array().map(Vec::as_slice) {
            Some([from, _]) => !from.is_array(),
            _ => false,
        })
}

// =============================================================================
// Field Spec
// =============================================================================

/// Validated extraction rule for one output key
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub path: Option<String>,
    pub default: Option<DefaultValue>,
    pub modifiers: Vec<ModifierRef>,
    pub maps: Vec<ValueMap>,
    pub array_type: bool,
    pub nested: Option<Schema>,
}

impl FieldSpec {
    /// Validate a rule. `key` is only used to locate errors.
    pub fn parse(key: &str, rule: &Rule) -> Result<Self> {
        let record = match rule {
            Rule::Path(path) => {
                return Ok(Self {
                    path: Some(path.clone()),
                    default: None,
                    modifiers: Vec::new(),
                    maps: Vec::new(),
                    array_type: false,
                    nested: None,
                })
            }
            Rule::Record(record) => record,
        };

        if record.path.is_none() && record.default.is_none() {
            return Err(ExtractError::MissingPathOrDefault { key: key.to_string() });
        }

        for modifier in &record.modifiers {
            modifier.validate(key)?;
        }

        Ok(Self {
            path: record.path.clone(),
            default: record.default.clone(),
            modifiers: record.modifiers.clone(),
            maps: record.maps.clone(),
            array_type: record.array,
            nested: record.schema.clone(),
        })
    }

    /// Default for this field; producers are invoked on every call
    pub fn fetch_default(&self) -> Value {
        self.default.as_ref().map(DefaultValue::fetch).unwrap_or(Value::Null)
    }

    /// Zero-value shape of this field in a fresh result
    pub fn template_slot(&self) -> Value {
        if self.array_type {
            Value::Array(Vec::new())
        } else if self.nested.is_some() {
            Value::Object(Map::new())
        } else {
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(value: Value) -> Result<RuleRecord> {
        RuleRecord::from_json("field", value.as_object().unwrap())
    }

    #[test]
    fn test_blank_modifier_name_is_rejected() {
        let rule = Rule::from(
            RuleRecord::new()
                .with_path("$.a")
                .with_modifier(ModifierRef::named(" ")),
        );
        match FieldSpec::parse("status", &rule).unwrap_err() {
            ExtractError::InvalidModifier { key, .. } => assert_eq!(key, "status"),
            other => panic!("Expected InvalidModifier, got {:?}", other),
        }
    }

    #[test]
    fn test_pair_map_matches_numeric_keys() {
        let map = ValueMap::from_json("status", &json!([[1, "Active"], [null, "Unknown"]])).unwrap();
        assert_eq!(map.lookup(&json!(1)), json!("Active"));
        assert_eq!(map.lookup(&json!(2)), json!("Unknown"));

        let object = ValueMap::from_json("status", &json!({"1": "Active"})).unwrap();
        assert_eq!(object.lookup(&json!(1)), Value::Null);
        assert_eq!(object.lookup(&json!("1")), json!("Active"));
    }

    #[test]
    fn test_bare_path_rule() {
        let spec = FieldSpec::parse("name", &Rule::from("$.user.name")).unwrap();
        assert_eq!(spec.path.as_deref(), Some("$.user.name"));
        assert!(spec.default.is_none());
        assert!(!spec.array_type);
        assert_eq!(spec.template_slot(), Value::Null);
    }

    #[test]
    fn test_singular_and_plural_keys() {
        let single = record(json!({"path": "$.a", "modifier": "downcase", "map": {"x": "y"}})).unwrap();
        assert_eq!(single.modifiers.len(), 1);
        assert_eq!(single.maps.len(), 1);

        let plural = record(json!({
            "path": "$.a",
            "modifiers": ["downcase", "strip"],
            "maps": [{"x": "y"}, {"y": "z"}]
        }))
        .unwrap();
        assert_eq!(plural.modifiers.len(), 2);
        assert_eq!(plural.maps.len(), 2);
    }

    #[test]
    fn test_missing_path_and_default() {
        let rule = Rule::Record(record(json!({"modifier": "downcase"})).unwrap());
        let err = FieldSpec::parse("field", &rule).unwrap_err();
        assert!(matches!(err, ExtractError::MissingPathOrDefault { .. }));
    }

    #[test]
    fn test_default_only_is_valid() {
        let rule = Rule::Record(record(json!({"default": null})).unwrap());
        let spec = FieldSpec::parse("field", &rule).unwrap();
        assert!(spec.path.is_none());
        assert_eq!(spec.fetch_default(), Value::Null);
    }

    #[test]
    fn test_invalid_modifier_and_map() {
        let err = record(json!({"path": "$.a", "modifiers": ["downcase", 3]})).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidModifier { .. }));

        let err = record(json!({"path": "$.a", "map": "not a table"})).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidMap { .. }));

        let err = record(json!({"path": "$.a", "maps": [{"a": 1}, 7]})).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidMap { .. }));
    }

    #[test]
    fn test_array_type_and_nested_template() {
        let array = FieldSpec::parse("f", &Rule::Record(record(json!({"path": "$.a", "type": "array"})).unwrap())).unwrap();
        assert_eq!(array.template_slot(), json!([]));

        let nested = FieldSpec::parse(
            "f",
            &Rule::Record(record(json!({"path": "$.a", "schema": {"b": "$.b"}})).unwrap()),
        )
        .unwrap();
        assert_eq!(nested.template_slot(), json!({}));

        let other = record(json!({"path": "$.a", "type": "hash"})).unwrap();
        assert!(!other.array);
    }

    #[test]
    fn test_default_producer_called_each_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let rule = RuleRecord::new().with_path("$.a").with_default_fn(move || {
            json!(counter.fetch_add(1, Ordering::SeqCst))
        });
        let spec = FieldSpec::parse("f", &Rule::Record(rule)).unwrap();

        assert_eq!(spec.fetch_default(), json!(0));
        assert_eq!(spec.fetch_default(), json!(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_value_map_lookup() {
        let map = ValueMap::new().with_entry("reference", "ref").with_entry(1, "one");
        assert_eq!(map.lookup(&json!("reference")), json!("ref"));
        assert_eq!(map.lookup(&json!(1)), json!("one"));
        assert_eq!(map.lookup(&json!("fiction")), Value::Null);

        let with_fallback = map.with_fallback("other");
        assert_eq!(with_fallback.lookup(&json!("fiction")), json!("other"));
        assert_eq!(with_fallback.lookup(&json!("reference")), json!("ref"));
    }

    #[test]
    fn test_value_map_pair_form() {
        let parsed = record(json!({"path": "$.a", "map": [[true, "yes"], [null, "no"]]})).unwrap();
        assert_eq!(parsed.maps.len(), 1);
        let map = &parsed.maps[0];
        assert_eq!(map.lookup(&json!(true)), json!("yes"));
        assert_eq!(map.lookup(&json!(false)), json!("no"));
    }

    #[test]
    fn test_rejects_malformed_records() {
        assert!(matches!(record(json!({})).unwrap_err(), ExtractError::InvalidSchemaDefinition { .. }));
        assert!(matches!(
            record(json!({"path": 5})).unwrap_err(),
            ExtractError::InvalidSchemaDefinition { .. }
        ));
        assert!(matches!(
            record(json!({"path": "$.a", "schema": "$.b"})).unwrap_err(),
            ExtractError::InvalidSchemaDefinition { .. }
        ));
    }
}
