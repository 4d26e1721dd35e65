//! Schema types and loading
//!
//! A schema maps output keys to rules. Key order is kept as authored and governs the
//! order fields are written into results.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{ExtractError, Result};
use crate::field::RuleRecord;

/// A single schema rule
#[derive(Debug, Clone)]
pub enum Rule {
    /// Shorthand for a record with only `path`
    Path(String),
    Record(RuleRecord),
}

impl From<&str> for Rule {
    fn from(path: &str) -> Self {
        Rule::Path(path.to_string())
    }
}

impl From<String> for Rule {
    fn from(path: String) -> Self {
        Rule::Path(path)
    }
}

impl From<RuleRecord> for Rule {
    fn from(record: RuleRecord) -> Self {
        Rule::Record(record)
    }
}

impl Rule {
    fn from_json(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(path) => Ok(Rule::Path(path.clone())),
            Value::Object(record) => Ok(Rule::Record(RuleRecord::from_json(key, record)?)),
            _ => Err(ExtractError::InvalidSchemaDefinition {
                key: key.to_string(),
                reason: "rule must be a path string or a record".to_string(),
            }),
        }
    }
}

/// Ordered mapping from output key to rule
#[derive(Debug, Clone, Default)]
pub struct Schema {
    rules: IndexMap<String, Rule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `insert`
    pub fn field(mut self, key: impl Into<String>, rule: impl Into<Rule>) -> Self {
        self.insert(key, rule);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, rule: impl Into<Rule>) {
        self.rules.insert(key.into(), rule.into());
    }

    pub fn get(&self, key: &str) -> Option<&Rule> {
        self.rules.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Rule)> {
        self.rules.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.rules.keys()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Load a schema from a JSON value (an object of rules)
    pub fn from_json(value: &Value) -> Result<Self> {
        Self::from_json_scoped("", value)
    }

    /// Load a schema from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Load a schema from TOML text
    ///
    /// ```toml
    /// name = "$.user.name"
    ///
    /// [tags]
    /// path = "$.user.tags[*]"
    /// type = "array"
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let value: Value = toml::from_str(text)?;
        Self::from_json(&value)
    }

    pub(crate) fn from_json_scoped(scope: &str, value: &Value) -> Result<Self> {
        let Value::Object(rules) = value else {
            return Err(ExtractError::InvalidSchemaDefinition {
                key: if scope.is_empty() { "$".to_string() } else { scope.to_string() },
                reason: "schema must be a record of rules".to_string(),
            });
        };

        let mut schema = Schema::new();
        for (key, rule) in rules {
            let rule = Rule::from_json(&scoped_key(scope, key), rule)?;
            schema.insert(key.clone(), rule);
        }
        Ok(schema)
    }
}

impl<K, R> FromIterator<(K, R)> for Schema
where
    K: Into<String>,
    R: Into<Rule>,
{
    fn from_iter<I: IntoIterator<Item = (K, R)>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for (key, rule) in iter {
            schema.insert(key, rule);
        }
        schema
    }
}

/// Dotted key used to locate nested fields in errors
pub(crate) fn scoped_key(scope: &str, key: &str) -> String {
    if scope.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", scope, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_authoring_order() {
        let schema = Schema::from_json(&json!({
            "zeta": "$.z",
            "alpha": {"path": "$.a", "type": "array"},
            "mid": {"default": 1}
        }))
        .unwrap();

        let keys: Vec<_> = schema.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert!(matches!(schema.get("zeta"), Some(Rule::Path(p)) if p == "$.z"));
        assert!(matches!(schema.get("alpha"), Some(Rule::Record(r)) if r.array));
    }

    #[test]
    fn test_from_toml_str() {
        let schema = Schema::from_toml_str(
            r#"
            name = "$.user.name"

            [tags]
            path = "$.user.tags[*]"
            type = "array"
            modifiers = ["upcase"]
            "#,
        )
        .unwrap();

        assert_eq!(schema.len(), 2);
        match schema.get("tags") {
            Some(Rule::Record(record)) => {
                assert!(record.array);
                assert_eq!(record.modifiers.len(), 1);
            }
            other => panic!("Expected Record, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_errors_are_scoped() {
        let err = Schema::from_json(&json!({
            "friends": {
                "path": "$.friends[*]",
                "schema": {"hobbies": {"schema": {"years": 7}}}
            }
        }))
        .unwrap_err();

        match err {
            ExtractError::InvalidSchemaDefinition { key, .. } => {
                assert_eq!(key, "friends.hobbies.years");
            }
            other => panic!("Expected InvalidSchemaDefinition, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_schema_rejected() {
        let err = Schema::from_json(&json!(["$.a"])).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidSchemaDefinition { .. }));
        assert!(Schema::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_builder_and_collect() {
        let schema = Schema::new()
            .field("name", "$.name")
            .field("age", RuleRecord::new().with_path("$.age").with_default(0));
        assert_eq!(schema.len(), 2);

        let collected: Schema = vec![("a", "$.a"), ("b", "$.b")].into_iter().collect();
        assert_eq!(collected.keys().cloned().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
